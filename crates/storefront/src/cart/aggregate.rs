//! Cart totals from resolved product lines.
//!
//! Pure computation. Lines are the join of cart entries with catalog
//! records; products whose lookup failed have no line and so do not count
//! toward the subtotal, but still count toward the item total, which comes
//! from the cart itself.

use std::collections::HashMap;

use serde::Serialize;

use easykart_core::{Cart, CurrencyCode, Money, ProductId, Quantity};

use crate::catalog::ProductRecord;

/// A cart entry joined with its catalog record. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub name: String,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl ProductLine {
    /// Build a line from a cart quantity and a catalog record.
    #[must_use]
    pub fn new(quantity: Quantity, record: &ProductRecord) -> Self {
        Self {
            product_id: record.id.clone(),
            quantity,
            unit_price: Money::new(record.price, CurrencyCode::default()),
            name: record.name.clone(),
            image: record.image.clone(),
            description: record.description.clone(),
        }
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_subtotal(&self) -> Money {
        self.unit_price.times(self.quantity.get())
    }
}

/// Aggregate values shown alongside the cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    /// Sum of line subtotals.
    pub subtotal: Money,
    /// Amount due. Equal to the subtotal until discounts exist.
    pub total: Money,
    /// Sum of cart quantities, independent of catalog resolution.
    pub total_count: u64,
}

/// Join cart entries with catalog records, in cart order.
///
/// Products without a record are skipped; the cart entry is untouched.
#[must_use]
pub fn join_lines<S: std::hash::BuildHasher>(
    cart: &Cart,
    records: &HashMap<ProductId, ProductRecord, S>,
) -> Vec<ProductLine> {
    cart.iter()
        .filter_map(|(id, quantity)| records.get(id).map(|r| ProductLine::new(quantity, r)))
        .collect()
}

/// Compute subtotal, total and item count.
#[must_use]
pub fn compute_totals(lines: &[ProductLine], cart: &Cart) -> CartTotals {
    let subtotal: Money = lines.iter().map(ProductLine::line_subtotal).sum();
    CartTotals {
        subtotal,
        total: subtotal,
        total_count: cart.total_count(),
    }
}
