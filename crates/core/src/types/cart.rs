//! The cart: a mapping from product to desired quantity.
//!
//! ## Invariants
//!
//! - Every entry has a quantity of at least one.
//! - Removing the last unit of a product removes its key; a product is never
//!   represented with quantity zero.
//!
//! The stored encoding is a flat JSON object of product-id strings to
//! non-negative integers. Zero entries in that encoding are dropped on load.

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize, Serializer};

use super::id::ProductId;

/// A strictly positive item quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity, returning `None` for zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Get the quantity as a plain integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Add another quantity, clamping at `u32::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0.get()))
    }
}

impl TryFrom<u32> for Quantity {
    type Error = ZeroQuantity;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ZeroQuantity)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.get()
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when constructing a [`Quantity`] from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("quantity must be at least 1")]
pub struct ZeroQuantity;

/// Authoritative mapping of product to desired quantity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<ProductId, u32>")]
pub struct Cart(BTreeMap<ProductId, Quantity>);

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build a cart from raw quantities, dropping zero entries.
    pub fn from_quantities<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (ProductId, u32)>,
    {
        Self(
            entries
                .into_iter()
                .filter_map(|(id, qty)| Quantity::new(qty).map(|q| (id, q)))
                .collect(),
        )
    }

    /// Quantity for a product, if present.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<Quantity> {
        self.0.get(id).copied()
    }

    /// Quantity for a product as a plain integer (zero when absent).
    #[must_use]
    pub fn quantity(&self, id: &ProductId) -> u32 {
        self.get(id).map_or(0, Quantity::get)
    }

    /// Whether the product has an entry.
    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.0.contains_key(id)
    }

    /// Accumulate `delta` units of a product.
    ///
    /// Existing entries are incremented, never overwritten.
    pub fn add(&mut self, id: ProductId, delta: Quantity) {
        self.0
            .entry(id)
            .and_modify(|q| *q = q.saturating_add(delta))
            .or_insert(delta);
    }

    /// Remove a product entirely, returning its former quantity.
    pub fn remove(&mut self, id: &ProductId) -> Option<Quantity> {
        self.0.remove(id)
    }

    /// A copy of this cart without the given product.
    #[must_use]
    pub fn without(&self, id: &ProductId) -> Self {
        let mut next = self.clone();
        next.remove(id);
        next
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.0.values().map(|q| u64::from(q.get())).sum()
    }

    /// Product IDs in the cart, in key order.
    pub fn ids(&self) -> impl Iterator<Item = &ProductId> {
        self.0.keys()
    }

    /// Iterate `(product, quantity)` entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ProductId, Quantity)> {
        self.0.iter().map(|(id, q)| (id, *q))
    }

    /// Whether both carts hold exactly the same set of products.
    #[must_use]
    pub fn same_products(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.ids().eq(other.ids())
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the cart has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<ProductId, u32>> for Cart {
    fn from(raw: BTreeMap<ProductId, u32>) -> Self {
        Self::from_quantities(raw)
    }
}

impl Serialize for Cart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}
