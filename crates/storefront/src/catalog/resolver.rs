//! Batched product resolution for a cart view.
//!
//! A view issues one [`LookupBatch`] per cart snapshot and waits for every
//! lookup in it to settle before rendering. Batches carry a monotonic
//! generation; only the most recently issued batch may be applied, so a slow
//! batch for an old snapshot can never overwrite a newer result. Whether a
//! view needs a new batch is decided from the last *applied* batch, so an
//! abandoned lookup never leaves the view without data.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use easykart_core::{Cart, ProductId};

use super::{CatalogLookup, ProductRecord};
use crate::cart::{CartTotals, ProductLine, compute_totals, join_lines};

/// Lookups issued for one cart snapshot.
#[derive(Debug, Clone)]
pub struct LookupBatch {
    pub generation: u64,
    pub snapshot: Cart,
}

/// A product whose lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupFailure {
    pub product_id: ProductId,
    pub error: String,
}

/// The settled outcome of a [`LookupBatch`].
#[derive(Debug, Clone)]
pub struct ResolvedBatch {
    pub generation: u64,
    pub snapshot: Cart,
    pub records: HashMap<ProductId, ProductRecord>,
    pub failed: Vec<LookupFailure>,
}

/// Lines and totals ready to display.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<ProductLine>,
    pub failed: Vec<LookupFailure>,
    pub totals: CartTotals,
}

impl ResolvedBatch {
    /// Join these records with a cart.
    ///
    /// Quantities come from `cart`, so edits that keep the same products are
    /// reflected without another batch.
    #[must_use]
    pub fn view(&self, cart: &Cart) -> CartView {
        let lines = join_lines(cart, &self.records);
        let totals = compute_totals(&lines, cart);
        CartView {
            lines,
            failed: self.failed.clone(),
            totals,
        }
    }
}

/// Coordinates catalog lookups for the lines of a cart.
pub struct LineResolver<C> {
    catalog: C,
    generation: AtomicU64,
    applied: Mutex<Option<ResolvedBatch>>,
}

impl<C: CatalogLookup> LineResolver<C> {
    /// Create a resolver over a catalog.
    pub fn new(catalog: C) -> Self {
        Self {
            catalog,
            generation: AtomicU64::new(0),
            applied: Mutex::new(None),
        }
    }

    /// The underlying catalog.
    pub const fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Whether the last applied batch cannot serve `cart`.
    ///
    /// True when nothing was applied yet, the product set changed, or some
    /// lookups in the applied batch failed and should be retried.
    pub fn needs_refresh(&self, cart: &Cart) -> bool {
        self.lock().as_ref().is_none_or(|applied| {
            !applied.failed.is_empty() || !applied.snapshot.same_products(cart)
        })
    }

    /// Start a new batch for a cart snapshot.
    pub fn issue(&self, cart: &Cart) -> LookupBatch {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(generation, products = cart.len(), "Issued lookup batch");
        LookupBatch {
            generation,
            snapshot: cart.clone(),
        }
    }

    /// Fetch every product in the batch and wait for all to settle.
    ///
    /// Individual failures are recorded, not propagated.
    #[instrument(skip_all, fields(generation = batch.generation))]
    pub async fn resolve(&self, batch: LookupBatch) -> ResolvedBatch {
        let ids: Vec<ProductId> = batch.snapshot.ids().cloned().collect();
        let results = join_all(ids.iter().map(|id| self.catalog.fetch_product(id))).await;

        let mut records = HashMap::with_capacity(ids.len());
        let mut failed = Vec::new();
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(record) => {
                    records.insert(id, record);
                }
                Err(e) => {
                    warn!(product_id = %id, error = %e, "Product lookup failed");
                    failed.push(LookupFailure {
                        product_id: id,
                        error: e.to_string(),
                    });
                }
            }
        }

        ResolvedBatch {
            generation: batch.generation,
            snapshot: batch.snapshot,
            records,
            failed,
        }
    }

    /// Accept a resolved batch if it is the latest one issued.
    ///
    /// Returns `false` and discards the batch if a newer one was issued.
    pub fn apply(&self, resolved: ResolvedBatch) -> bool {
        let latest = self.generation.load(Ordering::SeqCst);
        if resolved.generation != latest {
            debug!(
                generation = resolved.generation,
                latest, "Discarding stale lookup batch"
            );
            return false;
        }
        *self.lock() = Some(resolved);
        true
    }

    /// The most recently applied batch.
    pub fn latest(&self) -> Option<ResolvedBatch> {
        self.lock().clone()
    }

    /// Bring the view up to date with `cart`.
    ///
    /// Issues and awaits a new batch when [`Self::needs_refresh`] says so;
    /// otherwise re-joins the last applied records with the current
    /// quantities.
    pub async fn refresh(&self, cart: &Cart) -> CartView {
        if self.needs_refresh(cart) {
            let batch = self.issue(cart);
            let resolved = self.resolve(batch).await;
            self.apply(resolved);
        }

        self.latest().map_or_else(
            || CartView {
                lines: Vec::new(),
                failed: Vec::new(),
                totals: compute_totals(&[], cart),
            },
            |resolved| resolved.view(cart),
        )
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ResolvedBatch>> {
        self.applied.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
