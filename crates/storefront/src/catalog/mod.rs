//! Catalog lookup: authoritative product data by id.
//!
//! # Architecture
//!
//! - The catalog service is source of truth for price and display fields;
//!   nothing here is persisted
//! - One `GET /product/{id}` per product, no batch endpoint
//! - In-memory caching via `moka` for responses (configurable TTL)
//! - [`LineResolver`] groups the lookups for one cart snapshot into a batch
//!   and discards batches that finish after a newer one was issued
//!
//! # Example
//!
//! ```rust,ignore
//! use easykart_storefront::catalog::{CatalogClient, LineResolver};
//!
//! let resolver = LineResolver::new(CatalogClient::new(&config)?);
//! let view = resolver.refresh(controller.cart()).await;
//! println!("subtotal: {}", view.totals.subtotal);
//! ```

mod cache;
mod client;
mod resolver;
mod types;

pub use client::CatalogClient;
pub use resolver::{CartView, LineResolver, LookupBatch, LookupFailure, ResolvedBatch};
pub use types::ProductRecord;

use std::future::Future;

use thiserror::Error;

use easykart_core::ProductId;

/// Errors that can occur when talking to the catalog service.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Product does not exist.
    #[error("Not found: {0}")]
    NotFound(ProductId),

    /// Rate limited by the service.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(String),
}

/// Source of authoritative product data.
///
/// Implemented by [`CatalogClient`]; tests substitute in-memory catalogs.
pub trait CatalogLookup: Send + Sync {
    /// Fetch one product. Lookups for different ids fail independently.
    fn fetch_product(
        &self,
        id: &ProductId,
    ) -> impl Future<Output = Result<ProductRecord, CatalogError>> + Send;

    /// Fetch the product list.
    fn list_products(&self) -> impl Future<Output = Result<Vec<ProductRecord>, CatalogError>> + Send;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod testing {
    //! In-memory catalog for tests.

    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::time::Duration;

    use rust_decimal::Decimal;

    use super::*;

    /// Catalog backed by a fixed set of records.
    #[derive(Default)]
    pub struct StaticCatalog {
        records: HashMap<ProductId, ProductRecord>,
        failing: Mutex<HashSet<ProductId>>,
        delays: HashMap<ProductId, Duration>,
        pub calls: Mutex<Vec<ProductId>>,
    }

    impl StaticCatalog {
        pub fn with_prices(prices: &[(&str, i64)]) -> Self {
            let records = prices
                .iter()
                .map(|(id, price)| {
                    let id = ProductId::from(*id);
                    (id.clone(), record(id, *price))
                })
                .collect();
            Self {
                records,
                ..Self::default()
            }
        }

        pub fn failing(self, id: &str) -> Self {
            self.failing_set().insert(ProductId::from(id));
            self
        }

        /// Let lookups for a previously failing product succeed.
        pub fn recover(&self, id: &str) {
            self.failing_set().remove(&ProductId::from(id));
        }

        fn failing_set(&self) -> std::sync::MutexGuard<'_, HashSet<ProductId>> {
            self.failing.lock().unwrap()
        }

        pub fn delayed(mut self, id: &str, delay: Duration) -> Self {
            self.delays.insert(ProductId::from(id), delay);
            self
        }
    }

    pub fn record(id: ProductId, price: i64) -> ProductRecord {
        ProductRecord {
            name: format!("Product {id}"),
            id,
            price: Decimal::from(price),
            image: None,
            description: None,
            category: None,
            rating: None,
            extra: serde_json::Map::new(),
        }
    }

    impl CatalogLookup for StaticCatalog {
        async fn fetch_product(&self, id: &ProductId) -> Result<ProductRecord, CatalogError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(id.clone());
            }
            if let Some(delay) = self.delays.get(id) {
                tokio::time::sleep(*delay).await;
            }
            let failing = self.failing_set().contains(id);
            if failing {
                return Err(CatalogError::Api {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            self.records
                .get(id)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound(id.clone()))
        }

        async fn list_products(&self) -> Result<Vec<ProductRecord>, CatalogError> {
            let mut all: Vec<_> = self.records.values().cloned().collect();
            all.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(all)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::NotFound(ProductId::from("123"));
        assert_eq!(err.to_string(), "Not found: 123");

        let err = CatalogError::RateLimited(30);
        assert_eq!(err.to_string(), "Rate limited, retry after 30 seconds");

        let err = CatalogError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 502 - bad gateway");
    }
}
