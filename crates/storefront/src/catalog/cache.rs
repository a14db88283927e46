//! Cache types for catalog responses.

use easykart_core::ProductId;

use super::types::ProductRecord;

/// Cache key for catalog lookups.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    Products,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<ProductRecord>),
    Products(Vec<ProductRecord>),
}
