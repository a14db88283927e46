//! Durable key-value storage for client state.
//!
//! # Keys
//!
//! - `cart` - The cart, encoded as a flat JSON object of product id to quantity
//! - `token` - The stored credential token used to resolve the session user
//!
//! # Backends
//!
//! - [`FileStore`] - One file per key in the data directory (the default)
//! - [`MemoryStore`] - Process-local map, for tests and throwaway sessions

mod cart;
mod file;
mod memory;

pub use cart::{CartStore, TokenStore};
pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Storage keys for persisted client state.
pub mod keys {
    /// Key holding the encoded cart.
    pub const CART: &str = "cart";

    /// Key holding the credential token.
    pub const TOKEN: &str = "token";
}

/// Errors that can occur when reading or writing the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key contains characters that cannot address a stored entry.
    #[error("Invalid store key: {0}")]
    InvalidKey(String),

    /// Value could not be encoded.
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A string-keyed persistence layer.
///
/// Writes must be atomic: a `get` after `set` observes either the old or the
/// new value, never a partial write.
pub trait KeyValueStore: Send + Sync {
    /// Read the value for `key`, or `None` if nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete the value for `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Validate that a key is safe to use as a stored entry name.
fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key(keys::CART).is_ok());
        assert!(validate_key(keys::TOKEN).is_ok());
        assert!(validate_key("user_42-cart").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a b").is_err());
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::InvalidKey("a/b".to_string());
        assert_eq!(err.to_string(), "Invalid store key: a/b");
    }
}
