//! Typed adapters over the key-value store for the cart and the token.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use easykart_core::Cart;

use super::{KeyValueStore, StoreError, keys};

/// Persists the authoritative cart under [`keys::CART`].
#[derive(Clone)]
pub struct CartStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CartStore {
    /// Create a cart store over a key-value backend.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Load the stored cart.
    ///
    /// Fail-soft: a missing, unreadable or unparsable value yields an empty
    /// cart. Corruption is logged, never returned.
    #[must_use]
    pub fn load(&self) -> Cart {
        let raw = match self.backend.get(keys::CART) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Cart::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read stored cart, starting empty");
                return Cart::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Stored cart is corrupt, starting empty");
            Cart::new()
        })
    }

    /// Persist the cart, replacing any stored value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the cart cannot be encoded or written.
    pub fn save(&self, cart: &Cart) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(cart)?;
        self.backend.set(keys::CART, &encoded)
    }

    /// Delete the stored cart.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.remove(keys::CART)
    }
}

/// Persists the credential token under [`keys::TOKEN`].
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    /// Create a token store over a key-value backend.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Load the stored token. Blank or unreadable values count as absent.
    #[must_use]
    pub fn load(&self) -> Option<SecretString> {
        match self.backend.get(keys::TOKEN) {
            Ok(Some(raw)) => {
                let trimmed = raw.trim();
                (!trimmed.is_empty()).then(|| SecretString::from(trimmed.to_string()))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                None
            }
        }
    }

    /// Store a token.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written.
    pub fn save(&self, token: &SecretString) -> Result<(), StoreError> {
        self.backend.set(keys::TOKEN, token.expose_secret())
    }

    /// Delete the stored token.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.remove(keys::TOKEN)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use easykart_core::{ProductId, Quantity};

    use super::*;
    use crate::store::MemoryStore;

    fn backend() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_load_missing_is_empty() {
        let store = CartStore::new(backend());
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let store = CartStore::new(backend());
        let mut cart = Cart::new();
        cart.add(ProductId::from("1"), Quantity::new(2).unwrap());
        cart.add(ProductId::from("9"), Quantity::ONE);

        store.save(&cart).unwrap();
        assert_eq!(store.load(), cart);
    }

    #[test]
    fn test_corrupt_value_loads_empty() {
        let kv = backend();
        kv.set(keys::CART, "{not json").unwrap();
        assert!(CartStore::new(Arc::clone(&kv)).load().is_empty());

        kv.set(keys::CART, "[1,2,3]").unwrap();
        assert!(CartStore::new(kv).load().is_empty());
    }

    #[test]
    fn test_clear_removes_cart() {
        let kv = backend();
        let store = CartStore::new(Arc::clone(&kv));
        store.save(&Cart::from_quantities([(ProductId::from("1"), 1)])).unwrap();
        store.clear().unwrap();
        assert_eq!(kv.get(keys::CART).unwrap(), None);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_token_roundtrip_and_blank() {
        let kv = backend();
        let tokens = TokenStore::new(Arc::clone(&kv));
        assert!(tokens.load().is_none());

        tokens.save(&SecretString::from("abc123")).unwrap();
        assert_eq!(tokens.load().unwrap().expose_secret(), "abc123");

        kv.set(keys::TOKEN, "   ").unwrap();
        assert!(tokens.load().is_none());

        tokens.clear().unwrap();
        assert!(tokens.load().is_none());
    }
}
