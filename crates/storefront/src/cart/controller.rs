//! Owner of the authoritative cart.
//!
//! Every mutation goes through [`CartController`], which persists the new
//! cart and broadcasts it to subscribers. Persistence is best-effort: a
//! failed write is logged and reported, and the in-memory cart still changes.

use tokio::sync::watch;
use tracing::{debug, error, instrument};

use easykart_core::{Cart, ProductId, Quantity};

use crate::error::capture_error;
use crate::store::CartStore;

/// Mediates all reads and writes of the authoritative cart.
pub struct CartController {
    cart: Cart,
    store: CartStore,
    tx: watch::Sender<Cart>,
}

impl CartController {
    /// Initialize from the durable store.
    #[must_use]
    pub fn load(store: CartStore) -> Self {
        let cart = store.load();
        debug!(products = cart.len(), items = cart.total_count(), "Loaded cart");
        let (tx, _rx) = watch::channel(cart.clone());
        Self { cart, store, tx }
    }

    /// The authoritative cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Sum of all quantities, computed on demand.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.cart.total_count()
    }

    /// Add `delta` units of a product, accumulating onto any existing entry.
    #[instrument(skip(self), fields(product_id = %id, delta = delta.get()))]
    pub fn add_quantity(&mut self, id: ProductId, delta: Quantity) {
        self.cart.add(id, delta);
        self.commit();
    }

    /// Replace the whole cart.
    #[instrument(skip_all, fields(products = cart.len()))]
    pub fn replace_cart(&mut self, cart: Cart) {
        self.cart = cart;
        self.commit();
    }

    /// Remove a product line entirely.
    pub fn remove_line(&mut self, id: &ProductId) {
        let next = self.cart.without(id);
        self.replace_cart(next);
    }

    /// Empty the cart and delete its stored value.
    #[instrument(skip(self))]
    pub fn clear(&mut self) {
        self.cart = Cart::new();
        if let Err(e) = self.store.clear() {
            error!(error = %e, "Failed to clear stored cart");
            capture_error(&e);
        }
        self.tx.send_replace(self.cart.clone());
    }

    /// Subscribe to authoritative cart changes.
    ///
    /// The subscription starts with the current cart marked as seen.
    #[must_use]
    pub fn subscribe(&self) -> CartSubscription {
        CartSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Persist and broadcast the current cart.
    fn commit(&self) {
        if let Err(e) = self.store.save(&self.cart) {
            error!(error = %e, "Failed to persist cart, continuing in memory");
            capture_error(&e);
        }
        self.tx.send_replace(self.cart.clone());
    }
}

/// A consumer's view of authoritative cart changes.
pub struct CartSubscription {
    rx: watch::Receiver<Cart>,
}

impl CartSubscription {
    /// Whether the cart changed since this subscription last looked.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// The latest cart, marking it as seen.
    pub fn latest(&mut self) -> Cart {
        self.rx.borrow_and_update().clone()
    }

    /// The latest cart without marking it as seen.
    #[must_use]
    pub fn peek(&self) -> Cart {
        self.rx.borrow().clone()
    }

    /// Wait for the next change. Returns `false` once the controller is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
