//! Staged quantity edits for a cart view.
//!
//! A [`StagedEdits`] buffer is a working copy of the cart. Quantity edits
//! accumulate in the buffer and reach the authoritative cart only on
//! [`StagedEdits::commit`]. If the authoritative cart changes for any other
//! reason, the buffer drops its edits and resynchronizes.
//!
//! ```text
//!   Clean --edit--> Dirty --commit--> Clean
//!                     |
//!                     +--external change--> Clean
//! ```

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use easykart_core::{Cart, ProductId};

use super::controller::{CartController, CartSubscription};

/// How the buffer decides that it holds something worth committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirtyPolicy {
    /// Dirty only while some staged quantity differs from the cart.
    #[default]
    ValueDiff,
    /// Dirty after any accepted edit, even one that restores the original.
    AnyTouch,
}

/// Errors from staged edit operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StagedEditError {
    /// Commit was requested while the buffer matches the cart.
    #[error("No staged changes to commit")]
    NothingToCommit,
}

/// Page-scoped working copy of the cart.
pub struct StagedEdits {
    policy: DirtyPolicy,
    baseline: Cart,
    staged: BTreeMap<ProductId, u32>,
    touched: bool,
    subscription: CartSubscription,
}

impl StagedEdits {
    /// Open a buffer against the controller's current cart.
    #[must_use]
    pub fn open(controller: &CartController) -> Self {
        Self::with_policy(controller, DirtyPolicy::default())
    }

    /// Open a buffer with an explicit dirty-detection policy.
    #[must_use]
    pub fn with_policy(controller: &CartController, policy: DirtyPolicy) -> Self {
        let mut subscription = controller.subscribe();
        let baseline = subscription.latest();
        let staged = staged_from(&baseline);
        Self {
            policy,
            baseline,
            staged,
            touched: false,
            subscription,
        }
    }

    /// Resynchronize if the authoritative cart changed underneath the buffer.
    ///
    /// Staged edits are discarded. Returns `true` if a resync happened.
    pub fn sync(&mut self) -> bool {
        if !self.subscription.has_changed() {
            return false;
        }
        let latest = self.subscription.latest();
        self.reset_to(latest);
        debug!("Authoritative cart changed, staged edits discarded");
        true
    }

    /// Stage a raw quantity for a product already in the buffer.
    ///
    /// Input that does not parse as a non-negative integer is ignored and the
    /// previous staged value kept. A staged `0` removes the line on commit.
    /// Returns whether the edit was accepted.
    pub fn set_local_quantity(&mut self, id: &ProductId, raw: &str) -> bool {
        self.sync();

        let Ok(value) = raw.trim().parse::<u32>() else {
            debug!(product_id = %id, "Ignoring non-numeric quantity");
            return false;
        };
        let Some(slot) = self.staged.get_mut(id) else {
            debug!(product_id = %id, "Ignoring edit for product not in view");
            return false;
        };

        *slot = value;
        self.touched = true;
        true
    }

    /// The staged quantity for a product.
    #[must_use]
    pub fn quantity(&self, id: &ProductId) -> Option<u32> {
        self.staged.get(id).copied()
    }

    /// The cart this buffer was last synchronized to.
    #[must_use]
    pub const fn baseline(&self) -> &Cart {
        &self.baseline
    }

    /// Whether a commit is currently allowed.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        match self.policy {
            DirtyPolicy::AnyTouch => self.touched,
            DirtyPolicy::ValueDiff => self.staged != staged_from(&self.baseline),
        }
    }

    /// Push the staged quantities to the controller and return to clean.
    ///
    /// # Errors
    ///
    /// Returns `StagedEditError::NothingToCommit` if the buffer is clean,
    /// including when an external change just reset it.
    pub fn commit(&mut self, controller: &mut CartController) -> Result<(), StagedEditError> {
        self.sync();
        if !self.is_dirty() {
            return Err(StagedEditError::NothingToCommit);
        }

        let next = Cart::from_quantities(self.staged.clone());
        controller.replace_cart(next);
        // Our own write: adopt it without treating it as an external change.
        let committed = self.subscription.latest();
        self.reset_to(committed);
        Ok(())
    }

    fn reset_to(&mut self, cart: Cart) {
        self.staged = staged_from(&cart);
        self.baseline = cart;
        self.touched = false;
    }
}

fn staged_from(cart: &Cart) -> BTreeMap<ProductId, u32> {
    cart.iter().map(|(id, q)| (id.clone(), q.get())).collect()
}
