//! Cart state engine.
//!
//! - [`CartController`] owns the authoritative cart and persists every change
//! - [`StagedEdits`] buffers quantity edits until explicitly committed
//! - [`aggregate`] derives line subtotals and cart totals

pub mod aggregate;
mod controller;
mod staged;

pub use aggregate::{CartTotals, ProductLine, compute_totals, join_lines};
pub use controller::{CartController, CartSubscription};
pub use staged::{DirtyPolicy, StagedEditError, StagedEdits};
