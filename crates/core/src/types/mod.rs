//! Core types for Easykart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod price;

pub use cart::{Cart, Quantity};
pub use id::*;
pub use price::{CurrencyCode, Money};
