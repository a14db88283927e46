//! Easykart Core - Shared types library.
//!
//! This crate provides the types shared by every Easykart component:
//! - `storefront` - Cart state engine, catalog client and the `easykart` CLI
//!
//! # Architecture
//!
//! The core crate contains only types and pure operations - no I/O, no HTTP
//! clients, no persistence. The cart invariants (no zero quantities, keys
//! removed instead of zeroed) live here so every caller gets them for free.
//!
//! # Modules
//!
//! - [`types`] - Product and user IDs, quantities, the cart map and money

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
