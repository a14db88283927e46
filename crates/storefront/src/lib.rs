//! Easykart Storefront library.
//!
//! The cart and session state engine behind the `easykart` client:
//!
//! - [`store`] - Durable key-value storage for the cart and credential token
//! - [`cart`] - Cart controller, staged edits and totals
//! - [`catalog`] - Product lookups with caching and stale-batch protection
//! - [`session`] - Current user resolved from the stored token at startup
//! - [`app`] - The [`app::Storefront`] context tying them together

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod session;
pub mod store;
