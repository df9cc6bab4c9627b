//! Shopfront Core - Shared types library.
//!
//! This crate provides common types used across all Shopfront components:
//! - `storefront` - Cart state manager, durable stores and the mock catalog
//! - `cli` - Command-line bindings for browsing the catalog and driving the cart
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no async runtime, no
//! persistence. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, products, and cart line items

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
