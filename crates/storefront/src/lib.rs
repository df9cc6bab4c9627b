//! Shopfront storefront library.
//!
//! Cart state management with local-first mutations, durable snapshot
//! stores, and the mock catalog service the cart synchronizes with.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod state;
