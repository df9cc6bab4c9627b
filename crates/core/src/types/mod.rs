//! Core types for Shopfront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod price;
pub mod product;

pub use cart::{CartLineItem, CartSnapshot, subtotal_of};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use product::{Product, ProductSummary};
