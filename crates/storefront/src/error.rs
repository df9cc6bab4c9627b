//! Unified error handling for cart operations.
//!
//! Only caller-facing failures live here. Store, remote-sync and listener
//! failures are absorbed inside the cart manager and reported through
//! `tracing`, so they never reach a mutation's caller.

use shopfront_core::{LineItemId, ProductId};
use thiserror::Error;

use crate::catalog::CatalogError;

/// Error returned by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The referenced line item is not in the cart.
    #[error("Item not found in cart: {0}")]
    ItemNotFound(LineItemId),

    /// A quantity that can never be stored was requested.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// The product snapshot carries a negative price.
    #[error("Invalid price for product {0}")]
    InvalidPrice(ProductId),

    /// The catalog does not know the product.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Catalog lookup failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The cart was constructed outside a tokio runtime.
    #[error("Runtime error: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}

impl CartError {
    /// Whether the error points at a stale or wrong reference held by the
    /// caller, as opposed to a collaborator failure.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::ItemNotFound(_)
                | Self::InvalidQuantity(_)
                | Self::InvalidPrice(_)
                | Self::ProductNotFound(_)
        )
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;
