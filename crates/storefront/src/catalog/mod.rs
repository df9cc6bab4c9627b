//! Catalog and remote cart-sync service.
//!
//! # Architecture
//!
//! - [`CatalogService`] is the seam the cart manager consults: it resolves
//!   product ids and acknowledges add/update/remove operations, each of which
//!   may fail asynchronously.
//! - [`MockCatalog`] answers with canned product data after artificial
//!   delays, mirroring the page's mock API.
//! - Timeout and retry behaviour belongs to the service ([`RetryPolicy`]), not
//!   to the cart.
//!
//! # Example
//!
//! ```rust,ignore
//! use shopfront_storefront::catalog::{Latency, MockCatalog, ProductFilter, RetryPolicy};
//!
//! let catalog = MockCatalog::seeded(Latency::simulated(), RetryPolicy::default())?;
//!
//! let electronics = catalog
//!     .fetch_products(&ProductFilter::default().category("electronics").limit(4))
//!     .await;
//! let suggestions = catalog.search_suggestions("head").await;
//! ```

mod filter;
mod mock;
mod retry;

use std::future::Future;
use std::time::Duration;

use shopfront_core::{LineItemId, ProductId, ProductSummary};
use thiserror::Error;

pub use filter::ProductFilter;
pub use mock::{Latency, MockCatalog, SyncFaults, seed_products};
pub use retry::RetryPolicy;

/// Errors from catalog queries.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The product id is unknown to the catalog.
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// The catalog could not be reached or answered with an error.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    /// The bundled product data could not be parsed.
    #[error("Invalid catalog data: {0}")]
    InvalidSeed(#[from] serde_json::Error),
}

/// Errors from remote cart synchronization.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// The remote side refused the operation.
    #[error("Sync rejected: {0}")]
    Rejected(String),

    /// An attempt exceeded the policy timeout.
    #[error("Sync timed out after {0:?}")]
    Timeout(Duration),

    /// The remote side could not be reached.
    #[error("Sync unavailable: {0}")]
    Unavailable(String),
}

/// Remote catalog and cart-sync collaborator used by the cart manager.
///
/// Every method may fail; the cart decides what a failure means (log only for
/// add and remove, rollback for update).
pub trait CatalogService: Send + Sync + 'static {
    /// Resolve a product id to the snapshot stored in a line item.
    fn resolve_product(
        &self,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<ProductSummary, CatalogError>> + Send;

    /// Acknowledge that `quantity` units of a product were added.
    fn sync_add(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Acknowledge a new quantity for a line item.
    fn sync_update(
        &self,
        item_id: &LineItemId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Acknowledge the removal of a line item.
    fn sync_remove(&self, item_id: &LineItemId)
    -> impl Future<Output = Result<(), SyncError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::NotFound(ProductId::new("B00"));
        assert_eq!(err.to_string(), "Product not found: B00");
    }

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "Sync timed out after 5s");

        let err = SyncError::Rejected("update".to_string());
        assert_eq!(err.to_string(), "Sync rejected: update");
    }
}
