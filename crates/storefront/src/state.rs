//! Application state shared across the page session.

use std::sync::Arc;

use tracing::info;

use crate::cart::{CartManager, CartStore, FileStore, MemoryStore, StoreError};
use crate::catalog::{CatalogError, MockCatalog, SyncFaults, seed_products};
use crate::config::StorefrontConfig;
use crate::error::CartError;

/// Error wiring up the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("cart store: {0}")]
    Store(#[from] StoreError),
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("cart: {0}")]
    Cart(#[from] CartError),
}

/// Application state shared across all consumers.
///
/// This struct is cheaply cloneable via `Arc` and owns the single cart
/// manager for the session together with the store and catalog it uses.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn CartStore>,
    catalog: MockCatalog,
    cart: CartManager<MockCatalog>,
}

impl AppState {
    /// Build the store, catalog and cart manager described by `config`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the store directory cannot be opened, the bundled
    /// catalog data is invalid, or no runtime is available.
    pub fn init(config: StorefrontConfig) -> Result<Self, StateError> {
        let store: Arc<dyn CartStore> = match &config.store_dir {
            Some(dir) => Arc::new(FileStore::open(dir)?),
            None => Arc::new(MemoryStore::new()),
        };
        Self::with_store(config, store)
    }

    /// Like [`init`](Self::init), with an explicit store.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled catalog data is invalid or no runtime
    /// is available.
    pub fn with_store(
        config: StorefrontConfig,
        store: Arc<dyn CartStore>,
    ) -> Result<Self, StateError> {
        let catalog = MockCatalog::with_faults(
            seed_products().map_err(CatalogError::from)?,
            config.latency(),
            config.sync.retry_policy(),
            SyncFaults::with_failure_rate(config.sync.failure_rate),
        );
        let cart =
            CartManager::with_key(Arc::clone(&store), config.cart_key.clone(), catalog.clone())?;

        info!(
            store_dir = ?config.store_dir,
            products = catalog.products().len(),
            "Storefront state initialized"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                catalog,
                cart,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the durable cart store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CartStore> {
        &self.inner.store
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &MockCatalog {
        &self.inner.catalog
    }

    /// Get a reference to the session's cart.
    #[must_use]
    pub fn cart(&self) -> &CartManager<MockCatalog> {
        &self.inner.cart
    }
}
