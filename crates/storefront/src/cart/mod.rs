//! Shopping cart state manager.
//!
//! # Architecture
//!
//! - In-memory state is the source of truth for the session; the durable
//!   store is a cache rewritten after every mutation.
//! - Every mutation is a two-phase, local-first operation:
//!   1. mutate and persist inside the cart's critical section, then notify
//!      subscribers synchronously;
//!   2. spawn a reconciliation task against the catalog service.
//! - Remote failures are logged for add and remove. A failed update is rolled
//!   back to the previous quantity and re-persisted, and subscribers are
//!   notified again with the restored item.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use shopfront_storefront::cart::{CartManager, MemoryStore};
//!
//! let cart = CartManager::new(Arc::new(MemoryStore::new()), catalog)?;
//! let _badge = cart.subscribe(|event| {
//!     tracing::info!(action = %event.action, "cart changed");
//!     Ok(())
//! });
//!
//! let items = cart.add_item(product, 2)?;
//! cart.update_quantity(&items[0].id, 5)?;
//! cart.settle().await;
//! ```

pub mod events;
pub mod store;
pub mod sync;
pub mod view;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use shopfront_core::{
    CartLineItem, CartSnapshot, LineItemId, ProductId, ProductSummary, subtotal_of,
};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::{CatalogError, CatalogService};
use crate::error::{CartError, Result};

pub use events::{
    CartAction, CartEvent, EventData, Listener, ListenerError, ListenerRegistry, Subscription,
    SubscriptionId,
};
pub use store::{CartStore, DEFAULT_CART_KEY, FileStore, MemoryStore, StoreError};
pub use sync::{Rollback, SyncOutcome, SyncTask};
pub use view::{CartBadge, CartItemView, CartToast, CartView};

// =============================================================================
// CartState
// =============================================================================

/// Items plus per-item revisions used to decide whether a rollback still
/// applies.
#[derive(Debug, Default)]
struct CartState {
    items: Vec<CartLineItem>,
    revisions: HashMap<LineItemId, u64>,
    next_revision: u64,
}

impl CartState {
    /// Build state from a stored snapshot.
    ///
    /// Zero-quantity entries are dropped, duplicate products are merged into
    /// their first entry and an entry reusing another line's id gets a fresh
    /// one, so a tampered snapshot cannot break the cart invariants.
    fn hydrate(snapshot: CartSnapshot) -> Self {
        let mut state = Self::default();
        for mut item in snapshot.items {
            if item.quantity == 0 {
                warn!(item_id = %item.id, "Dropping stored cart item with zero quantity");
                continue;
            }
            if let Some(existing) = state
                .items
                .iter_mut()
                .find(|i| i.product_id == item.product_id)
            {
                warn!(
                    item_id = %item.id,
                    product_id = %item.product_id,
                    "Merging duplicate stored cart item"
                );
                existing.quantity = existing.quantity.saturating_add(item.quantity);
                continue;
            }
            if state.items.iter().any(|i| i.id == item.id) {
                let fresh = LineItemId::generate();
                warn!(
                    item_id = %item.id,
                    fresh_id = %fresh,
                    "Re-keying stored cart item with a colliding id"
                );
                item.id = fresh;
            }
            state.touch(&item.id);
            state.items.push(item);
        }
        state
    }

    /// Record a change to `item_id` and return its new revision.
    fn touch(&mut self, item_id: &LineItemId) -> u64 {
        self.next_revision += 1;
        self.revisions.insert(item_id.clone(), self.next_revision);
        self.next_revision
    }

    fn find_mut(&mut self, item_id: &LineItemId) -> Option<&mut CartLineItem> {
        self.items.iter_mut().find(|item| &item.id == item_id)
    }
}

// =============================================================================
// CartManager
// =============================================================================

/// Owns the cart for one page session.
///
/// Cheaply cloneable via `Arc`; clones share the same cart. Construct one per
/// session at the composition root and hand clones to whatever needs it.
pub struct CartManager<C: CatalogService> {
    inner: Arc<CartInner<C>>,
}

struct CartInner<C> {
    state: Mutex<CartState>,
    store: Arc<dyn CartStore>,
    key: String,
    catalog: C,
    listeners: Arc<ListenerRegistry>,
    runtime: Handle,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl<C: CatalogService> Clone for CartManager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: CatalogService> fmt::Debug for CartManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartManager")
            .field("key", &self.inner.key)
            .field("items", &self.inner.lock_state().items.len())
            .field("listeners", &self.inner.listeners)
            .finish_non_exhaustive()
    }
}

impl<C: CatalogService> CartManager<C> {
    /// Create a cart stored under [`DEFAULT_CART_KEY`], hydrated from `store`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Runtime` if called outside a tokio runtime.
    pub fn new(store: Arc<dyn CartStore>, catalog: C) -> Result<Self> {
        Self::with_key(store, DEFAULT_CART_KEY, catalog)
    }

    /// Create a cart stored under `key`, hydrated from `store`.
    ///
    /// A missing or unreadable snapshot yields an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Runtime` if called outside a tokio runtime.
    pub fn with_key(
        store: Arc<dyn CartStore>,
        key: impl Into<String>,
        catalog: C,
    ) -> Result<Self> {
        let runtime = Handle::try_current()?;
        let key = key.into();
        let state = CartState::hydrate(store::load_snapshot(store.as_ref(), &key));
        info!(key = %key, items = state.items.len(), "Cart initialized");

        Ok(Self {
            inner: Arc::new(CartInner {
                state: Mutex::new(state),
                store,
                key,
                catalog,
                listeners: ListenerRegistry::new(),
                runtime,
                pending: Mutex::new(Vec::new()),
            }),
        })
    }

    /// The catalog service this cart synchronizes with.
    #[must_use]
    pub fn catalog(&self) -> &C {
        &self.inner.catalog
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Add `quantity` units of `product`.
    ///
    /// Increments the existing line for the product, or appends a new line
    /// with a fresh id. The remote add is best-effort: its failure is logged
    /// and the local change stays.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a zero quantity or one whose
    /// line total would overflow, and `CartError::InvalidPrice` for a
    /// negative price.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_item(&self, product: ProductSummary, quantity: u32) -> Result<Vec<CartLineItem>> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        if product.price.is_sign_negative() {
            return Err(CartError::InvalidPrice(product.id));
        }

        let items = self.inner.commit(|state| {
            if let Some(item) = state
                .items
                .iter_mut()
                .find(|item| item.product_id == product.id)
            {
                let total = item.quantity.saturating_add(quantity);
                if item.checked_total_for(total).is_none() {
                    return Err(CartError::InvalidQuantity(quantity));
                }
                item.quantity = total;
                let item_id = item.id.clone();
                state.touch(&item_id);
            } else {
                let item = CartLineItem::new(product.clone(), quantity);
                if item.checked_total_for(quantity).is_none() {
                    return Err(CartError::InvalidQuantity(quantity));
                }
                state.touch(&item.id);
                state.items.push(item);
            }
            Ok(())
        })?;
        debug!(quantity, "Added item to cart");

        let product_id = product.id.clone();
        self.inner.listeners.notify(&CartEvent {
            action: CartAction::Add,
            data: EventData::Product(product),
            items: items.clone(),
        });
        self.spawn_sync(SyncTask::Add {
            product_id,
            quantity,
        });

        Ok(items)
    }

    /// Resolve `product_id` through the catalog, then [`add_item`](Self::add_item).
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the catalog does not know the
    /// product, `CartError::Catalog` if the lookup fails, plus the errors of
    /// `add_item`.
    #[instrument(skip_all, fields(product_id = %product_id, quantity))]
    pub async fn add_product(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Vec<CartLineItem>> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        let product = self
            .inner
            .catalog
            .resolve_product(product_id)
            .await
            .map_err(|e| match e {
                CatalogError::NotFound(id) => CartError::ProductNotFound(id),
                other => CartError::Catalog(other),
            })?;
        self.add_item(product, quantity)
    }

    /// Set the quantity of a line item.
    ///
    /// A quantity of zero or less removes the item instead. If the remote
    /// update fails, the previous quantity is restored, re-persisted and
    /// announced with another `update` notification, unless the item has
    /// been removed or changed again in the meantime.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if no line item has `item_id` and
    /// `CartError::InvalidQuantity` if the line total would overflow; the
    /// cart is left unchanged.
    #[instrument(skip_all, fields(item_id = %item_id, quantity))]
    pub fn update_quantity(
        &self,
        item_id: &LineItemId,
        quantity: i64,
    ) -> Result<Vec<CartLineItem>> {
        if quantity <= 0 {
            return self.remove_item(item_id);
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        let mut change = None;
        let items = self.inner.commit(|state| {
            let item = state
                .find_mut(item_id)
                .ok_or_else(|| CartError::ItemNotFound(item_id.clone()))?;
            if item.checked_total_for(quantity).is_none() {
                return Err(CartError::InvalidQuantity(quantity));
            }
            let previous = item.quantity;
            item.quantity = quantity;
            let updated = item.clone();
            let revision = state.touch(item_id);
            change = Some((updated, previous, revision));
            Ok(())
        })?;

        if let Some((updated, previous, revision)) = change {
            debug!(previous, quantity, "Updated item quantity");
            self.inner.listeners.notify(&CartEvent {
                action: CartAction::Update,
                data: EventData::Item(updated),
                items: items.clone(),
            });
            self.spawn_sync(SyncTask::Update {
                item_id: item_id.clone(),
                quantity,
                previous,
                revision,
            });
        }

        Ok(items)
    }

    /// Remove a line item.
    ///
    /// Removal is final: a failed remote removal is logged and the item stays
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if no line item has `item_id`; the
    /// cart is left unchanged.
    #[instrument(skip_all, fields(item_id = %item_id))]
    pub fn remove_item(&self, item_id: &LineItemId) -> Result<Vec<CartLineItem>> {
        let mut removed = None;
        let items = self.inner.commit(|state| {
            let index = state
                .items
                .iter()
                .position(|item| &item.id == item_id)
                .ok_or_else(|| CartError::ItemNotFound(item_id.clone()))?;
            state.revisions.remove(item_id);
            removed = Some(state.items.remove(index));
            Ok(())
        })?;

        if let Some(removed) = removed {
            debug!(product_id = %removed.product_id, "Removed item from cart");
            self.inner.listeners.notify(&CartEvent {
                action: CartAction::Remove,
                data: EventData::Item(removed),
                items: items.clone(),
            });
            self.spawn_sync(SyncTask::Remove {
                item_id: item_id.clone(),
            });
        }

        Ok(items)
    }

    /// Empty the cart. Local only: no remote call is issued.
    #[instrument(skip(self))]
    pub fn clear_cart(&self) {
        let cleared = self.inner.commit(|state| {
            state.items.clear();
            state.revisions.clear();
            Ok(())
        });

        match cleared {
            Ok(items) => {
                debug!("Cleared cart");
                self.inner.listeners.notify(&CartEvent {
                    action: CartAction::Clear,
                    data: EventData::None,
                    items,
                });
            }
            Err(e) => error!(error = %e, "Failed to clear cart"),
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Current line items in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartLineItem> {
        self.inner.lock_state().items.clone()
    }

    /// A single line item by id.
    #[must_use]
    pub fn item(&self, item_id: &LineItemId) -> Option<CartLineItem> {
        self.inner
            .lock_state()
            .items
            .iter()
            .find(|item| &item.id == item_id)
            .cloned()
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.inner
            .lock_state()
            .items
            .iter()
            .map(|item| u64::from(item.quantity))
            .sum()
    }

    /// Sum of `price * quantity` using the add-time product snapshots,
    /// saturating at `Decimal::MAX`.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        subtotal_of(&self.inner.lock_state().items)
    }

    /// The current contents as a persisted-layout snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot::new(self.items())
    }

    // -------------------------------------------------------------------------
    // Subscribers and reconciliation
    // -------------------------------------------------------------------------

    /// Register a callback invoked after every successful mutation.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&CartEvent) -> std::result::Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(Arc::new(callback))
    }

    /// Register an already shared callback. Registering the same listener
    /// twice yields two independently removable subscriptions.
    pub fn subscribe_listener(&self, listener: Listener) -> Subscription {
        self.inner.listeners.subscribe(listener)
    }

    /// Wait for every reconciliation task spawned so far to finish,
    /// including any rollback it applies.
    pub async fn settle(&self) {
        loop {
            let pending = std::mem::take(&mut *self.inner.lock_pending());
            if pending.is_empty() {
                return;
            }
            for handle in pending {
                if let Err(e) = handle.await {
                    error!(error = %e, "Cart sync task did not complete");
                }
            }
        }
    }

    fn spawn_sync(&self, task: SyncTask) {
        let inner = Arc::clone(&self.inner);
        let handle = self.inner.runtime.spawn(async move {
            let result = task.run(&inner.catalog).await;
            inner.reconcile(&SyncOutcome { task, result });
        });

        let mut pending = self.inner.lock_pending();
        pending.retain(|handle| !handle.is_finished());
        pending.push(handle);
    }
}

impl<C: CatalogService> CartInner<C> {
    fn lock_state(&self) -> MutexGuard<'_, CartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_pending(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `mutate` and persist the result inside the critical section.
    ///
    /// If `mutate` fails nothing is persisted and the state is expected to be
    /// untouched. Returns the post-mutation items.
    fn commit<F>(&self, mutate: F) -> Result<Vec<CartLineItem>>
    where
        F: FnOnce(&mut CartState) -> Result<()>,
    {
        let mut state = self.lock_state();
        mutate(&mut state)?;
        self.persist(&state.items);
        Ok(state.items.clone())
    }

    fn persist(&self, items: &[CartLineItem]) {
        if let Err(e) = store::save_items(self.store.as_ref(), &self.key, items) {
            error!(key = %self.key, error = %e, "Failed to save cart to storage");
        }
    }

    fn reconcile(&self, outcome: &SyncOutcome) {
        let operation = outcome.task.operation();
        let Some(error) = outcome.error() else {
            debug!(operation, "Cart sync acknowledged");
            return;
        };
        let Some(Rollback {
            item_id,
            previous,
            revision,
        }) = outcome.task.rollback()
        else {
            error!(operation, error = %error, "Failed to sync cart with backend");
            return;
        };

        let restored = {
            let mut state = self.lock_state();
            if state.revisions.get(item_id) == Some(&revision) {
                let restored = state.find_mut(item_id).map(|item| {
                    item.quantity = previous;
                    item.clone()
                });
                if restored.is_some() {
                    state.touch(item_id);
                    self.persist(&state.items);
                }
                restored.map(|item| (item, state.items.clone()))
            } else {
                None
            }
        };

        match restored {
            Some((item, items)) => {
                warn!(
                    item_id = %item_id,
                    previous,
                    error = %error,
                    "Cart update rejected, rolled back"
                );
                self.listeners.notify(&CartEvent {
                    action: CartAction::Update,
                    data: EventData::Item(item),
                    items,
                });
            }
            None => {
                warn!(
                    item_id = %item_id,
                    error = %error,
                    "Cart update rejected after item changed, keeping current state"
                );
            }
        }
    }
}
