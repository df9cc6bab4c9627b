//! Integration tests for Shopfront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_flow` - Cart manager behaviour end to end against a durable store
//! - `catalog_queries` - Mock catalog listings, suggestions and sync policy
//!
//! This library holds the shared fixtures: a [`ScriptedCatalog`] whose sync
//! calls can be held open and made to fail on demand, and helpers for
//! recording notifications.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rust_decimal::Decimal;
use shopfront_core::{LineItemId, ProductId, ProductSummary};
use shopfront_storefront::cart::{CartEvent, Listener, ListenerError};
use shopfront_storefront::catalog::{CatalogError, CatalogService, SyncError};
use tokio::sync::Semaphore;

/// A sync call observed by [`ScriptedCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncCall {
    Add(ProductId, u32),
    Update(LineItemId, u32),
    Remove(LineItemId),
}

/// Catalog double for cart tests.
///
/// Products resolve to a fixed price. Sync calls are recorded and can be
/// forced to fail per operation or per line item. While held, every sync call
/// waits for a [`release`](Self::release) before answering; calls for an item
/// held with [`hold_item`](Self::hold_item) wait for that item's own
/// [`release_item`](Self::release_item), so items can answer out of order.
#[derive(Debug)]
pub struct ScriptedCatalog {
    fail_add: AtomicBool,
    fail_update: AtomicBool,
    fail_remove: AtomicBool,
    held: AtomicBool,
    gate: Semaphore,
    item_gates: Mutex<HashMap<LineItemId, Arc<Semaphore>>>,
    failing_items: Mutex<HashSet<LineItemId>>,
    calls: Mutex<VecDeque<SyncCall>>,
    answered: Mutex<Vec<SyncCall>>,
}

impl Default for ScriptedCatalog {
    fn default() -> Self {
        Self {
            fail_add: AtomicBool::new(false),
            fail_update: AtomicBool::new(false),
            fail_remove: AtomicBool::new(false),
            held: AtomicBool::new(false),
            gate: Semaphore::new(0),
            item_gates: Mutex::new(HashMap::new()),
            failing_items: Mutex::new(HashSet::new()),
            calls: Mutex::new(VecDeque::new()),
            answered: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with sync calls held until released.
    #[must_use]
    pub fn held() -> Self {
        let catalog = Self::default();
        catalog.held.store(true, Ordering::SeqCst);
        catalog
    }

    pub fn fail_add(&self, fail: bool) {
        self.fail_add.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    pub fn fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    /// Let `count` held sync calls answer.
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    /// Hold sync calls for `item_id` until [`release_item`](Self::release_item).
    pub fn hold_item(&self, item_id: &LineItemId) {
        self.item_gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(item_id.clone(), Arc::new(Semaphore::new(0)));
    }

    /// Let one held sync call for `item_id` answer.
    pub fn release_item(&self, item_id: &LineItemId) {
        if let Some(gate) = self
            .item_gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(item_id)
        {
            gate.add_permits(1);
        }
    }

    /// Fail every sync call for `item_id`, whatever the operation switches say.
    pub fn fail_item(&self, item_id: &LineItemId, fail: bool) {
        let mut failing = self
            .failing_items
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if fail {
            failing.insert(item_id.clone());
        } else {
            failing.remove(item_id);
        }
    }

    /// Sync calls received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<SyncCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Sync calls that have answered, in the order they answered.
    #[must_use]
    pub fn answered(&self) -> Vec<SyncCall> {
        self.answered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn answer(
        &self,
        call: SyncCall,
        item_id: Option<&LineItemId>,
        fail: &AtomicBool,
    ) -> Result<(), SyncError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(call.clone());
        if self.held.load(Ordering::SeqCst) {
            match self.gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(SyncError::Unavailable("gate closed".to_string())),
            }
        }
        let item_gate = item_id.and_then(|id| {
            self.item_gates
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(id)
                .cloned()
        });
        if let Some(gate) = item_gate {
            match gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(SyncError::Unavailable("gate closed".to_string())),
            }
        }

        let item_fails = item_id.is_some_and(|id| {
            self.failing_items
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(id)
        });
        self.answered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        if item_fails || fail.load(Ordering::SeqCst) {
            Err(SyncError::Rejected("scripted failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl CatalogService for ScriptedCatalog {
    async fn resolve_product(&self, product_id: &ProductId) -> Result<ProductSummary, CatalogError> {
        if product_id.as_str().is_empty() {
            return Err(CatalogError::NotFound(product_id.clone()));
        }
        Ok(ProductSummary::new(
            product_id.clone(),
            format!("Product {product_id}"),
            Decimal::new(10, 0),
        ))
    }

    async fn sync_add(&self, product_id: &ProductId, quantity: u32) -> Result<(), SyncError> {
        self.answer(
            SyncCall::Add(product_id.clone(), quantity),
            None,
            &self.fail_add,
        )
        .await
    }

    async fn sync_update(&self, item_id: &LineItemId, quantity: u32) -> Result<(), SyncError> {
        self.answer(
            SyncCall::Update(item_id.clone(), quantity),
            Some(item_id),
            &self.fail_update,
        )
        .await
    }

    async fn sync_remove(&self, item_id: &LineItemId) -> Result<(), SyncError> {
        self.answer(
            SyncCall::Remove(item_id.clone()),
            Some(item_id),
            &self.fail_remove,
        )
        .await
    }
}

/// Product snapshot with a whole-unit price.
#[must_use]
pub fn product(id: &str, price: i64) -> ProductSummary {
    ProductSummary::new(id, format!("Product {id}"), Decimal::new(price, 0))
}

/// Shared log of delivered notifications.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<CartEvent>>>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener appending every notification to this log.
    #[must_use]
    pub fn listener(&self) -> Listener {
        let events = Arc::clone(&self.events);
        Arc::new(move |event: &CartEvent| -> Result<(), ListenerError> {
            events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
            Ok(())
        })
    }

    #[must_use]
    pub fn events(&self) -> Vec<CartEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
