//! Change notifications and the subscriber registry.
//!
//! Subscribers are stored under capability tokens rather than compared by
//! reference, so registering the same callback twice yields two independent
//! registrations.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::Serialize;
use shopfront_core::{CartLineItem, ProductSummary};
use thiserror::Error;
use tracing::error;

/// Kind of mutation that triggered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CartAction {
    Add,
    Update,
    Remove,
    Clear,
}

impl fmt::Display for CartAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Update => write!(f, "update"),
            Self::Remove => write!(f, "remove"),
            Self::Clear => write!(f, "clear"),
        }
    }
}

/// Payload attached to a notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventData {
    /// The product that was added.
    Product(ProductSummary),
    /// The line item that was updated or removed.
    Item(CartLineItem),
    /// No payload (`clear`).
    None,
}

/// Notification delivered to every subscriber after a mutation.
///
/// Serializes as `{"action": ..., "data": ..., "items": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartEvent {
    pub action: CartAction,
    pub data: EventData,
    /// Cart contents after the mutation.
    pub items: Vec<CartLineItem>,
}

/// Failure reported by a subscriber.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Subscriber callback.
pub type Listener = Arc<dyn Fn(&CartEvent) -> Result<(), ListenerError> + Send + Sync>;

/// Token identifying one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Ordered set of subscribers keyed by token.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<SubscriptionId, Listener>>,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `listener`, returning the capability that removes it again.
    pub fn subscribe(self: &Arc<Self>, listener: Listener) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(id, listener);
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    /// Remove the registration for `id`. Returns whether it was present.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.lock().remove(&id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Deliver `event` to every subscriber in registration order.
    ///
    /// The registry lock is released before any callback runs, so callbacks
    /// may subscribe, unsubscribe or read the cart. A callback that returns
    /// an error or panics is logged and skipped; delivery continues.
    pub fn notify(&self, event: &CartEvent) {
        let listeners: Vec<(SubscriptionId, Listener)> = self
            .lock()
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        for (id, listener) in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(
                        subscription = id.0,
                        action = %event.action,
                        error = %e,
                        "Error in cart listener"
                    );
                }
                Err(_) => {
                    error!(subscription = id.0, action = %event.action, "Cart listener panicked");
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<SubscriptionId, Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish_non_exhaustive()
    }
}

/// Capability to remove one registration.
///
/// Dropping it leaves the listener registered.
#[derive(Debug)]
#[must_use = "dropping a Subscription leaves the listener registered with no way to remove it"]
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove exactly this registration. Returns whether it was still
    /// registered.
    pub fn unsubscribe(self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.unsubscribe(self.id))
    }
}
