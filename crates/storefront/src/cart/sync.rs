//! Reconciliation tasks carried from a local mutation to the remote service.
//!
//! Each task holds everything needed to compensate on failure, and its result
//! comes back as a value ([`SyncOutcome`]) rather than an error crossing the
//! task boundary.

use shopfront_core::{LineItemId, ProductId};

use crate::catalog::{CatalogService, SyncError};

/// A pending remote acknowledgement for one local mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTask {
    Add {
        product_id: ProductId,
        quantity: u32,
    },
    Update {
        item_id: LineItemId,
        quantity: u32,
        /// Quantity to restore if the remote update fails.
        previous: u32,
        /// Item revision produced by the update; the rollback only applies
        /// while the item is still at this revision.
        revision: u64,
    },
    Remove {
        item_id: LineItemId,
    },
}

impl SyncTask {
    /// Short operation name for logs.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Update { .. } => "update",
            Self::Remove { .. } => "remove",
        }
    }

    /// The local revert a failure of this task calls for, if any. Only
    /// quantity updates are compensated.
    #[must_use]
    pub const fn rollback(&self) -> Option<Rollback<'_>> {
        match self {
            Self::Update {
                item_id,
                previous,
                revision,
                ..
            } => Some(Rollback {
                item_id,
                previous: *previous,
                revision: *revision,
            }),
            Self::Add { .. } | Self::Remove { .. } => None,
        }
    }

    /// Issue the remote call.
    ///
    /// # Errors
    ///
    /// Returns the service's `SyncError` unchanged.
    pub async fn run<C: CatalogService>(&self, catalog: &C) -> Result<(), SyncError> {
        match self {
            Self::Add {
                product_id,
                quantity,
            } => catalog.sync_add(product_id, *quantity).await,
            Self::Update {
                item_id, quantity, ..
            } => catalog.sync_update(item_id, *quantity).await,
            Self::Remove { item_id } => catalog.sync_remove(item_id).await,
        }
    }
}

/// Restore `item_id` to `previous`, provided it is still at `revision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rollback<'a> {
    pub item_id: &'a LineItemId,
    pub previous: u32,
    pub revision: u64,
}

/// A finished task and what the remote side answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub task: SyncTask,
    pub result: Result<(), SyncError>,
}

impl SyncOutcome {
    /// The remote failure, or `None` if the call was acknowledged.
    #[must_use]
    pub const fn error(&self) -> Option<&SyncError> {
        match &self.result {
            Ok(()) => None,
            Err(e) => Some(e),
        }
    }
}
