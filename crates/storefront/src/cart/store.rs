//! Durable local stores for the cart snapshot.
//!
//! The cart treats the store as a cache of its in-memory state: the whole
//! snapshot is serialized to JSON and written under one fixed key after every
//! mutation, and read back once when a cart is constructed.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use shopfront_core::{CartLineItem, CartSnapshot};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// Default key the cart snapshot is stored under.
pub const DEFAULT_CART_KEY: &str = "cart";

/// Errors from durable store access.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing medium failed.
    #[error("Store I/O error: {0}")]
    Io(#[from] io::Error),

    /// The snapshot could not be encoded or decoded.
    #[error("Store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The key cannot be mapped onto the backing medium.
    #[error("Invalid store key: {0}")]
    InvalidKey(String),
}

/// A string key-value store that survives page reloads.
pub trait CartStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing medium cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backing medium cannot be written.
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Load the snapshot stored under `key`.
///
/// A missing value, an unreadable store and malformed JSON all yield an empty
/// cart; failures are logged.
pub fn load_snapshot(store: &dyn CartStore, key: &str) -> CartSnapshot {
    match store.read(key) {
        Ok(Some(raw)) => match serde_json::from_str::<CartSnapshot>(&raw) {
            Ok(snapshot) => {
                debug!(key, items = snapshot.items.len(), "Loaded cart from storage");
                snapshot
            }
            Err(e) => {
                warn!(key, error = %e, "Failed to parse stored cart, starting empty");
                CartSnapshot::default()
            }
        },
        Ok(None) => CartSnapshot::default(),
        Err(e) => {
            warn!(key, error = %e, "Failed to load cart from storage, starting empty");
            CartSnapshot::default()
        }
    }
}

/// Borrowed form of [`CartSnapshot`], so the cart can persist without
/// cloning its items.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    items: &'a [CartLineItem],
}

/// Serialize `items` in the snapshot layout and write them under `key`.
///
/// # Errors
///
/// Returns `StoreError` if encoding or the write fails.
pub fn save_items(
    store: &dyn CartStore,
    key: &str,
    items: &[CartLineItem],
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(&SnapshotRef { items })?;
    store.write(key, &raw)
}

// =============================================================================
// MemoryStore
// =============================================================================

/// Session-lifetime store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value, as if a previous page session had written it.
    #[must_use]
    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
        self
    }
}

impl CartStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// Store keeping one `<key>.json` file per key in a directory.
///
/// Writes go to a temporary file in the same directory that is then renamed
/// over the target, so readers never observe a half-written snapshot.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl CartStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(value.as_bytes())?;
        file.flush()?;
        file.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use shopfront_core::ProductSummary;

    use super::*;

    struct BrokenStore;

    impl CartStore for BrokenStore {
        fn read(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Io(io::Error::other("disk on fire")))
        }

        fn write(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io(io::Error::other("disk on fire")))
        }
    }

    fn snapshot() -> CartSnapshot {
        CartSnapshot::new(vec![CartLineItem::new(
            ProductSummary::new("P1", "Widget", Decimal::new(10, 0)),
            2,
        )])
    }

    #[test]
    fn test_load_missing_is_empty() {
        let store = MemoryStore::new();
        assert!(load_snapshot(&store, DEFAULT_CART_KEY).items.is_empty());
    }

    #[test]
    fn test_load_malformed_is_empty() {
        let store = MemoryStore::new().with_entry(DEFAULT_CART_KEY, "{not json");
        assert!(load_snapshot(&store, DEFAULT_CART_KEY).items.is_empty());
    }

    #[test]
    fn test_load_read_failure_is_empty() {
        assert!(load_snapshot(&BrokenStore, DEFAULT_CART_KEY).items.is_empty());
    }

    #[test]
    fn test_save_then_load_memory() {
        let store = MemoryStore::new();
        let snapshot = snapshot();
        save_items(&store, DEFAULT_CART_KEY, &snapshot.items).unwrap();
        assert_eq!(load_snapshot(&store, DEFAULT_CART_KEY), snapshot);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = snapshot();

        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.read(DEFAULT_CART_KEY).unwrap(), None);
        save_items(&store, DEFAULT_CART_KEY, &snapshot.items).unwrap();

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(load_snapshot(&reopened, DEFAULT_CART_KEY), snapshot);
        assert!(dir.path().join("cart.json").exists());
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.write("../escape", "{}"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(store.read(""), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn test_save_failure_is_reported() {
        assert!(save_items(&BrokenStore, DEFAULT_CART_KEY, &snapshot().items).is_err());
    }
}
