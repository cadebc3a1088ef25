//! Persistence for settings and buffers.
//!
//! - `file` - [`JsonFileStore`], the on-disk [`KeyValueStore`]
//! - `settings` - [`SettingsStore`], recognized options with defaults
//! - `buffers` - [`BufferStore`], one text buffer per language

mod buffers;
mod file;
mod settings;

pub use buffers::BufferStore;
pub use file::JsonFileStore;
pub use settings::{SETTINGS_KEY, SettingKey, SettingValue, Settings, SettingsStore};

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::host::KeyValueStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error when accessing `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("store data is not valid JSON")]
    Json(#[from] serde_json::Error),
}

/// In-memory [`KeyValueStore`], counting writes.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<FxHashMap<String, Value>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an item without counting it as a write.
    pub fn with_item(self, key: impl Into<String>, value: Value) -> Self {
        self.items.lock().insert(key.into(), value);
        self
    }

    /// Number of `set_item` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.items.lock().insert(key.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
