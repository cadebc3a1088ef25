use std::sync::Arc;

use serde_json::Value;

use super::StoreError;
use crate::host::KeyValueStore;
use crate::language::{Buffers, Language};

/// Storage key prefix for buffer text.
const BUFFER_PREFIX: &str = "prototyper.";

/// The three source buffers, persisted by language id.
pub struct BufferStore {
    kv: Arc<dyn KeyValueStore>,
}

impl BufferStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn key(language: Language) -> String {
        format!("{BUFFER_PREFIX}{}", language.id())
    }

    /// Buffer text, initializing and persisting an empty buffer on first read.
    pub fn get(&self, language: Language) -> Result<String, StoreError> {
        let key = Self::key(language);
        match self.kv.get_item(&key)? {
            Some(Value::String(text)) => Ok(text),
            _ => {
                self.kv.set_item(&key, Value::String(String::new()))?;
                Ok(String::new())
            }
        }
    }

    pub fn set(&self, language: Language, text: &str) -> Result<(), StoreError> {
        self.kv
            .set_item(&Self::key(language), Value::String(text.to_string()))
    }

    /// Read all three buffers.
    pub fn snapshot(&self) -> Result<Buffers, StoreError> {
        let mut buffers = Buffers::default();
        for language in Language::ALL {
            buffers.set(language, self.get(language)?);
        }
        Ok(buffers)
    }
}
