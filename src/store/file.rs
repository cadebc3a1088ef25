use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};

use super::StoreError;
use crate::host::KeyValueStore;

/// Key-value store persisted as one JSON object on disk.
///
/// The whole object is rewritten on every `set_item`; there is no buffering.
/// A failed write leaves the in-memory view unchanged.
pub struct JsonFileStore {
    path: PathBuf,
    items: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty when the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let items = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Map::new(),
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(StoreError::Io(path, e)),
        };
        crate::debug!("store"; "opened {} ({} keys)", path.display(), items.len());
        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, items: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io(parent.to_path_buf(), e))?;
        }
        let content = serde_json::to_string_pretty(items)?;
        // Write-then-rename so a crash never leaves a truncated store behind
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| StoreError::Io(tmp.clone(), e))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::Io(self.path.clone(), e))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_item(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut items = self.items.lock();
        let mut next = items.clone();
        next.insert(key.to_string(), value);
        self.persist(&next)?;
        *items = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("store.json")).unwrap();
        assert!(store.get_item("prototyper.html").unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_set_item_persists_immediately() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/store.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set_item("prototyper.css", json!("p{color:red}")).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get_item("prototyper.css").unwrap(),
            Some(json!("p{color:red}"))
        );
    }

    #[test]
    fn test_failed_write_keeps_previous_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.set_item("prototyper.js", json!("a()")).unwrap();

        // A directory where the temp file goes makes the write fail
        fs::create_dir(path.with_extension("json.tmp")).unwrap();
        assert!(matches!(
            store.set_item("prototyper.js", json!("b()")),
            Err(StoreError::Io(..))
        ));
        assert!(matches!(
            store.set_item("prototyper.css", json!("p{}")),
            Err(StoreError::Io(..))
        ));

        assert_eq!(store.get_item("prototyper.js").unwrap(), Some(json!("a()")));
        assert!(store.get_item("prototyper.css").unwrap().is_none());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StoreError::Json(_))
        ));
    }
}
