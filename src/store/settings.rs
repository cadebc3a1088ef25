use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::StoreError;
use crate::host::KeyValueStore;

/// Storage key holding the settings object.
pub const SETTINGS_KEY: &str = "prototyper-settings";

/// Options recognized by the engine. Anything else found in storage is pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    EmmetEnabled,
    Es6Enabled,
    ChromePrivilegeEnabled,
}

impl SettingKey {
    pub const ALL: [SettingKey; 3] = [
        SettingKey::EmmetEnabled,
        SettingKey::Es6Enabled,
        SettingKey::ChromePrivilegeEnabled,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmmetEnabled => "emmet-enabled",
            Self::Es6Enabled => "es6-enabled",
            Self::ChromePrivilegeEnabled => "chrome-privilege-enabled",
        }
    }

    pub const fn default_value(self) -> SettingValue {
        match self {
            Self::EmmetEnabled => SettingValue::Bool(true),
            Self::Es6Enabled | Self::ChromePrivilegeEnabled => SettingValue::Bool(false),
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown setting `{s}`"))
    }
}

/// A setting value: options are booleans today, strings are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Text(String),
}

impl SettingValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(_) => None,
        }
    }

    /// Parse a command-line value: `true`/`false` become booleans.
    pub fn parse(s: &str) -> Self {
        match s {
            "true" | "on" | "yes" => Self::Bool(true),
            "false" | "off" | "no" => Self::Bool(false),
            other => Self::Text(other.to_string()),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Typed snapshot of the recognized settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub emmet_enabled: bool,
    pub es6_enabled: bool,
    pub chrome_privilege_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            emmet_enabled: true,
            es6_enabled: false,
            chrome_privilege_enabled: false,
        }
    }
}

impl Settings {
    fn apply(&mut self, key: SettingKey, value: &SettingValue) {
        let flag = value
            .as_bool()
            .or_else(|| key.default_value().as_bool())
            .unwrap_or(false);
        match key {
            SettingKey::EmmetEnabled => self.emmet_enabled = flag,
            SettingKey::Es6Enabled => self.es6_enabled = flag,
            SettingKey::ChromePrivilegeEnabled => self.chrome_privilege_enabled = flag,
        }
    }
}

/// Settings persisted as one object under [`SETTINGS_KEY`].
///
/// Reads materialize missing keys: the first `get` of an absent option
/// writes its default. Every `set` is persisted before returning.
pub struct SettingsStore {
    kv: Arc<dyn KeyValueStore>,
    values: Mutex<Map<String, Value>>,
}

impl SettingsStore {
    /// Load settings, writing the defaults when nothing is persisted yet.
    pub fn load(kv: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let values = match kv.get_item(SETTINGS_KEY)? {
            Some(Value::Object(mut map)) => {
                map.retain(|key, _| {
                    let known = key.parse::<SettingKey>().is_ok();
                    if !known {
                        crate::debug!("settings"; "dropping unrecognized setting `{}`", key);
                    }
                    known
                });
                map
            }
            stored => {
                if stored.is_some() {
                    crate::log!("settings"; "stored settings are not an object, using defaults");
                }
                let defaults = default_map();
                kv.set_item(SETTINGS_KEY, Value::Object(defaults.clone()))?;
                defaults
            }
        };

        Ok(Self {
            kv,
            values: Mutex::new(values),
        })
    }

    /// Current value of `key`, persisting the default first if it is absent.
    pub fn get(&self, key: SettingKey) -> Result<SettingValue, StoreError> {
        let mut values = self.values.lock();
        if let Some(value) = values.get(key.as_str()).and_then(from_json) {
            return Ok(value);
        }

        let value = key.default_value();
        values.insert(key.as_str().to_string(), value.to_json());
        self.kv
            .set_item(SETTINGS_KEY, Value::Object(values.clone()))?;
        Ok(value)
    }

    pub fn set(&self, key: SettingKey, value: impl Into<SettingValue>) -> Result<(), StoreError> {
        let value = value.into();
        let mut values = self.values.lock();
        values.insert(key.as_str().to_string(), value.to_json());
        self.kv.set_item(SETTINGS_KEY, Value::Object(values.clone()))?;
        crate::debug!("settings"; "{} = {}", key, value);
        Ok(())
    }

    /// Typed view of all recognized settings.
    pub fn snapshot(&self) -> Result<Settings, StoreError> {
        let mut settings = Settings::default();
        for key in SettingKey::ALL {
            settings.apply(key, &self.get(key)?);
        }
        Ok(settings)
    }

    /// Keys currently held in memory (after pruning), in storage order.
    pub fn keys(&self) -> Vec<String> {
        self.values.lock().keys().cloned().collect()
    }
}

fn from_json(value: &Value) -> Option<SettingValue> {
    match value {
        Value::Bool(b) => Some(SettingValue::Bool(*b)),
        Value::String(s) => Some(SettingValue::Text(s.clone())),
        _ => None,
    }
}

fn default_map() -> Map<String, Value> {
    SettingKey::ALL
        .into_iter()
        .map(|key| (key.as_str().to_string(), key.default_value().to_json()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_defaults_written_on_first_load() {
        let kv = Arc::new(MemoryStore::new());
        let store = SettingsStore::load(kv.clone()).unwrap();

        assert_eq!(kv.writes(), 1);
        assert_eq!(
            kv.get_item(SETTINGS_KEY).unwrap(),
            Some(json!({
                "emmet-enabled": true,
                "es6-enabled": false,
                "chrome-privilege-enabled": false,
            }))
        );
        assert_eq!(store.snapshot().unwrap(), Settings::default());
        assert_eq!(kv.writes(), 1);
    }

    #[test]
    fn test_set_then_get_round_trip() {
        let kv = Arc::new(MemoryStore::new());
        let store = SettingsStore::load(kv.clone()).unwrap();

        store.set(SettingKey::Es6Enabled, true).unwrap();
        assert_eq!(store.get(SettingKey::Es6Enabled).unwrap(), SettingValue::Bool(true));

        let reloaded = SettingsStore::load(kv).unwrap();
        assert!(reloaded.snapshot().unwrap().es6_enabled);
    }

    #[test]
    fn test_unrecognized_keys_pruned_on_load() {
        let kv = Arc::new(MemoryStore::new().with_item(
            SETTINGS_KEY,
            json!({"es6-enabled": true, "legacy-theme": "dark"}),
        ));
        let store = SettingsStore::load(kv).unwrap();

        assert_eq!(store.keys(), vec!["es6-enabled".to_string()]);
    }

    #[test]
    fn test_missing_key_materialized_once() {
        let kv = Arc::new(MemoryStore::new().with_item(SETTINGS_KEY, json!({"es6-enabled": true})));
        let store = SettingsStore::load(kv.clone()).unwrap();
        assert_eq!(kv.writes(), 0);

        assert_eq!(store.get(SettingKey::EmmetEnabled).unwrap(), SettingValue::Bool(true));
        assert_eq!(kv.writes(), 1);
        assert_eq!(store.get(SettingKey::EmmetEnabled).unwrap(), SettingValue::Bool(true));
        assert_eq!(kv.writes(), 1);

        let stored = kv.get_item(SETTINGS_KEY).unwrap().unwrap();
        assert_eq!(stored["emmet-enabled"], json!(true));
        assert_eq!(stored["es6-enabled"], json!(true));
    }

    #[test]
    fn test_non_object_settings_replaced_by_defaults() {
        let kv = Arc::new(MemoryStore::new().with_item(SETTINGS_KEY, json!("garbage")));
        let store = SettingsStore::load(kv.clone()).unwrap();
        assert_eq!(kv.writes(), 1);
        assert_eq!(store.snapshot().unwrap(), Settings::default());
    }

    #[test]
    fn test_setting_value_parse() {
        assert_eq!(SettingValue::parse("true"), SettingValue::Bool(true));
        assert_eq!(SettingValue::parse("off"), SettingValue::Bool(false));
        assert_eq!(
            SettingValue::parse("dark"),
            SettingValue::Text("dark".to_string())
        );
        assert!("es7-enabled".parse::<SettingKey>().is_err());
    }
}
