//! `settings`: list, read and change persisted settings.

use anyhow::{Result, anyhow};

use super::SettingsAction;
use super::common::offline_session;
use crate::config::PrototyperConfig;
use crate::store::{SettingKey, SettingValue};

pub fn run_settings(config: &PrototyperConfig, action: Option<&SettingsAction>) -> Result<()> {
    let session = offline_session(config)?;
    let settings = session.settings();

    match action.unwrap_or(&SettingsAction::List) {
        SettingsAction::List => {
            for key in SettingKey::ALL {
                println!("{} = {}", key, settings.get(key)?);
            }
        }
        SettingsAction::Get { key } => {
            let key: SettingKey = key.parse().map_err(|e: String| anyhow!(e))?;
            println!("{}", settings.get(key)?);
        }
        SettingsAction::Set { key, value } => {
            let key: SettingKey = key.parse().map_err(|e: String| anyhow!(e))?;
            let value = SettingValue::parse(value);
            session.setting_changed(key, value.clone())?;
            crate::log!("settings"; "{} = {}", key, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_persists_to_store() {
        let temp = TempDir::new().unwrap();
        let config = PrototyperConfig {
            root: temp.path().to_path_buf(),
            ..PrototyperConfig::default()
        };

        run_settings(
            &config,
            Some(&SettingsAction::Set {
                key: "es6-enabled".to_string(),
                value: "true".to_string(),
            }),
        )
        .unwrap();

        let session = offline_session(&config).unwrap();
        assert!(session.settings().snapshot().unwrap().es6_enabled);
    }

    #[test]
    fn test_unknown_key_is_error() {
        let temp = TempDir::new().unwrap();
        let config = PrototyperConfig {
            root: temp.path().to_path_buf(),
            ..PrototyperConfig::default()
        };
        let action = SettingsAction::Get {
            key: "dark-mode".to_string(),
        };
        assert!(run_settings(&config, Some(&action)).is_err());
    }
}
