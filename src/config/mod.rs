//! Project configuration management for `prototyper.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── export     # [export] and [export.targets.*]
//! │   ├── preview    # [preview]
//! │   ├── project    # [project]
//! │   └── storage    # [storage]
//! ├── error          # ConfigError, ConfigDiagnostics
//! ├── util           # Config file lookup
//! └── mod.rs         # PrototyperConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section             | Purpose                                         |
//! |---------------------|-------------------------------------------------|
//! | `[project]`         | The three buffer files                          |
//! | `[storage]`         | Key-value store file                            |
//! | `[preview]`         | Preview server, bridge port, prototype URLs     |
//! | `[export]`          | Local output directory and export targets       |

mod error;
pub mod section;
mod util;

pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError};
pub use section::{ExportConfig, PreviewConfig, ProjectConfig, StorageConfig, TargetConfig};
pub use util::find_config_file;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::language::Language;
use util::is_http_url;

/// Default config file name.
pub const CONFIG_FILE: &str = "prototyper.toml";

/// Root configuration structure representing `prototyper.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PrototyperConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory, parent of the config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    pub project: ProjectConfig,
    pub storage: StorageConfig,
    pub preview: PreviewConfig,
    pub export: ExportConfig,
}

impl PrototyperConfig {
    /// Load configuration, searching upward from the working directory.
    ///
    /// Without a config file, defaults apply and the working directory is
    /// the project root.
    pub fn load(config_name: &Path) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir()
            .map_err(|err| ConfigError::Io(PathBuf::from("."), err))?;

        let config = match find_config_file(config_name) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                config.config_path = path;
                config
            }
            None => {
                crate::debug!("config"; "no {} found, using defaults", config_name.display());
                Self {
                    config_path: cwd.join(config_name),
                    root: cwd,
                    ..Self::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        crate::log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {field}");
        }
    }

    /// Collect every validation error and report them at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();
        let preview = &self.preview;

        if preview.port == 0 {
            diag.error_with_hint("preview.port", "must not be 0", "use e.g. 5280");
        }
        if preview.ws_port == 0 {
            diag.error_with_hint("preview.ws_port", "must not be 0", "use e.g. 35730");
        }
        for (field, path) in [
            ("preview.path", &preview.path),
            ("preview.privileged_path", &preview.privileged_path),
        ] {
            if !path.starts_with('/') {
                diag.error(field, format!("`{path}` must start with `/`"));
            }
        }
        if preview.path.trim_end_matches('/') == preview.privileged_path.trim_end_matches('/') {
            diag.error(
                "preview.privileged_path",
                "must differ from `preview.path`",
            );
        }
        if preview.ready_timeout_secs == 0 {
            diag.error("preview.ready_timeout_secs", "must be at least 1");
        }

        for (id, target) in &self.export.targets {
            let field = format!("export.targets.{id}");
            match target {
                TargetConfig::Api { url, .. } if url.trim().is_empty() => {
                    diag.error_with_hint(
                        format!("{field}.url"),
                        "api targets need a url",
                        "e.g. url = \"https://api.github.com/gists\"",
                    );
                }
                TargetConfig::Api { url, .. } | TargetConfig::Form { url: Some(url), .. }
                    if !url.is_empty() && !is_http_url(url) =>
                {
                    diag.error(format!("{field}.url"), format!("`{url}` is not an http(s) url"));
                }
                _ => {}
            }
        }

        diag.into_result()
    }

    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Join a path with the root directory.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Absolute path of the file backing `language`.
    pub fn buffer_path(&self, language: Language) -> PathBuf {
        self.root_join(self.project.file(language))
    }

    pub fn store_path(&self) -> PathBuf {
        self.root_join(&self.storage.path)
    }

    pub fn export_dir(&self) -> PathBuf {
        self.root_join(&self.export.output)
    }

    /// Scratch directory for form relay pages, next to the store file.
    pub fn relay_dir(&self) -> PathBuf {
        let store = self.store_path();
        store
            .parent()
            .map_or_else(|| self.root.clone(), Path::to_path_buf)
            .join("relay")
    }
}

/// Parse config, panicking on unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> PrototyperConfig {
    let (parsed, ignored) = PrototyperConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{FormEncoding, LocalMode};
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(PrototyperConfig::from_str("[preview\nport = 1").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = test_parse_config("");

        assert_eq!(config.project.html, PathBuf::from("index.html"));
        assert_eq!(config.storage.path, PathBuf::from(".prototyper/store.json"));
        assert_eq!(config.preview.interface, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.preview.port, 5280);
        assert_eq!(config.preview.ws_port, 35730);
        assert_eq!(config.preview.path, "/prototype");
        assert!(config.preview.open_browser);
        assert!(config.export.targets.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sections_and_targets() {
        let config = test_parse_config(
            r#"
[project]
css = "styles/main.css"

[preview]
port = 8080
libraries = ["https://code.jquery.com/jquery-3.7.1.min.js"]

[export]
output = "dist"

[export.targets.local]
kind = "local"
mode = "single"

[export.targets.paste]
kind = "form"
url = "https://paste.example/new"
encoding = "json"

[export.targets.gist]
kind = "api"
url = "https://api.github.com/gists"
token_env = "GITHUB_TOKEN"
"#,
        );

        assert_eq!(config.project.file(Language::Style), Path::new("styles/main.css"));
        assert_eq!(config.project.file(Language::Script), Path::new("script.js"));
        assert_eq!(config.preview.port, 8080);
        assert_eq!(config.preview.libraries().len(), 1);
        assert_eq!(config.export.output, PathBuf::from("dist"));

        assert_eq!(
            config.export.targets["local"],
            TargetConfig::Local {
                mode: LocalMode::Single,
                filename: None
            }
        );
        assert_eq!(
            config.export.targets["paste"],
            TargetConfig::Form {
                url: Some("https://paste.example/new".to_string()),
                method: "post".to_string(),
                encoding: FormEncoding::Json,
            }
        );
        assert_eq!(
            config.export.targets["gist"],
            TargetConfig::Api {
                url: "https://api.github.com/gists".to_string(),
                filename: "prototype.html".to_string(),
                public: true,
                token_env: Some("GITHUB_TOKEN".to_string()),
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[preview]\nport = 9000\nprot = 1\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = PrototyperConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.preview.port, 9000);
        assert!(ignored.iter().any(|f| f == "preview.prot"));
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_unknown_target_kind_is_error() {
        let content = "[export.targets.x]\nkind = \"ftp\"";
        assert!(PrototyperConfig::parse_with_ignored(content).is_err());
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let config = test_parse_config(
            r#"
[preview]
port = 0
path = "prototype"
privileged_path = "prototype"

[export.targets.gist]
kind = "api"
url = ""

[export.targets.paste]
kind = "form"
url = "not a url"
"#,
        );

        let Err(ConfigError::Diagnostics(diag)) = config.validate() else {
            panic!("expected diagnostics");
        };
        let fields: Vec<_> = diag.errors().iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"preview.port"));
        assert!(fields.contains(&"preview.path"));
        assert!(fields.contains(&"preview.privileged_path"));
        assert!(fields.contains(&"export.targets.gist.url"));
        assert!(fields.contains(&"export.targets.paste.url"));
    }

    #[test]
    fn test_empty_form_url_is_valid() {
        let config = test_parse_config("[export.targets.paste]\nkind = \"form\"\nurl = \"\"");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_paths_join_root() {
        let config = PrototyperConfig {
            root: PathBuf::from("/work/demo"),
            ..PrototyperConfig::default()
        };
        assert_eq!(
            config.buffer_path(Language::Markup),
            PathBuf::from("/work/demo/index.html")
        );
        assert_eq!(
            config.store_path(),
            PathBuf::from("/work/demo/.prototyper/store.json")
        );
        assert_eq!(config.export_dir(), PathBuf::from("/work/demo/."));
        assert_eq!(
            config.relay_dir(),
            PathBuf::from("/work/demo/.prototyper/relay")
        );
    }
}
