//! `[export]` section configuration.
//!
//! ```toml
//! [export]
//! output = "dist"
//!
//! [export.targets.local]
//! kind = "local"
//! mode = "single"               # or "archive" (default)
//!
//! [export.targets.paste]
//! kind = "form"
//! url = "https://paste.example/new"
//! encoding = "json"             # or "fields" (default)
//!
//! [export.targets.gist]
//! kind = "api"
//! url = "https://api.github.com/gists"
//! token_env = "GITHUB_TOKEN"
//! ```
//!
//! Configured targets replace built-ins of the same id.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::export::{FormEncoding, LocalMode};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory local exports are saved to, relative to the project root.
    pub output: PathBuf,
    pub targets: BTreeMap<String, TargetConfig>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("."),
            targets: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TargetConfig {
    Local {
        #[serde(default)]
        mode: LocalMode,
        #[serde(default)]
        filename: Option<String>,
    },
    Form {
        #[serde(default)]
        url: Option<String>,
        #[serde(default = "default_method")]
        method: String,
        #[serde(default)]
        encoding: FormEncoding,
    },
    Api {
        url: String,
        #[serde(default = "default_filename")]
        filename: String,
        #[serde(default = "default_public")]
        public: bool,
        /// Environment variable holding the bearer token.
        #[serde(default)]
        token_env: Option<String>,
    },
}

fn default_method() -> String {
    "post".to_string()
}

fn default_filename() -> String {
    "prototype.html".to_string()
}

const fn default_public() -> bool {
    true
}
