//! `[project]` section configuration.
//!
//! ```toml
//! [project]
//! html = "index.html"
//! css = "style.css"
//! js = "script.js"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::language::Language;

/// Buffer files, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub html: PathBuf,
    pub css: PathBuf,
    pub js: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            html: PathBuf::from("index.html"),
            css: PathBuf::from("style.css"),
            js: PathBuf::from("script.js"),
        }
    }
}

impl ProjectConfig {
    pub fn file(&self, language: Language) -> &Path {
        match language {
            Language::Markup => &self.html,
            Language::Style => &self.css,
            Language::Script => &self.js,
        }
    }
}
