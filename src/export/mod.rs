//! Export dispatch.
//!
//! A registry maps target ids to strategies behind one `deliver` call:
//!
//! | Strategy | Transport | Built-in targets |
//! |----------|-----------|------------------|
//! | [`LocalStrategy`] | file save, no network | `local` |
//! | [`FormRelayStrategy`] | hidden form in a new browsing context | `jsfiddle`, `codepen` |
//! | [`ApiStrategy`] | authenticated JSON POST | `gist` |
//!
//! Every export rebuilds from the job's snapshot; nothing is cached.

mod api;
mod form;
mod local;

pub use api::ApiStrategy;
pub use form::{FormEncoding, FormRelayStrategy};
pub use local::{LocalMode, LocalStrategy, build_archive};

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::config::TargetConfig;
use crate::document::{self, Library};
use crate::host::{BrowserError, BrowsingContext, Downloader, HttpClient, TransportError};
use crate::language::Buffers;
use crate::store::{Settings, StoreError};

/// Description attached to form and API exports.
pub const DESCRIPTION: &str = "Prototype created with Prototyper";

pub const JSFIDDLE_URL: &str = "http://jsfiddle.net/api/post/library/pure/";
pub const CODEPEN_URL: &str = "http://codepen.io/pen/define";
pub const GIST_URL: &str = "https://api.github.com/gists";

/// Snapshot handed to a strategy.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub target_id: String,
    pub buffers: Buffers,
    pub settings: Settings,
    pub libraries: Vec<Library>,
}

impl ExportJob {
    pub fn new(target_id: impl Into<String>, buffers: Buffers, settings: Settings) -> Self {
        Self {
            target_id: target_id.into(),
            buffers,
            settings,
            libraries: Vec::new(),
        }
    }

    pub fn with_libraries(mut self, libraries: Vec<Library>) -> Self {
        self.libraries = libraries;
        self
    }

    /// The self-contained document for this snapshot.
    pub fn document(&self) -> String {
        document::build_with_libraries(&self.buffers, &self.settings, &self.libraries)
    }
}

/// What an export did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Saved(PathBuf),
    /// Form handed to a new browsing context; the outcome is not observed
    Submitted,
    /// Remote resource created and opened
    Opened(String),
    /// Nothing to do, e.g. no destination configured
    Skipped,
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved(path) => write!(f, "saved {}", path.display()),
            Self::Submitted => f.write_str("submitted"),
            Self::Opened(url) => write!(f, "opened {url}"),
            Self::Skipped => f.write_str("skipped, no destination"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unknown export target `{0}`")]
    UnknownTarget(String),

    #[error("failed to read buffers")]
    Store(#[from] StoreError),

    #[error("failed to build archive")]
    Archive(#[source] io::Error),

    #[error("failed to save `{0}`")]
    Save(String, #[source] io::Error),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Network(#[from] TransportError),

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16, body: String },

    #[error("response from {0} did not contain `html_url`")]
    InvalidResponse(String),
}

#[async_trait]
pub trait ExportStrategy: Send + Sync {
    async fn deliver(&self, job: &ExportJob) -> Result<Delivery, ExportError>;
}

/// Capabilities the built-in strategies are constructed from.
#[derive(Clone)]
pub struct ExportHosts {
    pub downloader: Arc<dyn Downloader>,
    pub browser: Arc<dyn BrowsingContext>,
    pub http: Arc<dyn HttpClient>,
}

#[derive(Default)]
pub struct ExportDispatcher {
    targets: FxHashMap<String, Arc<dyn ExportStrategy>>,
}

impl ExportDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// `local`, `jsfiddle`, `codepen` and `gist`.
    pub fn builtin(hosts: &ExportHosts) -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(
            "local",
            LocalStrategy::new(LocalMode::Archive, hosts.downloader.clone()),
        );
        dispatcher.register(
            "jsfiddle",
            FormRelayStrategy::new(Some(JSFIDDLE_URL), FormEncoding::Fields, hosts.browser.clone()),
        );
        dispatcher.register(
            "codepen",
            FormRelayStrategy::new(Some(CODEPEN_URL), FormEncoding::Json, hosts.browser.clone()),
        );
        dispatcher.register(
            "gist",
            ApiStrategy::new(GIST_URL, hosts.http.clone(), hosts.browser.clone()),
        );
        dispatcher
    }

    /// Built-ins, then configured targets (which may replace them).
    pub fn from_config(targets: &BTreeMap<String, TargetConfig>, hosts: &ExportHosts) -> Self {
        let mut dispatcher = Self::builtin(hosts);
        for (id, target) in targets {
            crate::debug!("export"; "target `{}` from config", id);
            match target {
                TargetConfig::Local { mode, filename } => {
                    let mut strategy = LocalStrategy::new(*mode, hosts.downloader.clone());
                    if let Some(filename) = filename {
                        strategy = strategy.with_filename(filename);
                    }
                    dispatcher.register(id, strategy);
                }
                TargetConfig::Form {
                    url,
                    method,
                    encoding,
                } => {
                    let strategy = FormRelayStrategy::new(url.as_deref(), *encoding, hosts.browser.clone())
                        .with_method(method);
                    dispatcher.register(id, strategy);
                }
                TargetConfig::Api {
                    url,
                    filename,
                    public,
                    token_env,
                } => {
                    let token = token_env
                        .as_deref()
                        .and_then(|name| std::env::var(name).ok())
                        .filter(|token| !token.is_empty());
                    let strategy = ApiStrategy::new(url, hosts.http.clone(), hosts.browser.clone())
                        .with_filename(filename)
                        .with_public(*public)
                        .with_token(token);
                    dispatcher.register(id, strategy);
                }
            }
        }
        dispatcher
    }

    pub fn register(&mut self, id: impl Into<String>, strategy: impl ExportStrategy + 'static) {
        self.targets.insert(id.into(), Arc::new(strategy));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.targets.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn target_ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.targets.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Run the strategy registered for `job.target_id`.
    pub async fn export_to(&self, job: &ExportJob) -> Result<Delivery, ExportError> {
        let strategy = self
            .targets
            .get(&job.target_id)
            .cloned()
            .ok_or_else(|| ExportError::UnknownTarget(job.target_id.clone()))?;
        crate::debug!("export"; "dispatching `{}`", job.target_id);
        strategy.deliver(job).await
    }
}
