//! Shared helpers for CLI commands.

use std::fs;
use std::io::ErrorKind;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::PrototyperConfig;
use crate::export::{ExportDispatcher, ExportHosts};
use crate::host::desktop::{DesktopBrowser, DirectoryDownloader};
use crate::host::http::ReqwestClient;
use crate::host::{BrowsingContext, SurfaceError, SurfaceHandle, SurfaceHost, SurfacePort};
use crate::language::Language;
use crate::session::{Session, SessionParts};
use crate::store::JsonFileStore;

/// Single-threaded runtime driving the session.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")
}

/// Build a session over the project's store and export targets.
pub fn open_session(
    config: &PrototyperConfig,
    surfaces: Arc<dyn SurfaceHost>,
    browser: Arc<dyn BrowsingContext>,
) -> Result<Session> {
    let kv = JsonFileStore::open(config.store_path())
        .with_context(|| format!("failed to open store `{}`", config.store_path().display()))?;
    let hosts = ExportHosts {
        downloader: Arc::new(DirectoryDownloader::new(config.export_dir())),
        browser,
        http: Arc::new(ReqwestClient::new()?),
    };

    let session = Session::new(SessionParts {
        kv: Arc::new(kv),
        surfaces,
        exports: ExportDispatcher::from_config(&config.export.targets, &hosts),
        highlighter: None,
        urls: config.preview.urls(),
        libraries: config.preview.libraries(),
        ready_timeout: config.preview.ready_timeout(),
    })?;
    Ok(session)
}

/// Session for commands that never show a preview.
pub fn offline_session(config: &PrototyperConfig) -> Result<Session> {
    open_session(
        config,
        Arc::new(NoSurfaces),
        Arc::new(DesktopBrowser::with_relay_dir(config.relay_dir())),
    )
}

/// Copy the buffer files into the store. Missing files keep the stored text.
pub fn ingest_buffers(session: &Session, config: &PrototyperConfig) -> Result<()> {
    for language in Language::ALL {
        let path = config.buffer_path(language);
        match fs::read_to_string(&path) {
            Ok(text) => session.buffers().set(language, &text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                crate::debug!("store"; "{} not found, keeping stored {}", path.display(), language);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read `{}`", path.display()));
            }
        }
    }
    Ok(())
}

/// Surface host for commands without a preview server.
struct NoSurfaces;

#[async_trait]
impl SurfaceHost for NoSurfaces {
    async fn open(&self, _url: &str, _in_new_window: bool) -> Result<SurfaceHandle, SurfaceError> {
        Err(SurfaceError::Open("no preview server running, use `prototyper serve`".into()))
    }

    async fn navigate(&self, handle: SurfaceHandle, _url: &str) -> Result<(), SurfaceError> {
        Err(SurfaceError::Closed(handle))
    }

    async fn reload(&self, handle: SurfaceHandle) -> Result<(), SurfaceError> {
        Err(SurfaceError::Closed(handle))
    }

    async fn ready(&self, handle: SurfaceHandle) -> Result<(), SurfaceError> {
        Err(SurfaceError::Closed(handle))
    }

    async fn attach(
        &self,
        handle: SurfaceHandle,
        _script: &str,
    ) -> Result<Box<dyn SurfacePort>, SurfaceError> {
        Err(SurfaceError::Closed(handle))
    }

    fn current_url(&self, _handle: SurfaceHandle) -> Option<String> {
        None
    }
}
