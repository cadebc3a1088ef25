//! `serve`: live preview driven by the buffer files.
//!
//! ```text
//! buffer files ──notify──> Debouncer (300ms) ──> Session::buffer_changed
//!                                                      │
//! tiny_http (shell page) <── browser tab <── WsSurfaceHost ─┘
//! ```
//!
//! The HTTP loop runs on its own thread; the watcher and the session share a
//! current-thread runtime on the main thread. Ctrl+C unblocks both.
//!
//! A lost preview (tab closed or reloaded, first load timed out) comes back
//! on the next buffer save, or right away when the user reloads the tab.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, OnceLock};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::{FxHashMap, FxHashSet};
use tiny_http::Server;
use tokio::sync::{Notify, mpsc};
use tokio::time::Instant;

use super::common::{ingest_buffers, open_session, runtime};
use crate::config::PrototyperConfig;
use crate::host::{BrowsingContext, SurfaceHandle};
use crate::host::desktop::DesktopBrowser;
use crate::language::Language;
use crate::logger::{status_error, status_success, status_unchanged, status_warning};
use crate::preview::server::{ShellRoutes, bind_with_retry, run_request_loop};
use crate::preview::{ChannelError, PushOutcome, RunOutcome, WsSurfaceHost};
use crate::session::{EditOutcome, Session};

/// Debounce configuration
const DEBOUNCE_MS: u64 = 300;

/// Sleep used when nothing is pending
const IDLE: Duration = Duration::from_secs(3600);

/// HTTP server reference for graceful shutdown
static SERVER: OnceLock<Arc<Server>> = OnceLock::new();

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Wakes the watch loop on shutdown
static SHUTDOWN_SIGNAL: LazyLock<Notify> = LazyLock::new(Notify::new);

/// Install the Ctrl+C handler. Call once, before anything blocks.
pub fn setup_shutdown_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);
        SHUTDOWN_SIGNAL.notify_one();

        if let Some(server) = SERVER.get() {
            crate::log!("serve"; "shutting down...");
            server.unblock();
        } else {
            // Nothing to shut down gracefully yet
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}

/// Command-line overrides for `serve`.
#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    pub interface: Option<IpAddr>,
    pub port: Option<u16>,
    pub new_window: bool,
    pub no_open: bool,
}

pub fn serve(config: &PrototyperConfig, options: &ServeOptions) -> Result<()> {
    let preview = &config.preview;
    let interface = options.interface.unwrap_or(preview.interface);

    let (server, addr) = bind_with_retry(interface, options.port.unwrap_or(preview.port))?;
    let server = Arc::new(server);
    let _ = SERVER.set(Arc::clone(&server));

    let desktop: Arc<dyn BrowsingContext> = Arc::new(DesktopBrowser::with_relay_dir(config.relay_dir()));
    let opener = (preview.open_browser && !options.no_open).then(|| Arc::clone(&desktop));
    let host = WsSurfaceHost::start(interface, preview.ws_port, addr, opener)?;
    let reloads = host.user_reloads();

    let routes = ShellRoutes {
        path: preview.path.clone(),
        privileged_path: preview.privileged_path.clone(),
        ws_port: host.ws_port(),
    };
    crate::log!("serve"; "http://{}{}", addr, routes.path);

    let http = {
        let server = Arc::clone(&server);
        thread::spawn(move || run_request_loop(&server, &routes))
    };

    let session = open_session(config, Arc::new(host), desktop)?;
    ingest_buffers(&session, config)?;

    let rt = runtime()?;
    let result = rt.block_on(async {
        report_run(session.run(options.new_window).await);
        watch_buffers(&session, config, reloads).await
    });

    server.unblock();
    let _ = http.join();
    result
}

fn report_run(result: Result<RunOutcome, ChannelError>) {
    match result {
        Ok(RunOutcome::Live(handle)) => status_success(&format!("surface {handle} live")),
        Ok(RunOutcome::Superseded) => crate::debug!("preview"; "run superseded"),
        Err(e) => status_error("preview failed", &e.to_string()),
    }
}

// =============================================================================
// Watching
// =============================================================================

/// Watch the buffer files until shutdown, forwarding changes to the session.
async fn watch_buffers(
    session: &Session,
    config: &PrototyperConfig,
    mut reloads: mpsc::UnboundedReceiver<SurfaceHandle>,
) -> Result<()> {
    let files = BufferFiles::new(config);

    let (notify_tx, notify_rx) = std::sync::mpsc::channel();
    let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res| {
        let _ = notify_tx.send(res);
    })
    .context("failed to create file watcher")?;
    // Watch directories: editors often save by replacing the file
    for dir in files.dirs() {
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch `{}`", dir.display()))?;
    }
    crate::log!("watch"; "watching {}", files.describe());

    let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);
    thread::spawn(move || {
        while let Ok(result) = notify_rx.recv() {
            match result {
                Ok(event) => {
                    if async_tx.blocking_send(event).is_err() {
                        break;
                    }
                }
                Err(e) => crate::log!("watch"; "notify error: {}", e),
            }
        }
    });

    let mut debouncer = Debouncer::new(Duration::from_millis(DEBOUNCE_MS));
    while !is_shutdown() {
        tokio::select! {
            biased;
            () = SHUTDOWN_SIGNAL.notified() => break,
            Some(event) = async_rx.recv() => debouncer.add_event(&event, &files),
            Some(handle) = reloads.recv() => rerun_after_reload(session, handle).await,
            () = tokio::time::sleep(debouncer.sleep_duration()) => {
                if let Some(changed) = debouncer.take_if_ready() {
                    for language in changed {
                        apply_change(session, config, language).await;
                    }
                }
            }
        }
    }

    drop(watcher);
    Ok(())
}

/// Read the changed file and hand it to the session.
async fn apply_change(session: &Session, config: &PrototyperConfig, language: Language) {
    let path = config.buffer_path(language);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            status_warning(&format!("cannot read {}: {}", path.display(), e));
            return;
        }
    };
    match session.buffers().get(language) {
        Ok(stored) if stored == text => {
            status_unchanged(&format!("{language} unchanged"));
            return;
        }
        Ok(_) => {}
        Err(e) => crate::debug!("store"; "{}", e),
    }

    match forward_edit(session, language, &text).await {
        Ok(EditOutcome::Saved) => status_success(&format!("{language} saved")),
        Ok(EditOutcome::Pushed(PushOutcome::Sent)) => {
            status_success(&format!("{language} updated"));
        }
        Ok(EditOutcome::Pushed(outcome)) => {
            status_warning(&format!("{language} saved, update {outcome:?}"));
        }
        Ok(EditOutcome::Rerun(outcome)) => report_run(Ok(outcome)),
        Err(e) => status_error(&format!("{language} change failed"), &e.to_string()),
    }
}

/// Hand one edit to the session.
///
/// A save while the preview is detached, or an update the surface could not
/// take, counts as an explicit run.
async fn forward_edit(
    session: &Session,
    language: Language,
    text: &str,
) -> Result<EditOutcome, ChannelError> {
    match session.buffer_changed(language, text).await? {
        EditOutcome::Saved | EditOutcome::Pushed(PushOutcome::Dropped | PushOutcome::NotLive) => {
            crate::debug!("preview"; "{} saved while detached, re-running", language);
            Ok(EditOutcome::Rerun(session.run(false).await?))
        }
        outcome => Ok(outcome),
    }
}

/// The user reloaded the preview tab, dropping the content script.
async fn rerun_after_reload(session: &Session, handle: SurfaceHandle) {
    if session.channel().surface() != Some(handle) {
        return;
    }
    crate::debug!("preview"; "surface {} reloaded in the browser", handle);
    report_run(session.run(false).await);
}

/// Buffer file paths, normalized for comparison with watcher events.
struct BufferFiles {
    by_path: FxHashMap<PathBuf, Language>,
}

impl BufferFiles {
    fn new(config: &PrototyperConfig) -> Self {
        let by_path = Language::ALL
            .into_iter()
            .map(|language| (normalize(&config.buffer_path(language)), language))
            .collect();
        Self { by_path }
    }

    fn language(&self, path: &Path) -> Option<Language> {
        self.by_path.get(&normalize(path)).copied()
    }

    fn dirs(&self) -> FxHashSet<PathBuf> {
        self.by_path
            .keys()
            .filter_map(|p| p.parent().map(Path::to_path_buf))
            .collect()
    }

    fn describe(&self) -> String {
        let mut names: Vec<_> = self
            .by_path
            .keys()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        names.sort_unstable();
        names.join(", ")
    }
}

/// Canonical path when it exists, else canonical parent + file name.
fn normalize(path: &Path) -> PathBuf {
    if let Ok(path) = path.canonicalize() {
        return path;
    }
    match (path.parent().and_then(|p| p.canonicalize().ok()), path.file_name()) {
        (Some(parent), Some(name)) => parent.join(name),
        _ => path.to_path_buf(),
    }
}

/// Collects buffer changes until events stop for the debounce delay.
struct Debouncer {
    delay: Duration,
    changes: FxHashSet<Language>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            changes: FxHashSet::default(),
            last_event: None,
        }
    }

    fn add_event(&mut self, event: &notify::Event, files: &BufferFiles) {
        use notify::EventKind;

        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => {}
            _ => return,
        }
        // Metadata-only changes would re-send identical buffers
        if matches!(
            event.kind,
            EventKind::Modify(notify::event::ModifyKind::Metadata(_))
        ) {
            return;
        }

        crate::debug!("watch"; "raw notify: {:?} {:?}", event.kind, event.paths);
        for path in &event.paths {
            if let Some(language) = files.language(path) {
                self.changes.insert(language);
                self.last_event = Some(Instant::now());
            }
        }
    }

    fn sleep_duration(&self) -> Duration {
        match self.last_event {
            Some(last) => self.delay.saturating_sub(last.elapsed()),
            None => IDLE,
        }
    }

    /// Changed languages in panel order, once the delay has passed.
    fn take_if_ready(&mut self) -> Option<Vec<Language>> {
        let last = self.last_event?;
        if last.elapsed() < self.delay {
            return None;
        }
        self.last_event = None;
        let mut changed: Vec<_> = self.changes.drain().collect();
        changed.sort_unstable();
        Some(changed)
    }
}
