//! Preview channel: one detached surface, one port, one generation at a time.
//!
//! # States
//!
//! ```text
//! Detached --run--> Attaching --ready+attach--> Live
//!    ^                                           |  \
//!    +------- navigated / closed / send error ---+   run (same URL)
//!                                                     v
//!                                   Live <--ready--- Reloading
//! ```
//!
//! Every `run` bumps the generation. A run whose generation was superseded
//! while it waited for the surface stops before attaching, so nothing built
//! for an older run ever reaches the newer document.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use super::message::{LiveUpdate, PreviewMessage};
use crate::document::{Library, ScriptDialect};
use crate::embed::preview::CONTENT_SCRIPT;
use crate::host::{SurfaceError, SurfaceHandle, SurfaceHost, SurfacePort};
use crate::store::StoreError;

/// Default bound on waiting for a surface to finish loading.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Detached,
    Attaching,
    Reloading,
    Live,
}

/// Result of a completed `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The surface shows the new prototype and accepts live updates.
    Live(SurfaceHandle),
    /// A newer run started while this one waited; nothing was sent.
    Superseded,
}

/// Result of an incremental update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Sent,
    /// No live surface; the update is dropped.
    NotLive,
    /// The surface went away mid-send; the channel is now detached.
    Dropped,
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("failed to build prototype")]
    Build(#[from] StoreError),
}

/// Everything the `new-prototype` message carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prototype {
    pub html: String,
    pub js: String,
    pub dialect: ScriptDialect,
    pub libs: Vec<Library>,
}

impl Prototype {
    pub fn into_message(self) -> PreviewMessage {
        PreviewMessage::NewPrototype {
            html: self.html,
            js: self.js,
            script_type: self.dialect.mime().to_string(),
            libs: self.libs,
        }
    }
}

/// The surface currently targeted by the channel.
struct PreviewTarget {
    handle: SurfaceHandle,
    /// Only set while live.
    port: Option<Box<dyn SurfacePort>>,
    /// Prototype URL this target was run against.
    url: String,
}

struct Inner {
    state: ChannelState,
    generation: u64,
    target: Option<PreviewTarget>,
}

impl Inner {
    fn detach(&mut self) {
        if let Some(target) = self.target.as_mut() {
            target.port = None;
        }
        self.state = ChannelState::Detached;
    }
}

pub struct PreviewChannel {
    host: Arc<dyn SurfaceHost>,
    ready_timeout: Duration,
    inner: Mutex<Inner>,
}

impl PreviewChannel {
    pub fn new(host: Arc<dyn SurfaceHost>) -> Self {
        Self {
            host,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            inner: Mutex::new(Inner {
                state: ChannelState::Detached,
                generation: 0,
                target: None,
            }),
        }
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn state(&self) -> ChannelState {
        self.inner.lock().state
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    pub fn surface(&self) -> Option<SurfaceHandle> {
        self.inner.lock().target.as_ref().map(|t| t.handle)
    }

    /// Show a freshly built prototype on the surface.
    ///
    /// Reuses the current surface unless `force_new_surface` is set or the
    /// surface is gone. `build` runs only once the surface is ready.
    pub async fn run<F>(
        &self,
        force_new_surface: bool,
        url: &str,
        build: F,
    ) -> Result<RunOutcome, ChannelError>
    where
        F: FnOnce() -> Result<Prototype, StoreError> + Send,
    {
        let (generation, previous) = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.detach();
            inner.state = ChannelState::Attaching;
            (inner.generation, inner.target.as_ref().map(|t| t.handle))
        };
        crate::debug!("preview"; "run generation {}", generation);

        let result = self
            .run_generation(generation, force_new_surface, previous, url, build)
            .await;

        if let Err(ref e) = result {
            let mut inner = self.inner.lock();
            if inner.generation == generation {
                inner.detach();
            }
            crate::debug!("preview"; "run generation {} failed: {}", generation, e);
        }
        result
    }

    async fn run_generation<F>(
        &self,
        generation: u64,
        force_new_surface: bool,
        previous: Option<SurfaceHandle>,
        url: &str,
        build: F,
    ) -> Result<RunOutcome, ChannelError>
    where
        F: FnOnce() -> Result<Prototype, StoreError> + Send,
    {
        let reusable = previous
            .filter(|_| !force_new_surface)
            .and_then(|handle| Some((handle, self.host.current_url(handle)?)));

        let handle = match self.reuse(generation, reusable, url).await? {
            Some(handle) => handle,
            None => self.host.open(url, force_new_surface).await?,
        };

        {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return Ok(RunOutcome::Superseded);
            }
            inner.target = Some(PreviewTarget {
                handle,
                port: None,
                url: url.to_string(),
            });
        }

        match tokio::time::timeout(self.ready_timeout, self.host.ready(handle)).await {
            Ok(ready) => ready?,
            Err(_) => return Err(SurfaceError::Timeout(handle).into()),
        }
        if !self.is_current(generation) {
            crate::debug!("preview"; "generation {} superseded before attach", generation);
            return Ok(RunOutcome::Superseded);
        }

        let port = self.host.attach(handle, CONTENT_SCRIPT).await?;
        let message = build()?.into_message();

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            crate::debug!("preview"; "generation {} superseded after attach", generation);
            return Ok(RunOutcome::Superseded);
        }
        port.send(message.topic(), message.payload())?;
        if let Some(target) = inner.target.as_mut() {
            target.port = Some(port);
        }
        inner.state = ChannelState::Live;
        crate::debug!("preview"; "surface {} live (generation {})", handle, generation);
        Ok(RunOutcome::Live(handle))
    }

    /// Reload or navigate an existing surface. `None` when there is none to reuse.
    async fn reuse(
        &self,
        generation: u64,
        reusable: Option<(SurfaceHandle, String)>,
        url: &str,
    ) -> Result<Option<SurfaceHandle>, SurfaceError> {
        let Some((handle, current)) = reusable else {
            return Ok(None);
        };

        let result = if current == url {
            self.set_state(generation, ChannelState::Reloading);
            self.host.reload(handle).await
        } else {
            self.host.navigate(handle, url).await
        };

        match result {
            Ok(()) => Ok(Some(handle)),
            Err(SurfaceError::Closed(_)) => {
                crate::debug!("preview"; "surface {} closed, opening a new one", handle);
                self.set_state(generation, ChannelState::Attaching);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Patch the live document in place. Never reloads.
    pub fn push_update(&self, update: LiveUpdate) -> PushOutcome {
        let message = update.into_message();
        let mut inner = self.inner.lock();
        if !self.check_live(&mut inner) {
            crate::debug!("preview"; "not live, dropping {}", message.topic());
            return PushOutcome::NotLive;
        }

        let sent = inner
            .target
            .as_ref()
            .and_then(|t| t.port.as_ref())
            .map(|port| port.send(message.topic(), message.payload()));

        match sent {
            Some(Ok(())) => PushOutcome::Sent,
            Some(Err(e)) => {
                crate::log!("preview"; "surface unreachable, detaching: {}", e);
                inner.detach();
                PushOutcome::Dropped
            }
            None => {
                inner.detach();
                PushOutcome::NotLive
            }
        }
    }

    /// Whether the surface still shows the prototype over an open port.
    ///
    /// Detaches when the surface navigated away or closed.
    pub fn is_live(&self) -> bool {
        let mut inner = self.inner.lock();
        self.check_live(&mut inner)
    }

    /// Host notification: the surface closed or left the prototype URL.
    pub fn surface_lost(&self, handle: SurfaceHandle) {
        let mut inner = self.inner.lock();
        if inner.target.as_ref().is_some_and(|t| t.handle == handle) {
            crate::debug!("preview"; "surface {} lost", handle);
            inner.detach();
        }
    }

    fn check_live(&self, inner: &mut Inner) -> bool {
        if inner.state != ChannelState::Live {
            return false;
        }
        let showing_prototype = inner.target.as_ref().is_some_and(|t| {
            t.port.is_some() && self.host.current_url(t.handle).as_deref() == Some(t.url.as_str())
        });
        if !showing_prototype {
            inner.detach();
        }
        showing_prototype
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().generation == generation
    }

    fn set_state(&self, generation: u64, state: ChannelState) {
        let mut inner = self.inner.lock();
        if inner.generation == generation {
            inner.state = state;
        }
    }
}
