//! In-memory host capabilities for unit tests.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::Notify;

use crate::host::{
    BrowserError, BrowsingContext, CssInfo, Downloader, FormRequest, HighlightError,
    HighlightOptions, HttpClient, HttpResponse, NodeHighlighter, NodeRef, ParseError, Point,
    Position, StyleEditor, SurfaceError, SurfaceHandle, SurfaceHost, SurfacePort, TransportError,
};

// ============================================================================
// Surface host
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Open { url: String, new_window: bool },
    Navigate(SurfaceHandle, String),
    Reload(SurfaceHandle),
    Attach(SurfaceHandle),
}

#[derive(Default)]
struct FakeHostState {
    next_id: u64,
    urls: FxHashMap<SurfaceHandle, String>,
    gates: FxHashMap<SurfaceHandle, Arc<Notify>>,
    calls: Vec<HostCall>,
    sent: Vec<(SurfaceHandle, String, Value)>,
    fail_sends: bool,
    /// Bumped by a browser-side reload; ports from older loads go stale
    loads: FxHashMap<SurfaceHandle, u64>,
}

/// Surface host whose surfaces load instantly unless held.
#[derive(Clone, Default)]
pub struct FakeHost {
    state: Arc<Mutex<FakeHostState>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block `ready` for `handle` until the returned gate is notified.
    pub fn hold_ready(&self, handle: SurfaceHandle) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().gates.insert(handle, gate.clone());
        gate
    }

    /// Simulate the user pointing the surface elsewhere.
    pub fn user_navigate(&self, handle: SurfaceHandle, url: &str) {
        self.state.lock().urls.insert(handle, url.to_string());
    }

    /// Simulate the user reloading the tab: the page stays, ports go stale.
    pub fn user_reload(&self, handle: SurfaceHandle) {
        *self.state.lock().loads.entry(handle).or_default() += 1;
    }

    pub fn close(&self, handle: SurfaceHandle) {
        self.state.lock().urls.remove(&handle);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().fail_sends = fail;
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.state.lock().calls.clone()
    }

    /// Topics sent to `handle`, in order.
    pub fn topics(&self, handle: SurfaceHandle) -> Vec<String> {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|(h, _, _)| *h == handle)
            .map(|(_, topic, _)| topic.clone())
            .collect()
    }

    pub fn sent(&self) -> Vec<(SurfaceHandle, String, Value)> {
        self.state.lock().sent.clone()
    }
}

#[async_trait]
impl SurfaceHost for FakeHost {
    async fn open(&self, url: &str, in_new_window: bool) -> Result<SurfaceHandle, SurfaceError> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let handle = SurfaceHandle(state.next_id);
        state.urls.insert(handle, url.to_string());
        state.calls.push(HostCall::Open {
            url: url.to_string(),
            new_window: in_new_window,
        });
        Ok(handle)
    }

    async fn navigate(&self, handle: SurfaceHandle, url: &str) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();
        if !state.urls.contains_key(&handle) {
            return Err(SurfaceError::Closed(handle));
        }
        state.urls.insert(handle, url.to_string());
        state.calls.push(HostCall::Navigate(handle, url.to_string()));
        Ok(())
    }

    async fn reload(&self, handle: SurfaceHandle) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();
        if !state.urls.contains_key(&handle) {
            return Err(SurfaceError::Closed(handle));
        }
        state.calls.push(HostCall::Reload(handle));
        Ok(())
    }

    async fn ready(&self, handle: SurfaceHandle) -> Result<(), SurfaceError> {
        let gate = self.state.lock().gates.remove(&handle);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.state.lock().urls.contains_key(&handle) {
            Ok(())
        } else {
            Err(SurfaceError::Closed(handle))
        }
    }

    async fn attach(
        &self,
        handle: SurfaceHandle,
        _script: &str,
    ) -> Result<Box<dyn SurfacePort>, SurfaceError> {
        let mut state = self.state.lock();
        if !state.urls.contains_key(&handle) {
            return Err(SurfaceError::Closed(handle));
        }
        state.calls.push(HostCall::Attach(handle));
        let load = state.loads.get(&handle).copied().unwrap_or_default();
        Ok(Box::new(FakePort {
            handle,
            load,
            state: self.state.clone(),
        }))
    }

    fn current_url(&self, handle: SurfaceHandle) -> Option<String> {
        self.state.lock().urls.get(&handle).cloned()
    }
}

struct FakePort {
    handle: SurfaceHandle,
    load: u64,
    state: Arc<Mutex<FakeHostState>>,
}

impl SurfacePort for FakePort {
    fn send(&self, topic: &str, payload: Value) -> Result<(), SurfaceError> {
        let mut state = self.state.lock();
        if state.fail_sends {
            return Err(SurfaceError::Unreachable("port disconnected".to_string()));
        }
        if !state.urls.contains_key(&self.handle) {
            return Err(SurfaceError::Closed(self.handle));
        }
        if state.loads.get(&self.handle).copied().unwrap_or_default() != self.load {
            return Err(SurfaceError::Unreachable("surface reloaded".to_string()));
        }
        state.sent.push((self.handle, topic.to_string(), payload));
        Ok(())
    }
}

// ============================================================================
// Export transports
// ============================================================================

#[derive(Default)]
pub struct FakeBrowser {
    pub opened: Mutex<Vec<String>>,
    pub forms: Mutex<Vec<FormRequest>>,
}

impl BrowsingContext for FakeBrowser {
    fn open_url(&self, url: &str) -> Result<(), BrowserError> {
        self.opened.lock().push(url.to_string());
        Ok(())
    }

    fn submit_form(&self, form: &FormRequest) -> Result<(), BrowserError> {
        self.forms.lock().push(form.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDownloader {
    pub saved: Mutex<Vec<(String, Vec<u8>)>>,
}

impl Downloader for FakeDownloader {
    fn save(&self, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        self.saved.lock().push((filename.to_string(), bytes.to_vec()));
        Ok(PathBuf::from(filename))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpCall {
    pub url: String,
    pub body: Value,
    pub bearer: Option<String>,
}

pub struct FakeHttp {
    response: Mutex<Result<HttpResponse, String>>,
    pub calls: Mutex<Vec<HttpCall>>,
}

impl FakeHttp {
    pub fn responding(status: u16, body: &str) -> Self {
        Self {
            response: Mutex::new(Ok(HttpResponse {
                status,
                body: body.to_string(),
            })),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            response: Mutex::new(Err("connection refused".to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, TransportError> {
        self.calls.lock().push(HttpCall {
            url: url.to_string(),
            body: body.clone(),
            bearer: bearer.map(str::to_string),
        });
        self.response.lock().clone().map_err(TransportError)
    }
}

// ============================================================================
// Highlighting
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightEvent {
    Hide,
    Show(String),
}

#[derive(Default)]
pub struct FakeHighlighter {
    pub events: Mutex<Vec<HighlightEvent>>,
    pub options: Mutex<Vec<HighlightOptions>>,
    pub fail_owner: bool,
}

impl FakeHighlighter {
    pub fn shown(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                HighlightEvent::Show(selector) => Some(selector.clone()),
                HighlightEvent::Hide => None,
            })
            .collect()
    }

    pub fn hides(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| **e == HighlightEvent::Hide)
            .count()
    }
}

#[async_trait]
impl NodeHighlighter for FakeHighlighter {
    async fn owner_node(&self, stylesheets_actor: &str) -> Result<NodeRef, HighlightError> {
        if self.fail_owner {
            return Err(HighlightError("no owner node".to_string()));
        }
        Ok(NodeRef(format!("{stylesheets_actor}/owner")))
    }

    async fn show(&self, _node: &NodeRef, options: &HighlightOptions) -> Result<(), HighlightError> {
        self.events
            .lock()
            .push(HighlightEvent::Show(options.selector.clone()));
        self.options.lock().push(options.clone());
        Ok(())
    }

    fn hide(&self) {
        self.events.lock().push(HighlightEvent::Hide);
    }
}

/// Style editor answering every position with the same info.
pub struct FakeStyleEditor {
    info: Mutex<Result<Option<CssInfo>, String>>,
    pub queried: Mutex<Vec<Position>>,
}

impl FakeStyleEditor {
    pub fn answering(info: Option<CssInfo>) -> Self {
        Self {
            info: Mutex::new(Ok(info)),
            queried: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            info: Mutex::new(Err(message.to_string())),
            queried: Mutex::new(Vec::new()),
        }
    }

    pub fn set_info(&self, info: Option<CssInfo>) {
        *self.info.lock() = Ok(info);
    }
}

impl StyleEditor for FakeStyleEditor {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn position_from_coords(&self, point: Point) -> Result<Position, ParseError> {
        Ok(Position {
            line: point.y as usize,
            ch: point.x as usize,
        })
    }

    fn info_at(&self, position: Position) -> Result<Option<CssInfo>, ParseError> {
        self.queried.lock().push(position);
        self.info.lock().clone().map_err(ParseError)
    }
}
