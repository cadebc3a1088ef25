//! Browser tabs as preview surfaces, driven over a WebSocket bridge.
//!
//! Each surface is a tab showing the shell page with `?surface=<id>`. On load
//! the page connects back and sends a `ready` frame; that frame both registers
//! the connection and counts one completed load. Reloading the tab replaces
//! the connection, so a port is only valid for the load it was attached to.

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::message::{BridgeFrame, ClientFrame};
use crate::host::{BrowsingContext, SurfaceError, SurfaceHandle, SurfaceHost, SurfacePort};

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// How long a fresh connection may take to announce its surface
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct SurfaceEntry {
    /// Path shown by the tab, `None` once its connection is gone
    url: Option<String>,
    client: Option<WebSocket<TcpStream>>,
    /// Completed loads
    loads: watch::Sender<u64>,
    /// Loads requested through open/navigate/reload
    requested: u64,
}

impl SurfaceEntry {
    fn new(url: &str) -> Self {
        Self {
            url: Some(url.to_string()),
            client: None,
            loads: watch::Sender::new(0),
            requested: 1,
        }
    }

    fn load(&self) -> u64 {
        *self.loads.borrow()
    }

    fn send_frame(&mut self, handle: SurfaceHandle, frame: &BridgeFrame) -> Result<(), SurfaceError> {
        let Some(ws) = self.client.as_mut() else {
            return Err(SurfaceError::Closed(handle));
        };
        match ws.send(Message::Text(frame.to_json().into())) {
            Ok(()) => Ok(()),
            // Queued, flushed by the reader loop
            Err(tungstenite::Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => Ok(()),
            Err(e) => {
                self.client = None;
                self.url = None;
                Err(SurfaceError::Unreachable(e.to_string()))
            }
        }
    }
}

#[derive(Default)]
struct Surfaces {
    next_id: u64,
    entries: FxHashMap<SurfaceHandle, SurfaceEntry>,
    /// Loads nobody asked for, i.e. the user reloaded the tab
    user_reloads: Option<mpsc::UnboundedSender<SurfaceHandle>>,
}

type SharedSurfaces = Arc<Mutex<Surfaces>>;

/// [`SurfaceHost`] over system browser tabs.
pub struct WsSurfaceHost {
    surfaces: SharedSurfaces,
    http_addr: SocketAddr,
    ws_port: u16,
    browser: Option<Arc<dyn BrowsingContext>>,
}

impl WsSurfaceHost {
    /// Bind the bridge and start its acceptor and polling threads.
    ///
    /// `http_addr` is where the shell page is served. Without a browser,
    /// surface URLs are only logged.
    pub fn start(
        interface: IpAddr,
        base_port: u16,
        http_addr: SocketAddr,
        browser: Option<Arc<dyn BrowsingContext>>,
    ) -> Result<Self> {
        let (listener, ws_port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
        listener.set_nonblocking(true)?;
        if ws_port != base_port {
            crate::log!("preview"; "port {} in use, bridge using {} instead", base_port, ws_port);
        }

        let surfaces = SharedSurfaces::default();
        {
            let surfaces = Arc::clone(&surfaces);
            thread::spawn(move || accept_loop(&listener, &surfaces));
        }
        {
            let surfaces = Arc::clone(&surfaces);
            thread::spawn(move || reader_loop(&surfaces));
        }
        crate::debug!("preview"; "bridge on ws://{}:{}", interface, ws_port);

        Ok(Self {
            surfaces,
            http_addr,
            ws_port,
            browser,
        })
    }

    /// Actual bridge port.
    pub fn ws_port(&self) -> u16 {
        self.ws_port
    }

    /// Address a browser should load for `handle` at `path`.
    pub fn surface_url(&self, path: &str, handle: SurfaceHandle) -> String {
        format!("http://{}{}?surface={}", self.http_addr, path, handle.0)
    }

    /// Surfaces reloaded from the browser rather than through this host.
    ///
    /// Such a load replaces the document the content script lived in, so
    /// its port is stale until the next run. Replaces any earlier receiver.
    pub fn user_reloads(&self) -> mpsc::UnboundedReceiver<SurfaceHandle> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.surfaces.lock().user_reloads = Some(tx);
        rx
    }

    /// Number of surfaces with a live connection.
    pub fn connected(&self) -> usize {
        self.surfaces
            .lock()
            .entries
            .values()
            .filter(|e| e.client.is_some())
            .count()
    }

    fn with_entry<T>(
        &self,
        handle: SurfaceHandle,
        f: impl FnOnce(&mut SurfaceEntry) -> Result<T, SurfaceError>,
    ) -> Result<T, SurfaceError> {
        let mut surfaces = self.surfaces.lock();
        match surfaces.entries.get_mut(&handle) {
            Some(entry) => f(entry),
            None => Err(SurfaceError::Closed(handle)),
        }
    }
}

#[async_trait]
impl SurfaceHost for WsSurfaceHost {
    async fn open(&self, url: &str, in_new_window: bool) -> Result<SurfaceHandle, SurfaceError> {
        let handle = {
            let mut surfaces = self.surfaces.lock();
            surfaces.next_id += 1;
            let handle = SurfaceHandle(surfaces.next_id);
            surfaces.entries.insert(handle, SurfaceEntry::new(url));
            handle
        };

        let address = self.surface_url(url, handle);
        match &self.browser {
            Some(browser) => {
                if in_new_window {
                    crate::debug!("preview"; "new window requested for surface {}", handle);
                }
                browser
                    .open_url(&address)
                    .map_err(|e| SurfaceError::Open(e.to_string()))?;
            }
            None => crate::log!("preview"; "open {} to view the prototype", address),
        }
        Ok(handle)
    }

    async fn navigate(&self, handle: SurfaceHandle, url: &str) -> Result<(), SurfaceError> {
        self.with_entry(handle, |entry| {
            entry.send_frame(handle, &BridgeFrame::Navigate { url: url.to_string() })?;
            entry.url = Some(url.to_string());
            entry.requested = entry.load() + 1;
            Ok(())
        })
    }

    async fn reload(&self, handle: SurfaceHandle) -> Result<(), SurfaceError> {
        self.with_entry(handle, |entry| {
            if entry.client.is_none() && entry.load() == 0 && entry.url.is_some() {
                // Still opening; its first load serves the reload too
                return Ok(());
            }
            entry.send_frame(handle, &BridgeFrame::Reload)?;
            entry.requested = entry.load() + 1;
            Ok(())
        })
    }

    async fn ready(&self, handle: SurfaceHandle) -> Result<(), SurfaceError> {
        let (mut loads, requested) =
            self.with_entry(handle, |entry| Ok((entry.loads.subscribe(), entry.requested)))?;
        loads
            .wait_for(|n| *n >= requested)
            .await
            .map(|_| ())
            .map_err(|_| SurfaceError::Closed(handle))
    }

    async fn attach(
        &self,
        handle: SurfaceHandle,
        script: &str,
    ) -> Result<Box<dyn SurfacePort>, SurfaceError> {
        let load = self.with_entry(handle, |entry| {
            entry.send_frame(
                handle,
                &BridgeFrame::Attach {
                    script: script.to_string(),
                },
            )?;
            Ok(entry.load())
        })?;
        Ok(Box::new(WsPort {
            handle,
            load,
            surfaces: Arc::clone(&self.surfaces),
        }))
    }

    fn current_url(&self, handle: SurfaceHandle) -> Option<String> {
        self.surfaces
            .lock()
            .entries
            .get(&handle)
            .and_then(|e| e.url.clone())
    }
}

/// Port bound to one load of a surface.
struct WsPort {
    handle: SurfaceHandle,
    load: u64,
    surfaces: SharedSurfaces,
}

impl SurfacePort for WsPort {
    fn send(&self, topic: &str, payload: Value) -> Result<(), SurfaceError> {
        let mut surfaces = self.surfaces.lock();
        let entry = surfaces
            .entries
            .get_mut(&self.handle)
            .ok_or(SurfaceError::Closed(self.handle))?;
        if entry.load() != self.load {
            return Err(SurfaceError::Unreachable(format!(
                "surface {} reloaded since attach",
                self.handle
            )));
        }
        entry.send_frame(
            self.handle,
            &BridgeFrame::Message {
                topic: topic.to_string(),
                payload,
            },
        )
    }
}

// =============================================================================
// Bridge threads
// =============================================================================

fn accept_loop(listener: &TcpListener, surfaces: &SharedSurfaces) {
    loop {
        match listener.accept() {
            Ok((stream, addr)) => {
                crate::debug!("preview"; "bridge connection from {}", addr);
                let _ = stream.set_nonblocking(false);
                let surfaces = Arc::clone(surfaces);
                thread::spawn(move || register_client(stream, &surfaces));
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                crate::log!("preview"; "accept error: {}", e);
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

/// Handshake, wait for the `ready` frame, then hand the socket to its surface.
fn register_client(stream: TcpStream, surfaces: &SharedSurfaces) {
    let _ = stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT));
    let mut ws = match tungstenite::accept(stream) {
        Ok(ws) => ws,
        Err(e) => {
            crate::log!("preview"; "handshake failed: {}", e);
            return;
        }
    };

    let Some((surface, url)) = read_ready(&mut ws) else {
        crate::debug!("preview"; "connection closed before ready");
        return;
    };
    let _ = ws.get_ref().set_read_timeout(None);
    let _ = ws.get_ref().set_nonblocking(true);

    let handle = SurfaceHandle(surface);
    let mut guard = surfaces.lock();
    let surfaces = &mut *guard;
    let Some(entry) = surfaces.entries.get_mut(&handle) else {
        crate::debug!("preview"; "unknown surface {}, closing", handle);
        let _ = ws.close(None);
        return;
    };
    entry.client = Some(ws);
    entry.url = Some(url);
    entry.loads.send_modify(|n| *n += 1);
    crate::debug!("preview"; "surface {} loaded (load {})", handle, entry.load());

    if entry.load() > entry.requested {
        if let Some(tx) = &surfaces.user_reloads {
            let _ = tx.send(handle);
        }
    }
}

fn read_ready(ws: &mut WebSocket<TcpStream>) -> Option<(u64, String)> {
    loop {
        match ws.read() {
            Ok(Message::Text(text)) => {
                if let Some(ClientFrame::Ready { surface, url }) = ClientFrame::from_json(&text) {
                    return Some((surface, url));
                }
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Poll connections to notice closed tabs and flush queued frames.
fn reader_loop(surfaces: &SharedSurfaces) {
    loop {
        thread::sleep(POLL_INTERVAL);

        let mut surfaces = surfaces.lock();
        for (handle, entry) in &mut surfaces.entries {
            let Some(ws) = entry.client.as_mut() else {
                continue;
            };
            let closed = match ws.read() {
                Ok(Message::Close(_)) => true,
                Ok(_) => false,
                Err(tungstenite::Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => {
                    matches!(ws.flush(), Err(ref e) if !is_would_block(e))
                }
                Err(_) => true,
            };
            if closed {
                crate::debug!("preview"; "surface {} disconnected", handle);
                entry.client = None;
                entry.url = None;
            }
        }
    }
}

fn is_would_block(e: &tungstenite::Error) -> bool {
    matches!(e, tungstenite::Error::Io(io) if io.kind() == ErrorKind::WouldBlock)
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(SocketAddr::new(interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "failed to bind preview bridge after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}
