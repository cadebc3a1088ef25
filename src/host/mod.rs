//! Host capabilities consumed by the engine.
//!
//! Everything the engine needs from the outside world goes through one of
//! these traits, supplied when a [`Session`](crate::session::Session) is
//! built. Concrete adapters live in submodules:
//!
//! - `desktop` - system browser opener and directory downloader
//! - `http` - `reqwest`-backed JSON client
//!
//! The WebSocket preview host is in [`crate::preview::surface`] and the JSON
//! file store in [`crate::store`].

pub mod desktop;
pub mod http;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::store::StoreError;

// =============================================================================
// Key-value persistence
// =============================================================================

/// Flat key → JSON value persistence. Writes are synchronous.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set_item(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

// =============================================================================
// Detached execution surface
// =============================================================================

/// Opaque handle to a surface owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceHandle(pub u64);

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("surface {0} is closed")]
    Closed(SurfaceHandle),

    #[error("surface unreachable: {0}")]
    Unreachable(String),

    #[error("timed out waiting for surface {0} to load")]
    Timeout(SurfaceHandle),

    #[error("failed to open surface: {0}")]
    Open(String),
}

/// Host tab API: open, navigate and reload surfaces, attach scripts to them.
#[async_trait]
pub trait SurfaceHost: Send + Sync {
    /// Acquire a new surface showing `url`.
    async fn open(&self, url: &str, in_new_window: bool) -> Result<SurfaceHandle, SurfaceError>;

    /// Point an existing surface at `url`.
    async fn navigate(&self, handle: SurfaceHandle, url: &str) -> Result<(), SurfaceError>;

    /// Reload the document currently shown by the surface.
    async fn reload(&self, handle: SurfaceHandle) -> Result<(), SurfaceError>;

    /// Resolve once the most recently requested load of the surface finished.
    async fn ready(&self, handle: SurfaceHandle) -> Result<(), SurfaceError>;

    /// Inject `script` into the loaded document and return its message port.
    async fn attach(
        &self,
        handle: SurfaceHandle,
        script: &str,
    ) -> Result<Box<dyn SurfacePort>, SurfaceError>;

    /// URL currently shown by the surface, `None` once it is closed.
    fn current_url(&self, handle: SurfaceHandle) -> Option<String>;
}

/// Message port to a script injected into a surface.
pub trait SurfacePort: Send + Sync {
    fn send(&self, topic: &str, payload: Value) -> Result<(), SurfaceError>;
}

// =============================================================================
// Style editor and node highlighting
// =============================================================================

/// Pointer coordinates over the style editor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Zero-based line/column position in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub ch: usize,
}

/// Parser state of the style buffer at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CssState {
    Top,
    Selector,
    Property,
    Value,
    Media,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssInfo {
    pub state: CssState,
    pub selector: Option<String>,
}

#[derive(Debug, Error)]
#[error("style buffer could not be parsed: {0}")]
pub struct ParseError(pub String);

/// Style-buffer queries exposed by the editor widget.
pub trait StyleEditor: Send + Sync {
    fn position_from_coords(&self, point: Point) -> Result<Position, ParseError>;
    fn info_at(&self, position: Position) -> Result<Option<CssInfo>, ParseError>;
}

/// Reference to a node in the previewed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Content,
    Padding,
    Border,
    Margin,
}

/// Presentation requested from the host highlighter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightOptions {
    pub selector: String,
    pub hide_info_bar: bool,
    pub show_only: Region,
    pub region: Region,
}

impl HighlightOptions {
    /// Border-only highlight of every node matching `selector`, no info bar.
    pub fn border_only(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            hide_info_bar: true,
            show_only: Region::Border,
            region: Region::Border,
        }
    }
}

#[derive(Debug, Error)]
#[error("highlighter: {0}")]
pub struct HighlightError(pub String);

/// Host inspector capability used by the selector highlighter.
#[async_trait]
pub trait NodeHighlighter: Send + Sync {
    async fn owner_node(&self, stylesheets_actor: &str) -> Result<NodeRef, HighlightError>;
    async fn show(&self, node: &NodeRef, options: &HighlightOptions) -> Result<(), HighlightError>;
    fn hide(&self);
}

// =============================================================================
// Export transports
// =============================================================================

/// A hidden form submitted into a new browsing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormRequest {
    pub action: String,
    pub method: String,
    pub target: String,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Error)]
#[error("browser: {0}")]
pub struct BrowserError(pub String);

/// Opens new browsing contexts.
pub trait BrowsingContext: Send + Sync {
    fn open_url(&self, url: &str) -> Result<(), BrowserError>;
    fn submit_form(&self, form: &FormRequest) -> Result<(), BrowserError>;
}

/// Save-as interaction for locally exported files.
pub trait Downloader: Send + Sync {
    fn save(&self, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
#[error("http transport: {0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<HttpResponse, TransportError>;
}
