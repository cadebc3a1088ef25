//! Live preview of the prototype in a detached surface.
//!
//! - `channel` - run/update state machine with generation tagging
//! - `message` - content-script messages and bridge frames
//! - `surface` - browser tabs as surfaces, over a WebSocket bridge
//! - `server` - HTTP server for the shell page the tabs load

pub mod channel;
pub mod message;
pub mod server;
pub mod surface;

pub use channel::{
    ChannelError, ChannelState, DEFAULT_READY_TIMEOUT, PreviewChannel, Prototype, PushOutcome,
    RunOutcome,
};
pub use message::{LiveUpdate, PreviewMessage};
pub use surface::WsSurfaceHost;
