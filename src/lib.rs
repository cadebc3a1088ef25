//! Prototyper: live preview and export for html/css/js prototypes.
//!
//! Three buffers (markup, style, script) are built into one document, shown
//! on a detached preview surface that follows edits, and exported to local
//! files, paste-style web services or a gist-like API.
//!
//! # Module Structure
//!
//! ```text
//! language   Buffer languages and snapshots
//! store      Settings and buffer persistence
//! document   Buffers + settings → document
//! beautify   Buffer reformatting
//! preview    Preview channel, WebSocket surface host, shell server
//! highlight  Hover-driven selector highlighting
//! export     Export dispatcher and strategies
//! session    Components wired around one project
//! host       Capability traits and desktop adapters
//! config     prototyper.toml
//! cli        Command-line commands
//! ```

pub mod beautify;
pub mod cli;
pub mod config;
pub mod document;
pub mod embed;
pub mod export;
pub mod highlight;
pub mod host;
pub mod language;
pub mod logger;
pub mod preview;
pub mod session;
pub mod store;
pub mod utils;

#[cfg(test)]
mod testing;
