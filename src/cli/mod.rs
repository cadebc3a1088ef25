//! Command-line interface module.

mod args;
pub mod beautify;
pub mod build;
pub mod common;
pub mod export;
pub mod init;
pub mod serve;
pub mod settings;

pub use args::{Cli, Commands, SettingsAction};
