//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CONFIG_FILE;

/// Live preview and export for html/css/js prototypes
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short = 'C', long, default_value = CONFIG_FILE, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create prototyper.toml and empty buffer files
    #[command(visible_alias = "i")]
    Init {
        /// Print the config template instead of writing files
        #[arg(long)]
        dry: bool,
    },

    /// Build the buffers into one self-contained document
    #[command(visible_alias = "b")]
    Build {
        /// Write the document to a file instead of stdout
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Reformat the buffer files in place
    Beautify,

    /// Preview the prototype live while the buffer files change
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Open the first surface in a new window
        #[arg(long)]
        new_window: bool,

        /// Print the surface URL instead of opening a browser
        #[arg(long)]
        no_open: bool,
    },

    /// Export the prototype to a target (local, jsfiddle, codepen, gist, ...)
    #[command(visible_alias = "e")]
    Export {
        /// Target id; lists targets when omitted
        target: Option<String>,
    },

    /// Show or change persisted settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsAction {
    /// Print every recognized setting (default)
    List,
    /// Print one setting
    Get { key: String },
    /// Change one setting
    Set { key: String, value: String },
}
