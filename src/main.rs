//! Prototyper - live preview and export for html/css/js prototypes.

use anyhow::Result;
use clap::{ColorChoice, Parser};
use prototyper::cli::{self, Cli, Commands, serve::ServeOptions};
use prototyper::config::PrototyperConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    cli::serve::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    prototyper::logger::set_verbose(cli.verbose);

    if let Commands::Init { dry } = cli.command {
        let root = std::env::current_dir()?;
        return cli::init::init_project(&root, dry);
    }

    let config = match PrototyperConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            prototyper::log!("error"; "{:#}", anyhow::Error::from(e));
            std::process::exit(1);
        }
    };

    match &cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Build { output } => cli::build::build_document(&config, output.as_deref()),
        Commands::Beautify => cli::beautify::beautify_files(&config),
        Commands::Serve {
            interface,
            port,
            new_window,
            no_open,
        } => cli::serve::serve(
            &config,
            &ServeOptions {
                interface: *interface,
                port: *port,
                new_window: *new_window,
                no_open: *no_open,
            },
        ),
        Commands::Export { target } => cli::export::export_prototype(&config, target.as_deref()),
        Commands::Settings { action } => cli::settings::run_settings(&config, action.as_ref()),
    }
}
