//! Project initialization.
//!
//! Writes `prototyper.toml`, the three buffer files and ignore patterns for
//! the store. Existing files are never overwritten.

use anyhow::{Context, Result};
use std::{fs, path::Path};

use crate::config::{CONFIG_FILE, PrototyperConfig};
use crate::embed::init::{CONFIG_TOML, ConfigVars};
use crate::language::Language;

/// Files to write ignore patterns to
const IGNORE_FILES: &[&str] = &[".gitignore"];

/// Generate prototyper.toml content
pub fn generate_config_template() -> String {
    CONFIG_TOML.render(&ConfigVars {
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Initialize the project at `root`.
///
/// If `dry_run` is true, only prints the config template to stdout.
pub fn init_project(root: &Path, dry_run: bool) -> Result<()> {
    if dry_run {
        print!("{}", generate_config_template());
        return Ok(());
    }

    let config_path = root.join(CONFIG_FILE);
    if write_if_missing(&config_path, &generate_config_template())? {
        crate::log!("init"; "created {}", CONFIG_FILE);
    } else {
        crate::log!("init"; "{} already exists, keeping it", CONFIG_FILE);
    }

    // Buffer paths come from the config actually on disk
    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read '{}'", config_path.display()))?;
    let config = PrototyperConfig::from_str(&content)?;

    for language in Language::ALL {
        let path = root.join(config.project.file(language));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create '{}'", parent.display()))?;
        }
        if write_if_missing(&path, "")? {
            crate::debug!("init"; "created {}", path.display());
        }
    }

    write_ignore_files(root, &config.storage.path)?;

    crate::log!("init"; "project initialized, run `prototyper serve` to preview");
    Ok(())
}

/// Write `content` unless `path` exists. Returns whether it was written.
fn write_if_missing(path: &Path, content: &str) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    fs::write(path, content).with_context(|| format!("Failed to write '{}'", path.display()))?;
    Ok(true)
}

/// Write `.gitignore` with the store directory, if there is none yet.
fn write_ignore_files(root: &Path, store_path: &Path) -> Result<()> {
    let store_dir = store_path.parent().filter(|p| !p.as_os_str().is_empty());
    let store_pattern = match store_dir {
        Some(dir) => format!("/{}/", dir.display()),
        None => format!("/{}", store_path.display()),
    };
    let content = [store_pattern.as_str(), ".DS_Store"].join("\n");

    for filename in IGNORE_FILES {
        write_if_missing(&root.join(filename), &content)?;
    }
    Ok(())
}
