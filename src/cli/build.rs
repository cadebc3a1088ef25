//! `build`: print or write the built document.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use super::common::{ingest_buffers, offline_session};
use crate::config::PrototyperConfig;

pub fn build_document(config: &PrototyperConfig, output: Option<&Path>) -> Result<()> {
    let session = offline_session(config)?;
    ingest_buffers(&session, config)?;
    let document = session.build()?;

    match output {
        Some(path) => {
            let path = config.root_join(path);
            fs::write(&path, &document)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            crate::log!("build"; "wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(document.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
