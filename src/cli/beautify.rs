//! `beautify`: reformat the buffer files in place.

use anyhow::{Context, Result};
use std::fs;

use super::common::{ingest_buffers, offline_session};
use crate::config::PrototyperConfig;

pub fn beautify_files(config: &PrototyperConfig) -> Result<()> {
    let session = offline_session(config)?;
    ingest_buffers(&session, config)?;

    let changed = session.beautify()?;
    if changed.is_empty() {
        crate::log!("beautify"; "already formatted");
        return Ok(());
    }

    for language in changed {
        let path = config.buffer_path(language);
        let text = session.buffers().get(language)?;
        fs::write(&path, text).with_context(|| format!("Failed to write '{}'", path.display()))?;
        crate::log!("beautify"; "reformatted {}", path.display());
    }
    Ok(())
}
