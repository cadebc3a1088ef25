//! `export`: dispatch the current buffers to an export target.

use anyhow::{Result, bail};

use super::common::{ingest_buffers, offline_session, runtime};
use crate::config::PrototyperConfig;

pub fn export_prototype(config: &PrototyperConfig, target: Option<&str>) -> Result<()> {
    let session = offline_session(config)?;

    let Some(target) = target else {
        crate::log!("export"; "targets: {}", session.exports().target_ids().join(", "));
        return Ok(());
    };
    if !session.exports().contains(target) {
        bail!(
            "unknown export target `{}` (available: {})",
            target,
            session.exports().target_ids().join(", ")
        );
    }

    ingest_buffers(&session, config)?;
    let delivery = runtime()?.block_on(session.export(target))?;
    crate::log!("export"; "{}: {}", target, delivery);
    Ok(())
}
