use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Deserialize;
use tar::{Builder, Header};

use super::{Delivery, ExportError, ExportJob, ExportStrategy};
use crate::document::{self, LINKED_SCRIPT_PATH, LINKED_STYLE_PATH};
use crate::host::Downloader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalMode {
    /// One self-contained HTML file
    Single,
    /// `index.html` + `css/style.css` + `js/script.js`
    #[default]
    Archive,
}

impl LocalMode {
    pub const fn default_filename(self) -> &'static str {
        match self {
            Self::Single => "prototype.html",
            Self::Archive => "prototype.tar.gz",
        }
    }
}

/// Saves the export through the downloader. No network I/O.
pub struct LocalStrategy {
    mode: LocalMode,
    filename: String,
    downloader: Arc<dyn Downloader>,
}

impl LocalStrategy {
    pub fn new(mode: LocalMode, downloader: Arc<dyn Downloader>) -> Self {
        Self {
            mode,
            filename: mode.default_filename().to_string(),
            downloader,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }
}

#[async_trait]
impl ExportStrategy for LocalStrategy {
    async fn deliver(&self, job: &ExportJob) -> Result<Delivery, ExportError> {
        let bytes = match self.mode {
            LocalMode::Single => job.document().into_bytes(),
            LocalMode::Archive => build_archive(job).map_err(ExportError::Archive)?,
        };
        let path = self
            .downloader
            .save(&self.filename, &bytes)
            .map_err(|e| ExportError::Save(self.filename.clone(), e))?;
        crate::log!("export"; "saved {}", path.display());
        Ok(Delivery::Saved(path))
    }
}

/// Gzipped tarball with the linked document and the two sources.
pub fn build_archive(job: &ExportJob) -> io::Result<Vec<u8>> {
    let index = document::build_linked(&job.buffers, &job.settings, &job.libraries);
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());

    {
        let mut builder = Builder::new(&mut encoder);
        append(&mut builder, "index.html", &index)?;
        append(&mut builder, LINKED_STYLE_PATH, &job.buffers.style)?;
        append(&mut builder, LINKED_SCRIPT_PATH, &job.buffers.script)?;
        builder.finish()?;
    }

    encoder.flush()?;
    encoder.finish()
}

fn append<W: Write>(builder: &mut Builder<W>, path: &str, content: &str) -> io::Result<()> {
    let mut header = Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, path, content.as_bytes())
}
