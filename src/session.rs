//! The panel session: stores, preview channel, highlighter and exports
//! wired together around one project.
//!
//! Editor notifications come in through [`Session::buffer_changed`] and
//! [`Session::setting_changed`]; everything else is driven by explicit
//! `run` and `export` calls.

use std::sync::Arc;
use std::time::Duration;

use crate::beautify;
use crate::document::{self, Library, ScriptDialect};
use crate::export::{Delivery, ExportDispatcher, ExportError, ExportJob};
use crate::highlight::SelectorHighlighter;
use crate::host::{KeyValueStore, Point, SurfaceHost};
use crate::language::{Buffers, Language};
use crate::preview::{
    ChannelError, LiveUpdate, PreviewChannel, Prototype, PushOutcome, RunOutcome,
};
use crate::store::{BufferStore, SettingKey, SettingValue, Settings, SettingsStore, StoreError};

/// Prototype URL paths, chosen by `chrome-privilege-enabled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrototypeUrls {
    pub path: String,
    pub privileged_path: String,
}

impl PrototypeUrls {
    pub fn for_settings(&self, settings: &Settings) -> &str {
        if settings.chrome_privilege_enabled {
            &self.privileged_path
        } else {
            &self.path
        }
    }
}

impl Default for PrototypeUrls {
    fn default() -> Self {
        Self {
            path: "/prototype".to_string(),
            privileged_path: "/prototype/privileged".to_string(),
        }
    }
}

/// Capabilities and options a [`Session`] is built from.
pub struct SessionParts {
    pub kv: Arc<dyn KeyValueStore>,
    pub surfaces: Arc<dyn SurfaceHost>,
    pub exports: ExportDispatcher,
    pub highlighter: Option<SelectorHighlighter>,
    pub urls: PrototypeUrls,
    pub libraries: Vec<Library>,
    pub ready_timeout: Duration,
}

/// What a buffer change led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Persisted; no live surface to update.
    Saved,
    /// Persisted and patched into the live document.
    Pushed(PushOutcome),
    /// Persisted and re-run.
    Rerun(RunOutcome),
}

pub struct Session {
    settings: SettingsStore,
    buffers: BufferStore,
    channel: PreviewChannel,
    exports: ExportDispatcher,
    highlighter: Option<SelectorHighlighter>,
    urls: PrototypeUrls,
    libraries: Vec<Library>,
}

impl Session {
    /// Load settings and wire the components.
    pub fn new(parts: SessionParts) -> Result<Self, StoreError> {
        let settings = SettingsStore::load(Arc::clone(&parts.kv))?;
        Ok(Self {
            settings,
            buffers: BufferStore::new(parts.kv),
            channel: PreviewChannel::new(parts.surfaces).with_ready_timeout(parts.ready_timeout),
            exports: parts.exports,
            highlighter: parts.highlighter,
            urls: parts.urls,
            libraries: parts.libraries,
        })
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn buffers(&self) -> &BufferStore {
        &self.buffers
    }

    pub fn channel(&self) -> &PreviewChannel {
        &self.channel
    }

    pub fn exports(&self) -> &ExportDispatcher {
        &self.exports
    }

    /// Prototype URL path for the current settings.
    pub fn prototype_url(&self) -> Result<String, StoreError> {
        let settings = self.settings.snapshot()?;
        Ok(self.urls.for_settings(&settings).to_string())
    }

    /// Build the current buffers into a self-contained document.
    pub fn build(&self) -> Result<String, StoreError> {
        let buffers = self.buffers.snapshot()?;
        let settings = self.settings.snapshot()?;
        Ok(document::build_with_libraries(
            &buffers,
            &settings,
            &self.libraries,
        ))
    }

    /// Show the current buffers on the preview surface.
    pub async fn run(&self, force_new_surface: bool) -> Result<RunOutcome, ChannelError> {
        let url = self.prototype_url()?;
        let outcome = self
            .channel
            .run(force_new_surface, &url, || self.prototype())
            .await?;
        if let RunOutcome::Live(handle) = outcome {
            crate::debug!("preview"; "surface {} live at {}", handle, url);
        }
        Ok(outcome)
    }

    fn prototype(&self) -> Result<Prototype, StoreError> {
        let buffers = self.buffers.snapshot()?;
        let settings = self.settings.snapshot()?;
        Ok(Prototype {
            html: document::build(&buffers, &settings),
            js: buffers.script,
            dialect: ScriptDialect::for_settings(&settings),
            libs: self.libraries.clone(),
        })
    }

    /// Editor "changed" notification for one buffer.
    ///
    /// Style and markup edits patch the live document; script edits re-run.
    pub async fn buffer_changed(
        &self,
        language: Language,
        text: &str,
    ) -> Result<EditOutcome, ChannelError> {
        self.buffers.set(language, text)?;
        if !self.channel.is_live() {
            return Ok(EditOutcome::Saved);
        }

        match LiveUpdate::for_language(language, text) {
            Some(update) => Ok(EditOutcome::Pushed(self.channel.push_update(update))),
            None => Ok(EditOutcome::Rerun(self.run(false).await?)),
        }
    }

    /// Reformat every buffer in place.
    ///
    /// Returns the languages whose text changed; only those are written.
    pub fn beautify(&self) -> Result<Vec<Language>, StoreError> {
        let mut changed = Vec::new();
        for language in Language::ALL {
            let text = self.buffers.get(language)?;
            let pretty = beautify::beautify(language, &text);
            if pretty != text {
                self.buffers.set(language, &pretty)?;
                changed.push(language);
            }
        }
        Ok(changed)
    }

    /// Settings-panel change. Persisted immediately; takes effect on the next run.
    pub fn setting_changed(
        &self,
        key: SettingKey,
        value: impl Into<SettingValue>,
    ) -> Result<(), StoreError> {
        self.settings.set(key, value)
    }

    /// Export a fresh snapshot of the buffers to `target_id`.
    pub async fn export(&self, target_id: &str) -> Result<Delivery, ExportError> {
        let job = self.export_job(target_id)?;
        self.exports.export_to(&job).await
    }

    fn export_job(&self, target_id: &str) -> Result<ExportJob, StoreError> {
        let buffers: Buffers = self.buffers.snapshot()?;
        let settings = self.settings.snapshot()?;
        Ok(ExportJob::new(target_id, buffers, settings).with_libraries(self.libraries.clone()))
    }

    /// Pointer move over the style buffer.
    pub fn pointer_moved(&self, point: Point) {
        if let Some(highlighter) = &self.highlighter {
            highlighter.pointer_moved(point);
        }
    }

    pub fn highlighter_available(&self) -> bool {
        self.highlighter
            .as_ref()
            .is_some_and(SelectorHighlighter::is_available)
    }
}
