use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{DESCRIPTION, Delivery, ExportError, ExportJob, ExportStrategy};
use crate::host::{BrowsingContext, FormRequest};

/// Browsing context the relay form targets.
const NEW_CONTEXT: &str = "_blank";

/// How buffers are laid out in the submitted form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormEncoding {
    /// One field per buffer: `html`, `css`, `js`
    #[default]
    Fields,
    /// A single `data` field holding `{description, html, css, js}` as JSON
    Json,
}

/// Cross-origin POST through a hidden, auto-submitting form.
///
/// Fire-and-forget: the remote response is never observed.
pub struct FormRelayStrategy {
    url: Option<String>,
    method: String,
    encoding: FormEncoding,
    browser: Arc<dyn BrowsingContext>,
}

impl FormRelayStrategy {
    pub fn new(url: Option<&str>, encoding: FormEncoding, browser: Arc<dyn BrowsingContext>) -> Self {
        Self {
            url: url.map(str::to_string),
            method: "post".to_string(),
            encoding,
            browser,
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_ascii_lowercase();
        self
    }

    /// The form for `job`, `None` without a destination.
    pub fn form(&self, job: &ExportJob) -> Option<FormRequest> {
        let action = self.url.as_deref().filter(|url| !url.trim().is_empty())?;

        let fields = match self.encoding {
            FormEncoding::Fields => job
                .buffers
                .iter()
                .map(|(language, text)| (language.id().to_string(), text.to_string()))
                .collect(),
            FormEncoding::Json => {
                let data = json!({
                    "description": DESCRIPTION,
                    "html": job.buffers.markup,
                    "css": job.buffers.style,
                    "js": job.buffers.script,
                });
                vec![("data".to_string(), data.to_string())]
            }
        };

        Some(FormRequest {
            action: action.to_string(),
            method: self.method.clone(),
            target: NEW_CONTEXT.to_string(),
            fields,
        })
    }
}

#[async_trait]
impl ExportStrategy for FormRelayStrategy {
    async fn deliver(&self, job: &ExportJob) -> Result<Delivery, ExportError> {
        let Some(form) = self.form(job) else {
            crate::debug!("export"; "`{}` has no destination url", job.target_id);
            return Ok(Delivery::Skipped);
        };
        self.browser.submit_form(&form)?;
        crate::log!("export"; "submitted to {}", form.action);
        Ok(Delivery::Submitted)
    }
}
