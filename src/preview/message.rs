//! Preview message protocol.
//!
//! Two layers travel over the WebSocket bridge:
//!
//! - [`PreviewMessage`]: topic + payload messages understood by the content
//!   script (`new-prototype`, `css-update`, `html-update`)
//! - [`BridgeFrame`] / [`ClientFrame`]: the surface control frames that carry
//!   them, plus attach/reload/navigate and the ready handshake

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::Library;
use crate::language::Language;

/// Message sent to the content script over a surface port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "topic", content = "payload", rename_all = "kebab-case")]
pub enum PreviewMessage {
    /// Replace the whole document, inject the script, load libraries in order
    NewPrototype {
        html: String,
        js: String,
        /// `type` attribute of the injected script
        #[serde(rename = "type")]
        script_type: String,
        libs: Vec<Library>,
    },
    /// Replace the content of the single style block
    CssUpdate(String),
    /// Replace the body markup
    HtmlUpdate(String),
}

impl PreviewMessage {
    pub const fn topic(&self) -> &'static str {
        match self {
            Self::NewPrototype { .. } => "new-prototype",
            Self::CssUpdate(_) => "css-update",
            Self::HtmlUpdate(_) => "html-update",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Self::NewPrototype {
                html,
                js,
                script_type,
                libs,
            } => serde_json::json!({
                "html": html,
                "js": js,
                "type": script_type,
                "libs": libs,
            }),
            Self::CssUpdate(text) | Self::HtmlUpdate(text) => Value::String(text.clone()),
        }
    }

    /// Whether this message replaces the whole document.
    pub const fn is_full_reload(&self) -> bool {
        matches!(self, Self::NewPrototype { .. })
    }
}

/// An incremental update of a live document.
///
/// Only style and markup can be patched in place. Script edits always go
/// through a full run, so there is no script variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveUpdate {
    Css(String),
    Html(String),
}

impl LiveUpdate {
    /// The incremental update for an edit of `language`, `None` for script.
    pub fn for_language(language: Language, text: impl Into<String>) -> Option<Self> {
        match language {
            Language::Style => Some(Self::Css(text.into())),
            Language::Markup => Some(Self::Html(text.into())),
            Language::Script => None,
        }
    }

    pub fn into_message(self) -> PreviewMessage {
        match self {
            Self::Css(text) => PreviewMessage::CssUpdate(text),
            Self::Html(text) => PreviewMessage::HtmlUpdate(text),
        }
    }
}

/// Server → surface control frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BridgeFrame {
    /// Evaluate a content script in the loaded document
    Attach { script: String },
    /// Reload the current document
    Reload,
    /// Load another prototype path
    Navigate { url: String },
    /// Deliver a port message to the attached content script
    Message { topic: String, payload: Value },
}

impl BridgeFrame {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }
}

/// Surface → server frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    /// Document finished loading and is ready to receive a script
    Ready { surface: u64, url: String },
}

impl ClientFrame {
    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_prototype_serialization() {
        let msg = PreviewMessage::NewPrototype {
            html: "<p>hi</p>".to_string(),
            js: "go()".to_string(),
            script_type: "text/javascript".to_string(),
            libs: vec![Library::new("https://cdn.example/lib.js")],
        };

        assert_eq!(msg.topic(), "new-prototype");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "topic": "new-prototype",
                "payload": {
                    "html": "<p>hi</p>",
                    "js": "go()",
                    "type": "text/javascript",
                    "libs": [{"latest": "https://cdn.example/lib.js"}],
                },
            })
        );
        assert_eq!(msg.payload(), serde_json::to_value(&msg).unwrap()["payload"]);
    }

    #[test]
    fn test_update_payload_is_plain_text() {
        let msg = PreviewMessage::CssUpdate("p{}".to_string());
        assert_eq!(msg.topic(), "css-update");
        assert_eq!(msg.payload(), json!("p{}"));
        assert!(!msg.is_full_reload());
    }

    #[test]
    fn test_live_update_excludes_script() {
        assert!(LiveUpdate::for_language(Language::Script, "x()").is_none());
        assert_eq!(
            LiveUpdate::for_language(Language::Markup, "<b>").map(LiveUpdate::into_message),
            Some(PreviewMessage::HtmlUpdate("<b>".to_string()))
        );
    }

    #[test]
    fn test_bridge_frames() {
        assert_eq!(BridgeFrame::Reload.to_json(), r#"{"type":"reload"}"#);

        let frame = BridgeFrame::Message {
            topic: "css-update".to_string(),
            payload: json!("p{}"),
        };
        assert_eq!(
            frame.to_json(),
            r#"{"type":"message","topic":"css-update","payload":"p{}"}"#
        );

        assert_eq!(
            ClientFrame::from_json(r#"{"type":"ready","surface":3,"url":"/prototype"}"#),
            Some(ClientFrame::Ready {
                surface: 3,
                url: "/prototype".to_string()
            })
        );
        assert_eq!(ClientFrame::from_json(r#"{"type":"page"}"#), None);
    }
}
