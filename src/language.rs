//! Buffer languages and buffer snapshots.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the three editable source units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "html")]
    Markup,
    #[serde(rename = "css")]
    Style,
    #[serde(rename = "js")]
    Script,
}

impl Language {
    /// All languages in panel order.
    pub const ALL: [Language; 3] = [Language::Markup, Language::Style, Language::Script];

    /// Language id used for storage keys and form field names.
    pub const fn id(self) -> &'static str {
        match self {
            Self::Markup => "html",
            Self::Style => "css",
            Self::Script => "js",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" | "markup" => Ok(Self::Markup),
            "css" | "style" => Ok(Self::Style),
            "js" | "script" => Ok(Self::Script),
            other => Err(format!("unknown language `{other}` (expected html, css or js)")),
        }
    }
}

/// Snapshot of all three buffers, taken when a document is built or exported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffers {
    pub markup: String,
    pub style: String,
    pub script: String,
}

impl Buffers {
    pub fn new(
        markup: impl Into<String>,
        style: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        Self {
            markup: markup.into(),
            style: style.into(),
            script: script.into(),
        }
    }

    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::Markup => &self.markup,
            Language::Style => &self.style,
            Language::Script => &self.script,
        }
    }

    pub fn set(&mut self, language: Language, text: String) {
        match language {
            Language::Markup => self.markup = text,
            Language::Style => self.style = text,
            Language::Script => self.script = text,
        }
    }

    /// Iterate `(language, text)` pairs in panel order.
    pub fn iter(&self) -> impl Iterator<Item = (Language, &str)> {
        Language::ALL.into_iter().map(move |lang| (lang, self.get(lang)))
    }
}
