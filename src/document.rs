//! Document builder: three buffers + settings → one HTML document.
//!
//! Building is pure. The same inputs always produce the same string, and
//! the re-indentation of embedded buffers only touches the whitespace that
//! follows each newline.
//!
//! ```text
//! <!DOCTYPE html>
//! <html>
//! <head>
//!     <style>  css  </style>
//!     <script src=…>   (libraries, in order)
//! </head>
//! <body>
//!     html
//!     <script type=dialect>  js  </script>
//! </body>
//! </html>
//! ```

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::language::Buffers;
use crate::store::Settings;
use crate::utils::html::escape_attr;

/// Archive-relative path of the stylesheet in linked documents.
pub const LINKED_STYLE_PATH: &str = "css/style.css";
/// Archive-relative path of the script in linked documents.
pub const LINKED_SCRIPT_PATH: &str = "js/script.js";

/// Script execution mode of the built document. Exactly one per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptDialect {
    Classic,
    Es6,
}

impl ScriptDialect {
    pub fn for_settings(settings: &Settings) -> Self {
        if settings.es6_enabled {
            Self::Es6
        } else {
            Self::Classic
        }
    }

    /// Value of the `type` attribute on the script element.
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Classic => "text/javascript",
            Self::Es6 => "application/javascript;version=1.8",
        }
    }
}

/// Auxiliary script loaded by the prototype, e.g. a CDN build of a library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub latest: String,
}

impl Library {
    pub fn new(url: impl Into<String>) -> Self {
        Self { latest: url.into() }
    }
}

/// Build the self-contained document.
pub fn build(buffers: &Buffers, settings: &Settings) -> String {
    build_with_libraries(buffers, settings, &[])
}

/// Build the self-contained document, loading `libraries` from the head.
pub fn build_with_libraries(buffers: &Buffers, settings: &Settings, libraries: &[Library]) -> String {
    let mut head = String::new();
    head.push_str("\t<style>\n\t\t");
    head.push_str(&indent(&buffers.style, 2));
    head.push_str("\n\t</style>\n");
    push_libraries(&mut head, libraries);

    let mut body = String::new();
    body.push('\t');
    body.push_str(&indent(&buffers.markup, 1));
    body.push('\n');
    let _ = write!(
        body,
        "\t<script type=\"{}\">\n\t\t{}\n\t</script>\n",
        ScriptDialect::for_settings(settings).mime(),
        indent(&buffers.script, 2)
    );

    skeleton(&head, &body)
}

/// Build the `index.html` of an archive export: markup is embedded, style
/// and script are referenced from [`LINKED_STYLE_PATH`] and [`LINKED_SCRIPT_PATH`].
pub fn build_linked(buffers: &Buffers, settings: &Settings, libraries: &[Library]) -> String {
    let mut head = String::new();
    let _ = writeln!(head, "\t<link rel=\"stylesheet\" href=\"{LINKED_STYLE_PATH}\"/>");
    push_libraries(&mut head, libraries);

    let mut body = String::new();
    body.push('\t');
    body.push_str(&indent(&buffers.markup, 1));
    body.push('\n');
    let _ = writeln!(
        body,
        "\t<script type=\"{}\" src=\"{LINKED_SCRIPT_PATH}\"></script>",
        ScriptDialect::for_settings(settings).mime()
    );

    skeleton(&head, &body)
}

fn skeleton(head: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n\t<meta charset=\"UTF-8\"/>\n\t<title>Prototype</title>\n{head}</head>\n<body>\n{body}</body>\n</html>"
    )
}

fn push_libraries(out: &mut String, libraries: &[Library]) {
    for lib in libraries {
        let _ = writeln!(out, "\t<script src=\"{}\"></script>", escape_attr(&lib.latest));
    }
}

/// Follow every newline with `depth` tabs.
fn indent(text: &str, depth: usize) -> String {
    text.replace('\n', &format!("\n{}", "\t".repeat(depth)))
}
