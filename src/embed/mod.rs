//! Embedded static resources.
//!
//! - `template` - Template types for typed variable injection
//! - `preview` - Preview surface shell page and content script
//! - `init` - Files written by `prototyper init`
//!
//! # Usage
//!
//! ```ignore
//! use embed::preview::{SHELL_HTML, ShellVars, CONTENT_SCRIPT};
//!
//! let html = SHELL_HTML.render(&ShellVars { ws_port: 35730 });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod preview {
    use super::{Template, TemplateVars};

    /// Variables for shell.html.
    pub struct ShellVars {
        pub ws_port: u16,
    }

    impl TemplateVars for ShellVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__PROTOTYPER_WS_PORT__", &self.ws_port.to_string())
        }
    }

    /// Page served at the prototype URLs. Bridges the WebSocket to the
    /// attached content script.
    pub const SHELL_HTML: Template<ShellVars> = Template::new(include_str!("preview/shell.html"));

    /// Script attached to the surface on every run.
    pub const CONTENT_SCRIPT: &str = include_str!("preview/content-script.js");
}

pub mod init {
    use super::{Template, TemplateVars};

    /// Variables for prototyper.toml.
    pub struct ConfigVars<'a> {
        pub version: &'a str,
    }

    impl TemplateVars for ConfigVars<'_> {
        fn apply(&self, content: &str) -> String {
            content.replace("__PROTOTYPER_VERSION__", self.version)
        }
    }

    pub const CONFIG_TOML: Template<ConfigVars<'static>> =
        Template::new(include_str!("init/prototyper.toml"));
}
