//! `[preview]` section configuration.
//!
//! ```toml
//! [preview]
//! interface = "127.0.0.1"     # 0.0.0.0 to preview from other devices
//! port = 5280                 # HTTP port, retried upward when busy
//! ws_port = 35730             # bridge port, retried upward when busy
//! path = "/prototype"
//! privileged_path = "/prototype/privileged"
//! libraries = ["https://code.jquery.com/jquery-3.7.1.min.js"]
//! ready_timeout_secs = 30
//! open_browser = true
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::Deserialize;

use crate::document::Library;
use crate::session::PrototypeUrls;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub interface: IpAddr,
    pub port: u16,
    pub ws_port: u16,
    /// Prototype URL path.
    pub path: String,
    /// Prototype URL path when `chrome-privilege-enabled` is set.
    pub privileged_path: String,
    /// Scripts loaded by the preview, in order.
    pub libraries: Vec<String>,
    pub ready_timeout_secs: u64,
    /// Open surfaces in the system browser instead of printing their URL.
    pub open_browser: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5280,
            ws_port: 35730,
            path: "/prototype".to_string(),
            privileged_path: "/prototype/privileged".to_string(),
            libraries: Vec::new(),
            ready_timeout_secs: 30,
            open_browser: true,
        }
    }
}

impl PreviewConfig {
    pub fn urls(&self) -> PrototypeUrls {
        PrototypeUrls {
            path: self.path.clone(),
            privileged_path: self.privileged_path.clone(),
        }
    }

    pub fn libraries(&self) -> Vec<Library> {
        self.libraries.iter().map(Library::new).collect()
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }
}
