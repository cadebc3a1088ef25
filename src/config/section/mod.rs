//! Configuration section definitions.
//!
//! | Module    | TOML Section | Purpose                                 |
//! |-----------|--------------|-----------------------------------------|
//! | `project` | `[project]`  | Buffer files                            |
//! | `storage` | `[storage]`  | Key-value store location                |
//! | `preview` | `[preview]`  | Preview server, bridge, libraries       |
//! | `export`  | `[export]`   | Output directory and export targets     |

mod export;
mod preview;
mod project;
mod storage;

pub use export::{ExportConfig, TargetConfig};
pub use preview::PreviewConfig;
pub use project::ProjectConfig;
pub use storage::StorageConfig;
