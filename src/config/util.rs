//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from the current directory.
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_file_from(&cwd, config_name)
}

/// Walk up from `start` until a directory contains `config_name`.
///
/// ```text
/// /home/user/demo/css/          ← start
/// /home/user/demo/prototyper.toml  ← found
/// ```
pub fn find_config_file_from(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

/// Whether `s` parses as an absolute http(s) URL.
pub fn is_http_url(s: &str) -> bool {
    url::Url::parse(s).is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_walks_upward() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("prototyper.toml"), "").unwrap();

        assert_eq!(
            find_config_file_from(&nested, Path::new("prototyper.toml")),
            Some(dir.path().join("prototyper.toml"))
        );
    }

    #[test]
    fn test_find_config_missing() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            find_config_file_from(dir.path(), Path::new("no-such-config-file.toml")),
            None
        );
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://api.github.com/gists"));
        assert!(is_http_url("http://codepen.io/pen/define"));
        assert!(!is_http_url("api.github.com/gists"));
        assert!(!is_http_url("ftp://example.com/"));
        assert!(!is_http_url(""));
    }
}
