//! Desktop adapters: system browser and directory downloads.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use super::{BrowserError, BrowsingContext, Downloader, FormRequest};
use crate::utils::html::{escape, escape_attr};

/// Counter for relay page file names within one process.
static RELAY_SEQ: AtomicU64 = AtomicU64::new(0);

const RELAY_PREFIX: &str = "prototyper-relay-";

/// Relay pages older than this have long been loaded by the browser.
const RELAY_MAX_AGE: Duration = Duration::from_secs(60);

/// Opens URLs in the system browser.
///
/// Forms are relayed through a throwaway page that submits itself on load,
/// so the browser performs the cross-origin POST. The page has to outlive
/// `open::that`, so stale pages are swept before each new one is written.
pub struct DesktopBrowser {
    relay_dir: PathBuf,
}

impl DesktopBrowser {
    /// Keep relay pages in `dir`, created on first use.
    pub fn with_relay_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            relay_dir: dir.into(),
        }
    }

    fn write_relay_page(&self, form: &FormRequest) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.relay_dir)?;
        sweep_relay_pages(&self.relay_dir, RELAY_MAX_AGE);

        let seq = RELAY_SEQ.fetch_add(1, Ordering::Relaxed);
        let path = self
            .relay_dir
            .join(format!("{RELAY_PREFIX}{}-{}.html", std::process::id(), seq));
        fs::write(&path, render_relay_page(form))?;
        Ok(path)
    }
}

/// Remove relay pages in `dir` last modified more than `max_age` ago.
fn sweep_relay_pages(dir: &Path, max_age: Duration) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let now = SystemTime::now();
    for entry in entries.flatten() {
        if !entry.file_name().to_string_lossy().starts_with(RELAY_PREFIX) {
            continue;
        }
        let stale = entry
            .metadata()
            .and_then(|m| m.modified())
            .is_ok_and(|modified| now.duration_since(modified).unwrap_or_default() >= max_age);
        if stale && let Err(e) = fs::remove_file(entry.path()) {
            crate::debug!("browser"; "failed to remove {}: {}", entry.path().display(), e);
        }
    }
}

impl BrowsingContext for DesktopBrowser {
    fn open_url(&self, url: &str) -> Result<(), BrowserError> {
        crate::debug!("browser"; "open {}", url);
        open::that(url).map_err(|e| BrowserError(e.to_string()))
    }

    fn submit_form(&self, form: &FormRequest) -> Result<(), BrowserError> {
        let page = self
            .write_relay_page(form)
            .map_err(|e| BrowserError(format!("failed to write relay page: {e}")))?;
        crate::debug!("browser"; "relay {} via {}", form.action, page.display());
        open::that(&page).map_err(|e| BrowserError(e.to_string()))
    }
}

/// Render a hidden form that submits itself into `form.target`.
pub fn render_relay_page(form: &FormRequest) -> String {
    let mut fields = String::new();
    for (name, value) in &form.fields {
        fields.push_str(&format!(
            // The parser drops one newline right after the start tag
            "\t\t<textarea name=\"{}\">\n{}</textarea>\n",
            escape_attr(name),
            escape(value)
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
	<meta charset="UTF-8"/>
	<title>Exporting prototype…</title>
</head>
<body onload="document.forms[0].submit()">
	<form action="{action}" method="{method}" target="{target}" style="display:none">
{fields}	</form>
</body>
</html>
"#,
        action = escape_attr(&form.action),
        method = escape_attr(&form.method.to_ascii_lowercase()),
        target = escape_attr(&form.target),
    )
}

/// Saves exported files into a fixed directory.
pub struct DirectoryDownloader {
    dir: PathBuf,
}

impl DirectoryDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Downloader for DirectoryDownloader {
    fn save(&self, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_form() -> FormRequest {
        FormRequest {
            action: "https://example.com/post?a=1&b=2".to_string(),
            method: "POST".to_string(),
            target: "_blank".to_string(),
            fields: vec![
                ("html".to_string(), "<p>hi</p>".to_string()),
                ("css".to_string(), "p{color:red}".to_string()),
            ],
        }
    }

    #[test]
    fn test_relay_page_escapes_fields() {
        let page = render_relay_page(&sample_form());
        assert!(page.contains(r#"action="https://example.com/post?a=1&amp;b=2""#));
        assert!(page.contains(r#"method="post""#));
        assert!(page.contains(r#"target="_blank""#));
        assert!(page.contains("<textarea name=\"html\">\n&lt;p&gt;hi&lt;/p&gt;</textarea>"));
        assert!(page.contains("document.forms[0].submit()"));
    }

    #[test]
    fn test_relay_page_keeps_leading_newline() {
        let mut form = sample_form();
        form.fields = vec![("js".to_string(), "\nrun();".to_string())];
        let page = render_relay_page(&form);
        assert!(page.contains("<textarea name=\"js\">\n\nrun();</textarea>"));
    }

    #[test]
    fn test_relay_page_written_to_dir() {
        let dir = TempDir::new().unwrap();
        let browser = DesktopBrowser::with_relay_dir(dir.path().join("relay"));
        let path = browser.write_relay_page(&sample_form()).unwrap();
        assert!(path.starts_with(dir.path().join("relay")));
        assert!(fs::read_to_string(path).unwrap().contains("<form"));
    }

    #[test]
    fn test_sweep_removes_only_stale_relay_pages() {
        let dir = TempDir::new().unwrap();
        let browser = DesktopBrowser::with_relay_dir(dir.path());
        let first = browser.write_relay_page(&sample_form()).unwrap();
        let second = browser.write_relay_page(&sample_form()).unwrap();
        fs::write(dir.path().join("notes.html"), "keep").unwrap();

        // Fresh pages survive the sweep done on write
        assert!(first.exists());

        sweep_relay_pages(dir.path(), Duration::ZERO);
        assert!(!first.exists());
        assert!(!second.exists());
        assert!(dir.path().join("notes.html").exists());
    }

    #[test]
    fn test_directory_downloader_creates_dir() {
        let dir = TempDir::new().unwrap();
        let downloader = DirectoryDownloader::new(dir.path().join("out"));
        let path = downloader.save("prototype.html", b"<html></html>").unwrap();
        assert_eq!(path, dir.path().join("out/prototype.html"));
        assert_eq!(fs::read(path).unwrap(), b"<html></html>");
    }
}
