use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{DESCRIPTION, Delivery, ExportError, ExportJob, ExportStrategy};
use crate::host::{BrowsingContext, HttpClient};

/// The only field read from a successful response.
#[derive(Debug, Deserialize)]
struct Created {
    html_url: Option<String>,
}

/// Authenticated JSON POST creating a remote paste, opened on success.
pub struct ApiStrategy {
    endpoint: String,
    filename: String,
    description: String,
    public: bool,
    token: Option<String>,
    http: Arc<dyn HttpClient>,
    browser: Arc<dyn BrowsingContext>,
}

impl ApiStrategy {
    pub fn new(
        endpoint: impl Into<String>,
        http: Arc<dyn HttpClient>,
        browser: Arc<dyn BrowsingContext>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            filename: "prototype.html".to_string(),
            description: DESCRIPTION.to_string(),
            public: true,
            token: None,
            http,
            browser,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// `{files: {<filename>: {content}}, description, public}`
    pub fn payload(&self, job: &ExportJob) -> Value {
        let mut files = Map::new();
        files.insert(self.filename.clone(), json!({ "content": job.document() }));
        json!({
            "files": files,
            "description": self.description,
            "public": self.public,
        })
    }
}

#[async_trait]
impl ExportStrategy for ApiStrategy {
    async fn deliver(&self, job: &ExportJob) -> Result<Delivery, ExportError> {
        let response = self
            .http
            .post_json(&self.endpoint, &self.payload(job), self.token.as_deref())
            .await?;

        if !response.is_success() {
            return Err(ExportError::Status {
                url: self.endpoint.clone(),
                status: response.status,
                body: response.body,
            });
        }

        let html_url = serde_json::from_str::<Created>(&response.body)
            .ok()
            .and_then(|created| created.html_url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ExportError::InvalidResponse(self.endpoint.clone()))?;

        self.browser.open_url(&html_url)?;
        crate::log!("export"; "created {}", html_url);
        Ok(Delivery::Opened(html_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::GIST_URL;
    use crate::language::Buffers;
    use crate::store::Settings;
    use crate::testing::{FakeBrowser, FakeHttp};

    fn job() -> ExportJob {
        ExportJob::new(
            "gist",
            Buffers::new("<p>hi</p>", "p{color:red}", "console.log(1)"),
            Settings::default(),
        )
    }

    fn strategy(http: &Arc<FakeHttp>, browser: &Arc<FakeBrowser>) -> ApiStrategy {
        ApiStrategy::new(GIST_URL, http.clone(), browser.clone())
    }

    #[tokio::test]
    async fn test_created_resource_is_opened() {
        let http = Arc::new(FakeHttp::responding(
            201,
            r#"{"id":"abc","html_url":"https://gist.github.com/abc"}"#,
        ));
        let browser = Arc::new(FakeBrowser::default());

        let delivery = strategy(&http, &browser).deliver(&job()).await.unwrap();

        assert_eq!(delivery, Delivery::Opened("https://gist.github.com/abc".to_string()));
        assert_eq!(*browser.opened.lock(), ["https://gist.github.com/abc"]);

        let calls = http.calls.lock();
        assert_eq!(calls[0].url, GIST_URL);
        assert_eq!(calls[0].bearer, None);
        assert_eq!(calls[0].body["description"], DESCRIPTION);
        assert_eq!(calls[0].body["public"], true);
        assert_eq!(
            calls[0].body["files"]["prototype.html"]["content"],
            job().document()
        );
    }

    #[tokio::test]
    async fn test_token_sent_as_bearer() {
        let http = Arc::new(FakeHttp::responding(201, r#"{"html_url":"https://x"}"#));
        let browser = Arc::new(FakeBrowser::default());

        strategy(&http, &browser)
            .with_token(Some("s3cret".to_string()))
            .with_public(false)
            .deliver(&job())
            .await
            .unwrap();

        let calls = http.calls.lock();
        assert_eq!(calls[0].bearer.as_deref(), Some("s3cret"));
        assert_eq!(calls[0].body["public"], false);
    }

    #[tokio::test]
    async fn test_non_success_opens_nothing() {
        let http = Arc::new(FakeHttp::responding(422, r#"{"message":"Validation Failed"}"#));
        let browser = Arc::new(FakeBrowser::default());

        let err = strategy(&http, &browser).deliver(&job()).await.unwrap_err();

        assert!(matches!(err, ExportError::Status { status: 422, ref body, .. } if body.contains("Validation")));
        assert!(browser.opened.lock().is_empty());
    }

    #[tokio::test]
    async fn test_missing_html_url_opens_nothing() {
        let http = Arc::new(FakeHttp::responding(200, r#"{"id":"abc"}"#));
        let browser = Arc::new(FakeBrowser::default());

        let err = strategy(&http, &browser).deliver(&job()).await.unwrap_err();

        assert!(matches!(err, ExportError::InvalidResponse(_)));
        assert!(browser.opened.lock().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_opens_nothing() {
        let http = Arc::new(FakeHttp::unreachable());
        let browser = Arc::new(FakeBrowser::default());

        let err = strategy(&http, &browser).deliver(&job()).await.unwrap_err();

        assert!(matches!(err, ExportError::Network(_)));
        assert!(browser.opened.lock().is_empty());
    }
}
