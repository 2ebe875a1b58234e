//! Page extraction: the request/response exchange between a front end and
//! whatever holds the page the user is looking at.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::{ChatError, Result};
use crate::html;

/// Message sent to an extractor.
///
/// Serializes as `{"action": "extract_content"}`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ExtractionRequest {
    ExtractContent,
}

/// Title, address and normalized text of a page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub title: String,
    pub url: String,
    pub text: String,
}

/// Reply to an [`ExtractionRequest`]: page content or an error, never both.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ExtractionResult {
    Content(PageContent),
    Failed { error: String },
}

impl ExtractionResult {
    pub fn failed(error: impl Into<String>) -> Self {
        ExtractionResult::Failed { error: error.into() }
    }

    pub fn into_result(self) -> Result<PageContent> {
        match self {
            ExtractionResult::Content(page) => Ok(page),
            ExtractionResult::Failed { error } => Err(ChatError::Extraction(error)),
        }
    }
}

/// Extract title and content text from a loaded document.
pub fn extract_document(source_html: &str, url: &str) -> PageContent {
    PageContent {
        title: html::title(source_html),
        url: url.to_string(),
        text: html::page_text(source_html),
    }
}

/// Answers extraction requests. Implementations convert every failure into
/// [`ExtractionResult::Failed`] instead of returning an error.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn handle(&self, request: ExtractionRequest) -> ExtractionResult;
}

/// Where the currently open page comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    Remote(Url),
    File(PathBuf),
}

impl PageSource {
    /// Accepts `http(s)://` and `file://` URLs, or a filesystem path.
    pub fn parse(target: &str) -> Result<Self> {
        let target = target.trim();
        if target.is_empty() {
            return Err(ChatError::Extraction("No page given.".to_string()));
        }
        match Url::parse(target) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(PageSource::Remote(url)),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(PageSource::File)
                .map_err(|_| ChatError::Extraction(format!("Invalid file URL: {}", target))),
            Ok(url) if url.scheme().len() > 1 => Err(ChatError::Extraction(format!(
                "Unsupported page scheme: {}",
                url.scheme()
            ))),
            // Plain paths, including Windows drive paths that parse as a one-letter scheme.
            _ => Ok(PageSource::File(PathBuf::from(target))),
        }
    }

    /// Address reported alongside extracted content.
    pub fn display_url(&self) -> String {
        match self {
            PageSource::Remote(url) => url.to_string(),
            PageSource::File(path) => {
                let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.clone());
                Url::from_file_path(&absolute)
                    .map(|url| url.to_string())
                    .unwrap_or_else(|_| absolute.display().to_string())
            }
        }
    }
}

/// Extractor over the page the user currently has open.
pub struct ActivePageExtractor {
    client: Client,
    page: RwLock<Option<PageSource>>,
}

impl Default for ActivePageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivePageExtractor {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            page: RwLock::new(None),
        }
    }

    pub fn with_page(page: PageSource) -> Self {
        let extractor = Self::new();
        extractor.open(page);
        extractor
    }

    /// Make `page` the active page.
    pub fn open(&self, page: PageSource) {
        tracing::debug!(page = %page.display_url(), "opened page");
        *self.page.write().unwrap_or_else(|e| e.into_inner()) = Some(page);
    }

    pub fn current(&self) -> Option<PageSource> {
        self.page.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn load(&self, page: &PageSource) -> Result<(String, String)> {
        match page {
            PageSource::Remote(url) => {
                let response = self.client.get(url.clone()).send().await?;
                if !response.status().is_success() {
                    return Err(ChatError::Extraction(format!(
                        "page returned HTTP {}",
                        response.status()
                    )));
                }
                // Report the address after redirects, like the browser would.
                let final_url = response.url().to_string();
                let body = response.text().await?;
                Ok((body, final_url))
            }
            PageSource::File(path) => {
                let body = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| ChatError::Extraction(format!("{}: {}", path.display(), e)))?;
                Ok((body, page.display_url()))
            }
        }
    }
}

#[async_trait]
impl PageExtractor for ActivePageExtractor {
    async fn handle(&self, request: ExtractionRequest) -> ExtractionResult {
        match request {
            ExtractionRequest::ExtractContent => {
                let Some(page) = self.current() else {
                    return ExtractionResult::failed("Could not extract content.");
                };
                match self.load(&page).await {
                    Ok((body, url)) => ExtractionResult::Content(extract_document(&body, &url)),
                    Err(e) => {
                        tracing::warn!(page = %page.display_url(), error = %e, "extraction failed");
                        ExtractionResult::failed(format!("Failed to extract content: {}", e))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    const PAGE: &str = "<html><head><title>Docs</title></head><body>\
        <main>Main area</main><article><h1>Guide</h1><p>Step   one.</p></article></body></html>";

    #[test]
    fn test_request_wire_format() {
        assert_eq!(
            serde_json::to_value(ExtractionRequest::ExtractContent).unwrap(),
            json!({"action": "extract_content"})
        );
        let parsed: ExtractionRequest = serde_json::from_value(json!({"action": "extract_content"})).unwrap();
        assert_eq!(parsed, ExtractionRequest::ExtractContent);
    }

    #[test]
    fn test_result_wire_format() {
        let ok: ExtractionResult =
            serde_json::from_value(json!({"title": "t", "url": "u", "text": "x", "error": null})).unwrap();
        assert!(matches!(ok, ExtractionResult::Content(_)));

        let failed: ExtractionResult = serde_json::from_value(json!({"error": "boom"})).unwrap();
        assert_eq!(failed, ExtractionResult::failed("boom"));
        assert!(matches!(failed.into_result(), Err(ChatError::Extraction(msg)) if msg == "boom"));
    }

    #[test]
    fn test_extract_document() {
        let page = extract_document(PAGE, "https://example.com/docs");
        assert_eq!(page.title, "Docs");
        assert_eq!(page.url, "https://example.com/docs");
        assert_eq!(page.text, "Guide Step one.");
    }

    #[test]
    fn test_page_source_parse() {
        assert!(matches!(
            PageSource::parse("https://example.com").unwrap(),
            PageSource::Remote(_)
        ));
        assert_eq!(
            PageSource::parse("./page.html").unwrap(),
            PageSource::File(PathBuf::from("./page.html"))
        );
        assert!(PageSource::parse("ftp://example.com").is_err());
        assert!(PageSource::parse("   ").is_err());
    }

    #[tokio::test]
    async fn test_no_page_open() {
        let extractor = ActivePageExtractor::new();
        let result = extractor.handle(ExtractionRequest::ExtractContent).await;
        assert_eq!(result, ExtractionResult::failed("Could not extract content."));
    }

    #[tokio::test]
    async fn test_remote_page() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/docs"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/docs", server.uri());
        let extractor = ActivePageExtractor::with_page(PageSource::parse(&url).unwrap());
        let page = extractor
            .handle(ExtractionRequest::ExtractContent)
            .await
            .into_result()
            .unwrap();
        assert_eq!(page.title, "Docs");
        assert_eq!(page.url, url);
        assert_eq!(page.text, "Guide Step one.");
    }

    #[tokio::test]
    async fn test_remote_page_error_status() {
        let server = MockServer::start().await;
        Mock::given(matchers::any())
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let extractor = ActivePageExtractor::with_page(PageSource::parse(&server.uri()).unwrap());
        match extractor.handle(ExtractionRequest::ExtractContent).await {
            ExtractionResult::Failed { error } => {
                assert!(error.starts_with("Failed to extract content:"), "{error}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_local_file_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<body><p>From disk</p></body>").unwrap();

        let extractor = ActivePageExtractor::with_page(PageSource::File(path));
        let page = extractor
            .handle(ExtractionRequest::ExtractContent)
            .await
            .into_result()
            .unwrap();
        assert_eq!(page.text, "From disk");
        assert!(page.url.starts_with("file://"));
    }

    #[tokio::test]
    async fn test_missing_file_is_reported() {
        let extractor = ActivePageExtractor::with_page(PageSource::File(PathBuf::from(
            "/definitely/not/here.html",
        )));
        let result = extractor.handle(ExtractionRequest::ExtractContent).await;
        assert!(matches!(result, ExtractionResult::Failed { .. }));
    }
}
