//! Page fetching.
//!
//! Extractors depend on the [`PageFetcher`] trait instead of a concrete
//! HTTP client so they can run against canned responses in tests. The
//! production implementation is [`HttpPageFetcher`]; [`StaticFetcher`]
//! serves preloaded pages for tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{ExtractionError, Result};

/// Timeout for a single fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum redirects followed per fetch.
pub const MAX_REDIRECTS: usize = 5;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// An HTTP response reduced to what extractors need.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl FetchedPage {
    /// A 200 response, mostly useful when seeding a [`StaticFetcher`].
    pub fn ok(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: 200,
            body: body.into(),
        }
    }

    /// Override the status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to fetch a URL as text.
///
/// Implementations return `Unreachable` for network-level failures and a
/// [`FetchedPage`] otherwise, including non-2xx responses. The status
/// policy belongs to the extractor: a 404 from an oEmbed endpoint means
/// a deleted post, while a 404 from a news site is just a dead link.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// Production fetcher backed by reqwest.
///
/// Presents a browser-like identity; several news sites serve bot UAs a
/// consent wall or an empty shell.
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new() -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
                .parse()
                .unwrap(),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            "en-US,en;q=0.9".parse().unwrap(),
        );

        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .timeout(FETCH_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Use a preconfigured client (custom timeout, proxy).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        debug!(url = %url, "fetching page");

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "fetch failed");
            ExtractionError::unreachable(format!("request to {} failed: {}", url, e))
        })?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| {
            warn!(url = %url, error = %e, "failed to read response body");
            ExtractionError::unreachable(format!("reading body from {} failed: {}", url, e))
        })?;

        debug!(url = %final_url, status, bytes = body.len(), "fetched page");
        Ok(FetchedPage {
            url: final_url,
            status,
            body,
        })
    }
}

/// Canned-response fetcher for tests.
///
/// Serves preloaded pages by exact URL and records every requested URL.
/// Unknown URLs report `Unreachable`, matching how a dead host behaves.
#[derive(Default)]
pub struct StaticFetcher {
    pages: Arc<RwLock<HashMap<String, FetchedPage>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a canned response, keyed by its URL.
    pub fn add(&self, page: FetchedPage) {
        self.pages.write().unwrap().insert(page.url.clone(), page);
    }

    /// Builder-style [`StaticFetcher::add`].
    pub fn with_page(self, page: FetchedPage) -> Self {
        self.add(page);
        self
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

impl Clone for StaticFetcher {
    fn clone(&self) -> Self {
        Self {
            pages: Arc::clone(&self.pages),
            calls: Arc::clone(&self.calls),
        }
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        self.calls.write().unwrap().push(url.to_string());
        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| ExtractionError::unreachable(format!("no route to {}", url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_fetcher_serves_canned_pages() {
        let fetcher = StaticFetcher::new()
            .with_page(FetchedPage::ok("https://example.com/a", "<html>a</html>"));

        let page = fetcher.fetch("https://example.com/a").await.unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(page.body, "<html>a</html>");
    }

    #[tokio::test]
    async fn test_static_fetcher_unknown_url_is_unreachable() {
        let fetcher = StaticFetcher::new();
        let err = fetcher.fetch("https://example.com/missing").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn test_static_fetcher_records_calls() {
        let fetcher = StaticFetcher::new()
            .with_page(FetchedPage::ok("https://example.com/a", "a"));

        let _ = fetcher.fetch("https://example.com/a").await;
        let _ = fetcher.fetch("https://example.com/b").await;

        assert_eq!(
            fetcher.calls(),
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }

    #[test]
    fn test_fetched_page_status_helpers() {
        assert!(FetchedPage::ok("u", "b").is_success());
        assert!(!FetchedPage::ok("u", "b").with_status(403).is_success());
    }
}
