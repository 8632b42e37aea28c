//! Social post extraction (X/Twitter).
//!
//! The syndication oEmbed endpoint is the only stable way to read a post
//! without credentials. It returns a rendered blockquote; the post text
//! is recovered by stripping the markup. Protected and deleted posts 4xx
//! at the endpoint and surface as `Unsupported`.

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::content::{ExtractedContent, SourceKind};
use crate::error::{ExtractionError, Result};
use crate::extractors::{clean_text, fragment_text};
use crate::fetch::PageFetcher;

/// Minimum post text length in characters. A bare emoji reply or a lone
/// link carries no stance worth scoring.
pub const MIN_SOCIAL_CHARS: usize = 60;

const OEMBED_ENDPOINT: &str = "https://publish.twitter.com/oembed";

pub struct SocialPostExtractor {
    fetcher: Arc<dyn PageFetcher>,
}

impl SocialPostExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Extract the visible text and author of a post.
    pub async fn extract(&self, url: &Url) -> Result<ExtractedContent> {
        let oembed = self.fetcher.fetch(&oembed_url(url.as_str())).await?;
        if matches!(oembed.status, 401 | 403 | 404) {
            return Err(ExtractionError::unsupported(format!(
                "post at {} is unavailable (HTTP {}); it may be protected or deleted",
                url, oembed.status
            )));
        }
        if !oembed.is_success() {
            return Err(ExtractionError::unreachable(format!(
                "HTTP {} from oEmbed for {}",
                oembed.status, url
            )));
        }

        let payload: serde_json::Value = serde_json::from_str(&oembed.body).map_err(|e| {
            ExtractionError::unsupported(format!("unexpected oEmbed payload: {}", e))
        })?;

        let rendered = payload.get("html").and_then(|v| v.as_str()).unwrap_or("");
        let body = clean_text(&fragment_text(rendered));
        if body.chars().count() < MIN_SOCIAL_CHARS {
            return Err(ExtractionError::empty(format!(
                "recovered only {} chars of post text from {}",
                body.chars().count(),
                url
            )));
        }

        let author = payload
            .get("author_name")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let provider = payload
            .get("provider_name")
            .and_then(|v| v.as_str())
            .unwrap_or("X");

        debug!(url = %url, chars = body.chars().count(), "social post extracted");

        Ok(ExtractedContent::new(SourceKind::SocialPost, url.as_str(), body)
            .with_author(author)
            .with_note(format!("post text and author via {} oEmbed", provider)))
    }
}

fn oembed_url(post_url: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("url", post_url)
        .append_pair("omit_script", "true")
        .append_pair("dnt", "true")
        .finish();
    format!("{}?{}", OEMBED_ENDPOINT, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchedPage, StaticFetcher};

    const POST_URL: &str = "https://x.com/policywatch/status/17761234567";

    fn oembed_json() -> &'static str {
        r#"{"author_name":"Policy Watch","provider_name":"Twitter","html":"<blockquote class=\"twitter-tweet\"><p>The new budget framework trades short-term relief for long-term cuts, and nobody in the briefing wanted to say which programs absorb them.</p>&mdash; Policy Watch</blockquote>"}"#
    }

    #[tokio::test]
    async fn test_extracts_post_text_and_author() {
        let fetcher = StaticFetcher::new()
            .with_page(FetchedPage::ok(oembed_url(POST_URL), oembed_json()));
        let extractor = SocialPostExtractor::new(Arc::new(fetcher));
        let url = Url::parse(POST_URL).unwrap();

        let content = extractor.extract(&url).await.unwrap();

        assert_eq!(content.source_kind, SourceKind::SocialPost);
        assert!(content.body_text.contains("budget framework"));
        assert!(!content.body_text.contains("<blockquote"));
        assert_eq!(content.author.as_deref(), Some("Policy Watch"));
        assert_eq!(content.source_url, POST_URL);
        assert!(content.extraction_notes[0].contains("oEmbed"));
    }

    #[tokio::test]
    async fn test_deleted_post_is_unsupported() {
        let fetcher = StaticFetcher::new().with_page(
            FetchedPage::ok(oembed_url(POST_URL), "Not Found").with_status(404),
        );
        let extractor = SocialPostExtractor::new(Arc::new(fetcher));
        let url = Url::parse(POST_URL).unwrap();

        let err = extractor.extract(&url).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn test_short_post_is_empty() {
        let fetcher = StaticFetcher::new().with_page(FetchedPage::ok(
            oembed_url(POST_URL),
            r#"{"author_name":"A","html":"<blockquote><p>lol</p></blockquote>"}"#,
        ));
        let extractor = SocialPostExtractor::new(Arc::new(fetcher));
        let url = Url::parse(POST_URL).unwrap();

        let err = extractor.extract(&url).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Empty { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_propagates() {
        let fetcher = StaticFetcher::new();
        let extractor = SocialPostExtractor::new(Arc::new(fetcher));
        let url = Url::parse(POST_URL).unwrap();

        let err = extractor.extract(&url).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_unsupported() {
        let fetcher = StaticFetcher::new()
            .with_page(FetchedPage::ok(oembed_url(POST_URL), "<html>not json</html>"));
        let extractor = SocialPostExtractor::new(Arc::new(fetcher));
        let url = Url::parse(POST_URL).unwrap();

        let err = extractor.extract(&url).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Unsupported { .. }));
    }
}
