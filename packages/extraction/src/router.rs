//! URL classification and extraction dispatch.
//!
//! Classification is pure host matching over three source kinds, checked
//! in priority order: video hosts, then social hosts, then article as the
//! default. The router runs exactly one extractor per call and never
//! falls back across kinds; a broken video fetch must surface as a video
//! failure, not come back as an empty "article".

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::content::{ExtractedContent, SourceKind};
use crate::error::{ExtractionError, Result};
use crate::extractors::{ArticleExtractor, SocialPostExtractor, VideoExtractor};
use crate::fetch::PageFetcher;

/// Hosts classified as video links. Subdomains match too, so
/// `www.youtube.com` and `m.youtube.com` are covered. Only YouTube has an
/// extraction strategy; other entries are recognized and reported
/// `Unsupported` by the video extractor.
const VIDEO_HOSTS: &[&str] = &["youtube.com", "youtu.be", "vimeo.com"];

/// Hosts classified as social posts. Subdomains match, which covers
/// `mobile.twitter.com`.
const SOCIAL_HOSTS: &[&str] = &["twitter.com", "x.com"];

/// Normalize a raw URL: trim whitespace, default the scheme to https,
/// and validate shape.
pub fn normalize_url(raw: &str) -> Result<Url> {
    let candidate = raw.trim();
    if candidate.is_empty() {
        return Err(ExtractionError::unsupported("empty URL"));
    }

    let candidate = if candidate.contains("://") {
        candidate.to_string()
    } else {
        format!("https://{}", candidate)
    };

    let url = Url::parse(&candidate)
        .map_err(|e| ExtractionError::unsupported(format!("invalid URL: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ExtractionError::unsupported(format!(
            "unsupported scheme: {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(ExtractionError::unsupported("URL has no host"));
    }

    Ok(url)
}

/// Classify a normalized URL into a source kind.
///
/// Pure host matching; no network access, no fetching.
pub fn classify(url: &Url) -> SourceKind {
    let host = url.host_str().unwrap_or("").to_ascii_lowercase();

    if host_matches(&host, VIDEO_HOSTS) {
        return SourceKind::Video;
    }
    if host_matches(&host, SOCIAL_HOSTS) {
        return SourceKind::SocialPost;
    }
    SourceKind::Article
}

/// True when the host equals an entry or is a subdomain of one.
/// `www.youtube.com` matches `youtube.com`; `notyoutube.com` does not.
fn host_matches(host: &str, table: &[&str]) -> bool {
    table
        .iter()
        .any(|entry| host == *entry || host.ends_with(&format!(".{}", entry)))
}

/// Classifies URLs and dispatches to the matching extractor.
pub struct ExtractionRouter {
    article: ArticleExtractor,
    video: VideoExtractor,
    social: SocialPostExtractor,
}

impl ExtractionRouter {
    /// Build a router whose extractors share one fetcher.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            article: ArticleExtractor::new(fetcher.clone()),
            video: VideoExtractor::new(fetcher.clone()),
            social: SocialPostExtractor::new(fetcher),
        }
    }

    /// Classify `raw_url` and run the matching extractor once.
    ///
    /// Errors from the selected extractor propagate as-is.
    pub async fn classify_and_extract(&self, raw_url: &str) -> Result<ExtractedContent> {
        let url = normalize_url(raw_url)?;
        let kind = classify(&url);
        debug!(url = %url, kind = %kind, "classified URL");

        match kind {
            SourceKind::Article => self.article.extract(&url).await,
            SourceKind::Video => self.video.extract(&url).await,
            SourceKind::SocialPost => self.social.extract(&url).await,
        }
    }
}
