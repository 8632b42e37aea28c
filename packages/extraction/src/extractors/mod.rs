//! Source-kind extractors.
//!
//! Each extractor implements one `extract(&Url) -> ExtractedContent` pass
//! against the shared [`crate::PageFetcher`] capability. Minimum-content
//! thresholds are fixed constants per kind; falling below one is a typed
//! `Empty` failure so the scorer never receives navigation chrome or a
//! bare headline.

pub mod article;
pub mod social;
pub mod video;

pub use article::{ArticleExtractor, MIN_ARTICLE_CHARS};
pub use social::{SocialPostExtractor, MIN_SOCIAL_CHARS};
pub use video::{VideoExtractor, MIN_VIDEO_CHARS};

/// Collapse runs of whitespace to single spaces and trim the ends.
pub(crate) fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the body of a JSON string literal (escape sequences intact,
/// surrounding quotes stripped). Falls back to naive unescaping when the
/// payload is not quite valid JSON.
pub(crate) fn decode_json_string(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| {
        raw.replace("\\n", " ")
            .replace("\\\"", "\"")
            .replace("\\/", "/")
    })
}

/// Convert an HTML fragment to readable text: Markdown via htmd, plain
/// text collection when conversion fails.
pub(crate) fn html_to_text(html: &str) -> String {
    match htmd::convert(html) {
        Ok(markdown) => markdown,
        Err(_) => fragment_text(html),
    }
}

/// Plain text nodes of an HTML fragment, markup stripped.
pub(crate) fn fragment_text(html: &str) -> String {
    scraper::Html::parse_fragment(html)
        .root_element()
        .text()
        .collect::<String>()
}
