//! Single-URL content extraction for political bias analysis.
//!
//! Turns a public URL into a canonical [`ExtractedContent`] record:
//!
//! ```text
//! raw URL -> normalize_url -> classify (pure) -> extractor -> ExtractedContent
//! ```
//!
//! Three source kinds are supported: web articles, video links (YouTube),
//! and social posts (X/Twitter). Classification is host-based and never
//! touches the network. Extraction performs one bounded fetch pass through
//! a swappable [`PageFetcher`] and reports typed failures instead of
//! falling back to a different source kind.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use extraction::{ExtractionRouter, HttpPageFetcher};
//!
//! let router = ExtractionRouter::new(Arc::new(HttpPageFetcher::new()));
//! let content = router.classify_and_extract("https://example.com/2024/03/05/story").await?;
//! println!("{} chars from {}", content.char_count(), content.source_kind);
//! ```

pub mod content;
pub mod error;
pub mod extractors;
pub mod fetch;
pub mod router;

pub use content::{ExtractedContent, SourceKind};
pub use error::{ExtractionError, Result};
pub use extractors::{
    ArticleExtractor, SocialPostExtractor, VideoExtractor, MIN_ARTICLE_CHARS, MIN_SOCIAL_CHARS,
    MIN_VIDEO_CHARS,
};
pub use fetch::{FetchedPage, HttpPageFetcher, PageFetcher, StaticFetcher};
pub use router::{classify, normalize_url, ExtractionRouter};
