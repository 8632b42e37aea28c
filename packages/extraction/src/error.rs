//! Typed extraction errors.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match
//! on the failure kind when deciding HTTP statuses and retry behavior.

use thiserror::Error;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Errors that can occur while extracting content from a URL.
///
/// Each variant is a distinct, user-explainable failure. Extractors never
/// collapse these into a generic error string.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    /// Network-level failure: DNS, connect, TLS, timeout, or a blocking
    /// HTTP status from the target host.
    #[error("unreachable: {detail}")]
    Unreachable { detail: String },

    /// The URL is recognized but points at something the extractor cannot
    /// handle: a private or deleted item, a video host with no extraction
    /// strategy, or a section front rather than an article page.
    #[error("unsupported: {detail}")]
    Unsupported { detail: String },

    /// Extraction ran but recovered less text than the minimum threshold
    /// for the source kind.
    #[error("empty: {detail}")]
    Empty { detail: String },
}

impl ExtractionError {
    pub fn unreachable(detail: impl Into<String>) -> Self {
        Self::Unreachable {
            detail: detail.into(),
        }
    }

    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self::Unsupported {
            detail: detail.into(),
        }
    }

    pub fn empty(detail: impl Into<String>) -> Self {
        Self::Empty {
            detail: detail.into(),
        }
    }

    /// Stable lowercase name for logs and wire payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "unreachable",
            Self::Unsupported { .. } => "unsupported",
            Self::Empty { .. } => "empty",
        }
    }
}
