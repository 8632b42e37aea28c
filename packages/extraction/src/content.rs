//! Canonical content record shared by every source kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of source a URL was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Article,
    Video,
    SocialPost,
}

impl SourceKind {
    /// Stable lowercase name for logs and wire payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Article => "article",
            SourceKind::Video => "video",
            SourceKind::SocialPost => "social_post",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical record produced by a successful extraction.
///
/// `body_text` is always non-empty here; a failed extraction is a typed
/// [`crate::ExtractionError`], never a silently empty record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub source_kind: SourceKind,
    pub title: Option<String>,
    pub body_text: String,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Final URL after redirects, or the canonical URL for the item.
    pub source_url: String,
    /// Ordered notes about how extraction went: which strategy won, what
    /// degraded. Downstream scoring is told about degradations.
    pub extraction_notes: Vec<String>,
}

impl ExtractedContent {
    /// Create a record with the required fields.
    pub fn new(
        source_kind: SourceKind,
        source_url: impl Into<String>,
        body_text: impl Into<String>,
    ) -> Self {
        Self {
            source_kind,
            title: None,
            body_text: body_text.into(),
            author: None,
            published_at: None,
            source_url: source_url.into(),
            extraction_notes: Vec::new(),
        }
    }

    /// Set the title. Empty strings are ignored.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        if !title.trim().is_empty() {
            self.title = Some(title);
        }
        self
    }

    /// Set the author. Empty strings are ignored.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        let author = author.into();
        if !author.trim().is_empty() {
            self.author = Some(author);
        }
        self
    }

    /// Set the publication timestamp.
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    /// Append an extraction note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.extraction_notes.push(note.into());
        self
    }

    /// Character count of the recovered body text.
    pub fn char_count(&self) -> usize {
        self.body_text.chars().count()
    }
}
