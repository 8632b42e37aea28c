//! Trait abstractions for external dependencies.
//!
//! Naming convention: `Base*` for trait names.

use async_trait::async_trait;
use groq_client::{ChatRequest, GroqError};

/// Chat-completion capability the bias scorer depends on.
///
/// Production uses the Groq-backed client; tests use scripted stubs that
/// return canned content or canned transport failures.
#[async_trait]
pub trait BaseScoringModel: Send + Sync {
    /// Run one chat completion and return the raw response content.
    /// No retries at this layer.
    async fn complete(&self, request: ChatRequest) -> Result<String, GroqError>;
}
