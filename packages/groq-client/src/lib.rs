//! Pure Groq REST API client
//!
//! A clean, minimal client for the Groq API with no domain-specific
//! logic. Groq serves an OpenAI-compatible surface, so the request and
//! response types follow that wire shape.
//!
//! # Example
//!
//! ```rust,ignore
//! use groq_client::{GroqClient, ChatRequest, Message};
//!
//! let client = GroqClient::from_env()?;
//!
//! let response = client.chat_completion(
//!     ChatRequest::new("llama-3.3-70b-versatile")
//!         .message(Message::user("Hello!"))
//!         .temperature(0.0),
//! ).await?;
//!
//! println!("{}", response.content);
//! ```

pub mod error;
pub mod types;

pub use error::{GroqError, Result};
pub use types::*;

use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Pure Groq API client.
#[derive(Clone)]
pub struct GroqClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    timeout: Option<Duration>,
}

impl GroqClient {
    /// Create a new Groq client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }

    /// Create from environment variable `GROQ_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .map_err(|_| GroqError::Config("GROQ_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (proxies, compatible gateways).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set a per-request timeout. Elapsing it surfaces as a
    /// [`GroqError::Network`] with `timed_out` set.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat completion.
    ///
    /// Sends the request and returns the first choice's content. Network
    /// failures, non-2xx statuses, and undecodable bodies map to the
    /// matching [`GroqError`] variants; nothing is retried here.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        use reqwest::header;

        let started = Instant::now();

        let mut builder = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "Groq request failed");
            GroqError::Network {
                message: e.to_string(),
                timed_out: e.is_timeout(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_body, "Groq API error");
            return Err(GroqError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| GroqError::Parse(format!("Failed to decode response: {}", e)))?;

        let choice = raw
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GroqError::Parse("No choices in response".into()))?;

        debug!(
            model = %request.model,
            duration_ms = started.elapsed().as_millis() as u64,
            "Chat completion successful"
        );

        Ok(ChatResponse {
            content: choice.message.content,
            usage: raw.usage,
        })
    }
}
