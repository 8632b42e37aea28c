//! Bias scoring.
//!
//! Builds a deterministic prompt from extracted content, runs it through
//! a [`BaseScoringModel`] under a per-attempt timeout, retries transient
//! failures with exponential backoff, and parses the response into a
//! validated [`BiasVerdict`]. A response whose label cannot be recovered
//! is a `MalformedResponse` failure; the label is never defaulted.

use std::sync::Arc;
use std::time::Duration;

use groq_client::{ChatRequest, GroqError, Message};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use extraction::ExtractedContent;

use super::source_lean::{source_lean, SourceLean};
use super::traits::BaseScoringModel;
use super::DEFAULT_BIAS_MODEL;

/// Per-attempt timeout for a model call.
pub const SCORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Retries after the first attempt, transient failures only.
pub const MAX_SCORE_RETRIES: u32 = 2;

/// Backoff before the first retry; doubles per retry.
pub const RETRY_BASE_MS: u64 = 700;

/// Extracted text is capped to this many characters in the prompt.
pub const MAX_PROMPT_CHARS: usize = 6500;

/// Confidence nudge applied when a catalogued outlet lean agrees with
/// the model's label.
pub const SOURCE_AGREEMENT_BONUS: f32 = 0.15;

const MAX_VERDICT_TOKENS: u32 = 900;

const SYSTEM_PROMPT: &str = "You are a JSON-only political bias API.";

/// Political lean labels the scorer may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiasLabel {
    Left,
    Center,
    Right,
}

impl BiasLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BiasLabel::Left => "Left",
            BiasLabel::Center => "Center",
            BiasLabel::Right => "Right",
        }
    }

    /// Parse a model-reported label, accepting the synonym families the
    /// models actually emit.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "left" | "liberal" | "progressive" => Some(Self::Left),
            "center" | "centre" | "centrist" | "neutral" => Some(Self::Center),
            "right" | "conservative" => Some(Self::Right),
            _ => None,
        }
    }
}

impl std::fmt::Display for BiasLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validated verdict produced by the scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasVerdict {
    pub label: BiasLabel,
    /// Model-reported certainty in the label, clamped to 0..=1. Absent
    /// when the model declined to report one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub summary: String,
    /// May be empty when the model output was truncated.
    pub rationale: String,
    /// May be empty when the model output was truncated.
    pub global_perspective: String,
}

/// Scoring failures. Transient kinds have already consumed the retry
/// budget by the time a caller sees them.
#[derive(Debug, Clone, Error)]
pub enum ScoringError {
    /// The model call did not complete in time, or the transport failed.
    /// The taxonomy has no separate transport variant, so exhausted
    /// non-timeout network failures surface here too.
    #[error("scoring timed out: {detail}")]
    Timeout { detail: String },

    /// Upstream rate limit still in effect after backoff.
    #[error("scoring rate limited: {detail}")]
    RateLimited { detail: String },

    /// The response carried no recoverable label and summary.
    #[error("malformed model response: {detail}")]
    MalformedResponse { detail: String },

    /// Credentials rejected or missing.
    #[error("model authentication failed: {detail}")]
    AuthFailure { detail: String },
}

impl ScoringError {
    /// Stable lowercase name for logs and wire payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::RateLimited { .. } => "rate_limited",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::AuthFailure { .. } => "auth_failure",
        }
    }
}

/// Tunables for the scorer. Defaults match production.
#[derive(Debug, Clone)]
pub struct BiasScorerConfig {
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base: Duration,
}

impl Default for BiasScorerConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_BIAS_MODEL.to_string(),
            timeout: SCORE_TIMEOUT,
            max_retries: MAX_SCORE_RETRIES,
            retry_base: Duration::from_millis(RETRY_BASE_MS),
        }
    }
}

/// Scores extracted content into a [`BiasVerdict`].
pub struct BiasScorer {
    model: Arc<dyn BaseScoringModel>,
    config: BiasScorerConfig,
}

impl BiasScorer {
    pub fn new(model: Arc<dyn BaseScoringModel>) -> Self {
        Self::with_config(model, BiasScorerConfig::default())
    }

    pub fn with_config(model: Arc<dyn BaseScoringModel>, config: BiasScorerConfig) -> Self {
        Self { model, config }
    }

    /// Score content into a verdict.
    ///
    /// One model exchange plus at most one repair pass when the response
    /// was not JSON at all. The catalogued outlet lean, when present and
    /// in agreement, nudges confidence; it never picks the label.
    pub async fn score(&self, content: &ExtractedContent) -> Result<BiasVerdict, ScoringError> {
        let prompt = build_prompt(content);
        let raw = self.call_with_retries(&prompt).await?;

        let value = match parse_json_lenient(&raw) {
            Some(v) => v,
            None => {
                debug!("model response was not JSON, attempting repair pass");
                let repair = format!(
                    "Convert the following into valid JSON matching the schema exactly. \
                     Output only the JSON object.\n\n{}",
                    raw
                );
                let repaired = self.call_with_retries(&repair).await?;
                parse_json_lenient(&repaired).ok_or_else(|| ScoringError::MalformedResponse {
                    detail: "no JSON object in model response".into(),
                })?
            }
        };

        let mut verdict = verdict_from_value(&value)?;
        if let Some(lean) = source_lean(&content.source_url) {
            verdict = calibrate_confidence(verdict, lean);
        }
        Ok(verdict)
    }

    /// One model call per attempt, each under the configured timeout.
    /// Only transient failures are retried.
    async fn call_with_retries(&self, prompt: &str) -> Result<String, ScoringError> {
        let request = ChatRequest::new(&self.config.model)
            .message(Message::system(SYSTEM_PROMPT))
            .message(Message::user(prompt))
            .temperature(0.0)
            .max_tokens(MAX_VERDICT_TOKENS)
            .json_mode();

        let mut attempt: u32 = 0;
        loop {
            let call = self.model.complete(request.clone());
            let (error, transient) = match tokio::time::timeout(self.config.timeout, call).await {
                Ok(Ok(content)) if !content.trim().is_empty() => return Ok(content),
                Ok(Ok(_)) => (
                    ScoringError::MalformedResponse {
                        detail: "model returned empty content".into(),
                    },
                    true,
                ),
                Ok(Err(e)) => {
                    let transient = e.is_transient();
                    (classify_model_error(e), transient)
                }
                Err(_) => (
                    ScoringError::Timeout {
                        detail: format!(
                            "attempt exceeded {}s",
                            self.config.timeout.as_secs()
                        ),
                    },
                    true,
                ),
            };

            if !transient || attempt >= self.config.max_retries {
                return Err(error);
            }

            let backoff = self.config.retry_base * 2u32.pow(attempt);
            debug!(
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "transient scoring failure, backing off"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}

fn classify_model_error(error: GroqError) -> ScoringError {
    if error.is_timeout() {
        return ScoringError::Timeout {
            detail: error.to_string(),
        };
    }
    if error.is_rate_limited() {
        return ScoringError::RateLimited {
            detail: error.to_string(),
        };
    }
    if error.is_auth_failure() {
        return ScoringError::AuthFailure {
            detail: error.to_string(),
        };
    }
    match &error {
        GroqError::Network { .. } => ScoringError::Timeout {
            detail: error.to_string(),
        },
        GroqError::Api { status, .. } if *status >= 500 => ScoringError::Timeout {
            detail: error.to_string(),
        },
        GroqError::Api { .. } => ScoringError::MalformedResponse {
            detail: error.to_string(),
        },
        GroqError::Config(_) => ScoringError::AuthFailure {
            detail: error.to_string(),
        },
        GroqError::Parse(_) => ScoringError::MalformedResponse {
            detail: error.to_string(),
        },
    }
}

/// Deterministic prompt. The same content always produces the same
/// prompt, including the extraction notes that tell the model when it is
/// working from metadata only.
fn build_prompt(content: &ExtractedContent) -> String {
    let body = truncate_chars(&content.body_text, MAX_PROMPT_CHARS);

    let mut context = format!("Source kind: {}.", content.source_kind);
    if let Some(title) = &content.title {
        context.push_str(&format!(" Title: {}.", title));
    }
    if !content.extraction_notes.is_empty() {
        context.push_str(&format!(
            " Extraction notes: {}.",
            content.extraction_notes.join("; ")
        ));
    }

    format!(
        r#"Analyze the political lean of the following content.

Return ONLY valid JSON with this schema:
{{
  "label": "Left" | "Center" | "Right",
  "confidence": <number between 0 and 1>,
  "summary": "<4-6 sentence neutral summary of the content>",
  "rationale": "<5-7 sentences naming the concrete framing, sourcing, and emphasis choices behind the label>",
  "global_perspective": "<4-6 sentences on how readers in different regions and political cultures might receive this; do not claim a single world consensus>"
}}

Rules:
- "label" is the single best overall lean of this content, not of the outlet.
- Do not default to "Center" when uncertain; lower "confidence" instead.

{context}

Content:
{body}"#
    )
}

/// Direct parse first, then a brace-slice from the first `{` to the last
/// `}` for responses wrapped in prose or code fences.
fn parse_json_lenient(raw: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) {
        if value.is_object() {
            return Some(value);
        }
    }
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end])
        .ok()
        .filter(|v: &serde_json::Value| v.is_object())
}

fn verdict_from_value(value: &serde_json::Value) -> Result<BiasVerdict, ScoringError> {
    let label_raw = value
        .get("label")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ScoringError::MalformedResponse {
            detail: "response has no label field".into(),
        })?;
    let label = BiasLabel::parse(label_raw).ok_or_else(|| ScoringError::MalformedResponse {
        detail: format!("unrecognized label {:?}", label_raw),
    })?;

    let summary = string_field(value, "summary");
    if summary.is_empty() {
        return Err(ScoringError::MalformedResponse {
            detail: "response has no summary".into(),
        });
    }

    let confidence = value
        .get("confidence")
        .and_then(|v| v.as_f64())
        .map(|c| (c as f32).clamp(0.0, 1.0));

    // rationale and global_perspective may come back empty when the
    // model output was truncated; the label is still valid and the
    // caller records the degradation
    Ok(BiasVerdict {
        label,
        confidence,
        summary,
        rationale: string_field(value, "rationale"),
        global_perspective: string_field(value, "global_perspective"),
    })
}

fn string_field(value: &serde_json::Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Nudge confidence up when the catalogued outlet lean agrees with the
/// model's label. The label is never adjusted, and a verdict without a
/// confidence stays without one.
fn calibrate_confidence(mut verdict: BiasVerdict, lean: SourceLean) -> BiasVerdict {
    let agrees = matches!(
        (lean, verdict.label),
        (SourceLean::Left, BiasLabel::Left)
            | (SourceLean::Center, BiasLabel::Center)
            | (SourceLean::Right, BiasLabel::Right)
    );
    if agrees {
        if let Some(confidence) = verdict.confidence {
            verdict.confidence = Some((confidence + SOURCE_AGREEMENT_BONUS).min(1.0));
        }
    }
    verdict
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
