//! Analysis job records and the analysis failure taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use extraction::{ExtractedContent, ExtractionError, SourceKind};

use crate::kernel::scoring::{BiasLabel, BiasVerdict, ScoringError};

/// Feedback notes are clipped at this many characters.
pub const MAX_FEEDBACK_NOTE_CHARS: usize = 600;

/// Job lifecycle states. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Running => "Running",
            JobStatus::Succeeded => "Succeeded",
            JobStatus::Failed => "Failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Pending" => Some(Self::Pending),
            "Running" => Some(Self::Running),
            "Succeeded" => Some(Self::Succeeded),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Union of everything the analysis pipeline can fail with, plus the
/// request-shape and catch-all kinds the controller adds.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    /// The request itself was malformed (URL out of bounds, oversized
    /// feedback note). Never produced by the pipeline.
    #[error("invalid request: {detail}")]
    InvalidRequest { detail: String },

    #[error("source unreachable: {detail}")]
    Unreachable { detail: String },

    #[error("source unsupported: {detail}")]
    Unsupported { detail: String },

    #[error("no usable content: {detail}")]
    Empty { detail: String },

    #[error("scoring timed out: {detail}")]
    Timeout { detail: String },

    #[error("scoring rate limited: {detail}")]
    RateLimited { detail: String },

    #[error("malformed model response: {detail}")]
    MalformedResponse { detail: String },

    #[error("model authentication failed: {detail}")]
    AuthFailure { detail: String },

    /// Unclassified fault. Every pipeline escape hatch lands here so a
    /// job can still reach `Failed`.
    #[error("internal error: {detail}")]
    Internal { detail: String },
}

impl AnalysisError {
    /// Stable lowercase name for logs and wire payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Unreachable { .. } => "unreachable",
            Self::Unsupported { .. } => "unsupported",
            Self::Empty { .. } => "empty",
            Self::Timeout { .. } => "timeout",
            Self::RateLimited { .. } => "rate_limited",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::AuthFailure { .. } => "auth_failure",
            Self::Internal { .. } => "internal",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::InvalidRequest { detail }
            | Self::Unreachable { detail }
            | Self::Unsupported { detail }
            | Self::Empty { detail }
            | Self::Timeout { detail }
            | Self::RateLimited { detail }
            | Self::MalformedResponse { detail }
            | Self::AuthFailure { detail }
            | Self::Internal { detail } => detail,
        }
    }
}

impl From<ExtractionError> for AnalysisError {
    fn from(error: ExtractionError) -> Self {
        match error {
            ExtractionError::Unreachable { detail } => Self::Unreachable { detail },
            ExtractionError::Unsupported { detail } => Self::Unsupported { detail },
            ExtractionError::Empty { detail } => Self::Empty { detail },
        }
    }
}

impl From<ScoringError> for AnalysisError {
    fn from(error: ScoringError) -> Self {
        match error {
            ScoringError::Timeout { detail } => Self::Timeout { detail },
            ScoringError::RateLimited { detail } => Self::RateLimited { detail },
            ScoringError::MalformedResponse { detail } => Self::MalformedResponse { detail },
            ScoringError::AuthFailure { detail } => Self::AuthFailure { detail },
        }
    }
}

/// Wire and storage form of a terminal failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub detail: String,
}

impl From<&AnalysisError> for ErrorDetail {
    fn from(error: &AnalysisError) -> Self {
        Self {
            kind: error.kind().to_string(),
            detail: error.detail().to_string(),
        }
    }
}

/// Completed analysis: the verdict plus the provenance a caller needs to
/// judge it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub source_url: String,
    pub source_kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub label: BiasLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub summary: String,
    pub rationale: String,
    pub global_perspective: String,
    pub extraction_notes: Vec<String>,
    pub model: String,
    pub from_cache: bool,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisReport {
    pub fn new(
        content: &ExtractedContent,
        verdict: BiasVerdict,
        model: &str,
        from_cache: bool,
    ) -> Self {
        let mut extraction_notes = content.extraction_notes.clone();
        if verdict.rationale.is_empty() || verdict.global_perspective.is_empty() {
            extraction_notes.push(
                "model output truncated; rationale or global perspective unavailable".to_string(),
            );
        }
        Self {
            source_url: content.source_url.clone(),
            source_kind: content.source_kind,
            title: content.title.clone(),
            author: content.author.clone(),
            published_at: content.published_at,
            label: verdict.label,
            confidence: verdict.confidence,
            summary: verdict.summary,
            rationale: verdict.rationale,
            global_perspective: verdict.global_perspective,
            extraction_notes,
            model: model.to_string(),
            from_cache,
            analyzed_at: Utc::now(),
        }
    }
}

/// One analysis job. The controller owns these for their full lifetime;
/// extractors and the scorer never see job identity.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisJob {
    pub job_id: String,
    #[serde(rename = "state")]
    pub status: JobStatus,
    pub input_url: String,
    /// Opaque session identifier for history scoping. Attached, never
    /// interpreted, and never serialized to callers.
    #[serde(skip)]
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl AnalysisJob {
    pub fn new(input_url: impl Into<String>, session_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::now_v7().to_string(),
            status: JobStatus::Pending,
            input_url: input_url.into(),
            session_id,
            created_at: now,
            updated_at: now,
            result: None,
            error: None,
        }
    }

    /// `Pending -> Running`. Returns whether the transition applied.
    pub fn mark_running(&mut self) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Running;
        self.updated_at = Utc::now();
        true
    }

    /// `Running -> Succeeded`, populating `result`. Rejected from any
    /// other state; terminal states are never left.
    pub fn mark_succeeded(&mut self, report: AnalysisReport) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        self.status = JobStatus::Succeeded;
        self.result = Some(report);
        self.updated_at = Utc::now();
        true
    }

    /// `Pending|Running -> Failed`, populating `error`.
    pub fn mark_failed(&mut self, error: ErrorDetail) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error = Some(error);
        self.updated_at = Utc::now();
        true
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A reader's reaction to a finished verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictFeedback {
    pub feedback_id: String,
    pub job_id: String,
    #[serde(skip)]
    pub session_id: Option<String>,
    pub agrees: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl VerdictFeedback {
    pub fn new(
        job_id: impl Into<String>,
        session_id: Option<String>,
        agrees: bool,
        note: Option<String>,
    ) -> Self {
        Self {
            feedback_id: Uuid::now_v7().to_string(),
            job_id: job_id.into(),
            session_id,
            agrees,
            note,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_report() -> AnalysisReport {
        let content = ExtractedContent::new(
            SourceKind::Article,
            "https://example.com/story",
            "Council approves the levy after hours of testimony.",
        );
        let verdict = BiasVerdict {
            label: BiasLabel::Center,
            confidence: Some(0.5),
            summary: "A recap.".to_string(),
            rationale: "Balanced sourcing.".to_string(),
            global_perspective: "Reads as routine local politics.".to_string(),
        };
        AnalysisReport::new(&content, verdict, "test-model", false)
    }

    fn sample_error() -> ErrorDetail {
        ErrorDetail {
            kind: "unreachable".to_string(),
            detail: "no route".to_string(),
        }
    }

    #[test]
    fn test_new_job_starts_pending_with_nothing_populated() {
        let job = AnalysisJob::new("https://example.com/story", Some("s1".to_string()));

        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.result.is_none());
        assert!(job.error.is_none());
        assert!(!job.job_id.is_empty());
    }

    #[test]
    fn test_lifecycle_reaches_succeeded_exactly_once() {
        let mut job = AnalysisJob::new("https://example.com/story", None);

        assert!(job.mark_running());
        assert!(job.mark_succeeded(sample_report()));
        assert_eq!(job.status, JobStatus::Succeeded);

        // terminal states are never left
        assert!(!job.mark_running());
        assert!(!job.mark_failed(sample_error()));
        assert_eq!(job.status, JobStatus::Succeeded);
        assert!(job.result.is_some());
        assert!(job.error.is_none());
    }

    #[test]
    fn test_succeeded_requires_running() {
        let mut job = AnalysisJob::new("https://example.com/story", None);
        assert!(!job.mark_succeeded(sample_report()));
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.result.is_none());
    }

    #[test]
    fn test_failed_is_reachable_from_pending_and_running() {
        let mut pending = AnalysisJob::new("https://example.com/a", None);
        assert!(pending.mark_failed(sample_error()));
        assert_eq!(pending.status, JobStatus::Failed);

        let mut running = AnalysisJob::new("https://example.com/b", None);
        running.mark_running();
        assert!(running.mark_failed(sample_error()));
        assert_eq!(running.status, JobStatus::Failed);
    }

    #[test]
    fn test_error_detail_from_analysis_error() {
        let error = AnalysisError::Timeout {
            detail: "attempt exceeded 30s".to_string(),
        };
        let detail = ErrorDetail::from(&error);

        assert_eq!(detail.kind, "timeout");
        assert_eq!(detail.detail, "attempt exceeded 30s");
    }

    #[test]
    fn test_truncated_verdict_gets_degradation_note() {
        let content = ExtractedContent::new(
            SourceKind::Article,
            "https://example.com/story",
            "Body text long enough to matter.",
        );
        let verdict = BiasVerdict {
            label: BiasLabel::Left,
            confidence: None,
            summary: "A recap.".to_string(),
            rationale: String::new(),
            global_perspective: String::new(),
        };

        let report = AnalysisReport::new(&content, verdict, "test-model", false);

        assert!(report
            .extraction_notes
            .iter()
            .any(|n| n.contains("model output truncated")));
    }

    #[test]
    fn test_job_serializes_state_and_hides_session() {
        let mut job = AnalysisJob::new("https://example.com/story", Some("s1".to_string()));
        job.mark_running();
        job.mark_failed(sample_error());

        let value = serde_json::to_value(&job).unwrap();

        assert_eq!(value["state"], "Failed");
        assert_eq!(value["error"]["kind"], "unreachable");
        assert!(value.get("session_id").is_none());
        assert!(value.get("result").is_none());
    }

    fn rank(status: JobStatus) -> u8 {
        match status {
            JobStatus::Pending => 0,
            JobStatus::Running => 1,
            JobStatus::Succeeded | JobStatus::Failed => 2,
        }
    }

    proptest! {
        // random transition storms never move a job backwards, and a
        // terminal job always has exactly one of result/error
        #[test]
        fn test_job_states_are_monotonic(ops in proptest::collection::vec(0u8..3, 1..40)) {
            let mut job = AnalysisJob::new("https://example.com/story", None);
            let mut last_rank = rank(job.status);
            let mut first_terminal: Option<JobStatus> = None;

            for op in ops {
                match op {
                    0 => { job.mark_running(); }
                    1 => { job.mark_succeeded(sample_report()); }
                    _ => { job.mark_failed(sample_error()); }
                }

                let current = rank(job.status);
                prop_assert!(current >= last_rank);
                last_rank = current;

                if job.status.is_terminal() {
                    prop_assert!(job.result.is_some() != job.error.is_some());
                    match first_terminal {
                        None => first_terminal = Some(job.status),
                        Some(first) => prop_assert_eq!(first, job.status),
                    }
                }
            }
        }
    }
}
