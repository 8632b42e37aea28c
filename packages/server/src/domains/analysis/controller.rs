//! Job controller.
//!
//! Exposes the two call shapes over one pipeline: a synchronous analysis
//! that blocks the caller, and submit/poll over stored jobs that a
//! background worker drains. The controller is the only writer of job
//! records outside the worker.

use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{info, warn};

use super::job::{
    AnalysisError, AnalysisJob, AnalysisReport, ErrorDetail, VerdictFeedback,
    MAX_FEEDBACK_NOTE_CHARS,
};
use super::pipeline::AnalysisPipeline;
use super::store::{BaseJobStore, StoreError};

/// Submissions beyond this many queued jobs are refused.
pub const MAX_QUEUED_JOBS: usize = 64;

pub const HISTORY_DEFAULT_LIMIT: u32 = 20;
pub const HISTORY_MAX_LIMIT: u32 = 50;

const MIN_URL_CHARS: usize = 5;
const MAX_URL_CHARS: usize = 2000;

pub struct JobController {
    pipeline: Arc<AnalysisPipeline>,
    store: Arc<dyn BaseJobStore>,
    wake: Arc<Notify>,
    max_queued: usize,
}

impl JobController {
    pub fn new(
        pipeline: Arc<AnalysisPipeline>,
        store: Arc<dyn BaseJobStore>,
        wake: Arc<Notify>,
    ) -> Self {
        Self {
            pipeline,
            store,
            wake,
            max_queued: MAX_QUEUED_JOBS,
        }
    }

    pub fn with_max_queued(mut self, max_queued: usize) -> Self {
        self.max_queued = max_queued;
        self
    }

    /// Blocking analysis. The outcome is also recorded as a terminal job
    /// so it shows up in session history.
    pub async fn analyze_sync(
        &self,
        url: &str,
        session_id: Option<String>,
    ) -> Result<AnalysisReport, AnalysisError> {
        validate_url(url)?;
        let outcome = self.pipeline.run(url).await;
        self.record_sync_outcome(url, session_id, &outcome).await;
        outcome
    }

    async fn record_sync_outcome(
        &self,
        url: &str,
        session_id: Option<String>,
        outcome: &Result<AnalysisReport, AnalysisError>,
    ) {
        let mut job = AnalysisJob::new(url, session_id);
        job.mark_running();
        match outcome {
            Ok(report) => {
                job.mark_succeeded(report.clone());
            }
            Err(error) => {
                job.mark_failed(ErrorDetail::from(error));
            }
        }
        // history is best effort; the caller still gets the outcome
        if let Err(e) = self.store.insert(job).await {
            warn!(url = %url, error = %e, "failed to record sync analysis");
        }
    }

    /// Queue a job and return its id immediately.
    pub async fn submit_job(
        &self,
        url: &str,
        session_id: Option<String>,
    ) -> Result<String, AnalysisError> {
        validate_url(url)?;

        let queued = self.store.pending_count().await.map_err(internal)?;
        if queued >= self.max_queued {
            return Err(AnalysisError::RateLimited {
                detail: format!("job queue is full ({queued} pending); retry later"),
            });
        }

        let job = AnalysisJob::new(url.trim(), session_id);
        let job_id = job.job_id.clone();
        self.store.insert(job).await.map_err(internal)?;
        self.wake.notify_one();
        info!(job_id = %job_id, url = %url, "analysis job queued");
        Ok(job_id)
    }

    /// Point-in-time job snapshot. Side-effect free, safe to poll.
    pub async fn get_job(&self, job_id: &str) -> Result<Option<AnalysisJob>, AnalysisError> {
        self.store.get(job_id).await.map_err(internal)
    }

    pub async fn history(
        &self,
        session_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<AnalysisJob>, AnalysisError> {
        let limit = limit
            .unwrap_or(HISTORY_DEFAULT_LIMIT)
            .clamp(1, HISTORY_MAX_LIMIT);
        self.store
            .recent_for_session(session_id, limit)
            .await
            .map_err(internal)
    }

    /// Record a reader's reaction to a finished verdict. `Ok(None)` when
    /// the job does not exist.
    pub async fn record_feedback(
        &self,
        job_id: &str,
        session_id: Option<String>,
        agrees: bool,
        note: Option<String>,
    ) -> Result<Option<VerdictFeedback>, AnalysisError> {
        let note = match note {
            Some(raw) => {
                let trimmed = raw.trim().to_string();
                if trimmed.chars().count() > MAX_FEEDBACK_NOTE_CHARS {
                    return Err(AnalysisError::InvalidRequest {
                        detail: format!("note exceeds {MAX_FEEDBACK_NOTE_CHARS} characters"),
                    });
                }
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed)
                }
            }
            None => None,
        };

        let Some(job) = self.store.get(job_id).await.map_err(internal)? else {
            return Ok(None);
        };
        if !job.is_terminal() {
            return Err(AnalysisError::InvalidRequest {
                detail: "job has not finished; feedback applies to a verdict".to_string(),
            });
        }

        let feedback = VerdictFeedback::new(job_id, session_id, agrees, note);
        self.store
            .record_feedback(feedback.clone())
            .await
            .map_err(internal)?;
        Ok(Some(feedback))
    }
}

fn validate_url(url: &str) -> Result<(), AnalysisError> {
    let chars = url.trim().chars().count();
    if chars < MIN_URL_CHARS {
        return Err(AnalysisError::InvalidRequest {
            detail: "url is too short to analyze".to_string(),
        });
    }
    if chars > MAX_URL_CHARS {
        return Err(AnalysisError::InvalidRequest {
            detail: format!("url exceeds {MAX_URL_CHARS} characters"),
        });
    }
    Ok(())
}

fn internal(error: StoreError) -> AnalysisError {
    AnalysisError::Internal {
        detail: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::analysis::job::JobStatus;
    use crate::domains::analysis::store::MemoryJobStore;
    use crate::kernel::scoring::{BiasLabel, BiasScorer};
    use crate::kernel::test_model::ScriptedModel;
    use extraction::{FetchedPage, StaticFetcher};

    fn long_article_html() -> String {
        let sentence =
            "Negotiators from both parties spent the evening trading budget proposals. ";
        format!(
            "<html><head><title>Budget Talks</title></head><body><article><p>{}</p></article></body></html>",
            sentence.repeat(40)
        )
    }

    fn verdict_json(label: &str) -> String {
        format!(
            r#"{{"label":"{}","confidence":0.8,"summary":"A budget recap.","rationale":"Even-handed sourcing.","global_perspective":"Familiar fiscal standoff framing."}}"#,
            label
        )
    }

    struct Fixture {
        controller: JobController,
        store: Arc<MemoryJobStore>,
    }

    fn fixture(fetcher: StaticFetcher, model: ScriptedModel) -> Fixture {
        let store = Arc::new(MemoryJobStore::new());
        let scorer = BiasScorer::new(Arc::new(model));
        let pipeline = Arc::new(AnalysisPipeline::new(
            Arc::new(fetcher),
            scorer,
            "test-model",
        ));
        let controller = JobController::new(pipeline, store.clone(), Arc::new(Notify::new()));
        Fixture { controller, store }
    }

    #[tokio::test]
    async fn test_analyze_sync_returns_verdict_and_records_history() {
        let url = "https://news.example.com/story";
        let fetcher = StaticFetcher::new().with_page(FetchedPage::ok(url, long_article_html()));
        let fx = fixture(fetcher, ScriptedModel::new().then_content(verdict_json("Left")));

        let report = fx
            .controller
            .analyze_sync(url, Some("s1".to_string()))
            .await
            .unwrap();

        assert_eq!(report.label, BiasLabel::Left);
        assert_eq!(report.summary, "A budget recap.");

        let history = fx.controller.history("s1", None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, JobStatus::Succeeded);
        assert!(history[0].result.is_some());
        assert!(history[0].error.is_none());
    }

    #[tokio::test]
    async fn test_analyze_sync_failure_is_recorded_and_returned() {
        let fx = fixture(StaticFetcher::new(), ScriptedModel::new());

        let err = fx
            .controller
            .analyze_sync("https://nowhere.example.com/story", Some("s1".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::Unreachable { .. }));

        let history = fx.controller.history("s1", None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, JobStatus::Failed);
        assert_eq!(history[0].error.as_ref().unwrap().kind, "unreachable");
    }

    #[tokio::test]
    async fn test_submit_creates_pending_job_and_polling_is_idempotent() {
        let fx = fixture(StaticFetcher::new(), ScriptedModel::new());

        let job_id = fx
            .controller
            .submit_job("https://news.example.com/story", None)
            .await
            .unwrap();

        let first = fx.controller.get_job(&job_id).await.unwrap().unwrap();
        let second = fx.controller.get_job(&job_id).await.unwrap().unwrap();

        assert_eq!(first.status, JobStatus::Pending);
        assert_eq!(second.status, JobStatus::Pending);
        assert!(first.result.is_none() && first.error.is_none());
    }

    #[tokio::test]
    async fn test_full_queue_refuses_submission() {
        let fx = fixture(StaticFetcher::new(), ScriptedModel::new());
        let controller = fx.controller.with_max_queued(1);

        controller
            .submit_job("https://news.example.com/a", None)
            .await
            .unwrap();
        let err = controller
            .submit_job("https://news.example.com/b", None)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_url_bounds_are_enforced() {
        let fx = fixture(StaticFetcher::new(), ScriptedModel::new());

        let short = fx.controller.submit_job("http", None).await.unwrap_err();
        assert!(matches!(short, AnalysisError::InvalidRequest { .. }));

        let oversized = format!("https://example.com/{}", "a".repeat(2000));
        let long = fx.controller.submit_job(&oversized, None).await.unwrap_err();
        assert!(matches!(long, AnalysisError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_unknown_job_polls_as_none() {
        let fx = fixture(StaticFetcher::new(), ScriptedModel::new());
        assert!(fx.controller.get_job("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_feedback_requires_a_finished_job() {
        let url = "https://news.example.com/story";
        let fetcher = StaticFetcher::new().with_page(FetchedPage::ok(url, long_article_html()));
        let fx = fixture(
            fetcher,
            ScriptedModel::new().then_content(verdict_json("Center")),
        );

        // no such job
        let missing = fx
            .controller
            .record_feedback("missing", None, true, None)
            .await
            .unwrap();
        assert!(missing.is_none());

        // queued but not finished
        let pending_id = fx.controller.submit_job(url, None).await.unwrap();
        let err = fx
            .controller
            .record_feedback(&pending_id, None, true, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRequest { .. }));

        // finished via the sync path
        fx.controller
            .analyze_sync(url, Some("s1".to_string()))
            .await
            .unwrap();
        let history = fx.controller.history("s1", None).await.unwrap();
        let finished_id = history[0].job_id.clone();

        let recorded = fx
            .controller
            .record_feedback(&finished_id, Some("s1".to_string()), false, Some("Too harsh".into()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(recorded.job_id, finished_id);
        assert!(!recorded.agrees);
        assert_eq!(fx.store.feedback_count(), 1);
    }

    #[tokio::test]
    async fn test_oversized_feedback_note_is_refused() {
        let url = "https://news.example.com/story";
        let fetcher = StaticFetcher::new().with_page(FetchedPage::ok(url, long_article_html()));
        let fx = fixture(
            fetcher,
            ScriptedModel::new().then_content(verdict_json("Center")),
        );
        fx.controller
            .analyze_sync(url, Some("s1".to_string()))
            .await
            .unwrap();
        let history = fx.controller.history("s1", None).await.unwrap();
        let job_id = history[0].job_id.clone();

        let err = fx
            .controller
            .record_feedback(&job_id, None, true, Some("x".repeat(601)))
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::InvalidRequest { .. }));
        assert_eq!(fx.store.feedback_count(), 0);
    }

    #[tokio::test]
    async fn test_history_limit_is_clamped() {
        let url = "https://news.example.com/story";
        let fetcher = StaticFetcher::new().with_page(FetchedPage::ok(url, long_article_html()));
        let mut model = ScriptedModel::new();
        for _ in 0..3 {
            model = model.then_content(verdict_json("Center"));
        }
        let fx = fixture(fetcher, model);

        for _ in 0..3 {
            fx.controller
                .analyze_sync(url, Some("s1".to_string()))
                .await
                .unwrap();
        }

        let capped = fx.controller.history("s1", Some(2)).await.unwrap();
        assert_eq!(capped.len(), 2);

        // zero is clamped up to one, oversized down to the max
        let at_least_one = fx.controller.history("s1", Some(0)).await.unwrap();
        assert_eq!(at_least_one.len(), 1);
    }
}
