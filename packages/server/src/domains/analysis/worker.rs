//! Background analysis worker.
//!
//! Drains `Pending` jobs from the store into the pipeline under a
//! concurrency bound. Every claimed job reaches a terminal state, even
//! when the pipeline panics.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::job::{AnalysisError, AnalysisJob, ErrorDetail};
use super::pipeline::AnalysisPipeline;
use super::store::BaseJobStore;

/// Upper bound on simultaneous in-flight analyses. Both the extraction
/// fetch and the model call count against it.
pub const MAX_CONCURRENT_ANALYSES: usize = 4;

/// Poll interval while the queue is quiet. Submissions also wake the
/// worker directly.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct AnalysisWorker {
    pipeline: Arc<AnalysisPipeline>,
    store: Arc<dyn BaseJobStore>,
    wake: Arc<Notify>,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl AnalysisWorker {
    pub fn new(
        pipeline: Arc<AnalysisPipeline>,
        store: Arc<dyn BaseJobStore>,
        wake: Arc<Notify>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            pipeline,
            store,
            wake,
            permits: Arc::new(Semaphore::new(MAX_CONCURRENT_ANALYSES)),
            cancel,
        }
    }

    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(limit));
        self
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Claim loop. A permit is held before a job is claimed, so a full
    /// pool never moves a job to `Running` just to sit on it.
    async fn run(self) {
        info!("analysis worker started");
        let mut in_flight = JoinSet::new();

        loop {
            let permit = tokio::select! {
                _ = self.cancel.cancelled() => break,
                permit = self.permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let Some(job) = self.claim_job().await else {
                drop(permit);
                break;
            };

            let pipeline = self.pipeline.clone();
            let store = self.store.clone();
            in_flight.spawn(async move {
                process_job(pipeline, store, job).await;
                drop(permit);
            });

            // reap settled tasks so the set does not grow unbounded
            while in_flight.try_join_next().is_some() {}
        }

        info!("analysis worker draining in-flight jobs");
        while in_flight.join_next().await.is_some() {}
        info!("analysis worker stopped");
    }

    /// Wait for a pending job. `None` only on shutdown.
    async fn claim_job(&self) -> Option<AnalysisJob> {
        loop {
            match self.store.claim_next_pending().await {
                Ok(Some(job)) => return Some(job),
                Ok(None) => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => return None,
                        _ = self.wake.notified() => {}
                        _ = tokio::time::sleep(POLL_INTERVAL) => {}
                    }
                }
                Err(e) => {
                    warn!(error = %e, "job claim failed, backing off");
                    tokio::select! {
                        _ = self.cancel.cancelled() => return None,
                        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                    }
                }
            }
        }
    }
}

async fn process_job(
    pipeline: Arc<AnalysisPipeline>,
    store: Arc<dyn BaseJobStore>,
    job: AnalysisJob,
) {
    let job_id = job.job_id.clone();
    info!(job_id = %job_id, url = %job.input_url, "processing analysis job");

    let pipeline_task = {
        let url = job.input_url.clone();
        tokio::spawn(async move { pipeline.run(&url).await })
    };

    let outcome = match pipeline_task.await {
        Ok(outcome) => outcome,
        Err(join_error) => {
            // a panic inside the pipeline must still settle the job
            error!(job_id = %job_id, error = %join_error, "analysis task crashed");
            Err(AnalysisError::Internal {
                detail: "analysis task crashed".to_string(),
            })
        }
    };

    let transition = match outcome {
        Ok(report) => {
            info!(job_id = %job_id, label = %report.label, "analysis job succeeded");
            store.mark_succeeded(&job_id, report).await
        }
        Err(error) => {
            warn!(job_id = %job_id, kind = error.kind(), error = %error, "analysis job failed");
            store.mark_failed(&job_id, ErrorDetail::from(&error)).await
        }
    };
    if let Err(e) = transition {
        error!(job_id = %job_id, error = %e, "failed to settle job");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::analysis::controller::JobController;
    use crate::domains::analysis::job::JobStatus;
    use crate::domains::analysis::store::MemoryJobStore;
    use crate::kernel::scoring::{BiasLabel, BiasScorer};
    use crate::kernel::test_model::ScriptedModel;
    use crate::kernel::traits::BaseScoringModel;
    use async_trait::async_trait;
    use extraction::{FetchedPage, StaticFetcher};
    use groq_client::{ChatRequest, GroqError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn article_html(flavor: &str) -> String {
        let sentence = format!(
            "Lawmakers argued over the {flavor} provision late into the night session. "
        );
        format!(
            "<html><head><title>Floor Fight</title></head><body><article><p>{}</p></article></body></html>",
            sentence.repeat(30)
        )
    }

    fn verdict_json(label: &str) -> String {
        format!(
            r#"{{"label":"{}","confidence":0.7,"summary":"A floor fight recap.","rationale":"Quotes both leaders.","global_perspective":"Standard legislative drama."}}"#,
            label
        )
    }

    struct Fixture {
        controller: JobController,
        cancel: CancellationToken,
        handle: tokio::task::JoinHandle<()>,
    }

    fn start_worker(fetcher: StaticFetcher, model: Arc<dyn BaseScoringModel>) -> Fixture {
        let store: Arc<MemoryJobStore> = Arc::new(MemoryJobStore::new());
        let wake = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        let pipeline = Arc::new(AnalysisPipeline::new(
            Arc::new(fetcher),
            BiasScorer::new(model),
            "test-model",
        ));
        let controller = JobController::new(pipeline.clone(), store.clone(), wake.clone());
        let handle = AnalysisWorker::new(pipeline, store, wake, cancel.clone())
            .with_concurrency(2)
            .spawn();

        Fixture {
            controller,
            cancel,
            handle,
        }
    }

    async fn wait_for_terminal(controller: &JobController, job_id: &str) -> AnalysisJob {
        for _ in 0..500 {
            if let Some(job) = controller.get_job(job_id).await.unwrap() {
                if job.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("job {job_id} never reached a terminal state");
    }

    #[tokio::test(start_paused = true)]
    async fn test_submitted_job_reaches_succeeded() {
        let url = "https://news.example.com/story";
        let fetcher =
            StaticFetcher::new().with_page(FetchedPage::ok(url, article_html("levy")));
        let model = Arc::new(ScriptedModel::new().then_content(verdict_json("Left")));
        let fx = start_worker(fetcher, model);

        let job_id = fx.controller.submit_job(url, None).await.unwrap();
        let finished = wait_for_terminal(&fx.controller, &job_id).await;

        assert_eq!(finished.status, JobStatus::Succeeded);
        let report = finished.result.unwrap();
        assert_eq!(report.label, BiasLabel::Left);
        assert!(finished.error.is_none());

        fx.cancel.cancel();
        fx.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_url_fails_the_job() {
        let fx = start_worker(StaticFetcher::new(), Arc::new(ScriptedModel::new()));

        let job_id = fx
            .controller
            .submit_job("https://nowhere.example.com/story", None)
            .await
            .unwrap();
        let finished = wait_for_terminal(&fx.controller, &job_id).await;

        assert_eq!(finished.status, JobStatus::Failed);
        assert_eq!(finished.error.unwrap().kind, "unreachable");
        assert!(finished.result.is_none());

        fx.cancel.cancel();
        fx.handle.await.unwrap();
    }

    struct PanickingModel;

    #[async_trait]
    impl BaseScoringModel for PanickingModel {
        async fn complete(&self, _request: ChatRequest) -> Result<String, GroqError> {
            panic!("scripted crash");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pipeline_panic_still_settles_the_job() {
        let url = "https://news.example.com/story";
        let fetcher =
            StaticFetcher::new().with_page(FetchedPage::ok(url, article_html("levy")));
        let fx = start_worker(fetcher, Arc::new(PanickingModel));

        let job_id = fx.controller.submit_job(url, None).await.unwrap();
        let finished = wait_for_terminal(&fx.controller, &job_id).await;

        assert_eq!(finished.status, JobStatus::Failed);
        assert_eq!(finished.error.unwrap().kind, "internal");

        fx.cancel.cancel();
        fx.handle.await.unwrap();
    }

    struct GaugedModel {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl BaseScoringModel for GaugedModel {
        async fn complete(&self, _request: ChatRequest) -> Result<String, GroqError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(verdict_json("Center"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_analyses_respect_the_concurrency_bound() {
        let fetcher = StaticFetcher::new();
        let mut urls = Vec::new();
        for n in 0..6 {
            let url = format!("https://news.example.com/story-{n}");
            // distinct bodies keep the verdict cache out of the way
            fetcher.add(FetchedPage::ok(&url, article_html(&format!("amendment {n}"))));
            urls.push(url);
        }
        let model = Arc::new(GaugedModel {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let fx = start_worker(fetcher, model.clone());

        let mut job_ids = Vec::new();
        for url in &urls {
            job_ids.push(fx.controller.submit_job(url, None).await.unwrap());
        }
        for job_id in &job_ids {
            let finished = wait_for_terminal(&fx.controller, job_id).await;
            assert_eq!(finished.status, JobStatus::Succeeded);
        }

        assert!(model.peak.load(Ordering::SeqCst) <= 2);

        fx.cancel.cancel();
        fx.handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_worker_stops_cleanly() {
        let fx = start_worker(StaticFetcher::new(), Arc::new(ScriptedModel::new()));
        fx.cancel.cancel();
        fx.handle.await.unwrap();
    }
}
