//! Job persistence.
//!
//! The controller and worker only see [`BaseJobStore`]; tests run against
//! [`MemoryJobStore`] and production swaps in the Postgres-backed store.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use super::job::{AnalysisJob, AnalysisReport, ErrorDetail, JobStatus, VerdictFeedback};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("store failure: {0}")]
    Backend(String),
}

/// Persistence contract for jobs and verdict feedback.
///
/// Naming convention: `Base*` for trait names.
#[async_trait]
pub trait BaseJobStore: Send + Sync {
    async fn insert(&self, job: AnalysisJob) -> Result<(), StoreError>;

    async fn get(&self, job_id: &str) -> Result<Option<AnalysisJob>, StoreError>;

    /// Atomically move the oldest `Pending` job to `Running` and return
    /// it. `None` when nothing is queued.
    async fn claim_next_pending(&self) -> Result<Option<AnalysisJob>, StoreError>;

    async fn mark_succeeded(&self, job_id: &str, report: AnalysisReport)
        -> Result<(), StoreError>;

    async fn mark_failed(&self, job_id: &str, error: ErrorDetail) -> Result<(), StoreError>;

    async fn pending_count(&self) -> Result<usize, StoreError>;

    /// Most recent jobs for a session, newest first.
    async fn recent_for_session(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<AnalysisJob>, StoreError>;

    async fn record_feedback(&self, feedback: VerdictFeedback) -> Result<(), StoreError>;
}

/// In-memory store. FIFO claim order, single process only.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, AnalysisJob>>,
    queue: RwLock<VecDeque<String>>,
    feedback: RwLock<Vec<VerdictFeedback>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feedback_count(&self) -> usize {
        self.feedback.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl BaseJobStore for MemoryJobStore {
    async fn insert(&self, job: AnalysisJob) -> Result<(), StoreError> {
        if job.status == JobStatus::Pending {
            self.queue
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .push_back(job.job_id.clone());
        }
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job.job_id.clone(), job);
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<AnalysisJob>, StoreError> {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        Ok(jobs.get(job_id).cloned())
    }

    async fn claim_next_pending(&self) -> Result<Option<AnalysisJob>, StoreError> {
        let mut queue = self.queue.write().unwrap_or_else(|e| e.into_inner());
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());

        while let Some(job_id) = queue.pop_front() {
            if let Some(job) = jobs.get_mut(&job_id) {
                if job.mark_running() {
                    return Ok(Some(job.clone()));
                }
            }
        }
        Ok(None)
    }

    async fn mark_succeeded(
        &self,
        job_id: &str,
        report: AnalysisReport,
    ) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        if !job.mark_succeeded(report) {
            warn!(job_id = %job_id, status = %job.status, "rejected succeed transition");
        }
        Ok(())
    }

    async fn mark_failed(&self, job_id: &str, error: ErrorDetail) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        if !job.mark_failed(error) {
            warn!(job_id = %job_id, status = %job.status, "rejected fail transition");
        }
        Ok(())
    }

    async fn pending_count(&self) -> Result<usize, StoreError> {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        Ok(jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending)
            .count())
    }

    async fn recent_for_session(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<AnalysisJob>, StoreError> {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        let mut matching: Vec<AnalysisJob> = jobs
            .values()
            .filter(|j| j.session_id.as_deref() == Some(session_id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.job_id.cmp(&a.job_id))
        });
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn record_feedback(&self, feedback: VerdictFeedback) -> Result<(), StoreError> {
        self.feedback
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(feedback);
        Ok(())
    }
}
