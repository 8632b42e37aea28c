//! Postgres-backed job store.
//!
//! Terminal-once is enforced in SQL: succeed/fail updates are guarded by
//! the current status, and the claim uses `FOR UPDATE SKIP LOCKED` so
//! multiple workers never run the same job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::warn;

use super::job::{AnalysisJob, AnalysisReport, ErrorDetail, JobStatus, VerdictFeedback};
use super::store::{BaseJobStore, StoreError};

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        StoreError::Backend(error.to_string())
    }
}

#[derive(FromRow)]
struct JobRow {
    job_id: String,
    status: String,
    input_url: String,
    session_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    result: Option<serde_json::Value>,
    error: Option<serde_json::Value>,
}

impl JobRow {
    fn into_job(self) -> Result<AnalysisJob, StoreError> {
        let status = JobStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Backend(format!("unknown job status {:?}", self.status)))?;
        let result = self
            .result
            .map(serde_json::from_value::<AnalysisReport>)
            .transpose()
            .map_err(|e| StoreError::Backend(format!("bad result payload: {e}")))?;
        let error = self
            .error
            .map(serde_json::from_value::<ErrorDetail>)
            .transpose()
            .map_err(|e| StoreError::Backend(format!("bad error payload: {e}")))?;
        Ok(AnalysisJob {
            job_id: self.job_id,
            status,
            input_url: self.input_url,
            session_id: self.session_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            result,
            error,
        })
    }
}

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseJobStore for PgJobStore {
    async fn insert(&self, job: AnalysisJob) -> Result<(), StoreError> {
        let result = job
            .result
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| StoreError::Backend(format!("unserializable result: {e}")))?;
        let error = job
            .error
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| StoreError::Backend(format!("unserializable error: {e}")))?;

        sqlx::query(
            "INSERT INTO analysis_jobs
                (job_id, status, input_url, session_id, created_at, updated_at, result, error)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&job.job_id)
        .bind(job.status.as_str())
        .bind(&job.input_url)
        .bind(&job.session_id)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(result)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<AnalysisJob>, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT job_id, status, input_url, session_id, created_at, updated_at, result, error
             FROM analysis_jobs
             WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(JobRow::into_job).transpose()
    }

    async fn claim_next_pending(&self) -> Result<Option<AnalysisJob>, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(
            "UPDATE analysis_jobs
             SET status = 'Running', updated_at = NOW()
             WHERE job_id = (
                 SELECT job_id FROM analysis_jobs
                 WHERE status = 'Pending'
                 ORDER BY created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING job_id, status, input_url, session_id, created_at, updated_at, result, error",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.map(JobRow::into_job).transpose()
    }

    async fn mark_succeeded(
        &self,
        job_id: &str,
        report: AnalysisReport,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_value(&report)
            .map_err(|e| StoreError::Backend(format!("unserializable result: {e}")))?;

        let updated = sqlx::query(
            "UPDATE analysis_jobs
             SET status = 'Succeeded', result = $2, updated_at = NOW()
             WHERE job_id = $1 AND status = 'Running'",
        )
        .bind(job_id)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            self.reject_transition(job_id, "succeed").await?;
        }
        Ok(())
    }

    async fn mark_failed(&self, job_id: &str, error: ErrorDetail) -> Result<(), StoreError> {
        let payload = serde_json::to_value(&error)
            .map_err(|e| StoreError::Backend(format!("unserializable error: {e}")))?;

        let updated = sqlx::query(
            "UPDATE analysis_jobs
             SET status = 'Failed', error = $2, updated_at = NOW()
             WHERE job_id = $1 AND status IN ('Pending', 'Running')",
        )
        .bind(job_id)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            self.reject_transition(job_id, "fail").await?;
        }
        Ok(())
    }

    async fn pending_count(&self) -> Result<usize, StoreError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM analysis_jobs WHERE status = 'Pending'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count as usize)
    }

    async fn recent_for_session(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<AnalysisJob>, StoreError> {
        let rows = sqlx::query_as::<_, JobRow>(
            "SELECT job_id, status, input_url, session_id, created_at, updated_at, result, error
             FROM analysis_jobs
             WHERE session_id = $1
             ORDER BY created_at DESC, job_id DESC
             LIMIT $2",
        )
        .bind(session_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(JobRow::into_job).collect()
    }

    async fn record_feedback(&self, feedback: VerdictFeedback) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO verdict_feedback
                (feedback_id, job_id, session_id, agrees, note, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&feedback.feedback_id)
        .bind(&feedback.job_id)
        .bind(&feedback.session_id)
        .bind(feedback.agrees)
        .bind(&feedback.note)
        .bind(feedback.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl PgJobStore {
    /// A guarded update that touched no rows either raced a terminal
    /// transition or targets a job that does not exist.
    async fn reject_transition(&self, job_id: &str, action: &str) -> Result<(), StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM analysis_jobs WHERE job_id = $1)")
                .bind(job_id)
                .fetch_one(&self.pool)
                .await?;
        if !exists {
            return Err(StoreError::NotFound(job_id.to_string()));
        }
        warn!(job_id = %job_id, action = action, "rejected transition on settled job");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> PgJobStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required for pg tests");
        let pool = PgPool::connect(&url).await.expect("failed to connect");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("migrations failed");
        PgJobStore::new(pool)
    }

    #[tokio::test]
    #[ignore] // requires a running Postgres with DATABASE_URL set
    async fn test_insert_claim_and_get_round_trip() {
        let store = test_store().await;
        let job = AnalysisJob::new("https://example.com/pg-test", None);
        let job_id = job.job_id.clone();

        store.insert(job).await.unwrap();

        let claimed = store.claim_next_pending().await.unwrap().unwrap();
        assert_eq!(claimed.status, JobStatus::Running);

        store
            .mark_failed(
                &job_id,
                ErrorDetail {
                    kind: "unreachable".to_string(),
                    detail: "pg test".to_string(),
                },
            )
            .await
            .unwrap();

        let finished = store.get(&job_id).await.unwrap().unwrap();
        assert_eq!(finished.status, JobStatus::Failed);
        assert!(finished.error.is_some());
        assert!(finished.result.is_none());
    }

    #[tokio::test]
    #[ignore] // requires a running Postgres with DATABASE_URL set
    async fn test_settled_job_rejects_second_transition() {
        let store = test_store().await;
        let job = AnalysisJob::new("https://example.com/pg-terminal", None);
        let job_id = job.job_id.clone();
        store.insert(job).await.unwrap();
        store.claim_next_pending().await.unwrap();

        store
            .mark_failed(
                &job_id,
                ErrorDetail {
                    kind: "timeout".to_string(),
                    detail: "first".to_string(),
                },
            )
            .await
            .unwrap();
        store
            .mark_failed(
                &job_id,
                ErrorDetail {
                    kind: "internal".to_string(),
                    detail: "second".to_string(),
                },
            )
            .await
            .unwrap();

        let finished = store.get(&job_id).await.unwrap().unwrap();
        let error = finished.error.unwrap();
        assert_eq!(error.kind, "timeout");
    }
}
