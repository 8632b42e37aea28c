//! Analysis domain.
//!
//! The job controller wraps the extraction router and bias scorer behind
//! two call shapes: a synchronous analysis that blocks the caller, and an
//! asynchronous job lifecycle (submit, poll, terminal state) driven by a
//! background worker against a pluggable job store.

pub mod controller;
pub mod job;
pub mod pg_store;
pub mod pipeline;
pub mod store;
pub mod worker;

pub use controller::{JobController, HISTORY_DEFAULT_LIMIT, HISTORY_MAX_LIMIT, MAX_QUEUED_JOBS};
pub use job::{
    AnalysisError, AnalysisJob, AnalysisReport, ErrorDetail, JobStatus, VerdictFeedback,
    MAX_FEEDBACK_NOTE_CHARS,
};
pub use pg_store::PgJobStore;
pub use pipeline::AnalysisPipeline;
pub use store::{BaseJobStore, MemoryJobStore, StoreError};
pub use worker::{AnalysisWorker, MAX_CONCURRENT_ANALYSES};
