//! Kernel module - scoring infrastructure and external model dependencies.

pub mod cache;
pub mod groq;
pub mod scoring;
pub mod source_lean;
pub mod test_model;
pub mod traits;

/// Default scoring model, overridable via `BIAS_MODEL`.
pub const DEFAULT_BIAS_MODEL: &str = "llama-3.3-70b-versatile";

pub use cache::{VerdictCache, VERDICT_CACHE_TTL};
pub use scoring::{
    BiasLabel, BiasScorer, BiasScorerConfig, BiasVerdict, ScoringError, MAX_PROMPT_CHARS,
    MAX_SCORE_RETRIES, RETRY_BASE_MS, SCORE_TIMEOUT, SOURCE_AGREEMENT_BONUS,
};
pub use source_lean::{source_lean, SourceLean};
pub use traits::BaseScoringModel;
