//! End-to-end analysis pipeline.
//!
//! One URL in, one [`AnalysisReport`] out: extract, consult the verdict
//! cache, score, assemble. Stateless with respect to jobs; the
//! controller and worker own job identity.

use std::sync::Arc;

use tracing::{debug, info};

use extraction::{ExtractionRouter, PageFetcher};

use crate::kernel::cache::VerdictCache;
use crate::kernel::scoring::BiasScorer;
use crate::kernel::source_lean::source_lean;

use super::job::{AnalysisError, AnalysisReport};

pub struct AnalysisPipeline {
    router: ExtractionRouter,
    scorer: BiasScorer,
    cache: VerdictCache,
    model_name: String,
}

impl AnalysisPipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        scorer: BiasScorer,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            router: ExtractionRouter::new(fetcher),
            scorer,
            cache: VerdictCache::new(),
            model_name: model_name.into(),
        }
    }

    pub fn with_cache(mut self, cache: VerdictCache) -> Self {
        self.cache = cache;
        self
    }

    /// Run one URL through extraction and scoring.
    ///
    /// The cache is consulted after extraction, keyed by outlet lean and
    /// extracted text, so only the model round-trip is saved on a hit.
    pub async fn run(&self, url: &str) -> Result<AnalysisReport, AnalysisError> {
        let content = self.router.classify_and_extract(url).await?;
        info!(
            url = %url,
            source_kind = %content.source_kind,
            chars = content.char_count(),
            "content extracted"
        );

        let lean = source_lean(&content.source_url);
        let cache_key = VerdictCache::key(lean, &content.body_text);
        if let Some(verdict) = self.cache.get(&cache_key) {
            debug!(url = %url, "verdict cache hit");
            return Ok(AnalysisReport::new(&content, verdict, &self.model_name, true));
        }

        let verdict = self.scorer.score(&content).await?;
        self.cache.put(cache_key, verdict.clone());
        info!(url = %url, label = %verdict.label, "content scored");

        Ok(AnalysisReport::new(&content, verdict, &self.model_name, false))
    }
}
