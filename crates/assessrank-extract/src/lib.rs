//! Requirement extraction for assessrank.
//!
//! Turns a free-text job query into [`ExtractedRequirements`] by asking an
//! OpenAI-compatible chat model for a small JSON document. Extraction is a
//! best-effort enrichment: callers fall back to empty requirements on error.

/// OpenAI-compatible chat completions backend.
pub mod backend;
/// Extractor configuration.
pub mod config;
/// The extractor trait, wrappers, and answer parsing.
pub mod extractor;
/// Retry policy and error classification.
pub mod retry;

pub use backend::LlmExtractor;
pub use config::{ExtractorConfig, ExtractorProvider};
pub use extractor::{
    parse_requirements, strip_code_fences, NoopExtractor, RequirementExtractor, RetryingExtractor,
};
pub use retry::{compute_backoff, is_retryable, RetryPolicy};

use assessrank_core::{AssessResult, ExtractedRequirements};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Build the extractor described by `config`.
///
/// Without an API key this is a [`NoopExtractor`]; otherwise an
/// [`LlmExtractor`] wrapped in a [`RetryingExtractor`] with the configured
/// policy and per-attempt timeout.
pub fn build_extractor(config: &ExtractorConfig) -> AssessResult<Arc<dyn RequirementExtractor>> {
    if !config.is_enabled() {
        warn!("Extractor API key not set, requirement extraction disabled");
        return Ok(Arc::new(NoopExtractor));
    }
    let llm = LlmExtractor::new(config.clone())?;
    let retrying = RetryingExtractor::new(Arc::new(llm), config.retry_policy.clone())
        .with_attempt_timeout(Duration::from_millis(config.timeout_ms));
    Ok(Arc::new(retrying))
}

/// Run `extractor`, substituting empty requirements for any error.
pub async fn extract_or_empty(
    extractor: &dyn RequirementExtractor,
    query: &str,
) -> ExtractedRequirements {
    match extractor.extract(query).await {
        Ok(reqs) => reqs,
        Err(e) => {
            warn!(error = %e, "Requirement extraction failed, using empty requirements");
            ExtractedRequirements::empty()
        }
    }
}
