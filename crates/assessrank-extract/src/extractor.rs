use crate::retry::{compute_backoff, is_retryable, RetryPolicy};
use assessrank_core::{AssessError, AssessResult, ExtractedRequirements, UNKNOWN_ROLE};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Type alias for the injectable sleep function used in tests.
#[cfg(test)]
type SleepFn = Box<
    dyn Fn(u64) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> + Send + Sync,
>;

/// Turns a free-text query into [`ExtractedRequirements`].
///
/// Errors are allowed; the ranker treats any error as "no requirements".
#[async_trait]
pub trait RequirementExtractor: Send + Sync {
    async fn extract(&self, query: &str) -> AssessResult<ExtractedRequirements>;
}

/// Extractor used when no model is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExtractor;

#[async_trait]
impl RequirementExtractor for NoopExtractor {
    async fn extract(&self, _query: &str) -> AssessResult<ExtractedRequirements> {
        Ok(ExtractedRequirements::empty())
    }
}

/// Wraps another extractor with a per-attempt timeout and retries.
///
/// Retryable errors (see [`is_retryable`]) are retried with exponential
/// backoff up to `policy.max_retries` times; the last error is returned once
/// attempts run out.
pub struct RetryingExtractor {
    inner: Arc<dyn RequirementExtractor>,
    policy: RetryPolicy,
    attempt_timeout: Option<Duration>,
    #[cfg(test)]
    sleep_fn: Option<SleepFn>,
}

impl RetryingExtractor {
    pub fn new(inner: Arc<dyn RequirementExtractor>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            attempt_timeout: None,
            #[cfg(test)]
            sleep_fn: None,
        }
    }

    /// Abort any single attempt that takes longer than `timeout`.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    async fn do_sleep(&self, ms: u64) {
        #[cfg(test)]
        if let Some(ref f) = self.sleep_fn {
            f(ms).await;
            return;
        }
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    async fn attempt(&self, query: &str) -> AssessResult<ExtractedRequirements> {
        match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, self.inner.extract(query))
                .await
                .map_err(|_| {
                    AssessError::Http(format!(
                        "Extraction timeout after {}ms",
                        limit.as_millis()
                    ))
                })?,
            None => self.inner.extract(query).await,
        }
    }
}

#[async_trait]
impl RequirementExtractor for RetryingExtractor {
    async fn extract(&self, query: &str) -> AssessResult<ExtractedRequirements> {
        let mut last_err: Option<AssessError> = None;

        for attempt in 0..=self.policy.max_retries {
            debug!(
                attempt = attempt + 1,
                attempts = self.policy.attempts(),
                "Requirement extraction attempt"
            );
            match self.attempt(query).await {
                Ok(reqs) => return Ok(reqs),
                Err(e) => {
                    if !is_retryable(&e) {
                        warn!(attempt, error = %e, "Non-retryable extraction error");
                        return Err(e);
                    }
                    if attempt < self.policy.max_retries {
                        let delay = compute_backoff(&self.policy, attempt);
                        info!(attempt, delay_ms = delay, error = %e, "Retryable extraction error, backing off");
                        self.do_sleep(delay).await;
                    }
                    last_err = Some(e);
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| AssessError::Extraction("Extraction attempts exhausted".into())))
    }
}

/// Lenient shape of the model's JSON answer.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRequirements {
    technical_skills: Vec<String>,
    soft_skills: Vec<String>,
    role_type: Option<String>,
    keywords: Vec<String>,
}

/// Parse a model answer into [`ExtractedRequirements`].
///
/// Markdown code fences (with or without a `json` tag) are stripped first.
/// Blank entries are dropped; a missing or blank role becomes
/// [`UNKNOWN_ROLE`].
pub fn parse_requirements(text: &str) -> AssessResult<ExtractedRequirements> {
    let body = strip_code_fences(text);
    let raw: RawRequirements = serde_json::from_str(body)
        .map_err(|e| AssessError::Extraction(format!("Malformed requirements JSON: {e}")))?;

    let clean_set = |values: Vec<String>| -> BTreeSet<String> {
        values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    };

    let role_type = raw
        .role_type
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| UNKNOWN_ROLE.to_string());

    Ok(ExtractedRequirements {
        technical_skills: clean_set(raw.technical_skills),
        soft_skills: clean_set(raw.soft_skills),
        role_type,
        keywords: raw
            .keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect(),
    })
}

/// The content of the first fenced block, or the trimmed text when there is
/// none.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(start) = text.find("```") else {
        return text;
    };
    let after = &text[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    match after.find("```") {
        Some(end) => after[..end].trim(),
        None => after.trim(),
    }
}
