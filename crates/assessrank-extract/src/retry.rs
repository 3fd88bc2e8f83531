use assessrank_core::AssessError;
use serde::{Deserialize, Serialize};

/// Retry behaviour for extraction calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub backoff_base_ms: u64,
    /// Cap for the exponential backoff delay.
    pub backoff_max_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base_ms: 500,
            backoff_max_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never waits between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_base_ms: 0,
            backoff_max_ms: 0,
        }
    }

    /// Total number of attempts, first included.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Whether an extraction error is worth another attempt.
///
/// Malformed model output and transport failures (no response at all) are
/// retried. Responses with a status are retried for 408, 429 and 5xx only.
pub fn is_retryable(err: &AssessError) -> bool {
    match err {
        AssessError::Extraction(_) | AssessError::Http(_) => true,
        AssessError::Upstream { status, .. } => is_retryable_status(*status),
        _ => false,
    }
}

fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}

/// Exponential backoff for `attempt` (0-based), capped at `backoff_max_ms`.
pub fn compute_backoff(policy: &RetryPolicy, attempt: u32) -> u64 {
    let delay = policy
        .backoff_base_ms
        .saturating_mul(2u64.saturating_pow(attempt));
    delay.min(policy.backoff_max_ms)
}
