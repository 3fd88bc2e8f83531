use crate::config::ExtractorConfig;
use crate::extractor::{parse_requirements, RequirementExtractor};
use assessrank_core::{AssessError, AssessResult, ExtractedRequirements};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str = "Extract requirements from job queries. Return only JSON.";

/// Single-attempt extractor backed by an OpenAI-compatible chat completions
/// API (Groq, OpenAI, or anything speaking the same protocol).
///
/// Wrap it in a [`RetryingExtractor`](crate::RetryingExtractor) for retries;
/// see [`build_extractor`](crate::build_extractor).
pub struct LlmExtractor {
    config: ExtractorConfig,
    http: reqwest::Client,
}

impl LlmExtractor {
    /// Create an extractor; fails with [`AssessError::Config`] without an API key.
    pub fn new(config: ExtractorConfig) -> AssessResult<Self> {
        if !config.is_enabled() {
            return Err(AssessError::Config(
                "Extractor API key is empty".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AssessError::Config(format!("HTTP client: {e}")))?;
        info!(model = %config.model_id, base_url = %config.base_url(), "LLM extractor initialized");
        Ok(Self { config, http })
    }

    fn build_body(&self, query: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model_id,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt(query) },
            ],
        })
    }
}

fn user_prompt(query: &str) -> String {
    format!(
        r#"Extract from job query. Return ONLY valid JSON:

Query: "{query}"

{{
    "technical_skills": ["skill1", "skill2"],
    "soft_skills": ["skill1", "skill2"],
    "role_type": "developer/analyst/manager/sales/etc",
    "keywords": ["key1", "key2"]
}}

JSON:"#
    )
}

/// Map a request that produced no usable response.
///
/// Connect, timeout and mid-request failures become [`AssessError::Http`]
/// (retryable); a request that could not even be built is a configuration
/// problem.
fn transport_error(e: reqwest::Error) -> AssessError {
    let cause = std::error::Error::source(&e)
        .map(|s| format!(": {s}"))
        .unwrap_or_default();
    if e.is_builder() {
        AssessError::Config(format!("Chat API request: {e}{cause}"))
    } else if e.is_timeout() {
        AssessError::Http(format!("Chat API timeout: {e}{cause}"))
    } else if e.is_connect() {
        AssessError::Http(format!("Chat API connection failed: {e}{cause}"))
    } else {
        AssessError::Http(format!("Chat API request failed: {e}{cause}"))
    }
}

#[async_trait]
impl RequirementExtractor for LlmExtractor {
    async fn extract(&self, query: &str) -> AssessResult<ExtractedRequirements> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url().trim_end_matches('/')
        );

        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&self.build_body(query))
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(AssessError::Upstream {
                status: status.as_u16(),
                message: format!("Chat API error: {text}"),
            });
        }
        let resp_body: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| AssessError::Extraction(format!("Chat API returned non-JSON body: {e}")))?;

        let content = resp_body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AssessError::Extraction("Response has no message content".into()))?;
        debug!(chars = content.len(), "Extractor answered");

        let reqs = parse_requirements(content)?;
        info!(
            technical = reqs.technical_skills.len(),
            soft = reqs.soft_skills.len(),
            role = %reqs.role_type,
            "Requirement extraction succeeded"
        );
        Ok(reqs)
    }
}
