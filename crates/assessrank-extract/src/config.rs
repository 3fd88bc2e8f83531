use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Which OpenAI-compatible service hosts the extraction model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorProvider {
    /// Groq cloud inference, OpenAI-compatible API.
    #[default]
    Groq,
    OpenAi,
}

/// Settings for the chat-completions requirement extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Hosted service; picks the default base URL and the key variable.
    #[serde(default)]
    pub provider: ExtractorProvider,
    /// Model name sent in each chat request.
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Empty means extraction is disabled.
    #[serde(default)]
    pub api_key: String,
    /// Overrides the provider's base URL, e.g. for a local proxy.
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Sampling temperature; 0 keeps answers deterministic.
    #[serde(default)]
    pub temperature: f32,
    /// Cap on the answer length.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-attempt timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Backoff between attempts.
    #[serde(default)]
    pub retry_policy: RetryPolicy,
}

fn default_model_id() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_max_tokens() -> u32 {
    500
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            provider: ExtractorProvider::default(),
            model_id: default_model_id(),
            api_key: String::new(),
            api_base_url: None,
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            timeout_ms: default_timeout_ms(),
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl ExtractorConfig {
    /// `api_base_url` if set, else the provider's public endpoint.
    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.api_base_url {
            url
        } else {
            match self.provider {
                ExtractorProvider::Groq => "https://api.groq.com/openai",
                ExtractorProvider::OpenAi => "https://api.openai.com",
            }
        }
    }

    /// Whether an API key is configured.
    pub fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtractorConfig::default();
        assert_eq!(config.provider, ExtractorProvider::Groq);
        assert_eq!(config.model_id, "llama-3.3-70b-versatile");
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.max_tokens, 500);
        assert_eq!(config.retry_policy.max_retries, 2);
        assert!(!config.is_enabled());
    }

    #[test]
    fn test_base_url_defaults_and_override() {
        let mut config = ExtractorConfig::default();
        assert_eq!(config.base_url(), "https://api.groq.com/openai");
        config.provider = ExtractorProvider::OpenAi;
        assert_eq!(config.base_url(), "https://api.openai.com");
        config.api_base_url = Some("http://127.0.0.1:9000".into());
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_from_toml_partial() {
        let config: ExtractorConfig = toml::from_str(
            r#"
            provider = "openai"
            model_id = "gpt-4o-mini"
            api_key = "sk-test"

            [retry_policy]
            max_retries = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.provider, ExtractorProvider::OpenAi);
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.retry_policy.max_retries, 4);
        assert_eq!(config.retry_policy.backoff_base_ms, 500);
        assert!(config.is_enabled());
    }
}
