use assessrank_extract::{ExtractorConfig, ExtractorProvider};
use assessrank_index::{EmbeddingProvider, LocalEmbedding};
use assessrank_ranker::RankerConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Contents of `assessrank.toml`. Every section is optional.
#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub ranker: RankerConfig,
}

#[derive(Debug, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_catalog_path")]
    pub catalog: PathBuf,
    /// Labelled query/item pairs; learning is skipped when absent.
    #[serde(default)]
    pub training: Option<PathBuf>,
    /// Exported engine state, loaded instead of re-indexing when present.
    #[serde(default)]
    pub state: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog_path(),
            training: None,
            state: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Hashed bag-of-words vectors computed in process.
    #[default]
    Local,
    /// OpenAI-compatible `/v1/embeddings` endpoint.
    Http,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub backend: EmbeddingBackend,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub model_id: String,
    #[serde(default)]
    pub api_key: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: EmbeddingBackend::Local,
            dimension: default_dimension(),
            base_url: String::new(),
            model_id: String::new(),
            api_key: String::new(),
        }
    }
}

impl EmbeddingConfig {
    /// The configured provider, or `None` when semantic scoring is off.
    pub fn provider(&self) -> anyhow::Result<Option<Arc<dyn EmbeddingProvider>>> {
        if !self.enabled {
            return Ok(None);
        }
        if self.dimension == 0 {
            anyhow::bail!("embedding.dimension must be positive");
        }
        match self.backend {
            EmbeddingBackend::Local => Ok(Some(Arc::new(LocalEmbedding::new(self.dimension)))),
            EmbeddingBackend::Http => self.http_provider(),
        }
    }

    #[cfg(feature = "http-embeddings")]
    fn http_provider(&self) -> anyhow::Result<Option<Arc<dyn EmbeddingProvider>>> {
        if self.base_url.is_empty() || self.model_id.is_empty() {
            anyhow::bail!("embedding.base_url and embedding.model_id are required for the http backend");
        }
        Ok(Some(Arc::new(assessrank_index::HttpEmbedding::new(
            &self.base_url,
            &self.api_key,
            &self.model_id,
            self.dimension,
        ))))
    }

    #[cfg(not(feature = "http-embeddings"))]
    fn http_provider(&self) -> anyhow::Result<Option<Arc<dyn EmbeddingProvider>>> {
        anyhow::bail!("the http embedding backend needs the `http-embeddings` feature")
    }
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Fill an empty extractor key from the environment.
    ///
    /// `lookup` is `std::env::var` in production.
    pub fn apply_env_key(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if !self.extractor.api_key.is_empty() {
            return;
        }
        let var = match self.extractor.provider {
            ExtractorProvider::Groq => "GROQ_API_KEY",
            ExtractorProvider::OpenAi => "OPENAI_API_KEY",
        };
        if let Some(key) = lookup(var).filter(|k| !k.trim().is_empty()) {
            self.extractor.api_key = key.trim().to_string();
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("./data/catalog.json")
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_true() -> bool {
    true
}
fn default_dimension() -> usize {
    256
}
