use assessrank_core::{AssessError, AssessResult};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Trait for computing text embeddings (dense vector representations).
///
/// Providers are injected into the semantic index at construction; the
/// process entry point owns their lifecycle.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Compute the embedding vector for a single text.
    async fn embed(&self, text: &str) -> AssessResult<Vec<f32>>;

    /// Compute embeddings for a batch of texts, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> AssessResult<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Dimension of the vectors produced by this provider.
    fn dimension(&self) -> usize;
}

/// Local hashed bag-of-words embedding (no external API needed).
///
/// Every word is hashed into three positions of a fixed-size vector with
/// decreasing weights, then the vector is L2-normalized. Deterministic
/// across runs and processes.
pub struct LocalEmbedding {
    dimension: usize,
}

impl LocalEmbedding {
    /// Embedding with the given vector dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

impl Default for LocalEmbedding {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbedding {
    async fn embed(&self, text: &str) -> AssessResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(AssessError::ScoringDegradation(
                "Cannot embed empty text".to_string(),
            ));
        }

        let mut vector = vec![0.0f32; self.dimension];

        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 1)
            .collect();
        if words.is_empty() {
            return Ok(vector);
        }

        let mut freq: BTreeMap<&str, f32> = BTreeMap::new();
        for word in &words {
            *freq.entry(word).or_insert(0.0) += 1.0;
        }

        let total = words.len() as f32;
        for (word, count) in &freq {
            let tf = count / total;
            let bytes = word.as_bytes();
            vector[fnv1a(bytes, None) as usize % self.dimension] += tf;
            vector[fnv1a(bytes, Some(1)) as usize % self.dimension] += tf * 0.7;
            vector[fnv1a(bytes, Some(2)) as usize % self.dimension] += tf * 0.5;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// FNV-1a over `data`, optionally followed by one salt byte.
fn fnv1a(data: &[u8], salt: Option<u8>) -> u32 {
    let mut hash: u32 = 2166136261;
    for &byte in data.iter().chain(salt.as_ref()) {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// Cosine similarity; 0.0 when either vector has zero norm or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

/// Embedding provider backed by an OpenAI-compatible `/v1/embeddings` API.
#[cfg(feature = "http-embeddings")]
pub struct HttpEmbedding {
    base_url: String,
    api_key: String,
    model_id: String,
    dimension: usize,
    http: reqwest::Client,
}

#[cfg(feature = "http-embeddings")]
impl HttpEmbedding {
    /// Create a provider for `model_id` at `base_url` producing `dimension`-sized vectors.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model_id: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model_id: model_id.into(),
            dimension,
            http: reqwest::Client::new(),
        }
    }
}

#[cfg(feature = "http-embeddings")]
#[async_trait]
impl EmbeddingProvider for HttpEmbedding {
    async fn embed(&self, text: &str) -> AssessResult<Vec<f32>> {
        let mut batch = self.embed_batch(&[text]).await?;
        batch
            .pop()
            .ok_or_else(|| AssessError::ScoringDegradation("Empty embedding response".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> AssessResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model_id,
            "input": texts,
        });

        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| AssessError::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AssessError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(AssessError::Upstream {
                status: status.as_u16(),
                message: format!("Embedding API error: {text}"),
            });
        }
        let resp_body: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            AssessError::ScoringDegradation(format!("Embedding API returned non-JSON body: {e}"))
        })?;

        let data = resp_body["data"].as_array().ok_or_else(|| {
            AssessError::ScoringDegradation("Embedding response missing 'data'".into())
        })?;
        let vectors: Vec<Vec<f32>> = data
            .iter()
            .map(|d| {
                d["embedding"]
                    .as_array()
                    .map(|v| v.iter().filter_map(|x| x.as_f64()).map(|x| x as f32).collect())
                    .unwrap_or_default()
            })
            .collect();

        if vectors.len() != texts.len() || vectors.iter().any(|v| v.len() != self.dimension) {
            return Err(AssessError::ScoringDegradation(format!(
                "Embedding response shape mismatch: expected {} x {}",
                texts.len(),
                self.dimension
            )));
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
