use std::collections::HashMap;
use std::sync::Arc;

use assessrank_core::{AssessError, AssessResult, CatalogItem};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::embedding::{cosine_similarity, EmbeddingProvider};

/// Natural-language rendering of an item used for its embedding.
pub fn describe_item(item: &CatalogItem) -> String {
    let mut text = format!(
        "{}. {}. Categories: {}. Duration: {} minutes.",
        item.name,
        item.description,
        item.categories.join(", "),
        item.duration_minutes
    );
    if item.is_remote {
        text.push_str(" Remote-friendly");
    }
    if item.is_adaptive {
        text.push_str(" Adaptive test");
    }
    text
}

/// Serializable form of a [`SemanticIndex`]; the provider is not part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticSnapshot {
    pub item_ids: Vec<String>,
    pub dimension: usize,
    /// `None` when the index was built without a provider.
    pub vectors: Option<Vec<Vec<f32>>>,
}

/// Dense-vector index over the catalog.
///
/// Queries are embedded with the same provider used at build time. When no
/// provider is configured, or the provider fails for a query, every item
/// scores 0.0 so the semantic signal drops out of the composite instead of
/// failing the ranking.
pub struct SemanticIndex {
    item_ids: Vec<String>,
    vectors: Option<Vec<Vec<f32>>>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl SemanticIndex {
    /// Embed every item with `provider`.
    ///
    /// Provider failures here are fatal ([`AssessError::IndexBuild`]).
    pub async fn build(
        items: &[CatalogItem],
        provider: Arc<dyn EmbeddingProvider>,
    ) -> AssessResult<Self> {
        let texts: Vec<String> = items.iter().map(describe_item).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();

        let vectors = provider
            .embed_batch(&refs)
            .await
            .map_err(|e| AssessError::IndexBuild(format!("Semantic embedding failed: {e}")))?;

        if vectors.len() != items.len() {
            return Err(AssessError::IndexBuild(format!(
                "Provider returned {} vectors for {} items",
                vectors.len(),
                items.len()
            )));
        }
        let dimension = provider.dimension();
        if let Some(bad) = vectors.iter().position(|v| v.len() != dimension) {
            return Err(AssessError::IndexBuild(format!(
                "Vector for '{}' has dimension {}, expected {}",
                items[bad].id,
                vectors[bad].len(),
                dimension
            )));
        }

        info!(items = items.len(), dimension, "Semantic index built");
        Ok(Self {
            item_ids: items.iter().map(|i| i.id.clone()).collect(),
            vectors: Some(vectors),
            provider: Some(provider),
        })
    }

    /// An index without a provider: every score is 0.0.
    pub fn disabled(items: &[CatalogItem]) -> Self {
        info!(items = items.len(), "Semantic index disabled, scores will be zero");
        Self {
            item_ids: items.iter().map(|i| i.id.clone()).collect(),
            vectors: None,
            provider: None,
        }
    }

    /// Whether semantic scores can be non-zero.
    pub fn is_enabled(&self) -> bool {
        self.vectors.is_some() && self.provider.is_some()
    }

    /// Cosine similarity of `query` against every item, in catalog order.
    pub async fn scores(&self, query: &str) -> Vec<f32> {
        let zeros = vec![0.0f32; self.item_ids.len()];
        let (Some(vectors), Some(provider)) = (&self.vectors, &self.provider) else {
            return zeros;
        };

        let query_vec = match provider.embed(query).await {
            Ok(v) if v.len() == provider.dimension() => v,
            Ok(v) => {
                warn!(
                    got = v.len(),
                    expected = provider.dimension(),
                    "Scoring degradation: query embedding has wrong dimension"
                );
                return zeros;
            }
            Err(e) => {
                warn!(error = %e, "Scoring degradation: semantic scores zero-filled");
                return zeros;
            }
        };

        vectors
            .iter()
            .map(|v| cosine_similarity(&query_vec, v))
            .collect()
    }

    /// Cosine similarity of `query` against every item, keyed by item id.
    pub async fn score(&self, query: &str) -> HashMap<String, f32> {
        let scores = self.scores(query).await;
        self.item_ids.iter().cloned().zip(scores).collect()
    }

    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.item_ids.len()
    }

    /// Whether the index holds no items.
    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }

    /// Export the item vectors.
    pub fn snapshot(&self) -> SemanticSnapshot {
        SemanticSnapshot {
            item_ids: self.item_ids.clone(),
            dimension: self
                .provider
                .as_ref()
                .map(|p| p.dimension())
                .unwrap_or_default(),
            vectors: self.vectors.clone(),
        }
    }

    /// Restore from a snapshot, attaching `provider` for query embedding.
    ///
    /// A snapshot with vectors but no provider yields a disabled index.
    pub fn from_snapshot(
        snapshot: SemanticSnapshot,
        provider: Option<Arc<dyn EmbeddingProvider>>,
    ) -> AssessResult<Self> {
        let SemanticSnapshot {
            item_ids,
            dimension,
            vectors,
        } = snapshot;

        if let Some(vectors) = &vectors {
            if vectors.len() != item_ids.len() {
                return Err(AssessError::IndexBuild(format!(
                    "Snapshot has {} vectors for {} items",
                    vectors.len(),
                    item_ids.len()
                )));
            }
            if let Some(p) = &provider {
                if p.dimension() != dimension {
                    return Err(AssessError::IndexBuild(format!(
                        "Snapshot dimension {dimension} does not match provider dimension {}",
                        p.dimension()
                    )));
                }
            }
        }

        let (vectors, provider) = match (vectors, provider) {
            (Some(v), Some(p)) => (Some(v), Some(p)),
            _ => (None, None),
        };
        Ok(Self {
            item_ids,
            vectors,
            provider,
        })
    }
}
