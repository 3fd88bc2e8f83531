use assessrank_core::{support_label, AssessError, AssessResult, CatalogItem};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::tokenizer::Tokenizer;

/// Relative weight of each catalog field in an item's term frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldWeights {
    /// Assessment name.
    pub name: f32,
    /// Category labels, space-joined.
    pub categories: f32,
    /// The "remote Yes/No" pseudo-field.
    pub remote: f32,
    /// The "adaptive Yes/No" pseudo-field.
    pub adaptive: f32,
    /// Description prefix, see [`LexicalConfig::description_chars`].
    pub description: f32,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            name: 25.0,
            categories: 12.0,
            remote: 5.0,
            adaptive: 3.0,
            description: 1.0,
        }
    }
}

/// Vocabulary and weighting parameters for [`LexicalIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalConfig {
    /// Vocabulary cap; the most frequent terms across the corpus are kept.
    pub max_features: usize,
    /// Terms present in more than this fraction of items are dropped.
    pub max_df: f32,
    /// Terms present in fewer than this many items are dropped.
    pub min_df: usize,
    /// Inclusive n-gram length range.
    pub ngram_range: (usize, usize),
    /// Only this many leading description characters are indexed.
    pub description_chars: usize,
    /// Multiplier applied to each field's term counts.
    pub field_weights: FieldWeights,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            max_features: 10_000,
            max_df: 0.7,
            min_df: 1,
            ngram_range: (1, 4),
            description_chars: 500,
            field_weights: FieldWeights::default(),
        }
    }
}

/// Multi-field weighted TF-IDF index over the catalog.
///
/// Each item is represented by the weighted sum of its per-field n-gram
/// counts, so name and category terms dominate the statistics without
/// n-grams spanning two fields. Weights use sublinear tf (`1 + ln tf`) and
/// smoothed idf (`ln((1 + n) / (1 + df)) + 1`); document vectors are
/// L2-normalized, which makes the query score a cosine similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "LexicalSnapshot")]
pub struct LexicalIndex {
    config: LexicalConfig,
    /// doc index -> item id, in catalog order
    item_ids: Vec<String>,
    /// term -> term id
    vocabulary: HashMap<String, u32>,
    /// term id -> idf
    idf: Vec<f32>,
    /// term id -> (doc index, normalized weight)
    postings: Vec<Vec<(u32, f32)>>,
    #[serde(skip)]
    tokenizer: Tokenizer,
}

/// Serialized form of [`LexicalIndex`]; the tokenizer is rebuilt on load.
#[derive(Deserialize)]
struct LexicalSnapshot {
    config: LexicalConfig,
    item_ids: Vec<String>,
    vocabulary: HashMap<String, u32>,
    idf: Vec<f32>,
    postings: Vec<Vec<(u32, f32)>>,
}

impl From<LexicalSnapshot> for LexicalIndex {
    fn from(snap: LexicalSnapshot) -> Self {
        let tokenizer = Tokenizer::new(snap.config.ngram_range.0, snap.config.ngram_range.1);
        Self {
            config: snap.config,
            item_ids: snap.item_ids,
            vocabulary: snap.vocabulary,
            idf: snap.idf,
            postings: snap.postings,
            tokenizer,
        }
    }
}

impl LexicalIndex {
    /// Build the index over `items`.
    ///
    /// An empty catalog produces an empty index. A non-empty catalog whose
    /// vocabulary is pruned to nothing is an [`AssessError::IndexBuild`].
    pub fn build(items: &[CatalogItem], config: LexicalConfig) -> AssessResult<Self> {
        let tokenizer = Tokenizer::new(config.ngram_range.0, config.ngram_range.1);
        let item_ids: Vec<String> = items.iter().map(|i| i.id.clone()).collect();

        if items.is_empty() {
            return Ok(Self {
                config,
                item_ids,
                vocabulary: HashMap::new(),
                idf: Vec::new(),
                postings: Vec::new(),
                tokenizer,
            });
        }

        let doc_terms: Vec<BTreeMap<String, f32>> = items
            .iter()
            .map(|item| weighted_terms(item, &config, &tokenizer))
            .collect();

        // term -> (document frequency, corpus-wide weighted frequency)
        let mut stats: BTreeMap<&str, (usize, f32)> = BTreeMap::new();
        for terms in &doc_terms {
            for (term, tf) in terms {
                let entry = stats.entry(term.as_str()).or_insert((0, 0.0));
                entry.0 += 1;
                entry.1 += tf;
            }
        }

        let n = items.len();
        let max_doc_count = (config.max_df * n as f32).max(1.0);
        let mut kept: Vec<(&str, usize, f32)> = stats
            .into_iter()
            .filter(|(_, (df, _))| *df >= config.min_df && (*df as f32) <= max_doc_count)
            .map(|(term, (df, total))| (term, df, total))
            .collect();

        if kept.len() > config.max_features {
            kept.sort_by(|a, b| {
                b.2.partial_cmp(&a.2)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.cmp(b.0))
            });
            kept.truncate(config.max_features);
            kept.sort_by(|a, b| a.0.cmp(b.0));
        }

        if kept.is_empty() {
            return Err(AssessError::IndexBuild(format!(
                "No terms remain after pruning ({n} documents, max_df={})",
                config.max_df
            )));
        }

        let mut vocabulary = HashMap::with_capacity(kept.len());
        let mut idf = Vec::with_capacity(kept.len());
        for (term_id, (term, df, _)) in kept.iter().enumerate() {
            vocabulary.insert((*term).to_string(), term_id as u32);
            idf.push(smooth_idf(n, *df));
        }

        let mut postings: Vec<Vec<(u32, f32)>> = vec![Vec::new(); idf.len()];
        for (doc_idx, terms) in doc_terms.iter().enumerate() {
            let weights: Vec<(u32, f32)> = terms
                .iter()
                .filter_map(|(term, &tf)| {
                    vocabulary
                        .get(term)
                        .map(|&id| (id, sublinear_tf(tf) * idf[id as usize]))
                })
                .collect();
            let norm = l2_norm(weights.iter().map(|(_, w)| *w));
            if norm == 0.0 {
                debug!(id = %item_ids[doc_idx], "Item has no indexed terms");
                continue;
            }
            for (term_id, weight) in weights {
                postings[term_id as usize].push((doc_idx as u32, weight / norm));
            }
        }

        info!(
            documents = n,
            vocabulary = vocabulary.len(),
            "Lexical index built"
        );

        Ok(Self {
            config,
            item_ids,
            vocabulary,
            idf,
            postings,
            tokenizer,
        })
    }

    /// Cosine similarity of `query` against every item, in catalog order.
    ///
    /// Out-of-vocabulary terms contribute nothing; a query with no indexed
    /// terms scores 0.0 everywhere.
    pub fn scores(&self, query: &str) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.item_ids.len()];
        if self.vocabulary.is_empty() {
            return scores;
        }

        let mut counts: BTreeMap<u32, f32> = BTreeMap::new();
        for term in self.tokenizer.terms(query) {
            if let Some(&id) = self.vocabulary.get(&term) {
                *counts.entry(id).or_insert(0.0) += 1.0;
            }
        }

        let query_weights: Vec<(u32, f32)> = counts
            .into_iter()
            .map(|(id, tf)| (id, sublinear_tf(tf) * self.idf[id as usize]))
            .collect();
        let norm = l2_norm(query_weights.iter().map(|(_, w)| *w));
        if norm == 0.0 {
            return scores;
        }

        for (term_id, weight) in query_weights {
            let q = weight / norm;
            for &(doc_idx, d) in &self.postings[term_id as usize] {
                scores[doc_idx as usize] += q * d;
            }
        }
        scores
    }

    /// Cosine similarity of `query` against every item, keyed by item id.
    pub fn score(&self, query: &str) -> HashMap<String, f32> {
        self.item_ids
            .iter()
            .cloned()
            .zip(self.scores(query))
            .collect()
    }

    /// Number of indexed items.
    pub fn document_count(&self) -> usize {
        self.item_ids.len()
    }

    /// Number of terms kept after pruning.
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Whether `term` survived vocabulary pruning.
    pub fn contains_term(&self, term: &str) -> bool {
        self.vocabulary.contains_key(term)
    }

    /// Item ids in catalog order.
    pub fn item_ids(&self) -> &[String] {
        &self.item_ids
    }
}

/// Weighted term frequencies of one item: per-field n-gram counts times the
/// field weight, summed over fields.
fn weighted_terms(
    item: &CatalogItem,
    config: &LexicalConfig,
    tokenizer: &Tokenizer,
) -> BTreeMap<String, f32> {
    let w = &config.field_weights;
    let categories = item.categories.join(" ");
    let fields: [(&str, f32); 5] = [
        (item.name.as_str(), w.name),
        (categories.as_str(), w.categories),
        (support_label(item.is_remote), w.remote),
        (support_label(item.is_adaptive), w.adaptive),
        (item.description_prefix(config.description_chars), w.description),
    ];

    let mut terms: BTreeMap<String, f32> = BTreeMap::new();
    for (text, weight) in fields {
        if weight <= 0.0 {
            continue;
        }
        for term in tokenizer.terms(text) {
            *terms.entry(term).or_insert(0.0) += weight;
        }
    }
    terms
}

fn sublinear_tf(tf: f32) -> f32 {
    if tf > 0.0 {
        1.0 + tf.ln()
    } else {
        0.0
    }
}

fn smooth_idf(n_docs: usize, df: usize) -> f32 {
    ((1.0 + n_docs as f32) / (1.0 + df as f32)).ln() + 1.0
}

fn l2_norm(values: impl Iterator<Item = f32>) -> f32 {
    values.map(|v| v * v).sum::<f32>().sqrt()
}
