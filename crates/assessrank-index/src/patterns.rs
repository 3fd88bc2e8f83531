use assessrank_core::TrainingAssociation;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::info;

/// Magnitudes used by [`PatternModel::boost`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Boost per historical association of the item.
    pub popularity_step: f32,
    /// Ceiling of the popularity part.
    pub popularity_cap: f32,
    /// Boost per distinct query keyword associated with the item.
    pub keyword_hit: f32,
    /// Keywords must have more than this many characters.
    pub min_token_chars: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            popularity_step: 0.08,
            popularity_cap: 0.4,
            keyword_hit: 0.15,
            min_token_chars: 3,
        }
    }
}

/// Patterns learned from historical query→item associations: how often
/// each item was chosen, and which items each query keyword led to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternModel {
    config: PatternConfig,
    /// item id -> number of associations
    frequency: HashMap<String, u32>,
    /// lowercase keyword -> items associated with a query containing it
    keyword_items: HashMap<String, HashSet<String>>,
}

impl PatternModel {
    /// Learn from `associations`. The model is read-only afterwards.
    pub fn learn(associations: &[TrainingAssociation], config: PatternConfig) -> Self {
        let mut frequency: HashMap<String, u32> = HashMap::new();
        let mut keyword_items: HashMap<String, HashSet<String>> = HashMap::new();

        for assoc in associations {
            *frequency.entry(assoc.item_id.clone()).or_insert(0) += 1;

            let query = assoc.query_text.to_lowercase();
            for word in keywords(&query, config.min_token_chars) {
                keyword_items
                    .entry(word.to_string())
                    .or_default()
                    .insert(assoc.item_id.clone());
            }
        }

        info!(
            items = frequency.len(),
            keywords = keyword_items.len(),
            "Learned training patterns"
        );

        Self {
            config,
            frequency,
            keyword_items,
        }
    }

    /// Boost in [0, 1] for `item_id` given the lowercased query.
    ///
    /// `min(freq * step, cap) + keyword_hit * distinct matching keywords`,
    /// clamped to 1.0.
    pub fn boost(&self, item_id: &str, query_lower: &str) -> f32 {
        let cfg = &self.config;
        let popularity = self
            .frequency
            .get(item_id)
            .map(|&f| (f as f32 * cfg.popularity_step).min(cfg.popularity_cap))
            .unwrap_or(0.0);

        let hits = keywords(query_lower, cfg.min_token_chars)
            .into_iter()
            .filter(|word| {
                self.keyword_items
                    .get(*word)
                    .is_some_and(|items| items.contains(item_id))
            })
            .count();

        (popularity + hits as f32 * cfg.keyword_hit).clamp(0.0, 1.0)
    }

    /// Number of historical associations for `item_id`.
    pub fn frequency(&self, item_id: &str) -> u32 {
        self.frequency.get(item_id).copied().unwrap_or(0)
    }

    /// Number of distinct items seen in the history.
    pub fn item_count(&self) -> usize {
        self.frequency.len()
    }

    /// Number of distinct learned keywords.
    pub fn keyword_count(&self) -> usize {
        self.keyword_items.len()
    }

    /// Item ids seen in the history.
    pub fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.frequency.keys().map(String::as_str)
    }
}

/// Distinct whitespace tokens longer than `min_chars` characters.
fn keywords(query_lower: &str, min_chars: usize) -> BTreeSet<&str> {
    query_lower
        .split_whitespace()
        .filter(|w| w.chars().count() > min_chars)
        .collect()
}
