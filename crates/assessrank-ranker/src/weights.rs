use crate::rules::{default_rules, BoostRule};
use crate::signals::SignalBreakdown;
use assessrank_index::{LexicalConfig, PatternConfig};
use serde::{Deserialize, Serialize};

/// Linear weights of the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub tfidf: f32,
    pub semantic: f32,
    pub training: f32,
    pub technical: f32,
    pub soft: f32,
    pub type_match: f32,
    pub remote: f32,
    pub duration: f32,
    pub collaboration: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            tfidf: 0.35,
            semantic: 0.18,
            training: 0.20,
            technical: 0.12,
            soft: 0.05,
            type_match: 0.05,
            remote: 0.03,
            duration: 0.01,
            collaboration: 0.01,
        }
    }
}

impl ScoringWeights {
    /// Weighted sum of every signal in `s`.
    pub fn composite(&self, s: &SignalBreakdown) -> f32 {
        self.tfidf * s.tfidf
            + self.semantic * s.semantic
            + self.training * s.training
            + self.technical * s.technical
            + self.soft * s.soft
            + self.type_match * s.type_match
            + self.remote * s.remote
            + self.duration * s.duration
            + self.collaboration * s.collaboration
    }
}

/// Per-match magnitudes of the extracted-skill boosts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillBoosts {
    /// Technical skill found in the item name.
    pub technical_in_name: f32,
    /// Technical skill found only in the description.
    pub technical_in_description: f32,
    /// Soft skill found in name or description.
    pub soft: f32,
}

impl Default for SkillBoosts {
    fn default() -> Self {
        Self {
            technical_in_name: 0.5,
            technical_in_description: 0.2,
            soft: 0.25,
        }
    }
}

/// Everything tunable about ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerConfig {
    pub weights: ScoringWeights,
    pub skill_boosts: SkillBoosts,
    pub rules: Vec<BoostRule>,
    pub lexical: LexicalConfig,
    pub patterns: PatternConfig,
    /// Largest accepted `top_k`.
    pub max_top_k: usize,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            skill_boosts: SkillBoosts::default(),
            rules: default_rules(),
            lexical: LexicalConfig::default(),
            patterns: PatternConfig::default(),
            max_top_k: 20,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_weights() {
        let w = ScoringWeights::default();
        let total = w.tfidf
            + w.semantic
            + w.training
            + w.technical
            + w.soft
            + w.type_match
            + w.remote
            + w.duration
            + w.collaboration;
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn composite_is_linear() {
        let w = ScoringWeights::default();
        let signals = SignalBreakdown {
            tfidf: 1.0,
            duration: 0.2,
            ..SignalBreakdown::default()
        };
        assert!((w.composite(&signals) - (0.35 + 0.002)).abs() < 1e-6);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: RankerConfig = serde_json::from_value(serde_json::json!({
            "weights": { "semantic": 0.0 },
            "max_top_k": 10
        }))
        .unwrap();
        assert_eq!(config.weights.semantic, 0.0);
        assert_eq!(config.weights.tfidf, 0.35);
        assert_eq!(config.rules.len(), 6);
        assert_eq!(config.max_top_k, 10);
    }
}
