use crate::rules::RuleBoosts;
use crate::weights::SkillBoosts;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Every signal that went into one item's composite score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalBreakdown {
    /// Lexical cosine similarity.
    pub tfidf: f32,
    /// Embedding cosine similarity; 0 when semantic scoring is off.
    pub semantic: f32,
    /// Popularity and keyword association learned from labelled queries.
    pub training: f32,
    /// Extracted technical skills found in the item, see [`tech_boost`].
    pub technical: f32,
    /// Extracted soft skills found in the item, see [`soft_boost`].
    pub soft: f32,
    /// Sum of fired [`Signal::Type`](crate::rules::Signal::Type) rules.
    pub type_match: f32,
    /// Sum of fired [`Signal::Remote`](crate::rules::Signal::Remote) rules.
    pub remote: f32,
    /// Sum of fired [`Signal::Duration`](crate::rules::Signal::Duration) rules.
    pub duration: f32,
    /// Sum of fired [`Signal::Collaboration`](crate::rules::Signal::Collaboration) rules.
    pub collaboration: f32,
    /// Weighted sum of the above.
    pub composite: f32,
}

impl SignalBreakdown {
    pub(crate) fn with_rules(mut self, rules: RuleBoosts) -> Self {
        self.type_match = rules.type_match;
        self.remote = rules.remote;
        self.duration = rules.duration;
        self.collaboration = rules.collaboration;
        self
    }
}

/// Technical-skill boost: per skill, the name-match magnitude if the skill
/// occurs in the name, else the description-match magnitude if it occurs in
/// the description. Clamped to [0, 1].
pub fn tech_boost(
    skills: &BTreeSet<String>,
    name_lower: &str,
    description_lower: &str,
    boosts: &SkillBoosts,
) -> f32 {
    let total: f32 = skills
        .iter()
        .map(|skill| skill.trim().to_lowercase())
        .filter(|skill| !skill.is_empty())
        .map(|skill| {
            if name_lower.contains(&skill) {
                boosts.technical_in_name
            } else if description_lower.contains(&skill) {
                boosts.technical_in_description
            } else {
                0.0
            }
        })
        .sum();
    total.clamp(0.0, 1.0)
}

/// Soft-skill boost: a fixed magnitude per skill found in the name or the
/// description. Clamped to [0, 1].
pub fn soft_boost(
    skills: &BTreeSet<String>,
    name_lower: &str,
    description_lower: &str,
    boosts: &SkillBoosts,
) -> f32 {
    let hits = skills
        .iter()
        .map(|skill| skill.trim().to_lowercase())
        .filter(|skill| !skill.is_empty())
        .filter(|skill| name_lower.contains(skill) || description_lower.contains(skill))
        .count();
    (hits as f32 * boosts.soft).clamp(0.0, 1.0)
}
