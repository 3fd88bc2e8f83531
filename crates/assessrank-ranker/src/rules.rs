use assessrank_core::CatalogItem;
use serde::{Deserialize, Serialize};

/// Which composite-score signal a rule contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Query wording suggests a test category.
    Type,
    /// Query asks for remote testing.
    Remote,
    /// Query asks for a specific length.
    Duration,
    /// Query mentions teamwork.
    Collaboration,
}

/// Item predicate a rule checks once its triggers fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// The item carries any of these category labels.
    Category { any_of: Vec<String> },
    /// The item supports remote testing.
    Remote,
    /// `min <= duration_minutes <= max`.
    DurationRange { min: u32, max: u32 },
    /// Name or description contains any of these (case-insensitive).
    TextContains { any_of: Vec<String> },
}

impl Target {
    /// `text_lower` is the lowercased name and description of `item`.
    fn matches(&self, item: &CatalogItem, text_lower: &str) -> bool {
        match self {
            Target::Category { any_of } => any_of.iter().any(|c| item.has_category(c)),
            Target::Remote => item.is_remote,
            Target::DurationRange { min, max } => (*min..=*max).contains(&item.duration_minutes),
            Target::TextContains { any_of } => any_of
                .iter()
                .any(|needle| text_lower.contains(&needle.to_lowercase())),
        }
    }
}

/// One heuristic boost: when the query contains any trigger and the item
/// matches the target, `boost` is added to `signal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostRule {
    /// Breakdown field the boost is added to.
    pub signal: Signal,
    /// Case-insensitive substrings of the raw query.
    pub triggers: Vec<String>,
    /// Items the boost applies to.
    pub target: Target,
    /// Amount added per fired rule, before signal weighting.
    pub boost: f32,
}

impl BoostRule {
    /// Whether any trigger occurs in the lowercased query.
    pub fn fires(&self, query_lower: &str) -> bool {
        self.triggers
            .iter()
            .any(|t| query_lower.contains(&t.to_lowercase()))
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

/// The tuned rule table.
pub fn default_rules() -> Vec<BoostRule> {
    vec![
        BoostRule {
            signal: Signal::Type,
            triggers: words(&["programming", "coding", "developer", "engineer", "java", "python", "sql"]),
            target: Target::Category { any_of: words(&["Knowledge & Skills"]) },
            boost: 0.3,
        },
        BoostRule {
            signal: Signal::Type,
            triggers: words(&["personality", "culture", "behavior", "opq"]),
            target: Target::Category { any_of: words(&["Personality & Behavior"]) },
            boost: 0.3,
        },
        BoostRule {
            signal: Signal::Type,
            triggers: words(&["leadership", "manager", "management", "competenc"]),
            target: Target::Category {
                any_of: words(&["Competencies", "Personality & Behavior"]),
            },
            boost: 0.25,
        },
        BoostRule {
            signal: Signal::Remote,
            triggers: words(&["remote"]),
            target: Target::Remote,
            boost: 0.15,
        },
        BoostRule {
            signal: Signal::Duration,
            triggers: words(&["1 hour", "60 min"]),
            target: Target::DurationRange { min: 50, max: 70 },
            boost: 0.2,
        },
        BoostRule {
            signal: Signal::Collaboration,
            triggers: words(&["collaborate", "team", "work with"]),
            target: Target::TextContains {
                any_of: words(&["interpersonal", "communication", "teamwork"]),
            },
            boost: 0.2,
        },
    ]
}

/// Accumulated rule boosts for one item. Boosts of the same signal add up
/// without clamping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleBoosts {
    pub type_match: f32,
    pub remote: f32,
    pub duration: f32,
    pub collaboration: f32,
}

impl RuleBoosts {
    fn add(&mut self, signal: Signal, boost: f32) {
        let slot = match signal {
            Signal::Type => &mut self.type_match,
            Signal::Remote => &mut self.remote,
            Signal::Duration => &mut self.duration,
            Signal::Collaboration => &mut self.collaboration,
        };
        *slot += boost;
    }
}

/// The subset of `rules` whose triggers occur in the query.
///
/// Trigger matching depends only on the query, so it is done once per
/// ranking call.
pub fn fired_rules<'a>(rules: &'a [BoostRule], query_lower: &str) -> Vec<&'a BoostRule> {
    rules.iter().filter(|r| r.fires(query_lower)).collect()
}

/// Evaluate already-fired rules against one item.
pub fn apply_rules(fired: &[&BoostRule], item: &CatalogItem, text_lower: &str) -> RuleBoosts {
    let mut boosts = RuleBoosts::default();
    for rule in fired {
        if rule.target.matches(item, text_lower) {
            boosts.add(rule.signal, rule.boost);
        }
    }
    boosts
}
