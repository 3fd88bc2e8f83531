//! Hybrid ranking for assessrank.
//!
//! [`HybridRanker`] fuses the lexical, semantic and learned-pattern signals
//! from `assessrank-index` with extracted-skill boosts and a declarative
//! rule table into one weighted composite score, then returns the top-K
//! catalog items.
//!
//! # Main types
//!
//! - [`HybridRanker`] / [`RankerBuilder`]: the engine and its one-off build.
//! - [`RankerConfig`]: weights, boost magnitudes, rules and index settings.
//! - [`BoostRule`]: one heuristic query-keyword → item-predicate boost.
//! - [`EngineState`]: exported indexes for warm restarts.
//! - [`RecallReport`]: recall@K over labelled queries.
//! - [`PredictionRow`]: batch predictions written as CSV tables.

/// Recall@K evaluation.
pub mod evaluate;
/// Batch predictions for a query file.
pub mod predict;
/// The ranking engine.
pub mod ranker;
/// Declarative heuristic boost rules.
pub mod rules;
/// Per-item signal breakdown and skill boosts.
pub mod signals;
/// State export and import.
pub mod state;
/// Scoring weights and ranker configuration.
pub mod weights;

pub use evaluate::{mean_recall_at_k, QueryRecall, RecallReport};
pub use predict::{
    load_queries, predict, save_predictions, PredictionFiles, PredictionRow, SubmissionRow,
    DETAILED_FILE, SUBMISSION_FILE,
};
pub use ranker::{Explanation, HybridRanker, RankerBuilder};
pub use rules::{default_rules, BoostRule, RuleBoosts, Signal, Target};
pub use signals::{soft_boost, tech_boost, SignalBreakdown};
pub use state::{load_state, save_state, EngineState, STATE_FORMAT_VERSION};
pub use weights::{RankerConfig, ScoringWeights, SkillBoosts};
