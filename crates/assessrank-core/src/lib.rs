//! Core types and error definitions for the assessrank engine.
//!
//! This crate provides the types shared across all assessrank crates,
//! including error handling, the catalog data model, and the cleaning step
//! that turns raw catalog and training records into their canonical form.
//!
//! # Main types
//!
//! - [`AssessError`]: Unified error enum for all assessrank subsystems.
//! - [`AssessResult`]: Convenience alias for `Result<T, AssessError>`.
//! - [`CatalogItem`]: One assessment product, identified by its normalized URL.
//! - [`TrainingAssociation`]: A historical "this query retrieved this item" pair.
//! - [`ExtractedRequirements`]: Structured fields pulled out of a query.
//! - [`ScoredRecommendation`]: A catalog item with its relevance score.

/// Raw catalog/training records and the cleaning step.
pub mod catalog;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// --- Error types ---

/// Top-level error type for the assessrank engine.
///
/// Initialization errors ([`Catalog`](AssessError::Catalog),
/// [`IndexBuild`](AssessError::IndexBuild)) are fatal. Query-time errors
/// ([`Extraction`](AssessError::Extraction),
/// [`ScoringDegradation`](AssessError::ScoringDegradation)) are absorbed by
/// the ranker with a documented fallback.
#[derive(Debug, thiserror::Error)]
pub enum AssessError {
    /// The catalog is empty or malformed.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// The lexical or semantic index could not be built or restored.
    #[error("Index build error: {0}")]
    IndexBuild(String),

    /// Requirement extraction failed or returned malformed output.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// The embedding provider is unavailable; semantic scores degrade to zero.
    #[error("Scoring degradation: {0}")]
    ScoringDegradation(String),

    /// An outbound request that got no usable response: the connection
    /// was refused or reset, or the request timed out.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A remote API answered with a non-success status.
    #[error("Upstream error {status}: {message}")]
    Upstream {
        /// HTTP status code of the response.
        status: u16,
        /// Response body, or a description of it.
        message: String,
    },

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// The caller supplied an argument outside the accepted range.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`AssessError`].
pub type AssessResult<T> = Result<T, AssessError>;

// --- Catalog types ---

/// One assessment product in the catalog.
///
/// `id` is the normalized identifier (canonical URL) and is unique across a
/// cleaned catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Normalized identifier, see [`catalog::normalize_item_id`].
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Ordered category labels, e.g. "Knowledge & Skills".
    #[serde(default)]
    pub categories: Vec<String>,
    /// Assessment length in minutes.
    pub duration_minutes: u32,
    /// Whether the assessment adapts to the candidate (IRT).
    pub is_adaptive: bool,
    /// Whether the assessment supports remote testing.
    pub is_remote: bool,
}

impl CatalogItem {
    /// Whether any category label equals `label`, ignoring ASCII case.
    pub fn has_category(&self, label: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.trim().eq_ignore_ascii_case(label.trim()))
    }

    /// The description cut to at most `max_chars` characters.
    pub fn description_prefix(&self, max_chars: usize) -> &str {
        match self.description.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => &self.description[..byte_idx],
            None => &self.description,
        }
    }
}

/// Human-readable label for a support flag, as the catalog source writes it.
pub fn support_label(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// A historical (query, item) pair: `query_text` should retrieve `item_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingAssociation {
    /// The free-text query as it was asked.
    pub query_text: String,
    /// Normalized id of the item that answered it.
    pub item_id: String,
}

impl TrainingAssociation {
    /// Creates a new association.
    pub fn new(query_text: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            item_id: item_id.into(),
        }
    }
}

// --- Query types ---

/// Role label used when the extractor could not determine one.
pub const UNKNOWN_ROLE: &str = "unknown";

fn unknown_role() -> String {
    UNKNOWN_ROLE.to_string()
}

/// Structured requirements pulled out of one query.
///
/// Skill sets are ordered so that every computation over them is
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRequirements {
    /// Technical skills, e.g. "java", "sql".
    #[serde(default)]
    pub technical_skills: BTreeSet<String>,
    /// Soft skills, e.g. "communication".
    #[serde(default)]
    pub soft_skills: BTreeSet<String>,
    /// Role family, or [`UNKNOWN_ROLE`].
    #[serde(default = "unknown_role")]
    pub role_type: String,
    /// Extra keywords used to enrich the query text.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ExtractedRequirements {
    /// The fallback used whenever extraction fails.
    pub fn empty() -> Self {
        Self {
            technical_skills: BTreeSet::new(),
            soft_skills: BTreeSet::new(),
            role_type: unknown_role(),
            keywords: Vec::new(),
        }
    }

    /// Whether no field carries any information.
    pub fn is_empty(&self) -> bool {
        self.technical_skills.is_empty()
            && self.soft_skills.is_empty()
            && self.keywords.is_empty()
            && self.role_type == UNKNOWN_ROLE
    }
}

impl Default for ExtractedRequirements {
    fn default() -> Self {
        Self::empty()
    }
}

/// A ranked catalog item. Scores are only comparable within one ranking call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecommendation {
    /// The recommended item with all display fields.
    pub item: CatalogItem,
    /// Composite relevance score (not bounded to [0, 1]).
    pub relevance_score: f32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn item(categories: &[&str], description: &str) -> CatalogItem {
        CatalogItem {
            id: "https://example.com/products/x/".to_string(),
            name: "X".to_string(),
            description: description.to_string(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            duration_minutes: 30,
            is_adaptive: false,
            is_remote: true,
        }
    }

    #[test]
    fn test_has_category_ignores_case() {
        let it = item(&["Knowledge & Skills", "Competencies"], "");
        assert!(it.has_category("knowledge & skills"));
        assert!(it.has_category("Competencies"));
        assert!(!it.has_category("Personality & Behavior"));
    }

    #[test]
    fn test_description_prefix_respects_char_boundaries() {
        let it = item(&[], "héllo wörld");
        assert_eq!(it.description_prefix(5), "héllo");
        assert_eq!(it.description_prefix(100), "héllo wörld");
        assert_eq!(it.description_prefix(0), "");
    }

    #[test]
    fn test_empty_requirements() {
        let req = ExtractedRequirements::empty();
        assert!(req.is_empty());
        assert_eq!(req.role_type, "unknown");
        assert_eq!(req, ExtractedRequirements::default());
    }

    #[test]
    fn test_requirements_deserialize_with_missing_fields() {
        let req: ExtractedRequirements =
            serde_json::from_str(r#"{"technical_skills": ["java", "sql"]}"#).unwrap();
        assert_eq!(req.technical_skills.len(), 2);
        assert!(req.soft_skills.is_empty());
        assert_eq!(req.role_type, UNKNOWN_ROLE);
        assert!(!req.is_empty());
    }

    #[test]
    fn test_error_display() {
        let err = AssessError::Catalog("no items".to_string());
        assert_eq!(err.to_string(), "Catalog error: no items");
        let err = AssessError::InvalidRequest("top_k".to_string());
        assert_eq!(err.to_string(), "Invalid request: top_k");
    }

    #[test]
    fn test_support_label() {
        assert_eq!(support_label(true), "Yes");
        assert_eq!(support_label(false), "No");
    }
}
