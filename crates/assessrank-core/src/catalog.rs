use crate::{AssessError, AssessResult, CatalogItem, TrainingAssociation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Duration assumed when the source record does not carry one.
pub const DEFAULT_DURATION_MINUTES: u32 = 20;

/// Path segment that the source uses interchangeably with `/products/`.
const DUPLICATE_PATH: &str = "/solutions/products/";
const CANONICAL_PATH: &str = "/products/";

/// A catalog record as supplied by the catalog collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCatalogRecord {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    /// Pipe-delimited category labels.
    #[serde(default)]
    pub test_type: String,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub adaptive_support: Option<String>,
    #[serde(default)]
    pub remote_support: Option<String>,
}

/// A training-history record as supplied by the training collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTrainingRecord {
    #[serde(alias = "Query")]
    pub query: String,
    #[serde(alias = "Assessment_url")]
    pub assessment_url: String,
}

/// Canonical form of an item URL: trimmed, with the duplicate
/// `/solutions/products/` path collapsed into `/products/`.
pub fn normalize_item_id(url: &str) -> String {
    url.trim().replace(DUPLICATE_PATH, CANONICAL_PATH)
}

/// Split a pipe-delimited category string into trimmed, non-empty labels.
pub fn parse_categories(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(raw: Option<&str>, default: bool) -> bool {
    match raw.map(str::trim) {
        None | Some("") => default,
        Some(value) => value.eq_ignore_ascii_case("yes"),
    }
}

/// Clean raw catalog records into a deduplicated catalog.
///
/// Records with a blank name or url are skipped. Records whose normalized
/// id was already seen are dropped; the first occurrence wins. A missing
/// `remote_support` is read as remote-capable, matching how the source
/// catalog has always been interpreted.
pub fn clean_catalog(records: Vec<RawCatalogRecord>) -> AssessResult<Vec<CatalogItem>> {
    if records.is_empty() {
        return Err(AssessError::Catalog("Catalog input is empty".to_string()));
    }

    let original = records.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(original);
    let mut items = Vec::with_capacity(original);
    let mut skipped = 0usize;

    for record in records {
        if record.name.trim().is_empty() || record.url.trim().is_empty() {
            skipped += 1;
            continue;
        }

        let id = normalize_item_id(&record.url);
        if !seen.insert(id.clone()) {
            debug!(id = %id, "Dropping duplicate catalog record");
            continue;
        }

        if record.remote_support.is_none() {
            debug!(id = %id, "remote_support missing, defaulting to remote");
        }

        items.push(CatalogItem {
            id,
            name: record.name.trim().to_string(),
            description: record.description.trim().to_string(),
            categories: parse_categories(&record.test_type),
            duration_minutes: record.duration.unwrap_or(DEFAULT_DURATION_MINUTES),
            is_adaptive: parse_flag(record.adaptive_support.as_deref(), false),
            is_remote: parse_flag(record.remote_support.as_deref(), true),
        });
    }

    if skipped > 0 {
        warn!(skipped, "Skipped catalog records without name or url");
    }

    let duplicates = original - skipped - items.len();
    if duplicates > 0 {
        info!(duplicates, "Removed duplicate assessments");
    }

    if items.is_empty() {
        return Err(AssessError::Catalog(
            "No valid catalog records after cleaning".to_string(),
        ));
    }

    info!(count = items.len(), "Catalog cleaned");
    Ok(items)
}

/// Normalize training records into the catalog id space.
pub fn prepare_training(records: Vec<RawTrainingRecord>) -> Vec<TrainingAssociation> {
    let total = records.len();
    let associations: Vec<TrainingAssociation> = records
        .into_iter()
        .filter(|r| !r.query.trim().is_empty() && !r.assessment_url.trim().is_empty())
        .map(|r| TrainingAssociation::new(r.query.trim(), normalize_item_id(&r.assessment_url)))
        .collect();

    if associations.len() < total {
        warn!(
            dropped = total - associations.len(),
            "Dropped blank training records"
        );
    }
    associations
}

/// Read a JSON array of [`RawCatalogRecord`] and clean it.
pub async fn load_catalog(path: impl AsRef<Path>) -> AssessResult<Vec<CatalogItem>> {
    let path = path.as_ref();
    info!(path = %path.display(), "Loading catalog");
    let data = tokio::fs::read_to_string(path).await.map_err(|e| {
        AssessError::Catalog(format!(
            "Failed to read catalog '{}': {}",
            path.display(),
            e
        ))
    })?;
    let records: Vec<RawCatalogRecord> = serde_json::from_str(&data).map_err(|e| {
        AssessError::Catalog(format!("Malformed catalog '{}': {}", path.display(), e))
    })?;
    clean_catalog(records)
}

/// Read a JSON array of [`RawTrainingRecord`] and normalize it.
pub async fn load_training(path: impl AsRef<Path>) -> AssessResult<Vec<TrainingAssociation>> {
    let path = path.as_ref();
    info!(path = %path.display(), "Loading training history");
    let data = tokio::fs::read_to_string(path).await?;
    let records: Vec<RawTrainingRecord> = serde_json::from_str(&data)?;
    let associations = prepare_training(records);
    info!(count = associations.len(), "Training associations loaded");
    Ok(associations)
}
