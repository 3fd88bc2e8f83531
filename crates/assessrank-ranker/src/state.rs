use assessrank_core::{AssessError, AssessResult, CatalogItem};
use assessrank_index::{LexicalIndex, PatternModel, SemanticSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Current on-disk format of [`EngineState`].
pub const STATE_FORMAT_VERSION: u32 = 1;

/// Everything built at initialization, for warm restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineState {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    pub catalog: Vec<CatalogItem>,
    pub lexical: LexicalIndex,
    pub semantic: SemanticSnapshot,
    pub patterns: PatternModel,
}

impl EngineState {
    /// Check the version and that every part covers the same catalog.
    pub fn validate(&self) -> AssessResult<()> {
        if self.format_version != STATE_FORMAT_VERSION {
            return Err(AssessError::IndexBuild(format!(
                "Unsupported state format version {} (expected {STATE_FORMAT_VERSION})",
                self.format_version
            )));
        }
        let ids: Vec<&str> = self.catalog.iter().map(|i| i.id.as_str()).collect();
        let same = |other: &[String]| {
            other.len() == ids.len() && other.iter().zip(&ids).all(|(a, b)| a == b)
        };
        if !same(self.lexical.item_ids()) {
            return Err(AssessError::IndexBuild(format!(
                "Lexical index covers {} items, catalog has {}",
                self.lexical.document_count(),
                ids.len()
            )));
        }
        if !same(&self.semantic.item_ids) {
            return Err(AssessError::IndexBuild(format!(
                "Semantic snapshot covers {} items, catalog has {}",
                self.semantic.item_ids.len(),
                ids.len()
            )));
        }
        Ok(())
    }
}

/// Write `state` as JSON to `path`.
pub async fn save_state(state: &EngineState, path: impl AsRef<Path>) -> AssessResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec(state)?;
    tokio::fs::write(path, &json).await?;
    info!(
        path = %path.display(),
        items = state.catalog.len(),
        bytes = json.len(),
        "Engine state saved"
    );
    Ok(())
}

/// Read and validate a state written by [`save_state`].
pub async fn load_state(path: impl AsRef<Path>) -> AssessResult<EngineState> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    let state: EngineState = serde_json::from_slice(&bytes)?;
    state.validate()?;
    info!(
        path = %path.display(),
        items = state.catalog.len(),
        exported_at = %state.exported_at,
        "Engine state loaded"
    );
    Ok(state)
}
