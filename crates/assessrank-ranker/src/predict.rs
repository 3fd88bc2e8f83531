use crate::ranker::HybridRanker;
use assessrank_core::AssessResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the per-rank prediction table.
pub const DETAILED_FILE: &str = "test_predictions_detailed.csv";
/// File name of the two-column submission table.
pub const SUBMISSION_FILE: &str = "test_predictions.csv";

/// One ranked recommendation for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    /// The query as read from the input file.
    #[serde(rename = "Query")]
    pub query: String,
    /// 1-based position in the ranking.
    #[serde(rename = "Rank")]
    pub rank: usize,
    /// Display name of the item.
    #[serde(rename = "Assessment_Name")]
    pub assessment_name: String,
    /// Item id, the normalized catalog URL.
    #[serde(rename = "Assessment_URL")]
    pub assessment_url: String,
    /// Composite score from [`HybridRanker::recommend`].
    #[serde(rename = "Relevance_Score")]
    pub relevance_score: f32,
}

/// A query paired with one recommended item id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRow {
    /// The query as read from the input file.
    #[serde(rename = "Query")]
    pub query: String,
    /// Item id, the normalized catalog URL.
    #[serde(rename = "Assessment_url")]
    pub assessment_url: String,
}

impl From<&PredictionRow> for SubmissionRow {
    fn from(row: &PredictionRow) -> Self {
        Self {
            query: row.query.clone(),
            assessment_url: row.assessment_url.clone(),
        }
    }
}

/// Where [`save_predictions`] wrote its two tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionFiles {
    /// Path of [`DETAILED_FILE`].
    pub detailed: PathBuf,
    /// Path of [`SUBMISSION_FILE`].
    pub submission: PathBuf,
    /// Data rows in each table.
    pub rows: usize,
}

#[derive(Deserialize)]
struct QueryRecord {
    #[serde(rename = "Query", alias = "query")]
    query: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QueryEntry {
    Text(String),
    Record(QueryRecord),
}

/// Queries from a CSV with a `Query` column.
pub fn parse_queries_csv(data: &[u8]) -> AssessResult<Vec<String>> {
    let mut reader = csv::Reader::from_reader(data);
    let mut queries = Vec::new();
    for record in reader.deserialize::<QueryRecord>() {
        let record = record.map_err(std::io::Error::from)?;
        queries.push(record.query);
    }
    Ok(non_blank(queries))
}

/// Queries from a JSON array of strings or of `{"Query": ...}` objects.
pub fn parse_queries_json(data: &[u8]) -> AssessResult<Vec<String>> {
    let entries: Vec<QueryEntry> = serde_json::from_slice(data)?;
    let queries = entries
        .into_iter()
        .map(|entry| match entry {
            QueryEntry::Text(q) => q,
            QueryEntry::Record(r) => r.query,
        })
        .collect();
    Ok(non_blank(queries))
}

fn non_blank(queries: Vec<String>) -> Vec<String> {
    let total = queries.len();
    let kept: Vec<String> = queries
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();
    if kept.len() < total {
        warn!(skipped = total - kept.len(), "Blank queries skipped");
    }
    kept
}

/// Read a query file; `.csv` files are parsed as CSV, anything else as JSON.
pub async fn load_queries(path: impl AsRef<Path>) -> AssessResult<Vec<String>> {
    let path = path.as_ref();
    let data = tokio::fs::read(path).await?;
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let queries = if is_csv {
        parse_queries_csv(&data)?
    } else {
        parse_queries_json(&data)?
    };
    info!(path = %path.display(), queries = queries.len(), "Queries loaded");
    Ok(queries)
}

/// Rank the catalog for each query, in input order.
pub async fn predict(
    ranker: &HybridRanker,
    queries: &[String],
    top_k: usize,
) -> AssessResult<Vec<PredictionRow>> {
    let mut rows = Vec::new();
    for (n, query) in queries.iter().enumerate() {
        let recs = ranker.recommend(query, top_k).await?;
        debug!(query = n + 1, of = queries.len(), results = recs.len(), "Predicted");
        rows.extend(recs.into_iter().enumerate().map(|(i, rec)| PredictionRow {
            query: query.clone(),
            rank: i + 1,
            assessment_name: rec.item.name,
            assessment_url: rec.item.id,
            relevance_score: rec.relevance_score,
        }));
    }
    Ok(rows)
}

/// Serialize `rows` as CSV with a header line.
pub fn to_csv<T: Serialize>(rows: &[T]) -> AssessResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).map_err(std::io::Error::from)?;
    }
    let bytes = writer.into_inner().map_err(csv::IntoInnerError::into_error)?;
    Ok(bytes)
}

/// Write [`DETAILED_FILE`] and [`SUBMISSION_FILE`] into `dir`, creating it.
pub async fn save_predictions(
    rows: &[PredictionRow],
    dir: impl AsRef<Path>,
) -> AssessResult<PredictionFiles> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await?;

    let detailed = dir.join(DETAILED_FILE);
    tokio::fs::write(&detailed, to_csv(rows)?).await?;

    let submission_rows: Vec<SubmissionRow> = rows.iter().map(SubmissionRow::from).collect();
    let submission = dir.join(SUBMISSION_FILE);
    tokio::fs::write(&submission, to_csv(&submission_rows)?).await?;

    info!(dir = %dir.display(), rows = rows.len(), "Predictions saved");
    Ok(PredictionFiles {
        detailed,
        submission,
        rows: rows.len(),
    })
}
