use crate::ranker::HybridRanker;
use assessrank_core::{AssessResult, TrainingAssociation};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info};

/// Recall of one labelled query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecall {
    pub query: String,
    /// Ground-truth items present in the catalog.
    pub relevant: usize,
    /// How many of those were in the top k.
    pub found: usize,
    pub recall: f32,
}

/// Mean recall@k over a labelled query set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallReport {
    pub k: usize,
    pub queries: Vec<QueryRecall>,
    /// Queries with no ground truth in the catalog; not counted.
    pub skipped: usize,
    pub mean_recall: f32,
}

/// Group `associations` by query and measure recall@k of `ranker` on each.
///
/// Ground-truth ids missing from the catalog are ignored; a query left with
/// none is skipped. Queries are evaluated in sorted order.
pub async fn mean_recall_at_k(
    ranker: &HybridRanker,
    associations: &[TrainingAssociation],
    k: usize,
) -> AssessResult<RecallReport> {
    let in_catalog: HashSet<&str> = ranker.catalog().iter().map(|i| i.id.as_str()).collect();

    let mut grouped: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for assoc in associations {
        grouped
            .entry(assoc.query_text.as_str())
            .or_default()
            .insert(assoc.item_id.as_str());
    }

    let mut queries = Vec::new();
    let mut skipped = 0;
    for (query, truth) in grouped {
        let relevant: BTreeSet<&str> = truth
            .into_iter()
            .filter(|id| in_catalog.contains(id))
            .collect();
        if relevant.is_empty() {
            skipped += 1;
            continue;
        }

        let recs = ranker.recommend(query, k).await?;
        let found = recs
            .iter()
            .filter(|r| relevant.contains(r.item.id.as_str()))
            .count();
        let recall = found as f32 / relevant.len() as f32;
        debug!(found, relevant = relevant.len(), recall, "Evaluated query");
        queries.push(QueryRecall {
            query: query.to_string(),
            relevant: relevant.len(),
            found,
            recall,
        });
    }

    let mean_recall = if queries.is_empty() {
        0.0
    } else {
        queries.iter().map(|q| q.recall).sum::<f32>() / queries.len() as f32
    };
    info!(k, queries = queries.len(), skipped, mean_recall, "Recall evaluation done");

    Ok(RecallReport {
        k,
        queries,
        skipped,
        mean_recall,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use assessrank_core::CatalogItem;

    fn item(id: &str, name: &str) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            categories: Vec::new(),
            duration_minutes: 30,
            is_adaptive: false,
            is_remote: true,
        }
    }

    #[tokio::test]
    async fn recall_counts_only_catalog_items() {
        let ranker = HybridRanker::builder()
            .catalog(vec![
                item("python", "Python Programming"),
                item("excel", "Microsoft Excel"),
                item("typing", "Typing Speed"),
            ])
            .build()
            .await
            .unwrap();

        let labels = vec![
            TrainingAssociation::new("python programming", "python"),
            TrainingAssociation::new("python programming", "retired-item"),
            TrainingAssociation::new("excel and typing", "excel"),
            TrainingAssociation::new("excel and typing", "typing"),
            TrainingAssociation::new("legacy", "retired-item"),
        ];
        let report = mean_recall_at_k(&ranker, &labels, 1).await.unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.queries.len(), 2);
        let excel = &report.queries[0];
        assert_eq!(excel.query, "excel and typing");
        assert_eq!((excel.relevant, excel.found), (2, 1));
        let python = &report.queries[1];
        assert_eq!((python.relevant, python.found), (1, 1));
        assert!((report.mean_recall - 0.75).abs() < 1e-6);
    }

    #[tokio::test]
    async fn empty_labels() {
        let ranker = HybridRanker::builder()
            .catalog(vec![item("a", "Alpha")])
            .build()
            .await
            .unwrap();
        let report = mean_recall_at_k(&ranker, &[], 10).await.unwrap();
        assert_eq!(report.mean_recall, 0.0);
        assert!(report.queries.is_empty());
    }
}
