use crate::rules::{apply_rules, fired_rules};
use crate::signals::{soft_boost, tech_boost, SignalBreakdown};
use crate::state::{EngineState, STATE_FORMAT_VERSION};
use crate::weights::RankerConfig;
use assessrank_core::{
    AssessError, AssessResult, CatalogItem, ExtractedRequirements, ScoredRecommendation,
    TrainingAssociation,
};
use assessrank_extract::{extract_or_empty, NoopExtractor, RequirementExtractor};
use assessrank_index::{EmbeddingProvider, LexicalIndex, PatternModel, SemanticIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One ranked item together with the signals behind its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub item: CatalogItem,
    pub signals: SignalBreakdown,
}

/// The hybrid ranking engine.
///
/// Holds the catalog and every index built from it. Nothing is mutated
/// after construction, so one instance can be shared as
/// `Arc<HybridRanker>` across tasks without locking.
pub struct HybridRanker {
    catalog: Vec<CatalogItem>,
    lexical: LexicalIndex,
    semantic: SemanticIndex,
    patterns: PatternModel,
    extractor: Arc<dyn RequirementExtractor>,
    config: RankerConfig,
}

impl std::fmt::Debug for HybridRanker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridRanker")
            .field("catalog_len", &self.catalog.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HybridRanker {
    /// Start configuring a ranker.
    pub fn builder() -> RankerBuilder {
        RankerBuilder::default()
    }

    /// The top `top_k` catalog items for `query`, best first.
    ///
    /// `top_k` must be in `1..=max_top_k`. Extraction failures are absorbed
    /// (the query is ranked with empty requirements), so this only fails on
    /// an invalid `top_k`.
    pub async fn recommend(
        &self,
        query: &str,
        top_k: usize,
    ) -> AssessResult<Vec<ScoredRecommendation>> {
        Ok(self
            .explain(query, top_k)
            .await?
            .into_iter()
            .map(|e| ScoredRecommendation {
                item: e.item,
                relevance_score: e.signals.composite,
            })
            .collect())
    }

    /// Same ranking as [`recommend`](Self::recommend), with every signal
    /// broken out.
    pub async fn explain(&self, query: &str, top_k: usize) -> AssessResult<Vec<Explanation>> {
        self.check_top_k(top_k)?;
        let started = Instant::now();
        let reqs = extract_or_empty(self.extractor.as_ref(), query).await;
        let ranked = self.rank(query, &reqs, top_k).await;
        info!(
            top_k,
            results = ranked.len(),
            technical_skills = reqs.technical_skills.len(),
            keywords = reqs.keywords.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ranked query"
        );
        Ok(ranked)
    }

    /// Rank with already-extracted requirements, skipping the extractor.
    pub async fn explain_with(
        &self,
        query: &str,
        reqs: &ExtractedRequirements,
        top_k: usize,
    ) -> AssessResult<Vec<Explanation>> {
        self.check_top_k(top_k)?;
        Ok(self.rank(query, reqs, top_k).await)
    }

    fn check_top_k(&self, top_k: usize) -> AssessResult<()> {
        let max = self.config.max_top_k;
        if top_k == 0 || top_k > max {
            return Err(AssessError::InvalidRequest(format!(
                "top_k must be between 1 and {max}, got {top_k}"
            )));
        }
        Ok(())
    }

    async fn rank(
        &self,
        query: &str,
        reqs: &ExtractedRequirements,
        top_k: usize,
    ) -> Vec<Explanation> {
        if self.catalog.is_empty() {
            return Vec::new();
        }

        let enriched = enrich_query(query, &reqs.keywords);
        let tfidf = self.lexical.scores(&enriched);
        let semantic = self.semantic.scores(&enriched).await;

        let query_lower = query.to_lowercase();
        let fired = fired_rules(&self.config.rules, &query_lower);
        debug!(fired_rules = fired.len(), enriched = %enriched, "Scoring catalog");

        let weights = &self.config.weights;
        let skill_boosts = &self.config.skill_boosts;
        let mut scored: Vec<(usize, SignalBreakdown)> = self
            .catalog
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let name_lower = item.name.to_lowercase();
                let description_lower = item.description.to_lowercase();
                let text_lower = format!("{name_lower} {description_lower}");

                let mut signals = SignalBreakdown {
                    tfidf: tfidf.get(idx).copied().unwrap_or(0.0),
                    semantic: semantic.get(idx).copied().unwrap_or(0.0),
                    training: self.patterns.boost(&item.id, &query_lower),
                    technical: tech_boost(
                        &reqs.technical_skills,
                        &name_lower,
                        &description_lower,
                        skill_boosts,
                    ),
                    soft: soft_boost(
                        &reqs.soft_skills,
                        &name_lower,
                        &description_lower,
                        skill_boosts,
                    ),
                    ..SignalBreakdown::default()
                }
                .with_rules(apply_rules(&fired, item, &text_lower));
                signals.composite = weights.composite(&signals);
                (idx, signals)
            })
            .collect();

        // stable: equal scores keep catalog order
        scored.sort_by(|a, b| b.1.composite.total_cmp(&a.1.composite));
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(idx, signals)| Explanation {
                item: self.catalog[idx].clone(),
                signals,
            })
            .collect()
    }

    /// The cleaned catalog, in ranking tie-break order.
    pub fn catalog(&self) -> &[CatalogItem] {
        &self.catalog
    }

    /// Number of catalog items.
    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    /// Whether semantic scores can be non-zero.
    pub fn semantic_enabled(&self) -> bool {
        self.semantic.is_enabled()
    }

    /// Weights, rules and limits the engine ranks with.
    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Snapshot the built indexes for [`import_state`](Self::import_state).
    pub fn export_state(&self) -> EngineState {
        EngineState {
            format_version: STATE_FORMAT_VERSION,
            exported_at: chrono::Utc::now(),
            catalog: self.catalog.clone(),
            lexical: self.lexical.clone(),
            semantic: self.semantic.snapshot(),
            patterns: self.patterns.clone(),
        }
    }

    /// Rebuild a ranker from an exported state without re-indexing.
    ///
    /// `embedder` must produce vectors of the snapshot's dimension; without
    /// one, semantic scoring is disabled. The lexical and pattern sections
    /// of `config` are ignored in favour of the snapshot's own.
    pub fn import_state(
        state: EngineState,
        extractor: Arc<dyn RequirementExtractor>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        config: RankerConfig,
    ) -> AssessResult<Self> {
        state.validate()?;
        let semantic = SemanticIndex::from_snapshot(state.semantic, embedder)?;
        info!(
            items = state.catalog.len(),
            vocabulary = state.lexical.vocabulary_len(),
            semantic = semantic.is_enabled(),
            exported_at = %state.exported_at,
            "Engine state imported"
        );
        Ok(Self {
            catalog: state.catalog,
            lexical: state.lexical,
            semantic,
            patterns: state.patterns,
            extractor,
            config,
        })
    }
}

/// Raw query followed by the extracted keywords.
fn enrich_query(query: &str, keywords: &[String]) -> String {
    if keywords.is_empty() {
        return query.to_string();
    }
    format!("{query} {}", keywords.join(" "))
}

/// Collects the inputs of a [`HybridRanker`] and performs the one-off
/// index builds.
#[derive(Default)]
pub struct RankerBuilder {
    catalog: Vec<CatalogItem>,
    training: Vec<TrainingAssociation>,
    extractor: Option<Arc<dyn RequirementExtractor>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    config: RankerConfig,
}

impl RankerBuilder {
    /// Cleaned catalog; ids must be unique.
    pub fn catalog(mut self, items: Vec<CatalogItem>) -> Self {
        self.catalog = items;
        self
    }

    /// Historical associations to learn patterns from.
    pub fn training(mut self, associations: Vec<TrainingAssociation>) -> Self {
        self.training = associations;
        self
    }

    /// Defaults to [`NoopExtractor`].
    pub fn extractor(mut self, extractor: Arc<dyn RequirementExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Without an embedder the semantic signal is disabled.
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Replace the default [`RankerConfig`].
    pub fn config(mut self, config: RankerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build every index. Errors here are fatal for the engine.
    pub async fn build(self) -> AssessResult<HybridRanker> {
        let Self {
            catalog,
            training,
            extractor,
            embedder,
            config,
        } = self;

        if config.max_top_k == 0 {
            return Err(AssessError::Config("max_top_k must be at least 1".into()));
        }

        let mut seen = HashSet::with_capacity(catalog.len());
        if let Some(dup) = catalog.iter().find(|i| !seen.insert(i.id.as_str())) {
            return Err(AssessError::Catalog(format!("Duplicate item id '{}'", dup.id)));
        }

        let lexical = LexicalIndex::build(&catalog, config.lexical.clone())?;
        let semantic = match embedder {
            Some(provider) => SemanticIndex::build(&catalog, provider).await?,
            None => SemanticIndex::disabled(&catalog),
        };
        let patterns = PatternModel::learn(&training, config.patterns.clone());

        let unknown = training
            .iter()
            .filter(|a| !seen.contains(a.item_id.as_str()))
            .count();
        if unknown > 0 {
            warn!(
                unknown,
                total = training.len(),
                "Training associations reference items missing from the catalog"
            );
        }

        info!(
            items = catalog.len(),
            vocabulary = lexical.vocabulary_len(),
            semantic = semantic.is_enabled(),
            pattern_items = patterns.item_count(),
            pattern_keywords = patterns.keyword_count(),
            "Hybrid ranker ready"
        );

        Ok(HybridRanker {
            catalog,
            lexical,
            semantic,
            patterns,
            extractor: extractor.unwrap_or_else(|| Arc::new(NoopExtractor)),
            config,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use assessrank_index::LocalEmbedding;
    use async_trait::async_trait;

    struct FailingExtractor;

    #[async_trait]
    impl RequirementExtractor for FailingExtractor {
        async fn extract(&self, _query: &str) -> AssessResult<ExtractedRequirements> {
            Err(AssessError::Extraction("model unavailable".into()))
        }
    }

    struct FixedExtractor(ExtractedRequirements);

    #[async_trait]
    impl RequirementExtractor for FixedExtractor {
        async fn extract(&self, _query: &str) -> AssessResult<ExtractedRequirements> {
            Ok(self.0.clone())
        }
    }

    fn item(id: &str, name: &str, categories: &[&str], duration: u32, description: &str) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            duration_minutes: duration,
            is_adaptive: false,
            is_remote: true,
        }
    }

    fn catalog() -> Vec<CatalogItem> {
        vec![
            item("java", "Core Java (Entry Level)", &["Knowledge & Skills"], 30, "Java syntax and OOP"),
            item("opq", "Occupational Personality Questionnaire", &["Personality & Behavior"], 25, "Workplace behaviour"),
            item("sales", "Sales Representative Solution", &["Competencies"], 60, "Interpersonal communication in sales"),
            item("verbal", "Verbal Reasoning", &["Ability & Aptitude"], 19, "Reading comprehension"),
        ]
    }

    async fn ranker() -> HybridRanker {
        HybridRanker::builder()
            .catalog(catalog())
            .embedder(Arc::new(LocalEmbedding::default()))
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn top_k_bounds() {
        let r = ranker().await;
        assert!(matches!(r.recommend("java", 0).await, Err(AssessError::InvalidRequest(_))));
        assert!(matches!(r.recommend("java", 21).await, Err(AssessError::InvalidRequest(_))));
        assert_eq!(r.recommend("java", 20).await.unwrap().len(), 4);
        assert_eq!(r.recommend("java", 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn java_query_prefers_java_item() {
        let r = ranker().await;
        let recs = r.recommend("Java developer", 3).await.unwrap();
        assert_eq!(recs[0].item.id, "java");
    }

    #[tokio::test]
    async fn extraction_failure_matches_empty_requirements() {
        let failing = HybridRanker::builder()
            .catalog(catalog())
            .extractor(Arc::new(FailingExtractor))
            .build()
            .await
            .unwrap();
        let noop = HybridRanker::builder().catalog(catalog()).build().await.unwrap();
        assert_eq!(
            failing.recommend("sales role, 1 hour", 4).await.unwrap(),
            noop.recommend("sales role, 1 hour", 4).await.unwrap()
        );
    }

    #[tokio::test]
    async fn technical_skills_feed_tech_boost() {
        let reqs = ExtractedRequirements {
            technical_skills: ["java".to_string()].into_iter().collect(),
            ..ExtractedRequirements::empty()
        };
        let r = HybridRanker::builder()
            .catalog(catalog())
            .extractor(Arc::new(FixedExtractor(reqs)))
            .build()
            .await
            .unwrap();
        let explained = r.explain("backend hire", 4).await.unwrap();
        let java = explained.iter().find(|e| e.item.id == "java").unwrap();
        assert_eq!(java.signals.technical, 0.5);
        assert_eq!(explained[0].item.id, "java");
    }

    #[tokio::test]
    async fn explain_composite_matches_recommend() {
        let r = ranker().await;
        let explained = r.explain("personality for a manager", 4).await.unwrap();
        let recs = r.recommend("personality for a manager", 4).await.unwrap();
        for (e, rec) in explained.iter().zip(&recs) {
            assert_eq!(e.item.id, rec.item.id);
            assert_eq!(e.signals.composite, rec.relevance_score);
            assert_eq!(e.signals.composite, r.config().weights.composite(&e.signals));
        }
        let opq = explained.iter().find(|e| e.item.id == "opq").unwrap();
        assert!((opq.signals.type_match - 0.55).abs() < 1e-6);
    }

    #[tokio::test]
    async fn duplicate_ids_rejected() {
        let mut items = catalog();
        items.push(items[0].clone());
        let result = HybridRanker::builder().catalog(items).build().await;
        assert!(matches!(result, Err(AssessError::Catalog(_))));
    }

    #[tokio::test]
    async fn ties_keep_catalog_order() {
        let items = vec![
            item("a", "Alpha", &[], 30, ""),
            item("b", "Bravo", &[], 30, ""),
            item("c", "Charlie", &[], 30, ""),
        ];
        let r = HybridRanker::builder().catalog(items).build().await.unwrap();
        let recs = r.recommend("zzz", 3).await.unwrap();
        let ids: Vec<&str> = recs.iter().map(|r| r.item.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(recs.iter().all(|r| r.relevance_score == 0.0));
    }

    #[test]
    fn enrich_query_appends_keywords() {
        assert_eq!(enrich_query("java", &[]), "java");
        assert_eq!(
            enrich_query("java", &["spring".into(), "backend".into()]),
            "java spring backend"
        );
    }

    #[test]
    fn ranker_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HybridRanker>();
    }
}
