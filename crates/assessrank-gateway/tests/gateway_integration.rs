#![allow(clippy::unwrap_used, clippy::expect_used)]

use assessrank_core::CatalogItem;
use assessrank_gateway::{GatewayServer, RecommendResponse, REQUEST_ID_HEADER};
use assessrank_index::LocalEmbedding;
use assessrank_ranker::HybridRanker;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::OnceCell;

fn catalog() -> Vec<CatalogItem> {
    [
        ("Core Java (Entry Level)", "Knowledge & Skills", 30),
        ("Python (New)", "Knowledge & Skills", 11),
        ("Verify Numerical Reasoning", "Ability & Aptitude", 18),
        ("Occupational Personality Questionnaire", "Personality & Behavior", 25),
        ("Enterprise Leadership Report", "Competencies", 60),
    ]
    .iter()
    .enumerate()
    .map(|(i, (name, category, duration))| CatalogItem {
        id: format!("https://catalog.test/products/item-{i}/"),
        name: name.to_string(),
        description: format!("{name} for hiring. ").repeat(40),
        categories: vec![category.to_string()],
        duration_minutes: *duration,
        is_adaptive: i % 2 == 0,
        is_remote: true,
    })
    .collect()
}

async fn build_ranker() -> Arc<HybridRanker> {
    Arc::new(
        HybridRanker::builder()
            .catalog(catalog())
            .embedder(Arc::new(LocalEmbedding::default()))
            .build()
            .await
            .unwrap(),
    )
}

/// Helper: serve the router on a random port, returning the base URL.
async fn start_test_server(slot: Arc<OnceCell<Arc<HybridRanker>>>) -> String {
    let app = GatewayServer::build(slot);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    format!("http://127.0.0.1:{}", addr.port())
}

#[tokio::test]
async fn test_health_endpoint() {
    let base = start_test_server(Arc::new(OnceCell::new())).await;
    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().get(&REQUEST_ID_HEADER).is_some());
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_recommend_after_late_initialization() {
    let slot = Arc::new(OnceCell::new());
    let base = start_test_server(slot.clone()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/recommend"))
        .json(&serde_json::json!({"query": "java developer"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);

    slot.set(build_ranker().await).unwrap();

    let resp = client
        .post(format!("{base}/recommend"))
        .json(&serde_json::json!({"query": "java developer", "top_k": 3}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: RecommendResponse = resp.json().await.unwrap();
    assert_eq!(body.count, 3);
    assert_eq!(body.recommendations.len(), 3);
    assert_eq!(body.recommendations[0].assessment_name, "Core Java (Entry Level)");
    assert!(body
        .recommendations
        .iter()
        .all(|r| r.description.chars().count() <= 500));
    assert!(body
        .recommendations
        .windows(2)
        .all(|w| w[0].relevance_score >= w[1].relevance_score));
}

#[tokio::test]
async fn test_default_top_k_caps_at_catalog_size() {
    let slot = Arc::new(OnceCell::new_with(Some(build_ranker().await)));
    let base = start_test_server(slot).await;
    let body: RecommendResponse = reqwest::Client::new()
        .post(format!("{base}/recommend"))
        .json(&serde_json::json!({"query": "reasoning test"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body.count, 5);
}

#[tokio::test]
async fn test_invalid_requests_are_422() {
    let slot = Arc::new(OnceCell::new_with(Some(build_ranker().await)));
    let base = start_test_server(slot).await;
    let client = reqwest::Client::new();

    for payload in [
        serde_json::json!({"query": ""}),
        serde_json::json!({"query": "java", "top_k": 0}),
        serde_json::json!({"query": "java", "top_k": 50}),
        serde_json::json!({"top_k": 5}),
    ] {
        let resp = client
            .post(format!("{base}/recommend"))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 422, "payload {payload}");
    }
}
