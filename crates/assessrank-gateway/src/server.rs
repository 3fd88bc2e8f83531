use crate::api::{ApiError, AssessmentRecommendation, RecommendRequest, RecommendResponse};
use crate::middleware::{request_id_middleware, RequestId};
use assessrank_ranker::HybridRanker;
use axum::{
    extract::{Extension, State},
    middleware as axum_mw,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Service name reported by `/` and `/health`.
pub const SERVICE_NAME: &str = "assessrank";

/// Slot the engine is published into once its background build finishes.
pub type EngineSlot = Arc<OnceCell<Arc<HybridRanker>>>;

/// Shared application state.
pub struct AppState {
    /// Filled once the engine build completes.
    pub engine: EngineSlot,
}

/// The HTTP front of the recommendation engine.
pub struct GatewayServer;

impl GatewayServer {
    /// Build the router around an engine slot that may still be empty.
    ///
    /// Until the slot is filled, `/recommend` answers 503 while `/` and
    /// `/health` stay available.
    pub fn build(engine: EngineSlot) -> Router {
        let state = Arc::new(AppState { engine });

        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .route("/recommend", post(recommend_handler))
            .with_state(state)
            .layer(axum_mw::from_fn(request_id_middleware))
    }

    /// Build the router around an already-built engine.
    pub fn with_engine(ranker: Arc<HybridRanker>) -> Router {
        Self::build(Arc::new(OnceCell::new_with(Some(ranker))))
    }
}

async fn root_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let ready = state.engine.initialized();
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "engine_ready": ready,
        "endpoints": {
            "health": "GET /health",
            "recommend": "POST /recommend",
        },
    }))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME,
    }))
}

async fn recommend_handler(
    State(state): State<Arc<AppState>>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(ApiError::Invalid("Query cannot be empty".to_string()));
    }
    let Some(ranker) = state.engine.get() else {
        warn!(request_id = %request_id, "Recommend called before engine was ready");
        return Err(ApiError::NotReady);
    };

    info!(request_id = %request_id, top_k = request.top_k, "Recommend request");
    let recommendations: Vec<AssessmentRecommendation> = ranker
        .recommend(query, request.top_k)
        .await?
        .into_iter()
        .map(AssessmentRecommendation::from)
        .collect();

    Ok(Json(RecommendResponse {
        query: query.to_string(),
        count: recommendations.len(),
        recommendations,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use assessrank_core::CatalogItem;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn item(id: &str, name: &str) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{name} assessment"),
            categories: vec!["Knowledge & Skills".to_string()],
            duration_minutes: 20,
            is_adaptive: false,
            is_remote: true,
        }
    }

    async fn ready_router() -> Router {
        let ranker = HybridRanker::builder()
            .catalog(vec![
                item("https://catalog.test/java/", "Core Java"),
                item("https://catalog.test/python/", "Python"),
                item("https://catalog.test/sql/", "SQL Server"),
            ])
            .build()
            .await
            .unwrap();
        GatewayServer::with_engine(Arc::new(ranker))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_has_request_id() {
        let app = GatewayServer::build(Arc::new(OnceCell::new()));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], SERVICE_NAME);
    }

    #[tokio::test]
    async fn test_root_reports_readiness() {
        let app = GatewayServer::build(Arc::new(OnceCell::new()));
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["engine_ready"], false);

        let response = ready_router()
            .await
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["engine_ready"], true);
    }

    #[tokio::test]
    async fn test_recommend_before_ready_is_503() {
        let app = GatewayServer::build(Arc::new(OnceCell::new()));
        let response = app
            .oneshot(post_json("/recommend", serde_json::json!({"query": "java"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_recommend_ok() {
        let response = ready_router()
            .await
            .oneshot(post_json(
                "/recommend",
                serde_json::json!({"query": "  core java  ", "top_k": 2}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: RecommendResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(body.query, "core java");
        assert_eq!(body.count, 2);
        assert_eq!(body.recommendations[0].assessment_name, "Core Java");
        assert_eq!(body.recommendations[0].remote_support, "Yes");
    }

    #[tokio::test]
    async fn test_blank_query_is_422() {
        let response = ready_router()
            .await
            .oneshot(post_json("/recommend", serde_json::json!({"query": "   "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_top_k_out_of_range_is_422() {
        for top_k in [0, 21] {
            let response = ready_router()
                .await
                .oneshot(post_json(
                    "/recommend",
                    serde_json::json!({"query": "java", "top_k": top_k}),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }
}
