use assessrank_core::{support_label, AssessError, ScoredRecommendation};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Descriptions in responses are cut to this many characters.
pub const DESCRIPTION_CHARS: usize = 500;

fn default_top_k() -> usize {
    10
}

/// Body of `POST /recommend`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendRequest {
    /// Free-text job description or hiring query.
    pub query: String,
    /// Number of results, 1 to 20.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

/// One recommended assessment as the service returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecommendation {
    pub assessment_name: String,
    pub assessment_url: String,
    pub description: String,
    pub duration: u32,
    pub test_type: Vec<String>,
    pub adaptive_support: String,
    pub remote_support: String,
    pub relevance_score: f32,
}

impl From<ScoredRecommendation> for AssessmentRecommendation {
    fn from(rec: ScoredRecommendation) -> Self {
        let item = rec.item;
        Self {
            description: item.description_prefix(DESCRIPTION_CHARS).to_string(),
            adaptive_support: support_label(item.is_adaptive).to_string(),
            remote_support: support_label(item.is_remote).to_string(),
            assessment_name: item.name,
            assessment_url: item.id,
            duration: item.duration_minutes,
            test_type: item.categories,
            relevance_score: rec.relevance_score,
        }
    }
}

/// Body of a successful `POST /recommend`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub query: String,
    pub recommendations: Vec<AssessmentRecommendation>,
    pub count: usize,
}

/// Errors the service reports to clients.
#[derive(Debug)]
pub enum ApiError {
    /// The engine is still initializing.
    NotReady,
    /// The request is well-formed JSON but semantically invalid.
    Invalid(String),
    /// Any other engine failure.
    Internal(String),
}

impl From<AssessError> for ApiError {
    fn from(err: AssessError) -> Self {
        match err {
            AssessError::InvalidRequest(msg) => ApiError::Invalid(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotReady => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Recommendation engine not initialized".to_string(),
            ),
            ApiError::Invalid(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Recommendation failed: {msg}"),
            ),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
