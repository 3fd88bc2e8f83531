//! HTTP service for assessrank: `/`, `/health` and `POST /recommend`
//! in front of a [`assessrank_ranker::HybridRanker`] that may still be
//! building in the background.

pub mod api;
pub mod middleware;
pub mod server;

pub use api::{ApiError, AssessmentRecommendation, RecommendRequest, RecommendResponse};
pub use middleware::{RequestId, REQUEST_ID_HEADER};
pub use server::{EngineSlot, GatewayServer, SERVICE_NAME};
