//! OpenAPI document for the wire types.
//!
//! - GET /openapi.json

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(title = "slidegen", description = "Background generation and export jobs for slide decks"),
    components(schemas(
        crate::error::ErrorResponse,
        super::health::HealthResponse,
        super::jobs::ActiveJobsResponse,
        super::tasks::TaskView,
        super::tasks::TaskAccepted,
        super::generation::OutlineRequest,
        super::generation::DescriptionsRequest,
        super::generation::ImagesRequest,
        super::export::ExportRequest,
        super::export::ExportPageRequest,
        super::style::RecommendationRequest,
        super::style::PreviewRequest,
        crate::tasks::PageSpec,
        crate::tasks::style::SamplePages,
        slidegen_server_jobs::ActiveJob,
        slidegen_server_jobs::SlotState,
        slidegen_core::JobKind,
        slidegen_core::JobStatus,
    ))
)]
pub struct ApiDoc;

/// GET /api/openapi.json
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/openapi.json", get(openapi_json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_task_schemas() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let schemas = &doc["components"]["schemas"];
        assert!(schemas.get("TaskView").is_some());
        assert!(schemas.get("ErrorResponse").is_some());
        assert_eq!(doc["info"]["title"], "slidegen");
    }
}
