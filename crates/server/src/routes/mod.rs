//! API route handlers for the slidegen server.

pub mod export;
pub mod generation;
pub mod health;
pub mod jobs;
pub mod metrics;
pub mod openapi;
pub mod style;
pub mod tasks;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check
/// - GET  /api/openapi.json - OpenAPI document
/// - GET  /api/jobs - Jobs held by the scheduler
/// - GET  /api/projects/{project_id}/tasks - Recent tasks for a project
/// - GET  /api/projects/{project_id}/tasks/{task_id} - Poll one task
/// - POST /api/projects/{project_id}/generate/outline
/// - POST /api/projects/{project_id}/generate/descriptions
/// - POST /api/projects/{project_id}/generate/images
/// - POST /api/projects/{project_id}/export/pptx
/// - POST /api/projects/{project_id}/export/editable-pptx
/// - POST /api/projects/{project_id}/style/recommendations
/// - POST /api/projects/{project_id}/style/recommendations/{rec_id}/previews
/// - GET  /metrics - Prometheus metrics (no /api prefix)
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", openapi::router())
        .nest("/api", jobs::router())
        .nest("/api", tasks::router())
        .nest("/api", generation::router())
        .nest("/api", export::router())
        .nest("/api", style::router())
        .merge(metrics::router())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_env;

    #[tokio::test]
    async fn test_api_routes_creation() {
        let db = slidegen_db::Database::new_in_memory().await.expect("in-memory DB");
        let state = AppState::new(test_env(db), 1);
        let _router = api_routes(state);
    }
}
