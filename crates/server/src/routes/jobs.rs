//! Scheduler registry route.
//!
//! - GET /jobs: jobs the scheduler currently holds, queued or running

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use slidegen_server_jobs::ActiveJob;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveJobsResponse {
    pub capacity: usize,
    pub available_slots: usize,
    pub jobs: Vec<ActiveJob>,
}

/// GET /api/jobs: list all active jobs.
async fn list_active(State(state): State<Arc<AppState>>) -> Json<ActiveJobsResponse> {
    let scheduler = state.scheduler();
    let mut jobs = scheduler.active_jobs();
    jobs.sort_by_key(|j| j.submitted_at);
    Json(ActiveJobsResponse {
        capacity: scheduler.capacity(),
        available_slots: scheduler.available_permits(),
        jobs,
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/jobs", get(list_active))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_env;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use slidegen_core::{JobKind, Progress};
    use slidegen_db::Database;
    use tokio::sync::oneshot;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_list_jobs_shows_running_entry() {
        let db = Database::new_in_memory().await.unwrap();
        let state = AppState::new(test_env(db), 2);
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let job = state
            .jobs
            .launch(
                JobKind::GenerateImages,
                "proj",
                Progress::new(1),
                state.env.clone(),
                move |_ctx| async move {
                    let _ = started_tx.send(());
                    let _ = release_rx.await;
                    Ok::<(), String>(())
                },
            )
            .await
            .unwrap();
        started_rx.await.unwrap();

        let app = router().with_state(Arc::clone(&state));
        let response = app
            .oneshot(Request::builder().uri("/jobs").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["capacity"], 2);
        assert_eq!(json["availableSlots"], 1);
        assert_eq!(json["jobs"][0]["jobId"], job.id.as_str());
        assert_eq!(json["jobs"][0]["state"], "running");
        assert_eq!(json["jobs"][0]["kind"], "GENERATE_IMAGES");
        let _ = release_tx.send(());
    }
}
