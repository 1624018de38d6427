//! Task polling routes.
//!
//! - GET /projects/{project_id}/tasks: recent jobs for a project
//! - GET /projects/{project_id}/tasks/{task_id}: one job, after the liveness check

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slidegen_core::{Job, JobId, JobKind, JobStatus};
use utoipa::ToSchema;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: i64 = 20;
const MAX_LIST_LIMIT: i64 = 100;

/// A job record as clients see it.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize))]
pub struct TaskView {
    pub task_id: String,
    pub task_type: JobKind,
    pub status: JobStatus,
    #[schema(value_type = Object)]
    pub progress: serde_json::Value,
    pub error_message: Option<String>,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = Option<String>)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Job> for TaskView {
    fn from(job: Job) -> Self {
        Self {
            task_id: job.id.into_inner(),
            task_type: job.kind,
            status: job.status,
            progress: job.progress,
            error_message: job.error_message,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

/// Body of every `202 Accepted` submission response.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize))]
pub struct TaskAccepted {
    pub task_id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,
}

pub(crate) fn accepted(job: Job, total_pages: Option<usize>) -> (StatusCode, Json<TaskAccepted>) {
    (
        StatusCode::ACCEPTED,
        Json(TaskAccepted {
            task_id: job.id.into_inner(),
            status: job.status,
            total_pages,
        }),
    )
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

/// GET /api/projects/{project_id}/tasks
///
/// Reads records as stored; the liveness check only runs on single polls.
async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<TaskView>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    let jobs = state.jobs.list(&project_id, limit).await?;
    Ok(Json(jobs.into_iter().map(TaskView::from).collect()))
}

/// GET /api/projects/{project_id}/tasks/{task_id}
async fn get_task(
    State(state): State<Arc<AppState>>,
    Path((project_id, task_id)): Path<(String, String)>,
) -> ApiResult<Json<TaskView>> {
    let job_id = JobId::from(task_id.as_str());
    match state.jobs.poll(&job_id).await? {
        Some(job) if job.owner_id == project_id => Ok(Json(job.into())),
        _ => Err(ApiError::TaskNotFound(task_id)),
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects/{project_id}/tasks", get(list_tasks))
        .route("/projects/{project_id}/tasks/{task_id}", get(get_task))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_env;
    use axum::body::Body;
    use axum::http::Request;
    use slidegen_core::{Progress, ORPHAN_ERROR_MESSAGE};
    use slidegen_db::Database;
    use tower::ServiceExt;

    async fn app() -> (Router, Arc<AppState>) {
        let db = Database::new_in_memory().await.unwrap();
        let state = AppState::new(test_env(db), 2);
        (router().with_state(Arc::clone(&state)), state)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_poll_fails_orphaned_record() {
        let (app, state) = app().await;
        let job = state
            .db
            .create_job(JobKind::GenerateImages, "proj", &Progress::new(3))
            .await
            .unwrap();
        state.db.mark_processing(&job.id).await.unwrap();

        let (status, body) = get_json(app, &format!("/projects/proj/tasks/{}", job.id)).await;
        assert_eq!(status, StatusCode::OK);
        let view: TaskView = serde_json::from_value(body).unwrap();
        assert_eq!(view.status, JobStatus::Failed);
        assert_eq!(view.error_message.as_deref(), Some(ORPHAN_ERROR_MESSAGE));
        assert!(view.completed_at.is_some());
        assert_eq!(view.progress["total"], 3);
    }

    #[tokio::test]
    async fn test_poll_other_project_is_not_found() {
        let (app, state) = app().await;
        let job = state
            .db
            .create_job(JobKind::GenerateOutline, "proj", &Progress::new(1))
            .await
            .unwrap();

        let (status, body) = get_json(app, &format!("/projects/other/tasks/{}", job.id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Task not found");
    }

    #[tokio::test]
    async fn test_list_does_not_touch_records() {
        let (app, state) = app().await;
        for _ in 0..3 {
            state
                .db
                .create_job(JobKind::ExportPptx, "proj", &Progress::new(2))
                .await
                .unwrap();
        }

        let (status, body) = get_json(app, "/projects/proj/tasks?limit=2").await;
        assert_eq!(status, StatusCode::OK);
        let views: Vec<TaskView> = serde_json::from_value(body).unwrap();
        assert_eq!(views.len(), 2);
        assert!(views.iter().all(|v| v.status == JobStatus::Pending));
        assert!(views.iter().all(|v| v.task_type == JobKind::ExportPptx));
    }
}
