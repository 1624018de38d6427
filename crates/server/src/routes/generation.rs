//! Generation submission routes.
//!
//! - POST /projects/{project_id}/generate/outline
//! - POST /projects/{project_id}/generate/descriptions
//! - POST /projects/{project_id}/generate/images
//!
//! Arguments are validated before any job record exists.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use slidegen_core::validation::{require_non_empty, require_unique_ids, validate_concurrency};
use slidegen_core::{JobKind, Progress, ValidationError};
use utoipa::ToSchema;

use super::tasks::{accepted, TaskAccepted};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::tasks::descriptions::{generate_descriptions, DescriptionArgs};
use crate::tasks::images::{generate_images, ImageArgs};
use crate::tasks::outline::{generate_outline, OutlineArgs};
use crate::tasks::PageSpec;

type Accepted = (StatusCode, Json<TaskAccepted>);

#[derive(Debug, Deserialize, ToSchema)]
pub struct OutlineRequest {
    pub idea: String,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DescriptionsRequest {
    pub pages: Vec<PageSpec>,
    pub language: Option<String>,
    pub max_workers: Option<i64>,
    pub extra_requirements: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImagesRequest {
    pub pages: Vec<PageSpec>,
    pub language: Option<String>,
    pub max_workers: Option<i64>,
    pub aspect_ratio: Option<String>,
    pub resolution: Option<String>,
    /// `/files/...` url of an uploaded template image.
    pub template_url: Option<String>,
    pub extra_requirements: Option<String>,
}

fn workers(requested: Option<i64>, default: usize) -> Result<usize, ValidationError> {
    validate_concurrency("max_workers", requested.unwrap_or(default as i64))
}

/// POST /api/projects/{project_id}/generate/outline
async fn submit_outline(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Json(req): Json<OutlineRequest>,
) -> ApiResult<Accepted> {
    if req.idea.trim().is_empty() {
        return Err(ValidationError::Empty("idea").into());
    }
    let args = OutlineArgs {
        idea: req.idea,
        language: req.language.unwrap_or_else(|| state.env.settings.output_language.clone()),
    };

    let job = state
        .jobs
        .launch(
            JobKind::GenerateOutline,
            &project_id,
            Progress::new(1),
            state.env.clone(),
            move |ctx| generate_outline(ctx, args),
        )
        .await?;
    Ok(accepted(job, None))
}

/// POST /api/projects/{project_id}/generate/descriptions
async fn submit_descriptions(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Json(req): Json<DescriptionsRequest>,
) -> ApiResult<Accepted> {
    require_non_empty("pages", &req.pages)?;
    require_unique_ids("page_id", req.pages.iter().map(|p| p.page_id.as_str()))?;
    let max_workers = workers(req.max_workers, state.env.settings.description_workers)?;
    let total = req.pages.len();
    let args = DescriptionArgs {
        pages: req.pages,
        language: req.language.unwrap_or_else(|| state.env.settings.output_language.clone()),
        max_workers,
        extra_requirements: req.extra_requirements,
    };

    let job = state
        .jobs
        .launch(
            JobKind::GenerateDescriptions,
            &project_id,
            Progress::new(total as u64),
            state.env.clone(),
            move |ctx| generate_descriptions(ctx, args),
        )
        .await?;
    Ok(accepted(job, Some(total)))
}

/// POST /api/projects/{project_id}/generate/images
async fn submit_images(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Json(req): Json<ImagesRequest>,
) -> ApiResult<Accepted> {
    require_non_empty("pages", &req.pages)?;
    require_unique_ids("page_id", req.pages.iter().map(|p| p.page_id.as_str()))?;
    let max_workers = workers(req.max_workers, state.env.settings.image_workers)?;
    let template = match req.template_url.as_deref().filter(|u| !u.is_empty()) {
        Some(url) => {
            let path = state
                .env
                .store
                .resolve_owned_url(&project_id, url)
                .filter(|p| p.is_file())
                .ok_or_else(|| ApiError::BadRequest(format!("template_url {url} is not an uploaded file")))?;
            Some(path)
        }
        None => None,
    };

    let settings = &state.env.settings;
    let total = req.pages.len();
    let args = ImageArgs {
        pages: req.pages,
        language: req.language.unwrap_or_else(|| settings.output_language.clone()),
        max_workers,
        aspect_ratio: req.aspect_ratio.unwrap_or_else(|| settings.aspect_ratio.clone()),
        resolution: req.resolution.unwrap_or_else(|| settings.resolution.clone()),
        template,
        extra_requirements: req.extra_requirements,
    };

    let job = state
        .jobs
        .launch(
            JobKind::GenerateImages,
            &project_id,
            Progress::new(total as u64),
            state.env.clone(),
            move |ctx| generate_images(ctx, args),
        )
        .await?;
    Ok(accepted(job, Some(total)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects/{project_id}/generate/outline", post(submit_outline))
        .route("/projects/{project_id}/generate/descriptions", post(submit_descriptions))
        .route("/projects/{project_id}/generate/images", post(submit_images))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_env_with, wait_terminal, FakeText};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use slidegen_core::{JobId, JobStatus};
    use slidegen_db::Database;
    use tower::ServiceExt;

    async fn app(text: Option<Arc<dyn slidegen_core::generation::TextGenerator>>) -> (Router, Arc<AppState>) {
        let db = Database::new_in_memory().await.unwrap();
        let state = AppState::new(test_env_with(db, text, None, None), 2);
        (router().with_state(Arc::clone(&state)), state)
    }

    async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    #[tokio::test]
    async fn test_descriptions_accepted_and_run() {
        let (app, state) = app(Some(FakeText::replying("Title\n- point"))).await;
        let (status, body) = post_json(
            app,
            "/projects/proj/generate/descriptions",
            json!({"pages": [{"page_id": "p1", "title": "One"}, {"page_id": "p2", "title": "Two"}], "max_workers": 2}),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "PENDING");
        assert_eq!(body["total_pages"], 2);

        let job_id = JobId::from(body["task_id"].as_str().unwrap());
        let job = wait_terminal(&state.jobs, &job_id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress["descriptions"]["p2"], "Title\n- point");
    }

    #[tokio::test]
    async fn test_out_of_range_workers_creates_no_record() {
        let (app, state) = app(None).await;
        let (status, body) = post_json(
            app,
            "/projects/proj/generate/images",
            json!({"pages": [{"page_id": "p1", "title": "One"}], "max_workers": 17}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid arguments");
        assert!(state.jobs.list("proj", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_pages_and_idea_rejected() {
        let (app, _state) = app(None).await;
        let (status, _) = post_json(app.clone(), "/projects/proj/generate/descriptions", json!({"pages": []})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = post_json(app, "/projects/proj/generate/outline", json!({"idea": "  "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"], "idea must not be empty");
    }

    #[tokio::test]
    async fn test_unknown_template_url_rejected() {
        let (app, _state) = app(None).await;
        let (status, body) = post_json(
            app,
            "/projects/proj/generate/images",
            json!({"pages": [{"page_id": "p1", "title": "One"}], "template_url": "/files/proj/templates/missing.png"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Bad request");
    }

    #[tokio::test]
    async fn test_colliding_page_ids_rejected() {
        let (app, state) = app(None).await;
        let (status, body) = post_json(
            app.clone(),
            "/projects/proj/generate/images",
            json!({"pages": [{"page_id": "p1", "title": "One"}, {"page_id": "p1", "title": "Again"}]}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"], "duplicate page_id: p1");

        let (status, body) = post_json(
            app,
            "/projects/proj/generate/descriptions",
            json!({"pages": [{"page_id": "p/2", "title": "Two"}, {"page_id": "p_2", "title": "Two"}]}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"], "duplicate page_id: p_2");
        assert!(state.jobs.list("proj", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_template_from_another_project_rejected() {
        let (app, state) = app(None).await;
        let asset = state
            .env
            .store
            .save("other-project", "templates", "t1", "png", b"\x89PNG")
            .await
            .unwrap();
        let (status, _) = post_json(
            app,
            "/projects/proj/generate/images",
            json!({"pages": [{"page_id": "p1", "title": "One"}], "template_url": asset.url}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(state.jobs.list("proj", 10).await.unwrap().is_empty());
    }
}
