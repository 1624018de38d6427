//! Export submission routes.
//!
//! - POST /projects/{project_id}/export/pptx
//! - POST /projects/{project_id}/export/editable-pptx

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use slidegen_core::generation::{ExportOptions, ExportPage};
use slidegen_core::validation::{require_non_empty, require_unique_ids, validate_concurrency, validate_depth};
use slidegen_core::{JobKind, Progress};
use utoipa::ToSchema;

use super::tasks::{accepted, TaskAccepted};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::tasks::export::{export_document, ExportArgs};

/// Editable export analyses the page surface only unless asked to recurse.
const DEFAULT_EDITABLE_DEPTH: i64 = 1;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ExportPageRequest {
    pub page_id: String,
    /// `/files/...` url of the rendered slide image.
    pub image_url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExportRequest {
    pub pages: Vec<ExportPageRequest>,
    pub filename: Option<String>,
    pub max_workers: Option<i64>,
    /// Editable export only.
    pub max_depth: Option<i64>,
}

async fn submit_export(
    state: &AppState,
    project_id: &str,
    req: ExportRequest,
    editable: bool,
) -> ApiResult<(axum::http::StatusCode, Json<TaskAccepted>)> {
    require_non_empty("pages", &req.pages)?;
    require_unique_ids("page_id", req.pages.iter().map(|p| p.page_id.as_str()))?;
    let max_workers = validate_concurrency(
        "max_workers",
        req.max_workers.unwrap_or(state.env.settings.export_workers as i64),
    )?;
    let max_depth = if editable {
        validate_depth(req.max_depth.unwrap_or(DEFAULT_EDITABLE_DEPTH))?
    } else {
        DEFAULT_EDITABLE_DEPTH as u32
    };

    let pages = req
        .pages
        .iter()
        .enumerate()
        .map(|(index, page)| {
            let image_path = state
                .env
                .store
                .resolve_owned_url(project_id, &page.image_url)
                .ok_or_else(|| ApiError::BadRequest(format!("page {} has no stored image", page.page_id)))?;
            Ok(ExportPage {
                page_id: page.page_id.clone(),
                index,
                image_path,
            })
        })
        .collect::<ApiResult<Vec<_>>>()?;

    let file_name = req
        .filename
        .map(|f| f.trim().trim_end_matches(".pptx").to_string())
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| format!("presentation_{project_id}"));
    let kind = if editable {
        JobKind::ExportEditablePptx
    } else {
        JobKind::ExportPptx
    };
    let total = pages.len();
    let args = ExportArgs {
        pages,
        options: ExportOptions {
            owner_id: project_id.to_string(),
            file_name,
            editable,
            max_depth,
        },
        max_workers,
    };

    tracing::info!(project_id, kind = %kind, pages = total, max_workers, max_depth, "export requested");
    let job = state
        .jobs
        .launch(
            kind,
            project_id,
            Progress::new(total as u64).with_step("queued"),
            state.env.clone(),
            move |ctx| export_document(ctx, args),
        )
        .await?;
    Ok(accepted(job, Some(total)))
}

/// POST /api/projects/{project_id}/export/pptx
async fn export_pptx(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Json(req): Json<ExportRequest>,
) -> ApiResult<(axum::http::StatusCode, Json<TaskAccepted>)> {
    submit_export(&state, &project_id, req, false).await
}

/// POST /api/projects/{project_id}/export/editable-pptx
async fn export_editable_pptx(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Json(req): Json<ExportRequest>,
) -> ApiResult<(axum::http::StatusCode, Json<TaskAccepted>)> {
    submit_export(&state, &project_id, req, true).await
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects/{project_id}/export/pptx", post(export_pptx))
        .route("/projects/{project_id}/export/editable-pptx", post(export_editable_pptx))
}
