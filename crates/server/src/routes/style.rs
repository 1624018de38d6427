//! Style recommendation routes.
//!
//! - POST /projects/{project_id}/style/recommendations
//! - POST /projects/{project_id}/style/recommendations/{rec_id}/previews

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use slidegen_core::{JobKind, ValidationError};
use utoipa::ToSchema;

use super::tasks::{accepted, TaskAccepted};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::tasks::style::{
    find_sample_pages, preview_progress, recommend_styles, recommendation_progress, regenerate_previews,
    PreviewArgs, RecommendationArgs, SamplePages,
};

/// How many of a project's recent jobs are searched for a recommendation.
const SAMPLE_PAGE_LOOKBACK: i64 = 50;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecommendationRequest {
    /// Style JSON skeleton, as JSON text.
    pub template_json: String,
    #[serde(default)]
    pub style_requirements: String,
    pub language: Option<String>,
    #[serde(default)]
    pub generate_previews: bool,
    pub aspect_ratio: Option<String>,
    pub resolution: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PreviewRequest {
    /// A style object, or the same as JSON text.
    #[schema(value_type = Object)]
    pub style_json: Value,
    pub sample_pages: Option<SamplePages>,
    #[serde(default)]
    pub style_requirements: String,
    pub language: Option<String>,
    pub aspect_ratio: Option<String>,
    pub resolution: Option<String>,
}

/// Parses `template_json` and re-serializes it without whitespace.
fn compact_template(text: &str) -> ApiResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::Empty("template_json").into());
    }
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ApiError::BadRequest(format!("template_json must be valid JSON: {e}")))?;
    Ok(value.to_string())
}

fn style_text(style_json: &Value) -> ApiResult<String> {
    let text = match style_json {
        Value::Object(_) | Value::Array(_) => style_json.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(ApiError::BadRequest("style_json must be an object or a JSON string".into())),
    };
    if text.is_empty() {
        return Err(ValidationError::Empty("style_json").into());
    }
    Ok(text)
}

/// POST /api/projects/{project_id}/style/recommendations
async fn submit_recommendations(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Json(req): Json<RecommendationRequest>,
) -> ApiResult<(StatusCode, Json<TaskAccepted>)> {
    let settings = &state.env.settings;
    let args = RecommendationArgs {
        template_json: compact_template(&req.template_json)?,
        style_requirements: req.style_requirements,
        language: req.language.unwrap_or_else(|| settings.output_language.clone()),
        generate_previews: req.generate_previews,
        aspect_ratio: req.aspect_ratio.unwrap_or_else(|| settings.aspect_ratio.clone()),
        resolution: req.resolution.unwrap_or_else(|| settings.resolution.clone()),
    };

    let job = state
        .jobs
        .launch(
            JobKind::StyleRecommendations,
            &project_id,
            recommendation_progress(args.generate_previews),
            state.env.clone(),
            move |ctx| recommend_styles(ctx, args),
        )
        .await?;
    Ok(accepted(job, None))
}

/// POST /api/projects/{project_id}/style/recommendations/{rec_id}/previews
///
/// Sample pages default to the ones stored with the recommendation by an
/// earlier recommendation job for the same project.
async fn submit_previews(
    State(state): State<Arc<AppState>>,
    Path((project_id, rec_id)): Path<(String, String)>,
    Json(req): Json<PreviewRequest>,
) -> ApiResult<(StatusCode, Json<TaskAccepted>)> {
    let style_json = style_text(&req.style_json)?;
    let sample_pages = match req.sample_pages {
        Some(pages) => pages,
        None => {
            let jobs = state.jobs.list(&project_id, SAMPLE_PAGE_LOOKBACK).await?;
            find_sample_pages(jobs.iter().map(|j| &j.progress), &rec_id)
                .ok_or_else(|| ValidationError::unknown("style recommendation", rec_id.clone()))?
        }
    };

    let settings = &state.env.settings;
    let args = PreviewArgs {
        rec_id: rec_id.clone(),
        style_json,
        sample_pages,
        style_requirements: req.style_requirements,
        language: req.language.unwrap_or_else(|| settings.output_language.clone()),
        aspect_ratio: req.aspect_ratio.unwrap_or_else(|| settings.aspect_ratio.clone()),
        resolution: req.resolution.unwrap_or_else(|| settings.resolution.clone()),
    };

    let job = state
        .jobs
        .launch(
            JobKind::StylePreviewRegenerate,
            &project_id,
            preview_progress(&rec_id),
            state.env.clone(),
            move |ctx| regenerate_previews(ctx, args),
        )
        .await?;
    Ok(accepted(job, None))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects/{project_id}/style/recommendations", post(submit_recommendations))
        .route(
            "/projects/{project_id}/style/recommendations/{rec_id}/previews",
            post(submit_previews),
        )
}
