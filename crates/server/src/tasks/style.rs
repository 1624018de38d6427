// crates/server/src/tasks/style.rs
//! STYLE_RECOMMENDATIONS and STYLE_PREVIEW_REGENERATE.
//!
//! A recommendation is a style JSON plus sample text for four slide types.
//! Previews render those four slides so a client can compare styles.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use slidegen_core::generation::{ImageGenerator, ImageRequest, TextRequest};
use slidegen_core::settings::{STYLE_PREVIEW_SLIDES, STYLE_RECOMMENDATION_COUNT};
use slidegen_core::{FileStore, Progress};
use slidegen_server_jobs::{fan_out, ProgressReporter};
use utoipa::ToSchema;

use super::{language_instruction, TaskError};
use crate::jobs::JobContext;

/// Store category preview images are written under.
pub const PREVIEW_CATEGORY: &str = "style-previews";

/// Slide types every preview set renders, in display order.
pub const PREVIEW_SLIDES: [(&str, &str); STYLE_PREVIEW_SLIDES] = [
    ("cover", "Cover"),
    ("toc", "Table of contents"),
    ("detail", "Detail page"),
    ("ending", "Closing page"),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SamplePages {
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub toc: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub ending: String,
}

impl SamplePages {
    pub fn get(&self, slide: &str) -> &str {
        match slide {
            "cover" => &self.cover,
            "toc" => &self.toc,
            "detail" => &self.detail,
            "ending" => &self.ending,
            _ => "",
        }
    }

    fn from_value(value: Option<&Value>) -> Self {
        value
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub name: String,
    pub rationale: String,
    pub style_json: Value,
    pub sample_pages: SamplePages,
    /// `{slide}_url` for each preview slide; empty until rendered.
    pub preview_images: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct RecommendationArgs {
    /// Compact JSON skeleton the recommendations must fill in.
    pub template_json: String,
    pub style_requirements: String,
    pub language: String,
    pub generate_previews: bool,
    pub aspect_ratio: String,
    pub resolution: String,
}

#[derive(Debug, Clone)]
pub struct PreviewArgs {
    pub rec_id: String,
    pub style_json: String,
    pub sample_pages: SamplePages,
    pub style_requirements: String,
    pub language: String,
    pub aspect_ratio: String,
    pub resolution: String,
}

/// Initial progress for a recommendation job, before the model has answered.
pub fn recommendation_progress(generate_previews: bool) -> Progress {
    let total = if generate_previews {
        STYLE_RECOMMENDATION_COUNT * STYLE_PREVIEW_SLIDES
    } else {
        STYLE_RECOMMENDATION_COUNT
    };
    let mut progress = Progress::new(total as u64);
    progress.insert_extra("mode", Value::from(mode(generate_previews)));
    progress.insert_extra("recommendations", Value::Array(Vec::new()));
    progress
}

/// Initial progress for regenerating one recommendation's previews.
pub fn preview_progress(rec_id: &str) -> Progress {
    let mut progress = Progress::new(STYLE_PREVIEW_SLIDES as u64);
    progress.insert_extra("rec_id", Value::from(rec_id));
    progress
}

fn mode(generate_previews: bool) -> &'static str {
    if generate_previews {
        "recommendations_and_previews"
    } else {
        "recommendations_only"
    }
}

fn recommendation_prompt(args: &RecommendationArgs) -> String {
    let mut prompt = format!(
        "Recommend {STYLE_RECOMMENDATION_COUNT} distinct visual styles for a slide deck.\n\
         Fill in this style JSON skeleton for each style:\n{}\n\
         Reply with JSON {{\"recommendations\": [{{\"name\", \"rationale\", \"style_json\", \
         \"sample_pages\": {{\"cover\", \"toc\", \"detail\", \"ending\"}}}}]}}. {}",
        args.template_json,
        language_instruction(&args.language)
    );
    if !args.style_requirements.trim().is_empty() {
        prompt.push_str(&format!("\nStyle requirements:\n{}", args.style_requirements.trim()));
    }
    prompt
}

fn preview_prompt(style_json: &str, style_requirements: &str, slide: &str, title: &str, sample: &str) -> String {
    let mut prompt = format!(
        "Render a sample {title} slide ({slide}) following this style guide.\n\
         <style_json>\n{style_json}\n</style_json>"
    );
    if !sample.trim().is_empty() {
        prompt.push_str(&format!("\nSlide content:\n{}", sample.trim()));
    }
    if !style_requirements.trim().is_empty() {
        prompt.push_str(&format!("\nAdditional style requirements:\n{}", style_requirements.trim()));
    }
    prompt
}

/// Accepts `{"recommendations": [...]}` or a bare list, keeps at most three.
pub fn normalize_recommendations(value: &Value) -> Vec<Recommendation> {
    let items = value
        .get("recommendations")
        .and_then(Value::as_array)
        .or_else(|| value.as_array())
        .cloned()
        .unwrap_or_default();

    items
        .iter()
        .take(STYLE_RECOMMENDATION_COUNT)
        .enumerate()
        .map(|(i, item)| {
            let text = |key: &str| {
                item.get(key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string()
            };
            let name = text("name");
            Recommendation {
                id: uuid::Uuid::new_v4().to_string(),
                name: if name.is_empty() { format!("Style {}", i + 1) } else { name },
                rationale: text("rationale"),
                style_json: item.get("style_json").cloned().unwrap_or(Value::Null),
                sample_pages: SamplePages::from_value(item.get("sample_pages")),
                preview_images: PREVIEW_SLIDES
                    .iter()
                    .map(|(slide, _)| (format!("{slide}_url"), Value::from("")))
                    .collect(),
            }
        })
        .collect()
}

/// Looks through earlier recommendation payloads for `rec_id`'s sample pages.
pub fn find_sample_pages<'a>(progress: impl IntoIterator<Item = &'a Value>, rec_id: &str) -> Option<SamplePages> {
    progress.into_iter().find_map(|p| {
        p.get("recommendations")?
            .as_array()?
            .iter()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(rec_id))
            .map(|r| SamplePages::from_value(r.get("sample_pages")))
    })
}

fn set_preview_url(progress: &mut Progress, rec_id: &str, slide: &str, url: &str) {
    let Some(Value::Array(recs)) = progress.extra.get_mut("recommendations") else {
        return;
    };
    let preview = recs
        .iter_mut()
        .find(|r| r.get("id").and_then(Value::as_str) == Some(rec_id))
        .and_then(|r| r.get_mut("preview_images"))
        .and_then(Value::as_object_mut);
    if let Some(preview) = preview {
        preview.insert(format!("{slide}_url"), Value::from(url));
    }
}

/// Renders and stores one preview slide, returning its url.
async fn render_preview(
    image: &dyn ImageGenerator,
    store: &FileStore,
    owner_id: &str,
    rec_id: &str,
    slide: &str,
    request: ImageRequest,
) -> Result<String, TaskError> {
    let generated = image.generate_image(request).await?;
    let run_id: String = uuid::Uuid::new_v4().simple().to_string().chars().take(10).collect();
    let asset = store
        .save(
            owner_id,
            PREVIEW_CATEGORY,
            &format!("{rec_id}-{slide}-{run_id}"),
            generated.extension(),
            &generated.bytes,
        )
        .await?;
    Ok(asset.url)
}

struct PreviewUnit {
    rec_id: String,
    slide: &'static str,
    request: ImageRequest,
}

fn preview_units(
    rec_id: &str,
    style_json: &str,
    style_requirements: &str,
    sample_pages: &SamplePages,
    aspect_ratio: &str,
    resolution: &str,
) -> Vec<PreviewUnit> {
    PREVIEW_SLIDES
        .iter()
        .map(|&(slide, title)| PreviewUnit {
            rec_id: rec_id.to_string(),
            slide,
            request: ImageRequest {
                prompt: preview_prompt(style_json, style_requirements, slide, title, sample_pages.get(slide)),
                aspect_ratio: aspect_ratio.to_string(),
                resolution: resolution.to_string(),
                reference_images: Vec::new(),
            },
        })
        .collect()
}

/// Runs preview units on the preview pool. `on_rendered` records each url.
async fn render_all<F>(
    ctx: &JobContext,
    units: Vec<PreviewUnit>,
    on_rendered: F,
) -> Result<usize, TaskError>
where
    F: Fn(&mut Progress, &str, &str, &str) + Send + Sync + 'static,
{
    let image = Arc::clone(&ctx.generators.image);
    let store = ctx.store.clone();
    let owner_id = ctx.owner_id.clone();
    let reporter: Arc<ProgressReporter> = Arc::clone(&ctx.reporter);
    let on_rendered = Arc::new(on_rendered);

    let outcomes = fan_out(units, ctx.settings.preview_pool_size(), Arc::clone(&ctx.reporter), move |unit| {
        let image = Arc::clone(&image);
        let store = store.clone();
        let owner_id = owner_id.clone();
        let reporter = Arc::clone(&reporter);
        let on_rendered = Arc::clone(&on_rendered);
        async move {
            let url = render_preview(image.as_ref(), &store, &owner_id, &unit.rec_id, unit.slide, unit.request).await?;
            reporter
                .update(|p| {
                    on_rendered(p, &unit.rec_id, unit.slide, &url);
                    Ok(())
                })
                .await?;
            Ok::<(), TaskError>(())
        }
    })
    .await?;
    Ok(outcomes.iter().filter(|o| o.is_err()).count())
}

pub async fn recommend_styles(ctx: Arc<JobContext>, args: RecommendationArgs) -> Result<(), TaskError> {
    let prompt = recommendation_prompt(&args);
    let template_chars = args.template_json.chars().count();
    ctx.reporter
        .update(|p| {
            p.set_step("generating_recommendations");
            p.insert_extra("prompt_chars", Value::from(prompt.chars().count()));
            p.insert_extra("template_json_chars", Value::from(template_chars));
            Ok(())
        })
        .await?;

    let request = TextRequest::new(prompt).with_system("You are a presentation designer. Reply with JSON only.");
    let value = ctx.generators.text.generate_json(request).await?;
    let recs = normalize_recommendations(&value);
    if recs.is_empty() {
        return Err(TaskError::InvalidOutput("no style recommendations returned".into()));
    }
    if recs.len() != STYLE_RECOMMENDATION_COUNT {
        tracing::warn!(job_id = %ctx.job_id, got = recs.len(), "unexpected recommendation count");
    }

    let total = if args.generate_previews {
        recs.len() * STYLE_PREVIEW_SLIDES
    } else {
        recs.len()
    };
    let recs_value = serde_json::to_value(&recs).map_err(|e| TaskError::InvalidOutput(e.to_string()))?;
    let generate_previews = args.generate_previews;
    ctx.reporter
        .update(move |p| {
            p.set_total(total as u64)?;
            p.insert_extra("mode", Value::from(mode(generate_previews)));
            p.insert_extra("recommendations", recs_value);
            p.set_step(if generate_previews {
                "generating_preview_images"
            } else {
                "recommendations_ready"
            });
            Ok(())
        })
        .await?;

    if !args.generate_previews {
        ctx.reporter
            .update(|p| {
                for _ in 0..p.remaining() {
                    p.record_completed()?;
                }
                p.set_step("recommendations_completed");
                Ok(())
            })
            .await?;
        return Ok(());
    }

    let units: Vec<PreviewUnit> = recs
        .iter()
        .flat_map(|rec| {
            let style_json = style_text(&rec.style_json);
            preview_units(
                &rec.id,
                &style_json,
                &args.style_requirements,
                &rec.sample_pages,
                &args.aspect_ratio,
                &args.resolution,
            )
        })
        .collect();

    let failed = render_all(&ctx, units, |p, rec_id, slide, url| set_preview_url(p, rec_id, slide, url)).await?;
    tracing::info!(job_id = %ctx.job_id, recommendations = recs.len(), failed, "style previews rendered");
    ctx.reporter.set_step("recommendations_completed").await?;
    Ok(())
}

pub async fn regenerate_previews(ctx: Arc<JobContext>, args: PreviewArgs) -> Result<(), TaskError> {
    ctx.reporter.set_step("generating_preview_images").await?;

    let units = preview_units(
        &args.rec_id,
        &args.style_json,
        &args.style_requirements,
        &args.sample_pages,
        &args.aspect_ratio,
        &args.resolution,
    );
    let failed = render_all(&ctx, units, |p, _rec_id, slide, url| {
        p.insert_entry("preview_images", format!("{slide}_url"), Value::from(url));
    })
    .await?;

    tracing::info!(job_id = %ctx.job_id, rec_id = %args.rec_id, failed, "style previews regenerated");
    ctx.reporter.set_step("done").await?;
    Ok(())
}

fn style_text(style_json: &Value) -> String {
    match style_json {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
