// crates/server/src/tasks/images.rs
//! GENERATE_IMAGES: one slide image per page, saved through the file store.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use slidegen_core::generation::ImageRequest;
use slidegen_server_jobs::fan_out;

use super::{language_instruction, outline_text, PageSpec, TaskError};
use crate::jobs::JobContext;

/// Store category generated slide images are written under.
pub const PAGE_IMAGE_CATEGORY: &str = "pages";

#[derive(Debug, Clone)]
pub struct ImageArgs {
    pub pages: Vec<PageSpec>,
    pub language: String,
    pub max_workers: usize,
    pub aspect_ratio: String,
    pub resolution: String,
    /// Template image every page should follow visually.
    pub template: Option<PathBuf>,
    pub extra_requirements: Option<String>,
}

fn prompt(outline: &str, page: &PageSpec, index: usize, args: &ImageArgs) -> String {
    let body = page
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            let mut text = page.title.clone();
            for point in &page.points {
                text.push_str("\n- ");
                text.push_str(point);
            }
            text
        });

    let mut prompt = format!(
        "Render slide {} of this deck as a finished presentation page.\n\
         Deck outline:\n{outline}\nSlide content:\n{body}\n{}",
        index + 1,
        language_instruction(&args.language)
    );
    if args.template.is_some() {
        prompt.push_str("\nMatch the layout and palette of the reference template image.");
    }
    if let Some(extra) = args.extra_requirements.as_deref().filter(|e| !e.trim().is_empty()) {
        prompt.push_str(&format!("\n{}", extra.trim()));
    }
    prompt
}

pub async fn generate_images(ctx: Arc<JobContext>, args: ImageArgs) -> Result<(), TaskError> {
    ctx.reporter.set_step("generating_images").await?;

    let outline = outline_text(&args.pages);
    let requests: Vec<(PageSpec, ImageRequest)> = args
        .pages
        .iter()
        .enumerate()
        .map(|(index, page)| {
            let request = ImageRequest {
                prompt: prompt(&outline, page, index, &args),
                aspect_ratio: args.aspect_ratio.clone(),
                resolution: args.resolution.clone(),
                reference_images: args.template.iter().cloned().collect(),
            };
            (page.clone(), request)
        })
        .collect();

    let image = Arc::clone(&ctx.generators.image);
    let store = ctx.store.clone();
    let owner_id = ctx.owner_id.clone();
    let reporter = Arc::clone(&ctx.reporter);

    let outcomes = fan_out(requests, args.max_workers, Arc::clone(&ctx.reporter), move |(page, request)| {
        let image = Arc::clone(&image);
        let store = store.clone();
        let owner_id = owner_id.clone();
        let reporter = Arc::clone(&reporter);
        async move {
            let generated = image.generate_image(request).await?;
            let asset = store
                .save(
                    &owner_id,
                    PAGE_IMAGE_CATEGORY,
                    &page.page_id,
                    generated.extension(),
                    &generated.bytes,
                )
                .await?;
            reporter
                .insert_entry("images", &page.page_id, Value::from(asset.url))
                .await?;
            Ok::<(), TaskError>(())
        }
    })
    .await?;

    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    tracing::info!(job_id = %ctx.job_id, pages = outcomes.len(), failed, "page images generated");
    ctx.reporter.set_step("done").await?;
    Ok(())
}
