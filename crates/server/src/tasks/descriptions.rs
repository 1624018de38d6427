// crates/server/src/tasks/descriptions.rs
//! GENERATE_DESCRIPTIONS: one text call per page, in parallel.

use std::sync::Arc;

use serde_json::Value;
use slidegen_core::generation::TextRequest;
use slidegen_server_jobs::fan_out;

use super::{language_instruction, outline_text, PageSpec, TaskError};
use crate::jobs::JobContext;

#[derive(Debug, Clone)]
pub struct DescriptionArgs {
    pub pages: Vec<PageSpec>,
    pub language: String,
    pub max_workers: usize,
    /// Project-level notes appended to every page prompt.
    pub extra_requirements: Option<String>,
}

fn prompt(outline: &str, page: &PageSpec, index: usize, language: &str, extra: Option<&str>) -> String {
    let mut prompt = format!(
        "Deck outline:\n{outline}\n\
         Write the on-slide text for page {} \"{}\". \
         Use a short title line followed by concise bullet points. {}",
        index + 1,
        page.title,
        language_instruction(language)
    );
    if !page.points.is_empty() {
        prompt.push_str(&format!("\nCover these points: {}.", page.points.join("; ")));
    }
    if let Some(extra) = extra.filter(|e| !e.trim().is_empty()) {
        prompt.push_str(&format!("\nAdditional requirements:\n{}", extra.trim()));
    }
    prompt
}

pub async fn generate_descriptions(ctx: Arc<JobContext>, args: DescriptionArgs) -> Result<(), TaskError> {
    ctx.reporter.set_step("generating_descriptions").await?;

    let outline = Arc::new(outline_text(&args.pages));
    let language = Arc::new(args.language);
    let extra = Arc::new(args.extra_requirements);
    let text = Arc::clone(&ctx.generators.text);
    let reporter = Arc::clone(&ctx.reporter);
    let units: Vec<(usize, PageSpec)> = args.pages.into_iter().enumerate().collect();

    let outcomes = fan_out(units, args.max_workers, Arc::clone(&ctx.reporter), move |(index, page)| {
        let request = TextRequest::new(prompt(&outline, &page, index, &language, extra.as_deref()));
        let text = Arc::clone(&text);
        let reporter = Arc::clone(&reporter);
        async move {
            let description = text.generate_text(request).await?;
            let description = description.trim();
            if description.is_empty() {
                return Err(TaskError::InvalidOutput(format!("empty description for {}", page.page_id)));
            }
            reporter
                .insert_entry("descriptions", &page.page_id, Value::from(description))
                .await?;
            Ok::<(), TaskError>(())
        }
    })
    .await?;

    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    tracing::info!(job_id = %ctx.job_id, pages = outcomes.len(), failed, "descriptions generated");
    ctx.reporter.set_step("done").await?;
    Ok(())
}
