// crates/server/src/tasks/outline.rs
//! GENERATE_OUTLINE: one text call turning an idea into a page list.

use std::sync::Arc;

use serde_json::Value;
use slidegen_core::generation::TextRequest;

use super::{language_instruction, PageSpec, TaskError};
use crate::jobs::JobContext;

#[derive(Debug, Clone)]
pub struct OutlineArgs {
    pub idea: String,
    pub language: String,
}

const SYSTEM_PROMPT: &str = "You plan slide decks. Reply with JSON only.";

fn prompt(args: &OutlineArgs) -> String {
    format!(
        "Create a slide outline for this idea:\n{}\n\n\
         Reply with a JSON array. Each item is either a page \
         {{\"title\": string, \"points\": [string]}} or a part \
         {{\"part\": string, \"pages\": [page, ...]}}. {}",
        args.idea.trim(),
        language_instruction(&args.language)
    )
}

pub async fn generate_outline(ctx: Arc<JobContext>, args: OutlineArgs) -> Result<(), TaskError> {
    ctx.reporter.set_step("generating_outline").await?;

    let request = TextRequest::new(prompt(&args)).with_system(SYSTEM_PROMPT);
    let pages = match ctx.generators.text.generate_json(request).await {
        Ok(value) => parse_outline(&value),
        Err(e) => Err(e.into()),
    };
    let pages = match pages {
        Ok(pages) => pages,
        Err(e) => {
            ctx.reporter.record_failed().await?;
            return Err(e);
        }
    };

    tracing::info!(job_id = %ctx.job_id, pages = pages.len(), "outline generated");
    let outline = serde_json::to_value(&pages).map_err(|e| TaskError::InvalidOutput(e.to_string()))?;
    ctx.reporter
        .update(|p| {
            p.insert_extra("outline", outline);
            p.set_step("done");
            p.record_completed()
        })
        .await?;
    Ok(())
}

/// Flattens model output into pages, keeping the part each page sits in.
///
/// Accepts a bare array or an object with a `pages` or `outline` array.
pub fn parse_outline(value: &Value) -> Result<Vec<PageSpec>, TaskError> {
    let items = value
        .as_array()
        .or_else(|| value.get("pages").and_then(Value::as_array))
        .or_else(|| value.get("outline").and_then(Value::as_array))
        .ok_or_else(|| TaskError::InvalidOutput("outline is not a list".into()))?;

    let mut pages = Vec::new();
    for item in items {
        match item.get("pages").and_then(Value::as_array) {
            Some(children) => {
                let part = item.get("part").and_then(Value::as_str).map(str::to_string);
                for child in children {
                    pages.push(page_from(child, part.clone(), pages.len())?);
                }
            }
            None => pages.push(page_from(item, None, pages.len())?),
        }
    }

    if pages.is_empty() {
        return Err(TaskError::InvalidOutput("outline has no pages".into()));
    }
    Ok(pages)
}

fn page_from(item: &Value, part: Option<String>, index: usize) -> Result<PageSpec, TaskError> {
    let title = item
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| TaskError::InvalidOutput(format!("page {} has no title", index + 1)))?;
    let points = item
        .get("points")
        .and_then(Value::as_array)
        .map(|points| {
            points
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(PageSpec {
        page_id: format!("page-{}", index + 1),
        title: title.to_string(),
        points,
        part,
        description: None,
    })
}
