// crates/server/src/tasks/mod.rs
//! Job bodies, one module per family of job kinds.
//!
//! Each body takes its `JobContext` plus kind-specific arguments captured by
//! the request handler, reports one progress update per unit, and returns
//! `Err` only for job-fatal problems. Per-unit failures go to `failed`.

pub mod descriptions;
pub mod export;
pub mod images;
pub mod outline;
pub mod style;

use serde::{Deserialize, Serialize};
use slidegen_core::generation::GenerationError;
use slidegen_server_jobs::ReportError;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid model output: {0}")]
    InvalidOutput(String),

    #[error("{0}")]
    Units(String),
}

/// One slide as the client currently has it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PageSpec {
    pub page_id: String,
    pub title: String,
    #[serde(default)]
    pub points: Vec<String>,
    /// Section of the deck this page belongs to, if the outline has parts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Outline as plain text, one line per page, for prompts that need the deck
/// around the page being worked on.
pub(crate) fn outline_text(pages: &[PageSpec]) -> String {
    let mut out = String::new();
    let mut current_part: Option<&str> = None;
    for (i, page) in pages.iter().enumerate() {
        if let Some(part) = page.part.as_deref() {
            if current_part != Some(part) {
                out.push_str(&format!("## {part}\n"));
                current_part = Some(part);
            }
        }
        out.push_str(&format!("{}. {}", i + 1, page.title));
        if !page.points.is_empty() {
            out.push_str(&format!(" ({})", page.points.join("; ")));
        }
        out.push('\n');
    }
    out
}

pub(crate) fn language_instruction(language: &str) -> String {
    match language {
        "zh" => "Write the output in Simplified Chinese.".to_string(),
        "en" => "Write the output in English.".to_string(),
        "ja" => "Write the output in Japanese.".to_string(),
        "auto" => "Write the output in the language of the input.".to_string(),
        other => format!("Write the output in the language with code '{other}'."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(title: &str, part: Option<&str>) -> PageSpec {
        PageSpec {
            page_id: title.to_lowercase(),
            title: title.into(),
            points: vec![],
            part: part.map(Into::into),
            description: None,
        }
    }

    #[test]
    fn test_outline_text_groups_parts() {
        let pages = vec![
            page("Intro", None),
            page("Market", Some("Context")),
            page("Risks", Some("Context")),
            PageSpec {
                points: vec!["ship".into(), "learn".into()],
                ..page("Plan", Some("Next"))
            },
        ];
        assert_eq!(
            outline_text(&pages),
            "1. Intro\n## Context\n2. Market\n3. Risks\n## Next\n4. Plan (ship; learn)\n"
        );
    }

    #[test]
    fn test_language_instruction() {
        assert!(language_instruction("en").contains("English"));
        assert!(language_instruction("fr").contains("'fr'"));
    }
}
