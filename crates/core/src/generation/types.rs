// crates/core/src/generation/types.rs
//! Request/response/error types for generation collaborators.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request for a text completion.
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl TextRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: None,
            prompt: prompt.into(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }
}

/// Request for one generated image.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect_ratio: String,
    pub resolution: String,
    /// Local files the provider may use as style or layout references.
    pub reference_images: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl GeneratedImage {
    pub fn png(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: "image/png".into(),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

/// One page handed to a document exporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportPage {
    pub page_id: String,
    pub index: usize,
    pub image_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub owner_id: String,
    pub file_name: String,
    /// Editable export recurses into page sub-regions up to this depth.
    pub editable: bool,
    pub max_depth: u32,
}

/// A page after the exporter has processed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedPage {
    pub page_id: String,
    pub index: usize,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportArtifact {
    pub path: PathBuf,
    pub url: String,
    pub page_count: usize,
}

/// Errors that can occur while calling a generation collaborator.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        GenerationError::Http(e.to_string())
    }
}

/// Parses model output as JSON, tolerating a surrounding markdown code fence.
pub fn extract_json(text: &str) -> Result<serde_json::Value, GenerationError> {
    let body = strip_code_fence(text.trim());
    serde_json::from_str(body)
        .map_err(|e| GenerationError::InvalidResponse(format!("expected JSON: {e}")))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_plain_json() {
        assert_eq!(extract_json(" [1, 2] ").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_extract_fenced_json() {
        let text = "```json\n{\"title\": \"Intro\"}\n```";
        assert_eq!(extract_json(text).unwrap(), json!({"title": "Intro"}));
    }

    #[test]
    fn test_extract_rejects_prose() {
        assert!(matches!(
            extract_json("Sure! Here is your outline."),
            Err(GenerationError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(GeneratedImage::png(vec![]).extension(), "png");
        let jpeg = GeneratedImage {
            bytes: vec![],
            mime_type: "image/jpeg".into(),
        };
        assert_eq!(jpeg.extension(), "jpg");
    }
}
