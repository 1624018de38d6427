// crates/core/src/generation/openai.rs
//! Text and image generation against an OpenAI-compatible HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::provider::{ImageGenerator, TextGenerator};
use super::types::{GeneratedImage, GenerationError, ImageRequest, TextRequest};

/// Configuration for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub text_model: String,
    pub image_model: String,
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.openai.com/v1".into(),
            text_model: "gpt-4o-mini".into(),
            image_model: "gpt-image-1".into(),
            timeout_secs: 300,
        }
    }
}

pub struct OpenAiClient {
    http: reqwest::Client,
    config: OpenAiConfig,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct ImagesRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Deserialize)]
struct ImagesResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    #[serde(default)]
    b64_json: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, GenerationError> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationError::NotConfigured("OPENAI_API_KEY is not set".into()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, GenerationError> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(self.api_key()?)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<R>()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))
    }
}

/// Maps an aspect ratio to the closest size the images endpoint accepts.
fn image_size(aspect_ratio: &str) -> &'static str {
    match aspect_ratio {
        "16:9" | "4:3" | "3:2" => "1536x1024",
        "9:16" | "3:4" | "2:3" => "1024x1536",
        _ => "1024x1024",
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate_text(&self, request: TextRequest) -> Result<String, GenerationError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: &self.config.text_model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };
        let response: ChatResponse = self.post_json("chat/completions", &body).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("empty completion".into()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    async fn generate_image(&self, request: ImageRequest) -> Result<GeneratedImage, GenerationError> {
        if !request.reference_images.is_empty() {
            tracing::debug!(
                count = request.reference_images.len(),
                "reference images are not sent to the images endpoint"
            );
        }
        let body = ImagesRequest {
            model: &self.config.image_model,
            prompt: &request.prompt,
            n: 1,
            size: image_size(&request.aspect_ratio),
        };
        let response: ImagesResponse = self.post_json("images/generations", &body).await?;
        let encoded = response
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .ok_or_else(|| GenerationError::InvalidResponse("no image data".into()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| GenerationError::InvalidResponse(format!("bad base64 image: {e}")))?;
        Ok(GeneratedImage::png(bytes))
    }

    fn name(&self) -> &str {
        "openai"
    }
}
