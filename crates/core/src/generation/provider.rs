// crates/core/src/generation/provider.rs
//! Traits job bodies call into. Implementations are held as `Arc<dyn _>`.

use async_trait::async_trait;

use super::types::{
    extract_json, ExportArtifact, ExportOptions, ExportPage, GeneratedImage, GenerationError,
    ImageRequest, RenderedPage, TextRequest,
};

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, request: TextRequest) -> Result<String, GenerationError>;

    /// Completion whose output must parse as JSON.
    async fn generate_json(&self, request: TextRequest) -> Result<serde_json::Value, GenerationError> {
        let text = self.generate_text(request).await?;
        extract_json(&text)
    }

    /// Provider name for logging (e.g. "openai").
    fn name(&self) -> &str;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, request: ImageRequest) -> Result<GeneratedImage, GenerationError>;

    fn name(&self) -> &str;
}

/// Turns rendered slide images into a downloadable document.
#[async_trait]
pub trait DocumentExporter: Send + Sync {
    /// Processes one page. Called concurrently from export sub-workers.
    async fn render_page(
        &self,
        page: &ExportPage,
        options: &ExportOptions,
    ) -> Result<RenderedPage, GenerationError>;

    /// Combines rendered pages, in index order, into the final artifact.
    async fn assemble(
        &self,
        pages: Vec<RenderedPage>,
        options: &ExportOptions,
    ) -> Result<ExportArtifact, GenerationError>;
}
