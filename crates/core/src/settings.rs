// crates/core/src/settings.rs
//! Generation defaults captured into every job context at submit time.

/// Defaults job bodies fall back to when a request leaves a field unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSettings {
    pub output_language: String,
    pub resolution: String,
    pub aspect_ratio: String,
    pub description_workers: usize,
    pub image_workers: usize,
    pub style_preview_workers: usize,
    pub export_workers: usize,
}

/// Slides rendered per style recommendation preview.
pub const STYLE_PREVIEW_SLIDES: usize = 4;

/// Recommendations produced by a style recommendation job.
pub const STYLE_RECOMMENDATION_COUNT: usize = 3;

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            output_language: "zh".into(),
            resolution: "2K".into(),
            aspect_ratio: "16:9".into(),
            description_workers: 5,
            image_workers: 8,
            style_preview_workers: 4,
            export_workers: 4,
        }
    }
}

impl GenerationSettings {
    /// Preview pool size, never wider than the slides of one recommendation.
    pub fn preview_pool_size(&self) -> usize {
        self.style_preview_workers.clamp(1, STYLE_PREVIEW_SLIDES)
    }
}
