// crates/server/src/config.rs
//! Command-line and environment configuration for the server binary.

use std::path::PathBuf;

use clap::Parser;
use slidegen_core::generation::OpenAiConfig;
use slidegen_core::validation::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use slidegen_core::GenerationSettings;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 47821;

#[derive(Debug, Clone, Parser)]
#[command(name = "slidegen", version, about = "Slide generation job server")]
pub struct Config {
    #[arg(long, env = "SLIDEGEN_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// SQLite file holding job records. Defaults to the platform data dir.
    #[arg(long, env = "SLIDEGEN_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Root for generated images and exports.
    #[arg(long, env = "SLIDEGEN_UPLOADS_DIR")]
    pub uploads_dir: Option<PathBuf>,

    /// Job bodies allowed to run at once. Further submissions queue.
    #[arg(long, env = "SLIDEGEN_WORKERS", default_value_t = 4)]
    pub workers: usize,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_API_BASE", default_value = "https://api.openai.com/v1")]
    pub openai_api_base: String,

    #[arg(long, env = "SLIDEGEN_TEXT_MODEL", default_value = "gpt-4o-mini")]
    pub text_model: String,

    #[arg(long, env = "SLIDEGEN_IMAGE_MODEL", default_value = "gpt-image-1")]
    pub image_model: String,

    #[arg(long, env = "OUTPUT_LANGUAGE", default_value = "zh")]
    pub output_language: String,

    #[arg(long, env = "DEFAULT_RESOLUTION", default_value = "2K")]
    pub default_resolution: String,

    #[arg(long, env = "DEFAULT_ASPECT_RATIO", default_value = "16:9")]
    pub default_aspect_ratio: String,

    #[arg(long, env = "MAX_DESCRIPTION_WORKERS", default_value_t = 5)]
    pub description_workers: usize,

    #[arg(long, env = "MAX_IMAGE_WORKERS", default_value_t = 8)]
    pub image_workers: usize,

    #[arg(long, env = "STYLE_PREVIEW_WORKERS", default_value_t = 4)]
    pub style_preview_workers: usize,

    #[arg(long, env = "EXPORT_WORKERS", default_value_t = 4)]
    pub export_workers: usize,
}

impl Config {
    /// Generation defaults, with worker counts pulled into the accepted range.
    pub fn generation_settings(&self) -> GenerationSettings {
        let clamp = |n: usize| n.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY);
        GenerationSettings {
            output_language: self.output_language.clone(),
            resolution: self.default_resolution.clone(),
            aspect_ratio: self.default_aspect_ratio.clone(),
            description_workers: clamp(self.description_workers),
            image_workers: clamp(self.image_workers),
            style_preview_workers: clamp(self.style_preview_workers),
            export_workers: clamp(self.export_workers),
        }
    }

    pub fn openai_config(&self) -> OpenAiConfig {
        OpenAiConfig {
            api_key: self.openai_api_key.clone().filter(|k| !k.trim().is_empty()),
            api_base: self.openai_api_base.trim_end_matches('/').to_string(),
            text_model: self.text_model.clone(),
            image_model: self.image_model.clone(),
            ..OpenAiConfig::default()
        }
    }
}
