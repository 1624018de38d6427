// crates/core/src/generation/bundle.rs
//! Exporter that collects rendered slide images into a directory bundle with a manifest.

use async_trait::async_trait;
use serde_json::json;

use super::provider::DocumentExporter;
use super::types::{ExportArtifact, ExportOptions, ExportPage, GenerationError, RenderedPage};
use crate::storage::FileStore;

pub struct BundleExporter {
    store: FileStore,
}

impl BundleExporter {
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }

    fn category(options: &ExportOptions) -> String {
        format!("exports-{}", options.file_name)
    }
}

#[async_trait]
impl DocumentExporter for BundleExporter {
    async fn render_page(
        &self,
        page: &ExportPage,
        options: &ExportOptions,
    ) -> Result<RenderedPage, GenerationError> {
        let bytes = tokio::fs::read(&page.image_path).await?;
        let extension = page
            .image_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png");
        let stem = format!("{:03}-{}", page.index + 1, page.page_id);
        let asset = self
            .store
            .save(&options.owner_id, &Self::category(options), &stem, extension, &bytes)
            .await?;
        Ok(RenderedPage {
            page_id: page.page_id.clone(),
            index: page.index,
            path: asset.path,
        })
    }

    async fn assemble(
        &self,
        mut pages: Vec<RenderedPage>,
        options: &ExportOptions,
    ) -> Result<ExportArtifact, GenerationError> {
        pages.sort_by_key(|p| p.index);
        let manifest = json!({
            "file_name": options.file_name,
            "editable": options.editable,
            "max_depth": options.max_depth,
            "pages": pages,
        });
        let bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        let asset = self
            .store
            .save(&options.owner_id, &Self::category(options), "manifest", "json", &bytes)
            .await?;
        Ok(ExportArtifact {
            path: asset.path,
            url: asset.url,
            page_count: pages.len(),
        })
    }
}
