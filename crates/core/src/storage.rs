// crates/core/src/storage.rs
//! On-disk asset store for generated images and exports.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// A file written by the store plus the url the HTTP layer serves it under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredAsset {
    pub path: PathBuf,
    pub url: String,
}

/// Lays files out as `<root>/<owner>/<category>/<file>`, served at `/files/...`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self, owner_id: &str, category: &str) -> PathBuf {
        self.root.join(file_component(owner_id)).join(file_component(category))
    }

    pub fn url_for(&self, owner_id: &str, category: &str, file_name: &str) -> String {
        format!(
            "/files/{}/{}/{}",
            file_component(owner_id),
            file_component(category),
            file_component(file_name)
        )
    }

    /// Writes `bytes` as `<file_stem>.<extension>`, replacing any previous file.
    pub async fn save(
        &self,
        owner_id: &str,
        category: &str,
        file_stem: &str,
        extension: &str,
        bytes: &[u8],
    ) -> std::io::Result<StoredAsset> {
        let dir = self.category_dir(owner_id, category);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", file_component(file_stem), file_component(extension));
        let path = dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "stored asset");

        Ok(StoredAsset {
            url: self.url_for(owner_id, category, &file_name),
            path,
        })
    }

    /// Like [`FileStore::resolve_url`], but only for urls under `owner_id`.
    pub fn resolve_owned_url(&self, owner_id: &str, url: &str) -> Option<PathBuf> {
        let owner = url.strip_prefix("/files/")?.split('/').next()?;
        if owner != file_component(owner_id) {
            return None;
        }
        self.resolve_url(url)
    }

    /// Maps a `/files/...` url back to its path under the root.
    pub fn resolve_url(&self, url: &str) -> Option<PathBuf> {
        let rest = url.strip_prefix("/files/")?;
        let mut path = self.root.clone();
        for part in rest.split('/') {
            if part.is_empty() || part == "." || part == ".." {
                return None;
            }
            path.push(part);
        }
        Some(path)
    }
}

/// The path component the store writes for `component`.
///
/// Keeps a conservative character set, so distinct inputs can map to the
/// same component.
pub fn file_component(component: &str) -> String {
    let cleaned: String = component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match cleaned.trim_matches('.') {
        "" => "_".to_string(),
        s => s.to_string(),
    }
}
