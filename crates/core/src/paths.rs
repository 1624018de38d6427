//! Centralized path functions for all app storage locations.

use std::path::PathBuf;

/// App data root: `~/Library/Application Support/slidegen/` (macOS) or `~/.local/share/slidegen/` (Linux).
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("slidegen"))
}

/// SQLite database file: `<app_data_dir>/slidegen.db`.
pub fn db_path() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join("slidegen.db"))
}

/// Generated assets (page images, previews, exports): `<app_data_dir>/uploads/`.
pub fn uploads_dir() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join("uploads"))
}
