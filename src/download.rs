/// Photo downloads
///
/// Copies a photo's original file into the user's download directory, named
/// after the photo title. Existing files are never overwritten; a numbered
/// suffix is added instead.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::error::{GalleryError, Result};

/// Get the directory downloads are saved to
/// Returns ~/Downloads on most desktops, the home directory otherwise
pub fn default_download_dir() -> Option<PathBuf> {
    dirs::download_dir().or_else(dirs::home_dir)
}

/// Copy `source` into `dest_dir` as `<title>.<ext>` and return the new path.
pub async fn save_copy(source: &Path, dest_dir: &Path, title: &str) -> Result<PathBuf> {
    if !fs::try_exists(source).await.unwrap_or(false) {
        return Err(GalleryError::MissingSource(source.to_path_buf()));
    }

    fs::create_dir_all(dest_dir).await?;

    let extension = source
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "jpg".to_string());
    let stem = file_stem_for(title);

    let mut target = dest_dir.join(format!("{}.{}", stem, extension));
    let mut n = 1;
    while fs::try_exists(&target).await? {
        target = dest_dir.join(format!("{} ({}).{}", stem, n, extension));
        n += 1;
    }

    fs::copy(source, &target).await?;
    info!(source = %source.display(), target = %target.display(), "Photo downloaded");
    Ok(target)
}

/// Turn a title into a safe file stem
fn file_stem_for(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "photo".to_string()
    } else {
        cleaned.to_string()
    }
}
