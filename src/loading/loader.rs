/// Image loader
///
/// The stage controller and the prefetch cache only need to know whether an
/// image at a URL can be fetched and decoded. This module defines that seam
/// and the native implementation that reads from disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::task;
use tracing::{debug, warn};

use crate::error::LoadError;

/// A successfully fetched and decoded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Capability to fetch an image by URL.
///
/// Resolves once the image is fully available, or fails with a [`LoadError`].
/// In-flight loads are never aborted by callers; they simply stop listening.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<LoadedImage, LoadError>;
}

/// Loads images from the local filesystem.
///
/// URLs are plain paths or `file://` URLs. Relative paths resolve against
/// `root`, the same way the web build served them from its public directory.
#[derive(Debug, Clone)]
pub struct FsImageLoader {
    root: PathBuf,
}

impl FsImageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a URL onto a filesystem path.
    /// Paths that already exist as given are used directly.
    pub fn resolve(&self, url: &str) -> PathBuf {
        let trimmed = url.strip_prefix("file://").unwrap_or(url);
        let path = Path::new(trimmed);
        if path.exists() {
            return path.to_path_buf();
        }
        self.root.join(trimmed.trim_start_matches('/'))
    }
}

#[async_trait]
impl ImageLoader for FsImageLoader {
    async fn load(&self, url: &str) -> Result<LoadedImage, LoadError> {
        let path = self.resolve(url);
        let url = url.to_string();

        // Spawn blocking because decoding is CPU-intensive
        let result = task::spawn_blocking(move || load_blocking(&path, url))
            .await
            .map_err(|e| LoadError::Join(e.to_string()))?;

        if let Err(error) = &result {
            warn!(%error, "Image load failed");
        }
        result
    }
}

/// Blocking implementation of image loading
fn load_blocking(path: &Path, url: String) -> Result<LoadedImage, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(url));
    }

    let bytes = std::fs::read(path).map_err(|e| LoadError::Io {
        url: url.clone(),
        reason: e.to_string(),
    })?;

    let img = image::load_from_memory(&bytes).map_err(|e| LoadError::Decode {
        url: url.clone(),
        reason: e.to_string(),
    })?;

    debug!(url = %url, width = img.width(), height = img.height(), "Loaded image");

    Ok(LoadedImage {
        url,
        width: img.width(),
        height: img.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_existing_image() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbImage::new(8, 6)
            .save(dir.path().join("tiny.png"))
            .unwrap();

        let loader = FsImageLoader::new(dir.path());
        let loaded = loader.load("tiny.png").await.unwrap();
        assert_eq!((loaded.width, loaded.height), (8, 6));
        assert_eq!(loaded.url, "tiny.png");
    }

    #[tokio::test]
    async fn test_leading_slash_resolves_under_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("images")).unwrap();
        image::RgbImage::new(2, 2)
            .save(dir.path().join("images").join("a.png"))
            .unwrap();

        let loader = FsImageLoader::new(dir.path());
        assert!(loader.load("/images/a.png").await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FsImageLoader::new(dir.path());
        let result = loader.load("nope.jpg").await;
        assert_eq!(result, Err(LoadError::NotFound("nope.jpg".to_string())));
    }

    #[tokio::test]
    async fn test_undecodable_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.jpg"), b"not an image").unwrap();

        let loader = FsImageLoader::new(dir.path());
        let result = loader.load("broken.jpg").await;
        assert!(matches!(result, Err(LoadError::Decode { .. })));
    }
}
