/// Multi-tier preview cache
///
/// Every photo can be served at three delivery profiles:
/// - Placeholder: 64px, blurred (shown instantly)
/// - Low quality: 480px (grid and first paint in the viewer)
/// - High quality: 1280px (final viewer image)
///
/// All three tiers are generated in a single pass from one decode.
/// Until they exist, a photo is served directly from its source file and
/// progressive staging is switched off for it.

use async_trait::async_trait;
use image::imageops::FilterType;
use image::ImageFormat;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tokio::task;
use tracing::{debug, info};

use super::loader::{ImageLoader, LoadedImage};
use crate::error::LoadError;

/// Delivery profile for a single image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    Placeholder,
    LowQuality,
    HighQuality,
}

impl Profile {
    pub const ALL: [Profile; 3] = [Profile::Placeholder, Profile::LowQuality, Profile::HighQuality];

    /// Target width in pixels
    pub fn width(self) -> u32 {
        match self {
            Profile::Placeholder => 64,
            Profile::LowQuality => 480,
            Profile::HighQuality => 1280,
        }
    }

    fn dir_name(self) -> &'static str {
        match self {
            Profile::Placeholder => "placeholder",
            Profile::LowQuality => "low",
            Profile::HighQuality => "high",
        }
    }
}

/// The three URLs the stage controller walks through, plus whether the
/// tiered delivery path is active for this image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageUrls {
    pub placeholder: String,
    pub low: String,
    pub high: String,
    pub cdn_active: bool,
}

impl StageUrls {
    /// Serve a single reference at every stage, with progressive mode off
    pub fn direct(reference: impl Into<String>) -> Self {
        let reference = reference.into();
        Self {
            placeholder: reference.clone(),
            low: reference.clone(),
            high: reference,
            cdn_active: false,
        }
    }
}

/// Builds fetchable URLs for a local image reference.
pub trait UrlBuilder: Send + Sync {
    /// URL of `reference` at the given profile
    fn url_for(&self, reference: &str, profile: Profile) -> String;

    /// Whether the tiered path is active for `reference`
    fn is_active(&self, reference: &str) -> bool;

    fn stage_urls(&self, reference: &str) -> StageUrls {
        if !self.is_active(reference) {
            return StageUrls::direct(self.url_for(reference, Profile::HighQuality));
        }
        StageUrls {
            placeholder: self.url_for(reference, Profile::Placeholder),
            low: self.url_for(reference, Profile::LowQuality),
            high: self.url_for(reference, Profile::HighQuality),
            cdn_active: true,
        }
    }
}

/// Generates and serves resized tiers from a local cache directory
#[derive(Debug, Clone)]
pub struct TierCache {
    source_root: PathBuf,
    cache_root: PathBuf,
}

impl TierCache {
    pub fn new(source_root: impl Into<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            cache_root: cache_root.into(),
        }
    }

    /// Get the default tier cache directory
    /// Returns ~/.cache/memoir-gallery/tiers on Linux
    pub fn default_cache_root() -> Option<PathBuf> {
        let mut path = dirs::cache_dir().or_else(dirs::home_dir)?;
        path.push("memoir-gallery");
        path.push("tiers");
        Some(path)
    }

    /// Path of the original file for a reference
    pub fn source_path(&self, reference: &str) -> PathBuf {
        self.source_root.join(reference.trim_start_matches('/'))
    }

    /// Path a tier is stored at (doesn't generate, just returns the expected path)
    pub fn tier_path(&self, reference: &str, profile: Profile) -> PathBuf {
        self.cache_root
            .join(profile.dir_name())
            .join(tier_key(reference))
    }

    /// Check whether all three tiers exist for a reference
    pub fn has_tiers(&self, reference: &str) -> bool {
        Profile::ALL
            .iter()
            .all(|&profile| self.tier_path(reference, profile).exists())
    }

    /// Process one source image and write all three tiers.
    ///
    /// Returns the stage URLs with the tiered path active.
    pub fn process_image(&self, reference: &str) -> Result<StageUrls, LoadError> {
        let source = self.source_path(reference);
        let img = image::open(&source).map_err(|e| LoadError::Decode {
            url: source.display().to_string(),
            reason: e.to_string(),
        })?;

        debug!(reference, width = img.width(), height = img.height(), "Decoded source");

        for profile in Profile::ALL {
            self.generate_tier(&img, reference, profile)?;
        }

        info!(reference, "Generated 3 preview tiers");
        Ok(self.stage_urls(reference))
    }

    /// Make sure tiers exist and report the high quality tier.
    /// Runs on the calling thread; use `ensure_tiers` or `load` from async code.
    pub fn warm(&self, reference: &str) -> Result<LoadedImage, LoadError> {
        let urls = if self.has_tiers(reference) {
            self.stage_urls(reference)
        } else {
            self.process_image(reference)?
        };

        let (width, height) = image::image_dimensions(&urls.high).map_err(|e| LoadError::Decode {
            url: urls.high.clone(),
            reason: e.to_string(),
        })?;

        Ok(LoadedImage {
            url: urls.high,
            width,
            height,
        })
    }

    /// Generate tiers on a blocking worker, skipping work if they already exist
    pub async fn ensure_tiers(&self, reference: String) -> Result<StageUrls, LoadError> {
        if self.has_tiers(&reference) {
            return Ok(self.stage_urls(&reference));
        }

        let cache = self.clone();
        task::spawn_blocking(move || cache.process_image(&reference))
            .await
            .map_err(|e| LoadError::Join(e.to_string()))?
    }

    /// Generate a single tier by resizing and saving
    fn generate_tier(
        &self,
        img: &image::DynamicImage,
        reference: &str,
        profile: Profile,
    ) -> Result<PathBuf, LoadError> {
        let tier_error = |reason: String| LoadError::Tier {
            tier: profile.dir_name().to_string(),
            source_ref: reference.to_string(),
            reason,
        };

        let target = profile.width();
        // Resize maintaining aspect ratio (width-constrained), never upscale
        let mut resized = if img.width() > target {
            img.resize(target, target * 10, FilterType::Lanczos3)
        } else {
            img.clone()
        };
        if profile == Profile::Placeholder {
            resized = resized.blur(1.5);
        }

        let path = self.tier_path(reference, profile);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| tier_error(e.to_string()))?;
        }

        // Write aside and rename, so a half-written tier never counts as present.
        // JPEG has no alpha channel
        let partial = path.with_extension("jpg.part");
        image::DynamicImage::ImageRgb8(resized.to_rgb8())
            .save_with_format(&partial, ImageFormat::Jpeg)
            .map_err(|e| tier_error(e.to_string()))?;
        fs::rename(&partial, &path).map_err(|e| tier_error(e.to_string()))?;

        debug!(reference, px = target, path = %path.display(), "Wrote tier");
        Ok(path)
    }
}

impl UrlBuilder for TierCache {
    fn url_for(&self, reference: &str, profile: Profile) -> String {
        let path = self.tier_path(reference, profile);
        if path.exists() {
            path.to_string_lossy().to_string()
        } else {
            self.source_path(reference).to_string_lossy().to_string()
        }
    }

    fn is_active(&self, reference: &str) -> bool {
        self.has_tiers(reference)
    }
}

/// Prefetching a reference means generating its tiers; the loaded image is
/// the high quality tier the viewer will request.
#[async_trait]
impl ImageLoader for TierCache {
    async fn load(&self, reference: &str) -> Result<LoadedImage, LoadError> {
        let cache = self.clone();
        let reference = reference.to_string();
        task::spawn_blocking(move || cache.warm(&reference))
            .await
            .map_err(|e| LoadError::Join(e.to_string()))?
    }
}

/// Relative tier file for a reference: "/images/trips/lake.png" becomes
/// "images/trips/lake.png.jpg". The full source path and extension are kept,
/// so distinct sources never share a tier. Only plain path segments survive.
fn tier_key(reference: &str) -> PathBuf {
    let mut key: PathBuf = Path::new(reference)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();

    let file = key
        .file_name()
        .map(|name| format!("{}.jpg", name.to_string_lossy()))
        .unwrap_or_else(|| "unnamed.jpg".to_string());
    key.set_file_name(file);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_key() {
        assert_eq!(tier_key("images/telephonenom.jpg"), PathBuf::from("images/telephonenom.jpg.jpg"));
        assert_eq!(tier_key("/images/trips/lake.webp"), PathBuf::from("images/trips/lake.webp.jpg"));
        assert_eq!(tier_key("loose"), PathBuf::from("loose.jpg"));
        assert_eq!(tier_key("../../etc/x.png"), PathBuf::from("etc/x.png.jpg"));
    }

    #[test]
    fn test_distinct_sources_never_share_tiers() {
        let source = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        std::fs::create_dir(source.path().join("trips")).unwrap();
        image::RgbImage::new(300, 100)
            .save(source.path().join("trips").join("lake.png"))
            .unwrap();
        image::RgbImage::new(100, 300)
            .save(source.path().join("trips_lake.png"))
            .unwrap();
        image::RgbImage::new(50, 50)
            .save(source.path().join("a.png"))
            .unwrap();

        let tiers = TierCache::new(source.path(), cache.path());
        for profile in Profile::ALL {
            assert_ne!(
                tiers.tier_path("trips/lake.png", profile),
                tiers.tier_path("trips_lake.png", profile)
            );
            assert_ne!(tiers.tier_path("a.jpg", profile), tiers.tier_path("a.png", profile));
        }

        tiers.process_image("trips/lake.png").unwrap();
        tiers.process_image("a.png").unwrap();
        assert!(!tiers.has_tiers("trips_lake.png"));
        assert!(!tiers.has_tiers("a.jpg"));

        let other = tiers.process_image("trips_lake.png").unwrap();
        let high = image::open(&other.high).unwrap();
        assert_eq!((high.width(), high.height()), (100, 300));
    }

    #[tokio::test]
    async fn test_load_warms_the_viewer_url() {
        let source = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        image::RgbImage::new(2000, 1000)
            .save(source.path().join("big.png"))
            .unwrap();

        let tiers = TierCache::new(source.path(), cache.path());
        assert!(!tiers.stage_urls("big.png").cdn_active);

        let loaded = tiers.load("big.png").await.unwrap();
        assert_eq!((loaded.width, loaded.height), (1280, 640));

        let urls = tiers.ensure_tiers("big.png".to_string()).await.unwrap();
        assert!(urls.cdn_active);
        assert_eq!(loaded.url, urls.high);
        assert_eq!(loaded.url, tiers.stage_urls("big.png").high);
    }

    #[test]
    fn test_direct_when_no_tiers() {
        let source = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        let tiers = TierCache::new(source.path(), cache.path());

        let urls = tiers.stage_urls("images/a.jpg");
        assert!(!urls.cdn_active);
        assert_eq!(urls.placeholder, urls.high);
        assert!(urls.high.ends_with("a.jpg"));
    }

    #[test]
    fn test_process_image_writes_all_tiers() {
        let source = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        std::fs::create_dir(source.path().join("images")).unwrap();
        image::RgbImage::from_pixel(2000, 1000, image::Rgb([120, 80, 40]))
            .save(source.path().join("images").join("wide.png"))
            .unwrap();

        let tiers = TierCache::new(source.path(), cache.path());
        let urls = tiers.process_image("images/wide.png").unwrap();

        assert!(urls.cdn_active);
        assert!(tiers.has_tiers("images/wide.png"));

        let low = image::open(tiers.tier_path("images/wide.png", Profile::LowQuality)).unwrap();
        assert_eq!(low.width(), 480);
        assert_eq!(low.height(), 240);

        let placeholder = image::open(&urls.placeholder).unwrap();
        assert_eq!(placeholder.width(), 64);
    }

    #[test]
    fn test_small_source_not_upscaled() {
        let source = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        image::RgbImage::new(100, 50)
            .save(source.path().join("small.png"))
            .unwrap();

        let tiers = TierCache::new(source.path(), cache.path());
        tiers.process_image("small.png").unwrap();

        let high = image::open(tiers.tier_path("small.png", Profile::HighQuality)).unwrap();
        assert_eq!(high.width(), 100);
    }

    #[tokio::test]
    async fn test_ensure_tiers_missing_source() {
        let source = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        let tiers = TierCache::new(source.path(), cache.path());

        let result = tiers.ensure_tiers("missing.jpg".to_string()).await;
        assert!(matches!(result, Err(LoadError::Decode { .. })));
    }
}
