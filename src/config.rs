/// Settings loaded from `config.toml`.
///
/// The file lives in the user's config directory:
/// - Linux: ~/.config/memoir-gallery/config.toml
/// - macOS: ~/Library/Application Support/memoir-gallery/config.toml
/// - Windows: %APPDATA%\memoir-gallery\config.toml
///
/// Every field has a default, so a missing file or a partial file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::prefetch::network::EffectiveType;

/// Top-level settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    pub gallery: GallerySettings,
    pub loading: LoadingSettings,
    pub prefetch: PrefetchSettings,
    pub network: NetworkSettings,
    pub viewer: ViewerSettings,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GallerySettings {
    /// Path to the static gallery JSON file
    pub data_path: PathBuf,
    /// Directory that relative photo references resolve against
    pub image_root: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoadingSettings {
    /// Allow placeholder -> low -> high staging when tiers are available
    pub progressive: bool,
    /// How long the low quality stage stays visible before the high load starts
    pub low_quality_dwell_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PrefetchSettings {
    pub enabled: bool,
    /// Dwell on the page before the engagement timer fires
    pub engagement_time_ms: u64,
    /// Scroll offset in pixels that counts as engagement
    pub scroll_threshold_px: f32,
    /// Lookahead margin around the viewport for the near-view trigger
    pub near_view_margin_px: f32,
    /// Upper bound requested by the gallery, further capped by network policy
    pub max_images: usize,
    /// Hints are released after this long regardless of outcome
    pub hint_timeout_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct NetworkSettings {
    /// Effective connection type, e.g. "3g". Unset means unknown.
    pub effective_type: Option<EffectiveType>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ViewerSettings {
    pub max_panel_width: f32,
    pub max_panel_height: f32,
    /// Height of the draggable header strip
    pub handle_height: f32,
    /// Initial window size, also the viewport before the first resize event
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            gallery: GallerySettings::default(),
            loading: LoadingSettings::default(),
            prefetch: PrefetchSettings::default(),
            network: NetworkSettings::default(),
            viewer: ViewerSettings::default(),
        }
    }
}

impl Default for GallerySettings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/gallery.json"),
            image_root: PathBuf::from("public"),
        }
    }
}

impl Default for LoadingSettings {
    fn default() -> Self {
        Self {
            progressive: true,
            low_quality_dwell_ms: 100,
        }
    }
}

impl Default for PrefetchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            engagement_time_ms: 3000,
            scroll_threshold_px: 100.0,
            near_view_margin_px: 200.0,
            max_images: 12,
            hint_timeout_ms: 30_000,
        }
    }
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            max_panel_width: 600.0,
            max_panel_height: 720.0,
            handle_height: 64.0,
            window_width: 1280.0,
            window_height: 800.0,
        }
    }
}

impl LoadingSettings {
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.low_quality_dwell_ms)
    }
}

impl PrefetchSettings {
    pub fn engagement_time(&self) -> Duration {
        Duration::from_millis(self.engagement_time_ms)
    }

    pub fn hint_timeout(&self) -> Duration {
        Duration::from_millis(self.hint_timeout_ms)
    }
}

impl Settings {
    /// Get the path where the config file is expected
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
        path.push("memoir-gallery");
        path.push("config.toml");
        Some(path)
    }

    /// Load settings from the default location, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load settings from a specific file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.prefetch.scroll_threshold_px < 0.0 {
            return Err(ConfigError::Invalid {
                field: "prefetch.scroll_threshold_px",
                reason: "must not be negative".to_string(),
            });
        }
        if self.prefetch.near_view_margin_px < 0.0 {
            return Err(ConfigError::Invalid {
                field: "prefetch.near_view_margin_px",
                reason: "must not be negative".to_string(),
            });
        }
        if self.viewer.max_panel_width <= 0.0 || self.viewer.max_panel_height <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "viewer.max_panel_*",
                reason: "panel size must be positive".to_string(),
            });
        }
        if self.viewer.handle_height < 0.0 {
            return Err(ConfigError::Invalid {
                field: "viewer.handle_height",
                reason: "must not be negative".to_string(),
            });
        }
        Ok(())
    }
}
