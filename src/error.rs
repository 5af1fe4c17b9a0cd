/// Error types for the gallery.
///
/// Nothing here is fatal to the host: load errors degrade to a placeholder,
/// prefetch errors are counted and logged, config errors fall back to defaults.

use thiserror::Error;

/// Top-level error type for gallery operations.
#[derive(Error, Debug)]
pub enum GalleryError {
    /// Reading the gallery file or copying a photo failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The gallery file is not valid JSON for the photo schema
    #[error("Invalid gallery file: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two photos share the same id
    #[error("Duplicate photo id: {0}")]
    DuplicateId(u64),

    /// A photo's original file is gone
    #[error("Original file not found: {}", .0.display())]
    MissingSource(std::path::PathBuf),
}

/// Errors raised while fetching or decoding a single image.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Nothing exists at the given location
    #[error("Image not found: {0}")]
    NotFound(String),

    /// The bytes were read but could not be decoded
    #[error("Failed to decode {url}: {reason}")]
    Decode { url: String, reason: String },

    /// Reading the bytes failed
    #[error("Failed to read {url}: {reason}")]
    Io { url: String, reason: String },

    /// A preview tier could not be produced
    #[error("Failed to build {tier} tier for {source_ref}: {reason}")]
    Tier {
        tier: String,
        source_ref: String,
        reason: String,
    },

    /// The blocking worker was cancelled or panicked
    #[error("Task join error: {0}")]
    Join(String),
}

/// Errors from loading `config.toml`.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for the settings schema
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors from a single prefetch item.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrefetchError {
    /// The underlying fetch failed
    #[error("Failed to prefetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: LoadError,
    },

    /// The hint expired before the fetch resolved
    #[error("Prefetch of {url} timed out after {timeout_ms}ms")]
    TimedOut { url: String, timeout_ms: u64 },
}

pub type Result<T, E = GalleryError> = std::result::Result<T, E>;
