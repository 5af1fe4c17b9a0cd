//! Memoir Gallery
//!
//! A personal photo gallery: a thumbnail grid with a floating, draggable
//! viewer. The library holds everything the window needs that is not drawing:
//!
//! | Module | Role |
//! |--------|------|
//! | [`state`] | Photo records, the read-only gallery file, sort orders |
//! | [`loading`] | Image loader seam, preview tiers, progressive stage loading |
//! | [`prefetch`] | Network policy, deduplicating cache, engagement-triggered scheduler |
//! | [`viewer`] | Floating viewer geometry, lifecycle, drag and navigation |
//! | [`download`] | Saving a photo's original to the downloads folder |
//! | [`config`] | `config.toml` settings |
//! | [`error`] | Error types |
//! | [`logging`] | Tracing subscriber setup |

pub mod config;
pub mod download;
pub mod error;
pub mod loading;
pub mod logging;
pub mod prefetch;
pub mod state;
pub mod viewer;

pub use config::Settings;
pub use error::{GalleryError, LoadError, PrefetchError};
