/// Image loading module
///
/// This module handles:
/// - Fetching and decoding images behind the `ImageLoader` seam (loader.rs)
/// - Generating placeholder / low / high preview tiers (tiers.rs)
/// - Driving a photo through its progressive load stages (stage.rs)

pub mod loader;
pub mod stage;
pub mod tiers;

pub use loader::{FsImageLoader, ImageLoader, LoadedImage};
pub use stage::{Liveness, LoadState, ProgressiveLoad, Stage, StageRecord};
pub use tiers::{Profile, StageUrls, TierCache, UrlBuilder};
