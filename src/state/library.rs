use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::data::{Photo, SortOrder};
use crate::error::{GalleryError, Result};

/// The Library holds the photos read from the static gallery file.
/// It is read-only: views are re-sorted copies, the source list never changes.
pub struct Library {
    photos: Vec<Photo>,
    source_path: Option<PathBuf>,
}

impl Library {
    /// Load the gallery from a JSON file containing an array of photos.
    pub fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut library = Self::from_json(&text)?;
        library.source_path = Some(path.to_path_buf());

        info!(path = %path.display(), photos = library.len(), "Gallery loaded");
        Ok(library)
    }

    /// Parse a gallery from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let photos: Vec<Photo> = serde_json::from_str(json)?;
        Self::from_photos(photos)
    }

    /// Build a library from already-parsed photos, rejecting duplicate ids
    pub fn from_photos(photos: Vec<Photo>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(photos.len());
        for photo in &photos {
            if !seen.insert(photo.id) {
                return Err(GalleryError::DuplicateId(photo.id));
            }
        }

        Ok(Library {
            photos,
            source_path: None,
        })
    }

    /// An empty gallery, used when no data file is available
    pub fn empty() -> Self {
        Library {
            photos: Vec::new(),
            source_path: None,
        }
    }

    /// Get the path the gallery was loaded from, if any
    pub fn path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    /// Photos in source file order
    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    /// Look up a photo by id
    pub fn get(&self, id: u64) -> Option<&Photo> {
        self.photos.iter().find(|p| p.id == id)
    }

    /// Get all photos in display order.
    /// Returns a new vector; the library itself is never reordered.
    pub fn sorted(&self, order: SortOrder) -> Vec<Photo> {
        let mut photos = self.photos.clone();
        photos.sort_by(|a, b| order.compare(a, b));
        debug!(?order, count = photos.len(), "Sorted gallery view");
        photos
    }

    /// The first `count` photos in display order.
    /// These are the candidates the prefetch scheduler warms up.
    pub fn top(&self, order: SortOrder, count: usize) -> Vec<Photo> {
        let mut photos = self.sorted(order);
        photos.truncate(count);
        photos
    }
}

// Implement Debug without dumping every photo
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("source_path", &self.source_path)
            .field("photos", &self.photos.len())
            .finish()
    }
}
