/// State management module
///
/// This module handles the gallery's data, including:
/// - Loading the static gallery file (library.rs)
/// - Shared data structures and sort orders (data.rs)

pub mod library;
pub mod data;

pub use data::{Photo, Season, SortOrder};
pub use library::Library;
