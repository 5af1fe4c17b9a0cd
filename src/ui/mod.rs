/// Gallery widgets
///
/// - Sort toolbar, thumbnail grid and footer (grid.rs)
/// - Floating viewer panel and its backdrop (panel.rs)

pub mod grid;
pub mod panel;
