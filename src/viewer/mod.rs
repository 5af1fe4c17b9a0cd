/// Floating viewer module
///
/// - Panel sizing, centering and clamping math (geometry.rs)
/// - Open/close lifecycle, drag and keyboard navigation (controller.rs)

pub mod controller;
pub mod geometry;

pub use controller::{Interaction, Key, ViewerController, ViewerInput, ViewerOutcome, ViewerState};
pub use geometry::{PanelLimits, PanelSize, Point, Rect, Viewport};

use crate::config::ViewerSettings;

impl From<&ViewerSettings> for PanelLimits {
    fn from(settings: &ViewerSettings) -> Self {
        Self {
            max_width: settings.max_panel_width,
            max_height: settings.max_panel_height,
            handle_height: settings.handle_height,
        }
    }
}
