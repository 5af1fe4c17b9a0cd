/// Viewport and panel geometry for the floating viewer.

use cgmath::Vector2;

/// Top-left position or pointer location, in logical pixels
pub type Point = Vector2<f32>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelSize {
    pub width: f32,
    pub height: f32,
}

/// Caps applied to the panel regardless of viewport size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelLimits {
    pub max_width: f32,
    pub max_height: f32,
    /// Height of the draggable strip at the top of the panel
    pub handle_height: f32,
}

impl Default for PanelLimits {
    fn default() -> Self {
        Self {
            max_width: 600.0,
            max_height: 720.0,
            handle_height: 64.0,
        }
    }
}

/// Share of the viewport the panel may occupy on each axis
const VIEWPORT_FRACTION: f32 = 0.9;

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub origin: Point,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.origin.x
            && p.x <= self.origin.x + self.width
            && p.y >= self.origin.y
            && p.y <= self.origin.y + self.height
    }
}

/// `min(90% of viewport, max)` on each axis
pub fn panel_size(viewport: Viewport, limits: &PanelLimits) -> PanelSize {
    PanelSize {
        width: (viewport.width * VIEWPORT_FRACTION).min(limits.max_width),
        height: (viewport.height * VIEWPORT_FRACTION).min(limits.max_height),
    }
}

/// Position that centers the panel in the viewport
pub fn centered(viewport: Viewport, size: PanelSize) -> Point {
    Point::new(
        ((viewport.width - size.width) / 2.0).max(0.0),
        ((viewport.height - size.height) / 2.0).max(0.0),
    )
}

/// Keep the whole panel inside the viewport
pub fn clamp(position: Point, viewport: Viewport, size: PanelSize) -> Point {
    let max_x = (viewport.width - size.width).max(0.0);
    let max_y = (viewport.height - size.height).max(0.0);
    Point::new(position.x.clamp(0.0, max_x), position.y.clamp(0.0, max_y))
}
