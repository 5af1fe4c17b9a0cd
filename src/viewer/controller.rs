/// Floating viewer controller.
///
/// Owns the panel position and the current index into the displayed list.
/// The host translates platform events into [`ViewerInput`] and reacts to the
/// returned [`ViewerOutcome`]; the controller never talks to the platform.

use tracing::debug;

use super::geometry::{self, PanelLimits, PanelSize, Point, Rect, Viewport};

/// Whether the pointer is dragging the panel while it is open
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interaction {
    Idle,
    Dragging { last: Point },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerState {
    Closed,
    Opening,
    Open(Interaction),
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Escape,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerInput {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp,
    Key(Key),
    Resize(Viewport),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerOutcome {
    Ignored,
    DragStarted,
    Moved(Point),
    DragEnded,
    /// The displayed item changed to this index
    Navigated(usize),
    /// Closing began; call `finish_closing` once any transition is done
    Closed,
}

#[derive(Debug, Clone)]
pub struct ViewerController {
    state: ViewerState,
    limits: PanelLimits,
    viewport: Viewport,
    size: PanelSize,
    position: Point,
    index: usize,
    len: usize,
    liked: bool,
}

impl ViewerController {
    pub fn new(limits: PanelLimits, viewport: Viewport) -> Self {
        let size = geometry::panel_size(viewport, &limits);
        Self {
            state: ViewerState::Closed,
            limits,
            viewport,
            size,
            position: geometry::centered(viewport, size),
            index: 0,
            len: 0,
            liked: false,
        }
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ViewerState::Open(_))
    }

    /// Open, opening or closing: anything that keeps the overlay on screen
    pub fn is_visible(&self) -> bool {
        self.state != ViewerState::Closed
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, ViewerState::Open(Interaction::Dragging { .. }))
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn panel_size(&self) -> PanelSize {
        self.size
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn liked(&self) -> bool {
        self.liked
    }

    pub fn toggle_like(&mut self) -> bool {
        self.liked = !self.liked;
        self.liked
    }

    pub fn panel_rect(&self) -> Rect {
        Rect {
            origin: self.position,
            width: self.size.width,
            height: self.size.height,
        }
    }

    pub fn handle_rect(&self) -> Rect {
        Rect {
            origin: self.position,
            width: self.size.width,
            height: self.limits.handle_height.min(self.size.height),
        }
    }

    /// Start showing item `index` of a list of `len` items, centered.
    /// Returns false if the viewer is already showing or the index is out of range.
    pub fn open(&mut self, index: usize, len: usize) -> bool {
        if self.state != ViewerState::Closed || index >= len {
            return false;
        }
        self.index = index;
        self.len = len;
        self.liked = false;
        self.size = geometry::panel_size(self.viewport, &self.limits);
        self.position = geometry::centered(self.viewport, self.size);
        self.state = ViewerState::Opening;
        debug!(index, len, "Viewer opening");
        true
    }

    pub fn finish_opening(&mut self) {
        if self.state == ViewerState::Opening {
            self.state = ViewerState::Open(Interaction::Idle);
        }
    }

    pub fn close(&mut self) -> ViewerOutcome {
        match self.state {
            ViewerState::Opening | ViewerState::Open(_) => {
                self.state = ViewerState::Closing;
                debug!(index = self.index, "Viewer closing");
                ViewerOutcome::Closed
            }
            ViewerState::Closed | ViewerState::Closing => ViewerOutcome::Ignored,
        }
    }

    pub fn finish_closing(&mut self) {
        if self.state == ViewerState::Closing {
            self.state = ViewerState::Closed;
        }
    }

    /// Move to the next item; no wraparound
    pub fn next(&mut self) -> Option<usize> {
        if !self.is_open() || self.index + 1 >= self.len {
            return None;
        }
        self.index += 1;
        Some(self.index)
    }

    /// Move to the previous item; no wraparound
    pub fn previous(&mut self) -> Option<usize> {
        if !self.is_open() || self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(self.index)
    }

    /// The displayed list changed (e.g. re-sorted); keep showing `index`
    pub fn relist(&mut self, index: usize, len: usize) {
        if len == 0 {
            self.close();
            return;
        }
        self.len = len;
        self.index = index.min(len - 1);
    }

    pub fn handle(&mut self, input: ViewerInput) -> ViewerOutcome {
        if let ViewerInput::Resize(viewport) = input {
            return self.resize(viewport);
        }

        let interaction = match self.state {
            ViewerState::Open(interaction) => interaction,
            _ => return ViewerOutcome::Ignored,
        };

        match (input, interaction) {
            (ViewerInput::PointerDown(p), Interaction::Idle) => {
                if self.handle_rect().contains(p) {
                    self.state = ViewerState::Open(Interaction::Dragging { last: p });
                    ViewerOutcome::DragStarted
                } else if !self.panel_rect().contains(p) {
                    // Backdrop click
                    self.close()
                } else {
                    ViewerOutcome::Ignored
                }
            }
            (ViewerInput::PointerMove(p), Interaction::Dragging { last }) => {
                let target = self.position + (p - last);
                self.position = geometry::clamp(target, self.viewport, self.size);
                self.state = ViewerState::Open(Interaction::Dragging { last: p });
                ViewerOutcome::Moved(self.position)
            }
            (ViewerInput::PointerUp, Interaction::Dragging { .. }) => {
                self.state = ViewerState::Open(Interaction::Idle);
                ViewerOutcome::DragEnded
            }
            (ViewerInput::Key(Key::Escape), _) => self.close(),
            (ViewerInput::Key(Key::ArrowRight), _) => {
                self.next().map_or(ViewerOutcome::Ignored, ViewerOutcome::Navigated)
            }
            (ViewerInput::Key(Key::ArrowLeft), _) => {
                self.previous().map_or(ViewerOutcome::Ignored, ViewerOutcome::Navigated)
            }
            _ => ViewerOutcome::Ignored,
        }
    }

    /// Recompute size and centered position; only visible viewers move
    fn resize(&mut self, viewport: Viewport) -> ViewerOutcome {
        self.viewport = viewport;
        match self.state {
            ViewerState::Opening | ViewerState::Open(_) => {
                self.size = geometry::panel_size(viewport, &self.limits);
                self.position = geometry::centered(viewport, self.size);
                if self.is_dragging() {
                    self.state = ViewerState::Open(Interaction::Idle);
                }
                ViewerOutcome::Moved(self.position)
            }
            ViewerState::Closed | ViewerState::Closing => ViewerOutcome::Ignored,
        }
    }
}
