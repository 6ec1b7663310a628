//! Pan/zoom state for cross-checking the source photo.
//!
//! Pure view math: a scale clamped to `[0.5, 5.0]` and a 2D translation.

use serde::{Deserialize, Serialize};

pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 5.0;
/// Step for the discrete zoom buttons.
pub const ZOOM_STEP: f64 = 0.5;
/// Step per wheel tick with a modifier key held.
pub const WHEEL_STEP: f64 = 0.1;

const TRANSITION: &str = "transform 0.1s ease-out";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// User input to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ViewerAction {
    ZoomIn,
    ZoomOut,
    Reset,
    /// Wheel tick; ignored unless a modifier (ctrl/meta) is held.
    #[serde(rename_all = "camelCase")]
    Wheel { delta_y: f64, modifier: bool },
    DragStart { x: f64, y: f64 },
    DragMove { x: f64, y: f64 },
    /// Pointer release or pointer leaving the canvas.
    DragEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    scale: f64,
    position: Point,
    dragging: bool,
    /// Pointer position minus translation at drag start.
    drag_anchor: Point,
}

/// Serializable render parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerSnapshot {
    pub scale: f64,
    pub position: Point,
    pub dragging: bool,
    pub zoom_label: String,
    pub transform: String,
    pub transition: String,
}

fn clamp_scale(scale: f64) -> f64 {
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

impl ViewerState {
    pub fn new() -> Self {
        Self {
            scale: 1.0,
            position: Point::default(),
            dragging: false,
            drag_anchor: Point::default(),
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn zoom_in(&mut self) {
        self.scale = clamp_scale(self.scale + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.scale = clamp_scale(self.scale - ZOOM_STEP);
    }

    /// Returns whether the tick was consumed (modifier held).
    pub fn wheel(&mut self, delta_y: f64, modifier: bool) -> bool {
        if !modifier {
            return false;
        }
        let delta = if delta_y > 0.0 { -WHEEL_STEP } else { WHEEL_STEP };
        self.scale = clamp_scale(self.scale + delta);
        true
    }

    pub fn reset(&mut self) {
        self.scale = 1.0;
        self.position = Point::default();
    }

    pub fn drag_start(&mut self, x: f64, y: f64) {
        self.dragging = true;
        self.drag_anchor = Point {
            x: x - self.position.x,
            y: y - self.position.y,
        };
    }

    pub fn drag_move(&mut self, x: f64, y: f64) {
        if self.dragging {
            self.position = Point {
                x: x - self.drag_anchor.x,
                y: y - self.drag_anchor.y,
            };
        }
    }

    pub fn drag_end(&mut self) {
        self.dragging = false;
    }

    pub fn apply(&mut self, action: ViewerAction) {
        match action {
            ViewerAction::ZoomIn => self.zoom_in(),
            ViewerAction::ZoomOut => self.zoom_out(),
            ViewerAction::Reset => self.reset(),
            ViewerAction::Wheel { delta_y, modifier } => {
                self.wheel(delta_y, modifier);
            }
            ViewerAction::DragStart { x, y } => self.drag_start(x, y),
            ViewerAction::DragMove { x, y } => self.drag_move(x, y),
            ViewerAction::DragEnd => self.drag_end(),
        }
    }

    /// Zoom percentage, e.g. `"150%"`.
    pub fn zoom_label(&self) -> String {
        format!("{}%", (self.scale * 100.0).round() as i64)
    }

    pub fn transform(&self) -> String {
        format!(
            "translate({}px, {}px) scale({})",
            self.position.x, self.position.y, self.scale
        )
    }

    /// No animation while dragging so the image tracks the pointer.
    pub fn transition(&self) -> &'static str {
        if self.dragging {
            "none"
        } else {
            TRANSITION
        }
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        ViewerSnapshot {
            scale: self.scale,
            position: self.position,
            dragging: self.dragging,
            zoom_label: self.zoom_label(),
            transform: self.transform(),
            transition: self.transition().to_string(),
        }
    }
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::new()
    }
}
