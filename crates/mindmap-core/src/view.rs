use crate::{NodeId, Vec2};
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 4.0;

/// Canvas-to-screen transform: `screen = canvas * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub zoom: f64,
    pub pan: Vec2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
        }
    }
}

impl ViewTransform {
    pub fn new(zoom: f64, pan: Vec2) -> Self {
        Self { zoom, pan }
    }

    pub fn screen_to_canvas(&self, screen: Vec2) -> Vec2 {
        Vec2::new(
            (screen.x - self.pan.x) / self.zoom,
            (screen.y - self.pan.y) / self.zoom,
        )
    }

    pub fn canvas_to_screen(&self, canvas: Vec2) -> Vec2 {
        canvas * self.zoom + self.pan
    }

    /// Sets the zoom while keeping the canvas point under `anchor` (screen
    /// space) fixed on screen. Zoom is clamped to `[min, max]`.
    pub fn zoom_about(&mut self, anchor: Vec2, zoom: f64, min: f64, max: f64) {
        let zoom = zoom.clamp(min, max);
        if (zoom - self.zoom).abs() <= f64::EPSILON {
            return;
        }
        let canvas = self.screen_to_canvas(anchor);
        self.zoom = zoom;
        self.pan = anchor - canvas * zoom;
    }

    /// Translates so that `canvas` lands on `screen`.
    pub fn center_on(&mut self, canvas: Vec2, screen: Vec2) {
        self.pan = screen - canvas * self.zoom;
    }

    pub fn is_valid(&self) -> bool {
        self.zoom.is_finite() && self.zoom > 0.0 && self.pan.is_finite()
    }
}

/// Which part of the graph is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum GraphMode {
    #[default]
    Global,
    /// Only nodes within `depth` undirected hops of `focus`.
    Local { focus: NodeId, depth: u32 },
}

impl GraphMode {
    pub const DEFAULT_LOCAL_DEPTH: u32 = 2;

    pub fn is_local(&self) -> bool {
        matches!(self, GraphMode::Local { .. })
    }

    pub fn focus(&self) -> Option<&NodeId> {
        match self {
            GraphMode::Global => None,
            GraphMode::Local { focus, .. } => Some(focus),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_canvas_round_trip() {
        let view = ViewTransform::new(2.0, Vec2::new(100.0, 50.0));
        let canvas = view.screen_to_canvas(Vec2::new(300.0, 250.0));
        assert_eq!(canvas, Vec2::new(100.0, 100.0));
        assert_eq!(view.canvas_to_screen(canvas), Vec2::new(300.0, 250.0));
    }

    #[test]
    fn test_zoom_about_keeps_anchor_fixed() {
        let mut view = ViewTransform::new(1.0, Vec2::new(10.0, 20.0));
        let anchor = Vec2::new(200.0, 120.0);
        let before = view.screen_to_canvas(anchor);

        view.zoom_about(anchor, 2.5, MIN_ZOOM, MAX_ZOOM);
        assert_eq!(view.zoom, 2.5);
        let after = view.screen_to_canvas(anchor);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);

        view.zoom_about(anchor, 100.0, MIN_ZOOM, MAX_ZOOM);
        assert_eq!(view.zoom, MAX_ZOOM);
    }
}
