use mindmap_core::{Rect, Size, Vec2, ViewTransform};
use mindmap_events::ZoomDirection;

pub const DEFAULT_SCREEN: Size = Size {
    width: 800.0,
    height: 600.0,
};

/// Screen-space camera over the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    transform: ViewTransform,
    screen: Size,
    padding: f64,
    min_zoom: f64,
    max_zoom: f64,
}

impl Viewport {
    /// Fitting never magnifies past 1:1, so a lone node is centered, not blown up.
    pub const MAX_FIT_ZOOM: f64 = 1.0;

    pub fn new(screen: Size, padding: f64, min_zoom: f64, max_zoom: f64) -> Self {
        let mut viewport = Self {
            transform: ViewTransform::default(),
            screen,
            padding,
            min_zoom,
            max_zoom,
        };
        viewport.reset();
        viewport
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn set_transform(&mut self, transform: ViewTransform) {
        if transform.is_valid() {
            self.transform = transform;
        }
    }

    pub fn screen(&self) -> Size {
        self.screen
    }

    pub fn screen_center(&self) -> Vec2 {
        Vec2::new(self.screen.width / 2.0, self.screen.height / 2.0)
    }

    /// Keeps the canvas point at the screen center in place.
    pub fn resize(&mut self, screen: Size) {
        if !(screen.width > 0.0 && screen.height > 0.0) {
            return;
        }
        let center = self.canvas_center();
        self.screen = screen;
        self.transform.center_on(center, self.screen_center());
    }

    /// Canvas point currently at the middle of the screen.
    pub fn canvas_center(&self) -> Vec2 {
        self.transform.screen_to_canvas(self.screen_center())
    }

    /// Canvas region currently on screen.
    pub fn visible_rect(&self) -> Rect {
        Rect {
            min: self.transform.screen_to_canvas(Vec2::ZERO),
            max: self
                .transform
                .screen_to_canvas(Vec2::new(self.screen.width, self.screen.height)),
        }
    }

    /// Rescales and recenters so `bounds` fits with padding. `None` resets.
    pub fn fit(&mut self, bounds: Option<Rect>) {
        let Some(bounds) = bounds else {
            self.reset();
            return;
        };
        let avail_w = (self.screen.width - 2.0 * self.padding).max(1.0);
        let avail_h = (self.screen.height - 2.0 * self.padding).max(1.0);
        let zoom_x = if bounds.width() > 0.0 {
            avail_w / bounds.width()
        } else {
            Self::MAX_FIT_ZOOM
        };
        let zoom_y = if bounds.height() > 0.0 {
            avail_h / bounds.height()
        } else {
            Self::MAX_FIT_ZOOM
        };
        let zoom = zoom_x
            .min(zoom_y)
            .min(Self::MAX_FIT_ZOOM)
            .clamp(self.min_zoom, self.max_zoom);
        self.transform.zoom = zoom;
        self.transform.center_on(bounds.center(), self.screen_center());
    }

    /// Centers on a canvas point without changing zoom.
    pub fn focus(&mut self, canvas: Vec2) {
        self.transform.center_on(canvas, self.screen_center());
    }

    pub fn zoom(&mut self, direction: ZoomDirection, step: f64) {
        let factor = match direction {
            ZoomDirection::In => step,
            ZoomDirection::Out => 1.0 / step,
        };
        let anchor = self.screen_center();
        self.transform.zoom_about(
            anchor,
            self.transform.zoom * factor,
            self.min_zoom,
            self.max_zoom,
        );
    }

    /// 1:1 zoom with the canvas origin at the screen center.
    pub fn reset(&mut self) {
        self.transform.zoom = 1.0;
        self.transform.center_on(Vec2::ZERO, self.screen_center());
    }
}
