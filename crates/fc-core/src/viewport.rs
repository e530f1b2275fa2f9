//! Viewport transform: the uniform zoom and pan mapping canvas space to
//! screen space (`screen = zoom · canvas + pan`).

use crate::geometry::{invert, scale_to_fit};
use kurbo::{Affine, Point, Rect, Size, Vec2};

/// Zoom limits, stored as factors (1.0 = 100%).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomBounds {
    pub min: f64,
    pub max: f64,
}

impl ZoomBounds {
    /// Bounds from percentages, e.g. `from_percent(30.0, 300.0)`.
    pub fn from_percent(min: f64, max: f64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min: min / 100.0,
            max: max / 100.0,
        }
    }

    pub fn clamp(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min, self.max)
    }
}

impl Default for ZoomBounds {
    fn default() -> Self {
        Self::from_percent(30.0, 300.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Canvas element size in screen pixels.
    pub width: f64,
    pub height: f64,
    pub zoom: f64,
    pub pan: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            zoom: 1.0,
            pan: Vec2::ZERO,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn transform(&self) -> Affine {
        Affine::new([self.zoom, 0.0, 0.0, self.zoom, self.pan.x, self.pan.y])
    }

    pub fn screen_to_canvas(&self, p: Point) -> Point {
        invert(&self.transform()) * p
    }

    pub fn canvas_to_screen(&self, p: Point) -> Point {
        self.transform() * p
    }

    /// Zoom so the canvas point under `screen_point` stays put.
    /// Returns the applied (clamped) zoom.
    pub fn zoom_to_point(&mut self, screen_point: Point, zoom: f64, bounds: &ZoomBounds) -> f64 {
        let before = self.screen_to_canvas(screen_point);
        self.zoom = bounds.clamp(zoom);
        let after = self.canvas_to_screen(before);
        self.pan += screen_point - after;
        self.zoom
    }

    /// Zoom about the viewport center.
    pub fn set_zoom(&mut self, zoom: f64, bounds: &ZoomBounds) -> f64 {
        let center = Point::new(self.width / 2.0, self.height / 2.0);
        self.zoom_to_point(center, zoom, bounds)
    }

    /// Shift the view by `delta` screen pixels.
    pub fn relative_pan(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Place the canvas point `p` (scaled by zoom) at the screen origin.
    pub fn absolute_pan(&mut self, p: Point) {
        self.pan = -p.to_vec2();
    }

    /// The canvas-space rectangle currently on screen.
    pub fn visible_rect(&self) -> Rect {
        let tl = self.screen_to_canvas(Point::ZERO);
        let br = self.screen_to_canvas(Point::new(self.width, self.height));
        Rect::from_points(tl, br)
    }

    /// Zoom and pan so `content` (grown by `padding`) fills the view, centered.
    pub fn zoom_to_fit(&mut self, content: Rect, padding: f64, bounds: &ZoomBounds) -> f64 {
        let padded = content.inflate(padding, padding);
        self.zoom = bounds.clamp(scale_to_fit(padded.size(), self.size()));
        let center = padded.center();
        self.pan = Vec2::new(
            self.width / 2.0 - center.x * self.zoom,
            self.height / 2.0 - center.y * self.zoom,
        );
        self.zoom
    }
}
