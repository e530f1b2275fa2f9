//! Minimap: a scaled copy of the scene plus a draggable, resizable box
//! showing the visible part of the main canvas.
//!
//! The box lives in minimap pixels. With `ratio` the canvas-to-minimap
//! scale, the box sits at `-pan · ratio / zoom` and measures
//! `viewport size · ratio / zoom`.

use crate::timing::Debounce;
use fc_core::geometry::scale_to_fit;
use fc_core::{Point, Rect, Scene, Size, Vec2, Viewport, ZoomBounds};
use fc_render::{DisplayList, build_minimap_list};

#[derive(Debug, Clone)]
pub struct MiniMap {
    pub width: f64,
    pub height: f64,
    /// Visible-area box, minimap pixels.
    pub viewport_box: Rect,
    debounce: Debounce,
}

impl MiniMap {
    pub fn new(width: f64, height: f64, debounce_ms: u64) -> Self {
        Self {
            width,
            height,
            viewport_box: Rect::ZERO,
            debounce: Debounce::new(debounce_ms),
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Canvas-to-minimap scale for a main canvas of `canvas` pixels.
    pub fn ratio(&self, canvas: Size) -> f64 {
        scale_to_fit(canvas, self.size())
    }

    /// Ask for the background to be regenerated once mutations settle.
    pub fn update_minimap(&mut self, now_ms: u64) {
        self.debounce.schedule(now_ms);
    }

    /// True once the quiet period after the last `update_minimap` ends.
    pub fn take_refresh(&mut self, now_ms: u64) -> bool {
        self.debounce.poll(now_ms)
    }

    pub fn refresh_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Reposition the box after a pan or zoom.
    pub fn update_minimap_vp(&mut self, viewport: &Viewport) {
        let ratio = self.ratio(viewport.size());
        let zoom = viewport.zoom.max(f64::EPSILON);
        let origin = Point::ZERO + (-viewport.pan * ratio / zoom);
        let size = Size::new(viewport.width * ratio / zoom, viewport.height * ratio / zoom);
        self.viewport_box = Rect::from_origin_size(origin, size);
    }

    /// The box was dragged by `delta` minimap pixels: pan the main canvas
    /// so it shows what the box now covers.
    pub fn on_box_moved(&mut self, viewport: &mut Viewport, delta: Vec2) {
        let ratio = self.ratio(viewport.size());
        if ratio <= 0.0 {
            return;
        }
        viewport.relative_pan(-delta / ratio * viewport.zoom);
        self.update_minimap_vp(viewport);
    }

    /// The box was resized to `scale_x` times its unzoomed width: zoom
    /// the main canvas about its top-left corner. Returns the new zoom.
    pub fn on_box_scaled(&mut self, viewport: &mut Viewport, scale_x: f64, bounds: &ZoomBounds) -> f64 {
        if scale_x <= 0.0 {
            return viewport.zoom;
        }
        let zoom = viewport.zoom_to_point(Point::ZERO, 1.0 / scale_x, bounds);
        self.update_minimap_vp(viewport);
        zoom
    }

    pub fn display(&self, scene: &Scene, viewport: &Viewport) -> DisplayList {
        build_minimap_list(scene, self.ratio(viewport.size()), self.viewport_box)
    }
}
