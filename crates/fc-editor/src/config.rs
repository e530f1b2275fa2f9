//! Editor configuration.
//!
//! Hosts pass a partial camelCase JSON object; every missing field falls
//! back to its default.

use fc_core::{GridSpec, ZoomBounds};
use serde::Deserialize;

// ─── Grid bounds ──────────────────────────────────────────────────────────

/// Initial grid rectangle, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridBounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for GridBounds {
    fn default() -> Self {
        Self {
            left: 50.0,
            top: 50.0,
            width: 1300.0,
            height: 500.0,
        }
    }
}

// ─── Config ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Lattice cell size in canvas pixels. Default: **10**.
    pub grid_size: f64,
    pub grid_bounds: GridBounds,
    /// Slack added when the grid grows to fit a shape. Default: **20**.
    pub grid_grow_margin: f64,

    /// Zoom limits in percent. Defaults: **30** and **300**.
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Zoom change per wheel notch. Default: **0.05**.
    pub zoom_step: f64,

    /// Distance (px) within which edges and centers snap. Default: **4**.
    pub aligning_line_margin: f64,
    /// How far guide lines overshoot the aligned shapes. Default: **5**.
    pub aligning_line_offset: f64,
    pub aligning_line_width: f64,

    /// Anchor handle size; the snap square is at least 20px. Default: **10**.
    pub anchor_size: f64,
    /// Padding around a shape within which a dragged endpoint looks for
    /// anchors. Default: **10**.
    pub connection_padding: f64,
    /// Screen-pixel reach for hitting thin shapes and endpoint handles.
    pub hit_tolerance: f64,

    pub mini_map_width: f64,
    pub mini_map_height: f64,
    /// Quiet period before the minimap is regenerated. Default: **300**.
    pub mini_map_debounce_ms: u64,

    /// Minimum spacing between two undos (or two redos). Default: **100**.
    pub history_throttle_ms: u64,
    pub max_history: usize,

    /// Offset applied to pasted shapes; `None` means `grid_size`.
    pub paste_padding: Option<f64>,

    /// macOS host: ctrl + middle click opens the context menu.
    pub mac: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_size: 10.0,
            grid_bounds: GridBounds::default(),
            grid_grow_margin: 20.0,
            min_zoom: 30.0,
            max_zoom: 300.0,
            zoom_step: 0.05,
            aligning_line_margin: 4.0,
            aligning_line_offset: 5.0,
            aligning_line_width: 1.0,
            anchor_size: 10.0,
            connection_padding: 10.0,
            hit_tolerance: 4.0,
            mini_map_width: 200.0,
            mini_map_height: 120.0,
            mini_map_debounce_ms: 300,
            history_throttle_ms: 100,
            max_history: 200,
            paste_padding: None,
            mac: false,
        }
    }
}

impl EditorConfig {
    /// Parse a (possibly partial) JSON configuration object.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("invalid editor config: {e}"))
    }

    pub fn zoom_bounds(&self) -> ZoomBounds {
        ZoomBounds::from_percent(self.min_zoom, self.max_zoom)
    }

    pub fn grid_spec(&self) -> GridSpec {
        let b = self.grid_bounds;
        GridSpec {
            left: b.left,
            top: b.top,
            width: b.width,
            height: b.height,
            size: self.grid_size,
        }
    }

    pub fn paste_padding(&self) -> f64 {
        self.paste_padding.unwrap_or(self.grid_size)
    }
}
