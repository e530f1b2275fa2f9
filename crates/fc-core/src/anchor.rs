//! Anchor model: named connection points on a shape's bounding box.
//!
//! Anchors store only a relative position (`x`, `y` in `[-0.5, 0.5]`) and a
//! pixel offset. Absolute positions are recomputed on demand:
//!
//! ```text
//! canvas = group · own · (x·width + offset_x, y·height + offset_y)
//! screen = viewport · canvas
//! ```

use crate::connection::Direction;
use crate::geometry::{invert, point_in_polygon};
use kurbo::{Affine, Point};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

/// Anchor name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorPosition {
    Top,
    Right,
    Bottom,
    Left,
}

impl AnchorPosition {
    /// The direction a connector leaves the shape through this anchor.
    pub fn outward(self) -> Direction {
        match self {
            Self::Top => Direction::Top,
            Self::Right => Direction::Right,
            Self::Bottom => Direction::Bottom,
            Self::Left => Direction::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub position: AnchorPosition,
    /// Relative x in `[-0.5, 0.5]` of the unscaled width.
    pub x: f64,
    /// Relative y in `[-0.5, 0.5]` of the unscaled height.
    pub y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Anchor {
    pub const fn new(position: AnchorPosition, x: f64, y: f64) -> Self {
        Self {
            position,
            x,
            y,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Position in the owning shape's local (unscaled, centered) space.
    pub fn local_point(&self, width: f64, height: f64) -> Point {
        Point::new(self.x * width + self.offset_x, self.y * height + self.offset_y)
    }

    /// Position in canvas space given the shape's full canvas matrix
    /// (group chain · own).
    pub fn canvas_point(&self, shape_matrix: &Affine, width: f64, height: f64) -> Point {
        *shape_matrix * self.local_point(width, height)
    }

    /// Position in screen space under the viewport transform.
    pub fn screen_point(&self, shape_matrix: &Affine, width: f64, height: f64, viewport: &Affine) -> Point {
        *viewport * self.canvas_point(shape_matrix, width, height)
    }

    /// Recover a relative `(x, y)` from a canvas point, ignoring offsets.
    pub fn relative_from_canvas(p: Point, shape_matrix: &Affine, width: f64, height: f64) -> (f64, f64) {
        let local = invert(shape_matrix) * p;
        let rx = if width == 0.0 { 0.0 } else { local.x / width };
        let ry = if height == 0.0 { 0.0 } else { local.y / height };
        (rx, ry)
    }
}

/// Edge midpoints in declaration order: top, right, bottom, left.
pub fn default_anchors() -> SmallVec<[Anchor; 4]> {
    smallvec![
        Anchor::new(AnchorPosition::Top, 0.0, -0.5),
        Anchor::new(AnchorPosition::Right, 0.5, 0.0),
        Anchor::new(AnchorPosition::Bottom, 0.0, 0.5),
        Anchor::new(AnchorPosition::Left, -0.5, 0.0),
    ]
}

/// Oriented hit square around an anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorCorner {
    pub tl: Point,
    pub tr: Point,
    pub bl: Point,
    pub br: Point,
}

impl AnchorCorner {
    pub fn contains(&self, p: Point) -> bool {
        point_in_polygon(p, &[self.tl, self.tr, self.br, self.bl])
    }
}

/// Hit square of side `size` centered on `center`, rotated by
/// `45° − angle` so it stays aligned with the shape's own axes.
pub fn anchor_corner(center: Point, size: f64, angle_deg: f64) -> AnchorCorner {
    let half_diagonal = size * std::f64::consts::FRAC_1_SQRT_2;
    let theta = (45.0 - angle_deg).to_radians();
    let cos = half_diagonal * theta.cos();
    let sin = half_diagonal * theta.sin();
    AnchorCorner {
        tl: Point::new(center.x - sin, center.y - cos),
        tr: Point::new(center.x + cos, center.y - sin),
        bl: Point::new(center.x - cos, center.y + sin),
        br: Point::new(center.x + sin, center.y + cos),
    }
}
