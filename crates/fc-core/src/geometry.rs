//! Geometry utilities: matrix composition, point transforms, containment
//! tests, and scale-to-fit math.
//!
//! All functions are pure. Matrices use the canvas convention
//! `[a, b, c, d, e, f]` (kurbo `Affine` coefficients), and angles are
//! stored in degrees on the model but converted to radians here.

use kurbo::{Affine, Point, Rect, Size, Vec2};

/// The translation / rotation / scale / skew parts of an affine matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformParts {
    pub translate_x: f64,
    pub translate_y: f64,
    /// Degrees.
    pub angle: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Degrees.
    pub skew_x: f64,
    /// Always zero after decomposition.
    pub skew_y: f64,
}

impl Default for TransformParts {
    fn default() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            angle: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            skew_x: 0.0,
            skew_y: 0.0,
        }
    }
}

/// Compose `translate · rotate · scale(flip) · skewX · skewY`.
#[allow(clippy::too_many_arguments)]
pub fn compose_matrix(
    translate: Point,
    angle_deg: f64,
    scale_x: f64,
    scale_y: f64,
    flip_x: bool,
    flip_y: bool,
    skew_x_deg: f64,
    skew_y_deg: f64,
) -> Affine {
    let sx = if flip_x { -scale_x } else { scale_x };
    let sy = if flip_y { -scale_y } else { scale_y };
    let mut m = Affine::translate(translate.to_vec2())
        * Affine::rotate(angle_deg.to_radians())
        * Affine::scale_non_uniform(sx, sy);
    if skew_x_deg != 0.0 {
        m = m * Affine::new([1.0, 0.0, skew_x_deg.to_radians().tan(), 1.0, 0.0, 0.0]);
    }
    if skew_y_deg != 0.0 {
        m = m * Affine::new([1.0, skew_y_deg.to_radians().tan(), 0.0, 1.0, 0.0, 0.0]);
    }
    m
}

/// QR-decompose a matrix into translation, rotation, scale and x-skew.
///
/// Inverse of [`compose_matrix`] for matrices without y-skew or flips.
pub fn decompose_matrix(m: &Affine) -> TransformParts {
    let [a, b, c, d, e, f] = m.as_coeffs();
    let angle = b.atan2(a);
    let denom = a * a + b * b;
    let scale_x = denom.sqrt();
    if scale_x == 0.0 {
        return TransformParts {
            translate_x: e,
            translate_y: f,
            scale_x: 0.0,
            scale_y: 0.0,
            ..TransformParts::default()
        };
    }
    let scale_y = (a * d - c * b) / scale_x;
    let skew_x = (a * c + b * d).atan2(denom);
    TransformParts {
        translate_x: e,
        translate_y: f,
        angle: angle.to_degrees(),
        scale_x,
        scale_y,
        skew_x: skew_x.to_degrees(),
        skew_y: 0.0,
    }
}

pub fn transform_point(p: Point, m: &Affine) -> Point {
    *m * p
}

/// Inverse matrix; the identity for singular input so callers never divide by zero.
pub fn invert(m: &Affine) -> Affine {
    if m.determinant().abs() < f64::EPSILON {
        log::warn!("attempted to invert a singular matrix {:?}", m.as_coeffs());
        return Affine::IDENTITY;
    }
    m.inverse()
}

/// Even-odd point-in-polygon test: count crossings of a horizontal ray
/// cast from `p` towards +x; an odd count means inside.
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut crossings = 0usize;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_at = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_at {
                crossings += 1;
            }
        }
        j = i;
    }
    crossings % 2 == 1
}

/// Inclusive containment (edges count as inside).
pub fn rect_contains(rect: &Rect, p: Point) -> bool {
    p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1
}

/// Axis-aligned bounding box of a point set. Empty input yields `Rect::ZERO`.
pub fn bounding_rect(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::ZERO;
    };
    points
        .iter()
        .skip(1)
        .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
}

/// Push every vertex of a polygon away from its centroid by `padding`
/// along both axes.
pub fn expand_polygon(polygon: &[Point], padding: f64) -> Vec<Point> {
    if polygon.is_empty() {
        return Vec::new();
    }
    let n = polygon.len() as f64;
    let centroid = polygon
        .iter()
        .fold(Vec2::ZERO, |acc, p| acc + p.to_vec2())
        / n;
    polygon
        .iter()
        .map(|p| {
            let dx = (p.x - centroid.x).signum() * padding;
            let dy = (p.y - centroid.y).signum() * padding;
            Point::new(p.x + dx, p.y + dy)
        })
        .collect()
}

/// Largest uniform scale that fits `content` inside `container`.
pub fn scale_to_fit(content: Size, container: Size) -> f64 {
    if content.width <= 0.0 || content.height <= 0.0 {
        return 1.0;
    }
    (container.width / content.width).min(container.height / content.height)
}

/// Corners of a `width × height` box centered on the local origin,
/// mapped through `m`, in `tl, tr, br, bl` order.
pub fn transformed_corners(m: &Affine, width: f64, height: f64) -> [Point; 4] {
    let (hw, hh) = (width / 2.0, height / 2.0);
    [
        *m * Point::new(-hw, -hh),
        *m * Point::new(hw, -hh),
        *m * Point::new(hw, hh),
        *m * Point::new(-hw, hh),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn compose_translates_and_rotates() {
        let m = compose_matrix(Point::new(100.0, 50.0), 90.0, 1.0, 1.0, false, false, 0.0, 0.0);
        let p = transform_point(Point::new(10.0, 0.0), &m);
        assert!(approx(p.x, 100.0));
        assert!(approx(p.y, 60.0));
    }

    #[test]
    fn decompose_inverts_compose() {
        let m = compose_matrix(Point::new(-30.0, 12.5), 33.0, 2.0, 0.5, false, false, 10.0, 0.0);
        let parts = decompose_matrix(&m);
        assert!(approx(parts.translate_x, -30.0));
        assert!(approx(parts.translate_y, 12.5));
        assert!(approx(parts.angle, 33.0));
        assert!(approx(parts.scale_x, 2.0));
        assert!(approx(parts.scale_y, 0.5));
        assert!(approx(parts.skew_x, 10.0));
        let rebuilt = compose_matrix(
            Point::new(parts.translate_x, parts.translate_y),
            parts.angle,
            parts.scale_x,
            parts.scale_y,
            false,
            false,
            parts.skew_x,
            0.0,
        );
        let sample = Point::new(7.0, -3.0);
        let (a, b) = (m * sample, rebuilt * sample);
        assert!((a - b).hypot() < 1e-6);
    }

    #[test]
    fn invert_singular_is_identity() {
        let m = Affine::scale(0.0);
        assert_eq!(invert(&m), Affine::IDENTITY);
    }

    #[test]
    fn ray_crossing_square() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert!(point_in_polygon(Point::new(5.0, 5.0), &square));
        assert!(!point_in_polygon(Point::new(15.0, 5.0), &square));
        assert!(!point_in_polygon(Point::new(-1.0, 5.0), &square));
    }

    #[test]
    fn ray_crossing_rotated_diamond() {
        let diamond = [
            Point::new(0.0, -10.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(-10.0, 0.0),
        ];
        assert!(point_in_polygon(Point::new(0.0, 0.0), &diamond));
        assert!(!point_in_polygon(Point::new(8.0, 8.0), &diamond));
    }

    #[test]
    fn expand_grows_outward() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let grown = expand_polygon(&square, 5.0);
        assert_eq!(grown[0], Point::new(-5.0, -5.0));
        assert_eq!(grown[2], Point::new(15.0, 15.0));
        assert!(point_in_polygon(Point::new(12.0, 12.0), &grown));
    }

    #[test]
    fn bounding_rect_of_points() {
        let r = bounding_rect(&[Point::new(3.0, 4.0), Point::new(-1.0, 8.0), Point::new(2.0, 0.0)]);
        assert!((r.x0 + 1.0).abs() < EPS);
        assert!((r.y0).abs() < EPS);
        assert!((r.x1 - 3.0).abs() < EPS);
        assert!((r.y1 - 8.0).abs() < EPS);
        assert_eq!(bounding_rect(&[]), Rect::ZERO);
    }

    #[test]
    fn scale_to_fit_picks_limiting_axis() {
        let s = scale_to_fit(Size::new(1000.0, 500.0), Size::new(200.0, 200.0));
        assert!(approx(s, 0.2));
        assert!(approx(scale_to_fit(Size::ZERO, Size::new(10.0, 10.0)), 1.0));
    }

    #[test]
    fn corners_follow_matrix() {
        let m = Affine::translate((50.0, 50.0));
        let c = transformed_corners(&m, 20.0, 10.0);
        assert_eq!(c[0], Point::new(40.0, 45.0));
        assert_eq!(c[2], Point::new(60.0, 55.0));
    }
}
