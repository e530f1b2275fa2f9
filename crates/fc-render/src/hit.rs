//! Hit testing: canvas point → shape lookup.
//!
//! Reverse-walks the top-level paint order (front to back). Groups are hit
//! as a whole; connectors are hit within a tolerance of any segment.

use fc_core::connection::LineEnd;
use fc_core::geometry::point_in_polygon;
use fc_core::model::ShapeKind;
use fc_core::{Scene, ShapeId};
use kurbo::{Line, ParamCurveNearest, Point, Rect};

/// Topmost evented shape under `p`, or `None` for background.
pub fn hit_test(scene: &Scene, p: Point, tolerance: f64) -> Option<ShapeId> {
    for id in scene.top_level().into_iter().rev() {
        let Some(shape) = scene.get(id) else {
            continue;
        };
        if !shape.evented || shape.is_grid() {
            continue;
        }
        let hit = match &shape.kind {
            ShapeKind::Connector(line) => {
                let g = scene.group_matrix(id);
                let reach = tolerance + shape.style.stroke_width / 2.0;
                line.points
                    .windows(2)
                    .any(|seg| distance_to_segment(p, g * seg[0], g * seg[1]) <= reach)
            }
            _ => scene
                .corners(id)
                .is_some_and(|corners| point_in_polygon(p, &corners)),
        };
        if hit {
            log::trace!("hit {id:?} at {p:?}");
            return Some(id);
        }
    }
    None
}

/// Evented, selectable, top-level shapes whose bounds intersect `rect`.
/// Used for rubber-band selection.
pub fn hit_test_rect(scene: &Scene, rect: Rect) -> Vec<ShapeId> {
    scene
        .top_level()
        .into_iter()
        .filter(|id| {
            scene
                .get(*id)
                .is_some_and(|s| s.evented && s.selectable && !s.is_grid())
        })
        .filter(|id| {
            scene
                .bounding_rect(*id)
                .is_some_and(|b| b.x0 <= rect.x1 && b.x1 >= rect.x0 && b.y0 <= rect.y1 && b.y1 >= rect.y0)
        })
        .collect()
}

/// Which end handle of connector `line` lies within `radius` of `p`.
pub fn hit_endpoint(scene: &Scene, line: ShapeId, p: Point, radius: f64) -> Option<LineEnd> {
    let connector = scene.get(line)?.as_connector()?;
    let g = scene.group_matrix(line);
    [LineEnd::To, LineEnd::From]
        .into_iter()
        .find(|end| (g * connector.endpoint(*end) - p).hypot() <= radius)
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    if a == b {
        return (p - a).hypot();
    }
    Line::new(a, b).nearest(p, 1e-9).distance_sq.sqrt()
}
