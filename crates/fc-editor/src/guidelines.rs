//! Alignment guides.
//!
//! On every move tick the dragged shape is compared with every other
//! top-level shape. Centers and edges that round to within `margin`
//! pixels snap together, and a guide line is recorded for the frame.
//! Guides live for one render: `after_render` hands them to the overlay
//! and empties the lists.

use fc_core::{Point, Rect, Scene, ShapeId, Vec2};
use kurbo::Line;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// A vertical line at some `x`.
    Vertical,
    /// A horizontal line at some `y`.
    Horizontal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuideLine {
    pub axis: Axis,
    /// `x` for vertical guides, `y` for horizontal ones.
    pub coordinate: f64,
    pub from: f64,
    pub to: f64,
}

impl GuideLine {
    pub fn to_line(&self) -> Line {
        match self.axis {
            Axis::Vertical => Line::new(
                Point::new(self.coordinate, self.from),
                Point::new(self.coordinate, self.to),
            ),
            Axis::Horizontal => Line::new(
                Point::new(self.from, self.coordinate),
                Point::new(self.to, self.coordinate),
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GuidelineHandler {
    pub margin: f64,
    /// Overshoot of each guide beyond the aligned shapes.
    pub offset: f64,
    pub vertical_lines: Vec<GuideLine>,
    pub horizontal_lines: Vec<GuideLine>,
    drawn: Vec<GuideLine>,
}

impl GuidelineHandler {
    pub fn new(margin: f64, offset: f64) -> Self {
        Self {
            margin,
            offset,
            ..Self::default()
        }
    }

    fn in_range(&self, a: f64, b: f64) -> bool {
        (a.round() - b.round()).abs() <= self.margin
    }

    /// The in-range `(target, current)` pair needing the smallest shift,
    /// as `(target, shift)`. Ties go to the earlier pair.
    fn closest(&self, pairs: [(f64, f64); 3]) -> Option<(f64, f64)> {
        pairs
            .into_iter()
            .filter(|(target, current)| self.in_range(*target, *current))
            .map(|(target, current)| (target, target - current))
            .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
    }

    /// Snap `moving` against every other top-level shape and collect
    /// guides. Returns the total snap offset applied.
    pub fn on_object_moving(&mut self, scene: &mut Scene, moving: ShapeId) -> Vec2 {
        let Some(mut active) = scene.bounding_rect(moving) else {
            return Vec2::ZERO;
        };
        if scene.get(moving).is_some_and(|s| s.as_connector().is_some()) {
            return Vec2::ZERO;
        }

        let others: Vec<Rect> = scene
            .top_level()
            .into_iter()
            .filter(|id| *id != moving)
            .filter(|id| scene.get(*id).is_some_and(|s| !s.is_grid() && s.as_connector().is_none()))
            .filter_map(|id| scene.bounding_rect(id))
            .collect();

        let mut snapped = Vec2::ZERO;
        let mut vertical_hit = false;
        let mut horizontal_hit = false;

        for other in others {
            // Vertical guides: center-x, left, right.
            if let Some((target, dx)) = self.closest([
                (other.center().x, active.center().x),
                (other.x0, active.x0),
                (other.x1, active.x1),
            ]) {
                vertical_hit = true;
                active = active + Vec2::new(dx, 0.0);
                snapped.x += dx;
                self.vertical_lines.push(GuideLine {
                    axis: Axis::Vertical,
                    coordinate: target,
                    from: other.y0.min(active.y0) - self.offset,
                    to: other.y1.max(active.y1) + self.offset,
                });
            }
            // Horizontal guides: center-y, top, bottom.
            if let Some((target, dy)) = self.closest([
                (other.center().y, active.center().y),
                (other.y0, active.y0),
                (other.y1, active.y1),
            ]) {
                horizontal_hit = true;
                active = active + Vec2::new(0.0, dy);
                snapped.y += dy;
                self.horizontal_lines.push(GuideLine {
                    axis: Axis::Horizontal,
                    coordinate: target,
                    from: other.x0.min(active.x0) - self.offset,
                    to: other.x1.max(active.x1) + self.offset,
                });
            }
        }

        if !vertical_hit {
            self.vertical_lines.clear();
        }
        if !horizontal_hit {
            self.horizontal_lines.clear();
        }
        if snapped != Vec2::ZERO {
            log::trace!("snapped {moving:?} by {snapped:?}");
            scene.translate(moving, snapped);
        }
        snapped
    }

    /// Clear what the previous frame drew.
    pub fn before_render(&mut self) {
        self.drawn.clear();
    }

    /// Move the collected guides to the overlay and return them.
    pub fn after_render(&mut self) -> &[GuideLine] {
        self.drawn.clear();
        self.drawn.append(&mut self.vertical_lines);
        self.drawn.append(&mut self.horizontal_lines);
        &self.drawn
    }

    pub fn on_mouse_up(&mut self) {
        self.vertical_lines.clear();
        self.horizontal_lines.clear();
        self.drawn.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::model::{Frame, Shape, ShapeKind};

    fn add(scene: &mut Scene, id: &str, x: f64, y: f64, w: f64, h: f64) -> ShapeId {
        let id = ShapeId::intern(id);
        scene
            .add(Shape::new(id, ShapeKind::Activity, Frame::new(x, y, w, h)))
            .unwrap();
        id
    }

    #[test]
    fn left_edges_snap_exactly() {
        let mut scene = Scene::new();
        let a = add(&mut scene, "a", 100.0, 100.0, 100.0, 50.0);
        let b = add(&mut scene, "b", 83.0, 300.0, 60.0, 40.0);
        let mut guides = GuidelineHandler::new(4.0, 5.0);

        let snapped = guides.on_object_moving(&mut scene, b);
        assert_eq!(snapped, Vec2::new(-3.0, 0.0));

        let fa = scene.get(a).unwrap().frame;
        let fb = scene.get(b).unwrap().frame;
        assert_eq!(fb.left - fb.width / 2.0, fa.left - fa.width / 2.0);
        assert_eq!(guides.vertical_lines.len(), 1);
        assert_eq!(guides.vertical_lines[0].coordinate, 50.0);
        assert_eq!(guides.vertical_lines[0].from, 70.0);
        assert_eq!(guides.vertical_lines[0].to, 325.0);
        assert!(guides.horizontal_lines.is_empty());
    }

    #[test]
    fn centers_snap_on_both_axes() {
        let mut scene = Scene::new();
        add(&mut scene, "a", 200.0, 200.0, 80.0, 80.0);
        let b = add(&mut scene, "b", 202.0, 197.0, 40.0, 40.0);
        let mut guides = GuidelineHandler::new(4.0, 5.0);
        guides.on_object_moving(&mut scene, b);
        assert_eq!(scene.get(b).unwrap().frame.center(), Point::new(200.0, 200.0));
        assert_eq!(guides.vertical_lines.len(), 1);
        assert_eq!(guides.horizontal_lines.len(), 1);
    }

    #[test]
    fn nearest_edge_wins_over_check_order() {
        let mut scene = Scene::new();
        add(&mut scene, "a", 50.0, 100.0, 100.0, 50.0);
        // Center is 3 off a's center, right edge only 1 off a's right edge.
        let b = add(&mut scene, "b", 53.0, 300.0, 96.0, 40.0);
        let mut guides = GuidelineHandler::new(4.0, 5.0);

        assert_eq!(guides.on_object_moving(&mut scene, b), Vec2::new(-1.0, 0.0));
        assert_eq!(scene.get(b).unwrap().frame.center(), Point::new(52.0, 300.0));
        assert_eq!(guides.vertical_lines.len(), 1);
        assert_eq!(guides.vertical_lines[0].coordinate, 100.0);
    }

    #[test]
    fn out_of_range_clears_axis() {
        let mut scene = Scene::new();
        add(&mut scene, "a", 100.0, 100.0, 100.0, 50.0);
        let b = add(&mut scene, "b", 400.0, 400.0, 30.0, 30.0);
        let mut guides = GuidelineHandler::new(4.0, 5.0);
        guides.vertical_lines.push(GuideLine {
            axis: Axis::Vertical,
            coordinate: 0.0,
            from: 0.0,
            to: 1.0,
        });
        assert_eq!(guides.on_object_moving(&mut scene, b), Vec2::ZERO);
        assert!(guides.vertical_lines.is_empty());
        assert!(guides.horizontal_lines.is_empty());
    }

    #[test]
    fn guides_last_one_render() {
        let mut scene = Scene::new();
        add(&mut scene, "a", 100.0, 100.0, 100.0, 50.0);
        let b = add(&mut scene, "b", 101.0, 300.0, 100.0, 50.0);
        let mut guides = GuidelineHandler::new(4.0, 5.0);
        guides.on_object_moving(&mut scene, b);

        guides.before_render();
        assert!(!guides.after_render().is_empty());
        assert!(guides.vertical_lines.is_empty());
        guides.before_render();
        assert!(guides.after_render().is_empty());
    }

    #[test]
    fn guide_lines_map_to_segments() {
        let g = GuideLine {
            axis: Axis::Horizontal,
            coordinate: 12.0,
            from: -5.0,
            to: 40.0,
        };
        assert_eq!(g.to_line(), Line::new(Point::new(-5.0, 12.0), Point::new(40.0, 12.0)));
    }
}
