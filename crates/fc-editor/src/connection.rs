//! Connection handler: drives one connector endpoint while it is dragged.
//!
//! While an endpoint is being edited, every pointer move searches the
//! connectable shapes for one whose padded outline contains the pointer.
//! Inside such a shape the endpoint binds to the first anchor within the
//! snap square; anywhere else the endpoint floats with the pointer.

use fc_core::anchor::{AnchorPosition, anchor_corner};
use fc_core::connection::LineEnd;
use fc_core::geometry::{expand_polygon, point_in_polygon};
use fc_core::{Point, Scene, ShapeId};

#[derive(Debug, Clone)]
pub struct ConnectionHandler {
    pub anchor_size: f64,
    /// Outline padding for the shape search.
    pub padding: f64,
    current_line: Option<ShapeId>,
    editing_end: LineEnd,
    /// Last pointer position, screen space.
    pub pointer: Point,
    /// Last pointer position, canvas space.
    pub absolute_pointer: Point,
}

impl ConnectionHandler {
    pub fn new(anchor_size: f64, padding: f64) -> Self {
        Self {
            anchor_size,
            padding,
            current_line: None,
            editing_end: LineEnd::To,
            pointer: Point::ZERO,
            absolute_pointer: Point::ZERO,
        }
    }

    pub fn begin(&mut self, line: ShapeId, end: LineEnd) {
        log::debug!("editing {line:?} {end:?}");
        self.current_line = Some(line);
        self.editing_end = end;
    }

    /// Stop editing. Returns the line that was being edited.
    pub fn end(&mut self) -> Option<ShapeId> {
        self.current_line.take()
    }

    pub fn current_line(&self) -> Option<ShapeId> {
        self.current_line
    }

    pub fn editing_end(&self) -> LineEnd {
        self.editing_end
    }

    pub fn is_active(&self) -> bool {
        self.current_line.is_some()
    }

    /// Side of the square an anchor must fall in to be hit.
    pub fn snap_size(&self) -> f64 {
        (self.anchor_size / 2.0).max(10.0) * 2.0
    }

    /// Follow the pointer. Returns whether the edited line changed.
    pub fn on_mouse_move(&mut self, scene: &mut Scene, pointer: Point, absolute_pointer: Point) -> bool {
        self.pointer = pointer;
        self.absolute_pointer = absolute_pointer;
        let Some(line) = self.current_line else {
            return false;
        };
        if !scene.contains(line) {
            self.current_line = None;
            return false;
        }
        match self.shape_under(scene, line, absolute_pointer) {
            Some(target) => {
                self.link_anchors(scene, target, absolute_pointer);
            }
            None => self.float(scene, line, absolute_pointer),
        }
        true
    }

    /// Bind the edited endpoint to the first anchor of `target` inside the
    /// snap square around `point`. With no such anchor the endpoint is
    /// released and follows `point`.
    pub fn link_anchors(&mut self, scene: &mut Scene, target: ShapeId, point: Point) -> Option<AnchorPosition> {
        let line = self.current_line?;
        let region = anchor_corner(point, self.snap_size(), 0.0);
        let hit = scene
            .anchor_points(target)
            .into_iter()
            .find(|(_, p)| region.contains(*p))
            .map(|(position, _)| position);

        let Some(anchor) = hit else {
            self.float(scene, line, point);
            return None;
        };
        let already = scene
            .get(line)
            .and_then(|s| s.as_connector())
            .and_then(|l| l.binding(self.editing_end))
            .is_some_and(|b| b.target == target && b.anchor == anchor);
        if already {
            return Some(anchor);
        }
        match scene.bind_endpoint(line, self.editing_end, target, anchor) {
            Ok(()) => Some(anchor),
            Err(e) => {
                log::warn!("cannot bind {line:?}: {e}");
                self.float(scene, line, point);
                None
            }
        }
    }

    /// Re-snap every connector bound to a moved, scaled or rotated shape.
    pub fn refresh_bindings(&self, scene: &mut Scene, moved: &[ShapeId]) -> Vec<ShapeId> {
        scene.refresh_connections(moved)
    }

    /// Front-most connectable shape whose padded outline contains `p`.
    fn shape_under(&self, scene: &Scene, line: ShapeId, p: Point) -> Option<ShapeId> {
        scene.paint_order().into_iter().rev().find(|id| {
            *id != line
                && scene.get(*id).is_some_and(|s| s.kind.is_connectable())
                && scene
                    .corners(*id)
                    .is_some_and(|c| point_in_polygon(p, &expand_polygon(&c, self.padding)))
        })
    }

    fn float(&self, scene: &mut Scene, line: ShapeId, p: Point) {
        scene.unbind_endpoint(line, self.editing_end);
        scene.set_endpoint(line, self.editing_end, p);
    }
}
