//! Connection line entity.
//!
//! A polyline bound at zero, one, or two ends to shape anchors. Bound
//! endpoints store the target id, the anchor name, and the anchor's
//! last-known point; the scene refreshes that point whenever the target
//! moves.

use crate::anchor::AnchorPosition;
use crate::geometry::bounding_rect;
use crate::id::ShapeId;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Default arrowhead size in canvas pixels.
pub const DEFAULT_ARROW_WIDTH: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArrowType {
    None,
    #[default]
    Normal,
    DoubleSided,
}

/// Orientation of a line end, pointing from the endpoint along the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Top,
    #[default]
    Right,
    Bottom,
    Left,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Right => Self::Left,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
        }
    }

    pub fn unit(self) -> Vec2 {
        match self {
            Self::Top => Vec2::new(0.0, -1.0),
            Self::Right => Vec2::new(1.0, 0.0),
            Self::Bottom => Vec2::new(0.0, 1.0),
            Self::Left => Vec2::new(-1.0, 0.0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// Direction from `from` towards `to`. Equal y ⇒ left/right by the sign
    /// of the x-delta; otherwise top/bottom by the sign of the y-delta.
    /// Diagonal segments resolve to their vertical component.
    pub fn between(from: Point, to: Point) -> Self {
        if from.y == to.y {
            if to.x >= from.x { Self::Right } else { Self::Left }
        } else if to.y > from.y {
            Self::Bottom
        } else {
            Self::Top
        }
    }
}

/// Which end of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineEnd {
    From,
    To,
}

/// An endpoint attached to a shape anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binding {
    pub target: ShapeId,
    pub anchor: AnchorPosition,
    /// Anchor position at the last refresh, in the line's own (parent) space.
    pub point: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Unbound,
    PartiallyBound,
    FullyBound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionLine {
    /// At least two points, in the parent's space.
    pub points: Vec<Point>,
    pub arrow_type: ArrowType,
    pub from: Option<Binding>,
    pub to: Option<Binding>,
    pub from_direction: Direction,
    pub to_direction: Direction,
    pub arrow_width: f64,
}

impl ConnectionLine {
    /// Build a line and infer its end directions from the first and last
    /// segments. Fewer than two points are padded by repeating the last one.
    pub fn new(mut points: Vec<Point>, arrow_type: ArrowType) -> Self {
        while points.len() < 2 {
            points.push(points.last().copied().unwrap_or(Point::ZERO));
        }
        let mut line = Self {
            points,
            arrow_type,
            from: None,
            to: None,
            from_direction: Direction::Right,
            to_direction: Direction::Left,
            arrow_width: DEFAULT_ARROW_WIDTH,
        };
        line.init_directions();
        line
    }

    pub fn straight(from: Point, to: Point, arrow_type: ArrowType) -> Self {
        Self::new(vec![from, to], arrow_type)
    }

    fn init_directions(&mut self) {
        let n = self.points.len();
        self.from_direction = Direction::between(self.points[0], self.points[1]);
        self.to_direction = Direction::between(self.points[n - 1], self.points[n - 2]);
    }

    pub fn endpoint(&self, end: LineEnd) -> Point {
        match end {
            LineEnd::From => self.points[0],
            LineEnd::To => self.points[self.points.len() - 1],
        }
    }

    /// Move one endpoint, leaving interior points alone.
    pub fn set_endpoint(&mut self, end: LineEnd, p: Point) {
        let last = self.points.len() - 1;
        match end {
            LineEnd::From => self.points[0] = p,
            LineEnd::To => self.points[last] = p,
        }
    }

    pub fn binding(&self, end: LineEnd) -> Option<&Binding> {
        match end {
            LineEnd::From => self.from.as_ref(),
            LineEnd::To => self.to.as_ref(),
        }
    }

    pub fn bind(&mut self, end: LineEnd, binding: Binding) {
        let direction = binding.anchor.outward();
        match end {
            LineEnd::From => {
                self.from = Some(binding);
                self.from_direction = direction;
            }
            LineEnd::To => {
                self.to = Some(binding);
                self.to_direction = direction;
            }
        }
        self.recompute_points();
    }

    /// Clear one end's binding. Returns the binding that was removed.
    pub fn unbind(&mut self, end: LineEnd) -> Option<Binding> {
        match end {
            LineEnd::From => self.from.take(),
            LineEnd::To => self.to.take(),
        }
    }

    /// Clear every binding that references `target`.
    pub fn unbind_target(&mut self, target: ShapeId) -> bool {
        let mut changed = false;
        if self.from.is_some_and(|b| b.target == target) {
            self.from = None;
            changed = true;
        }
        if self.to.is_some_and(|b| b.target == target) {
            self.to = None;
            changed = true;
        }
        changed
    }

    pub fn is_bound_to(&self, target: ShapeId) -> bool {
        self.from.is_some_and(|b| b.target == target) || self.to.is_some_and(|b| b.target == target)
    }

    pub fn state(&self) -> BindingState {
        match (self.from.is_some(), self.to.is_some()) {
            (false, false) => BindingState::Unbound,
            (true, true) => BindingState::FullyBound,
            _ => BindingState::PartiallyBound,
        }
    }

    /// Snap bound endpoints onto their stored anchor points. With both ends
    /// bound the path is re-routed as an orthogonal elbow.
    pub fn recompute_points(&mut self) {
        if let Some(from) = self.from {
            self.set_endpoint(LineEnd::From, from.point);
        }
        if let Some(to) = self.to {
            self.set_endpoint(LineEnd::To, to.point);
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            self.points = route_elbow(from.point, to.point, self.from_direction);
        }
    }

    /// Move every point by `delta`; the line leaves both anchors.
    pub fn translate(&mut self, delta: Vec2) {
        for p in &mut self.points {
            *p += delta;
        }
        self.from = None;
        self.to = None;
    }

    pub fn bounds(&self) -> Rect {
        bounding_rect(&self.points)
    }

    /// Arrowhead triangles `[tip, left, right]`. Each arrow points opposite
    /// to its end's stored direction, so it faces away from the line.
    pub fn arrowheads(&self) -> SmallVec<[[Point; 3]; 2]> {
        let mut heads = SmallVec::new();
        match self.arrow_type {
            ArrowType::None => {}
            ArrowType::Normal => {
                heads.push(arrowhead(self.endpoint(LineEnd::To), self.to_direction.opposite(), self.arrow_width));
            }
            ArrowType::DoubleSided => {
                heads.push(arrowhead(
                    self.endpoint(LineEnd::From),
                    self.from_direction.opposite(),
                    self.arrow_width,
                ));
                heads.push(arrowhead(self.endpoint(LineEnd::To), self.to_direction.opposite(), self.arrow_width));
            }
        }
        heads
    }
}

/// Triangle with its tip on `tip`, pointing along `pointing`.
pub fn arrowhead(tip: Point, pointing: Direction, width: f64) -> [Point; 3] {
    let along = pointing.unit();
    let across = Vec2::new(-along.y, along.x);
    let base = tip - along * width;
    [tip, base + across * (width / 2.0), base - across * (width / 2.0)]
}

/// Orthogonal three-segment route leaving `a` along `leave`.
fn route_elbow(a: Point, b: Point, leave: Direction) -> Vec<Point> {
    if a.x == b.x || a.y == b.y {
        return vec![a, b];
    }
    if leave.is_horizontal() {
        let mid_x = (a.x + b.x) / 2.0;
        vec![a, Point::new(mid_x, a.y), Point::new(mid_x, b.y), b]
    } else {
        let mid_y = (a.y + b.y) / 2.0;
        vec![a, Point::new(a.x, mid_y), Point::new(b.x, mid_y), b]
    }
}
