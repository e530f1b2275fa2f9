//! Shape object model.
//!
//! A shape is a base geometric/paint record (`Frame`, `Style`, optional
//! `TextContent`) plus a closed set of kind variants (`ShapeKind`). Each
//! kind supplies its own local outline, connectability, and default
//! anchors; behavior is selected by matching on the tag rather than by a
//! type hierarchy.

use crate::anchor::{Anchor, default_anchors};
use crate::connection::ConnectionLine;
use crate::geometry::{TransformParts, compose_matrix};
use crate::id::ShapeId;
use kurbo::{Affine, BezPath, Ellipse, Point, Rect, RoundedRect, Shape as _, Vec2};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

// ─── Colors & Paint ──────────────────────────────────────────────────────

/// RGBA color, 4 × f32 in [0.0, 1.0]. Serialized as a hex string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let pair = |i: usize| -> Option<f32> {
            Some(f32::from(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?) / 255.0)
        };
        match bytes.len() {
            3 => {
                let short = |i: usize| -> Option<f32> { Some(f32::from(hex_val(bytes[i])? * 17) / 255.0) };
                Some(Self::rgba(short(0)?, short(1)?, short(2)?, 1.0))
            }
            6 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, 1.0)),
            8 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
            _ => None,
        }
    }

    /// 8-bit channels, rounded.
    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Shortest hex form: `#RRGGBB` when opaque, `#RRGGBBAA` otherwise.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color `{s}`")))
    }
}

/// Which way a two-color linear gradient runs across the bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GradientDirection {
    #[default]
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
    /// Top-left to bottom-right.
    DiagonalDown,
    /// Bottom-left to top-right.
    DiagonalUp,
}

impl GradientDirection {
    /// Start/end points in relative box coordinates (`[-0.5, 0.5]`).
    pub fn endpoints(self) -> (Point, Point) {
        let (l, r, t, b) = (-0.5, 0.5, -0.5, 0.5);
        match self {
            Self::LeftToRight => (Point::new(l, 0.0), Point::new(r, 0.0)),
            Self::RightToLeft => (Point::new(r, 0.0), Point::new(l, 0.0)),
            Self::TopToBottom => (Point::new(0.0, t), Point::new(0.0, b)),
            Self::BottomToTop => (Point::new(0.0, b), Point::new(0.0, t)),
            Self::DiagonalDown => (Point::new(l, t), Point::new(r, b)),
            Self::DiagonalUp => (Point::new(l, b), Point::new(r, t)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    pub direction: GradientDirection,
    pub start_color: Color,
    pub end_color: Color,
}

/// Paint style of a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
    /// Overrides `fill` when present.
    pub gradient: Option<Gradient>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: Some(Color::WHITE),
            stroke: Some(Color::BLACK),
            stroke_width: 1.0,
            gradient: None,
        }
    }
}

// ─── Text ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

/// Text carried by a shape. Layout and caret handling live in the host's
/// rich-text surface; the engine only tracks content and edit mode.
#[derive(Debug, Clone, PartialEq)]
pub struct TextContent {
    pub text: String,
    pub text_align: TextAlign,
    pub vertical_align: VerticalAlign,
    pub font_size: f64,
    /// Transient; never serialized.
    pub editing: bool,
}

impl TextContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            text_align: TextAlign::default(),
            vertical_align: VerticalAlign::default(),
            font_size: 14.0,
            editing: false,
        }
    }
}

// ─── Frame ───────────────────────────────────────────────────────────────

/// Geometric frame. `left`/`top` locate the shape's center in its parent's
/// space (center origin); `width`/`height` are unscaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Degrees, clockwise.
    pub angle: f64,
    pub skew_x: f64,
    pub skew_y: f64,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl Frame {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            skew_x: 0.0,
            skew_y: 0.0,
            flip_x: false,
            flip_y: false,
        }
    }

    /// Frame whose center is the center of `rect`.
    pub fn from_rect(rect: Rect) -> Self {
        let c = rect.center();
        Self::new(c.x, c.y, rect.width(), rect.height())
    }

    pub fn center(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// `translate · rotate · scale · skew` in parent space.
    pub fn own_matrix(&self) -> Affine {
        compose_matrix(
            self.center(),
            self.angle,
            self.scale_x,
            self.scale_y,
            self.flip_x,
            self.flip_y,
            self.skew_x,
            self.skew_y,
        )
    }

    pub fn scaled_width(&self) -> f64 {
        self.width * self.scale_x.abs()
    }

    pub fn scaled_height(&self) -> f64 {
        self.height * self.scale_y.abs()
    }

    /// Bake a decomposed matrix into this frame, keeping width/height.
    pub fn apply_parts(&mut self, parts: &TransformParts) {
        self.left = parts.translate_x;
        self.top = parts.translate_y;
        self.angle = parts.angle;
        self.scale_x = parts.scale_x.abs();
        self.scale_y = parts.scale_y.abs();
        self.flip_y = parts.scale_y < 0.0;
        self.flip_x = false;
        self.skew_x = parts.skew_x;
        self.skew_y = 0.0;
    }
}

// ─── Grid ────────────────────────────────────────────────────────────────

/// Background lattice. Unlike shapes, `left`/`top` are the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Cell size in canvas pixels.
    pub size: f64,
}

impl GridSpec {
    pub fn rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.left + self.width, self.top + self.height)
    }

    /// Grow so `corner` fits with `margin` of slack. Never shrinks.
    /// Returns true if either dimension grew.
    pub fn grow_to_fit(&mut self, corner: Point, margin: f64) -> bool {
        let mut grew = false;
        if corner.x > self.left + self.width {
            self.width = corner.x - self.left + margin;
            grew = true;
        }
        if corner.y > self.top + self.height {
            self.height = corner.y - self.top + margin;
            grew = true;
        }
        grew
    }

    /// Vertical then horizontal lattice line x/y positions (excluding the border).
    pub fn lattice(&self) -> (Vec<f64>, Vec<f64>) {
        if self.size <= 0.0 {
            return (Vec::new(), Vec::new());
        }
        let xs = (1u32..)
            .map(|i| self.left + f64::from(i) * self.size)
            .take_while(|x| *x < self.left + self.width)
            .collect();
        let ys = (1u32..)
            .map(|i| self.top + f64::from(i) * self.size)
            .take_while(|y| *y < self.top + self.height)
            .collect();
        (xs, ys)
    }
}

// ─── Shape kinds ─────────────────────────────────────────────────────────

/// The serialized `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Activity,
    Role,
    Decision,
    Event,
    Text,
    Connector,
    Group,
    Grid,
}

impl ShapeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Role => "role",
            Self::Decision => "decision",
            Self::Event => "event",
            Self::Text => "text",
            Self::Connector => "connector",
            Self::Group => "group",
            Self::Grid => "grid",
        }
    }
}

/// Closed set of shape kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// Arena root; never serialized or rendered.
    Root,
    /// Rounded rectangle process step.
    Activity,
    /// Rectangle with a header band naming a participant.
    Role,
    /// Diamond branch point.
    Decision,
    /// Ellipse start/end marker.
    Event,
    /// Free-standing text box.
    Text,
    /// Polyline connector between anchors.
    Connector(ConnectionLine),
    /// Container whose members share its transform.
    Group,
    /// Background lattice.
    Grid(GridSpec),
}

/// Height of a role's header band relative to its height.
pub const ROLE_HEADER_RATIO: f64 = 0.2;

impl ShapeKind {
    pub fn shape_type(&self) -> Option<ShapeType> {
        Some(match self {
            Self::Root => return None,
            Self::Activity => ShapeType::Activity,
            Self::Role => ShapeType::Role,
            Self::Decision => ShapeType::Decision,
            Self::Event => ShapeType::Event,
            Self::Text => ShapeType::Text,
            Self::Connector(_) => ShapeType::Connector,
            Self::Group => ShapeType::Group,
            Self::Grid(_) => ShapeType::Grid,
        })
    }

    /// Whether connector endpoints may bind to this kind.
    pub fn is_connectable(&self) -> bool {
        matches!(
            self,
            Self::Activity | Self::Role | Self::Decision | Self::Event | Self::Text
        )
    }

    pub fn is_text_bearing(&self) -> bool {
        matches!(self, Self::Activity | Self::Role | Self::Decision | Self::Text)
    }

    pub fn default_anchors(&self) -> SmallVec<[Anchor; 4]> {
        if self.is_connectable() {
            default_anchors()
        } else {
            SmallVec::new()
        }
    }

    /// Outline in local space (centered on the origin, unscaled).
    pub fn outline(&self, width: f64, height: f64) -> BezPath {
        let rect = Rect::new(-width / 2.0, -height / 2.0, width / 2.0, height / 2.0);
        match self {
            Self::Activity => {
                let radius = (height / 4.0).min(10.0);
                RoundedRect::from_rect(rect, radius).to_path(0.1)
            }
            Self::Decision => {
                let mut path = BezPath::new();
                path.move_to((0.0, rect.y0));
                path.line_to((rect.x1, 0.0));
                path.line_to((0.0, rect.y1));
                path.line_to((rect.x0, 0.0));
                path.close_path();
                path
            }
            Self::Event => Ellipse::from_rect(rect).to_path(0.1),
            Self::Role | Self::Text | Self::Group => rect.to_path(0.1),
            Self::Root | Self::Connector(_) | Self::Grid(_) => BezPath::new(),
        }
    }

    /// Extra decoration drawn over the outline (the role header divider).
    pub fn overlay(&self, width: f64, height: f64) -> Option<BezPath> {
        match self {
            Self::Role => {
                let y = -height / 2.0 + height * ROLE_HEADER_RATIO;
                let mut path = BezPath::new();
                path.move_to((-width / 2.0, y));
                path.line_to((width / 2.0, y));
                Some(path)
            }
            _ => None,
        }
    }
}

// ─── Shape ───────────────────────────────────────────────────────────────

/// A visual entity on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: ShapeId,
    pub kind: ShapeKind,
    pub frame: Frame,
    pub style: Style,
    pub text: Option<TextContent>,
    /// Relative connection points; positions are always derived from `frame`.
    pub anchors: SmallVec<[Anchor; 4]>,
    pub selectable: bool,
    /// Receives pointer events. Cleared for every shape while panning.
    pub evented: bool,
    pub locked: bool,
}

impl Shape {
    pub fn new(id: ShapeId, kind: ShapeKind, frame: Frame) -> Self {
        let anchors = kind.default_anchors();
        let text = kind.is_text_bearing().then(|| TextContent::new(""));
        Self {
            id,
            kind,
            frame,
            style: Style::default(),
            text,
            anchors,
            selectable: true,
            evented: true,
            locked: false,
        }
    }

    /// Root placeholder for the arena.
    pub(crate) fn root() -> Self {
        let mut shape = Self::new(ShapeId::intern("__root"), ShapeKind::Root, Frame::new(0.0, 0.0, 0.0, 0.0));
        shape.selectable = false;
        shape.evented = false;
        shape
    }

    /// A connector; its frame tracks the bounding box of its points.
    pub fn connector(id: ShapeId, line: ConnectionLine) -> Self {
        let frame = Frame::from_rect(line.bounds());
        let mut shape = Self::new(id, ShapeKind::Connector(line), frame);
        shape.style.fill = None;
        shape.style.stroke_width = 2.0;
        shape
    }

    pub fn grid(id: ShapeId, spec: GridSpec) -> Self {
        let mut shape = Self::new(id, ShapeKind::Grid(spec), Frame::from_rect(spec.rect()));
        shape.selectable = false;
        shape.evented = false;
        shape.style.fill = None;
        shape.style.stroke = Some(Color::rgba(0.0, 0.0, 0.0, 0.08));
        shape
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        if let Some(content) = self.text.as_mut() {
            content.text = text.into();
        } else {
            self.text = Some(TextContent::new(text));
        }
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn is_grid(&self) -> bool {
        matches!(self.kind, ShapeKind::Grid(_))
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, ShapeKind::Group)
    }

    pub fn as_connector(&self) -> Option<&ConnectionLine> {
        match &self.kind {
            ShapeKind::Connector(line) => Some(line),
            _ => None,
        }
    }

    pub fn as_connector_mut(&mut self) -> Option<&mut ConnectionLine> {
        match &mut self.kind {
            ShapeKind::Connector(line) => Some(line),
            _ => None,
        }
    }

    /// Matrix from local space to parent space. Connector points and grid
    /// geometry are already in parent space, so theirs is the identity.
    pub fn own_matrix(&self) -> Affine {
        match self.kind {
            ShapeKind::Connector(_) | ShapeKind::Grid(_) | ShapeKind::Root => Affine::IDENTITY,
            _ => self.frame.own_matrix(),
        }
    }

    pub fn scaled_size(&self) -> (f64, f64) {
        (self.frame.scaled_width(), self.frame.scaled_height())
    }

    pub fn set_position(&mut self, center: Point) {
        let delta = center - self.frame.center();
        self.translate(delta);
    }

    /// Move by `delta`. A connector dragged as a whole leaves its anchors.
    pub fn translate(&mut self, delta: Vec2) {
        self.frame.left += delta.x;
        self.frame.top += delta.y;
        match &mut self.kind {
            ShapeKind::Connector(line) => line.translate(delta),
            ShapeKind::Grid(spec) => {
                spec.left += delta.x;
                spec.top += delta.y;
            }
            _ => {}
        }
    }

    pub fn rotate_to(&mut self, angle: f64) {
        if matches!(self.kind, ShapeKind::Connector(_) | ShapeKind::Grid(_)) {
            return;
        }
        self.frame.angle = angle.rem_euclid(360.0);
    }

    pub fn scale_to(&mut self, scale_x: f64, scale_y: f64) {
        if matches!(self.kind, ShapeKind::Connector(_) | ShapeKind::Grid(_)) {
            return;
        }
        self.frame.scale_x = scale_x;
        self.frame.scale_y = scale_y;
    }

    /// Re-derive a connector's or grid's frame from its own geometry.
    pub fn sync_frame(&mut self) {
        match &self.kind {
            ShapeKind::Connector(line) => self.frame = Frame::from_rect(line.bounds()),
            ShapeKind::Grid(spec) => self.frame = Frame::from_rect(spec.rect()),
            _ => {}
        }
    }

    /// Enter text edit mode. Returns false for shapes without text.
    pub fn enter_editing(&mut self) -> bool {
        if self.locked || !self.kind.is_text_bearing() {
            return false;
        }
        match self.text.as_mut() {
            Some(text) => {
                text.editing = true;
                true
            }
            None => false,
        }
    }

    pub fn exit_editing(&mut self) {
        if let Some(text) = self.text.as_mut() {
            text.editing = false;
        }
    }

    pub fn is_editing(&self) -> bool {
        self.text.as_ref().is_some_and(|t| t.editing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_hex_roundtrip() {
        let c = Color::from_hex("#3366CC").unwrap();
        assert_eq!(c.to_hex(), "#3366CC");
        let short = Color::from_hex("fff").unwrap();
        assert_eq!(short, Color::WHITE);
        let translucent = Color::from_hex("#00000080").unwrap();
        assert_eq!(translucent.to_hex(), "#00000080");
        assert!(Color::from_hex("#12345").is_none());
        assert!(Color::from_hex("#GG0000").is_none());
    }

    #[test]
    fn grid_grows_by_margin_and_never_shrinks() {
        let mut grid = GridSpec { left: 50.0, top: 50.0, width: 1300.0, height: 500.0, size: 10.0 };
        assert!(grid.grow_to_fit(Point::new(1400.0, 520.0), 20.0));
        assert_eq!(grid.width, 1370.0);
        assert_eq!(grid.height, 500.0);
        assert!(!grid.grow_to_fit(Point::new(100.0, 100.0), 20.0));
        assert_eq!(grid.width, 1370.0);
    }

    #[test]
    fn grid_lattice_spacing() {
        let grid = GridSpec { left: 0.0, top: 0.0, width: 35.0, height: 20.0, size: 10.0 };
        let (xs, ys) = grid.lattice();
        assert_eq!(xs, vec![10.0, 20.0, 30.0]);
        assert_eq!(ys, vec![10.0]);
    }

    #[test]
    fn connectable_kinds_get_anchors() {
        let activity = Shape::new(ShapeId::intern("a1"), ShapeKind::Activity, Frame::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(activity.anchors.len(), 4);
        let group = Shape::new(ShapeId::intern("g1"), ShapeKind::Group, Frame::new(0.0, 0.0, 100.0, 50.0));
        assert!(group.anchors.is_empty());
        assert!(group.text.is_none());
    }

    #[test]
    fn editing_requires_text_kind() {
        let mut decision = Shape::new(ShapeId::intern("d1"), ShapeKind::Decision, Frame::new(0.0, 0.0, 80.0, 80.0));
        assert!(decision.enter_editing());
        assert!(decision.is_editing());
        decision.exit_editing();
        assert!(!decision.is_editing());

        let mut event = Shape::new(ShapeId::intern("e1"), ShapeKind::Event, Frame::new(0.0, 0.0, 40.0, 40.0));
        assert!(!event.enter_editing());
    }

    #[test]
    fn rotation_wraps() {
        let mut s = Shape::new(ShapeId::intern("r1"), ShapeKind::Role, Frame::new(0.0, 0.0, 10.0, 10.0));
        s.rotate_to(-90.0);
        assert_eq!(s.frame.angle, 270.0);
    }
}
