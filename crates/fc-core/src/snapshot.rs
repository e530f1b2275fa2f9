//! Serializable shape descriptors and history snapshots.
//!
//! A descriptor carries exactly the allow-listed properties in
//! [`PROPERTIES_TO_INCLUDE`]; anything else is dropped on save and ignored
//! on load. Snapshots are encoded as MessagePack with named fields; the
//! clipboard and templates use JSON.

use crate::anchor::AnchorPosition;
use crate::connection::{ArrowType, Binding, ConnectionLine, Direction};
use crate::id::ShapeId;
use crate::model::{
    Color, Frame, Gradient, GradientDirection, Shape, ShapeKind, ShapeType, Style, TextAlign, TextContent,
    VerticalAlign,
};
use crate::scene::Scene;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Serialized property names, in camelCase wire form.
pub const PROPERTIES_TO_INCLUDE: &[&str] = &[
    "type",
    "id",
    "left",
    "top",
    "width",
    "height",
    "scaleX",
    "scaleY",
    "angle",
    "flipX",
    "flipY",
    "skewX",
    "skewY",
    "fill",
    "stroke",
    "strokeWidth",
    "text",
    "startColor",
    "endColor",
    "direction",
    "gradient",
    "textAlign",
    "verticalAlign",
    "fontSize",
    "selectable",
    "locked",
    "objects",
    "points",
    "fromTarget",
    "toTarget",
    "fromAnchor",
    "toAnchor",
    "fromDirection",
    "toDirection",
    "arrowType",
];

/// Why a snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Add,
    Remove,
    Moved,
    Scaled,
    Rotated,
    Paste,
    Group,
    Ungroup,
    Modified,
    Cut,
    Connect,
    Initialize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShapeDescriptor {
    #[serde(rename = "type")]
    pub shape_type: ShapeType,
    pub id: ShapeId,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub angle: f64,
    pub flip_x: bool,
    pub flip_y: bool,
    pub skew_x: f64,
    pub skew_y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Color>,
    pub stroke_width: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub gradient: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<GradientDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical_align: Option<VerticalAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    pub selectable: bool,
    pub locked: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<ShapeDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_target: Option<ShapeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_target: Option<ShapeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_anchor: Option<AnchorPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_anchor: Option<AnchorPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrow_type: Option<ArrowType>,
}

impl Default for ShapeDescriptor {
    fn default() -> Self {
        Self {
            shape_type: ShapeType::Activity,
            id: ShapeId::intern(""),
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            flip_x: false,
            flip_y: false,
            skew_x: 0.0,
            skew_y: 0.0,
            fill: None,
            stroke: None,
            stroke_width: 1.0,
            text: None,
            gradient: false,
            start_color: None,
            end_color: None,
            direction: None,
            text_align: None,
            vertical_align: None,
            font_size: None,
            selectable: true,
            locked: false,
            objects: Vec::new(),
            points: Vec::new(),
            from_target: None,
            to_target: None,
            from_anchor: None,
            to_anchor: None,
            from_direction: None,
            to_direction: None,
            arrow_type: None,
        }
    }
}

impl ShapeDescriptor {
    /// Describe one shape (and, for groups, its members). `None` for the
    /// grid and unknown ids.
    pub fn from_scene(scene: &Scene, id: ShapeId) -> Option<Self> {
        let shape = scene.get(id)?;
        let shape_type = shape.kind.shape_type()?;
        if shape_type == ShapeType::Grid {
            return None;
        }
        let f = &shape.frame;
        let mut desc = Self {
            shape_type,
            id,
            left: f.left,
            top: f.top,
            width: f.width,
            height: f.height,
            scale_x: f.scale_x,
            scale_y: f.scale_y,
            angle: f.angle,
            flip_x: f.flip_x,
            flip_y: f.flip_y,
            skew_x: f.skew_x,
            skew_y: f.skew_y,
            fill: shape.style.fill,
            stroke: shape.style.stroke,
            stroke_width: shape.style.stroke_width,
            selectable: shape.selectable,
            locked: shape.locked,
            ..Self::default()
        };
        if let Some(g) = &shape.style.gradient {
            desc.gradient = true;
            desc.start_color = Some(g.start_color);
            desc.end_color = Some(g.end_color);
            desc.direction = Some(g.direction);
        }
        if let Some(t) = &shape.text {
            desc.text = Some(t.text.clone());
            desc.text_align = Some(t.text_align);
            desc.vertical_align = Some(t.vertical_align);
            desc.font_size = Some(t.font_size);
        }
        if let Some(line) = shape.as_connector() {
            desc.points = line.points.clone();
            desc.arrow_type = Some(line.arrow_type);
            desc.from_direction = Some(line.from_direction);
            desc.to_direction = Some(line.to_direction);
            desc.from_target = line.from.map(|b| b.target);
            desc.from_anchor = line.from.map(|b| b.anchor);
            desc.to_target = line.to.map(|b| b.target);
            desc.to_anchor = line.to.map(|b| b.anchor);
        }
        if shape.is_group() {
            desc.objects = scene
                .members(id)
                .into_iter()
                .filter_map(|m| Self::from_scene(scene, m))
                .collect();
        }
        Some(desc)
    }

    /// Build the shape this descriptor describes, without group members.
    pub fn to_shape(&self) -> Result<Shape, String> {
        let id = if self.id.as_str().is_empty() {
            ShapeId::with_prefix(self.shape_type.as_str())
        } else {
            self.id
        };
        let mut frame = Frame::new(self.left, self.top, self.width, self.height);
        frame.scale_x = self.scale_x;
        frame.scale_y = self.scale_y;
        frame.angle = self.angle;
        frame.flip_x = self.flip_x;
        frame.flip_y = self.flip_y;
        frame.skew_x = self.skew_x;
        frame.skew_y = self.skew_y;

        let mut shape = match self.shape_type {
            ShapeType::Activity => Shape::new(id, ShapeKind::Activity, frame),
            ShapeType::Role => Shape::new(id, ShapeKind::Role, frame),
            ShapeType::Decision => Shape::new(id, ShapeKind::Decision, frame),
            ShapeType::Event => Shape::new(id, ShapeKind::Event, frame),
            ShapeType::Text => Shape::new(id, ShapeKind::Text, frame),
            ShapeType::Group => Shape::new(id, ShapeKind::Group, frame),
            ShapeType::Connector => Shape::connector(id, self.connection_line()),
            ShapeType::Grid => return Err("the grid is not part of snapshots".to_string()),
        };

        shape.style = Style {
            fill: self.fill,
            stroke: self.stroke,
            stroke_width: self.stroke_width,
            gradient: None,
        };
        if self.gradient
            && let (Some(start_color), Some(end_color)) = (self.start_color, self.end_color)
        {
            shape.style.gradient = Some(Gradient {
                direction: self.direction.unwrap_or_default(),
                start_color,
                end_color,
            });
        }
        if let Some(text) = &self.text {
            let mut content = TextContent::new(text.clone());
            content.text_align = self.text_align.unwrap_or_default();
            content.vertical_align = self.vertical_align.unwrap_or_default();
            if let Some(size) = self.font_size {
                content.font_size = size;
            }
            shape.text = Some(content);
        }
        shape.selectable = self.selectable;
        shape.locked = self.locked;
        Ok(shape)
    }

    /// Restores points, directions and bindings verbatim; bound points are
    /// taken from the stored endpoints.
    fn connection_line(&self) -> ConnectionLine {
        let mut line = ConnectionLine::new(self.points.clone(), self.arrow_type.unwrap_or_default());
        if let Some(d) = self.from_direction {
            line.from_direction = d;
        }
        if let Some(d) = self.to_direction {
            line.to_direction = d;
        }
        let first = line.points[0];
        let last = line.points[line.points.len() - 1];
        if let (Some(target), Some(anchor)) = (self.from_target, self.from_anchor) {
            line.from = Some(Binding { target, anchor, point: first });
        }
        if let (Some(target), Some(anchor)) = (self.to_target, self.to_anchor) {
            line.to = Some(Binding { target, anchor, point: last });
        }
        line
    }

    /// Every id in this descriptor's tree.
    pub fn ids(&self) -> Vec<ShapeId> {
        let mut out = vec![self.id];
        for child in &self.objects {
            out.extend(child.ids());
        }
        out
    }
}

/// Describe every top-level shape, grid excluded.
pub fn describe(scene: &Scene) -> Vec<ShapeDescriptor> {
    describe_ids(scene, &scene.top_level())
}

pub fn describe_ids(scene: &Scene, ids: &[ShapeId]) -> Vec<ShapeDescriptor> {
    ids.iter()
        .filter_map(|id| ShapeDescriptor::from_scene(scene, *id))
        .collect()
}

/// Insert descriptors as top-level shapes, recursing into group members.
/// Returns the top-level ids in insertion order.
pub fn restore(scene: &mut Scene, descriptors: &[ShapeDescriptor]) -> Result<Vec<ShapeId>, String> {
    let mut ids = Vec::with_capacity(descriptors.len());
    for desc in descriptors {
        let shape = desc.to_shape()?;
        let id = shape.id;
        scene.add(shape)?;
        restore_members(scene, id, &desc.objects)?;
        ids.push(id);
    }
    Ok(ids)
}

fn restore_members(scene: &mut Scene, group: ShapeId, members: &[ShapeDescriptor]) -> Result<(), String> {
    for desc in members {
        let shape = desc.to_shape()?;
        let id = shape.id;
        scene.add_to(group, shape)?;
        restore_members(scene, id, &desc.objects)?;
    }
    Ok(())
}

// ─── Snapshots ───────────────────────────────────────────────────────────

/// Full canvas state at one point in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub kind: TransactionType,
    pub objects: Vec<ShapeDescriptor>,
}

impl Snapshot {
    pub fn capture(scene: &Scene, kind: TransactionType) -> Self {
        Self {
            kind,
            objects: describe(scene),
        }
    }

    /// Compact MessagePack encoding. Named fields keep optional
    /// properties skippable.
    pub fn encode(&self) -> Result<Vec<u8>, String> {
        rmp_serde::to_vec_named(self).map_err(|e| e.to_string())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, String> {
        rmp_serde::from_slice(bytes).map_err(|e| e.to_string())
    }
}

// ─── JSON ────────────────────────────────────────────────────────────────

pub fn to_json(descriptors: &[ShapeDescriptor]) -> Result<String, String> {
    serde_json::to_string(descriptors).map_err(|e| e.to_string())
}

/// Parse a JSON array of descriptors, dropping non-allow-listed keys.
pub fn from_json(json: &str) -> Result<Vec<ShapeDescriptor>, String> {
    let mut value: serde_json::Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
    sanitize(&mut value);
    serde_json::from_value(value).map_err(|e| e.to_string())
}

/// Strip every key not in [`PROPERTIES_TO_INCLUDE`], recursing into
/// arrays and group `objects`.
pub fn sanitize(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Array(items) => items.iter_mut().for_each(sanitize),
        serde_json::Value::Object(map) => {
            map.retain(|k, _| PROPERTIES_TO_INCLUDE.contains(&k.as_str()));
            if let Some(objects) = map.get_mut("objects") {
                sanitize(objects);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::LineEnd;

    fn sample_scene() -> Scene {
        let mut scene = Scene::new();
        let mut activity = Shape::new(
            ShapeId::intern("snap_a"),
            ShapeKind::Activity,
            Frame::new(100.0, 80.0, 120.0, 60.0),
        )
        .with_text("Review");
        activity.style.gradient = Some(Gradient {
            direction: GradientDirection::TopToBottom,
            start_color: Color::WHITE,
            end_color: Color::from_hex("#336699").unwrap(),
        });
        activity.rotate_to(15.0);
        scene.add(activity).unwrap();
        scene
            .add(Shape::new(
                ShapeId::intern("snap_b"),
                ShapeKind::Decision,
                Frame::new(400.0, 80.0, 80.0, 80.0),
            ))
            .unwrap();
        let line = ConnectionLine::straight(Point::new(160.0, 80.0), Point::new(360.0, 80.0), ArrowType::DoubleSided);
        scene.add(Shape::connector(ShapeId::intern("snap_line"), line)).unwrap();
        scene
            .bind_endpoint(
                ShapeId::intern("snap_line"),
                LineEnd::To,
                ShapeId::intern("snap_b"),
                AnchorPosition::Left,
            )
            .unwrap();
        scene
    }

    #[test]
    fn snapshot_restores_identical_state() {
        let scene = sample_scene();
        let snap = Snapshot::capture(&scene, TransactionType::Add);
        let bytes = snap.encode().unwrap();
        let decoded = Snapshot::decode(&bytes).unwrap();
        assert_eq!(decoded, snap);

        let mut copy = Scene::new();
        restore(&mut copy, &decoded.objects).unwrap();
        assert_eq!(describe(&copy), snap.objects);
        let line = copy.get(ShapeId::intern("snap_line")).unwrap().as_connector().unwrap();
        assert_eq!(line.to.unwrap().target, ShapeId::intern("snap_b"));
        assert_eq!(line.arrow_type, ArrowType::DoubleSided);
    }

    #[test]
    fn groups_nest_members() {
        let mut scene = sample_scene();
        scene
            .group(
                &[ShapeId::intern("snap_a"), ShapeId::intern("snap_b")],
                ShapeId::intern("snap_group"),
            )
            .unwrap();
        let described = describe(&scene);
        let group = described
            .iter()
            .find(|d| d.shape_type == ShapeType::Group)
            .unwrap();
        assert_eq!(group.objects.len(), 2);

        let mut copy = Scene::new();
        restore(&mut copy, &described).unwrap();
        assert_eq!(copy.members(ShapeId::intern("snap_group")).len(), 2);
    }

    #[test]
    fn unknown_keys_are_dropped() {
        let json = r##"[{"type":"event","id":"snap_ev","left":5,"top":6,"width":20,"height":20,
            "shadow":"#000","objects":[],"zIndex":3}]"##;
        let parsed = from_json(json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].shape_type, ShapeType::Event);
        assert_eq!(parsed[0].left, 5.0);

        let mut value: serde_json::Value = serde_json::from_str(json).unwrap();
        sanitize(&mut value);
        assert!(value[0].get("shadow").is_none());
        assert!(value[0].get("zIndex").is_none());
    }

    #[test]
    fn json_roundtrip_uses_camel_case() {
        let scene = sample_scene();
        let json = to_json(&describe(&scene)).unwrap();
        assert!(json.contains("\"scaleX\""));
        assert!(json.contains("\"toTarget\":\"snap_b\""));
        assert!(json.contains("\"arrowType\":\"double-sided\""));
        assert!(!json.contains("editing"));
    }
}
