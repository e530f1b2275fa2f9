//! Scene → backend-neutral display list.
//!
//! Every primitive is expressed in canvas space; backends apply
//! `DisplayList::view` once. Overlay strokes (selection, guides, marquee)
//! are divided by the zoom so they keep a constant on-screen width.

use fc_core::anchor::anchor_corner;
use fc_core::model::{Color, Shape, ShapeKind, TextAlign, VerticalAlign};
use fc_core::{Scene, ShapeId, Viewport};
use kurbo::{Affine, BezPath, Circle, Line, Point, Rect, Shape as _};

const SELECTION_COLOR: Color = Color::rgba(0.16, 0.47, 0.96, 1.0);
const GUIDE_COLOR: Color = Color::rgba(0.93, 0.17, 0.55, 1.0);
const MARQUEE_FILL: Color = Color::rgba(0.16, 0.47, 0.96, 0.08);
const ANCHOR_FILL: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

/// Connector endpoint handle radius, screen pixels.
pub const HANDLE_RADIUS: f64 = 5.0;
const MINIMAP_BOX: Color = Color::rgba(0.16, 0.47, 0.96, 0.6);

#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Color),
    /// Two-stop linear gradient between canvas-space points.
    Linear {
        start: Point,
        end: Point,
        stops: [Color; 2],
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Fill {
        path: BezPath,
        paint: Paint,
    },
    Stroke {
        path: BezPath,
        color: Color,
        width: f64,
        /// Dash length; gaps match dashes.
        dash: Option<f64>,
    },
    /// Text is laid out by the host; the engine only positions the box.
    Text {
        text: String,
        center: Point,
        width: f64,
        height: f64,
        angle: f64,
        font_size: f64,
        align: TextAlign,
        vertical_align: VerticalAlign,
        color: Color,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    /// Canvas → device transform.
    pub view: Affine,
    pub items: Vec<Primitive>,
}

impl DisplayList {
    fn fill(&mut self, path: BezPath, paint: Paint) {
        self.items.push(Primitive::Fill { path, paint });
    }

    fn stroke(&mut self, path: BezPath, color: Color, width: f64, dash: Option<f64>) {
        self.items.push(Primitive::Stroke {
            path,
            color,
            width,
            dash,
        });
    }
}

/// Transient editor state drawn on top of the scene.
#[derive(Debug, Clone, Default)]
pub struct Overlay<'a> {
    pub selection: &'a [ShapeId],
    pub guides: &'a [Line],
    pub guide_width: f64,
    /// Rubber-band rectangle in canvas space.
    pub marquee: Option<Rect>,
    /// Show anchor squares of the single selected connectable shape.
    pub anchor_size: f64,
    /// Skip the text of the shape being edited; the host draws its editor.
    pub editing: Option<ShapeId>,
}

/// Build the main canvas display list.
pub fn build_display_list(scene: &Scene, viewport: &Viewport, overlay: &Overlay<'_>) -> DisplayList {
    let mut list = DisplayList {
        view: viewport.transform(),
        items: Vec::new(),
    };
    push_content(&mut list, scene, overlay.editing);

    let px = 1.0 / viewport.zoom.max(f64::EPSILON);
    for id in overlay.selection {
        push_selection(&mut list, scene, *id, px, overlay);
    }
    for guide in overlay.guides {
        let mut path = BezPath::new();
        path.move_to(guide.p0);
        path.line_to(guide.p1);
        list.stroke(path, GUIDE_COLOR, overlay.guide_width * px, None);
    }
    if let Some(rect) = overlay.marquee {
        list.fill(rect.to_path(0.1), Paint::Solid(MARQUEE_FILL));
        list.stroke(rect.to_path(0.1), SELECTION_COLOR, px, Some(4.0 * px));
    }
    log::trace!("display list: {} items", list.items.len());
    list
}

/// Build the minimap: the scene scaled by `ratio`, plus the viewport box
/// (given in minimap pixels).
pub fn build_minimap_list(scene: &Scene, ratio: f64, viewport_box: Rect) -> DisplayList {
    let mut list = DisplayList {
        view: Affine::scale(ratio),
        items: Vec::new(),
    };
    push_content(&mut list, scene, None);
    if ratio > 0.0 {
        let canvas_box = Rect::new(
            viewport_box.x0 / ratio,
            viewport_box.y0 / ratio,
            viewport_box.x1 / ratio,
            viewport_box.y1 / ratio,
        );
        list.stroke(canvas_box.to_path(0.1), MINIMAP_BOX, 2.0 / ratio, None);
    }
    list
}

// ─── Content ─────────────────────────────────────────────────────────────────

fn push_content(list: &mut DisplayList, scene: &Scene, editing: Option<ShapeId>) {
    for id in scene.paint_order() {
        let Some(shape) = scene.get(id) else {
            continue;
        };
        match &shape.kind {
            ShapeKind::Root | ShapeKind::Group => {}
            ShapeKind::Grid(spec) => {
                let stroke = shape.style.stroke.unwrap_or(Color::BLACK);
                let rect = spec.rect();
                let (xs, ys) = spec.lattice();
                let mut lattice = BezPath::new();
                for x in xs {
                    lattice.move_to((x, rect.y0));
                    lattice.line_to((x, rect.y1));
                }
                for y in ys {
                    lattice.move_to((rect.x0, y));
                    lattice.line_to((rect.x1, y));
                }
                list.stroke(lattice, stroke, shape.style.stroke_width, None);
                list.stroke(rect.to_path(0.1), stroke, shape.style.stroke_width, None);
            }
            ShapeKind::Connector(line) => {
                let g = scene.group_matrix(id);
                let color = shape.style.stroke.unwrap_or(Color::BLACK);
                let width = shape.style.stroke_width;
                // Shifted by half the stroke width onto pixel centers.
                let nudge = kurbo::Vec2::new(width / 2.0, width / 2.0);
                let mut path = BezPath::new();
                for (i, p) in line.points.iter().enumerate() {
                    let p = g * *p + nudge;
                    if i == 0 {
                        path.move_to(p);
                    } else {
                        path.line_to(p);
                    }
                }
                list.stroke(path, color, width, None);
                for head in line.arrowheads() {
                    list.fill(polygon(&head.map(|p| g * p + nudge)), Paint::Solid(color));
                }
            }
            _ => push_shape(list, scene, shape, editing),
        }
    }
}

fn push_shape(list: &mut DisplayList, scene: &Scene, shape: &Shape, editing: Option<ShapeId>) {
    let m = scene.absolute_matrix(shape.id);
    let (w, h) = (shape.frame.width, shape.frame.height);
    let mut outline = shape.kind.outline(w, h);
    outline.apply_affine(m);

    let paint = match (&shape.style.gradient, shape.style.fill) {
        (Some(g), _) => {
            let (s, e) = g.direction.endpoints();
            Some(Paint::Linear {
                start: m * Point::new(s.x * w, s.y * h),
                end: m * Point::new(e.x * w, e.y * h),
                stops: [g.start_color, g.end_color],
            })
        }
        (None, Some(fill)) => Some(Paint::Solid(fill)),
        (None, None) => None,
    };
    if let Some(paint) = paint {
        list.fill(outline.clone(), paint);
    }
    if let Some(stroke) = shape.style.stroke {
        list.stroke(outline, stroke, shape.style.stroke_width, None);
        if let Some(mut overlay) = shape.kind.overlay(w, h) {
            overlay.apply_affine(m);
            list.stroke(overlay, stroke, shape.style.stroke_width, None);
        }
    }

    if let Some(text) = &shape.text
        && !text.text.is_empty()
        && editing != Some(shape.id)
    {
        list.items.push(Primitive::Text {
            text: text.text.clone(),
            center: m * Point::ZERO,
            width: shape.frame.scaled_width(),
            height: shape.frame.scaled_height(),
            angle: shape.frame.angle,
            font_size: text.font_size,
            align: text.text_align,
            vertical_align: text.vertical_align,
            color: shape.style.stroke.unwrap_or(Color::BLACK),
        });
    }
}

// ─── Overlay ─────────────────────────────────────────────────────────────────

fn push_selection(list: &mut DisplayList, scene: &Scene, id: ShapeId, px: f64, overlay: &Overlay<'_>) {
    let Some(shape) = scene.get(id) else {
        return;
    };
    if let Some(line) = shape.as_connector() {
        let g = scene.group_matrix(id);
        for p in [line.points[0], line.points[line.points.len() - 1]] {
            let handle = Circle::new(g * p, HANDLE_RADIUS * px).to_path(0.1);
            list.fill(handle.clone(), Paint::Solid(ANCHOR_FILL));
            list.stroke(handle, SELECTION_COLOR, px, None);
        }
        return;
    }
    let Some(corners) = scene.corners(id) else {
        return;
    };
    list.stroke(polygon(&corners), SELECTION_COLOR, px, None);

    if overlay.selection.len() == 1 && shape.kind.is_connectable() && overlay.anchor_size > 0.0 {
        let size = overlay.anchor_size * px;
        for (_, p) in scene.anchor_points(id) {
            let c = anchor_corner(p, size, shape.frame.angle);
            let square = polygon(&[c.tl, c.tr, c.br, c.bl]);
            list.fill(square.clone(), Paint::Solid(ANCHOR_FILL));
            list.stroke(square, SELECTION_COLOR, px, None);
        }
    }
}

fn polygon(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    if let Some((first, rest)) = points.split_first() {
        path.move_to(*first);
        for p in rest {
            path.line_to(*p);
        }
        path.close_path();
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use fc_core::connection::{ArrowType, ConnectionLine};
    use fc_core::model::{Frame, GridSpec};
    use fc_core::{ShapeId, grid_shape};

    fn scene() -> Scene {
        let mut scene = Scene::new();
        scene
            .add(grid_shape(GridSpec { left: 0.0, top: 0.0, width: 40.0, height: 20.0, size: 10.0 }))
            .unwrap();
        scene
            .add(
                Shape::new(ShapeId::intern("dl_a"), ShapeKind::Role, Frame::new(100.0, 100.0, 80.0, 40.0))
                    .with_text("Clerk"),
            )
            .unwrap();
        let line = ConnectionLine::straight(Point::new(0.0, 0.0), Point::new(50.0, 0.0), ArrowType::DoubleSided);
        scene.add(Shape::connector(ShapeId::intern("dl_line"), line)).unwrap();
        scene
    }

    #[test]
    fn content_primitives_in_paint_order() {
        let list = build_display_list(&scene(), &Viewport::default(), &Overlay::default());
        // grid lattice + border, role fill + outline + header, text, line + 2 heads
        assert_eq!(list.items.len(), 9);
        assert!(matches!(list.items[0], Primitive::Stroke { .. }));
        assert!(matches!(&list.items[5], Primitive::Text { text, .. } if text == "Clerk"));
    }

    #[test]
    fn editing_hides_text() {
        let editing = Overlay {
            editing: Some(ShapeId::intern("dl_a")),
            ..Overlay::default()
        };
        let list = build_display_list(&scene(), &Viewport::default(), &editing);
        assert!(!list.items.iter().any(|i| matches!(i, Primitive::Text { .. })));
    }

    #[test]
    fn overlay_widths_ignore_zoom() {
        let mut viewport = Viewport::default();
        viewport.zoom = 2.0;
        let guides = [Line::new((0.0, 0.0), (0.0, 100.0))];
        let overlay = Overlay {
            guides: &guides,
            guide_width: 1.0,
            ..Overlay::default()
        };
        let list = build_display_list(&scene(), &viewport, &overlay);
        let Some(Primitive::Stroke { width, .. }) = list.items.last() else {
            panic!("expected guide stroke");
        };
        assert_eq!(*width, 0.5);
    }

    #[test]
    fn single_selection_shows_anchors() {
        let selection = [ShapeId::intern("dl_a")];
        let overlay = Overlay {
            selection: &selection,
            anchor_size: 10.0,
            ..Overlay::default()
        };
        let base = build_display_list(&scene(), &Viewport::default(), &Overlay::default()).items.len();
        let list = build_display_list(&scene(), &Viewport::default(), &overlay);
        // outline + 4 anchors × (fill + stroke)
        assert_eq!(list.items.len() - base, 9);
    }

    #[test]
    fn connectors_shift_by_half_their_width() {
        let mut scene = Scene::new();
        let line = ConnectionLine::straight(Point::new(10.0, 20.0), Point::new(60.0, 20.0), ArrowType::None);
        let mut shape = Shape::connector(ShapeId::intern("dl_nudge"), line);
        shape.style.stroke_width = 3.0;
        scene.add(shape).unwrap();

        let list = build_display_list(&scene, &Viewport::default(), &Overlay::default());
        let Some(Primitive::Stroke { path, width, .. }) = list.items.first() else {
            panic!("expected connector stroke");
        };
        assert_eq!(*width, 3.0);
        assert_eq!(
            path.elements(),
            &[
                kurbo::PathEl::MoveTo(Point::new(11.5, 21.5)),
                kurbo::PathEl::LineTo(Point::new(61.5, 21.5)),
            ]
        );
    }

    #[test]
    fn gradient_spans_box() {
        let mut scene = Scene::new();
        let mut shape = Shape::new(ShapeId::intern("dl_g"), ShapeKind::Activity, Frame::new(0.0, 0.0, 100.0, 50.0));
        shape.style.gradient = Some(fc_core::model::Gradient {
            direction: fc_core::model::GradientDirection::LeftToRight,
            start_color: Color::WHITE,
            end_color: Color::BLACK,
        });
        scene.add(shape).unwrap();
        let list = build_display_list(&scene, &Viewport::default(), &Overlay::default());
        let Primitive::Fill { paint: Paint::Linear { start, end, .. }, .. } = &list.items[0] else {
            panic!("expected gradient fill");
        };
        assert_eq!(*start, Point::new(-50.0, 0.0));
        assert_eq!(*end, Point::new(50.0, 0.0));
    }
}
