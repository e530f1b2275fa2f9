//! Canvas2D renderer.
//!
//! Replays a [`DisplayList`] onto an HTML `<canvas>` through
//! `CanvasRenderingContext2d`. Geometry arrives in canvas space; the list's
//! view transform is applied once per frame.

use fc_core::model::{Color, TextAlign, VerticalAlign};
use fc_render::{DisplayList, Paint, Primitive};
use kurbo::{Affine, BezPath, PathEl, Point};
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

const BACKGROUND: &str = "#FFFFFF";
const FONT_FAMILY: &str = "Inter, system-ui, sans-serif";

/// Clear the canvas and draw `list` on it.
pub fn render_list(ctx: &CanvasRenderingContext2d, list: &DisplayList, width: f64, height: f64) {
    ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0).ok();
    ctx.set_fill_style_str(BACKGROUND);
    ctx.fill_rect(0.0, 0.0, width, height);

    ctx.save();
    apply_affine(ctx, list.view);
    for item in &list.items {
        match item {
            Primitive::Fill { path, paint } => draw_fill(ctx, path, paint),
            Primitive::Stroke {
                path,
                color,
                width,
                dash,
            } => draw_stroke(ctx, path, color, *width, *dash),
            Primitive::Text {
                text,
                center,
                width,
                height,
                angle,
                font_size,
                align,
                vertical_align,
                color,
            } => draw_text(
                ctx,
                &TextBox {
                    text,
                    center: *center,
                    width: *width,
                    height: *height,
                    angle: *angle,
                    font_size: *font_size,
                    align: *align,
                    vertical_align: *vertical_align,
                },
                color,
            ),
        }
    }
    ctx.restore();
}

fn apply_affine(ctx: &CanvasRenderingContext2d, m: Affine) {
    let [a, b, c, d, e, f] = m.as_coeffs();
    ctx.transform(a, b, c, d, e, f).ok();
}

// ─── Drawing primitives ─────────────────────────────────────────────────

fn trace(ctx: &CanvasRenderingContext2d, path: &BezPath) {
    ctx.begin_path();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => ctx.move_to(p.x, p.y),
            PathEl::LineTo(p) => ctx.line_to(p.x, p.y),
            PathEl::QuadTo(c, p) => ctx.quadratic_curve_to(c.x, c.y, p.x, p.y),
            PathEl::CurveTo(c1, c2, p) => ctx.bezier_curve_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y),
            PathEl::ClosePath => ctx.close_path(),
        }
    }
}

fn draw_fill(ctx: &CanvasRenderingContext2d, path: &BezPath, paint: &Paint) {
    trace(ctx, path);
    match paint {
        Paint::Solid(color) => ctx.set_fill_style_str(&css_color(color)),
        Paint::Linear { start, end, stops } => {
            let gradient = ctx.create_linear_gradient(start.x, start.y, end.x, end.y);
            gradient.add_color_stop(0.0, &css_color(&stops[0])).ok();
            gradient.add_color_stop(1.0, &css_color(&stops[1])).ok();
            ctx.set_fill_style_canvas_gradient(&gradient);
        }
    }
    ctx.fill();
}

fn draw_stroke(ctx: &CanvasRenderingContext2d, path: &BezPath, color: &Color, width: f64, dash: Option<f64>) {
    trace(ctx, path);
    ctx.set_stroke_style_str(&css_color(color));
    ctx.set_line_width(width);
    let pattern = match dash {
        Some(d) => js_sys::Array::of2(&JsValue::from_f64(d), &JsValue::from_f64(d)),
        None => js_sys::Array::new(),
    };
    let _ = ctx.set_line_dash(&pattern);
    ctx.stroke();
}

struct TextBox<'a> {
    text: &'a str,
    center: Point,
    width: f64,
    height: f64,
    angle: f64,
    font_size: f64,
    align: TextAlign,
    vertical_align: VerticalAlign,
}

/// Multi-line text inside a (possibly rotated) box.
fn draw_text(ctx: &CanvasRenderingContext2d, b: &TextBox<'_>, color: &Color) {
    if b.text.is_empty() {
        return;
    }
    ctx.save();
    ctx.translate(b.center.x, b.center.y).ok();
    ctx.rotate(b.angle.to_radians()).ok();
    ctx.set_font(&format!("{}px {FONT_FAMILY}", b.font_size));
    ctx.set_fill_style_str(&css_color(color));
    ctx.set_text_baseline("middle");

    let (x, text_align) = match b.align {
        TextAlign::Left => (-b.width / 2.0 + 4.0, "left"),
        TextAlign::Center => (0.0, "center"),
        TextAlign::Right => (b.width / 2.0 - 4.0, "right"),
    };
    ctx.set_text_align(text_align);

    let lines: Vec<&str> = b.text.lines().collect();
    let line_height = b.font_size * 1.2;
    let block = line_height * lines.len() as f64;
    let first = match b.vertical_align {
        VerticalAlign::Top => -b.height / 2.0 + line_height / 2.0,
        VerticalAlign::Middle => -block / 2.0 + line_height / 2.0,
        VerticalAlign::Bottom => b.height / 2.0 - block + line_height / 2.0,
    };
    for (i, line) in lines.iter().enumerate() {
        let _ = ctx.fill_text(line, x, first + i as f64 * line_height);
    }
    ctx.restore();
}

/// CSS `rgba(...)` for a shape color.
pub fn css_color(color: &Color) -> String {
    let [r, g, b, _] = color.to_rgba8();
    format!("rgba({r}, {g}, {b}, {})", color.a.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn css_colors() {
        assert_eq!(css_color(&Color::rgba(1.0, 0.0, 0.0, 1.0)), "rgba(255, 0, 0, 1)");
        assert_eq!(css_color(&Color::rgba(0.0, 0.0, 0.0, 0.5)), "rgba(0, 0, 0, 0.5)");
    }
}
