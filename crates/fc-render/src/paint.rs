//! Display list → Vello drawing commands.
//!
//! Fills, strokes and gradients map one-to-one onto `vello::Scene` calls.
//! Text boxes are left to the host's text surface.

use crate::display::{DisplayList, Paint, Primitive};
use fc_core::model::Color as ShapeColor;
use kurbo::{Affine, Stroke};
use peniko::{Color, Fill, Gradient};
use vello::Scene;

/// Paint a display list into a freshly-cleared Vello scene.
///
/// `device` is prepended to the list's own view transform (e.g. a
/// device-pixel-ratio scale). The caller presents the scene.
pub fn paint_display_list(scene: &mut Scene, list: &DisplayList, device: Affine) {
    let transform = device * list.view;
    for item in &list.items {
        match item {
            Primitive::Fill { path, paint } => match paint {
                Paint::Solid(c) => scene.fill(Fill::NonZero, transform, to_peniko(c), None, path),
                Paint::Linear { start, end, stops } => {
                    let gradient = Gradient::new_linear(*start, *end)
                        .with_stops([to_peniko(&stops[0]), to_peniko(&stops[1])]);
                    scene.fill(Fill::NonZero, transform, &gradient, None, path);
                }
            },
            Primitive::Stroke {
                path,
                color,
                width,
                dash,
            } => {
                let mut stroke = Stroke::new(*width);
                if let Some(d) = dash {
                    stroke = stroke.with_dashes(0.0, [*d, *d]);
                }
                scene.stroke(&stroke, transform, to_peniko(color), None, path);
            }
            Primitive::Text { text, center, .. } => {
                log::trace!("TEXT {text:?} at {center:?}");
            }
        }
    }
}

fn to_peniko(c: &ShapeColor) -> Color {
    let [r, g, b, a] = c.to_rgba8();
    Color::from_rgba8(r, g, b, a)
}
