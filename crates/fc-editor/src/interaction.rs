//! Interaction modes and pointer gestures.

use fc_core::connection::LineEnd;
use fc_core::{Point, Rect, ShapeId};
use serde::{Deserialize, Serialize};

/// Top-level state governing how pointer events are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    /// Click selects, drag moves, drag on empty space rubber-bands.
    #[default]
    Selection,
    /// Drag pans; shapes ignore the pointer.
    Grab,
    /// Host-driven polygon tool; the canvas ignores pointer drags.
    Polygon,
    /// Drag draws a plain connector.
    Line,
    /// Drag draws an arrow connector.
    Arrow,
    /// Drag draws an arrow whose ends snap to shape anchors.
    Link,
    /// Host-driven crop tool; the canvas ignores pointer drags.
    Crop,
}

impl InteractionMode {
    pub fn draws_connectors(self) -> bool {
        matches!(self, Self::Line | Self::Arrow | Self::Link)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "selection" => Self::Selection,
            "grab" => Self::Grab,
            "polygon" => Self::Polygon,
            "line" => Self::Line,
            "arrow" => Self::Arrow,
            "link" => Self::Link,
            "crop" => Self::Crop,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Grab,
    Grabbing,
    Move,
    Crosshair,
    Pointer,
}

impl Cursor {
    /// CSS `cursor` value.
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Grab => "grab",
            Self::Grabbing => "grabbing",
            Self::Move => "move",
            Self::Crosshair => "crosshair",
            Self::Pointer => "pointer",
        }
    }
}

/// The drag in progress between pointer down and pointer up.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) enum Gesture {
    #[default]
    Idle,
    /// Panning; `last` in screen space.
    Pan { last: Point },
    /// Moving the selection. `origin` is the canvas point grabbed and
    /// `starts` the centers at pointer down.
    Move {
        origin: Point,
        starts: Vec<(ShapeId, Point)>,
        moved: bool,
    },
    /// Dragging one end of an existing connector.
    Endpoint { line: ShapeId, end: LineEnd, moved: bool },
    /// Drawing a new connector.
    Draw { line: ShapeId },
    /// Rubber-band selection, canvas space.
    Marquee { start: Point, current: Point },
}

impl Gesture {
    pub(crate) fn marquee_rect(&self) -> Option<Rect> {
        match self {
            Self::Marquee { start, current } => Some(Rect::from_points(*start, *current)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names_roundtrip() {
        for mode in [
            InteractionMode::Selection,
            InteractionMode::Grab,
            InteractionMode::Polygon,
            InteractionMode::Line,
            InteractionMode::Arrow,
            InteractionMode::Link,
            InteractionMode::Crop,
        ] {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(InteractionMode::from_name(json.trim_matches('"')), Some(mode));
        }
    }

    #[test]
    fn marquee_normalizes() {
        let g = Gesture::Marquee {
            start: Point::new(50.0, 10.0),
            current: Point::new(20.0, 40.0),
        };
        assert_eq!(g.marquee_rect(), Some(Rect::new(20.0, 10.0, 50.0, 40.0)));
        assert_eq!(Gesture::Idle.marquee_rect(), None);
    }
}
