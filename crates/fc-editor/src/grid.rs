//! Background grid growth.

use fc_core::{Point, Scene, ShapeId};

/// Grow the grid so the bottom-right corners of `moved` fit, plus
/// `margin` of slack. The grid never shrinks. Returns whether it grew.
pub fn resize_grid(scene: &mut Scene, moved: &[ShapeId], margin: f64) -> bool {
    let corner = moved
        .iter()
        .filter(|id| scene.get(**id).is_some_and(|s| !s.is_grid()))
        .filter_map(|id| scene.bounding_rect(*id))
        .map(|r| Point::new(r.x1, r.y1))
        .reduce(|a, b| Point::new(a.x.max(b.x), a.y.max(b.y)));
    match corner {
        Some(corner) => scene.grow_grid(corner, margin),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::model::{Frame, GridSpec, Shape, ShapeKind};
    use fc_core::grid_shape;

    fn scene_with_grid() -> Scene {
        let mut scene = Scene::new();
        scene
            .add(grid_shape(GridSpec {
                left: 50.0,
                top: 50.0,
                width: 1300.0,
                height: 500.0,
                size: 10.0,
            }))
            .unwrap();
        scene
    }

    #[test]
    fn grows_width_only() {
        let mut scene = scene_with_grid();
        let id = ShapeId::intern("wide");
        // Bottom-right corner at (1400, 520).
        scene
            .add(Shape::new(id, ShapeKind::Activity, Frame::new(1350.0, 490.0, 100.0, 60.0)))
            .unwrap();
        assert!(resize_grid(&mut scene, &[id], 20.0));
        let grid = scene.grid().unwrap();
        assert_eq!(grid.width, 1370.0);
        assert_eq!(grid.height, 500.0);
    }

    #[test]
    fn never_shrinks() {
        let mut scene = scene_with_grid();
        let id = ShapeId::intern("small");
        scene
            .add(Shape::new(id, ShapeKind::Event, Frame::new(100.0, 100.0, 20.0, 20.0)))
            .unwrap();
        assert!(!resize_grid(&mut scene, &[id], 20.0));
        assert_eq!(scene.grid().unwrap().width, 1300.0);
    }

    #[test]
    fn without_grid_nothing_happens() {
        let mut scene = Scene::new();
        let id = ShapeId::intern("far");
        scene
            .add(Shape::new(id, ShapeKind::Event, Frame::new(5000.0, 5000.0, 20.0, 20.0)))
            .unwrap();
        assert!(!resize_grid(&mut scene, &[id], 20.0));
    }
}
