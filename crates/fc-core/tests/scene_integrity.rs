//! Integration tests: fixture load → scene edits → connection invariants.
//!
//! Exercises the full `fc-core` pipeline: JSON descriptors → Scene →
//! transforms → snapshot encoding.

use fc_core::snapshot::{describe, from_json, restore};
use fc_core::*;
use pretty_assertions::assert_eq;

fn load() -> Scene {
    let _ = env_logger::builder().is_test(true).try_init();
    let descriptors = from_json(include_str!("fixtures/approval_flow.json")).unwrap();
    let mut scene = Scene::new();
    restore(&mut scene, &descriptors).unwrap();
    scene.refresh_all_connections();
    scene
}

fn id(s: &str) -> ShapeId {
    ShapeId::intern(s)
}

fn assert_bindings_live(scene: &Scene) {
    for shape_id in scene.paint_order() {
        let Some(line) = scene.get(shape_id).and_then(Shape::as_connector) else {
            continue;
        };
        let to_canvas = scene.group_matrix(shape_id);
        for (end, binding) in [(LineEnd::From, line.from), (LineEnd::To, line.to)] {
            let Some(binding) = binding else { continue };
            let live = scene.anchor_point(binding.target, binding.anchor).unwrap();
            let stored = to_canvas * line.endpoint(end);
            assert!(
                (live - stored).hypot() < 1e-6,
                "{shape_id} {end:?} is stale: stored {stored:?}, live {live:?}"
            );
            assert!((to_canvas * binding.point - live).hypot() < 1e-6);
        }
    }
}

// ─── Fixture ─────────────────────────────────────────────────────────────

#[test]
fn fixture_loads_in_order() {
    let scene = load();
    assert_eq!(
        scene.top_level(),
        vec![
            id("finance"),
            id("start"),
            id("submit"),
            id("approve"),
            id("start_to_submit"),
            id("submit_to_approve"),
            id("approve_out"),
        ]
    );
    let submit = scene.get(id("submit")).unwrap();
    let gradient = submit.style.gradient.unwrap();
    assert_eq!(gradient.direction, GradientDirection::TopToBottom);
    assert_eq!(submit.text.as_ref().unwrap().text, "Submit invoice");
    assert_bindings_live(&scene);
}

#[test]
fn fully_bound_lines_route_orthogonally() {
    let mut scene = load();
    scene.translate(id("approve"), Vec2::new(0.0, 120.0));
    scene.refresh_connections(&[id("approve")]);
    let line = scene.get(id("submit_to_approve")).unwrap().as_connector().unwrap();
    assert_eq!(line.state(), BindingState::FullyBound);
    for pair in line.points.windows(2) {
        assert!(pair[0].x == pair[1].x || pair[0].y == pair[1].y, "diagonal segment {pair:?}");
    }
}

// ─── Binding invariant ───────────────────────────────────────────────────

#[test]
fn bindings_follow_moves_rotations_and_scales() {
    let mut scene = load();

    scene.translate(id("submit"), Vec2::new(35.0, -12.0));
    scene.refresh_connections(&[id("submit")]);
    assert_bindings_live(&scene);

    scene.get_mut(id("approve")).unwrap().rotate_to(45.0);
    scene.refresh_connections(&[id("approve")]);
    assert_bindings_live(&scene);

    scene.get_mut(id("start")).unwrap().scale_to(2.0, 1.5);
    scene.refresh_connections(&[id("start")]);
    assert_bindings_live(&scene);
}

#[test]
fn bindings_follow_group_moves() {
    let mut scene = load();
    let group = scene.group(&[id("submit"), id("approve")], id("pair")).unwrap();
    scene.translate(group, Vec2::new(-40.0, 60.0));
    let refreshed = scene.refresh_connections(&[group]);
    assert!(refreshed.contains(&id("start_to_submit")));
    assert!(refreshed.contains(&id("approve_out")));
    assert_bindings_live(&scene);

    scene.ungroup(group).unwrap();
    scene.refresh_all_connections();
    assert_bindings_live(&scene);
}

#[test]
fn grouped_line_stays_on_outside_anchors() {
    let mut scene = load();
    let group = scene.group(&[id("finance"), id("submit_to_approve")], id("lane")).unwrap();

    scene.translate(group, Vec2::new(300.0, 200.0));
    let refreshed = scene.refresh_connections(&[group]);
    assert!(refreshed.contains(&id("submit_to_approve")));
    assert_bindings_live(&scene);

    scene.get_mut(group).unwrap().rotate_to(30.0);
    scene.refresh_connections(&[group]);
    assert_bindings_live(&scene);

    scene.get_mut(group).unwrap().scale_to(1.5, 0.75);
    scene.refresh_connections(&[group]);
    assert_bindings_live(&scene);

    let line = scene.get(id("submit_to_approve")).unwrap().as_connector().unwrap();
    assert_eq!(line.state(), BindingState::FullyBound);
}

#[test]
fn dragging_a_line_detaches_it() {
    let mut scene = load();
    scene.translate(id("approve_out"), Vec2::new(10.0, 10.0));
    let line = scene.get(id("approve_out")).unwrap().as_connector().unwrap();
    assert_eq!(line.state(), BindingState::Unbound);
}

// ─── Anchors under the viewport ──────────────────────────────────────────

#[test]
fn anchor_roundtrip_through_viewport() {
    let mut scene = load();
    let shape = scene.get_mut(id("submit")).unwrap();
    shape.rotate_to(33.0);
    shape.scale_to(1.4, 0.8);
    let shape = scene.get(id("submit")).unwrap().clone();

    let mut viewport = Viewport::new(1024.0, 768.0);
    viewport.zoom_to_point(Point::new(300.0, 200.0), 1.6, &ZoomBounds::default());
    viewport.relative_pan(Vec2::new(-55.0, 18.0));

    let m = scene.absolute_matrix(shape.id);
    for anchor in &shape.anchors {
        let screen = anchor.screen_point(&m, shape.frame.width, shape.frame.height, &viewport.transform());
        let canvas = viewport.screen_to_canvas(screen);
        let (rx, ry) = Anchor::relative_from_canvas(canvas, &m, shape.frame.width, shape.frame.height);
        assert!((rx - anchor.x).abs() < 1e-9 && (ry - anchor.y).abs() < 1e-9);
    }
}

// ─── Removal ─────────────────────────────────────────────────────────────

#[test]
fn removing_a_shape_unbinds_its_lines() {
    let mut scene = load();
    scene.remove(id("submit"));
    let a = scene.get(id("start_to_submit")).unwrap().as_connector().unwrap();
    let b = scene.get(id("submit_to_approve")).unwrap().as_connector().unwrap();
    assert!(a.to.is_none() && a.from.is_some());
    assert!(b.from.is_none() && b.to.is_some());
    assert!(scene.connectors_bound_to(id("submit")).is_empty());
}

#[test]
fn snapshot_survives_clear_and_restore() {
    let mut scene = load();
    scene.add(grid_shape(GridSpec { left: 50.0, top: 50.0, width: 1300.0, height: 500.0, size: 10.0 })).unwrap();
    let snap = Snapshot::capture(&scene, TransactionType::Initialize);
    let bytes = snap.encode().unwrap();

    scene.clear(true);
    assert_eq!(scene.top_level(), vec![id("grid")]);

    restore(&mut scene, &Snapshot::decode(&bytes).unwrap().objects).unwrap();
    assert_eq!(describe(&scene), snap.objects);
    assert_eq!(scene.top_level()[0], id("grid"));
}
