//! Integration tests: snapshot history through `Handler`.
//!
//! Every recorded edit must be exactly reversible: undoing N edits walks
//! back through the N previous scene states, and redoing walks forward
//! again.

use fc_core::model::{Frame, Shape, ShapeKind};
use fc_core::snapshot::{ShapeDescriptor, describe};
use fc_core::{ShapeId, TransactionType};
use fc_editor::*;
use pretty_assertions::assert_eq;

fn id(s: &str) -> ShapeId {
    ShapeId::intern(s)
}

fn onboarding() -> Handler {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut h = Handler::new(EditorConfig::default(), 1200.0, 800.0);
    h.load_json(include_str!("fixtures/onboarding.json")).unwrap();
    h
}

fn state(h: &Handler) -> Vec<ShapeDescriptor> {
    describe(&h.scene)
}

/// Host clock far enough apart to clear the undo/redo throttle.
fn tick(n: u64) -> u64 {
    1_000 + n * 250
}

#[test]
fn undo_and_redo_walk_every_state() {
    let mut h = onboarding();
    let mut states = vec![state(&h)];

    h.add_shape(Shape::new(id("ship"), ShapeKind::Activity, Frame::new(760.0, 340.0, 120.0, 60.0)))
        .unwrap();
    states.push(state(&h));

    h.select(&[id("laptop")]);
    h.rotate_selection(45.0);
    states.push(state(&h));

    h.select(&[id("hired"), id("laptop")]);
    h.group_selection().unwrap();
    states.push(state(&h));

    h.remove_shapes(&[id("accounts")]);
    states.push(state(&h));

    assert!(h.set_shape_text(id("ship"), "Ship welcome kit"));
    states.push(state(&h));

    let edits = states.len() - 1;
    for (n, expected) in states.iter().rev().skip(1).enumerate() {
        assert!(h.undo(tick(n as u64)).is_some(), "undo #{n}");
        assert_eq!(&state(&h), expected);
    }
    assert!(h.undo(tick(100)).is_some(), "the fixture load is undoable too");
    assert!(state(&h).is_empty());
    assert!(h.scene.grid().is_some());
    assert_eq!(h.redo(tick(101)), Some(TransactionType::Add));

    for (n, expected) in states.iter().skip(1).enumerate() {
        assert!(h.redo(tick(200 + n as u64)).is_some(), "redo #{n}");
        assert_eq!(&state(&h), expected);
    }
    assert_eq!(h.transactions().redo_len(), 0);
    assert_eq!(h.transactions().undo_len(), edits + 1);
}

#[test]
fn undo_reports_the_edit_kind() {
    let mut h = onboarding();
    h.select(&[id("accounts")]);
    h.remove_selection();
    h.select(&[id("hired"), id("laptop")]);
    h.group_selection().unwrap();

    assert_eq!(h.undo(tick(0)), Some(TransactionType::Group));
    assert_eq!(h.undo(tick(1)), Some(TransactionType::Remove));
    assert_eq!(h.redo(tick(2)), Some(TransactionType::Remove));
}

#[test]
fn a_new_edit_discards_redo() {
    let mut h = onboarding();
    h.remove_shapes(&[id("legend")]);
    assert!(h.undo(tick(0)).is_some());
    assert!(h.transactions().can_redo());

    h.add_shape(Shape::new(id("badge"), ShapeKind::Event, Frame::new(700.0, 200.0, 40.0, 40.0)))
        .unwrap();
    assert!(!h.transactions().can_redo());
    assert_eq!(h.redo(tick(1)), None);
    assert!(h.scene.contains(id("legend")));
}

#[test]
fn rapid_undo_is_throttled() {
    let mut h = onboarding();
    h.remove_shapes(&[id("hired")]);
    h.remove_shapes(&[id("laptop")]);

    assert!(h.undo(5_000).is_some());
    assert_eq!(h.undo(5_040), None);
    assert!(h.scene.contains(id("laptop")));
    assert!(!h.scene.contains(id("hired")));
    assert!(h.undo(5_100).is_some());
    assert!(h.scene.contains(id("hired")));
}

#[test]
fn replay_requests_a_single_render() {
    let mut h = onboarding();
    h.remove_shapes(&[id("accounts"), id("laptop")]);
    let before = h.scene.render_requests();
    h.undo(tick(0));
    assert_eq!(h.scene.render_requests(), before + 1);
    assert!(!h.transactions().is_active());
    assert!(h.scene.render_on_mutate);
}

#[test]
fn replay_restores_bindings() {
    let mut h = onboarding();
    h.remove_shapes(&[id("laptop")]);
    let line = h.scene.get(id("hired_to_laptop")).unwrap().as_connector().unwrap();
    assert!(line.to.is_none(), "removal unbinds");

    h.undo(tick(0));
    let line = h.scene.get(id("hired_to_laptop")).unwrap().as_connector().unwrap();
    assert_eq!(line.to.unwrap().target, id("laptop"));
}

#[test]
fn undo_drops_stale_selection() {
    let mut h = onboarding();
    h.add_shape(Shape::new(id("temp"), ShapeKind::Activity, Frame::new(700.0, 420.0, 80.0, 40.0)))
        .unwrap();
    h.select(&[id("temp"), id("hired")]);
    h.take_actions();
    h.undo(tick(0));
    let actions = h.take_actions();
    assert_eq!(h.selection(), &[id("hired")]);
    assert!(actions.contains(&EditorAction::SelectionChanged(vec![id("hired")])));
    assert!(actions.contains(&EditorAction::RenderNeeded));
}

#[test]
fn moves_made_by_dragging_are_undoable() {
    let mut h = onboarding();
    let press = InputEvent::PointerDown {
        x: 520.0,
        y: 200.0,
        button: PointerButton::Primary,
        modifiers: Modifiers::default(),
    };
    h.handle(&press, 0);
    h.handle(
        &InputEvent::PointerMove {
            x: 640.0,
            y: 330.0,
            modifiers: Modifiers::default(),
        },
        1,
    );
    h.handle(
        &InputEvent::PointerUp {
            x: 640.0,
            y: 330.0,
            modifiers: Modifiers::default(),
        },
        2,
    );
    assert_eq!(h.scene.get(id("accounts")).unwrap().frame.center(), fc_core::Point::new(640.0, 330.0));

    assert_eq!(h.undo(tick(0)), Some(TransactionType::Moved));
    assert_eq!(h.scene.get(id("accounts")).unwrap().frame.center(), fc_core::Point::new(520.0, 200.0));
}
