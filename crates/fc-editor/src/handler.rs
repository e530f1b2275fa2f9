//! Editor session.
//!
//! `Handler` owns the scene, the viewport and every per-session handler.
//! Input events and direct commands edit the scene and queue
//! [`EditorAction`]s for the host (re-render, cursor, context menu, ...).
//! Every structural edit outside a history replay records a transaction.

use crate::clipboard::Clipboard;
use crate::config::EditorConfig;
use crate::connection::ConnectionHandler;
use crate::context_menu::{ContextMenu, MenuCommand};
use crate::grid::resize_grid;
use crate::guidelines::{GuideLine, GuidelineHandler};
use crate::input::{InputEvent, Modifiers, PointerButton};
use crate::interaction::{Cursor, Gesture, InteractionMode};
use crate::minimap::MiniMap;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::transaction::TransactionHandler;
use fc_core::connection::{ArrowType, BindingState, ConnectionLine, LineEnd};
use fc_core::snapshot::{self, describe_ids, restore};
use fc_core::{Point, Rect, Scene, Shape, ShapeId, TransactionType, Vec2, Viewport, ZoomBounds, grid_shape};
use fc_render::{
    DisplayList, HANDLE_RADIUS, Overlay, build_display_list, hit_endpoint, hit_test, hit_test_rect,
};
use kurbo::Line;

/// Something the host must do in response to an event or command.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    RenderNeeded,
    SetCursor(Cursor),
    ModeChanged(InteractionMode),
    SelectionChanged(Vec<ShapeId>),
    OpenContextMenu(ContextMenu),
    EnterTextEditing(ShapeId),
    ExitTextEditing(ShapeId),
    ZoomChanged(f64),
    /// The minimap background is stale and should be redrawn.
    MiniMapRefresh,
    /// A history entry could not be recorded; the edit itself stands.
    HistoryWarning(String),
}

pub struct Handler {
    pub scene: Scene,
    pub viewport: Viewport,
    pub minimap: MiniMap,
    config: EditorConfig,
    bounds: ZoomBounds,
    mode: InteractionMode,
    /// Mode to return to when a temporary grab (Space or Alt-drag) ends.
    held_grab: Option<InteractionMode>,
    space_held: bool,
    selection: Vec<ShapeId>,
    editing: Option<ShapeId>,
    clipboard: Clipboard,
    connections: ConnectionHandler,
    guidelines: GuidelineHandler,
    transactions: TransactionHandler,
    gesture: Gesture,
    cursor: Cursor,
    clock_ms: u64,
    actions: Vec<EditorAction>,
}

impl Handler {
    /// A fresh canvas holding only the configured grid.
    pub fn new(config: EditorConfig, width: f64, height: f64) -> Self {
        let mut scene = Scene::new();
        if let Err(e) = scene.add(grid_shape(config.grid_spec())) {
            log::warn!("grid not created: {e}");
        }
        Self::with_scene(config, scene, width, height)
    }

    pub fn with_scene(config: EditorConfig, scene: Scene, width: f64, height: f64) -> Self {
        let viewport = Viewport::new(width, height);
        let mut minimap = MiniMap::new(config.mini_map_width, config.mini_map_height, config.mini_map_debounce_ms);
        minimap.update_minimap_vp(&viewport);
        let mut transactions = TransactionHandler::new(config.max_history, config.history_throttle_ms);
        if let Err(e) = transactions.initialize(&scene) {
            log::warn!("history starts empty: {e}");
        }
        Self {
            scene,
            viewport,
            minimap,
            bounds: config.zoom_bounds(),
            mode: InteractionMode::Selection,
            held_grab: None,
            space_held: false,
            selection: Vec::new(),
            editing: None,
            clipboard: Clipboard::default(),
            connections: ConnectionHandler::new(config.anchor_size, config.connection_padding),
            guidelines: GuidelineHandler::new(config.aligning_line_margin, config.aligning_line_offset),
            transactions,
            gesture: Gesture::Idle,
            cursor: Cursor::Default,
            clock_ms: 0,
            actions: Vec::new(),
            config,
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn selection(&self) -> &[ShapeId] {
        &self.selection
    }

    pub fn editing(&self) -> Option<ShapeId> {
        self.editing
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn transactions(&self) -> &TransactionHandler {
        &self.transactions
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Drain the queued actions.
    pub fn take_actions(&mut self) -> Vec<EditorAction> {
        std::mem::take(&mut self.actions)
    }

    fn emit(&mut self, action: EditorAction) {
        if action == EditorAction::RenderNeeded && self.actions.contains(&action) {
            return;
        }
        self.actions.push(action);
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        if self.cursor != cursor {
            self.cursor = cursor;
            self.emit(EditorAction::SetCursor(cursor));
        }
    }

    // ─── Event dispatch ──────────────────────────────────────────────────

    /// Process one input event at host time `now_ms`.
    pub fn handle(&mut self, event: &InputEvent, now_ms: u64) -> Vec<EditorAction> {
        self.clock_ms = now_ms;
        match event {
            InputEvent::PointerDown {
                x,
                y,
                button,
                modifiers,
            } => self.pointer_down(Point::new(*x, *y), *button, modifiers),
            InputEvent::PointerMove { x, y, modifiers } => self.pointer_move(Point::new(*x, *y), modifiers),
            InputEvent::PointerUp { x, y, .. } => self.pointer_up(Point::new(*x, *y)),
            InputEvent::Wheel { x, y, delta_y } => self.wheel(Point::new(*x, *y), *delta_y),
            InputEvent::DoubleClick { x, y } => {
                let p = self.viewport.screen_to_canvas(Point::new(*x, *y));
                self.double_click(p);
            }
            InputEvent::KeyDown { key, modifiers } => self.key_down(key, modifiers, now_ms),
            InputEvent::KeyUp { key, .. } => self.key_up(key),
        }
        self.take_actions()
    }

    /// Advance host time; fires the debounced minimap refresh when due.
    pub fn tick(&mut self, now_ms: u64) -> Vec<EditorAction> {
        self.clock_ms = now_ms;
        if self.minimap.take_refresh(now_ms) {
            self.emit(EditorAction::MiniMapRefresh);
        }
        self.take_actions()
    }

    fn pointer_down(&mut self, screen: Point, button: PointerButton, modifiers: &Modifiers) {
        let p = self.viewport.screen_to_canvas(screen);
        let menu_click = button == PointerButton::Secondary
            || (self.config.mac && button == PointerButton::Middle && modifiers.ctrl);
        if menu_click {
            self.open_context_menu(screen, p);
            return;
        }
        if button != PointerButton::Primary {
            return;
        }
        if let Some(editing) = self.editing
            && hit_test(&self.scene, p, self.tolerance()) != Some(editing)
        {
            self.exit_text_editing();
        }
        if modifiers.alt {
            self.enter_grab(true);
        }
        match self.mode {
            InteractionMode::Grab => {
                self.gesture = Gesture::Pan { last: screen };
                self.set_cursor(Cursor::Grabbing);
            }
            InteractionMode::Selection => self.selection_down(p, modifiers),
            mode if mode.draws_connectors() => self.draw_down(screen, p),
            _ => {}
        }
    }

    fn selection_down(&mut self, p: Point, modifiers: &Modifiers) {
        let tolerance = self.tolerance();
        if let &[line] = self.selection.as_slice()
            && let Some(end) = hit_endpoint(&self.scene, line, p, tolerance + HANDLE_RADIUS / self.zoom())
        {
            self.connections.begin(line, end);
            self.gesture = Gesture::Endpoint {
                line,
                end,
                moved: false,
            };
            return;
        }

        let hit = hit_test(&self.scene, p, tolerance).filter(|id| self.scene.get(*id).is_some_and(|s| s.selectable));
        let Some(id) = hit else {
            if !modifiers.shift {
                self.clear_selection();
            }
            self.gesture = Gesture::Marquee { start: p, current: p };
            return;
        };

        if modifiers.shift {
            if let Some(pos) = self.selection.iter().position(|s| *s == id) {
                self.selection.remove(pos);
            } else {
                self.selection.push(id);
            }
        } else if !self.selection.contains(&id) {
            self.selection = vec![id];
        }
        self.emit(EditorAction::SelectionChanged(self.selection.clone()));
        self.emit(EditorAction::RenderNeeded);

        let starts: Vec<(ShapeId, Point)> = self
            .selection
            .iter()
            .filter_map(|id| self.scene.get(*id))
            .filter(|s| !s.locked)
            .map(|s| (s.id, s.frame.center()))
            .collect();
        if !starts.is_empty() {
            self.gesture = Gesture::Move {
                origin: p,
                starts,
                moved: false,
            };
        }
    }

    fn draw_down(&mut self, screen: Point, p: Point) {
        let arrow = if self.mode == InteractionMode::Line {
            ArrowType::None
        } else {
            ArrowType::Normal
        };
        let id = ShapeId::with_prefix("connector");
        if let Err(e) = self.scene.add(Shape::connector(id, ConnectionLine::straight(p, p, arrow))) {
            log::warn!("cannot start a connector: {e}");
            return;
        }
        if self.mode == InteractionMode::Link {
            self.connections.begin(id, LineEnd::From);
            self.connections.on_mouse_move(&mut self.scene, screen, p);
            self.connections.begin(id, LineEnd::To);
        }
        self.gesture = Gesture::Draw { line: id };
        self.emit(EditorAction::RenderNeeded);
    }

    fn pointer_move(&mut self, screen: Point, modifiers: &Modifiers) {
        let p = self.viewport.screen_to_canvas(screen);
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => self.hover(p),
            Gesture::Pan { last } => {
                self.viewport.relative_pan(screen - last);
                self.minimap.update_minimap_vp(&self.viewport);
                self.gesture = Gesture::Pan { last: screen };
                self.emit(EditorAction::RenderNeeded);
            }
            Gesture::Move { origin, starts, .. } => {
                let mut delta = p - origin;
                if modifiers.shift {
                    if delta.x.abs() > delta.y.abs() {
                        delta.y = 0.0;
                    } else {
                        delta.x = 0.0;
                    }
                }
                self.drag_selection(&starts, delta);
                self.gesture = Gesture::Move {
                    origin,
                    starts,
                    moved: true,
                };
            }
            Gesture::Endpoint { line, end, .. } => {
                if self.connections.on_mouse_move(&mut self.scene, screen, p) {
                    self.emit(EditorAction::RenderNeeded);
                }
                self.gesture = Gesture::Endpoint { line, end, moved: true };
            }
            Gesture::Draw { line } => {
                if self.mode == InteractionMode::Link {
                    self.connections.on_mouse_move(&mut self.scene, screen, p);
                } else {
                    self.scene.set_endpoint(line, LineEnd::To, p);
                }
                self.gesture = Gesture::Draw { line };
                self.emit(EditorAction::RenderNeeded);
            }
            Gesture::Marquee { start, .. } => {
                self.gesture = Gesture::Marquee { start, current: p };
                self.emit(EditorAction::RenderNeeded);
            }
        }
    }

    /// Place every dragged shape at its start position plus `delta`, then
    /// snap, re-bind and grow the grid.
    fn drag_selection(&mut self, starts: &[(ShapeId, Point)], delta: Vec2) {
        let ids: Vec<ShapeId> = starts.iter().map(|(id, _)| *id).collect();
        for (id, start) in starts {
            if self.follows_targets(*id, &ids) {
                continue;
            }
            if let Some(shape) = self.scene.get_mut(*id) {
                shape.set_position(*start + delta);
            }
        }
        if let &[single] = ids.as_slice() {
            self.guidelines.on_object_moving(&mut self.scene, single);
        }
        self.connections.refresh_bindings(&mut self.scene, &ids);
        resize_grid(&mut self.scene, &ids, self.config.grid_grow_margin);
        self.emit(EditorAction::RenderNeeded);
    }

    /// A fully bound connector dragged along with both of its targets is
    /// carried by the bindings instead of being detached.
    fn follows_targets(&self, id: ShapeId, moving: &[ShapeId]) -> bool {
        self.scene
            .get(id)
            .and_then(Shape::as_connector)
            .is_some_and(|line| {
                line.state() == BindingState::FullyBound
                    && [line.from, line.to]
                        .into_iter()
                        .flatten()
                        .all(|b| moving.contains(&b.target))
            })
    }

    fn hover(&mut self, p: Point) {
        if self.mode != InteractionMode::Selection {
            return;
        }
        let cursor = match hit_test(&self.scene, p, self.tolerance()) {
            Some(_) => Cursor::Move,
            None => Cursor::Default,
        };
        self.set_cursor(cursor);
    }

    fn pointer_up(&mut self, screen: Point) {
        let p = self.viewport.screen_to_canvas(screen);
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => {}
            Gesture::Pan { .. } => {
                self.set_cursor(Cursor::Grab);
                if !self.space_held {
                    self.leave_grab();
                }
            }
            Gesture::Move { moved, .. } => {
                self.guidelines.on_mouse_up();
                if moved {
                    self.commit(TransactionType::Moved);
                }
            }
            Gesture::Endpoint { moved, .. } => {
                self.connections.end();
                if moved {
                    self.commit(TransactionType::Connect);
                }
            }
            Gesture::Draw { line } => {
                self.connections.end();
                let degenerate = self
                    .scene
                    .get(line)
                    .and_then(Shape::as_connector)
                    .is_some_and(|l| l.endpoint(LineEnd::From) == l.endpoint(LineEnd::To));
                if degenerate {
                    self.scene.remove(line);
                    self.emit(EditorAction::RenderNeeded);
                } else {
                    self.selection = vec![line];
                    self.emit(EditorAction::SelectionChanged(self.selection.clone()));
                    self.commit(TransactionType::Add);
                }
            }
            Gesture::Marquee { start, .. } => {
                let band = Rect::from_points(start, p);
                if band.width() > 0.0 || band.height() > 0.0 {
                    self.selection = hit_test_rect(&self.scene, band);
                    self.emit(EditorAction::SelectionChanged(self.selection.clone()));
                }
                self.emit(EditorAction::RenderNeeded);
            }
        }
    }

    fn wheel(&mut self, screen: Point, delta_y: f64) {
        if delta_y == 0.0 {
            return;
        }
        let step = if delta_y < 0.0 {
            self.config.zoom_step
        } else {
            -self.config.zoom_step
        };
        let zoom = self.viewport.zoom_to_point(screen, self.viewport.zoom + step, &self.bounds);
        self.after_zoom(zoom);
    }

    fn key_down(&mut self, key: &str, modifiers: &Modifiers, now_ms: u64) {
        if self.editing.is_some() {
            if key == "Escape" {
                self.exit_text_editing();
            }
            return;
        }
        let Some(action) = ShortcutMap::resolve(key, modifiers) else {
            return;
        };
        log::trace!("shortcut {action:?}");
        match action {
            ShortcutAction::PanStart => {
                self.space_held = true;
                self.enter_grab(true);
            }
            ShortcutAction::Undo => {
                self.undo(now_ms);
            }
            ShortcutAction::Redo => {
                self.redo(now_ms);
            }
            ShortcutAction::Delete => {
                self.remove_selection();
            }
            ShortcutAction::SelectAll => {
                self.select_all();
            }
            ShortcutAction::Copy => {
                self.copy();
            }
            ShortcutAction::Cut => {
                self.cut();
            }
            ShortcutAction::Paste => {
                self.paste();
            }
            ShortcutAction::Group => {
                if let Err(e) = self.group_selection() {
                    log::debug!("group skipped: {e}");
                }
            }
            ShortcutAction::Ungroup => {
                if let Err(e) = self.ungroup_selection() {
                    log::debug!("ungroup skipped: {e}");
                }
            }
            ShortcutAction::ZoomIn => {
                self.zoom_in();
            }
            ShortcutAction::ZoomOut => {
                self.zoom_out();
            }
            ShortcutAction::ZoomToFit => {
                self.zoom_to_fit();
            }
            ShortcutAction::SendBackward => self.restack(Scene::send_backward),
            ShortcutAction::BringForward => self.restack(Scene::bring_forward),
            ShortcutAction::SendToBack => self.restack(Scene::send_to_back),
            ShortcutAction::BringToFront => self.restack(Scene::bring_to_front),
            ShortcutAction::Escape => self.clear_selection(),
        }
    }

    fn key_up(&mut self, key: &str) {
        if key != " " {
            return;
        }
        self.space_held = false;
        if matches!(self.gesture, Gesture::Pan { .. }) {
            self.gesture = Gesture::Idle;
        }
        self.leave_grab();
    }

    // ─── Modes ───────────────────────────────────────────────────────────

    pub fn set_interaction_mode(&mut self, mode: InteractionMode) {
        self.held_grab = None;
        self.gesture = Gesture::Idle;
        self.switch_mode(mode);
    }

    fn enter_grab(&mut self, temporary: bool) {
        if self.mode == InteractionMode::Grab {
            return;
        }
        if temporary {
            self.held_grab = Some(self.mode);
        }
        self.switch_mode(InteractionMode::Grab);
    }

    fn leave_grab(&mut self) {
        if let Some(previous) = self.held_grab.take() {
            self.switch_mode(previous);
        }
    }

    fn switch_mode(&mut self, mode: InteractionMode) {
        if mode == self.mode {
            return;
        }
        log::debug!("mode {:?} → {mode:?}", self.mode);
        self.mode = mode;
        self.apply_evented();
        self.emit(EditorAction::ModeChanged(mode));
        let cursor = match mode {
            InteractionMode::Grab => Cursor::Grab,
            m if m.draws_connectors() => Cursor::Crosshair,
            _ => Cursor::Default,
        };
        self.set_cursor(cursor);
    }

    /// Shapes only take pointer events outside grab mode; the grid never does.
    fn apply_evented(&mut self) {
        let evented = self.mode != InteractionMode::Grab;
        for id in self.scene.paint_order() {
            if let Some(shape) = self.scene.get_mut(id) {
                shape.evented = evented && !shape.is_grid();
            }
        }
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Select `ids`, skipping unknown, unselectable and grid shapes.
    pub fn select(&mut self, ids: &[ShapeId]) {
        self.selection = ids
            .iter()
            .copied()
            .filter(|id| self.scene.get(*id).is_some_and(|s| s.selectable && !s.is_grid()))
            .collect();
        self.emit(EditorAction::SelectionChanged(self.selection.clone()));
        self.emit(EditorAction::RenderNeeded);
    }

    pub fn clear_selection(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.selection.clear();
        self.emit(EditorAction::SelectionChanged(Vec::new()));
        self.emit(EditorAction::RenderNeeded);
    }

    /// Select every interactive, unlocked shape. Returns the count.
    pub fn select_all(&mut self) -> usize {
        let ids: Vec<ShapeId> = self
            .scene
            .top_level()
            .into_iter()
            .filter(|id| {
                self.scene
                    .get(*id)
                    .is_some_and(|s| !s.is_grid() && s.selectable && s.evented && !s.locked)
            })
            .collect();
        self.selection = ids;
        self.emit(EditorAction::SelectionChanged(self.selection.clone()));
        self.emit(EditorAction::RenderNeeded);
        self.selection.len()
    }

    // ─── Structural edits ────────────────────────────────────────────────

    pub fn add_shape(&mut self, mut shape: Shape) -> Result<ShapeId, String> {
        shape.evented = self.mode != InteractionMode::Grab && !shape.is_grid();
        let id = shape.id;
        self.scene.add(shape)?;
        resize_grid(&mut self.scene, &[id], self.config.grid_grow_margin);
        self.commit(TransactionType::Add);
        Ok(id)
    }

    /// Remove shapes (never the grid). Returns how many were removed.
    pub fn remove_shapes(&mut self, ids: &[ShapeId]) -> usize {
        let removed = self.remove_quietly(ids);
        if removed > 0 {
            self.commit(TransactionType::Remove);
        }
        removed
    }

    pub fn remove_selection(&mut self) -> usize {
        let ids = self.selection.clone();
        self.remove_shapes(&ids)
    }

    fn remove_quietly(&mut self, ids: &[ShapeId]) -> usize {
        let mut removed = 0;
        for id in ids {
            if self.scene.get(*id).is_some_and(Shape::is_grid) {
                continue;
            }
            if self.scene.remove(*id).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            self.prune_stale_ids();
        }
        removed
    }

    fn prune_stale_ids(&mut self) {
        let before = self.selection.len();
        self.selection.retain(|id| self.scene.contains(*id));
        if self.selection.len() != before {
            self.emit(EditorAction::SelectionChanged(self.selection.clone()));
        }
        if let Some(id) = self.editing
            && !self.scene.contains(id)
        {
            self.editing = None;
            self.emit(EditorAction::ExitTextEditing(id));
        }
    }

    pub fn copy(&mut self) -> usize {
        self.clipboard.copy(&self.scene, &self.selection)
    }

    /// Copy then remove the selection; the next paste empties the clipboard.
    pub fn cut(&mut self) -> usize {
        if self.selection.is_empty() {
            return 0;
        }
        let ids = self.selection.clone();
        self.clipboard.cut(&self.scene, &ids);
        let removed = self.remove_quietly(&ids);
        if removed > 0 {
            self.commit(TransactionType::Cut);
        }
        removed
    }

    /// Insert the clipboard contents offset by the paste padding, and
    /// select them. No-op with an empty clipboard.
    pub fn paste(&mut self) -> Vec<ShapeId> {
        let descriptors = self.clipboard.take_for_paste(self.config.paste_padding());
        if descriptors.is_empty() {
            return Vec::new();
        }
        match restore(&mut self.scene, &descriptors) {
            Ok(ids) => {
                self.apply_evented();
                resize_grid(&mut self.scene, &ids, self.config.grid_grow_margin);
                self.selection = ids.clone();
                self.emit(EditorAction::SelectionChanged(ids.clone()));
                self.commit(TransactionType::Paste);
                ids
            }
            Err(e) => {
                log::warn!("paste failed: {e}");
                Vec::new()
            }
        }
    }

    pub fn group_selection(&mut self) -> Result<ShapeId, String> {
        let ids = self.selection.clone();
        let group = self.scene.group(&ids, ShapeId::with_prefix("group"))?;
        self.selection = vec![group];
        self.emit(EditorAction::SelectionChanged(self.selection.clone()));
        self.commit(TransactionType::Group);
        Ok(group)
    }

    pub fn ungroup_selection(&mut self) -> Result<Vec<ShapeId>, String> {
        let &[group] = self.selection.as_slice() else {
            return Err("select exactly one group".to_string());
        };
        let members = self.scene.ungroup(group)?;
        self.selection = members.clone();
        self.emit(EditorAction::SelectionChanged(members.clone()));
        self.commit(TransactionType::Ungroup);
        Ok(members)
    }

    /// Set the scale of every unlocked selected shape.
    pub fn scale_selection(&mut self, scale_x: f64, scale_y: f64) -> usize {
        let ids = self.transformable_selection();
        for id in &ids {
            if let Some(shape) = self.scene.get_mut(*id) {
                shape.scale_to(scale_x, scale_y);
            }
        }
        self.after_transform(&ids, TransactionType::Scaled)
    }

    /// Set the rotation (degrees) of every unlocked selected shape.
    pub fn rotate_selection(&mut self, angle: f64) -> usize {
        let ids = self.transformable_selection();
        for id in &ids {
            if let Some(shape) = self.scene.get_mut(*id) {
                shape.rotate_to(angle);
            }
        }
        self.after_transform(&ids, TransactionType::Rotated)
    }

    fn transformable_selection(&self) -> Vec<ShapeId> {
        self.selection
            .iter()
            .copied()
            .filter(|id| {
                self.scene
                    .get(*id)
                    .is_some_and(|s| !s.locked && s.as_connector().is_none())
            })
            .collect()
    }

    fn after_transform(&mut self, ids: &[ShapeId], kind: TransactionType) -> usize {
        if ids.is_empty() {
            return 0;
        }
        self.connections.refresh_bindings(&mut self.scene, ids);
        resize_grid(&mut self.scene, ids, self.config.grid_grow_margin);
        self.commit(kind);
        ids.len()
    }

    /// Replace a shape's text. False for shapes without text.
    pub fn set_shape_text(&mut self, id: ShapeId, text: &str) -> bool {
        let Some(content) = self.scene.get_mut(id).and_then(|s| s.text.as_mut()) else {
            return false;
        };
        if content.text == text {
            return true;
        }
        content.text = text.to_string();
        self.commit(TransactionType::Modified);
        true
    }

    fn restack(&mut self, op: fn(&mut Scene, ShapeId) -> bool) {
        let mut changed = false;
        for id in self.selection.clone() {
            changed |= op(&mut self.scene, id);
        }
        if changed {
            self.commit(TransactionType::Modified);
        }
    }

    // ─── Text editing ────────────────────────────────────────────────────

    /// Start editing the text of the shape under `p` (canvas space).
    pub fn double_click(&mut self, p: Point) -> Option<ShapeId> {
        if self.mode != InteractionMode::Selection {
            return None;
        }
        let id = hit_test(&self.scene, p, self.tolerance())?;
        if self.editing == Some(id) {
            return Some(id);
        }
        self.exit_text_editing();
        if !self.scene.get_mut(id)?.enter_editing() {
            return None;
        }
        self.editing = Some(id);
        self.selection = vec![id];
        self.emit(EditorAction::SelectionChanged(self.selection.clone()));
        self.emit(EditorAction::EnterTextEditing(id));
        self.emit(EditorAction::RenderNeeded);
        Some(id)
    }

    pub fn exit_text_editing(&mut self) {
        let Some(id) = self.editing.take() else {
            return;
        };
        if let Some(shape) = self.scene.get_mut(id) {
            shape.exit_editing();
        }
        self.emit(EditorAction::ExitTextEditing(id));
        self.emit(EditorAction::RenderNeeded);
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self, now_ms: u64) -> Option<TransactionType> {
        let result = self.transactions.undo(&mut self.scene, now_ms);
        self.after_replay(result)
    }

    pub fn redo(&mut self, now_ms: u64) -> Option<TransactionType> {
        let result = self.transactions.redo(&mut self.scene, now_ms);
        self.after_replay(result)
    }

    fn after_replay(&mut self, result: Result<Option<TransactionType>, String>) -> Option<TransactionType> {
        match result {
            Ok(Some(kind)) => {
                self.gesture = Gesture::Idle;
                self.guidelines.on_mouse_up();
                self.apply_evented();
                self.prune_stale_ids();
                self.minimap.update_minimap(self.clock_ms);
                self.emit(EditorAction::RenderNeeded);
                Some(kind)
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("history replay failed: {e}");
                self.emit(EditorAction::HistoryWarning(e));
                self.emit(EditorAction::RenderNeeded);
                None
            }
        }
    }

    /// Record a transaction unless a replay is running.
    fn commit(&mut self, kind: TransactionType) {
        self.minimap.update_minimap(self.clock_ms);
        self.emit(EditorAction::RenderNeeded);
        if let Err(e) = self.transactions.save(&self.scene, kind) {
            self.emit(EditorAction::HistoryWarning(e));
        }
    }

    // ─── Zoom & minimap ──────────────────────────────────────────────────

    pub fn zoom_in(&mut self) -> f64 {
        let zoom = self.viewport.set_zoom(self.viewport.zoom + self.config.zoom_step, &self.bounds);
        self.after_zoom(zoom);
        zoom
    }

    pub fn zoom_out(&mut self) -> f64 {
        let zoom = self.viewport.set_zoom(self.viewport.zoom - self.config.zoom_step, &self.bounds);
        self.after_zoom(zoom);
        zoom
    }

    /// Fit every shape on screen. Keeps the view when the canvas is empty.
    pub fn zoom_to_fit(&mut self) -> f64 {
        let Some(content) = self.scene.content_bounds() else {
            return self.viewport.zoom;
        };
        let zoom = self.viewport.zoom_to_fit(content, self.config.grid_size * 2.0, &self.bounds);
        self.after_zoom(zoom);
        zoom
    }

    fn after_zoom(&mut self, zoom: f64) {
        self.minimap.update_minimap_vp(&self.viewport);
        self.emit(EditorAction::ZoomChanged(zoom));
        self.emit(EditorAction::RenderNeeded);
    }

    /// The minimap box was dragged by `delta` minimap pixels.
    pub fn move_minimap_box(&mut self, delta: Vec2) {
        self.minimap.on_box_moved(&mut self.viewport, delta);
        self.emit(EditorAction::RenderNeeded);
    }

    /// The minimap box was resized to `scale_x` of its unzoomed width.
    pub fn scale_minimap_box(&mut self, scale_x: f64) -> f64 {
        let zoom = self.minimap.on_box_scaled(&mut self.viewport, scale_x, &self.bounds);
        self.emit(EditorAction::ZoomChanged(zoom));
        self.emit(EditorAction::RenderNeeded);
        zoom
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.width = width;
        self.viewport.height = height;
        self.minimap.update_minimap_vp(&self.viewport);
        self.emit(EditorAction::RenderNeeded);
    }

    // ─── Context menu & templates ────────────────────────────────────────

    fn open_context_menu(&mut self, screen: Point, p: Point) {
        if let Some(id) = hit_test(&self.scene, p, self.tolerance())
            && !self.selection.contains(&id)
            && self.scene.get(id).is_some_and(|s| s.selectable)
        {
            self.selection = vec![id];
            self.emit(EditorAction::SelectionChanged(self.selection.clone()));
        }
        let menu = ContextMenu::build(screen, !self.selection.is_empty(), self.clipboard.is_empty());
        self.emit(EditorAction::OpenContextMenu(menu));
    }

    /// Run a context menu command. `AddPersonalShape` yields the template
    /// JSON.
    pub fn run_menu_command(&mut self, command: MenuCommand) -> Result<Option<String>, String> {
        match command {
            MenuCommand::CutShapes => {
                self.cut();
            }
            MenuCommand::CopyShapes => {
                self.copy();
            }
            MenuCommand::PasteShapes => {
                self.paste();
            }
            MenuCommand::DeleteShapes => {
                self.remove_selection();
            }
            MenuCommand::AddPersonalShape => return self.save_as_template().map(Some),
        }
        Ok(None)
    }

    /// The selection as a JSON template.
    pub fn save_as_template(&self) -> Result<String, String> {
        if self.selection.is_empty() {
            return Err("nothing selected".to_string());
        }
        snapshot::to_json(&describe_ids(&self.scene, &self.selection))
    }

    /// Insert shapes from a JSON document, keeping their ids.
    pub fn load_json(&mut self, json: &str) -> Result<Vec<ShapeId>, String> {
        let descriptors = snapshot::from_json(json)?;
        let ids = restore(&mut self.scene, &descriptors)?;
        self.scene.refresh_all_connections();
        self.apply_evented();
        resize_grid(&mut self.scene, &ids, self.config.grid_grow_margin);
        self.commit(TransactionType::Add);
        Ok(ids)
    }

    /// Insert a saved template under fresh ids, offset like a paste.
    pub fn insert_template(&mut self, json: &str) -> Result<Vec<ShapeId>, String> {
        self.clipboard.load_json(json)?;
        Ok(self.paste())
    }

    /// Every shape (grid excluded) as a JSON document.
    pub fn to_json(&self) -> Result<String, String> {
        snapshot::to_json(&snapshot::describe(&self.scene))
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Build the main display list. Alignment guides collected since the
    /// last render are drawn once and then dropped.
    pub fn render(&mut self) -> DisplayList {
        self.guidelines.before_render();
        let guides: Vec<Line> = self
            .guidelines
            .after_render()
            .iter()
            .map(GuideLine::to_line)
            .collect();
        let overlay = Overlay {
            selection: &self.selection,
            guides: &guides,
            guide_width: self.config.aligning_line_width,
            marquee: self.gesture.marquee_rect(),
            anchor_size: self.config.anchor_size,
            editing: self.editing,
        };
        build_display_list(&self.scene, &self.viewport, &overlay)
    }

    pub fn render_minimap(&self) -> DisplayList {
        self.minimap.display(&self.scene, &self.viewport)
    }

    fn zoom(&self) -> f64 {
        self.viewport.zoom.max(f64::EPSILON)
    }

    /// Hit tolerance in canvas units.
    fn tolerance(&self) -> f64 {
        self.config.hit_tolerance / self.zoom()
    }
}
