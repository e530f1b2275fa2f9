//! WASM bridge for Flow Canvas: exposes the editor engine to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The host forwards DOM
//! events with its own clock (`performance.now()`), executes the returned
//! actions, and calls `render` when asked to.

mod render2d;

use fc_core::{Point, ShapeId, Vec2};
use fc_editor::{
    EditorAction, EditorConfig, Handler, InputEvent, InteractionMode, MenuCommand, Modifiers, PointerButton,
};
use serde_json::{Value, json};
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// The JavaScript-facing canvas controller. All interaction from the page
/// goes through this struct.
#[wasm_bindgen]
pub struct FlowCanvas {
    handler: Handler,
}

#[wasm_bindgen]
impl FlowCanvas {
    /// Create a controller with the default configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        console_error_panic_hook_setup();
        Self {
            handler: Handler::new(EditorConfig::default(), width, height),
        }
    }

    /// Create a controller from a (possibly partial) JSON configuration.
    pub fn with_config(config_json: &str, width: f64, height: f64) -> Result<FlowCanvas, JsValue> {
        console_error_panic_hook_setup();
        let config = EditorConfig::from_json(config_json).map_err(|e| {
            log::warn!("rejected editor config: {e}");
            JsValue::from_str(&e)
        })?;
        Ok(Self {
            handler: Handler::new(config, width, height),
        })
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Draw the main canvas.
    pub fn render(&mut self, ctx: &CanvasRenderingContext2d) {
        let list = self.handler.render();
        let vp = self.handler.viewport;
        render2d::render_list(ctx, &list, vp.width, vp.height);
    }

    /// Draw the minimap onto its own canvas.
    pub fn render_minimap(&self, ctx: &CanvasRenderingContext2d) {
        let list = self.handler.render_minimap();
        let size = self.handler.minimap.size();
        render2d::render_list(ctx, &list, size.width, size.height);
    }

    pub fn resize(&mut self, width: f64, height: f64) -> String {
        self.handler.resize(width, height);
        self.flush()
    }

    // ─── Input events ────────────────────────────────────────────────────
    //
    // Each returns the emitted actions as a JSON array.

    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_down(
        &mut self,
        x: f64,
        y: f64,
        button: i16,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        now_ms: f64,
    ) -> String {
        let event = InputEvent::PointerDown {
            x,
            y,
            button: PointerButton::from_dom(button),
            modifiers: modifiers(shift, ctrl, alt, meta),
        };
        self.dispatch(&event, now_ms)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_move(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        now_ms: f64,
    ) -> String {
        let event = InputEvent::PointerMove {
            x,
            y,
            modifiers: modifiers(shift, ctrl, alt, meta),
        };
        self.dispatch(&event, now_ms)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_up(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        now_ms: f64,
    ) -> String {
        let event = InputEvent::PointerUp {
            x,
            y,
            modifiers: modifiers(shift, ctrl, alt, meta),
        };
        self.dispatch(&event, now_ms)
    }

    pub fn handle_wheel(&mut self, x: f64, y: f64, delta_y: f64, now_ms: f64) -> String {
        self.dispatch(&InputEvent::Wheel { x, y, delta_y }, now_ms)
    }

    pub fn handle_double_click(&mut self, x: f64, y: f64, now_ms: f64) -> String {
        self.dispatch(&InputEvent::DoubleClick { x, y }, now_ms)
    }

    pub fn handle_key_down(&mut self, key: &str, shift: bool, ctrl: bool, alt: bool, meta: bool, now_ms: f64) -> String {
        let event = InputEvent::KeyDown {
            key: key.to_string(),
            modifiers: modifiers(shift, ctrl, alt, meta),
        };
        self.dispatch(&event, now_ms)
    }

    pub fn handle_key_up(&mut self, key: &str, now_ms: f64) -> String {
        let event = InputEvent::KeyUp {
            key: key.to_string(),
            modifiers: Modifiers::default(),
        };
        self.dispatch(&event, now_ms)
    }

    /// Advance the host clock (call from `requestAnimationFrame`).
    pub fn tick(&mut self, now_ms: f64) -> String {
        actions_json(&self.handler.tick(clock(now_ms)))
    }

    // ─── Modes & commands ────────────────────────────────────────────────

    /// Switch interaction mode by name. Returns `false` for unknown names.
    pub fn set_mode(&mut self, name: &str) -> bool {
        match InteractionMode::from_name(name) {
            Some(mode) => {
                self.handler.set_interaction_mode(mode);
                true
            }
            None => false,
        }
    }

    pub fn get_mode(&self) -> String {
        serde_json::to_value(self.handler.mode())
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Run a context menu command (`CUT_SHAPES`, `ADD_PERSONAL_SHAPE`, ...).
    /// Returns the template JSON for `ADD_PERSONAL_SHAPE`, otherwise
    /// `undefined`.
    pub fn run_menu_command(&mut self, name: &str) -> Result<Option<String>, JsValue> {
        let command =
            MenuCommand::from_name(name).ok_or_else(|| JsValue::from_str(&format!("unknown command `{name}`")))?;
        self.handler.run_menu_command(command).map_err(|e| {
            log::warn!("{name} failed: {e}");
            JsValue::from_str(&e)
        })
    }

    pub fn undo(&mut self, now_ms: f64) -> bool {
        self.handler.undo(clock(now_ms)).is_some()
    }

    pub fn redo(&mut self, now_ms: f64) -> bool {
        self.handler.redo(clock(now_ms)).is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.handler.transactions().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.handler.transactions().can_redo()
    }

    pub fn delete_selection(&mut self) -> usize {
        self.handler.remove_selection()
    }

    /// Rotate the selection to `angle` degrees.
    pub fn rotate_selection(&mut self, angle: f64) -> usize {
        self.handler.rotate_selection(angle)
    }

    pub fn scale_selection(&mut self, scale_x: f64, scale_y: f64) -> usize {
        self.handler.scale_selection(scale_x, scale_y)
    }

    /// Commit the text typed into the host's editor overlay.
    pub fn set_text(&mut self, id: &str, text: &str) -> bool {
        self.handler.set_shape_text(ShapeId::intern(id), text)
    }

    pub fn exit_text_editing(&mut self) -> String {
        self.handler.exit_text_editing();
        self.flush()
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// All selected shape ids as a JSON array.
    pub fn get_selected_ids(&self) -> String {
        serde_json::to_string(self.handler.selection()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Replace the selection from a JSON array of ids.
    pub fn select_ids(&mut self, ids_json: &str) -> Result<String, JsValue> {
        let ids: Vec<ShapeId> = serde_json::from_str(ids_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.handler.select(&ids);
        Ok(self.flush())
    }

    pub fn select_all(&mut self) -> usize {
        self.handler.select_all()
    }

    // ─── Documents & templates ───────────────────────────────────────────

    /// Load shapes from a JSON array of descriptors. Returns the inserted
    /// ids as a JSON array.
    pub fn load_json(&mut self, json: &str) -> Result<String, JsValue> {
        let ids = self.handler.load_json(json).map_err(|e| JsValue::from_str(&e))?;
        serde_json::to_string(&ids).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Every shape (grid excluded) as JSON.
    pub fn to_json(&self) -> Result<String, JsValue> {
        self.handler.to_json().map_err(|e| JsValue::from_str(&e))
    }

    pub fn save_as_template(&self) -> Result<String, JsValue> {
        self.handler.save_as_template().map_err(|e| JsValue::from_str(&e))
    }

    pub fn insert_template(&mut self, json: &str) -> Result<String, JsValue> {
        let ids = self.handler.insert_template(json).map_err(|e| JsValue::from_str(&e))?;
        serde_json::to_string(&ids).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    // ─── Zoom & minimap ──────────────────────────────────────────────────

    pub fn get_zoom(&self) -> f64 {
        self.handler.viewport.zoom
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.handler.zoom_in()
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.handler.zoom_out()
    }

    pub fn zoom_to_fit(&mut self) -> f64 {
        self.handler.zoom_to_fit()
    }

    pub fn move_minimap_box(&mut self, dx: f64, dy: f64) {
        self.handler.move_minimap_box(Vec2::new(dx, dy));
    }

    pub fn scale_minimap_box(&mut self, scale_x: f64) -> f64 {
        self.handler.scale_minimap_box(scale_x)
    }

    /// The minimap's viewport box as `{"x":..,"y":..,"width":..,"height":..}`.
    pub fn minimap_viewport_box(&self) -> String {
        let b = self.handler.minimap.viewport_box;
        json!({ "x": b.x0, "y": b.y0, "width": b.width(), "height": b.height() }).to_string()
    }

    /// Convert a screen point to canvas coordinates, as `[x, y]`.
    pub fn screen_to_canvas(&self, x: f64, y: f64) -> Vec<f64> {
        let p = self.handler.viewport.screen_to_canvas(Point::new(x, y));
        vec![p.x, p.y]
    }
}

impl FlowCanvas {
    fn dispatch(&mut self, event: &InputEvent, now_ms: f64) -> String {
        let actions = self.handler.handle(event, clock(now_ms));
        if !actions.is_empty() {
            log::debug!("{event:?} -> {} actions", actions.len());
        }
        actions_json(&actions)
    }

    fn flush(&mut self) -> String {
        actions_json(&self.handler.take_actions())
    }
}

fn modifiers(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Modifiers {
    Modifiers { shift, ctrl, alt, meta }
}

/// Host milliseconds (`performance.now()`) to the engine clock.
fn clock(now_ms: f64) -> u64 {
    if now_ms.is_finite() && now_ms > 0.0 { now_ms as u64 } else { 0 }
}

fn actions_json(actions: &[EditorAction]) -> String {
    Value::Array(actions.iter().map(action_json).collect()).to_string()
}

/// One action as `{"type": "...", ...}` for the host's dispatcher.
fn action_json(action: &EditorAction) -> Value {
    match action {
        EditorAction::RenderNeeded => json!({ "type": "render" }),
        EditorAction::SetCursor(cursor) => json!({ "type": "cursor", "cursor": cursor.as_css() }),
        EditorAction::ModeChanged(mode) => json!({ "type": "mode", "mode": mode }),
        EditorAction::SelectionChanged(ids) => json!({ "type": "selection", "ids": ids }),
        EditorAction::OpenContextMenu(menu) => json!({ "type": "contextMenu", "menu": menu }),
        EditorAction::EnterTextEditing(id) => json!({ "type": "editText", "id": id }),
        EditorAction::ExitTextEditing(id) => json!({ "type": "exitText", "id": id }),
        EditorAction::ZoomChanged(zoom) => json!({ "type": "zoom", "zoom": zoom }),
        EditorAction::MiniMapRefresh => json!({ "type": "minimap" }),
        EditorAction::HistoryWarning(message) => json!({ "type": "historyWarning", "message": message }),
    }
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Flow Canvas WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_editor::{ContextMenu, Cursor};
    use pretty_assertions::assert_eq;

    #[test]
    fn actions_serialize_for_the_host() {
        let actions = [
            EditorAction::RenderNeeded,
            EditorAction::SetCursor(Cursor::Grabbing),
            EditorAction::ModeChanged(InteractionMode::Link),
            EditorAction::SelectionChanged(vec![ShapeId::intern("wasm-a")]),
        ];
        let parsed: Value = serde_json::from_str(&actions_json(&actions)).unwrap();
        assert_eq!(
            parsed,
            json!([
                { "type": "render" },
                { "type": "cursor", "cursor": "grabbing" },
                { "type": "mode", "mode": "link" },
                { "type": "selection", "ids": ["wasm-a"] },
            ])
        );
    }

    #[test]
    fn context_menu_carries_commands() {
        let menu = ContextMenu::build(Point::new(12.0, 34.0), true, true);
        let value = action_json(&EditorAction::OpenContextMenu(menu));
        assert_eq!(value["menu"]["position"], json!({ "x": 12.0, "y": 34.0 }));
        assert_eq!(value["menu"]["items"][0]["command"], json!("CUT_SHAPES"));
        assert_eq!(value["menu"]["items"][2]["enabled"], json!(false));
    }

    #[test]
    fn clock_rejects_garbage() {
        assert_eq!(clock(1234.9), 1234);
        assert_eq!(clock(f64::NAN), 0);
        assert_eq!(clock(-5.0), 0);
    }

    #[test]
    fn controller_round_trip() {
        let mut canvas = FlowCanvas::new(800.0, 600.0);
        let ids = canvas
            .load_json(r#"[{"type":"activity","id":"wasm-box","left":200,"top":200,"width":100,"height":60}]"#)
            .unwrap();
        assert_eq!(ids, r#"["wasm-box"]"#);
        let actions = canvas.handle_pointer_down(200.0, 200.0, 0, false, false, false, false, 10.0);
        assert!(actions.contains(r#""ids":["wasm-box"]"#));
        assert_eq!(canvas.get_selected_ids(), r#"["wasm-box"]"#);
        assert!(canvas.set_mode("grab"));
        assert_eq!(canvas.get_mode(), "grab");
        assert!(!canvas.set_mode("lasso"));
    }
}
