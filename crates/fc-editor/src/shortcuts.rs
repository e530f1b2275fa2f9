//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. On macOS
//! `meta` is ⌘; elsewhere `ctrl` plays the same role. Space is reported
//! separately because it is a hold (temporary grab), not a command.

use crate::input::Modifiers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Edit ──
    Undo,
    Redo,
    Delete,
    SelectAll,
    Copy,
    Cut,
    Paste,
    Group,
    Ungroup,

    // ── View ──
    ZoomIn,
    ZoomOut,
    ZoomToFit,
    PanStart,

    // ── Z-order ──
    SendBackward,
    BringForward,
    SendToBack,
    BringToFront,

    /// Leave text editing, or clear the selection.
    Escape,
}

pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action, or `None` if unbound.
    pub fn resolve(key: &str, modifiers: &Modifiers) -> Option<ShortcutAction> {
        let cmd = modifiers.cmd();

        if cmd && modifiers.shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                "g" | "G" => Some(ShortcutAction::Ungroup),
                "[" | "{" => Some(ShortcutAction::SendToBack),
                "]" | "}" => Some(ShortcutAction::BringToFront),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "a" | "A" => Some(ShortcutAction::SelectAll),
                "c" | "C" => Some(ShortcutAction::Copy),
                "x" | "X" => Some(ShortcutAction::Cut),
                "v" | "V" => Some(ShortcutAction::Paste),
                "g" | "G" => Some(ShortcutAction::Group),
                "=" | "+" => Some(ShortcutAction::ZoomIn),
                "-" => Some(ShortcutAction::ZoomOut),
                "0" => Some(ShortcutAction::ZoomToFit),
                "[" => Some(ShortcutAction::SendBackward),
                "]" => Some(ShortcutAction::BringForward),
                _ => None,
            };
        }

        match key {
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Escape),
            " " => Some(ShortcutAction::PanStart),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl() -> Modifiers {
        Modifiers {
            ctrl: true,
            ..Modifiers::default()
        }
    }

    fn meta() -> Modifiers {
        Modifiers {
            meta: true,
            ..Modifiers::default()
        }
    }

    fn cmd_shift() -> Modifiers {
        Modifiers {
            ctrl: true,
            shift: true,
            ..Modifiers::default()
        }
    }

    #[test]
    fn resolve_edit_shortcuts() {
        assert_eq!(ShortcutMap::resolve("c", &ctrl()), Some(ShortcutAction::Copy));
        assert_eq!(ShortcutMap::resolve("X", &ctrl()), Some(ShortcutAction::Cut));
        assert_eq!(ShortcutMap::resolve("v", &meta()), Some(ShortcutAction::Paste));
        assert_eq!(ShortcutMap::resolve("a", &meta()), Some(ShortcutAction::SelectAll));
    }

    #[test]
    fn resolve_history_shortcuts() {
        assert_eq!(ShortcutMap::resolve("z", &ctrl()), Some(ShortcutAction::Undo));
        assert_eq!(ShortcutMap::resolve("y", &ctrl()), Some(ShortcutAction::Redo));
        assert_eq!(ShortcutMap::resolve("Z", &cmd_shift()), Some(ShortcutAction::Redo));
    }

    #[test]
    fn resolve_grouping_and_order() {
        assert_eq!(ShortcutMap::resolve("g", &ctrl()), Some(ShortcutAction::Group));
        assert_eq!(ShortcutMap::resolve("G", &cmd_shift()), Some(ShortcutAction::Ungroup));
        assert_eq!(ShortcutMap::resolve("]", &ctrl()), Some(ShortcutAction::BringForward));
        assert_eq!(ShortcutMap::resolve("}", &cmd_shift()), Some(ShortcutAction::BringToFront));
    }

    #[test]
    fn resolve_plain_keys() {
        let none = Modifiers::default();
        assert_eq!(ShortcutMap::resolve("Delete", &none), Some(ShortcutAction::Delete));
        assert_eq!(ShortcutMap::resolve("Backspace", &none), Some(ShortcutAction::Delete));
        assert_eq!(ShortcutMap::resolve("Escape", &none), Some(ShortcutAction::Escape));
        assert_eq!(ShortcutMap::resolve(" ", &none), Some(ShortcutAction::PanStart));
    }

    #[test]
    fn unbound_keys() {
        assert_eq!(ShortcutMap::resolve("c", &Modifiers::default()), None);
        assert_eq!(ShortcutMap::resolve("q", &ctrl()), None);
        assert_eq!(ShortcutMap::resolve("Delete", &ctrl()), None);
    }
}
