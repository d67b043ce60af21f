//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s, so every host
//! shares one binding table.

use crate::input::Modifiers;
use crate::tools::ToolKind;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    /// Switch to a built-in tool.
    Tool(ToolKind),

    // ── Edit ──
    Undo,
    Redo,
    Delete,
    Copy,
    Paste,
    Deselect,
}

/// Resolves key events into shortcut actions.
///
/// On macOS `meta` is ⌘; on other platforms `ctrl` serves the same role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        let cmd = modifiers.ctrl || modifiers.meta;

        // ── Modifier combos first (most specific) ──
        if cmd && modifiers.shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "c" | "C" => Some(ShortcutAction::Copy),
                "v" | "V" => Some(ShortcutAction::Paste),
                _ => None,
            };
        }

        if modifiers.alt || modifiers.shift {
            return None;
        }

        // ── Single keys (no modifiers) ──
        let tool = match key {
            "v" | "V" => ToolKind::Select,
            "p" | "P" => ToolKind::Pencil,
            "l" | "L" => ToolKind::Line,
            "a" | "A" => ToolKind::Arrow,
            "r" | "R" => ToolKind::Rectangle,
            "c" | "C" => ToolKind::Circle,
            "h" | "H" => ToolKind::Pan,
            "e" | "E" => ToolKind::Eraser,
            "Delete" | "Backspace" => return Some(ShortcutAction::Delete),
            "Escape" => return Some(ShortcutAction::Deselect),
            _ => return None,
        };
        Some(ShortcutAction::Tool(tool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CMD: Modifiers = Modifiers {
        meta: true,
        ..Modifiers::NONE
    };
    const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };

    #[test]
    fn resolve_tool_shortcuts() {
        let cases = [
            ("v", ToolKind::Select),
            ("p", ToolKind::Pencil),
            ("l", ToolKind::Line),
            ("a", ToolKind::Arrow),
            ("r", ToolKind::Rectangle),
            ("c", ToolKind::Circle),
            ("h", ToolKind::Pan),
            ("E", ToolKind::Eraser),
        ];
        for (key, kind) in cases {
            assert_eq!(
                ShortcutMap::resolve(key, Modifiers::NONE),
                Some(ShortcutAction::Tool(kind)),
                "key {key}"
            );
        }
    }

    #[test]
    fn resolve_undo_redo() {
        assert_eq!(ShortcutMap::resolve("z", CMD), Some(ShortcutAction::Undo));
        assert_eq!(ShortcutMap::resolve("z", CTRL), Some(ShortcutAction::Undo));
        let cmd_shift = Modifiers {
            shift: true,
            ..CMD
        };
        assert_eq!(ShortcutMap::resolve("Z", cmd_shift), Some(ShortcutAction::Redo));
        assert_eq!(ShortcutMap::resolve("y", CTRL), Some(ShortcutAction::Redo));
    }

    #[test]
    fn resolve_clipboard_over_tools() {
        assert_eq!(ShortcutMap::resolve("c", CMD), Some(ShortcutAction::Copy));
        assert_eq!(ShortcutMap::resolve("v", CTRL), Some(ShortcutAction::Paste));
    }

    #[test]
    fn resolve_delete_and_escape() {
        assert_eq!(
            ShortcutMap::resolve("Backspace", Modifiers::NONE),
            Some(ShortcutAction::Delete)
        );
        assert_eq!(
            ShortcutMap::resolve("Escape", Modifiers::NONE),
            Some(ShortcutAction::Deselect)
        );
    }

    #[test]
    fn resolve_unknown_key() {
        assert_eq!(ShortcutMap::resolve("q", Modifiers::NONE), None);
        assert_eq!(ShortcutMap::resolve("z", Modifiers::NONE), None);
        assert_eq!(ShortcutMap::resolve("r", Modifiers::SHIFT), None);
    }
}
