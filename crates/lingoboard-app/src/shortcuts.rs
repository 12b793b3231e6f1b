//! Keyboard shortcut registry and documentation.

use lingoboard_core::{Key, Modifiers};

/// A keyboard or pointer shortcut definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Shortcut {
    pub key: &'static str,
    pub ctrl: bool,
    /// Whiteboard key this shortcut triggers. Pointer gestures have none.
    pub action: Option<Key>,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(key: &'static str, ctrl: bool, action: Option<Key>, description: &'static str) -> Self {
        Self {
            key,
            ctrl,
            action,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+0").
    pub fn format(&self) -> String {
        if self.ctrl {
            format!("Ctrl+{}", self.key)
        } else {
            self.key.to_string()
        }
    }
}

/// Registry of all shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    pub fn all() -> Vec<Shortcut> {
        vec![
            Shortcut::new("Escape", false, Some(Key::Escape), "Cancel drag, resize or pan"),
            Shortcut::new("Delete", false, Some(Key::Delete), "Delete focused block"),
            Shortcut::new("Backspace", false, Some(Key::Backspace), "Delete focused block"),
            Shortcut::new("F", false, Some(Key::Fit), "Zoom to fit all blocks"),
            Shortcut::new("0", true, Some(Key::ResetZoom), "Reset zoom"),
            Shortcut::new("=", true, Some(Key::ZoomIn), "Zoom in"),
            Shortcut::new("-", true, Some(Key::ZoomOut), "Zoom out"),
            Shortcut::new("Space+Drag", false, None, "Pan the canvas"),
            Shortcut::new("Alt+Drag", false, None, "Pan the canvas"),
            Shortcut::new("Middle Drag", false, None, "Pan the canvas"),
            Shortcut::new("Wheel", false, None, "Zoom at the cursor"),
        ]
    }

    /// Map a host key name and modifiers to a bound whiteboard key.
    pub fn resolve(name: &str, modifiers: Modifiers) -> Option<Key> {
        let key = Key::from_name(name)?;
        Self::all()
            .into_iter()
            .find(|s| s.action == Some(key) && s.ctrl == modifiers.command())
            .and(Some(key))
    }

    /// Print all shortcuts to console.
    pub fn print_all() {
        println!("\n=== Keyboard Shortcuts ===");
        for shortcut in Self::all() {
            println!("  {:20} {}", shortcut.format(), shortcut.description);
        }
        println!();
    }
}
