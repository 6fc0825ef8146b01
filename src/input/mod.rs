mod pointer;
mod shortcut;

pub use pointer::{ModifierState, PointerButton, PointerEvent};
pub use shortcut::{resolve_shortcut, InputContext, ShortcutAction, ShortcutKey};
