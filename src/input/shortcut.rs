use super::ModifierState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutKey {
    Character(char),
    Enter,
    Escape,
    Backspace,
    ArrowLeft,
    ArrowRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputContext {
    pub text_input_active: bool,
    pub image_ready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    TextInsert(char),
    TextBackspace,
    TextCursorLeft,
    TextCursorRight,
    TextCommit,
    TextCancel,
    Undo,
    Redo,
    SelectPencil,
    SelectEraser,
    SelectText,
    ZoomIn,
    ZoomOut,
    ResetView,
    Save,
    Export,
}

fn resolve_text_shortcut(key: ShortcutKey, modifiers: ModifierState) -> Option<ShortcutAction> {
    match key {
        ShortcutKey::Enter => Some(ShortcutAction::TextCommit),
        ShortcutKey::Escape => Some(ShortcutAction::TextCancel),
        ShortcutKey::Backspace => Some(ShortcutAction::TextBackspace),
        ShortcutKey::ArrowLeft => Some(ShortcutAction::TextCursorLeft),
        ShortcutKey::ArrowRight => Some(ShortcutAction::TextCursorRight),
        ShortcutKey::Character(c) if !modifiers.ctrl => Some(ShortcutAction::TextInsert(c)),
        ShortcutKey::Character(_) => None,
    }
}

fn resolve_editor_tool_shortcut(key: ShortcutKey) -> Option<ShortcutAction> {
    match key {
        ShortcutKey::Character('p') => Some(ShortcutAction::SelectPencil),
        ShortcutKey::Character('e') => Some(ShortcutAction::SelectEraser),
        ShortcutKey::Character('t') => Some(ShortcutAction::SelectText),
        ShortcutKey::Character('+') | ShortcutKey::Character('=') => Some(ShortcutAction::ZoomIn),
        ShortcutKey::Character('-') => Some(ShortcutAction::ZoomOut),
        ShortcutKey::Character('0') => Some(ShortcutAction::ResetView),
        _ => None,
    }
}

fn resolve_editor_shortcut(key: ShortcutKey, modifiers: ModifierState) -> Option<ShortcutAction> {
    match (key, modifiers.ctrl, modifiers.shift) {
        (ShortcutKey::Character('z'), true, false) => Some(ShortcutAction::Undo),
        (ShortcutKey::Character('z'), true, true) | (ShortcutKey::Character('y'), true, false) => {
            Some(ShortcutAction::Redo)
        }
        (ShortcutKey::Character('s'), true, _) => Some(ShortcutAction::Save),
        (ShortcutKey::Character('e'), true, _) => Some(ShortcutAction::Export),
        (_, false, _) => resolve_editor_tool_shortcut(key),
        _ => None,
    }
}

pub fn resolve_shortcut(
    key: ShortcutKey,
    modifiers: ModifierState,
    context: InputContext,
) -> Option<ShortcutAction> {
    if context.text_input_active {
        return resolve_text_shortcut(key, modifiers);
    }

    if !context.image_ready {
        return None;
    }

    resolve_editor_shortcut(key, modifiers)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTRL: ModifierState = ModifierState::new(true, false, false);
    const CTRL_SHIFT: ModifierState = ModifierState::new(true, true, false);

    fn editor() -> InputContext {
        InputContext {
            text_input_active: false,
            image_ready: true,
        }
    }

    #[test]
    fn text_entry_captures_plain_characters() {
        let context = InputContext {
            text_input_active: true,
            image_ready: true,
        };
        assert_eq!(
            resolve_shortcut(ShortcutKey::Character('p'), ModifierState::default(), context),
            Some(ShortcutAction::TextInsert('p'))
        );
        assert_eq!(
            resolve_shortcut(ShortcutKey::Escape, ModifierState::default(), context),
            Some(ShortcutAction::TextCancel)
        );
        assert_eq!(
            resolve_shortcut(ShortcutKey::Character('z'), CTRL, context),
            None
        );
    }

    #[test]
    fn undo_redo_follow_ctrl_z_conventions() {
        assert_eq!(
            resolve_shortcut(ShortcutKey::Character('z'), CTRL, editor()),
            Some(ShortcutAction::Undo)
        );
        assert_eq!(
            resolve_shortcut(ShortcutKey::Character('z'), CTRL_SHIFT, editor()),
            Some(ShortcutAction::Redo)
        );
        assert_eq!(
            resolve_shortcut(ShortcutKey::Character('y'), CTRL, editor()),
            Some(ShortcutAction::Redo)
        );
    }

    #[test]
    fn tool_keys_switch_tools_without_modifiers() {
        assert_eq!(
            resolve_shortcut(ShortcutKey::Character('e'), ModifierState::default(), editor()),
            Some(ShortcutAction::SelectEraser)
        );
        assert_eq!(
            resolve_shortcut(ShortcutKey::Character('e'), CTRL, editor()),
            Some(ShortcutAction::Export)
        );
        assert_eq!(
            resolve_shortcut(ShortcutKey::Character('0'), ModifierState::default(), editor()),
            Some(ShortcutAction::ResetView)
        );
    }

    #[test]
    fn editor_shortcuts_wait_for_the_image() {
        let context = InputContext::default();
        assert_eq!(
            resolve_shortcut(ShortcutKey::Character('z'), CTRL, context),
            None
        );
    }
}
