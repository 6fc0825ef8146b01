use super::{CanvasPoint, Color, ViewportPoint};

/// A positioned text label composited over the ink layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: u64,
    pub text: String,
    pub position: CanvasPoint,
    pub color: Color,
    pub size: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKey {
    Character(char),
    Backspace,
    Enter,
    Escape,
    CursorLeft,
    CursorRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDraftAction {
    Edited,
    Commit,
    Cancel,
    Ignored,
}

/// The inline text-entry overlay opened by the text tool.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDraft {
    pub anchor: CanvasPoint,
    pub overlay_position: ViewportPoint,
    pub color: Color,
    pub size: u8,
    content: String,
    cursor_chars: usize,
}

impl TextDraft {
    pub fn new(anchor: CanvasPoint, overlay_position: ViewportPoint, color: Color, size: u8) -> Self {
        Self {
            anchor,
            overlay_position,
            color,
            size,
            content: String::new(),
            cursor_chars: 0,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    pub fn cursor_chars(&self) -> usize {
        self.cursor_chars.min(self.content.chars().count())
    }

    pub fn resolve_key(&mut self, key: TextKey) -> TextDraftAction {
        match key {
            TextKey::Character(c) if c.is_control() => TextDraftAction::Ignored,
            TextKey::Character(c) => {
                self.insert_char(c);
                TextDraftAction::Edited
            }
            TextKey::Backspace => {
                if self.delete_backward() {
                    TextDraftAction::Edited
                } else {
                    TextDraftAction::Ignored
                }
            }
            TextKey::CursorLeft => {
                if self.cursor_chars() == 0 {
                    return TextDraftAction::Ignored;
                }
                self.cursor_chars = self.cursor_chars() - 1;
                TextDraftAction::Edited
            }
            TextKey::CursorRight => {
                if self.cursor_chars() >= self.content.chars().count() {
                    return TextDraftAction::Ignored;
                }
                self.cursor_chars = self.cursor_chars() + 1;
                TextDraftAction::Edited
            }
            TextKey::Enter if self.is_blank() => TextDraftAction::Cancel,
            TextKey::Enter => TextDraftAction::Commit,
            TextKey::Escape => TextDraftAction::Cancel,
        }
    }

    /// Focus left the overlay: keep what was typed, drop an empty box.
    pub fn resolve_blur(&self) -> TextDraftAction {
        if self.is_blank() {
            TextDraftAction::Cancel
        } else {
            TextDraftAction::Commit
        }
    }

    pub fn into_annotation(self, id: u64) -> Annotation {
        Annotation {
            id,
            text: self.content.trim().to_string(),
            position: self.anchor,
            color: self.color,
            size: self.size,
        }
    }

    fn insert_char(&mut self, c: char) {
        let byte_index = self.byte_index_for_cursor(self.cursor_chars());
        self.content.insert(byte_index, c);
        self.cursor_chars = self.cursor_chars().saturating_add(1);
    }

    fn delete_backward(&mut self) -> bool {
        let cursor = self.cursor_chars();
        if cursor == 0 {
            return false;
        }
        let start = self.byte_index_for_cursor(cursor - 1);
        let end = self.byte_index_for_cursor(cursor);
        self.content.drain(start..end);
        self.cursor_chars = cursor - 1;
        true
    }

    fn byte_index_for_cursor(&self, cursor_chars: usize) -> usize {
        self.content
            .char_indices()
            .nth(cursor_chars)
            .map(|(index, _)| index)
            .unwrap_or(self.content.len())
    }
}
