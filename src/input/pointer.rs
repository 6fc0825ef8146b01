use crate::geometry::ViewportPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierState {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl ModifierState {
    pub const fn new(ctrl: bool, shift: bool, alt: bool) -> Self {
        Self { ctrl, shift, alt }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: ViewportPoint,
    pub button: PointerButton,
    pub modifiers: ModifierState,
}

impl PointerEvent {
    pub const fn primary(x: f32, y: f32) -> Self {
        Self {
            position: ViewportPoint::new(x, y),
            button: PointerButton::Primary,
            modifiers: ModifierState::new(false, false, false),
        }
    }

    pub const fn middle(x: f32, y: f32) -> Self {
        Self {
            position: ViewportPoint::new(x, y),
            button: PointerButton::Middle,
            modifiers: ModifierState::new(false, false, false),
        }
    }

    pub const fn with_modifiers(mut self, modifiers: ModifierState) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Middle button, or primary button with Alt held, drags the view.
    pub const fn starts_pan(&self) -> bool {
        match self.button {
            PointerButton::Middle => true,
            PointerButton::Primary => self.modifiers.alt,
            PointerButton::Secondary => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pan_gesture_needs_middle_button_or_alt() {
        assert!(PointerEvent::middle(0.0, 0.0).starts_pan());
        assert!(!PointerEvent::primary(0.0, 0.0).starts_pan());
        assert!(PointerEvent::primary(0.0, 0.0)
            .with_modifiers(ModifierState::new(false, false, true))
            .starts_pan());
        assert!(!PointerEvent::primary(0.0, 0.0)
            .with_modifiers(ModifierState::new(true, true, false))
            .starts_pan());
    }
}
