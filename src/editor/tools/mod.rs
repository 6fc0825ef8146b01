mod eraser;
mod pen;
mod text;

pub use crate::geometry::{CanvasPoint, Color, Size, ViewportPoint};
pub use eraser::{EraserPass, ERASER_RADIUS_FACTOR};
pub use pen::PenStroke;
pub use text::{Annotation, TextDraft, TextDraftAction, TextKey};

const LINE_WIDTH_MIN: u8 = 1;
const LINE_WIDTH_MAX: u8 = 30;
const TEXT_SIZE_MIN: u8 = 8;
const TEXT_SIZE_MAX: u8 = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolKind {
    #[default]
    Pencil,
    Eraser,
    Text,
}

impl ToolKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pencil => "pencil",
            Self::Eraser => "eraser",
            Self::Text => "text",
        }
    }
}

/// The six ink presets offered by the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokeColor {
    #[default]
    Red,
    Blue,
    Green,
    Yellow,
    Black,
    White,
}

impl StrokeColor {
    pub const ALL: [Self; 6] = [
        Self::Red,
        Self::Blue,
        Self::Green,
        Self::Yellow,
        Self::Black,
        Self::White,
    ];

    pub const fn color(self) -> Color {
        match self {
            Self::Red => Color::new(255, 0, 0),
            Self::Blue => Color::new(0, 0, 255),
            Self::Green => Color::new(0, 255, 0),
            Self::Yellow => Color::new(255, 255, 0),
            Self::Black => Color::new(0, 0, 0),
            Self::White => Color::new(255, 255, 255),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolOptions {
    pub tool: ToolKind,
    pub color: StrokeColor,
    pub line_width: u8,
    pub text_size: u8,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            tool: ToolKind::Pencil,
            color: StrokeColor::Red,
            line_width: 3,
            text_size: 24,
        }
    }
}

impl ToolOptions {
    pub fn select_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
    }

    pub fn set_color(&mut self, color: StrokeColor) {
        self.color = color;
    }

    pub fn set_line_width(&mut self, line_width: u8) {
        self.line_width = line_width.clamp(LINE_WIDTH_MIN, LINE_WIDTH_MAX);
    }

    pub fn set_text_size(&mut self, text_size: u8) {
        self.text_size = text_size.clamp(TEXT_SIZE_MIN, TEXT_SIZE_MAX);
    }

    pub fn eraser_radius(&self) -> f32 {
        f32::from(self.line_width) * ERASER_RADIUS_FACTOR
    }

    pub fn new_stroke(&self, start: CanvasPoint) -> PenStroke {
        PenStroke::new(start, self.color.color(), f32::from(self.line_width))
    }

    pub fn new_eraser_pass(&self, start: CanvasPoint) -> EraserPass {
        EraserPass::new(start, self.eraser_radius())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_pencil_red_and_thin_line() {
        let options = ToolOptions::default();
        assert_eq!(options.tool, ToolKind::Pencil);
        assert_eq!(options.color, StrokeColor::Red);
        assert_eq!(options.line_width, 3);
    }

    #[test]
    fn line_width_is_clamped_to_toolbar_range() {
        let mut options = ToolOptions::default();
        options.set_line_width(0);
        assert_eq!(options.line_width, 1);
        options.set_line_width(200);
        assert_eq!(options.line_width, 30);
        options.set_line_width(12);
        assert_eq!(options.line_width, 12);
    }

    #[test]
    fn eraser_radius_is_five_times_line_width() {
        let mut options = ToolOptions::default();
        options.set_line_width(4);
        assert_eq!(options.eraser_radius(), 20.0);
        let pass = options.new_eraser_pass(CanvasPoint::new(1.0, 1.0));
        assert_eq!(pass.radius, 20.0);
    }

    #[test]
    fn presets_are_distinct() {
        for (index, a) in StrokeColor::ALL.iter().enumerate() {
            for b in StrokeColor::ALL.iter().skip(index + 1) {
                assert_ne!(a.color(), b.color(), "{a:?} and {b:?} share a color");
            }
        }
    }

    #[test]
    fn new_stroke_captures_current_style() {
        let mut options = ToolOptions::default();
        options.set_color(StrokeColor::Blue);
        options.set_line_width(9);
        let stroke = options.new_stroke(CanvasPoint::new(2.0, 3.0));
        assert_eq!(stroke.color, StrokeColor::Blue.color());
        assert_eq!(stroke.width, 9.0);
        assert_eq!(stroke.points, vec![CanvasPoint::new(2.0, 3.0)]);
    }
}
