//! Rasterization of text annotations onto a composited canvas.

use std::fmt;
use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, PremultipliedColorU8, Rect, Transform};

use super::tools::{Annotation, Color};
use super::{CanvasError, CanvasResult};

const BLOCK_ADVANCE_EM: f32 = 0.6;
const BLOCK_WIDTH_EM: f32 = 0.5;
const BLOCK_HEIGHT_EM: f32 = 0.7;

/// Draws an annotation's text with its anchor on the alphabetic baseline.
pub trait TextRasterizer: Send + Sync {
    fn draw_text(&self, pixmap: &mut Pixmap, annotation: &Annotation);
}

pub struct FontRasterizer {
    font: FontArc,
    source: PathBuf,
}

impl fmt::Debug for FontRasterizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontRasterizer")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl FontRasterizer {
    pub fn from_path(path: &Path) -> CanvasResult<Self> {
        let bytes = std::fs::read(path).map_err(|source| CanvasError::FontRead {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontArc::try_from_vec(bytes).map_err(|_| CanvasError::InvalidFont {
            path: path.to_path_buf(),
        })?;
        Ok(Self {
            font,
            source: path.to_path_buf(),
        })
    }
}

impl TextRasterizer for FontRasterizer {
    fn draw_text(&self, pixmap: &mut Pixmap, annotation: &Annotation) {
        let scale = PxScale::from(f32::from(annotation.size.max(1)));
        let scaled = self.font.as_scaled(scale);
        let mut caret = annotation.position.x;
        let baseline = annotation.position.y;
        let mut previous: Option<GlyphId> = None;

        for ch in annotation.text.chars() {
            let glyph_id = self.font.glyph_id(ch);
            if let Some(previous) = previous {
                caret += scaled.kern(previous, glyph_id);
            }
            let glyph = glyph_id.with_scale_and_position(scale, point(caret, baseline));
            caret += scaled.h_advance(glyph_id);
            previous = Some(glyph_id);

            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            let origin_x = bounds.min.x.floor() as i64;
            let origin_y = bounds.min.y.floor() as i64;
            outlined.draw(|x, y, coverage| {
                blend_coverage(
                    pixmap,
                    origin_x + i64::from(x),
                    origin_y + i64::from(y),
                    annotation.color,
                    coverage,
                );
            });
        }
    }
}

/// Font-less fallback: one solid cell per visible character.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockRasterizer;

impl TextRasterizer for BlockRasterizer {
    fn draw_text(&self, pixmap: &mut Pixmap, annotation: &Annotation) {
        let size = f32::from(annotation.size.max(1));
        let mut paint = Paint::default();
        paint.set_color(annotation.color.to_skia());
        paint.anti_alias = false;

        let top = annotation.position.y - size * BLOCK_HEIGHT_EM;
        let mut caret = annotation.position.x;
        let mut builder = PathBuilder::new();
        for ch in annotation.text.chars() {
            if !ch.is_whitespace() {
                if let Some(rect) =
                    Rect::from_xywh(caret, top, size * BLOCK_WIDTH_EM, size * BLOCK_HEIGHT_EM)
                {
                    builder.push_rect(rect);
                }
            }
            caret += size * BLOCK_ADVANCE_EM;
        }
        if let Some(path) = builder.finish() {
            pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }
}

/// Picks the configured font when it loads, the block fallback otherwise.
pub fn rasterizer_for(font_path: Option<&Path>) -> Box<dyn TextRasterizer> {
    match font_path.map(FontRasterizer::from_path) {
        Some(Ok(rasterizer)) => {
            tracing::debug!(source = %rasterizer.source.display(), "loaded annotation font");
            Box::new(rasterizer)
        }
        Some(Err(err)) => {
            tracing::warn!(%err, "annotation font unavailable; using block glyphs");
            Box::new(BlockRasterizer)
        }
        None => Box::new(BlockRasterizer),
    }
}

fn blend_coverage(pixmap: &mut Pixmap, x: i64, y: i64, color: Color, coverage: f32) {
    let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
        return;
    };
    if x >= pixmap.width() || y >= pixmap.height() {
        return;
    }
    let alpha = coverage.clamp(0.0, 1.0) * f32::from(color.a) / 255.0;
    if alpha <= 0.0 {
        return;
    }

    let index = (y * pixmap.width() + x) as usize;
    let Some(pixel) = pixmap.pixels_mut().get_mut(index) else {
        return;
    };
    let keep = 1.0 - alpha;
    let channel = |source: u8, destination: u8| -> u8 {
        (f32::from(source) * alpha + f32::from(destination) * keep)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    let red = channel(color.r, pixel.red());
    let green = channel(color.g, pixel.green());
    let blue = channel(color.b, pixel.blue());
    let out_alpha = channel(255, pixel.alpha());
    if let Some(blended) = PremultipliedColorU8::from_rgba(
        red.min(out_alpha),
        green.min(out_alpha),
        blue.min(out_alpha),
        out_alpha,
    ) {
        *pixel = blended;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CanvasPoint;

    fn annotation(text: &str) -> Annotation {
        Annotation {
            id: 1,
            text: text.to_string(),
            position: CanvasPoint::new(4.0, 30.0),
            color: Color::new(0, 0, 255),
            size: 20,
        }
    }

    fn painted_pixels(pixmap: &Pixmap) -> usize {
        pixmap.pixels().iter().filter(|pixel| pixel.alpha() > 0).count()
    }

    #[test]
    fn block_glyphs_sit_above_the_baseline() {
        let mut pixmap = Pixmap::new(100, 40).expect("pixmap");
        BlockRasterizer.draw_text(&mut pixmap, &annotation("ab"));
        assert_eq!(pixmap.pixel(6, 25).map(|p| p.alpha()), Some(255));
        assert_eq!(pixmap.pixel(6, 35).map(|p| p.alpha()), Some(0));
    }

    #[test]
    fn whitespace_paints_nothing() {
        let mut pixmap = Pixmap::new(100, 40).expect("pixmap");
        BlockRasterizer.draw_text(&mut pixmap, &annotation("   "));
        assert_eq!(painted_pixels(&pixmap), 0);
    }

    #[test]
    fn missing_font_falls_back_to_blocks() {
        let path = std::env::temp_dir().join("radiomark-missing-font.ttf");
        let rasterizer = rasterizer_for(Some(&path));
        let mut pixmap = Pixmap::new(100, 40).expect("pixmap");
        rasterizer.draw_text(&mut pixmap, &annotation("x"));
        assert!(painted_pixels(&pixmap) > 0);
    }

    #[test]
    fn invalid_font_bytes_are_reported() {
        let path = std::env::temp_dir().join(format!(
            "radiomark-invalid-font-{}.ttf",
            std::process::id()
        ));
        std::fs::write(&path, b"not a font").expect("write font");
        let err = FontRasterizer::from_path(&path).expect_err("garbage must not parse");
        assert!(matches!(err, CanvasError::InvalidFont { .. }));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn coverage_blend_ignores_out_of_bounds() {
        let mut pixmap = Pixmap::new(2, 2).expect("pixmap");
        blend_coverage(&mut pixmap, -1, 0, Color::new(255, 0, 0), 1.0);
        blend_coverage(&mut pixmap, 5, 5, Color::new(255, 0, 0), 1.0);
        assert_eq!(painted_pixels(&pixmap), 0);
        blend_coverage(&mut pixmap, 1, 1, Color::new(255, 0, 0), 1.0);
        assert_eq!(pixmap.pixel(1, 1).map(|p| p.red()), Some(255));
    }

    #[test]
    fn block_cells_are_narrower_than_their_advance() {
        let mut pixmap = Pixmap::new(100, 40).expect("pixmap");
        BlockRasterizer.draw_text(&mut pixmap, &annotation("ab"));
        // size 20: cells span x 4..14 and 16..26.
        assert_eq!(pixmap.pixel(6, 25).map(|p| p.alpha()), Some(255));
        assert_eq!(pixmap.pixel(15, 25).map(|p| p.alpha()), Some(0));
        assert_eq!(pixmap.pixel(17, 25).map(|p| p.alpha()), Some(255));
    }

    fn fixture_font() -> FontRasterizer {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/DejaVuSansMono.ttf");
        FontRasterizer::from_path(&path).expect("fixture font should load")
    }

    #[test]
    fn font_glyphs_sit_on_the_baseline_in_annotation_color() {
        let mut pixmap = Pixmap::new(120, 40).expect("pixmap");
        fixture_font().draw_text(&mut pixmap, &annotation("Hi"));

        assert!(painted_pixels(&pixmap) > 20);
        for y in 32..40 {
            for x in 0..120 {
                assert_eq!(
                    pixmap.pixel(x, y).map(|p| p.alpha()),
                    Some(0),
                    "ink below baseline at ({x}, {y})"
                );
            }
        }
        let strongest = pixmap
            .pixels()
            .iter()
            .max_by_key(|pixel| pixel.alpha())
            .expect("pixels")
            .demultiply();
        assert!(strongest.alpha() >= 200);
        assert_eq!((strongest.red(), strongest.green()), (0, 0));
        assert!(strongest.blue() >= 250);
    }

    fn ink_columns(pixmap: &Pixmap) -> (u32, u32) {
        let inked = |x: u32| {
            (0..pixmap.height()).any(|y| pixmap.pixel(x, y).is_some_and(|p| p.alpha() > 0))
        };
        let left = (0..pixmap.width()).find(|&x| inked(x)).expect("some ink");
        let right = (0..pixmap.width()).rev().find(|&x| inked(x)).expect("some ink");
        (left, right)
    }

    #[test]
    fn font_text_advances_left_to_right_from_the_anchor() {
        let mut one = Pixmap::new(200, 40).expect("pixmap");
        let mut three = Pixmap::new(200, 40).expect("pixmap");
        let font = fixture_font();
        font.draw_text(&mut one, &annotation("M"));
        font.draw_text(&mut three, &annotation("MMM"));

        let (leftmost, right_of_one) = ink_columns(&one);
        let (_, right_of_three) = ink_columns(&three);
        assert!(leftmost >= 3);
        assert!(right_of_three > right_of_one + 15);
    }

    #[test]
    fn configured_font_replaces_block_glyphs() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/DejaVuSansMono.ttf");
        let mut from_font = Pixmap::new(100, 40).expect("pixmap");
        let mut from_blocks = Pixmap::new(100, 40).expect("pixmap");
        rasterizer_for(Some(&path)).draw_text(&mut from_font, &annotation("o"));
        BlockRasterizer.draw_text(&mut from_blocks, &annotation("o"));
        assert_ne!(from_font.data(), from_blocks.data());
    }
}
