//! Backing-store sizing for loaded radiographs.

use crate::geometry::Size;

const SMALL_SOURCE_SIDE: u32 = 600;
const MEDIUM_SOURCE_SIDE: u32 = 1200;
const SMALL_SOURCE_BOOST: f32 = 2.0;
const MEDIUM_SOURCE_BOOST: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasLayout {
    pub canvas: Size,
    pub scale: f32,
}

/// Computes the upscaled canvas for a source image so annotations keep
/// their precision when the user zooms in.
pub fn canvas_size_for(original: Size, viewport: Size, max_dimension: u32) -> CanvasLayout {
    let original = Size::new(original.width.max(1), original.height.max(1));
    let target_width = (viewport.width.saturating_mul(2)).max(original.width.saturating_mul(2));
    let mut scale = target_width as f32 / original.width as f32;

    let longer = original.longer_side();
    if longer < SMALL_SOURCE_SIDE {
        scale *= SMALL_SOURCE_BOOST;
    } else if longer < MEDIUM_SOURCE_SIDE {
        scale *= MEDIUM_SOURCE_BOOST;
    }

    let max_dimension = max_dimension.max(1);
    let scaled_longer = longer as f32 * scale;
    if scaled_longer > max_dimension as f32 {
        scale = (max_dimension as f32 / longer as f32).max(1.0);
    }

    let width = scaled_dimension(original.width, scale);
    let height = scaled_dimension(original.height, scale);
    CanvasLayout {
        canvas: Size::new(width, height),
        scale,
    }
}

/// Fits `canvas` inside `viewport` keeping its aspect ratio.
pub fn display_size_for(canvas: Size, viewport: Size) -> Size {
    if canvas.is_empty() || viewport.is_empty() {
        return Size::new(viewport.width.max(1), viewport.height.max(1));
    }
    let fit = (viewport.width as f32 / canvas.width as f32)
        .min(viewport.height as f32 / canvas.height as f32);
    Size::new(
        scaled_dimension(canvas.width, fit),
        scaled_dimension(canvas.height, fit),
    )
}

fn scaled_dimension(value: u32, scale: f32) -> u32 {
    ((value as f32 * scale).round() as u32).max(1)
}
