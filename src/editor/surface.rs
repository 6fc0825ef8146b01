//! Raster layers behind the annotation canvas and the primitives that paint
//! on them.

use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage};
use tiny_skia::{
    BlendMode, ColorU8, FillRule, IntSize, LineCap, LineJoin, Paint, PathBuilder, Pixmap,
    PixmapPaint, Stroke, Transform,
};

use super::text_render::TextRasterizer;
use super::tools::{Annotation, CanvasPoint, Color, PenStroke, Size};
use super::{CanvasError, CanvasResult};

pub fn new_layer(size: Size) -> CanvasResult<Pixmap> {
    Pixmap::new(size.width, size.height).ok_or(CanvasError::InvalidDimensions {
        width: size.width,
        height: size.height,
    })
}

pub fn layer_size(layer: &Pixmap) -> Size {
    Size::new(layer.width(), layer.height())
}

fn ink_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = true;
    paint
}

fn eraser_paint() -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, 255);
    paint.anti_alias = true;
    paint.blend_mode = BlendMode::DestinationOut;
    paint
}

fn round_stroke(width: f32) -> Stroke {
    Stroke {
        width: width.max(1.0),
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    }
}

fn fill_disc(layer: &mut Pixmap, center: CanvasPoint, radius: f32, paint: &Paint<'_>) {
    let Some(path) = PathBuilder::from_circle(center.x, center.y, radius.max(0.5)) else {
        tracing::debug!(?center, radius, "skipping degenerate disc");
        return;
    };
    layer.fill_path(&path, paint, FillRule::Winding, Transform::identity(), None);
}

/// Paints one segment of an open stroke. Segments share round joins so the
/// incremental result matches stroking the whole path at once closely.
pub fn stroke_segment(
    layer: &mut Pixmap,
    from: CanvasPoint,
    to: CanvasPoint,
    color: Color,
    width: f32,
) {
    let mut builder = PathBuilder::new();
    builder.move_to(from.x, from.y);
    builder.line_to(to.x, to.y);
    let Some(path) = builder.finish() else {
        return;
    };
    layer.stroke_path(
        &path,
        &ink_paint(color),
        &round_stroke(width),
        Transform::identity(),
        None,
    );
}

/// Paints a full stroke; a single-point stroke becomes a dot.
pub fn stroke_path(layer: &mut Pixmap, stroke: &PenStroke) {
    if stroke.is_dot() {
        fill_dot(layer, stroke);
        return;
    }

    let mut builder = PathBuilder::new();
    let mut points = stroke.points.iter();
    if let Some(first) = points.next() {
        builder.move_to(first.x, first.y);
    }
    points.for_each(|point| builder.line_to(point.x, point.y));
    let Some(path) = builder.finish() else {
        return;
    };
    layer.stroke_path(
        &path,
        &ink_paint(stroke.color),
        &round_stroke(stroke.width),
        Transform::identity(),
        None,
    );
}

pub fn fill_dot(layer: &mut Pixmap, stroke: &PenStroke) {
    if let Some(center) = stroke.points.first() {
        fill_disc(layer, *center, stroke.width / 2.0, &ink_paint(stroke.color));
    }
}

/// Clears a disc from `layer` so whatever sits below it shows through.
pub fn erase(layer: &mut Pixmap, center: CanvasPoint, radius: f32) {
    fill_disc(layer, center, radius, &eraser_paint());
}

/// Pure form of [`stroke_path`]: returns a new layer with `stroke` applied.
pub fn apply_stroke(layer: &Pixmap, stroke: &PenStroke) -> Pixmap {
    let mut next = layer.clone();
    stroke_path(&mut next, stroke);
    next
}

/// Flattens base image, ink and annotations into one raster.
pub fn compose(
    base: &Pixmap,
    ink: &Pixmap,
    annotations: &[Annotation],
    rasterizer: &dyn TextRasterizer,
) -> Pixmap {
    let mut output = base.clone();
    output.draw_pixmap(
        0,
        0,
        ink.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    for annotation in annotations {
        rasterizer.draw_text(&mut output, annotation);
    }
    output
}

pub fn restore_layer(layer: &mut Pixmap, bytes: &[u8]) -> bool {
    let data = layer.data_mut();
    if data.len() != bytes.len() {
        tracing::warn!(
            expected = data.len(),
            actual = bytes.len(),
            "snapshot does not match layer size; keeping current pixels"
        );
        return false;
    }
    data.copy_from_slice(bytes);
    true
}

/// Packs the raw premultiplied bytes of `layer` into a PNG container. The
/// bytes are stored as-is, so [`unpack_layer`] restores them exactly.
pub fn pack_layer(layer: &Pixmap) -> CanvasResult<Vec<u8>> {
    let mut packed = Vec::new();
    PngEncoder::new_with_quality(&mut packed, CompressionType::Fast, PngFilterType::Sub)
        .write_image(
            layer.data(),
            layer.width(),
            layer.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|source| CanvasError::Encode { source })?;
    Ok(packed)
}

/// Overwrites `layer` with bytes produced by [`pack_layer`]. Returns `false`
/// when the packed layer has different dimensions.
pub fn unpack_layer(layer: &mut Pixmap, packed: &[u8]) -> CanvasResult<bool> {
    let unpacked = image::load_from_memory_with_format(packed, ImageFormat::Png)
        .map_err(|source| CanvasError::Decode {
            origin: "history snapshot".to_string(),
            source,
        })?
        .into_rgba8();
    if unpacked.dimensions() != (layer.width(), layer.height()) {
        tracing::warn!(
            packed = ?unpacked.dimensions(),
            layer = ?(layer.width(), layer.height()),
            "packed layer does not match; keeping current pixels"
        );
        return Ok(false);
    }
    Ok(restore_layer(layer, unpacked.as_raw()))
}

pub fn pixmap_from_rgba(image: &RgbaImage) -> CanvasResult<Pixmap> {
    let (width, height) = image.dimensions();
    let size = IntSize::from_wh(width, height)
        .ok_or(CanvasError::InvalidDimensions { width, height })?;
    let mut data = Vec::with_capacity(image.as_raw().len());
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        let premultiplied = ColorU8::from_rgba(r, g, b, a).premultiply();
        data.extend_from_slice(&[
            premultiplied.red(),
            premultiplied.green(),
            premultiplied.blue(),
            premultiplied.alpha(),
        ]);
    }
    Pixmap::from_vec(data, size).ok_or(CanvasError::InvalidDimensions { width, height })
}

pub fn rgba_from_pixmap(pixmap: &Pixmap) -> CanvasResult<RgbaImage> {
    let mut data = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data).ok_or(
        CanvasError::InvalidDimensions {
            width: pixmap.width(),
            height: pixmap.height(),
        },
    )
}

/// Alpha of the pixel at `(x, y)`, or `None` outside the layer.
pub fn alpha_at(layer: &Pixmap, x: u32, y: u32) -> Option<u8> {
    layer.pixel(x, y).map(|pixel| pixel.alpha())
}
