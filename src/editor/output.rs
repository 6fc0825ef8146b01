use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};
use tiny_skia::Pixmap;

use super::surface::rgba_from_pixmap;
use super::{CanvasError, CanvasResult};
use crate::storage::{validate_record_id, StorageResult};

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

pub fn encode_png(pixmap: &Pixmap) -> CanvasResult<Vec<u8>> {
    let image = rgba_from_pixmap(pixmap)?;
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut bytes, ImageFormat::Png)
        .map_err(|source| CanvasError::Encode { source })?;
    Ok(bytes.into_inner())
}

pub fn png_data_url(png: &[u8]) -> String {
    format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(png))
}

pub fn decode_png_data_url(data_url: &str) -> CanvasResult<Vec<u8>> {
    let payload = data_url
        .strip_prefix(PNG_DATA_URL_PREFIX)
        .ok_or(CanvasError::NotPngDataUrl)?;
    STANDARD
        .decode(payload.trim())
        .map_err(|source| CanvasError::DataUrl { source })
}

/// Download name for an exported radiograph; stable for a given record.
pub fn export_file_name(record_id: &str) -> StorageResult<String> {
    let stem = validate_record_id(record_id)?;
    Ok(format!("radiografia-{stem}-anotada.png"))
}
