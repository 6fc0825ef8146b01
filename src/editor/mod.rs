//! Radiograph annotation canvas: layers, tools, history and viewport.

pub mod history;
pub mod layout;
pub mod output;
mod session;
pub mod surface;
pub mod text_render;
pub mod tools;
pub mod viewport;

use std::path::PathBuf;

use crate::storage::StorageError;
use thiserror::Error;

pub use history::{CanvasSnapshot, HistoryEntry, SnapshotHistory};
pub use session::{AnnotationSession, DrawingSessionState, ImageSource, LoadOutcome};
pub use text_render::{BlockRasterizer, FontRasterizer, TextRasterizer};
pub use tools::{Annotation, StrokeColor, TextDraft, TextDraftAction, TextKey, ToolKind, ToolOptions};
pub use viewport::EditorViewport;

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("invalid canvas dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("failed to decode image from {origin}: {source}")]
    Decode {
        origin: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to encode png: {source}")]
    Encode {
        #[source]
        source: image::ImageError,
    },
    #[error("failed to read font {path}: {source}")]
    FontRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("font file {path} is not a usable TrueType/OpenType font")]
    InvalidFont { path: PathBuf },
    #[error("expected a data:image/png;base64 URL")]
    NotPngDataUrl,
    #[error("invalid base64 payload in data URL: {source}")]
    DataUrl {
        #[source]
        source: base64::DecodeError,
    },
    #[error("no radiograph is loaded")]
    ImageNotReady,
}

pub type CanvasResult<T> = std::result::Result<T, CanvasError>;

#[derive(Debug, Error)]
pub enum EditorActionError {
    #[error("canvas error while {operation} {record_id}: {source}")]
    Canvas {
        operation: &'static str,
        record_id: String,
        #[source]
        source: CanvasError,
    },

    #[error("storage error while {operation} {record_id}: {source}")]
    Storage {
        operation: &'static str,
        record_id: String,
        #[source]
        source: StorageError,
    },
}
