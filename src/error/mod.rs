use crate::config::ConfigPathError;
use crate::editor::{CanvasError, EditorActionError};
use crate::storage::StorageError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigPathError),
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    EditorAction(#[from] EditorActionError),
}
