use thiserror::Error;

use crate::storage::StorageError;

/// Errors raised by the widget core.
///
/// Most of these never reach the visitor: the controller turns them into a
/// chat message or a disabled control.
#[derive(Error, Debug)]
pub enum WidgetError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Page error: {0}")]
    Page(String),

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Reservation error: {0}")]
    Reservation(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WidgetError>;
