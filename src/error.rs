//! Lala Error Types
//!
//! Centralized error handling for the assistant and its device services.

use thiserror::Error;

/// Central error type for Lala
#[derive(Error, Debug)]
pub enum LalaError {
    #[error("Device bridge error: {0}")]
    Bridge(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Speech recognition error: {0}")]
    Recognition(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unsupported audio format: {0}")]
    Audio(String),

    #[error("Invalid wake word: '{0}'")]
    InvalidWakeWord(String),

    #[error("Assistant not initialized")]
    NotInitialized,

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Lala operations
pub type LalaResult<T> = Result<T, LalaError>;

/// Helper to convert Mutex poison errors
impl<T> From<std::sync::PoisonError<T>> for LalaError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        LalaError::Lock(err.to_string())
    }
}

impl From<hound::Error> for LalaError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => LalaError::Io(e),
            other => LalaError::Audio(other.to_string()),
        }
    }
}
