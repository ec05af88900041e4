//! Error types for transform I/O.

use std::path::PathBuf;

use thiserror::Error;
use warp_transform::TransformError;

/// Result type for transform I/O operations.
pub type IoResult<T> = Result<T, IoError>;

/// Errors that can occur reading, writing, or caching transforms.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IoError {
    /// Underlying filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: PathBuf,
    },

    /// Invalid file content (parse error).
    #[error("invalid transform description: {message}")]
    InvalidContent {
        /// Description of what was invalid.
        message: String,
    },

    /// A transform type this engine does not construct.
    #[error("unsupported transform type: {name}")]
    UnsupportedTransform {
        /// The unrecognized type token.
        name: String,
    },

    /// The parsed description produced an invalid transform.
    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl IoError {
    /// Shorthand for an [`IoError::InvalidContent`].
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidContent {
            message: message.into(),
        }
    }
}
