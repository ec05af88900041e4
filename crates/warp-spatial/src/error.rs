//! Error types for spatial structures.

use thiserror::Error;

/// Errors that can occur constructing spatial structures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SpatialError {
    /// The requested cell size is not a positive finite number.
    #[error("cell size must be positive and finite, got {0}")]
    InvalidCellSize(f64),
}
