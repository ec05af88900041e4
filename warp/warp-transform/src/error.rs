//! Error types for transform construction and point mapping.

use thiserror::Error;
use warp_types::Point2;

/// Result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// The space a duplicate point was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateSpace {
    /// Duplicate control coordinates.
    Control,
    /// Duplicate mapped coordinates.
    Mapped,
}

impl std::fmt::Display for DuplicateSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Control => write!(f, "control"),
            Self::Mapped => write!(f, "mapped"),
        }
    }
}

/// Errors that can occur building or evaluating transforms.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransformError {
    /// The point lies outside the transform's mappable domain.
    #[error("point ({x}, {y}) cannot be mapped: outside the triangulated domain", x = .point.x, y = .point.y)]
    Unmappable {
        /// The point that could not be mapped.
        point: Point2<f64>,
    },

    /// Two entries of the point array coincide in one space.
    ///
    /// Duplicate coordinates break the Delaunay triangulation, so they are
    /// rejected at construction time.
    #[error("points {first} and {second} coincide in {space} space")]
    DuplicatePoint {
        /// Index of the first point of the pair.
        first: usize,
        /// Index of the second point of the pair.
        second: usize,
        /// The space the pair coincides in.
        space: DuplicateSpace,
    },

    /// Too few points for the requested transform.
    #[error("transform requires at least {required} points, got {provided}")]
    InsufficientPoints {
        /// Minimum number of points required.
        required: usize,
        /// Number of points provided.
        provided: usize,
    },

    /// The point cloud could not be triangulated.
    #[error("triangulation failed: {0}")]
    Triangulation(String),

    /// The RBF linear system could not be solved.
    #[error("RBF system is degenerate: {0}")]
    DegenerateSystem(String),

    /// Grid point count does not match the grid dimensions.
    #[error("grid of {size_x}x{size_y} requires {expected} points, got {provided}")]
    GridDimensionMismatch {
        /// Grid width in points.
        size_x: usize,
        /// Grid height in points.
        size_y: usize,
        /// `size_x * size_y`.
        expected: usize,
        /// Number of points provided.
        provided: usize,
    },

    /// Composition inputs do not overlap, so no point can survive.
    #[error("transforms do not overlap: control bounds of the first are disjoint from the mapped bounds of the second")]
    DisjointBounds,
}
