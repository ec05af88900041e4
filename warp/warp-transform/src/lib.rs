//! Triangulation, grid, and radial-basis-function 2D transforms.
//!
//! This crate is the geometric heart of the warp workspace: given paired
//! control/mapped coordinates it produces functions that map arbitrary
//! points between the two spaces - exactly at the known correspondences,
//! by piecewise-linear interpolation inside the triangulated region, and
//! (for the continuous transform) by thin-plate-spline extrapolation
//! everywhere else.
//!
//! # Transform types
//!
//! - [`GridTransform`] - uniform lattice with O(1) point-to-triangle
//!   lookup; topology shared across instances via [`GridTopologyCache`]
//! - [`MeshTransform`] - irregular point cloud, Delaunay triangulated,
//!   resolved through spatial indices
//! - [`RbfTransform`] - globally defined thin-plate-spline transform
//! - [`FallbackTransform`] - a discrete transform with a continuous
//!   fallback; always succeeds
//! - [`DiscreteTransform`] - either of the two triangulated transforms
//!
//! [`compose`] combines transform A (X→Y) and B (Y→Z) into one X→Z
//! transform, remapping A's control points through B in parallel.
//!
//! # Concurrency
//!
//! Transforms are immutable after construction and freely shared across
//! threads. Every derived structure (triangulation, spatial indices, edge
//! adjacency, RBF weights) is built lazily behind [`Lazy`], which
//! guarantees exactly one builder and any number of concurrent readers.
//! The two mutating operations, `translate` and `minimize_memory`, take
//! `&mut self`, so they cannot race in-flight reads.
//!
//! # Example
//!
//! ```
//! use warp_transform::{GridTopologyCache, GridTransform, PointMapping};
//! use warp_types::{MappingPoint, Point2, TransformInfo};
//!
//! // A 2x2 grid mapping the unit square onto a square scaled by 10.
//! let points = vec![
//!     MappingPoint::new(Point2::new(0.0, 0.0), Point2::new(0.0, 0.0)),
//!     MappingPoint::new(Point2::new(10.0, 0.0), Point2::new(1.0, 0.0)),
//!     MappingPoint::new(Point2::new(0.0, 10.0), Point2::new(0.0, 1.0)),
//!     MappingPoint::new(Point2::new(10.0, 10.0), Point2::new(1.0, 1.0)),
//! ];
//!
//! let cache = GridTopologyCache::new();
//! let grid = GridTransform::new(points, None, 2, 2, TransformInfo::default(), &cache).unwrap();
//!
//! let out = grid.transform(&Point2::new(0.5, 0.5)).unwrap();
//! assert!((out.x - 5.0).abs() < 1e-9);
//! assert!((out.y - 5.0).abs() < 1e-9);
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod compose;
mod delaunay;
mod error;
mod fallback;
mod grid;
mod lazy;
mod mesh;
mod points;
mod rbf;
mod traits;
mod triangulation;

pub use compose::compose;
pub use error::{DuplicateSpace, TransformError, TransformResult};
pub use fallback::{DiscreteTransform, FallbackTransform};
pub use grid::{GridTopology, GridTopologyCache, GridTransform};
pub use lazy::Lazy;
pub use mesh::MeshTransform;
pub use points::PointSet;
pub use rbf::RbfTransform;
pub use traits::PointMapping;
pub use triangulation::HullIntersection;

// Re-export the types crate: every public signature here speaks its types.
pub use warp_types::{
    GridRect, MappingPoint, MappingTriangle, Point2, Segment, SegmentPair, TransformInfo,
    Vector2,
};
