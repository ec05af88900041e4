//! Core types for the warp transform engine.
//!
//! This crate provides the foundational types shared by every transform:
//!
//! - [`MappingPoint`] - A control/mapped coordinate correspondence
//! - [`GridRect`] - 2D axis-aligned bounding rectangle
//! - [`Segment`] and [`SegmentPair`] - Line segments in one or both spaces
//! - [`Triangle2`] and [`MappingTriangle`] - Triangles with barycentric maps
//! - [`TransformInfo`] - Source/target metadata used for cache invalidation
//!
//! # Spaces
//!
//! Every transform relates two 2D coordinate systems:
//! - **mapped space**: the source system points are mapped *from*
//! - **control space**: the target system points are mapped *into*
//!
//! A [`MappingPoint`] records one known correspondence between the two.
//! All coordinates are `f64`.
//!
//! # Example
//!
//! ```
//! use warp_types::{MappingPoint, GridRect, Point2};
//!
//! let points = vec![
//!     MappingPoint::new(Point2::new(0.0, 0.0), Point2::new(10.0, 10.0)),
//!     MappingPoint::new(Point2::new(5.0, 0.0), Point2::new(15.0, 10.0)),
//! ];
//!
//! let bounds = GridRect::from_points(points.iter().map(MappingPoint::control));
//! assert!(bounds.contains(&Point2::new(2.5, 0.0)));
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod info;
mod point;
mod rect;
mod segment;
mod triangle;

pub use info::TransformInfo;
pub use point::{
    control_duplicate, dedup_control_space, dedup_mapped_space, mapped_duplicate, MappingPoint,
    EPSILON, EPSILON_SQUARED,
};
pub use rect::GridRect;
pub use segment::{Segment, SegmentPair};
pub use triangle::{MappingTriangle, Triangle2};

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Vector2};
