//! Spatial search structures for the warp transform engine.
//!
//! This crate provides the range-search services the transform engine
//! treats as black boxes:
//!
//! - [`RectIndex`] - A bounding-rectangle index over arbitrary items with
//!   insert / query / remove
//! - [`SegmentGrid`] - A cell grid over two-space edge pairs for
//!   segment-crossing queries
//!
//! Both structures bucket items into a uniform cell grid over a `HashMap`
//! keyed by integer cell coordinates. World coordinates are continuous
//! `f64`; cell coordinates are discrete `i64`.
//!
//! # Example
//!
//! ```
//! use warp_spatial::RectIndex;
//! use warp_types::{GridRect, Point2};
//!
//! let mut index = RectIndex::with_cell_size(1.0);
//! index.insert(GridRect::from_edges(0.0, 0.0, 2.0, 2.0), "a");
//! index.insert(GridRect::from_edges(5.0, 5.0, 6.0, 6.0), "b");
//!
//! let hits = index.query(&GridRect::from_edges(1.0, 1.0, 3.0, 3.0));
//! assert_eq!(hits, vec![&"a"]);
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod rect_index;
mod segment_grid;

pub use error::SpatialError;
pub use rect_index::RectIndex;
pub use segment_grid::SegmentGrid;
