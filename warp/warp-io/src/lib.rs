//! Transform description parsing, interop export, and disk caching.
//!
//! This crate handles everything that crosses the engine's boundary as
//! text or files:
//!
//! - **Parsing**: slice-to-slice registration files (`.stos` layout) and
//!   single transform entries in the `<type> vp <n> <values...>`
//!   `fp <n> <values...>` grammar, covering the subset of transform types
//!   the engine constructs ([`parse_stos_file`], [`parse_transform_entry`])
//! - **Export**: the fixed-layout `meshtransform_double_2_2` text
//!   serialization consumed by external registration tools
//!   ([`write_itk_transform`])
//! - **Caching**: a versioned JSON representation of a parsed transform,
//!   invalidated when the source description is newer and treated as a
//!   plain miss on any corruption ([`load_cached`], [`store_cached`],
//!   [`load_or_parse_stos`])
//!
//! # Example
//!
//! ```
//! use warp_io::parse_transform_entry;
//! use warp_transform::{GridTopologyCache, PointMapping};
//! use warp_types::{Point2, TransformInfo};
//!
//! let entry = "TranslationTransform_double_2_2 vp 2 10 0 fp 4 0 0 128 128";
//! let cache = GridTopologyCache::new();
//! let transform = parse_transform_entry(entry, TransformInfo::default(), &cache).unwrap();
//!
//! let out = transform.transform(&Point2::new(0.0, 0.0)).unwrap();
//! assert!((out.x - 10.0).abs() < 1e-9);
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod cache;
mod error;
mod itk;
mod params;
mod stos;

pub use cache::{load_cached, load_or_parse_stos, store_cached, CACHE_VERSION};
pub use error::{IoError, IoResult};
pub use itk::{write_itk_transform, write_itk_transform_parts};
pub use params::TransformParameters;
pub use stos::{parse_stos, parse_stos_file, parse_transform_entry, ParsedTransform};
