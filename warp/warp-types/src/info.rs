//! Transform metadata.

use std::fmt;
use std::time::SystemTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identity and provenance of a transform.
///
/// `control_section` and `mapped_section` identify the two spaces the
/// transform relates (section numbers in a serial reconstruction, tile
/// numbers in a mosaic). `last_modified` is the timestamp of the source
/// description the transform was built from; the disk cache compares it
/// against a cache entry's recorded timestamp to decide staleness. Nothing
/// else in the engine reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransformInfo {
    /// Identifier of the control (target) space.
    pub control_section: i32,
    /// Identifier of the mapped (source) space.
    pub mapped_section: i32,
    /// Last-modified time of the source description.
    pub last_modified: SystemTime,
}

impl TransformInfo {
    /// Create metadata for a transform between two sections.
    #[must_use]
    pub const fn new(control_section: i32, mapped_section: i32, last_modified: SystemTime) -> Self {
        Self {
            control_section,
            mapped_section,
            last_modified,
        }
    }

    /// Metadata with unspecified sections, stamped with the epoch.
    ///
    /// Useful for transforms built in memory that never touch the cache.
    #[must_use]
    pub const fn unlabeled() -> Self {
        Self {
            control_section: 0,
            mapped_section: 0,
            last_modified: SystemTime::UNIX_EPOCH,
        }
    }
}

impl Default for TransformInfo {
    fn default() -> Self {
        Self::unlabeled()
    }
}

impl fmt::Display for TransformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.mapped_section, self.control_section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_reads_mapped_to_control() {
        let info = TransformInfo::new(7, 6, SystemTime::UNIX_EPOCH);
        assert_eq!(info.to_string(), "6 -> 7");
    }
}
