//! Versioned disk cache for parsed transforms.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use warp_transform::{FallbackTransform, GridTopologyCache, GridTransform};
use warp_types::{GridRect, MappingPoint, Point2, TransformInfo};

use crate::error::IoResult;
use crate::stos::{parse_stos_file, ParsedTransform};

/// Format version of the cache envelope.
///
/// Bump on any structural change; readers treat a mismatch as a miss.
pub const CACHE_VERSION: u32 = 1;

/// Self-describing serialized form of a parsed transform.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    version: u32,
    kind: CachedKind,
    grid_size: Option<(usize, usize)>,
    control_section: i32,
    mapped_section: i32,
    /// Seconds/nanos since the epoch of the source description's
    /// last-modified time.
    source_modified: (u64, u32),
    mapped_bounds: Option<[f64; 4]>,
    /// Quadruples of control x, control y, mapped x, mapped y.
    points: Vec<[f64; 4]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum CachedKind {
    Grid,
    Mesh,
}

/// Persist a parsed transform next to its source description.
///
/// # Errors
///
/// Filesystem or serialization errors.
pub fn store_cached(path: impl AsRef<Path>, transform: &ParsedTransform) -> IoResult<()> {
    let info = transform.info();
    let since_epoch = info
        .last_modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    let (kind, grid_size, mapped_bounds) = match transform {
        ParsedTransform::Grid(g) => {
            let b = g.mapped_bounds();
            (
                CachedKind::Grid,
                Some((g.grid_size_x(), g.grid_size_y())),
                Some([b.left(), b.bottom(), b.right(), b.top()]),
            )
        }
        ParsedTransform::Mesh(_) => (CachedKind::Mesh, None, None),
    };

    let envelope = CacheEnvelope {
        version: CACHE_VERSION,
        kind,
        grid_size,
        control_section: info.control_section,
        mapped_section: info.mapped_section,
        source_modified: (since_epoch.as_secs(), since_epoch.subsec_nanos()),
        mapped_bounds,
        points: transform
            .points()
            .iter()
            .map(|p| [p.control.x, p.control.y, p.mapped.x, p.mapped.y])
            .collect(),
    };

    let json = serde_json::to_vec(&envelope)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    fs::write(path.as_ref(), json)?;
    debug!(path = %path.as_ref().display(), points = envelope.points.len(), "stored transform cache");
    Ok(())
}

/// Load a cached transform if it is still valid.
///
/// Returns `Ok(None)` - a miss, never an error - when the file is absent,
/// when the entry predates `source_modified` (stale), or when the content
/// cannot be decoded or rebuilt (the corrupt file is deleted).
///
/// # Errors
///
/// Only unexpected filesystem errors (permission failures and the like).
pub fn load_cached(
    path: impl AsRef<Path>,
    source_modified: SystemTime,
    topology: &GridTopologyCache,
) -> IoResult<Option<ParsedTransform>> {
    let path = path.as_ref();

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let envelope: CacheEnvelope = match serde_json::from_slice(&bytes) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "removing unreadable transform cache");
            let _ = fs::remove_file(path);
            return Ok(None);
        }
    };

    if envelope.version != CACHE_VERSION {
        warn!(
            path = %path.display(),
            found = envelope.version,
            expected = CACHE_VERSION,
            "removing transform cache with mismatched version"
        );
        let _ = fs::remove_file(path);
        return Ok(None);
    }

    let cached_modified =
        UNIX_EPOCH + Duration::new(envelope.source_modified.0, envelope.source_modified.1);
    if cached_modified < source_modified {
        debug!(path = %path.display(), "transform cache is older than its source");
        let _ = fs::remove_file(path);
        return Ok(None);
    }

    match rebuild(&envelope, cached_modified, topology) {
        Ok(transform) => Ok(Some(transform)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "removing transform cache that fails to rebuild");
            let _ = fs::remove_file(path);
            Ok(None)
        }
    }
}

/// Load from cache when fresh, otherwise parse the source and refresh the
/// cache.
///
/// A failure to *write* the refreshed cache entry is logged and ignored;
/// caching is best-effort and never the reason a transform fails to load.
///
/// # Errors
///
/// Errors from reading or parsing the source description.
pub fn load_or_parse_stos(
    stos_path: impl AsRef<Path>,
    cache_path: impl AsRef<Path>,
    topology: &GridTopologyCache,
) -> IoResult<ParsedTransform> {
    let stos_path = stos_path.as_ref();
    let cache_path = cache_path.as_ref();

    let source_modified = fs::metadata(stos_path)
        .and_then(|m| m.modified())
        .unwrap_or(UNIX_EPOCH);

    if let Some(cached) = load_cached(cache_path, source_modified, topology)? {
        debug!(path = %cache_path.display(), "loaded transform from cache");
        return Ok(cached);
    }

    let transform = parse_stos_file(stos_path, topology)?;
    if let Err(e) = store_cached(cache_path, &transform) {
        warn!(path = %cache_path.display(), error = %e, "failed to refresh transform cache");
    }
    Ok(transform)
}

fn rebuild(
    envelope: &CacheEnvelope,
    last_modified: SystemTime,
    topology: &GridTopologyCache,
) -> IoResult<ParsedTransform> {
    let info = TransformInfo::new(
        envelope.control_section,
        envelope.mapped_section,
        last_modified,
    );
    let points: Vec<MappingPoint> = envelope
        .points
        .iter()
        .map(|&[cx, cy, mx, my]| MappingPoint::new(Point2::new(cx, cy), Point2::new(mx, my)))
        .collect();

    match envelope.kind {
        CachedKind::Grid => {
            let (size_x, size_y) = envelope
                .grid_size
                .ok_or_else(|| crate::error::IoError::invalid("grid cache entry without dimensions"))?;
            let bounds = envelope
                .mapped_bounds
                .map(|[l, b, r, t]| GridRect::from_edges(l, b, r, t));
            let grid = GridTransform::new(points, bounds, size_x, size_y, info, topology)?;
            Ok(ParsedTransform::Grid(grid))
        }
        CachedKind::Mesh => {
            let fallback = FallbackTransform::from_points(points, info)?;
            Ok(ParsedTransform::Mesh(Box::new(fallback)))
        }
    }
}
