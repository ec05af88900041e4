//! Transform composition.

use rayon::prelude::*;
use tracing::{debug, info};
use warp_types::{dedup_control_space, dedup_mapped_space, MappingPoint, TransformInfo};

use crate::error::{TransformError, TransformResult};
use crate::fallback::DiscreteTransform;
use crate::grid::{GridTopologyCache, GridTransform};
use crate::mesh::MeshTransform;
use crate::traits::PointMapping;

/// Floor on the per-worker batch size; tiny batches spend more time in
/// scheduling than in mapping.
const MIN_BATCH_SIZE: usize = 64;

/// Compose transform `a` (X to Y) with transform `b` (Y to Z) into one
/// transform mapping X to Z.
///
/// Every control point of `a` is a Y-space coordinate; mapping it through
/// `b` yields the composed correspondence `(b(a.control), a.mapped)`.
/// Points `b` cannot map are dropped - recorded, never fatal. The work is
/// partitioned into balanced batches processed in parallel, each worker
/// filling a private buffer; buffers are merged after the parallel phase
/// and duplicates removed.
///
/// If `a` is a grid transform and every one of its points survived, grid
/// connectivity is still valid and the result is a grid transform with
/// the same dimensions; otherwise the surviving pairs are freshly
/// triangulated as a mesh transform.
///
/// # Errors
///
/// - [`TransformError::DisjointBounds`] when `b` has a bounded domain
///   that cannot contain any of `a`'s control points
/// - [`TransformError::InsufficientPoints`] when fewer than 3 composed
///   points survive
/// - construction errors from the resulting transform
pub fn compose<B>(
    a: &DiscreteTransform,
    b: &B,
    info: TransformInfo,
    cache: &GridTopologyCache,
) -> TransformResult<DiscreteTransform>
where
    B: PointMapping + Sync + ?Sized,
{
    // If the domains cannot overlap, no point can survive.
    if let Some(b_domain) = b.mappable_bounds() {
        if !b_domain.intersects(&a.control_bounds()) {
            return Err(TransformError::DisjointBounds);
        }
    }

    let points = a.points();
    let workers = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    let batch_size = (points.len() / (workers * 8)).max(MIN_BATCH_SIZE);

    let batches: Vec<(Vec<MappingPoint>, bool)> = points
        .par_chunks(batch_size)
        .map(|chunk| {
            let mut mapped = Vec::with_capacity(chunk.len());
            let mut all_mapped = true;
            for point in chunk {
                match b.try_transform(&point.control) {
                    Some(control) => mapped.push(MappingPoint::new(control, point.mapped)),
                    None => all_mapped = false,
                }
            }
            (mapped, all_mapped)
        })
        .collect();

    let mut merged = Vec::with_capacity(points.len());
    let mut all_mapped = true;
    for (buffer, batch_all_mapped) in batches {
        all_mapped &= batch_all_mapped;
        merged.extend(buffer);
    }

    let dropped = points.len() - merged.len();
    if dropped > 0 {
        debug!(
            dropped,
            total = points.len(),
            "control points fell outside the second transform's domain"
        );
    }

    let duplicates = dedup_control_space(&mut merged) + dedup_mapped_space(&mut merged);
    if duplicates > 0 {
        debug!(duplicates, "removed coinciding composed points");
    }

    if merged.len() < 3 {
        return Err(TransformError::InsufficientPoints {
            required: 3,
            provided: merged.len(),
        });
    }

    info!(
        input = points.len(),
        output = merged.len(),
        dropped,
        duplicates,
        "composed transforms"
    );

    if all_mapped && merged.len() == points.len() {
        if let Some((size_x, size_y)) = a.grid_size() {
            // Same mapped lattice, new control points: grid topology holds.
            let grid = GridTransform::new(merged, None, size_x, size_y, info, cache)?;
            return Ok(DiscreteTransform::Grid(grid));
        }
    }

    Ok(DiscreteTransform::Mesh(MeshTransform::new(merged, info)?))
}
