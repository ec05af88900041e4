//! Delaunay triangulation of the mapped-space point cloud.

use warp_types::{MappingTriangle, Point2};

use crate::error::{TransformError, TransformResult};

/// Triangulate a 2D point cloud.
///
/// Returns the Delaunay triangles as index triples into `points`.
///
/// # Errors
///
/// - [`TransformError::InsufficientPoints`] for fewer than 3 points
/// - [`TransformError::Triangulation`] for non-finite coordinates or a
///   degenerate (e.g. fully collinear) cloud
pub(crate) fn triangulate(points: &[Point2<f64>]) -> TransformResult<Vec<MappingTriangle>> {
    if points.len() < 3 {
        return Err(TransformError::InsufficientPoints {
            required: 3,
            provided: points.len(),
        });
    }

    for (i, p) in points.iter().enumerate() {
        if !p.x.is_finite() || !p.y.is_finite() {
            return Err(TransformError::Triangulation(format!(
                "point {i} has non-finite coordinates ({}, {})",
                p.x, p.y
            )));
        }
    }

    let input: Vec<delaunator::Point> = points
        .iter()
        .map(|p| delaunator::Point { x: p.x, y: p.y })
        .collect();

    let triangulation = delaunator::triangulate(&input);
    if triangulation.triangles.is_empty() {
        return Err(TransformError::Triangulation(
            "point cloud is degenerate (collinear or coincident points)".to_string(),
        ));
    }

    Ok(triangulation
        .triangles
        .chunks_exact(3)
        .map(|t| MappingTriangle::new(t[0], t[1], t[2]))
        .collect())
}
