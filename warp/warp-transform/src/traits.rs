//! The point-mapping interface every transform implements.

use warp_types::{GridRect, Point2};

use crate::error::{TransformError, TransformResult};

/// Maps points between a transform's mapped space and control space.
///
/// `transform` carries a point from mapped space into control space;
/// `inverse_transform` goes the other way. Discrete (triangulated)
/// transforms can only map points inside their triangulated domain; the
/// `try_` variants report that as `None`, the checked variants as
/// [`TransformError::Unmappable`]. Continuous transforms map everything.
///
/// Batch helpers evaluate each point independently and never abort: an
/// unmappable point becomes a `None` slot in the output.
pub trait PointMapping {
    /// Map a point from mapped space into control space, if possible.
    fn try_transform(&self, point: &Point2<f64>) -> Option<Point2<f64>>;

    /// Map a point from control space into mapped space, if possible.
    fn try_inverse_transform(&self, point: &Point2<f64>) -> Option<Point2<f64>>;

    /// Map a point from mapped space into control space.
    ///
    /// # Errors
    ///
    /// [`TransformError::Unmappable`] if the point lies outside the
    /// transform's domain.
    fn transform(&self, point: &Point2<f64>) -> TransformResult<Point2<f64>> {
        self.try_transform(point)
            .ok_or(TransformError::Unmappable { point: *point })
    }

    /// Map a point from control space into mapped space.
    ///
    /// # Errors
    ///
    /// [`TransformError::Unmappable`] if the point lies outside the
    /// transform's domain.
    fn inverse_transform(&self, point: &Point2<f64>) -> TransformResult<Point2<f64>> {
        self.try_inverse_transform(point)
            .ok_or(TransformError::Unmappable { point: *point })
    }

    /// Whether the point can be mapped into control space.
    fn can_transform(&self, point: &Point2<f64>) -> bool {
        self.try_transform(point).is_some()
    }

    /// Whether the point can be mapped into mapped space.
    fn can_inverse_transform(&self, point: &Point2<f64>) -> bool {
        self.try_inverse_transform(point).is_some()
    }

    /// Map a batch of points into control space.
    ///
    /// Unmappable points yield `None`; the batch always completes.
    fn try_transform_points(&self, points: &[Point2<f64>]) -> Vec<Option<Point2<f64>>> {
        points.iter().map(|p| self.try_transform(p)).collect()
    }

    /// Map a batch of points into mapped space.
    fn try_inverse_transform_points(&self, points: &[Point2<f64>]) -> Vec<Option<Point2<f64>>> {
        points.iter().map(|p| self.try_inverse_transform(p)).collect()
    }

    /// The mapped-space region this transform can map, when bounded.
    ///
    /// Triangulated transforms return their mapped bounds; continuous
    /// transforms return `None` (they are defined everywhere). Composition
    /// uses this for its overlap early-out.
    fn mappable_bounds(&self) -> Option<GridRect> {
        None
    }
}
