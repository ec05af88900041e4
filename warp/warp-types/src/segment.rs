//! 2D line segments and paired (two-space) segments.

use nalgebra::Point2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::rect::GridRect;

/// Tolerance for orientation sign tests in segment intersection.
const ORIENT_EPSILON: f64 = 1e-10;

/// A 2D line segment between two endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    /// First endpoint.
    pub a: Point2<f64>,
    /// Second endpoint.
    pub b: Point2<f64>,
}

impl Segment {
    /// Create a segment between two endpoints.
    #[inline]
    #[must_use]
    pub const fn new(a: Point2<f64>, b: Point2<f64>) -> Self {
        Self { a, b }
    }

    /// The segment's bounding rectangle.
    #[must_use]
    pub fn bounds(&self) -> GridRect {
        GridRect::new(self.a, self.b)
    }

    /// Segment length.
    #[inline]
    #[must_use]
    pub fn length(&self) -> f64 {
        (self.b - self.a).norm()
    }

    /// Midpoint of the segment.
    #[inline]
    #[must_use]
    pub fn midpoint(&self) -> Point2<f64> {
        nalgebra::center(&self.a, &self.b)
    }

    /// Compute the intersection point with another segment, if any.
    ///
    /// Endpoint touches count as intersections. Collinear overlapping
    /// segments report the `other` endpoint that lies within `self`
    /// (the caller only needs *a* point on the shared span).
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Point2<f64>> {
        let d1 = self.b - self.a;
        let d2 = other.b - other.a;

        let denom = d1.x * d2.y - d1.y * d2.x;
        let offset = other.a - self.a;

        if denom.abs() <= ORIENT_EPSILON {
            // Parallel. Only collinear segments can still touch.
            let cross = offset.x * d1.y - offset.y * d1.x;
            if cross.abs() > ORIENT_EPSILON {
                return None;
            }

            let bounds = self.bounds().expanded(ORIENT_EPSILON);
            if bounds.contains(&other.a) {
                return Some(other.a);
            }
            if bounds.contains(&other.b) {
                return Some(other.b);
            }
            let other_bounds = other.bounds().expanded(ORIENT_EPSILON);
            if other_bounds.contains(&self.a) {
                return Some(self.a);
            }
            return None;
        }

        let t = (offset.x * d2.y - offset.y * d2.x) / denom;
        let u = (offset.x * d1.y - offset.y * d1.x) / denom;

        let tol = 1e-9;
        if t < -tol || t > 1.0 + tol || u < -tol || u > 1.0 + tol {
            return None;
        }

        Some(self.a + d1 * t.clamp(0.0, 1.0))
    }

    /// Check whether the segments intersect without computing the point.
    #[inline]
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.intersection(other).is_some()
    }

    /// Distance from a point to the segment.
    #[must_use]
    pub fn distance_to_point(&self, point: &Point2<f64>) -> f64 {
        let d = self.b - self.a;
        let len2 = d.norm_squared();
        if len2 <= f64::EPSILON {
            return (point - self.a).norm();
        }
        let t = ((point - self.a).dot(&d) / len2).clamp(0.0, 1.0);
        (point - (self.a + d * t)).norm()
    }
}

/// An edge expressed in both spaces of a transform.
///
/// Boundary clipping hands callers the intersected edge in mapped space
/// *and* its control-space image, so clipped geometry can be carried
/// across the transform without re-resolving the edge.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentPair {
    /// The edge in mapped space.
    pub mapped: Segment,
    /// The same edge in control space.
    pub control: Segment,
}

impl SegmentPair {
    /// Create a pair from a mapped-space and a control-space segment.
    #[inline]
    #[must_use]
    pub const fn new(mapped: Segment, control: Segment) -> Self {
        Self { mapped, control }
    }
}
