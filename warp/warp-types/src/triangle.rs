//! Triangles and the per-triangle affine mapping between spaces.

use nalgebra::Point2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::point::MappingPoint;
use crate::rect::GridRect;

/// Tolerance on barycentric coordinates for containment tests.
///
/// Points exactly on a triangle edge land at a coordinate of 0 or 1 plus
/// floating rounding; rejecting them would make boundary points of a
/// triangulation spuriously unmappable.
const BARYCENTRIC_EPSILON: f64 = 1e-8;

/// A concrete triangle with three vertex positions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Triangle2 {
    /// First vertex.
    pub a: Point2<f64>,
    /// Second vertex.
    pub b: Point2<f64>,
    /// Third vertex.
    pub c: Point2<f64>,
}

impl Triangle2 {
    /// Create a triangle from three vertices.
    #[inline]
    #[must_use]
    pub const fn new(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> Self {
        Self { a, b, c }
    }

    /// The triangle's bounding rectangle.
    #[must_use]
    pub fn bounds(&self) -> GridRect {
        GridRect::from_points([self.a, self.b, self.c].iter())
    }

    /// Twice the signed area of the triangle.
    #[inline]
    #[must_use]
    pub fn signed_area2(&self) -> f64 {
        let ab = self.b - self.a;
        let ac = self.c - self.a;
        ab.x * ac.y - ab.y * ac.x
    }

    /// Barycentric coordinates `(u, v)` of a point.
    ///
    /// `u` runs along edge a→b, `v` along a→c; the point is
    /// `a + u·(b−a) + v·(c−a)`. Returns `None` for a degenerate triangle.
    #[must_use]
    pub fn barycentric(&self, point: &Point2<f64>) -> Option<(f64, f64)> {
        let v0 = self.b - self.a;
        let v1 = self.c - self.a;
        let v2 = point - self.a;

        let denom = v0.x * v1.y - v1.x * v0.y;
        if denom.abs() <= f64::EPSILON {
            return None;
        }

        let u = (v2.x * v1.y - v1.x * v2.y) / denom;
        let v = (v0.x * v2.y - v2.x * v0.y) / denom;
        Some((u, v))
    }

    /// The point at barycentric coordinates `(u, v)`.
    #[inline]
    #[must_use]
    pub fn from_barycentric(&self, u: f64, v: f64) -> Point2<f64> {
        self.a + (self.b - self.a) * u + (self.c - self.a) * v
    }

    /// Check whether the triangle contains a point.
    ///
    /// Edge and vertex points count as inside.
    #[must_use]
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        match self.barycentric(point) {
            Some((u, v)) => {
                u >= -BARYCENTRIC_EPSILON
                    && v >= -BARYCENTRIC_EPSILON
                    && u + v <= 1.0 + BARYCENTRIC_EPSILON
            }
            None => false,
        }
    }
}

/// Three indices into a transform's point array, viewed as a triangle in
/// either space.
///
/// The indices borrow the owning transform's `[MappingPoint]` slice at
/// call time, so triangles stay cheap to copy and never dangle.
///
/// # Example
///
/// ```
/// use warp_types::{MappingPoint, MappingTriangle, Point2};
///
/// let points = vec![
///     MappingPoint::new(Point2::new(0.0, 0.0), Point2::new(0.0, 0.0)),
///     MappingPoint::new(Point2::new(20.0, 0.0), Point2::new(2.0, 0.0)),
///     MappingPoint::new(Point2::new(0.0, 20.0), Point2::new(0.0, 2.0)),
/// ];
/// let tri = MappingTriangle::new(0, 1, 2);
///
/// // Mapped-space (1, 0) lies halfway along the first edge: control (10, 0).
/// let out = tri.transform(&points, &Point2::new(1.0, 0.0)).unwrap();
/// assert!((out.x - 10.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MappingTriangle {
    /// Indices of the three vertices in the owning point array.
    pub indices: [usize; 3],
}

impl MappingTriangle {
    /// Create a triangle from three point indices.
    #[inline]
    #[must_use]
    pub const fn new(n1: usize, n2: usize, n3: usize) -> Self {
        Self {
            indices: [n1, n2, n3],
        }
    }

    /// The triangle's vertices in control space.
    #[must_use]
    pub fn control(&self, points: &[MappingPoint]) -> Triangle2 {
        Triangle2::new(
            points[self.indices[0]].control,
            points[self.indices[1]].control,
            points[self.indices[2]].control,
        )
    }

    /// The triangle's vertices in mapped space.
    #[must_use]
    pub fn mapped(&self, points: &[MappingPoint]) -> Triangle2 {
        Triangle2::new(
            points[self.indices[0]].mapped,
            points[self.indices[1]].mapped,
            points[self.indices[2]].mapped,
        )
    }

    /// Bounding rectangle of the control-space triangle.
    #[must_use]
    pub fn control_bounds(&self, points: &[MappingPoint]) -> GridRect {
        self.control(points).bounds()
    }

    /// Bounding rectangle of the mapped-space triangle.
    #[must_use]
    pub fn mapped_bounds(&self, points: &[MappingPoint]) -> GridRect {
        self.mapped(points).bounds()
    }

    /// Check whether the mapped-space triangle contains a point.
    #[must_use]
    pub fn contains_mapped(&self, points: &[MappingPoint], point: &Point2<f64>) -> bool {
        self.mapped(points).contains(point)
    }

    /// Check whether the control-space triangle contains a point.
    #[must_use]
    pub fn contains_control(&self, points: &[MappingPoint], point: &Point2<f64>) -> bool {
        self.control(points).contains(point)
    }

    /// Map a mapped-space point into control space through this triangle's
    /// affine map.
    ///
    /// Triangle vertices map to their paired control points exactly.
    /// Returns `None` for a degenerate triangle.
    #[must_use]
    pub fn transform(&self, points: &[MappingPoint], point: &Point2<f64>) -> Option<Point2<f64>> {
        for &i in &self.indices {
            if points[i].mapped == *point {
                return Some(points[i].control);
            }
        }

        let (u, v) = self.mapped(points).barycentric(point)?;
        Some(self.control(points).from_barycentric(u, v))
    }

    /// Map a control-space point into mapped space through this triangle's
    /// affine map.
    #[must_use]
    pub fn inverse_transform(
        &self,
        points: &[MappingPoint],
        point: &Point2<f64>,
    ) -> Option<Point2<f64>> {
        for &i in &self.indices {
            if points[i].control == *point {
                return Some(points[i].mapped);
            }
        }

        let (u, v) = self.control(points).barycentric(point)?;
        Some(self.mapped(points).from_barycentric(u, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_points() -> Vec<MappingPoint> {
        // Control space is mapped space scaled by 10.
        vec![
            MappingPoint::new(Point2::new(0.0, 0.0), Point2::new(0.0, 0.0)),
            MappingPoint::new(Point2::new(10.0, 0.0), Point2::new(1.0, 0.0)),
            MappingPoint::new(Point2::new(0.0, 10.0), Point2::new(0.0, 1.0)),
        ]
    }

    #[test]
    fn contains_interior_and_boundary() {
        let t = Triangle2::new(
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        );

        assert!(t.contains(&Point2::new(0.25, 0.25)));
        assert!(t.contains(&Point2::new(0.5, 0.5))); // on the hypotenuse
        assert!(t.contains(&Point2::new(0.0, 0.0))); // vertex
        assert!(!t.contains(&Point2::new(0.6, 0.6)));
    }

    #[test]
    fn vertices_map_exactly() {
        let points = unit_points();
        let tri = MappingTriangle::new(0, 1, 2);

        for p in &points {
            let out = tri.transform(&points, &p.mapped).unwrap();
            assert_eq!(out, p.control);
            let back = tri.inverse_transform(&points, &p.control).unwrap();
            assert_eq!(back, p.mapped);
        }
    }

    #[test]
    fn interior_point_scales() {
        let points = unit_points();
        let tri = MappingTriangle::new(0, 1, 2);

        let out = tri.transform(&points, &Point2::new(0.25, 0.25)).unwrap();
        assert_relative_eq!(out.x, 2.5, epsilon = 1e-12);
        assert_relative_eq!(out.y, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn roundtrip_through_affine_map() {
        let points = vec![
            MappingPoint::new(Point2::new(3.0, -1.0), Point2::new(0.0, 0.0)),
            MappingPoint::new(Point2::new(12.0, 2.0), Point2::new(4.0, 1.0)),
            MappingPoint::new(Point2::new(5.0, 9.0), Point2::new(1.0, 5.0)),
        ];
        let tri = MappingTriangle::new(0, 1, 2);

        let p = Point2::new(1.5, 1.5);
        let ctrl = tri.transform(&points, &p).unwrap();
        let back = tri.inverse_transform(&points, &ctrl).unwrap();
        assert_relative_eq!(back.x, p.x, epsilon = 1e-10);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-10);
    }

    #[test]
    fn degenerate_triangle_rejects() {
        let t = Triangle2::new(
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
        );
        assert!(t.barycentric(&Point2::new(0.5, 0.5)).is_none());
        assert!(!t.contains(&Point2::new(0.5, 0.5)));
    }
}
