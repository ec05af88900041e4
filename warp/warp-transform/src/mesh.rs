//! Irregular-mesh triangulation transform.

use std::sync::Arc;

use warp_spatial::SegmentGrid;
use warp_types::{
    GridRect, MappingPoint, MappingTriangle, Point2, Segment, SegmentPair, TransformInfo,
    Vector2,
};

use crate::error::TransformResult;
use crate::lazy::Lazy;
use crate::points::PointSet;
use crate::traits::PointMapping;
use crate::triangulation::{edges_from_triangles, HullIntersection, TriangulationData};

/// A triangulation transform over an irregular point cloud.
///
/// The mapped points are Delaunay triangulated on first use; point
/// resolution goes through per-space spatial indices over the triangle
/// bounding boxes and exact containment tests - no O(1) shortcut exists
/// for irregular layouts. A secondary line-search grid over the
/// triangulation's edges accelerates boundary-crossing queries.
pub struct MeshTransform {
    data: TriangulationData,
    edges: Lazy<Vec<Vec<usize>>>,
    segment_grid: Lazy<SegmentGrid>,
}

impl MeshTransform {
    /// Create a mesh transform over a point cloud.
    ///
    /// # Errors
    ///
    /// - [`crate::TransformError::InsufficientPoints`] for fewer than 3
    ///   points
    /// - [`crate::TransformError::DuplicatePoint`] if entries coincide
    pub fn new(points: Vec<MappingPoint>, info: TransformInfo) -> TransformResult<Self> {
        Self::with_bounds(points, None, None, info)
    }

    /// Create a mesh transform with bounds carried over from a parsed
    /// description header.
    ///
    /// # Errors
    ///
    /// Same as [`MeshTransform::new`].
    pub fn with_bounds(
        points: Vec<MappingPoint>,
        mapped_bounds: Option<GridRect>,
        control_bounds: Option<GridRect>,
        info: TransformInfo,
    ) -> TransformResult<Self> {
        let set = PointSet::with_bounds(points, mapped_bounds, control_bounds, info)?;
        let data = TriangulationData::new_delaunay(set)?;
        Ok(Self {
            data,
            edges: Lazy::new(),
            segment_grid: Lazy::new(),
        })
    }

    /// The sorted point array.
    #[must_use]
    pub fn points(&self) -> &[MappingPoint] {
        self.data.points().points()
    }

    /// Transform metadata.
    #[must_use]
    pub fn info(&self) -> &TransformInfo {
        self.data.points().info()
    }

    /// Bounding rectangle of the control points.
    #[must_use]
    pub fn control_bounds(&self) -> GridRect {
        self.data.points().control_bounds()
    }

    /// Bounding rectangle of the mapped points.
    #[must_use]
    pub fn mapped_bounds(&self) -> GridRect {
        self.data.points().mapped_bounds()
    }

    /// The Delaunay triangles, computed on first use.
    ///
    /// # Errors
    ///
    /// [`crate::TransformError::Triangulation`] for a degenerate cloud.
    pub fn triangles(&self) -> TransformResult<Arc<Vec<MappingTriangle>>> {
        self.data.triangles()
    }

    /// Per-point adjacency, computed on first use.
    ///
    /// # Errors
    ///
    /// Propagates triangulation failure.
    pub fn edges(&self) -> TransformResult<Arc<Vec<Vec<usize>>>> {
        self.edges.get_or_try_build(|| {
            let triangles = self.data.triangles()?;
            Ok(edges_from_triangles(self.points().len(), &triangles))
        })
    }

    /// Points of triangles intersecting a control-space rectangle.
    ///
    /// # Errors
    ///
    /// Propagates triangulation failure.
    pub fn intersecting_control_rect(
        &self,
        rect: &GridRect,
        include_adjacent: bool,
    ) -> TransformResult<Vec<MappingPoint>> {
        self.data.intersecting_control_rect(rect, include_adjacent)
    }

    /// Points of triangles intersecting a mapped-space rectangle.
    ///
    /// # Errors
    ///
    /// Propagates triangulation failure.
    pub fn intersecting_mapped_rect(
        &self,
        rect: &GridRect,
        include_adjacent: bool,
    ) -> TransformResult<Vec<MappingPoint>> {
        self.data.intersecting_mapped_rect(rect, include_adjacent)
    }

    /// Shift every control point by `vector`.
    pub fn translate(&mut self, vector: Vector2<f64>) {
        self.data.points_mut().translate(vector);
        self.segment_grid.clear();
        self.data.minimize_memory();
    }

    /// Drop rebuildable derived structures to reduce the footprint.
    pub fn minimize_memory(&mut self) {
        self.edges.clear();
        self.segment_grid.clear();
        self.data.minimize_memory();
    }

    /// The line-search grid over the triangulation's edges.
    fn segment_grid(&self) -> TransformResult<Arc<SegmentGrid>> {
        self.segment_grid.get_or_try_build(|| {
            let edges = self.edges()?;
            let points = self.points();

            let mut pairs = Vec::new();
            for (i, neighbors) in edges.iter().enumerate() {
                for &j in neighbors {
                    // Each undirected edge once.
                    if j <= i {
                        continue;
                    }
                    pairs.push(SegmentPair::new(
                        Segment::new(points[i].mapped, points[j].mapped),
                        Segment::new(points[i].control, points[j].control),
                    ));
                }
            }

            Ok(SegmentGrid::new(pairs))
        })
    }

    /// Find the nearest triangulation edge intersected by a segment that
    /// crosses the mesh's boundary.
    ///
    /// `outside_point` is an endpoint of `segment` known to lie outside
    /// the convex hull; distance is measured from it. Returns `None` when
    /// the segment crosses no edge (or the cloud cannot be triangulated).
    #[must_use]
    pub fn convex_hull_intersection(
        &self,
        segment: &Segment,
        outside_point: &Point2<f64>,
    ) -> Option<HullIntersection> {
        let grid = self.segment_grid().ok()?;
        let query_bounds = segment.bounds();

        let mut best: Option<HullIntersection> = None;
        for pair in grid.candidates(segment) {
            if !pair.mapped.bounds().intersects(&query_bounds) {
                continue;
            }
            let Some(hit) = pair.mapped.intersection(segment) else {
                continue;
            };

            let distance = (outside_point - hit).norm();
            if best.as_ref().map_or(true, |b| distance < b.distance) {
                best = Some(HullIntersection {
                    distance,
                    point: hit,
                    edges: *pair,
                });
            }
        }

        best
    }
}

impl Clone for MeshTransform {
    /// Deep copy: duplicates the point array and metadata only.
    ///
    /// Triangulation, indices, edges, and the line-search grid all start
    /// empty in the copy and rebuild lazily.
    fn clone(&self) -> Self {
        Self {
            data: self.data.fresh_clone(),
            edges: Lazy::new(),
            segment_grid: Lazy::new(),
        }
    }
}

impl PointMapping for MeshTransform {
    fn try_transform(&self, point: &Point2<f64>) -> Option<Point2<f64>> {
        let tri = self.data.resolve_mapped(point)?;
        tri.transform(self.points(), point)
    }

    fn try_inverse_transform(&self, point: &Point2<f64>) -> Option<Point2<f64>> {
        let tri = self.data.resolve_control(point)?;
        tri.inverse_transform(self.points(), point)
    }

    fn can_transform(&self, point: &Point2<f64>) -> bool {
        self.data.resolve_mapped(point).is_some()
    }

    fn can_inverse_transform(&self, point: &Point2<f64>) -> bool {
        self.data.resolve_control(point).is_some()
    }

    fn mappable_bounds(&self) -> Option<GridRect> {
        Some(self.mapped_bounds())
    }
}

impl std::fmt::Debug for MeshTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshTransform")
            .field("points", &self.points().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use approx::assert_relative_eq;

    /// Five points: unit square corners plus center, control = mapped * 4.
    fn mesh() -> MeshTransform {
        let points = vec![
            MappingPoint::new(Point2::new(0.0, 0.0), Point2::new(0.0, 0.0)),
            MappingPoint::new(Point2::new(4.0, 0.0), Point2::new(1.0, 0.0)),
            MappingPoint::new(Point2::new(4.0, 4.0), Point2::new(1.0, 1.0)),
            MappingPoint::new(Point2::new(0.0, 4.0), Point2::new(0.0, 1.0)),
            MappingPoint::new(Point2::new(2.0, 2.0), Point2::new(0.5, 0.5)),
        ];
        MeshTransform::new(points, TransformInfo::default()).unwrap()
    }

    #[test]
    fn interior_point_scales() {
        let m = mesh();
        let out = m.transform(&Point2::new(0.25, 0.25)).unwrap();
        assert_relative_eq!(out.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(out.y, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn vertices_map_exactly() {
        let m = mesh();
        for p in m.points() {
            assert_eq!(m.transform(&p.mapped).unwrap(), p.control);
            assert_eq!(m.inverse_transform(&p.control).unwrap(), p.mapped);
        }
    }

    #[test]
    fn hull_boundary_point_resolves() {
        let m = mesh();
        // Midpoint of the bottom hull edge.
        let out = m.transform(&Point2::new(0.5, 0.0)).unwrap();
        assert_relative_eq!(out.x, 2.0, epsilon = 1e-9);
        assert_relative_eq!(out.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn far_point_unmappable() {
        let m = mesh();
        let far = Point2::new(1000.0, 1000.0);
        assert!(!m.can_transform(&far));
        assert!(matches!(
            m.transform(&far),
            Err(TransformError::Unmappable { .. })
        ));
    }

    #[test]
    fn roundtrip_inside_hull() {
        let m = mesh();
        let p = Point2::new(0.3, 0.7);

        let ctrl = m.transform(&p).unwrap();
        let back = m.inverse_transform(&ctrl).unwrap();
        assert_relative_eq!(back.x, p.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-9);
    }

    #[test]
    fn edges_connect_center_to_corners() {
        let m = mesh();
        let edges = m.edges().unwrap();

        // The center point is index 2 after mapped-order sorting
        // (x then y): (0,0) (0,1) (0.5,0.5) (1,0) (1,1).
        let center_neighbors = &edges[2];
        assert_eq!(center_neighbors.len(), 4);
    }

    #[test]
    fn hull_intersection_finds_crossed_edge() {
        let m = mesh();

        let outside = Point2::new(-1.0, 0.5);
        let segment = Segment::new(outside, Point2::new(0.5, 0.5));
        let hit = m.convex_hull_intersection(&segment, &outside).unwrap();

        // The left hull edge runs from (0,0) to (0,1) in mapped space.
        assert_relative_eq!(hit.point.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(hit.point.y, 0.5, epsilon = 1e-9);
        assert_relative_eq!(hit.distance, 1.0, epsilon = 1e-9);
        assert_relative_eq!(hit.edges.control.a.x, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn deep_copy_maps_identically() {
        let m = mesh();
        let _ = m.triangles().unwrap();

        let copy = m.clone();
        assert_eq!(copy.points(), m.points());

        let p = Point2::new(0.6, 0.4);
        assert_eq!(copy.transform(&p).unwrap(), m.transform(&p).unwrap());
    }

    #[test]
    fn minimize_memory_keeps_behavior() {
        let mut m = mesh();
        let p = Point2::new(0.3, 0.3);
        let before = m.transform(&p).unwrap();

        m.minimize_memory();
        let after = m.transform(&p).unwrap();
        assert_eq!(before, after);
    }
}
