//! Shared machinery for triangulated transforms.

use std::collections::BTreeSet;
use std::sync::Arc;

use warp_spatial::RectIndex;
use warp_types::{GridRect, MappingPoint, MappingTriangle, Point2, SegmentPair};

use crate::delaunay;
use crate::error::{TransformError, TransformResult};
use crate::lazy::Lazy;
use crate::points::PointSet;

/// The boundary edge a segment leaves a triangulation through.
///
/// Produced by `convex_hull_intersection` on the discrete transforms:
/// callers clipping geometry to a transform's valid domain get the
/// distance from their outside reference point, the exact intersection,
/// and the crossed edge in both spaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HullIntersection {
    /// Distance from the caller's outside point to the intersection.
    pub distance: f64,
    /// Where the segment crosses the boundary edge, in mapped space.
    pub point: Point2<f64>,
    /// The crossed edge in mapped and control space.
    pub edges: SegmentPair,
}

/// Where a transform's triangles come from.
pub(crate) enum TriangleSource {
    /// Topology shared across instances (uniform grids).
    Fixed(Arc<Vec<MappingTriangle>>),
    /// Delaunay triangulation of the mapped points, built on first use.
    Delaunay(Lazy<Vec<MappingTriangle>>),
}

impl std::fmt::Debug for TriangleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(t) => write!(f, "Fixed({} triangles)", t.len()),
            Self::Delaunay(lazy) => write!(f, "Delaunay({lazy:?})"),
        }
    }
}

/// Point array plus triangles plus the two per-space triangle indices.
///
/// Embedded by [`crate::GridTransform`] and [`crate::MeshTransform`];
/// the concrete types decide how a point resolves to a triangle, this
/// struct owns everything that does not depend on that choice.
#[derive(Debug)]
pub(crate) struct TriangulationData {
    points: PointSet,
    source: TriangleSource,
    mapped_tri_index: Lazy<RectIndex<usize>>,
    control_tri_index: Lazy<RectIndex<usize>>,
}

impl TriangulationData {
    /// Triangulated-on-demand data over an irregular point set.
    pub(crate) fn new_delaunay(points: PointSet) -> TransformResult<Self> {
        if points.len() < 3 {
            return Err(TransformError::InsufficientPoints {
                required: 3,
                provided: points.len(),
            });
        }
        Ok(Self {
            points,
            source: TriangleSource::Delaunay(Lazy::new()),
            mapped_tri_index: Lazy::new(),
            control_tri_index: Lazy::new(),
        })
    }

    /// Data over a point set whose topology is known up front.
    pub(crate) fn new_fixed(points: PointSet, triangles: Arc<Vec<MappingTriangle>>) -> Self {
        Self {
            points,
            source: TriangleSource::Fixed(triangles),
            mapped_tri_index: Lazy::new(),
            control_tri_index: Lazy::new(),
        }
    }

    pub(crate) fn points(&self) -> &PointSet {
        &self.points
    }

    pub(crate) fn points_mut(&mut self) -> &mut PointSet {
        &mut self.points
    }

    /// The triangle list, triangulating on first use if needed.
    pub(crate) fn triangles(&self) -> TransformResult<Arc<Vec<MappingTriangle>>> {
        match &self.source {
            TriangleSource::Fixed(triangles) => Ok(Arc::clone(triangles)),
            TriangleSource::Delaunay(lazy) => lazy.get_or_try_build(|| {
                delaunay::triangulate(&MappingPoint::mapped_points(self.points.points()))
            }),
        }
    }

    /// Index of triangle bounding boxes in mapped space.
    pub(crate) fn mapped_triangle_index(&self) -> TransformResult<Arc<RectIndex<usize>>> {
        let triangles = self.triangles()?;
        self.mapped_tri_index.get_or_try_build(|| {
            Ok(RectIndex::from_items(triangles.iter().enumerate().map(
                |(i, tri)| (tri.mapped_bounds(self.points.points()), i),
            )))
        })
    }

    /// Index of triangle bounding boxes in control space.
    pub(crate) fn control_triangle_index(&self) -> TransformResult<Arc<RectIndex<usize>>> {
        let triangles = self.triangles()?;
        self.control_tri_index.get_or_try_build(|| {
            Ok(RectIndex::from_items(triangles.iter().enumerate().map(
                |(i, tri)| (tri.control_bounds(self.points.points()), i),
            )))
        })
    }

    /// Find a triangle containing `point` in mapped space via the index.
    pub(crate) fn resolve_mapped(&self, point: &Point2<f64>) -> Option<MappingTriangle> {
        if !self
            .points
            .mapped_bounds()
            .contains_with_epsilon(point, warp_types::EPSILON)
        {
            return None;
        }

        let triangles = self.triangles().ok()?;
        let index = self.mapped_triangle_index().ok()?;

        for &i in index.query_point(point) {
            let tri = triangles[i];
            if tri.contains_mapped(self.points.points(), point) {
                return Some(tri);
            }
        }
        None
    }

    /// Find a triangle containing `point` in control space via the index.
    pub(crate) fn resolve_control(&self, point: &Point2<f64>) -> Option<MappingTriangle> {
        if !self
            .points
            .control_bounds()
            .contains_with_epsilon(point, warp_types::EPSILON)
        {
            return None;
        }

        let triangles = self.triangles().ok()?;
        let index = self.control_triangle_index().ok()?;

        for &i in index.query_point(point) {
            let tri = triangles[i];
            if tri.contains_control(self.points.points(), point) {
                return Some(tri);
            }
        }
        None
    }

    /// Distinct points of the triangles intersecting a control-space
    /// rectangle.
    ///
    /// With `include_adjacent`, points of intersecting triangles that lie
    /// outside the rectangle are kept (they share an edge crossing the
    /// border); without it the result is filtered to points strictly
    /// inside.
    pub(crate) fn intersecting_control_rect(
        &self,
        rect: &GridRect,
        include_adjacent: bool,
    ) -> TransformResult<Vec<MappingPoint>> {
        let triangles = self.triangles()?;
        let index = self.control_triangle_index()?;
        Ok(self.collect_triangle_points(&triangles, index.query(rect), rect, include_adjacent, true))
    }

    /// Distinct points of the triangles intersecting a mapped-space
    /// rectangle.
    pub(crate) fn intersecting_mapped_rect(
        &self,
        rect: &GridRect,
        include_adjacent: bool,
    ) -> TransformResult<Vec<MappingPoint>> {
        let triangles = self.triangles()?;
        let index = self.mapped_triangle_index()?;
        Ok(self.collect_triangle_points(&triangles, index.query(rect), rect, include_adjacent, false))
    }

    fn collect_triangle_points(
        &self,
        triangles: &[MappingTriangle],
        hits: Vec<&usize>,
        rect: &GridRect,
        include_adjacent: bool,
        control_space: bool,
    ) -> Vec<MappingPoint> {
        let mut indices = BTreeSet::new();
        for &i in hits {
            for &n in &triangles[i].indices {
                indices.insert(n);
            }
        }

        let points = self.points.points();
        indices
            .into_iter()
            .map(|i| points[i])
            .filter(|p| {
                include_adjacent
                    || rect.contains(if control_space { &p.control } else { &p.mapped })
            })
            .collect()
    }

    /// A copy holding only the point array and metadata.
    ///
    /// Fixed topology is shared with the original; everything else
    /// rebuilds lazily in the copy.
    pub(crate) fn fresh_clone(&self) -> Self {
        let source = match &self.source {
            TriangleSource::Fixed(triangles) => TriangleSource::Fixed(Arc::clone(triangles)),
            TriangleSource::Delaunay(_) => TriangleSource::Delaunay(Lazy::new()),
        };
        Self {
            points: self.points.clone(),
            source,
            mapped_tri_index: Lazy::new(),
            control_tri_index: Lazy::new(),
        }
    }

    /// Drop the triangle indices (and base point indices). Triangles
    /// themselves are kept: they are the expensive product, the indices
    /// over them rebuild quickly.
    pub(crate) fn minimize_memory(&mut self) {
        self.mapped_tri_index.clear();
        self.control_tri_index.clear();
        self.points.minimize_memory();
    }
}

/// Per-point adjacency from a triangle list: for every point, the sorted,
/// deduplicated indices of the points sharing a triangle with it.
pub(crate) fn edges_from_triangles(
    point_count: usize,
    triangles: &[MappingTriangle],
) -> Vec<Vec<usize>> {
    let mut edges: Vec<Vec<usize>> = vec![Vec::with_capacity(8); point_count];

    for tri in triangles {
        let [a, b, c] = tri.indices;
        edges[a].push(b);
        edges[a].push(c);
        edges[b].push(a);
        edges[b].push(c);
        edges[c].push(a);
        edges[c].push(b);
    }

    for list in &mut edges {
        list.sort_unstable();
        list.dedup();
        list.shrink_to_fit();
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp_types::TransformInfo;

    fn data() -> TriangulationData {
        let points = vec![
            MappingPoint::new(Point2::new(0.0, 0.0), Point2::new(0.0, 0.0)),
            MappingPoint::new(Point2::new(20.0, 0.0), Point2::new(2.0, 0.0)),
            MappingPoint::new(Point2::new(20.0, 20.0), Point2::new(2.0, 2.0)),
            MappingPoint::new(Point2::new(0.0, 20.0), Point2::new(0.0, 2.0)),
        ];
        let set = PointSet::new(points, TransformInfo::default()).unwrap();
        TriangulationData::new_delaunay(set).unwrap()
    }

    #[test]
    fn resolves_interior_point() {
        let d = data();
        let tri = d.resolve_mapped(&Point2::new(0.5, 0.5)).unwrap();
        assert!(tri.contains_mapped(d.points().points(), &Point2::new(0.5, 0.5)));
    }

    #[test]
    fn rejects_outside_point() {
        let d = data();
        assert!(d.resolve_mapped(&Point2::new(5.0, 5.0)).is_none());
        assert!(d.resolve_control(&Point2::new(50.0, 50.0)).is_none());
    }

    #[test]
    fn resolves_in_control_space() {
        let d = data();
        let tri = d.resolve_control(&Point2::new(5.0, 5.0)).unwrap();
        assert!(tri.contains_control(d.points().points(), &Point2::new(5.0, 5.0)));
    }

    #[test]
    fn edges_are_sorted_and_deduplicated() {
        let d = data();
        let triangles = d.triangles().unwrap();
        let edges = edges_from_triangles(d.points().len(), &triangles);

        assert_eq!(edges.len(), 4);
        for (i, list) in edges.iter().enumerate() {
            assert!(!list.is_empty());
            assert!(list.windows(2).all(|w| w[0] < w[1]));
            assert!(!list.contains(&i));
        }
    }

    #[test]
    fn rect_query_distinct_points() {
        let d = data();
        // A sliver in the middle intersects both triangles; all 4 points
        // are vertices of those triangles.
        let all = d
            .intersecting_mapped_rect(&GridRect::from_edges(0.9, 0.9, 1.1, 1.1), true)
            .unwrap();
        assert_eq!(all.len(), 4);

        let inside = d
            .intersecting_mapped_rect(&GridRect::from_edges(0.9, 0.9, 1.1, 1.1), false)
            .unwrap();
        assert!(inside.is_empty());
    }

    #[test]
    fn too_few_points_rejected() {
        let points = vec![
            MappingPoint::new(Point2::new(0.0, 0.0), Point2::new(0.0, 0.0)),
            MappingPoint::new(Point2::new(1.0, 0.0), Point2::new(1.0, 0.0)),
        ];
        let set = PointSet::new(points, TransformInfo::default()).unwrap();
        assert!(matches!(
            TriangulationData::new_delaunay(set),
            Err(TransformError::InsufficientPoints { .. })
        ));
    }
}
