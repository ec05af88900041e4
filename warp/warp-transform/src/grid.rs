//! Uniform-grid triangulation transform.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use warp_types::{
    GridRect, MappingPoint, MappingTriangle, Point2, Segment, SegmentPair, TransformInfo,
    Vector2,
};

use crate::error::{TransformError, TransformResult};
use crate::points::PointSet;
use crate::traits::PointMapping;
use crate::triangulation::{edges_from_triangles, HullIntersection, TriangulationData};

/// Fractional distance to a grid line above which the border-edge lookup
/// re-checks against the rounded cell.
///
/// The exact value is a tuning constant: it only decides when a computed
/// border coordinate is suspected of having rounded into the neighboring
/// cell, and the suspicion is confirmed by an exact intersection test
/// before anything changes.
const ROUNDING_CORRECTION_THRESHOLD: f64 = 0.99;

/// Triangle and edge topology of a `sx`-by-`sy` lattice.
///
/// Topology depends only on the grid dimensions, never on coordinate
/// values, so one instance is shared by every grid transform of the same
/// size.
#[derive(Debug)]
pub struct GridTopology {
    /// Two triangles per cell, ordered cell-by-cell, column-major.
    pub triangles: Arc<Vec<MappingTriangle>>,
    /// Per-point adjacency derived from the triangles.
    pub edges: Arc<Vec<Vec<usize>>>,
}

impl GridTopology {
    fn build(size_x: usize, size_y: usize) -> Self {
        let cells_x = size_x.saturating_sub(1);
        let cells_y = size_y.saturating_sub(1);
        let mut triangles = Vec::with_capacity(cells_x * cells_y * 2);

        // Points are stored column-major: index = y + x * size_y.
        for x in 0..cells_x {
            for y in 0..cells_y {
                let bot_left = y + x * size_y;
                let top_left = (y + 1) + x * size_y;
                let bot_right = y + (x + 1) * size_y;
                let top_right = (y + 1) + (x + 1) * size_y;

                triangles.push(MappingTriangle::new(bot_left, bot_right, top_left));
                triangles.push(MappingTriangle::new(bot_right, top_right, top_left));
            }
        }

        let edges = edges_from_triangles(size_x * size_y, &triangles);

        Self {
            triangles: Arc::new(triangles),
            edges: Arc::new(edges),
        }
    }
}

/// Process-lifetime cache of grid topologies keyed by dimensions.
///
/// Tiled mosaics contain thousands of grid transforms sharing a handful of
/// distinct dimensions; computing the lattice triangles once per dimension
/// pair and sharing them makes those transforms cheap. The cache grows and
/// is never evicted - the key space is bounded by the set of grid sizes
/// actually in use.
///
/// The cache is an explicit service passed to [`GridTransform`]
/// constructors rather than process-global state; create one per volume
/// (or one per test) and share it by reference.
#[derive(Debug, Default)]
pub struct GridTopologyCache {
    inner: Mutex<HashMap<(usize, usize), Arc<GridTopology>>>,
}

impl GridTopologyCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The topology for a `size_x`-by-`size_y` lattice, computed on first
    /// request and shared afterwards.
    #[must_use]
    pub fn topology(&self, size_x: usize, size_y: usize) -> Arc<GridTopology> {
        let mut cache = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            cache
                .entry((size_x, size_y))
                .or_insert_with(|| Arc::new(GridTopology::build(size_x, size_y))),
        )
    }

    /// Number of distinct dimension pairs cached so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Border of the mapped bounds an intersection was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Border {
    Left,
    Right,
    Top,
    Bottom,
}

/// A triangulation transform over a uniform `size_x`-by-`size_y` lattice.
///
/// The mapped points form a regular grid over the mapped bounds, which
/// makes point-to-triangle resolution O(1): normalize the query into
/// fractional cell coordinates and pick one of the cell's two triangles
/// from the fractional remainder. The inverse direction has no such
/// shortcut and goes through the control-space triangle index.
pub struct GridTransform {
    data: TriangulationData,
    size_x: usize,
    size_y: usize,
    topology: Arc<GridTopology>,
}

impl GridTransform {
    /// Create a grid transform.
    ///
    /// `points` must contain exactly `size_x * size_y` entries whose
    /// mapped coordinates form a uniform lattice over the mapped bounds
    /// (pass `None` to compute the bounds from the points). Points are
    /// sorted into column-major lattice order internally.
    ///
    /// # Errors
    ///
    /// - [`TransformError::InsufficientPoints`] if either dimension is
    ///   less than 2
    /// - [`TransformError::GridDimensionMismatch`] if the point count
    ///   does not match the dimensions
    /// - [`TransformError::DuplicatePoint`] if entries coincide
    pub fn new(
        points: Vec<MappingPoint>,
        mapped_bounds: Option<GridRect>,
        size_x: usize,
        size_y: usize,
        info: TransformInfo,
        cache: &GridTopologyCache,
    ) -> TransformResult<Self> {
        if size_x < 2 || size_y < 2 {
            return Err(TransformError::InsufficientPoints {
                required: 4,
                provided: points.len(),
            });
        }
        if points.len() != size_x * size_y {
            return Err(TransformError::GridDimensionMismatch {
                size_x,
                size_y,
                expected: size_x * size_y,
                provided: points.len(),
            });
        }

        let set = PointSet::with_bounds(points, mapped_bounds, None, info)?;
        let topology = cache.topology(size_x, size_y);
        let data = TriangulationData::new_fixed(set, Arc::clone(&topology.triangles));

        Ok(Self {
            data,
            size_x,
            size_y,
            topology,
        })
    }

    /// Grid width in points.
    #[inline]
    #[must_use]
    pub const fn grid_size_x(&self) -> usize {
        self.size_x
    }

    /// Grid height in points.
    #[inline]
    #[must_use]
    pub const fn grid_size_y(&self) -> usize {
        self.size_y
    }

    /// The sorted point array (column-major lattice order).
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

    /// Bounding rectangle of the mapped lattice.
    #[must_use]
    pub fn mapped_bounds(&self) -> GridRect {
        self.data.points().mapped_bounds()
    }

    /// The lattice triangles (shared across same-size instances).
    #[must_use]
    pub fn triangles(&self) -> Arc<Vec<MappingTriangle>> {
        Arc::clone(&self.topology.triangles)
    }

    /// Per-point adjacency (shared across same-size instances).
    #[must_use]
    pub fn edges(&self) -> Arc<Vec<Vec<usize>>> {
        Arc::clone(&self.topology.edges)
    }

    /// Points of triangles intersecting a control-space rectangle.
    ///
    /// # Errors
    ///
    /// Propagates index-construction failures.
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
    /// Propagates index-construction failures.
    pub fn intersecting_mapped_rect(
        &self,
        rect: &GridRect,
        include_adjacent: bool,
    ) -> TransformResult<Vec<MappingPoint>> {
        self.data.intersecting_mapped_rect(rect, include_adjacent)
    }

    /// Shift every control point by `vector`.
    ///
    /// Not callable while shared: requires exclusive access.
    pub fn translate(&mut self, vector: Vector2<f64>) {
        self.data.points_mut().translate(vector);
        self.data.minimize_memory();
    }

    /// Drop rebuildable derived structures to reduce the footprint.
    pub fn minimize_memory(&mut self) {
        self.data.minimize_memory();
    }

    /// Mapped-space position of lattice point `(x, y)`.
    #[must_use]
    pub fn coordinate_from_grid_pos(&self, x: usize, y: usize) -> Point2<f64> {
        let bounds = self.mapped_bounds();
        Self::lattice_point(x, y, self.size_x, self.size_y, bounds.width(), bounds.height())
            + bounds.min.coords
    }

    /// Mapped-space position of lattice point `(x, y)` on a
    /// `size_x`-by-`size_y` grid spanning `width`-by-`height` from the
    /// origin.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn lattice_point(
        x: usize,
        y: usize,
        size_x: usize,
        size_y: usize,
        width: f64,
        height: f64,
    ) -> Point2<f64> {
        Point2::new(
            (x as f64 / (size_x - 1) as f64) * width,
            (y as f64 / (size_y - 1) as f64) * height,
        )
    }

    /// O(1) lookup of the triangle containing a mapped-space point.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn cell_triangle(&self, point: &Point2<f64>) -> Option<MappingTriangle> {
        let bounds = self.mapped_bounds();
        if !bounds.contains(point) || bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return None;
        }

        let fx = (point.x - bounds.left()) / bounds.width() * (self.size_x - 1) as f64;
        let fy = (point.y - bounds.bottom()) / bounds.height() * (self.size_y - 1) as f64;

        // Clamping puts points exactly on the right or top border into the
        // last cell instead of a nonexistent one past it; the remainder
        // then reaches 1.0 and selects the triangle owning that border.
        let ix = (fx.floor() as usize).min(self.size_x - 2);
        let iy = (fy.floor() as usize).min(self.size_y - 2);
        let upper = (fx - ix as f64) + (fy - iy as f64) > 1.0;

        let triangle_index = 2 * (iy + (self.size_y - 1) * ix) + usize::from(upper);
        Some(self.topology.triangles[triangle_index])
    }

    /// Find the nearest mapped-bounds border edge intersected by a segment
    /// that crosses the grid's boundary.
    ///
    /// `outside_point` is an endpoint of `segment` known to lie outside
    /// the grid; distance is measured from it. Returns `None` when the
    /// segment misses the boundary entirely.
    #[must_use]
    pub fn convex_hull_intersection(
        &self,
        segment: &Segment,
        outside_point: &Point2<f64>,
    ) -> Option<HullIntersection> {
        let bounds = self.mapped_bounds();
        if !bounds.intersects(&segment.bounds()) {
            return None;
        }

        let borders = [
            (bounds.left_edge(), Border::Left),
            (bounds.right_edge(), Border::Right),
            (bounds.top_edge(), Border::Top),
            (bounds.bottom_edge(), Border::Bottom),
        ];

        let mut best: Option<(f64, Point2<f64>, Border)> = None;
        for (edge, border) in borders {
            if let Some(hit) = segment.intersection(&edge) {
                let distance = (outside_point - hit).norm();
                if best.map_or(true, |(d, _, _)| distance < d) {
                    best = Some((distance, hit, border));
                }
            }
        }
        let (distance, hit, border) = best?;

        #[allow(clippy::cast_precision_loss)]
        let fx = (hit.x - bounds.left()) / bounds.width() * (self.size_x - 1) as f64;
        #[allow(clippy::cast_precision_loss)]
        let fy = (hit.y - bounds.bottom()) / bounds.height() * (self.size_y - 1) as f64;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mut ix = (fx.max(0.0).floor() as usize).min(self.size_x - 1);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mut iy = (fy.max(0.0).floor() as usize).min(self.size_y - 1);

        let mut pair = self.lines_for_coord(ix, iy, border)?;

        // A border coordinate a hair below an integer grid line floors
        // into the previous cell. If the chosen lattice edge fails an
        // exact re-intersection and the fraction is suspicious, round to
        // the nearest line and retry.
        if segment.intersection(&pair.mapped).is_none() {
            let fraction = match border {
                Border::Left | Border::Right => fx - fx.floor(),
                Border::Top | Border::Bottom => fy - fy.floor(),
            };
            if fraction > ROUNDING_CORRECTION_THRESHOLD {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                match border {
                    Border::Left | Border::Right => {
                        ix = (fx.round() as usize).min(self.size_x - 1);
                    }
                    Border::Top | Border::Bottom => {
                        iy = (fy.round() as usize).min(self.size_y - 1);
                    }
                }
                pair = self.lines_for_coord(ix, iy, border)?;
            }
        }

        Some(HullIntersection {
            distance,
            point: hit,
            edges: pair,
        })
    }

    /// The lattice edge lying on the intersected border at `(ix, iy)`, in
    /// both spaces.
    fn lines_for_coord(&self, ix: usize, iy: usize, border: Border) -> Option<SegmentPair> {
        let index = |x: usize, y: usize| y + x * self.size_y;

        let start = index(ix, iy);
        let end = match border {
            // Vertical borders carry vertical lattice edges.
            Border::Left | Border::Right => {
                if iy + 1 <= self.size_y - 1 {
                    index(ix, iy + 1)
                } else {
                    // Exact hit on the border's top corner: take the edge
                    // below it.
                    index(ix, iy.checked_sub(1)?)
                }
            }
            Border::Top | Border::Bottom => {
                if ix + 1 <= self.size_x - 1 {
                    index(ix + 1, iy)
                } else {
                    index(ix.checked_sub(1)?, iy)
                }
            }
        };

        let points = self.points();
        if start >= points.len() || end >= points.len() || start == end {
            return None;
        }

        Some(SegmentPair::new(
            Segment::new(points[start].mapped, points[end].mapped),
            Segment::new(points[start].control, points[end].control),
        ))
    }
}

impl PointMapping for GridTransform {
    fn try_transform(&self, point: &Point2<f64>) -> Option<Point2<f64>> {
        let tri = self.cell_triangle(point)?;
        tri.transform(self.points(), point)
    }

    fn try_inverse_transform(&self, point: &Point2<f64>) -> Option<Point2<f64>> {
        let tri = self.data.resolve_control(point)?;
        tri.inverse_transform(self.points(), point)
    }

    fn can_transform(&self, point: &Point2<f64>) -> bool {
        self.cell_triangle(point).is_some()
    }

    fn can_inverse_transform(&self, point: &Point2<f64>) -> bool {
        self.data.resolve_control(point).is_some()
    }

    fn mappable_bounds(&self) -> Option<GridRect> {
        Some(self.mapped_bounds())
    }
}

impl std::fmt::Debug for GridTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridTransform")
            .field("size_x", &self.size_x)
            .field("size_y", &self.size_y)
            .field("points", &self.points().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// `size`-by-`size` lattice mapping the unit square scaled by `scale`.
    fn scaled_grid(size: usize, scale: f64, cache: &GridTopologyCache) -> GridTransform {
        let mut points = Vec::new();
        for x in 0..size {
            for y in 0..size {
                let mapped = GridTransform::lattice_point(x, y, size, size, 1.0, 1.0);
                let control = Point2::new(mapped.x * scale, mapped.y * scale);
                points.push(MappingPoint::new(control, mapped));
            }
        }
        GridTransform::new(points, None, size, size, TransformInfo::default(), cache).unwrap()
    }

    #[test]
    fn two_by_two_scaled_square() {
        let cache = GridTopologyCache::new();
        let grid = scaled_grid(2, 10.0, &cache);

        let out = grid.transform(&Point2::new(0.5, 0.5)).unwrap();
        assert_relative_eq!(out.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(out.y, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn vertices_map_exactly() {
        let cache = GridTopologyCache::new();
        let grid = scaled_grid(3, 7.0, &cache);

        for p in grid.points() {
            assert_eq!(grid.transform(&p.mapped).unwrap(), p.control);
            assert_eq!(grid.inverse_transform(&p.control).unwrap(), p.mapped);
        }
    }

    #[test]
    fn boundary_points_resolve() {
        let cache = GridTopologyCache::new();
        let grid = scaled_grid(4, 2.0, &cache);

        // Right edge, top edge, and the far corner must not fall off the
        // lattice due to the cell index running one past the end.
        for p in [
            Point2::new(1.0, 0.4),
            Point2::new(0.4, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 0.0),
        ] {
            let out = grid.transform(&p).unwrap();
            assert_relative_eq!(out.x, p.x * 2.0, epsilon = 1e-9);
            assert_relative_eq!(out.y, p.y * 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn outside_point_unmappable() {
        let cache = GridTopologyCache::new();
        let grid = scaled_grid(2, 1.0, &cache);

        assert!(grid.try_transform(&Point2::new(2.0, 0.5)).is_none());
        assert!(matches!(
            grid.transform(&Point2::new(2.0, 0.5)),
            Err(TransformError::Unmappable { .. })
        ));
    }

    #[test]
    fn o1_lookup_matches_brute_force() {
        let cache = GridTopologyCache::new();
        let grid = scaled_grid(5, 3.0, &cache);
        let triangles = grid.triangles();

        // Deterministic pseudo-random interior points.
        let mut seed = 0x2545_f491_4f6c_dd1d_u64;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            #[allow(clippy::cast_precision_loss)]
            let unit = (seed >> 11) as f64 / (1u64 << 53) as f64;
            unit
        };

        for _ in 0..1000 {
            let p = Point2::new(next(), next());
            let fast = grid.cell_triangle(&p).unwrap();

            let brute = triangles
                .iter()
                .find(|t| t.contains_mapped(grid.points(), &p))
                .unwrap();

            // On a cell diagonal both triangles contain the point and
            // their affine maps agree there; otherwise the triangle must
            // be the same one.
            if fast != *brute {
                let a = fast.transform(grid.points(), &p).unwrap();
                let b = brute.transform(grid.points(), &p).unwrap();
                assert_relative_eq!(a.x, b.x, epsilon = 1e-9);
                assert_relative_eq!(a.y, b.y, epsilon = 1e-9);
            }
            assert!(fast.contains_mapped(grid.points(), &p));
        }
    }

    #[test]
    fn topology_shared_between_same_size_grids() {
        let cache = GridTopologyCache::new();
        let a = scaled_grid(4, 1.0, &cache);
        let b = scaled_grid(4, 9.0, &cache);
        let c = scaled_grid(3, 1.0, &cache);

        assert!(Arc::ptr_eq(&a.triangles(), &b.triangles()));
        assert!(!Arc::ptr_eq(&a.triangles(), &c.triangles()));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn dimension_mismatch_rejected() {
        let cache = GridTopologyCache::new();
        let points = vec![
            MappingPoint::new(Point2::new(0.0, 0.0), Point2::new(0.0, 0.0)),
            MappingPoint::new(Point2::new(1.0, 0.0), Point2::new(1.0, 0.0)),
            MappingPoint::new(Point2::new(0.0, 1.0), Point2::new(0.0, 1.0)),
        ];

        assert!(matches!(
            GridTransform::new(points, None, 2, 2, TransformInfo::default(), &cache),
            Err(TransformError::GridDimensionMismatch { .. })
        ));
    }

    #[test]
    fn hull_intersection_on_left_border() {
        let cache = GridTopologyCache::new();
        let grid = scaled_grid(3, 10.0, &cache);

        let outside = Point2::new(-1.0, 0.25);
        let segment = Segment::new(outside, Point2::new(0.5, 0.25));

        let hit = grid.convex_hull_intersection(&segment, &outside).unwrap();
        assert_relative_eq!(hit.point.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(hit.point.y, 0.25, epsilon = 1e-9);
        assert_relative_eq!(hit.distance, 1.0, epsilon = 1e-9);

        // The crossed edge is the vertical lattice edge from (0, 0) to
        // (0, 0.5) in mapped space.
        assert_relative_eq!(hit.edges.mapped.a.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(hit.edges.mapped.b.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(hit.edges.control.a.x, 0.0, epsilon = 1e-12);

        assert!(segment.intersection(&hit.edges.mapped).is_some());
    }

    #[test]
    fn hull_intersection_exact_corner() {
        let cache = GridTopologyCache::new();
        let grid = scaled_grid(3, 1.0, &cache);

        // Diagonal aimed exactly at the top-right corner.
        let outside = Point2::new(2.0, 2.0);
        let segment = Segment::new(outside, Point2::new(0.5, 0.5));

        let hit = grid.convex_hull_intersection(&segment, &outside).unwrap();
        assert!(segment.intersection(&hit.edges.mapped).is_some());
    }

    #[test]
    fn hull_intersection_misses_disjoint_segment() {
        let cache = GridTopologyCache::new();
        let grid = scaled_grid(2, 1.0, &cache);

        let outside = Point2::new(5.0, 5.0);
        let segment = Segment::new(outside, Point2::new(6.0, 6.0));
        assert!(grid.convex_hull_intersection(&segment, &outside).is_none());
    }

    #[test]
    fn translate_shifts_output() {
        let cache = GridTopologyCache::new();
        let mut grid = scaled_grid(2, 1.0, &cache);

        grid.translate(Vector2::new(100.0, 0.0));
        let out = grid.transform(&Point2::new(0.5, 0.5)).unwrap();
        assert_relative_eq!(out.x, 100.5, epsilon = 1e-9);
        assert_relative_eq!(out.y, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn rect_queries_after_minimize_memory() {
        let cache = GridTopologyCache::new();
        let mut grid = scaled_grid(3, 10.0, &cache);

        let rect = GridRect::from_edges(-1.0, -1.0, 6.0, 6.0);
        let before = grid.intersecting_control_rect(&rect, false).unwrap();
        grid.minimize_memory();
        let after = grid.intersecting_control_rect(&rect, false).unwrap();

        assert_eq!(before.len(), after.len());
        assert!(!after.is_empty());
    }
}
