//! Point array substrate shared by every reference-point transform.

use warp_spatial::RectIndex;
use warp_types::{
    control_duplicate, mapped_duplicate, GridRect, MappingPoint, Point2, TransformInfo, Vector2,
};

use crate::error::{DuplicateSpace, TransformError, TransformResult};
use crate::lazy::Lazy;

/// The sorted point array of a transform, with its lazily derived bounds
/// and per-space point indices.
///
/// No transform math lives here: `PointSet` is a points-and-bounds
/// substrate that the triangulated and continuous transforms embed.
///
/// Points are sorted by mapped x (then y) at construction, and the
/// uniqueness invariant - no two entries sharing a control point, no two
/// sharing a mapped point - is always enforced: violating it corrupts the
/// triangulation in ways that surface far from the cause.
#[derive(Debug)]
pub struct PointSet {
    points: Vec<MappingPoint>,
    info: TransformInfo,
    control_bounds: Lazy<GridRect>,
    mapped_bounds: Lazy<GridRect>,
    control_index: Lazy<RectIndex<usize>>,
    mapped_index: Lazy<RectIndex<usize>>,
}

impl PointSet {
    /// Create a point set, sorting by mapped coordinate and validating the
    /// uniqueness invariant.
    ///
    /// # Errors
    ///
    /// [`TransformError::DuplicatePoint`] if two entries coincide in
    /// either space.
    pub fn new(points: Vec<MappingPoint>, info: TransformInfo) -> TransformResult<Self> {
        Self::with_bounds(points, None, None, info)
    }

    /// Create a point set with pre-computed bounds.
    ///
    /// Parsed transform descriptions carry their bounds in the header;
    /// passing them here skips the first bounds scan. `None` leaves the
    /// bound to be computed from the points on first use.
    ///
    /// # Errors
    ///
    /// [`TransformError::DuplicatePoint`] if two entries coincide in
    /// either space.
    pub fn with_bounds(
        mut points: Vec<MappingPoint>,
        mapped_bounds: Option<GridRect>,
        control_bounds: Option<GridRect>,
        info: TransformInfo,
    ) -> TransformResult<Self> {
        points.sort_by(MappingPoint::cmp_by_mapped);

        if let Some((first, second)) = control_duplicate(&points) {
            return Err(TransformError::DuplicatePoint {
                first,
                second,
                space: DuplicateSpace::Control,
            });
        }
        if let Some((first, second)) = mapped_duplicate(&points) {
            return Err(TransformError::DuplicatePoint {
                first,
                second,
                space: DuplicateSpace::Mapped,
            });
        }

        Ok(Self {
            points,
            info,
            control_bounds: control_bounds.map_or_else(Lazy::new, Lazy::ready),
            mapped_bounds: mapped_bounds.map_or_else(Lazy::new, Lazy::ready),
            control_index: Lazy::new(),
            mapped_index: Lazy::new(),
        })
    }

    /// The sorted point array.
    #[inline]
    #[must_use]
    pub fn points(&self) -> &[MappingPoint] {
        &self.points
    }

    /// Number of correspondences.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the set holds no points.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Transform metadata.
    #[inline]
    #[must_use]
    pub const fn info(&self) -> &TransformInfo {
        &self.info
    }

    /// Bounding rectangle of the control points, computed on first use.
    #[must_use]
    pub fn control_bounds(&self) -> GridRect {
        *self
            .control_bounds
            .get_or_build(|| GridRect::from_points(self.points.iter().map(MappingPoint::control)))
    }

    /// Bounding rectangle of the mapped points, computed on first use.
    #[must_use]
    pub fn mapped_bounds(&self) -> GridRect {
        *self
            .mapped_bounds
            .get_or_build(|| GridRect::from_points(self.points.iter().map(MappingPoint::mapped)))
    }

    /// The control-space point index, built on first use.
    #[must_use]
    pub fn control_index(&self) -> std::sync::Arc<RectIndex<usize>> {
        self.control_index.get_or_build(|| {
            RectIndex::from_items(
                self.points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (GridRect::from_point(p.control), i)),
            )
        })
    }

    /// The mapped-space point index, built on first use.
    #[must_use]
    pub fn mapped_index(&self) -> std::sync::Arc<RectIndex<usize>> {
        self.mapped_index.get_or_build(|| {
            RectIndex::from_items(
                self.points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (GridRect::from_point(p.mapped), i)),
            )
        })
    }

    /// The points whose control coordinate falls inside the rectangle.
    #[must_use]
    pub fn intersecting_control_rect(&self, rect: &GridRect) -> Vec<MappingPoint> {
        let mut indices: Vec<usize> = self.control_index().query(rect).into_iter().copied().collect();
        indices.sort_unstable();
        indices.into_iter().map(|i| self.points[i]).collect()
    }

    /// The points whose mapped coordinate falls inside the rectangle.
    #[must_use]
    pub fn intersecting_mapped_rect(&self, rect: &GridRect) -> Vec<MappingPoint> {
        let mut indices: Vec<usize> = self.mapped_index().query(rect).into_iter().copied().collect();
        indices.sort_unstable();
        indices.into_iter().map(|i| self.points[i]).collect()
    }

    /// Shift every control point by `vector`.
    ///
    /// Mapped coordinates are untouched, so sort order is preserved. The
    /// control bounds shift with the points; the control point index is
    /// dropped and rebuilds on next use.
    pub fn translate(&mut self, vector: Vector2<f64>) {
        for point in &mut self.points {
            point.control += vector;
        }

        if let Some(bounds) = self.control_bounds.peek() {
            self.control_bounds.set(bounds.translated(vector));
        }
        self.control_index.clear();
    }

    /// Drop the cached point indices; the next access rebuilds them.
    pub fn minimize_memory(&mut self) {
        self.control_index.clear();
        self.mapped_index.clear();
    }

    /// Nearest point (by mapped coordinate) to `point`, if the set is
    /// non-empty. Linear scan; used by diagnostics, not hot paths.
    #[must_use]
    pub fn nearest_mapped(&self, point: &Point2<f64>) -> Option<&MappingPoint> {
        self.points
            .iter()
            .min_by(|a, b| {
                (a.mapped - point)
                    .norm_squared()
                    .total_cmp(&(b.mapped - point).norm_squared())
            })
    }
}

impl Clone for PointSet {
    /// Duplicate the point array and metadata only.
    ///
    /// Derived bounds and indices start empty in the copy and rebuild
    /// lazily on first use.
    fn clone(&self) -> Self {
        Self {
            points: self.points.clone(),
            info: self.info,
            control_bounds: Lazy::new(),
            mapped_bounds: Lazy::new(),
            control_index: Lazy::new(),
            mapped_index: Lazy::new(),
        }
    }
}
