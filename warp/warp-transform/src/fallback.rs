//! Discrete transforms and the discrete-with-continuous-fallback composite.

use std::sync::Arc;

use warp_types::{
    GridRect, MappingPoint, MappingTriangle, Point2, Segment, TransformInfo, Vector2,
};

use crate::error::TransformResult;
use crate::grid::GridTransform;
use crate::mesh::MeshTransform;
use crate::rbf::RbfTransform;
use crate::traits::PointMapping;
use crate::triangulation::HullIntersection;

/// Either of the two triangulated (discrete) transforms.
///
/// Discrete transforms share a full surface - points, bounds, triangles,
/// edges, boundary intersection - beyond the plain mapping interface;
/// this enum gives callers one type that carries it all. Composition
/// returns it, and [`FallbackTransform`] wraps it.
#[derive(Debug)]
pub enum DiscreteTransform {
    /// Uniform-lattice transform with O(1) lookup.
    Grid(GridTransform),
    /// Irregular Delaunay-triangulated transform.
    Mesh(MeshTransform),
}

impl DiscreteTransform {
    /// The sorted point array.
    #[must_use]
    pub fn points(&self) -> &[MappingPoint] {
        match self {
            Self::Grid(t) => t.points(),
            Self::Mesh(t) => t.points(),
        }
    }

    /// Transform metadata.
    #[must_use]
    pub fn info(&self) -> &TransformInfo {
        match self {
            Self::Grid(t) => t.info(),
            Self::Mesh(t) => t.info(),
        }
    }

    /// Bounding rectangle of the control points.
    #[must_use]
    pub fn control_bounds(&self) -> GridRect {
        match self {
            Self::Grid(t) => t.control_bounds(),
            Self::Mesh(t) => t.control_bounds(),
        }
    }

    /// Bounding rectangle of the mapped points.
    #[must_use]
    pub fn mapped_bounds(&self) -> GridRect {
        match self {
            Self::Grid(t) => t.mapped_bounds(),
            Self::Mesh(t) => t.mapped_bounds(),
        }
    }

    /// The triangle list.
    ///
    /// # Errors
    ///
    /// Propagates triangulation failure on mesh transforms.
    pub fn triangles(&self) -> TransformResult<Arc<Vec<MappingTriangle>>> {
        match self {
            Self::Grid(t) => Ok(t.triangles()),
            Self::Mesh(t) => t.triangles(),
        }
    }

    /// Per-point adjacency.
    ///
    /// # Errors
    ///
    /// Propagates triangulation failure on mesh transforms.
    pub fn edges(&self) -> TransformResult<Arc<Vec<Vec<usize>>>> {
        match self {
            Self::Grid(t) => Ok(t.edges()),
            Self::Mesh(t) => t.edges(),
        }
    }

    /// Grid dimensions, when this is a grid transform.
    #[must_use]
    pub fn grid_size(&self) -> Option<(usize, usize)> {
        match self {
            Self::Grid(t) => Some((t.grid_size_x(), t.grid_size_y())),
            Self::Mesh(_) => None,
        }
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
        match self {
            Self::Grid(t) => t.intersecting_control_rect(rect, include_adjacent),
            Self::Mesh(t) => t.intersecting_control_rect(rect, include_adjacent),
        }
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
        match self {
            Self::Grid(t) => t.intersecting_mapped_rect(rect, include_adjacent),
            Self::Mesh(t) => t.intersecting_mapped_rect(rect, include_adjacent),
        }
    }

    /// Nearest boundary edge intersected by a segment crossing the
    /// triangulation's boundary.
    #[must_use]
    pub fn convex_hull_intersection(
        &self,
        segment: &Segment,
        outside_point: &Point2<f64>,
    ) -> Option<HullIntersection> {
        match self {
            Self::Grid(t) => t.convex_hull_intersection(segment, outside_point),
            Self::Mesh(t) => t.convex_hull_intersection(segment, outside_point),
        }
    }

    /// Shift every control point by `vector`.
    pub fn translate(&mut self, vector: Vector2<f64>) {
        match self {
            Self::Grid(t) => t.translate(vector),
            Self::Mesh(t) => t.translate(vector),
        }
    }

    /// Drop rebuildable derived structures.
    pub fn minimize_memory(&mut self) {
        match self {
            Self::Grid(t) => t.minimize_memory(),
            Self::Mesh(t) => t.minimize_memory(),
        }
    }
}

impl PointMapping for DiscreteTransform {
    fn try_transform(&self, point: &Point2<f64>) -> Option<Point2<f64>> {
        match self {
            Self::Grid(t) => t.try_transform(point),
            Self::Mesh(t) => t.try_transform(point),
        }
    }

    fn try_inverse_transform(&self, point: &Point2<f64>) -> Option<Point2<f64>> {
        match self {
            Self::Grid(t) => t.try_inverse_transform(point),
            Self::Mesh(t) => t.try_inverse_transform(point),
        }
    }

    fn can_transform(&self, point: &Point2<f64>) -> bool {
        match self {
            Self::Grid(t) => t.can_transform(point),
            Self::Mesh(t) => t.can_transform(point),
        }
    }

    fn can_inverse_transform(&self, point: &Point2<f64>) -> bool {
        match self {
            Self::Grid(t) => t.can_inverse_transform(point),
            Self::Mesh(t) => t.can_inverse_transform(point),
        }
    }

    fn mappable_bounds(&self) -> Option<GridRect> {
        Some(self.mapped_bounds())
    }
}

impl From<GridTransform> for DiscreteTransform {
    fn from(t: GridTransform) -> Self {
        Self::Grid(t)
    }
}

impl From<MeshTransform> for DiscreteTransform {
    fn from(t: MeshTransform) -> Self {
        Self::Mesh(t)
    }
}

/// A discrete transform backed by a continuous fallback.
///
/// Mapping tries the discrete transform first and falls back to the
/// spline when the point lies outside the triangulated domain, so every
/// point maps. Structural accessors (points, bounds, triangles, edges)
/// pass through to the discrete member - those notions only exist for the
/// triangulated domain.
#[derive(Debug)]
pub struct FallbackTransform {
    discrete: DiscreteTransform,
    continuous: RbfTransform,
}

impl FallbackTransform {
    /// Wrap a discrete transform and its continuous fallback.
    #[must_use]
    pub fn new(discrete: DiscreteTransform, continuous: RbfTransform) -> Self {
        Self {
            discrete,
            continuous,
        }
    }

    /// Build both halves over the same correspondences: a mesh transform
    /// for the triangulated interior and a spline for everything else.
    ///
    /// # Errors
    ///
    /// Propagates construction failure from either half.
    pub fn from_points(points: Vec<MappingPoint>, info: TransformInfo) -> TransformResult<Self> {
        let mesh = MeshTransform::new(points.clone(), info)?;
        let rbf = RbfTransform::new(points, info)?;
        Ok(Self::new(DiscreteTransform::Mesh(mesh), rbf))
    }

    /// The wrapped discrete transform.
    #[must_use]
    pub const fn discrete(&self) -> &DiscreteTransform {
        &self.discrete
    }

    /// The continuous fallback.
    #[must_use]
    pub const fn continuous(&self) -> &RbfTransform {
        &self.continuous
    }

    /// The discrete member's point array.
    #[must_use]
    pub fn points(&self) -> &[MappingPoint] {
        self.discrete.points()
    }

    /// The discrete member's metadata.
    #[must_use]
    pub fn info(&self) -> &TransformInfo {
        self.discrete.info()
    }

    /// The discrete member's control bounds.
    #[must_use]
    pub fn control_bounds(&self) -> GridRect {
        self.discrete.control_bounds()
    }

    /// The discrete member's mapped bounds.
    #[must_use]
    pub fn mapped_bounds(&self) -> GridRect {
        self.discrete.mapped_bounds()
    }

    /// Shift every control point of both members by `vector`.
    pub fn translate(&mut self, vector: Vector2<f64>) {
        self.discrete.translate(vector);
        self.continuous.translate(vector);
    }

    /// Drop rebuildable derived structures of both members.
    pub fn minimize_memory(&mut self) {
        self.discrete.minimize_memory();
        self.continuous.minimize_memory();
    }
}

impl PointMapping for FallbackTransform {
    fn try_transform(&self, point: &Point2<f64>) -> Option<Point2<f64>> {
        self.discrete
            .try_transform(point)
            .or_else(|| self.continuous.try_transform(point))
    }

    fn try_inverse_transform(&self, point: &Point2<f64>) -> Option<Point2<f64>> {
        self.discrete
            .try_inverse_transform(point)
            .or_else(|| self.continuous.try_inverse_transform(point))
    }

    /// Always true: the fallback handles what the discrete half cannot.
    fn can_transform(&self, _point: &Point2<f64>) -> bool {
        true
    }

    /// Always true: the fallback handles what the discrete half cannot.
    fn can_inverse_transform(&self, _point: &Point2<f64>) -> bool {
        true
    }
}
