//! Radial-basis-function (thin-plate-spline) transform.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use warp_types::{GridRect, MappingPoint, Point2, TransformInfo, Vector2};

use crate::error::{TransformError, TransformResult};
use crate::lazy::Lazy;
use crate::points::PointSet;
use crate::traits::PointMapping;

/// Singular values below this are treated as zero when solving.
const SVD_EPSILON: f64 = 1e-10;

/// Distances below this evaluate the basis to zero; `ln` is singular at 0.
const MIN_BASIS_DISTANCE: f64 = 1e-12;

/// The thin-plate-spline basis, phi(d) = d^2 * ln(d).
#[inline]
fn basis(distance: f64) -> f64 {
    if distance < MIN_BASIS_DISTANCE {
        0.0
    } else {
        distance * distance * distance.ln()
    }
}

/// Solved weights for one mapping direction.
///
/// Layout per axis: `n` kernel weights followed by the affine terms
/// `[a_y, a_x, a_0]`, matching the evaluation
/// `sum(w_i * phi) + p.y * a_y + p.x * a_x + a_0`.
#[derive(Debug)]
struct RbfWeights {
    x: DVector<f64>,
    y: DVector<f64>,
}

/// Solve the `(n+3)`-square thin-plate system mapping `source` points
/// onto `target` points.
fn solve_weights(source: &[Point2<f64>], target: &[Point2<f64>]) -> TransformResult<RbfWeights> {
    let n = source.len();
    let size = n + 3;

    let mut matrix = DMatrix::<f64>::zeros(size, size);

    // Affine constraint rows: kernel weights must carry no net affine
    // component, or the polynomial term becomes ambiguous.
    for (j, s) in source.iter().enumerate() {
        matrix[(0, j)] = s.x;
        matrix[(1, j)] = s.y;
        matrix[(2, j)] = 1.0;
    }

    // Interpolation rows: one per source point.
    for (i, si) in source.iter().enumerate() {
        let row = i + 3;
        for (j, sj) in source.iter().enumerate() {
            matrix[(row, j)] = basis((si - sj).norm());
        }
        matrix[(row, n)] = si.y;
        matrix[(row, n + 1)] = si.x;
        matrix[(row, n + 2)] = 1.0;
    }

    let mut rhs_x = DVector::<f64>::zeros(size);
    let mut rhs_y = DVector::<f64>::zeros(size);
    for (i, t) in target.iter().enumerate() {
        rhs_x[i + 3] = t.x;
        rhs_y[i + 3] = t.y;
    }

    let svd = matrix.svd(true, true);
    let x = svd
        .solve(&rhs_x, SVD_EPSILON)
        .map_err(|e| TransformError::DegenerateSystem(e.to_string()))?;
    let y = svd
        .solve(&rhs_y, SVD_EPSILON)
        .map_err(|e| TransformError::DegenerateSystem(e.to_string()))?;

    Ok(RbfWeights { x, y })
}

/// Evaluate the spline at one point.
fn evaluate(weights: &RbfWeights, source: &[Point2<f64>], point: &Point2<f64>) -> Point2<f64> {
    let n = source.len();
    let mut x = 0.0;
    let mut y = 0.0;

    for (i, s) in source.iter().enumerate() {
        let k = basis((point - s).norm());
        x += weights.x[i] * k;
        y += weights.y[i] * k;
    }

    x += point.y * weights.x[n] + point.x * weights.x[n + 1] + weights.x[n + 2];
    y += point.y * weights.y[n] + point.x * weights.y[n + 1] + weights.y[n + 2];

    Point2::new(x, y)
}

/// A globally continuous transform interpolating the control points with
/// a thin-plate spline.
///
/// Unlike the triangulated transforms, the spline is defined everywhere:
/// `can_transform` and `can_inverse_transform` are always true, and
/// points far outside the original cloud extrapolate smoothly. One dense
/// linear system per direction is solved on first use and cached for the
/// transform's lifetime.
///
/// Used both standalone and as the continuous half of
/// [`crate::FallbackTransform`].
pub struct RbfTransform {
    points: PointSet,
    forward: Lazy<RbfWeights>,
    inverse: Lazy<RbfWeights>,
}

impl RbfTransform {
    /// Create a thin-plate-spline transform over the correspondences.
    ///
    /// # Errors
    ///
    /// - [`TransformError::InsufficientPoints`] for fewer than 3 points
    /// - [`TransformError::DuplicatePoint`] if entries coincide
    pub fn new(points: Vec<MappingPoint>, info: TransformInfo) -> TransformResult<Self> {
        if points.len() < 3 {
            return Err(TransformError::InsufficientPoints {
                required: 3,
                provided: points.len(),
            });
        }

        Ok(Self {
            points: PointSet::new(points, info)?,
            forward: Lazy::new(),
            inverse: Lazy::new(),
        })
    }

    /// The sorted point array.
    #[must_use]
    pub fn points(&self) -> &[MappingPoint] {
        self.points.points()
    }

    /// Transform metadata.
    #[must_use]
    pub fn info(&self) -> &TransformInfo {
        self.points.info()
    }

    /// Bounding rectangle of the control points.
    ///
    /// The spline maps points well outside these bounds; they describe
    /// the correspondences, not the domain.
    #[must_use]
    pub fn control_bounds(&self) -> GridRect {
        self.points.control_bounds()
    }

    /// Bounding rectangle of the mapped points.
    #[must_use]
    pub fn mapped_bounds(&self) -> GridRect {
        self.points.mapped_bounds()
    }

    /// Map a point into control space.
    ///
    /// # Errors
    ///
    /// [`TransformError::DegenerateSystem`] if the weight system cannot
    /// be solved (a pathological point configuration).
    pub fn checked_transform(&self, point: &Point2<f64>) -> TransformResult<Point2<f64>> {
        let weights = self.forward_weights()?;
        let source = MappingPoint::mapped_points(self.points.points());
        Ok(evaluate(&weights, &source, point))
    }

    /// Map a point into mapped space.
    ///
    /// # Errors
    ///
    /// [`TransformError::DegenerateSystem`] if the weight system cannot
    /// be solved.
    pub fn checked_inverse_transform(&self, point: &Point2<f64>) -> TransformResult<Point2<f64>> {
        let weights = self.inverse_weights()?;
        let source = MappingPoint::control_points(self.points.points());
        Ok(evaluate(&weights, &source, point))
    }

    /// Map a batch of points into control space in parallel.
    ///
    /// The weights are solved once up front; evaluation is embarrassingly
    /// parallel with no shared mutable state.
    ///
    /// # Errors
    ///
    /// [`TransformError::DegenerateSystem`] if the weight system cannot
    /// be solved.
    pub fn transform_points(&self, points: &[Point2<f64>]) -> TransformResult<Vec<Point2<f64>>> {
        let weights = self.forward_weights()?;
        let source = MappingPoint::mapped_points(self.points.points());
        Ok(points
            .par_iter()
            .map(|p| evaluate(&weights, &source, p))
            .collect())
    }

    /// Map a batch of points into mapped space in parallel.
    ///
    /// # Errors
    ///
    /// [`TransformError::DegenerateSystem`] if the weight system cannot
    /// be solved.
    pub fn inverse_transform_points(
        &self,
        points: &[Point2<f64>],
    ) -> TransformResult<Vec<Point2<f64>>> {
        let weights = self.inverse_weights()?;
        let source = MappingPoint::control_points(self.points.points());
        Ok(points
            .par_iter()
            .map(|p| evaluate(&weights, &source, p))
            .collect())
    }

    /// Shift every control point by `vector`.
    ///
    /// Both weight sets depend on the control coordinates and are
    /// recomputed on next use.
    pub fn translate(&mut self, vector: Vector2<f64>) {
        self.points.translate(vector);
        self.forward.clear();
        self.inverse.clear();
    }

    /// Drop both solved weight sets; the next mapping re-solves.
    pub fn minimize_memory(&mut self) {
        self.forward.clear();
        self.inverse.clear();
        self.points.minimize_memory();
    }

    fn forward_weights(&self) -> TransformResult<std::sync::Arc<RbfWeights>> {
        self.forward.get_or_try_build(|| {
            let points = self.points.points();
            solve_weights(
                &MappingPoint::mapped_points(points),
                &MappingPoint::control_points(points),
            )
        })
    }

    fn inverse_weights(&self) -> TransformResult<std::sync::Arc<RbfWeights>> {
        self.inverse.get_or_try_build(|| {
            let points = self.points.points();
            solve_weights(
                &MappingPoint::control_points(points),
                &MappingPoint::mapped_points(points),
            )
        })
    }
}

impl PointMapping for RbfTransform {
    fn try_transform(&self, point: &Point2<f64>) -> Option<Point2<f64>> {
        self.checked_transform(point).ok()
    }

    fn try_inverse_transform(&self, point: &Point2<f64>) -> Option<Point2<f64>> {
        self.checked_inverse_transform(point).ok()
    }

    /// Always true: the spline is defined everywhere.
    fn can_transform(&self, _point: &Point2<f64>) -> bool {
        true
    }

    /// Always true: the spline is defined everywhere.
    fn can_inverse_transform(&self, _point: &Point2<f64>) -> bool {
        true
    }
}

impl std::fmt::Debug for RbfTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RbfTransform")
            .field("points", &self.points.len())
            .field("forward", &self.forward)
            .field("inverse", &self.inverse)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn corners(offset: Vector2<f64>) -> Vec<MappingPoint> {
        [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)]
            .into_iter()
            .map(|(x, y)| {
                let mapped = Point2::new(x, y);
                MappingPoint::new(mapped + offset, mapped)
            })
            .collect()
    }

    #[test]
    fn control_points_interpolated() {
        let rbf = RbfTransform::new(corners(Vector2::new(3.0, -2.0)), TransformInfo::default())
            .unwrap();

        for p in rbf.points().to_vec() {
            let out = rbf.transform(&p.mapped).unwrap();
            assert_relative_eq!(out.x, p.control.x, epsilon = 1e-6);
            assert_relative_eq!(out.y, p.control.y, epsilon = 1e-6);

            let back = rbf.inverse_transform(&p.control).unwrap();
            assert_relative_eq!(back.x, p.mapped.x, epsilon = 1e-6);
            assert_relative_eq!(back.y, p.mapped.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn pure_translation_extrapolates() {
        // A translation is affine; the spline reproduces it everywhere,
        // not just near the correspondences.
        let rbf = RbfTransform::new(corners(Vector2::new(7.0, 11.0)), TransformInfo::default())
            .unwrap();

        let far = Point2::new(500.0, -300.0);
        let out = rbf.transform(&far).unwrap();
        assert_relative_eq!(out.x, 507.0, epsilon = 1e-3);
        assert_relative_eq!(out.y, -289.0, epsilon = 1e-3);
    }

    #[test]
    fn defined_arbitrarily_far_out() {
        let rbf = RbfTransform::new(corners(Vector2::zeros()), TransformInfo::default()).unwrap();

        let far = Point2::new(1e6, -1e6);
        assert!(rbf.can_transform(&far));
        assert!(rbf.can_inverse_transform(&far));

        let out = rbf.transform(&far).unwrap();
        assert!(out.x.is_finite() && out.y.is_finite());
    }

    #[test]
    fn warped_field_roundtrip_near_points() {
        // A mild non-affine warp: the two directions are independent
        // solves, so the roundtrip is approximate near the data.
        let points = vec![
            MappingPoint::new(Point2::new(0.0, 0.0), Point2::new(0.0, 0.0)),
            MappingPoint::new(Point2::new(10.5, 0.0), Point2::new(10.0, 0.0)),
            MappingPoint::new(Point2::new(0.0, 9.5), Point2::new(0.0, 10.0)),
            MappingPoint::new(Point2::new(10.0, 10.0), Point2::new(10.0, 10.0)),
            MappingPoint::new(Point2::new(5.2, 4.8), Point2::new(5.0, 5.0)),
        ];
        let rbf = RbfTransform::new(points, TransformInfo::default()).unwrap();

        let p = Point2::new(4.0, 6.0);
        let there = rbf.transform(&p).unwrap();
        let back = rbf.inverse_transform(&there).unwrap();
        assert_relative_eq!(back.x, p.x, epsilon = 0.1);
        assert_relative_eq!(back.y, p.y, epsilon = 0.1);
    }

    #[test]
    fn batch_matches_scalar() {
        let rbf = RbfTransform::new(corners(Vector2::new(1.0, 2.0)), TransformInfo::default())
            .unwrap();

        let queries: Vec<Point2<f64>> = (0..100)
            .map(|i| Point2::new(f64::from(i) * 0.3, f64::from(i) * -0.2))
            .collect();

        let batch = rbf.transform_points(&queries).unwrap();
        for (q, b) in queries.iter().zip(&batch) {
            let scalar = rbf.transform(q).unwrap();
            assert_relative_eq!(scalar.x, b.x, epsilon = 1e-12);
            assert_relative_eq!(scalar.y, b.y, epsilon = 1e-12);
        }
    }

    #[test]
    fn too_few_points_rejected() {
        let points = vec![
            MappingPoint::new(Point2::new(0.0, 0.0), Point2::new(0.0, 0.0)),
            MappingPoint::new(Point2::new(1.0, 0.0), Point2::new(1.0, 0.0)),
        ];
        assert!(matches!(
            RbfTransform::new(points, TransformInfo::default()),
            Err(TransformError::InsufficientPoints { .. })
        ));
    }

    #[test]
    fn minimize_memory_resolves_again() {
        let mut rbf =
            RbfTransform::new(corners(Vector2::new(1.0, 1.0)), TransformInfo::default()).unwrap();

        let p = Point2::new(3.0, 3.0);
        let before = rbf.transform(&p).unwrap();
        rbf.minimize_memory();
        let after = rbf.transform(&p).unwrap();

        assert_relative_eq!(before.x, after.x, epsilon = 1e-12);
        assert_relative_eq!(before.y, after.y, epsilon = 1e-12);
    }
}
