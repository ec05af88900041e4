//! Control/mapped point correspondences.

use std::cmp::Ordering;

use nalgebra::{Point2, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Distance below which two coordinates are considered the same point.
///
/// Registration tools emit coordinates rounded to a handful of decimal
/// digits, so equality tests throughout the engine are epsilon based.
pub const EPSILON: f64 = 1e-5;

/// Squared form of [`EPSILON`] for squared-distance comparisons.
pub const EPSILON_SQUARED: f64 = EPSILON * EPSILON;

/// One known correspondence between mapped space and control space.
///
/// A transform is defined by an array of these pairs. Within one array no
/// two entries may share a control point and no two may share a mapped
/// point; a duplicate in either space breaks the Delaunay triangulation
/// the discrete transforms are built on.
///
/// # Example
///
/// ```
/// use warp_types::{MappingPoint, Point2};
///
/// let p = MappingPoint::new(Point2::new(10.0, 0.0), Point2::new(1.0, 0.0));
/// assert_eq!(p.control.x, 10.0);
/// assert_eq!(p.mapped.x, 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MappingPoint {
    /// Position in control space (the space points are mapped into).
    pub control: Point2<f64>,
    /// Position in mapped space (the space points are mapped from).
    pub mapped: Point2<f64>,
}

impl MappingPoint {
    /// Create a correspondence from a control point and a mapped point.
    #[inline]
    #[must_use]
    pub const fn new(control: Point2<f64>, mapped: Point2<f64>) -> Self {
        Self { control, mapped }
    }

    /// The control-space coordinate.
    #[inline]
    #[must_use]
    pub const fn control(&self) -> &Point2<f64> {
        &self.control
    }

    /// The mapped-space coordinate.
    #[inline]
    #[must_use]
    pub const fn mapped(&self) -> &Point2<f64> {
        &self.mapped
    }

    /// This correspondence with the control point shifted by `vector`.
    #[inline]
    #[must_use]
    pub fn translated(&self, vector: Vector2<f64>) -> Self {
        Self {
            control: self.control + vector,
            mapped: self.mapped,
        }
    }

    /// Total order by mapped x, then mapped y.
    ///
    /// Grid transforms rely on this order: sorting a uniform lattice by its
    /// mapped coordinate yields column-major storage, which the O(1) cell
    /// lookup indexes directly.
    #[must_use]
    pub fn cmp_by_mapped(&self, other: &Self) -> Ordering {
        self.mapped
            .x
            .total_cmp(&other.mapped.x)
            .then_with(|| self.mapped.y.total_cmp(&other.mapped.y))
    }

    /// Total order by control x, then control y.
    #[must_use]
    pub fn cmp_by_control(&self, other: &Self) -> Ordering {
        self.control
            .x
            .total_cmp(&other.control.x)
            .then_with(|| self.control.y.total_cmp(&other.control.y))
    }

    /// Project the control coordinates of a point slice.
    #[must_use]
    pub fn control_points(points: &[Self]) -> Vec<Point2<f64>> {
        points.iter().map(|p| p.control).collect()
    }

    /// Project the mapped coordinates of a point slice.
    #[must_use]
    pub fn mapped_points(points: &[Self]) -> Vec<Point2<f64>> {
        points.iter().map(|p| p.mapped).collect()
    }
}

/// Find a pair of entries closer than [`EPSILON`] in control space.
///
/// Returns the indices of the first offending pair, or `None` if all
/// control points are distinct. The scan sorts by control x and only
/// compares while the x distance stays within epsilon, so it is
/// `O(n log n)` rather than quadratic.
#[must_use]
pub fn control_duplicate(points: &[MappingPoint]) -> Option<(usize, usize)> {
    duplicate_by(points, |p| p.control)
}

/// Find a pair of entries closer than [`EPSILON`] in mapped space.
#[must_use]
pub fn mapped_duplicate(points: &[MappingPoint]) -> Option<(usize, usize)> {
    duplicate_by(points, |p| p.mapped)
}

fn duplicate_by(
    points: &[MappingPoint],
    coord: impl Fn(&MappingPoint) -> Point2<f64>,
) -> Option<(usize, usize)> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| {
        let pa = coord(&points[a]);
        let pb = coord(&points[b]);
        pa.x.total_cmp(&pb.x).then_with(|| pa.y.total_cmp(&pb.y))
    });

    for (rank, &i) in order.iter().enumerate() {
        let pi = coord(&points[i]);
        for &j in order.iter().skip(rank + 1) {
            let pj = coord(&points[j]);
            if pj.x - pi.x > EPSILON {
                break;
            }
            if (pj - pi).norm_squared() <= EPSILON_SQUARED {
                return Some((i.min(j), i.max(j)));
            }
        }
    }

    None
}

/// Remove entries that duplicate an earlier entry's control coordinate.
///
/// Keeps the first of each coinciding group. Returns the number of entries
/// removed. The list is left sorted by control coordinate.
pub fn dedup_control_space(points: &mut Vec<MappingPoint>) -> usize {
    dedup_by(points, MappingPoint::cmp_by_control, |p| p.control)
}

/// Remove entries that duplicate an earlier entry's mapped coordinate.
///
/// Keeps the first of each coinciding group. Returns the number of entries
/// removed. The list is left sorted by mapped coordinate.
pub fn dedup_mapped_space(points: &mut Vec<MappingPoint>) -> usize {
    dedup_by(points, MappingPoint::cmp_by_mapped, |p| p.mapped)
}

fn dedup_by(
    points: &mut Vec<MappingPoint>,
    order: impl Fn(&MappingPoint, &MappingPoint) -> std::cmp::Ordering,
    coord: impl Fn(&MappingPoint) -> Point2<f64>,
) -> usize {
    let before = points.len();
    points.sort_by(order);

    let mut kept = 0usize;
    for i in 0..points.len() {
        let p = coord(&points[i]);

        // Sorted by x, so only the tail of the kept list within epsilon in
        // x can collide.
        let mut duplicate = false;
        for j in (0..kept).rev() {
            let q = coord(&points[j]);
            if p.x - q.x > EPSILON {
                break;
            }
            if (p - q).norm_squared() <= EPSILON_SQUARED {
                duplicate = true;
                break;
            }
        }

        if !duplicate {
            points[kept] = points[i];
            kept += 1;
        }
    }

    points.truncate(kept);
    before - kept
}
