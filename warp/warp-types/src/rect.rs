//! 2D axis-aligned bounding rectangle.

use nalgebra::{Point2, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::segment::Segment;

/// A 2D axis-aligned rectangle defined by minimum and maximum corners.
///
/// Used for transform bounds in both control and mapped space, and as the
/// query shape for every spatial index in the workspace.
///
/// # Example
///
/// ```
/// use warp_types::{GridRect, Point2};
///
/// let rect = GridRect::new(Point2::new(0.0, 0.0), Point2::new(10.0, 5.0));
///
/// assert_eq!(rect.width(), 10.0);
/// assert!(rect.contains(&Point2::new(5.0, 2.5)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridRect {
    /// Minimum corner (smallest x and y).
    pub min: Point2<f64>,
    /// Maximum corner (largest x and y).
    pub max: Point2<f64>,
}

impl GridRect {
    /// Create a rectangle from two corners.
    ///
    /// The corners are swapped per axis if min > max.
    #[must_use]
    pub fn new(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self {
            min: Point2::new(min.x.min(max.x), min.y.min(max.y)),
            max: Point2::new(min.x.max(max.x), min.y.max(max.y)),
        }
    }

    /// Create a rectangle from edge coordinates.
    #[must_use]
    pub fn from_edges(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self::new(Point2::new(left, bottom), Point2::new(right, top))
    }

    /// Create an empty (inverted) rectangle.
    ///
    /// An empty rectangle has min > max and is useful as the identity for
    /// [`GridRect::expand_to_include`].
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Point2::new(f64::INFINITY, f64::INFINITY),
            max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Create the tightest rectangle containing all points.
    ///
    /// Returns an empty rectangle if the iterator is empty.
    #[must_use]
    pub fn from_points<'a>(points: impl Iterator<Item = &'a Point2<f64>>) -> Self {
        let mut rect = Self::empty();
        for point in points {
            rect.expand_to_include(point);
        }
        rect
    }

    /// Create a degenerate rectangle covering a single point.
    #[inline]
    #[must_use]
    pub const fn from_point(point: Point2<f64>) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Check whether the rectangle is empty (min > max on either axis).
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// Width of the rectangle. Zero or negative means empty.
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height of the rectangle.
    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Left edge x coordinate.
    #[inline]
    #[must_use]
    pub fn left(&self) -> f64 {
        self.min.x
    }

    /// Right edge x coordinate.
    #[inline]
    #[must_use]
    pub fn right(&self) -> f64 {
        self.max.x
    }

    /// Bottom edge y coordinate.
    #[inline]
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.min.y
    }

    /// Top edge y coordinate.
    #[inline]
    #[must_use]
    pub fn top(&self) -> f64 {
        self.max.y
    }

    /// Center of the rectangle.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
        )
    }

    /// Check if the rectangle contains a point. Boundary points count.
    #[inline]
    #[must_use]
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Check containment with the rectangle grown by `epsilon` on every side.
    #[inline]
    #[must_use]
    pub fn contains_with_epsilon(&self, point: &Point2<f64>, epsilon: f64) -> bool {
        point.x >= self.min.x - epsilon
            && point.x <= self.max.x + epsilon
            && point.y >= self.min.y - epsilon
            && point.y <= self.max.y + epsilon
    }

    /// Check if the rectangle fully contains another rectangle.
    #[inline]
    #[must_use]
    pub fn contains_rect(&self, other: &Self) -> bool {
        self.contains(&other.min) && self.contains(&other.max)
    }

    /// Check if two rectangles intersect. Touching rectangles intersect.
    #[inline]
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// The smallest rectangle containing both rectangles.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self {
            min: Point2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// The rectangle grown by a uniform margin on every side.
    ///
    /// Negative margins shrink it.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min: Point2::new(self.min.x - margin, self.min.y - margin),
            max: Point2::new(self.max.x + margin, self.max.y + margin),
        }
    }

    /// Grow the rectangle in place to include a point.
    pub fn expand_to_include(&mut self, point: &Point2<f64>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    /// Translate the rectangle by a vector.
    #[must_use]
    pub fn translated(&self, vector: Vector2<f64>) -> Self {
        Self {
            min: self.min + vector,
            max: self.max + vector,
        }
    }

    /// The left border as a segment, bottom to top.
    #[must_use]
    pub fn left_edge(&self) -> Segment {
        Segment::new(self.min, Point2::new(self.min.x, self.max.y))
    }

    /// The right border as a segment, bottom to top.
    #[must_use]
    pub fn right_edge(&self) -> Segment {
        Segment::new(Point2::new(self.max.x, self.min.y), self.max)
    }

    /// The bottom border as a segment, left to right.
    #[must_use]
    pub fn bottom_edge(&self) -> Segment {
        Segment::new(self.min, Point2::new(self.max.x, self.min.y))
    }

    /// The top border as a segment, left to right.
    #[must_use]
    pub fn top_edge(&self) -> Segment {
        Segment::new(Point2::new(self.min.x, self.max.y), self.max)
    }
}

impl Default for GridRect {
    fn default() -> Self {
        Self::empty()
    }
}
