//! Uniform-cell bounding-rectangle index.

use std::collections::HashMap;

use nalgebra::Point2;
use warp_types::GridRect;

/// Fallback cell size when items carry no usable extent.
const MIN_CELL_SIZE: f64 = 1.0;

/// A bounding-rectangle index over arbitrary items.
///
/// Items are registered with an axis-aligned rectangle and bucketed into a
/// uniform cell grid; a query visits only the cells its rectangle covers
/// and then filters candidates by exact rectangle overlap.
///
/// The index is built once and read from many threads; queries take
/// `&self` and allocate only their result vector.
///
/// # Example
///
/// ```
/// use warp_spatial::RectIndex;
/// use warp_types::{GridRect, Point2};
///
/// let index = RectIndex::from_items(
///     [
///         (GridRect::from_edges(0.0, 0.0, 1.0, 1.0), 0usize),
///         (GridRect::from_edges(4.0, 4.0, 5.0, 5.0), 1usize),
///     ]
///     .into_iter(),
/// );
///
/// assert_eq!(index.query_point(&Point2::new(0.5, 0.5)), vec![&0]);
/// ```
#[derive(Debug, Clone)]
pub struct RectIndex<T> {
    cell_size: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
    slots: Vec<Option<(GridRect, T)>>,
    len: usize,
}

impl<T> RectIndex<T> {
    /// Create an empty index with an explicit cell size.
    ///
    /// Non-finite or non-positive sizes are clamped to a usable minimum.
    #[must_use]
    pub fn with_cell_size(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            MIN_CELL_SIZE
        };
        Self {
            cell_size,
            cells: HashMap::new(),
            slots: Vec::new(),
            len: 0,
        }
    }

    /// Build an index from rectangles and items.
    ///
    /// The cell size is derived from the average item extent so a typical
    /// item covers a handful of cells.
    #[must_use]
    pub fn from_items(items: impl Iterator<Item = (GridRect, T)>) -> Self {
        let collected: Vec<(GridRect, T)> = items.collect();

        let mut extent_sum = 0.0;
        for (rect, _) in &collected {
            extent_sum += rect.width().max(rect.height());
        }
        #[allow(clippy::cast_precision_loss)]
        let mean_extent = if collected.is_empty() {
            0.0
        } else {
            extent_sum / collected.len() as f64
        };

        let cell_size = if mean_extent > 0.0 {
            mean_extent * 2.0
        } else {
            MIN_CELL_SIZE
        };

        let mut index = Self::with_cell_size(cell_size);
        for (rect, item) in collected {
            index.insert(rect, item);
        }
        index
    }

    /// Number of items in the index.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no items.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Register an item under a bounding rectangle.
    pub fn insert(&mut self, rect: GridRect, item: T) {
        let slot = self.slots.len();
        for cell in self.covered_cells(&rect) {
            self.cells.entry(cell).or_default().push(slot);
        }
        self.slots.push(Some((rect, item)));
        self.len += 1;
    }

    /// All items whose rectangle intersects the query rectangle.
    #[must_use]
    pub fn query(&self, rect: &GridRect) -> Vec<&T> {
        let mut seen = vec![false; self.slots.len()];
        let mut found = Vec::new();

        for cell in self.covered_cells(rect) {
            let Some(slots) = self.cells.get(&cell) else {
                continue;
            };
            for &slot in slots {
                if seen[slot] {
                    continue;
                }
                seen[slot] = true;
                if let Some((item_rect, item)) = &self.slots[slot] {
                    if item_rect.intersects(rect) {
                        found.push(item);
                    }
                }
            }
        }

        found
    }

    /// All items whose rectangle contains the query point.
    #[must_use]
    pub fn query_point(&self, point: &Point2<f64>) -> Vec<&T> {
        self.query(&GridRect::from_point(*point))
    }

    /// Remove one item registered under `rect` that compares equal to
    /// `item`. Returns the removed item, or `None` if absent.
    pub fn remove(&mut self, rect: &GridRect, item: &T) -> Option<T>
    where
        T: PartialEq,
    {
        let mut target = None;
        for cell in self.covered_cells(rect) {
            let Some(slots) = self.cells.get(&cell) else {
                continue;
            };
            for &slot in slots {
                if let Some((_, existing)) = &self.slots[slot] {
                    if existing == item {
                        target = Some(slot);
                        break;
                    }
                }
            }
            if target.is_some() {
                break;
            }
        }

        let slot = target?;
        let (removed_rect, removed) = self.slots[slot].take()?;
        for cell in self.covered_cells(&removed_rect) {
            if let Some(slots) = self.cells.get_mut(&cell) {
                slots.retain(|&s| s != slot);
            }
        }
        self.len -= 1;
        Some(removed)
    }

    fn covered_cells(&self, rect: &GridRect) -> impl Iterator<Item = (i64, i64)> {
        let (x0, y0) = self.cell_of(rect.min.x, rect.min.y);
        let (x1, y1) = self.cell_of(rect.max.x, rect.max.y);
        (x0..=x1).flat_map(move |x| (y0..=y1).map(move |y| (x, y)))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn cell_of(&self, x: f64, y: f64) -> (i64, i64) {
        (
            (x / self.cell_size).floor() as i64,
            (y / self.cell_size).floor() as i64,
        )
    }
}
