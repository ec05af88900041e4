//! Cell grid over two-space edge pairs.

use std::collections::HashMap;

use warp_types::{GridRect, Segment, SegmentPair};

/// Fallback cell size for degenerate inputs.
const MIN_CELL_SIZE: f64 = 1.0;

/// A uniform cell grid indexing edges that exist in both spaces.
///
/// Each [`SegmentPair`]'s mapped-space bounding rectangle determines the
/// cells it registers in. A crossing query walks the cells the query
/// segment's rectangle covers plus one ring of neighbors and returns the
/// distinct pairs found there; callers perform the exact intersection
/// tests.
///
/// Built once from a triangulation's edge set; read concurrently.
#[derive(Debug, Clone)]
pub struct SegmentGrid {
    cell_size: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
    pairs: Vec<SegmentPair>,
}

impl SegmentGrid {
    /// Build a grid over a set of edge pairs.
    #[must_use]
    pub fn new(pairs: Vec<SegmentPair>) -> Self {
        let mut length_sum = 0.0;
        for pair in &pairs {
            length_sum += pair.mapped.length();
        }
        #[allow(clippy::cast_precision_loss)]
        let mean_length = if pairs.is_empty() {
            0.0
        } else {
            length_sum / pairs.len() as f64
        };
        let cell_size = if mean_length > 0.0 {
            mean_length * 2.0
        } else {
            MIN_CELL_SIZE
        };

        let mut cells: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (i, pair) in pairs.iter().enumerate() {
            let bounds = pair.mapped.bounds();
            for cell in covered_cells(&bounds, cell_size) {
                cells.entry(cell).or_default().push(i);
            }
        }

        Self {
            cell_size,
            cells,
            pairs,
        }
    }

    /// Number of indexed edge pairs.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the grid holds no edges.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Distinct edge pairs near a query segment.
    ///
    /// Candidates come from every cell the segment's bounding rectangle
    /// covers, expanded by one cell in each direction so edges hugging a
    /// cell border are not missed.
    #[must_use]
    pub fn candidates(&self, segment: &Segment) -> Vec<&SegmentPair> {
        let bounds = segment.bounds().expanded(self.cell_size);
        let mut seen = vec![false; self.pairs.len()];
        let mut found = Vec::new();

        for cell in covered_cells(&bounds, self.cell_size) {
            let Some(indices) = self.cells.get(&cell) else {
                continue;
            };
            for &i in indices {
                if !seen[i] {
                    seen[i] = true;
                    found.push(&self.pairs[i]);
                }
            }
        }

        found
    }
}

#[allow(clippy::cast_possible_truncation)]
fn covered_cells(rect: &GridRect, cell_size: f64) -> impl Iterator<Item = (i64, i64)> {
    let x0 = (rect.min.x / cell_size).floor() as i64;
    let y0 = (rect.min.y / cell_size).floor() as i64;
    let x1 = (rect.max.x / cell_size).floor() as i64;
    let y1 = (rect.max.y / cell_size).floor() as i64;
    (x0..=x1).flat_map(move |x| (y0..=y1).map(move |y| (x, y)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    fn pair(ax: f64, ay: f64, bx: f64, by: f64) -> SegmentPair {
        let mapped = Segment::new(Point2::new(ax, ay), Point2::new(bx, by));
        // Control image shifted; irrelevant to the lookup under test.
        let control = Segment::new(
            Point2::new(ax + 100.0, ay),
            Point2::new(bx + 100.0, by),
        );
        SegmentPair::new(mapped, control)
    }

    #[test]
    fn candidates_near_query_segment() {
        let grid = SegmentGrid::new(vec![
            pair(0.0, 0.0, 1.0, 0.0),
            pair(1.0, 0.0, 1.0, 1.0),
            pair(50.0, 50.0, 51.0, 50.0),
        ]);

        let query = Segment::new(Point2::new(0.5, -1.0), Point2::new(0.5, 2.0));
        let found = grid.candidates(&query);

        assert!(found.len() >= 2);
        assert!(found.iter().all(|p| p.mapped.a.x < 10.0));
    }

    #[test]
    fn far_query_finds_nothing() {
        let grid = SegmentGrid::new(vec![pair(0.0, 0.0, 1.0, 0.0)]);

        let query = Segment::new(Point2::new(100.0, 100.0), Point2::new(101.0, 101.0));
        assert!(grid.candidates(&query).is_empty());
    }

    #[test]
    fn each_pair_reported_once() {
        let grid = SegmentGrid::new(vec![pair(0.0, 0.0, 10.0, 0.0)]);

        let query = Segment::new(Point2::new(5.0, -1.0), Point2::new(5.0, 1.0));
        assert_eq!(grid.candidates(&query).len(), 1);
    }

    #[test]
    fn empty_grid() {
        let grid = SegmentGrid::new(Vec::new());
        assert!(grid.is_empty());
        let query = Segment::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        assert!(grid.candidates(&query).is_empty());
    }
}
