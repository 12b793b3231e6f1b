//! Uniform-grid spatial index for proximity queries.
//!
//! Rectangles are binned into fixed-size cells. A query only scans the
//! rectangles sharing a cell with the candidate, so the cost depends on the
//! local density instead of the total block count.

use crate::block::{Block, BlockId};
use kurbo::Rect;
use std::collections::HashMap;

/// Default cell size in world units.
pub const DEFAULT_BIN_SIZE: f64 = 250.0;

/// A rectangle stored in the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedRect {
    pub id: BlockId,
    pub rect: Rect,
}

impl IndexedRect {
    pub fn new(id: BlockId, rect: Rect) -> Self {
        Self { id, rect }
    }
}

impl From<&Block> for IndexedRect {
    fn from(block: &Block) -> Self {
        Self::new(block.id, block.bounds())
    }
}

/// Immutable uniform-grid index. Rebuild it when the block set changes.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    bin_size: f64,
    padding: f64,
    /// Entries in insertion order.
    entries: Vec<IndexedRect>,
    /// Cell -> indices into `entries`, ascending.
    bins: HashMap<(i64, i64), Vec<usize>>,
}

impl SpatialIndex {
    /// Build an index over `rects`.
    ///
    /// Each rectangle is inserted into every cell touched by the rectangle
    /// expanded by `padding`. Rectangles with non-finite coordinates are
    /// skipped.
    pub fn build<I>(rects: I, bin_size: f64, padding: f64) -> Self
    where
        I: IntoIterator<Item = IndexedRect>,
    {
        let bin_size = if bin_size.is_finite() && bin_size > 0.0 {
            bin_size
        } else {
            DEFAULT_BIN_SIZE
        };
        let padding = if padding.is_finite() { padding.max(0.0) } else { 0.0 };

        let mut index = Self {
            bin_size,
            padding,
            entries: Vec::new(),
            bins: HashMap::new(),
        };

        for entry in rects {
            if !rect_is_finite(entry.rect) {
                log::debug!("Skipping non-finite rectangle for block {}", entry.id);
                continue;
            }
            let slot = index.entries.len();
            index.entries.push(entry);
            let (c0, r0, c1, r1) = index.cell_range(entry.rect);
            for row in r0..=r1 {
                for col in c0..=c1 {
                    index.bins.entry((col, row)).or_default().push(slot);
                }
            }
        }

        index
    }

    /// Build an index over blocks, leaving out `exclude`.
    pub fn from_blocks(blocks: &[Block], exclude: Option<BlockId>, bin_size: f64, padding: f64) -> Self {
        Self::build(
            blocks
                .iter()
                .filter(|b| Some(b.id) != exclude)
                .map(IndexedRect::from),
            bin_size,
            padding,
        )
    }

    /// Rectangles sharing a cell with `candidate` (padding-expanded), minus `exclude`.
    ///
    /// Results are de-duplicated and returned in insertion order.
    pub fn query(&self, candidate: Rect, exclude: Option<BlockId>) -> Vec<IndexedRect> {
        if !rect_is_finite(candidate) || self.entries.is_empty() {
            return Vec::new();
        }

        let (c0, r0, c1, r1) = self.cell_range(candidate);
        let mut slots: Vec<usize> = Vec::new();
        for row in r0..=r1 {
            for col in c0..=c1 {
                if let Some(bin) = self.bins.get(&(col, row)) {
                    slots.extend_from_slice(bin);
                }
            }
        }
        slots.sort_unstable();
        slots.dedup();

        slots
            .into_iter()
            .map(|slot| self.entries[slot])
            .filter(|entry| Some(entry.id) != exclude)
            .collect()
    }

    /// Number of indexed rectangles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn bin_size(&self) -> f64 {
        self.bin_size
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }

    /// Inclusive `(col0, row0, col1, row1)` cell range of a padded rectangle.
    fn cell_range(&self, rect: Rect) -> (i64, i64, i64, i64) {
        let rect = rect.abs();
        let cell = |v: f64| (v / self.bin_size).floor() as i64;
        (
            cell(rect.x0 - self.padding),
            cell(rect.y0 - self.padding),
            cell(rect.x1 + self.padding),
            cell(rect.y1 + self.padding),
        )
    }
}

fn rect_is_finite(rect: Rect) -> bool {
    rect.x0.is_finite() && rect.y0.is_finite() && rect.x1.is_finite() && rect.y1.is_finite()
}
