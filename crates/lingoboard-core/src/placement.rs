//! Automatic placement of new blocks.

use crate::block::Block;
use crate::spatial::{DEFAULT_BIN_SIZE, SpatialIndex};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Tunables for the free-slot scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Distance between candidate positions.
    pub grid_step: f64,
    /// Width of the scanned area, starting at x = 0.
    pub extent_width: f64,
    /// Height of the scanned area, starting at y = 0.
    pub extent_height: f64,
    /// Clearance kept around every block.
    pub padding: f64,
    /// Cell size of the spatial index used during the scan.
    pub bin_size: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            grid_step: 50.0,
            extent_width: 3000.0,
            extent_height: 3000.0,
            padding: 50.0,
            bin_size: DEFAULT_BIN_SIZE,
        }
    }
}

impl PlacementConfig {
    /// Position returned when no free slot exists.
    pub fn fallback(&self) -> Point {
        Point::new(self.padding, self.padding)
    }
}

/// Find the first free position for a `width` x `height` block.
///
/// Columns are scanned left to right and each column top to bottom. A
/// candidate is free when its rectangle, grown by `padding` on every side,
/// does not strictly overlap any existing block grown the same way. When the
/// bounded area is full the fallback `(padding, padding)` is returned.
pub fn find_free_position(existing: &[Block], width: f64, height: f64, config: &PlacementConfig) -> Point {
    if existing.is_empty() {
        return Point::ZERO;
    }
    if !(width.is_finite() && height.is_finite()) || !(config.grid_step.is_finite() && config.grid_step > 0.0) {
        log::warn!("Invalid placement request {}x{}, using fallback", width, height);
        return config.fallback();
    }

    let padding = config.padding.max(0.0);
    let index = SpatialIndex::from_blocks(existing, None, config.bin_size, padding);

    let columns = (config.extent_width / config.grid_step).ceil().max(0.0) as usize;
    let rows = (config.extent_height / config.grid_step).ceil().max(0.0) as usize;

    for col in 0..columns {
        let x = col as f64 * config.grid_step;
        for row in 0..rows {
            let y = row as f64 * config.grid_step;
            let candidate = Rect::new(x, y, x + width, y + height).inflate(padding, padding);
            let blocked = index
                .query(candidate, None)
                .iter()
                .any(|other| overlaps(candidate, other.rect.inflate(padding, padding)));
            if !blocked {
                return Point::new(x, y);
            }
        }
    }

    log::debug!("No free slot for {}x{} block, using fallback", width, height);
    config.fallback()
}

/// Strict overlap: rectangles that only touch do not overlap.
pub fn overlaps(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && a.x1 > b.x0 && a.y0 < b.y1 && a.y1 > b.y0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{BlockId, ExerciseType};
    use kurbo::Size;

    /// Blocks bypass the minimum size here so the scan can be checked with small numbers.
    fn raw_block(id: BlockId, x: f64, y: f64, w: f64, h: f64) -> Block {
        let mut block = Block::new(id, ExerciseType::Matching, Point::new(x, y), Size::ZERO);
        block.width = w;
        block.height = h;
        block
    }

    #[test]
    fn test_empty_board_places_at_origin() {
        let pos = find_free_position(&[], 400.0, 300.0, &PlacementConfig::default());
        assert_eq!(pos, Point::ZERO);
    }

    #[test]
    fn test_first_row_blocked_steps_down() {
        let existing = vec![
            raw_block(1, 0.0, 0.0, 100.0, 100.0),
            raw_block(2, 200.0, 0.0, 100.0, 100.0),
        ];
        let pos = find_free_position(&existing, 100.0, 100.0, &PlacementConfig::default());
        assert_eq!(pos, Point::new(0.0, 200.0));
    }

    #[test]
    fn test_result_does_not_overlap() {
        let config = PlacementConfig::default();
        let existing = vec![
            raw_block(1, 0.0, 0.0, 400.0, 300.0),
            raw_block(2, 0.0, 400.0, 400.0, 300.0),
            raw_block(3, 450.0, 120.0, 400.0, 300.0),
            raw_block(4, 60.0, 760.0, 350.0, 150.0),
        ];
        let (w, h) = (400.0, 300.0);
        let pos = find_free_position(&existing, w, h, &config);
        assert_ne!(pos, config.fallback());

        let placed = Rect::new(pos.x, pos.y, pos.x + w, pos.y + h).inflate(config.padding, config.padding);
        for block in &existing {
            let other = block.bounds().inflate(config.padding, config.padding);
            assert!(!overlaps(placed, other), "overlaps block {}", block.id);
        }
    }

    #[test]
    fn test_deterministic() {
        let config = PlacementConfig::default();
        let existing = vec![
            raw_block(1, 0.0, 0.0, 500.0, 500.0),
            raw_block(2, 700.0, 50.0, 300.0, 900.0),
        ];
        let a = find_free_position(&existing, 350.0, 150.0, &config);
        let b = find_free_position(&existing, 350.0, 150.0, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_full_canvas_falls_back() {
        let config = PlacementConfig {
            extent_width: 500.0,
            extent_height: 500.0,
            ..PlacementConfig::default()
        };
        let existing = vec![raw_block(1, 0.0, 0.0, 1000.0, 1000.0)];
        let pos = find_free_position(&existing, 100.0, 100.0, &config);
        assert_eq!(pos, Point::new(50.0, 50.0));
    }

    #[test]
    fn test_invalid_size_falls_back() {
        let existing = vec![raw_block(1, 0.0, 0.0, 100.0, 100.0)];
        let pos = find_free_position(&existing, f64::NAN, 100.0, &PlacementConfig::default());
        assert_eq!(pos, Point::new(50.0, 50.0));
    }

    #[test]
    fn test_touching_is_not_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 20.0, 10.0);
        assert!(!overlaps(a, b));
        assert!(overlaps(a, Rect::new(9.0, 9.0, 12.0, 12.0)));
    }
}
