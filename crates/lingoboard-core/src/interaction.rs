//! Drag and resize of a single block with snap-to-alignment.
//!
//! The coordinator tracks at most one active interaction. Live geometry is kept
//! separately from the committed block geometry until the pointer is released,
//! at which point a [`Commit`] is handed back to the board owner.

use crate::block::{Block, BlockId, MIN_BLOCK_HEIGHT, MIN_BLOCK_WIDTH};
use crate::snap::{MovingEdges, SnapConfig, SnapLine, SnapTargetKind, compute_snap, snap_edges};
use crate::spatial::SpatialIndex;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Resize handle hit tolerance in screen pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 8.0;

/// Resize handle on a block's border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResizeHandle {
    Top,
    Right,
    Bottom,
    Left,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeHandle {
    /// Edges that follow the pointer for this handle.
    pub fn moving_edges(self) -> MovingEdges {
        use SnapTargetKind::{Max, Min};
        let (x, y) = match self {
            ResizeHandle::Top => (None, Some(Min)),
            ResizeHandle::Right => (Some(Max), None),
            ResizeHandle::Bottom => (None, Some(Max)),
            ResizeHandle::Left => (Some(Min), None),
            ResizeHandle::TopLeft => (Some(Min), Some(Min)),
            ResizeHandle::TopRight => (Some(Max), Some(Min)),
            ResizeHandle::BottomLeft => (Some(Min), Some(Max)),
            ResizeHandle::BottomRight => (Some(Max), Some(Max)),
        };
        MovingEdges { x, y }
    }

    /// Resize `original` by a pointer delta, keeping the opposite edges fixed.
    pub fn apply(self, original: Rect, delta: Vec2) -> Rect {
        let edges = self.moving_edges();
        let mut rect = original;
        match edges.x {
            Some(SnapTargetKind::Min) => rect.x0 += delta.x,
            Some(_) => rect.x1 += delta.x,
            None => {}
        }
        match edges.y {
            Some(SnapTargetKind::Min) => rect.y0 += delta.y,
            Some(_) => rect.y1 += delta.y,
            None => {}
        }
        enforce_min_size(rect, edges)
    }
}

/// Push the moving edges back out until the rectangle meets the minimum size.
fn enforce_min_size(mut rect: Rect, edges: MovingEdges) -> Rect {
    match edges.x {
        Some(SnapTargetKind::Min) => rect.x0 = rect.x0.min(rect.x1 - MIN_BLOCK_WIDTH),
        _ => rect.x1 = rect.x1.max(rect.x0 + MIN_BLOCK_WIDTH),
    }
    match edges.y {
        Some(SnapTargetKind::Min) => rect.y0 = rect.y0.min(rect.y1 - MIN_BLOCK_HEIGHT),
        _ => rect.y1 = rect.y1.max(rect.y0 + MIN_BLOCK_HEIGHT),
    }
    rect
}

/// Find which resize handle (if any) is under `point`.
///
/// `tolerance` is in world units; callers divide the screen tolerance by the
/// camera scale. Corners win over edges.
pub fn hit_test_handle(bounds: Rect, point: Point, tolerance: f64) -> Option<ResizeHandle> {
    if !bounds.inflate(tolerance, tolerance).contains(point) {
        return None;
    }
    let left = (point.x - bounds.x0).abs() <= tolerance;
    let right = (point.x - bounds.x1).abs() <= tolerance;
    let top = (point.y - bounds.y0).abs() <= tolerance;
    let bottom = (point.y - bounds.y1).abs() <= tolerance;

    match (left, right, top, bottom) {
        (true, _, true, _) => Some(ResizeHandle::TopLeft),
        (_, true, true, _) => Some(ResizeHandle::TopRight),
        (true, _, _, true) => Some(ResizeHandle::BottomLeft),
        (_, true, _, true) => Some(ResizeHandle::BottomRight),
        (true, _, _, _) => Some(ResizeHandle::Left),
        (_, true, _, _) => Some(ResizeHandle::Right),
        (_, _, true, _) => Some(ResizeHandle::Top),
        (_, _, _, true) => Some(ResizeHandle::Bottom),
        _ => None,
    }
}

/// What the pointer is doing to the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionKind {
    Drag,
    Resize(ResizeHandle),
}

/// State of the active drag/resize.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveInteraction {
    pub block_id: BlockId,
    pub kind: InteractionKind,
    /// Pointer position (world) when the interaction began.
    pub start_pointer: Point,
    /// Latest pointer position (world).
    pub current_pointer: Point,
    /// Committed geometry at the start.
    pub original: Rect,
    /// Live (possibly snapped) geometry.
    pub current: Rect,
}

impl ActiveInteraction {
    /// Get the drag delta.
    pub fn delta(&self) -> Vec2 {
        self.current_pointer - self.start_pointer
    }

    /// Raw geometry for the current pointer, before snapping.
    pub fn candidate(&self) -> Rect {
        match self.kind {
            InteractionKind::Drag => self.original + self.delta(),
            InteractionKind::Resize(handle) => handle.apply(self.original, self.delta()),
        }
    }
}

/// Final geometry to write back to the block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Commit {
    pub block_id: BlockId,
    pub kind: InteractionKind,
    pub rect: Rect,
}

/// Per-block drag/resize handling with a cached spatial index.
#[derive(Debug, Clone, Default)]
pub struct InteractionCoordinator {
    active: Option<ActiveInteraction>,
    /// Snapshot of the other blocks, built when the interaction starts.
    index: Option<SpatialIndex>,
    guides: Vec<SnapLine>,
    config: SnapConfig,
}

impl InteractionCoordinator {
    pub fn new(config: SnapConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    pub fn set_snapping(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    pub fn active(&self) -> Option<&ActiveInteraction> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Guide lines to render for the current interaction.
    pub fn guides(&self) -> &[SnapLine] {
        &self.guides
    }

    /// Live geometry of `id` if it is being manipulated.
    pub fn live_rect(&self, id: BlockId) -> Option<Rect> {
        self.active
            .as_ref()
            .filter(|a| a.block_id == id)
            .map(|a| a.current)
    }

    /// Start dragging or resizing `block_id`.
    ///
    /// Any interaction already in progress is replaced. Returns `false` if the
    /// block is not in `blocks`.
    pub fn begin(&mut self, blocks: &[Block], block_id: BlockId, kind: InteractionKind, pointer: Point) -> bool {
        self.reset();

        let Some(block) = blocks.iter().find(|b| b.id == block_id) else {
            debug_assert!(false, "interaction on unknown block {block_id}");
            log::warn!("Ignoring interaction on unknown block {}", block_id);
            return false;
        };

        let original = block.bounds();
        self.index = Some(SpatialIndex::from_blocks(
            blocks,
            Some(block_id),
            self.config.bin_size,
            self.config.query_padding,
        ));
        self.active = Some(ActiveInteraction {
            block_id,
            kind,
            start_pointer: pointer,
            current_pointer: pointer,
            original,
            current: original,
        });
        log::debug!("Begin {:?} on block {}", kind, block_id);
        true
    }

    /// Move the pointer. Returns the new live geometry.
    pub fn update(&mut self, pointer: Point) -> Option<Rect> {
        let mut active = self.active.take()?;
        active.current_pointer = pointer;
        let (rect, guides) = self.resolve(&active);
        active.current = rect;
        self.guides = guides;
        self.active = Some(active);
        Some(rect)
    }

    /// Release the pointer and produce the authoritative geometry.
    ///
    /// Snapping is recomputed from the raw candidate at `pointer` (or the last
    /// seen pointer) rather than trusting the live value.
    pub fn end(&mut self, pointer: Option<Point>) -> Option<Commit> {
        let mut active = self.active.take()?;
        if let Some(pointer) = pointer {
            active.current_pointer = pointer;
        }
        let (rect, _) = self.resolve(&active);
        self.reset();
        log::debug!("Commit {:?} on block {} -> {:?}", active.kind, active.block_id, rect);
        Some(Commit {
            block_id: active.block_id,
            kind: active.kind,
            rect,
        })
    }

    /// Abort the interaction without committing. Returns the affected block.
    pub fn cancel(&mut self) -> Option<BlockId> {
        let id = self.active.as_ref().map(|a| a.block_id);
        self.reset();
        id
    }

    /// Rebuild the snap index after the block set changed mid-interaction.
    ///
    /// The live geometry is re-resolved against the new index. Returns it, or
    /// `None` when idle.
    pub fn refresh_index(&mut self, blocks: &[Block]) -> Option<Rect> {
        let active = self.active.as_ref()?;
        let (block_id, pointer) = (active.block_id, active.current_pointer);
        self.index = Some(SpatialIndex::from_blocks(
            blocks,
            Some(block_id),
            self.config.bin_size,
            self.config.query_padding,
        ));
        self.update(pointer)
    }

    fn reset(&mut self) {
        self.active = None;
        self.index = None;
        self.guides.clear();
    }

    /// Snap the candidate geometry of `active` against the cached index.
    fn resolve(&self, active: &ActiveInteraction) -> (Rect, Vec<SnapLine>) {
        let candidate = active.candidate();
        let Some(index) = self.index.as_ref().filter(|_| self.config.enabled) else {
            return (candidate, Vec::new());
        };

        let others: Vec<Rect> = index
            .query(candidate, Some(active.block_id))
            .into_iter()
            .map(|hit| hit.rect)
            .collect();

        match active.kind {
            InteractionKind::Drag => {
                let outcome = compute_snap(candidate, &others, self.config.threshold, self.config.overshoot);
                (outcome.apply(candidate), outcome.guides)
            }
            InteractionKind::Resize(handle) => {
                let edges = handle.moving_edges();
                let outcome = snap_edges(candidate, edges, &others, self.config.threshold, self.config.overshoot);
                (enforce_min_size(outcome.rect, edges), outcome.guides)
            }
        }
    }
}
