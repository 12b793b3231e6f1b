//! The whiteboard: board document, viewport and interactions behind one owner.
//!
//! Hosts feed pointer, wheel, keyboard and frame callbacks in arrival order.
//! The board document is only changed through explicit commits here; renderers
//! read [`Whiteboard::snapshot`] for committed geometry and
//! [`Whiteboard::live_rect`] for the block under manipulation.

use crate::activity::{ActivityEvent, ActivityLogger, LogActivityLogger, RateLimiter, StreamKind};
use crate::block::{Block, BlockId, DEFAULT_BLOCK_SIZE, ExerciseParams, ExerciseType, clamp_size};
use crate::board::BoardDocument;
use crate::camera::Camera;
use crate::config::BoardConfig;
use crate::content::{ContentError, ContentProvider, ContentStore, GeneratedContent, GenerationRequest};
use crate::input::{InputState, Key, Modifiers, MouseButton, PointerEvent};
use crate::interaction::{Commit, InteractionCoordinator, InteractionKind, ResizeHandle, hit_test_handle};
use crate::placement::{find_free_position, overlaps};
use crate::registry::ExerciseRegistry;
use crate::snap::SnapLine;
use crate::viewport::ViewportController;
use kurbo::{Point, Rect, Size, Vec2};
use serde_json::json;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

const ACTIVITY_CATEGORY: &str = "whiteboard";

/// What a pointer press landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Block(BlockId),
    Handle(BlockId, ResizeHandle),
    Canvas,
}

/// Interactive whiteboard state.
pub struct Whiteboard {
    document: BoardDocument,
    viewport: ViewportController,
    interactions: InteractionCoordinator,
    input: InputState,
    content: ContentStore,
    registry: ExerciseRegistry,
    logger: Arc<dyn ActivityLogger>,
    zoom_log: RateLimiter,
    config: BoardConfig,
    focused: Option<BlockId>,
    /// Last size reported by the host.
    viewport_size: Option<Size>,
    /// Blocks whose committed or live geometry changed since the last `take_dirty`.
    dirty: BTreeSet<BlockId>,
    /// Bumped on every committed document change.
    revision: u64,
}

impl std::fmt::Debug for Whiteboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Whiteboard")
            .field("blocks", &self.document.len())
            .field("camera", self.viewport.camera())
            .field("focused", &self.focused)
            .field("revision", &self.revision)
            .finish()
    }
}

impl Default for Whiteboard {
    fn default() -> Self {
        Self::new(BoardConfig::default(), Arc::new(LogActivityLogger))
    }
}

impl Whiteboard {
    /// Create a whiteboard with an empty board.
    pub fn new(config: BoardConfig, logger: Arc<dyn ActivityLogger>) -> Self {
        Self::with_document(BoardDocument::new(), config, logger)
    }

    /// Create a whiteboard over an existing board.
    pub fn with_document(document: BoardDocument, config: BoardConfig, logger: Arc<dyn ActivityLogger>) -> Self {
        let dirty = document.blocks.iter().map(|b| b.id).collect();
        Self {
            document,
            viewport: ViewportController::new(config.viewport),
            interactions: InteractionCoordinator::new(config.snap),
            input: InputState::new(),
            content: ContentStore::new(),
            registry: ExerciseRegistry::with_defaults(),
            logger,
            zoom_log: RateLimiter::new(config.activity.zoom_log_interval_ms),
            config,
            focused: None,
            viewport_size: None,
            dirty,
            revision: 0,
        }
    }

    /// Replace the exercise registry.
    pub fn with_registry(mut self, registry: ExerciseRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn document(&self) -> &BoardDocument {
        &self.document
    }

    /// Committed blocks. Live drag/resize geometry is not included.
    pub fn snapshot(&self) -> &[Block] {
        &self.document.blocks
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn camera(&self) -> &Camera {
        self.viewport.camera()
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn registry(&self) -> &ExerciseRegistry {
        &self.registry
    }

    pub fn content(&self, id: BlockId) -> Option<&GeneratedContent> {
        self.content.get(id)
    }

    pub fn focused(&self) -> Option<BlockId> {
        self.focused
    }

    /// Counter bumped on every committed change; hosts schedule saves on change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether the host should keep requesting animation frames.
    pub fn needs_frame(&self) -> bool {
        self.viewport.has_momentum()
    }

    pub fn is_interacting(&self) -> bool {
        self.interactions.is_active()
    }

    pub fn set_snapping(&mut self, enabled: bool) {
        self.interactions.set_snapping(enabled);
    }

    /// Live geometry of a block being dragged or resized.
    pub fn live_rect(&self, id: BlockId) -> Option<Rect> {
        self.interactions.live_rect(id)
    }

    /// Geometry to draw: live if under manipulation, committed otherwise.
    pub fn display_rect(&self, id: BlockId) -> Option<Rect> {
        self.live_rect(id).or_else(|| self.document.get(id).map(Block::bounds))
    }

    /// Alignment guides for the current interaction.
    pub fn guides(&self) -> &[SnapLine] {
        self.interactions.guides()
    }

    /// Ids needing a re-render since the last call.
    pub fn take_dirty(&mut self) -> Vec<BlockId> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }

    fn committed(&mut self, id: BlockId) {
        self.dirty.insert(id);
        self.revision += 1;
        // A drag in progress snaps against the current block set.
        if let Some(active) = self.interactions.active().map(|a| a.block_id) {
            if self.interactions.refresh_index(&self.document.blocks).is_some() {
                self.dirty.insert(active);
            }
        }
    }

    fn camera_payload(&self) -> serde_json::Value {
        let camera = self.viewport.camera();
        json!({ "x": camera.pan.x, "y": camera.pan.y, "scale": camera.scale })
    }

    /// Find what lies under a world point, front to back. Handles win over bodies.
    pub fn hit_test(&self, world: Point) -> HitTarget {
        let tolerance = self.config.handle_tolerance_px / self.viewport.camera().scale;
        for block in self.document.blocks_ordered().into_iter().rev() {
            let bounds = block.bounds();
            if let Some(handle) = hit_test_handle(bounds, world, tolerance) {
                return HitTarget::Handle(block.id, handle);
            }
            if block.contains(world) {
                return HitTarget::Block(block.id);
            }
        }
        HitTarget::Canvas
    }

    /// Dispatch a pointer event.
    pub fn handle_pointer_event(&mut self, event: &PointerEvent) -> Option<Commit> {
        match *event {
            PointerEvent::Down {
                position,
                button,
                modifiers,
                time_ms,
            } => {
                self.pointer_down(position, button, modifiers, time_ms);
                None
            }
            PointerEvent::Move { position, time_ms } => {
                self.pointer_move(position, time_ms);
                None
            }
            PointerEvent::Up { position, time_ms, .. } => self.pointer_up(position, time_ms),
            PointerEvent::Wheel {
                position,
                delta,
                time_ms,
            } => {
                self.wheel(position, delta.y, time_ms);
                None
            }
        }
    }

    /// Press: pan the canvas or grab a block.
    ///
    /// Momentum from an earlier fling is always stopped first.
    pub fn pointer_down(&mut self, screen: Point, button: MouseButton, modifiers: Modifiers, time_ms: f64) {
        self.viewport.cancel_momentum();
        self.input.handle_pointer_event(&PointerEvent::Down {
            position: screen,
            button,
            modifiers,
            time_ms,
        });

        if button != MouseButton::Left || modifiers.forces_pan() {
            self.begin_pan(screen, time_ms);
            return;
        }

        let world = self.viewport.screen_to_world(screen);
        let (id, kind) = match self.hit_test(world) {
            HitTarget::Handle(id, handle) => (id, InteractionKind::Resize(handle)),
            HitTarget::Block(id) => (id, InteractionKind::Drag),
            HitTarget::Canvas => {
                self.focus_block(None);
                self.begin_pan(screen, time_ms);
                return;
            }
        };

        self.focus_block(Some(id));
        if self.interactions.begin(&self.document.blocks, id, kind, world) {
            self.dirty.insert(id);
        }
    }

    fn begin_pan(&mut self, screen: Point, time_ms: f64) {
        self.viewport.begin_pan(screen, time_ms);
        self.logger.log_stream(StreamKind::PanStart, &self.camera_payload());
    }

    pub fn pointer_move(&mut self, screen: Point, time_ms: f64) {
        self.input.handle_pointer_event(&PointerEvent::Move { position: screen, time_ms });

        if self.viewport.is_panning() {
            self.viewport.pan_to(screen, time_ms);
        } else if let Some(id) = self.interactions.active().map(|a| a.block_id) {
            let world = self.viewport.screen_to_world(screen);
            if self.interactions.update(world).is_some() {
                self.dirty.insert(id);
            }
        }
    }

    /// Release: commit the interaction or hand the pan over to momentum.
    pub fn pointer_up(&mut self, screen: Point, time_ms: f64) -> Option<Commit> {
        self.input.handle_pointer_event(&PointerEvent::Up {
            position: screen,
            button: MouseButton::Left,
            time_ms,
        });

        if self.viewport.is_panning() {
            if self.input.pointer_delta() != Vec2::ZERO {
                self.viewport.pan_to(screen, time_ms);
            }
            let momentum = self.viewport.end_pan();
            let mut payload = self.camera_payload();
            payload["momentum"] = json!(momentum);
            self.logger.log_stream(StreamKind::PanEnd, &payload);
            return None;
        }

        let world = self.viewport.screen_to_world(screen);
        let commit = self.interactions.end(Some(world))?;
        if self.document.update_geometry(commit.block_id, commit.rect) {
            self.committed(commit.block_id);
        }
        Some(commit)
    }

    /// Zoom anchored at the cursor. Returns whether the scale changed.
    pub fn wheel(&mut self, screen: Point, delta_y: f64, time_ms: f64) -> bool {
        let changed = self.viewport.wheel(screen, delta_y);
        self.zoomed(changed, time_ms)
    }

    /// Report a zoom, rate-limited on host time.
    fn zoomed(&mut self, changed: bool, time_ms: f64) -> bool {
        if changed && self.zoom_log.allow(time_ms) {
            self.logger.log_stream(StreamKind::Zoom, &self.camera_payload());
        }
        changed
    }

    /// Advance one animation frame. Returns whether another frame is needed.
    pub fn frame(&mut self) -> bool {
        self.viewport.step_momentum()
    }

    /// Handle a key press at host time `time_ms`. Returns whether the key was used.
    pub fn key(&mut self, key: Key, modifiers: Modifiers, time_ms: f64) -> bool {
        match key {
            Key::Escape => self.escape(),
            Key::Delete | Key::Backspace => self.delete_focused().is_some(),
            Key::Fit => {
                self.fit_to_content(self.viewport_size_or_default());
                true
            }
            Key::ResetZoom if modifiers.command() => {
                let changed = self.viewport.reset_zoom();
                self.zoomed(changed, time_ms);
                true
            }
            Key::ZoomIn | Key::ZoomOut if modifiers.command() => {
                let factor = if key == Key::ZoomIn { 1.25 } else { 0.8 };
                let changed = self.viewport.zoom_by(self.input.pointer_position, factor);
                self.zoomed(changed, time_ms)
            }
            _ => false,
        }
    }

    /// Viewport size assumed by keyboard "fit" when the host never reported one.
    fn viewport_size_or_default(&self) -> Size {
        self.viewport_size.unwrap_or(Size::new(1280.0, 800.0))
    }

    /// Cancel whatever is in progress. Returns whether anything was cancelled.
    pub fn escape(&mut self) -> bool {
        let mut cancelled = false;
        if let Some(id) = self.interactions.cancel() {
            self.dirty.insert(id);
            cancelled = true;
        }
        if self.viewport.is_panning() || self.viewport.has_momentum() {
            let was_panning = self.viewport.is_panning();
            self.viewport.cancel();
            if was_panning {
                self.logger.log_stream(StreamKind::PanEnd, &self.camera_payload());
            }
            cancelled = true;
        }
        cancelled
    }

    /// Give a block focus (or clear it) and raise it to the front.
    pub fn focus_block(&mut self, id: Option<BlockId>) {
        let id = id.filter(|id| self.document.contains(*id));
        if let Some(id) = id {
            if self.document.bring_to_front(id) {
                self.committed(id);
            }
        }
        if id == self.focused {
            return;
        }

        if self.focused.is_some() {
            self.logger.end_activity();
        }
        self.focused = id;
        if let Some(block) = id.and_then(|id| self.document.get(id)) {
            let name = self
                .registry
                .get(block.exercise)
                .map(|r| r.describe().label)
                .unwrap_or(block.exercise.token());
            self.logger.start_activity(&block.id.to_string(), block.exercise.token(), name);
            self.logger.log_event(
                &ActivityEvent::new(ACTIVITY_CATEGORY, "block_focused").with_detail(block.exercise.token()),
            );
        }
    }

    /// Add a block at the first free slot.
    pub fn add_block(&mut self, exercise: ExerciseType, size: Option<Size>) -> BlockId {
        let size = size.unwrap_or(DEFAULT_BLOCK_SIZE);
        let size = clamp_size(size.width, size.height);
        let origin = find_free_position(&self.document.blocks, size.width, size.height, &self.config.placement);
        self.add_block_at(exercise, origin, Some(size))
    }

    /// Add a block with its top-left corner at a world position.
    pub fn add_block_at(&mut self, exercise: ExerciseType, world: Point, size: Option<Size>) -> BlockId {
        let id = self
            .document
            .add_block(exercise, world, size.unwrap_or(DEFAULT_BLOCK_SIZE));
        self.committed(id);
        log::debug!("Added {} block {} at ({}, {})", exercise, id, world.x, world.y);
        self.logger
            .log_event(&ActivityEvent::new(ACTIVITY_CATEGORY, "block_added").with_detail(exercise.token()));
        id
    }

    /// Drop a palette card at a screen position.
    ///
    /// Unrecognized tokens are ignored.
    pub fn drop_exercise(&mut self, token: &str, screen: Point) -> Option<BlockId> {
        let exercise = match ExerciseType::from_str(token) {
            Ok(exercise) => exercise,
            Err(e) => {
                log::warn!("Ignoring drop: {}", e);
                return None;
            }
        };
        let world = self.viewport.screen_to_world(screen);
        let id = self.add_block_at(exercise, world, None);
        self.logger.log_stream(
            StreamKind::Drop,
            &json!({ "type": exercise.token(), "x": world.x, "y": world.y }),
        );
        Some(id)
    }

    /// Remove a block and its generated content.
    pub fn remove_block(&mut self, id: BlockId) -> Option<Block> {
        if self.interactions.live_rect(id).is_some() {
            self.interactions.cancel();
        }
        let block = self.document.remove_block(id)?;
        if self.focused == Some(id) {
            self.focused = None;
            self.logger.end_activity();
        }
        self.content.remove(id);
        self.committed(id);
        self.logger
            .log_event(&ActivityEvent::new(ACTIVITY_CATEGORY, "block_removed").with_detail(block.exercise.token()));
        Some(block)
    }

    /// Remove the focused block.
    pub fn delete_focused(&mut self) -> Option<Block> {
        let id = self.focused?;
        self.remove_block(id)
    }

    /// Change a block's generation parameters. Its content becomes stale.
    pub fn update_params(&mut self, id: BlockId, params: ExerciseParams) -> bool {
        if !self.document.update_params(id, params) {
            return false;
        }
        self.content.remove(id);
        self.committed(id);
        true
    }

    /// Generate content for a block through `provider`.
    ///
    /// Failures, including content the renderer rejects, are stored as the
    /// block's inline error state. On success the block is resized to fit.
    pub async fn generate_block(&mut self, id: BlockId, provider: &dyn ContentProvider) -> Option<GeneratedContent> {
        let block = self.document.get(id)?;
        let exercise = block.exercise;
        let request = GenerationRequest::from_block(block, self.registry.default_quantity(exercise));

        self.content.mark_pending(id);
        self.dirty.insert(id);
        let result = provider.generate(&request).await.and_then(|items| {
            match self.registry.get(exercise).map(|r| r.validate(&items)) {
                Some(Err(e)) => Err(ContentError::InvalidResponse(e.to_string())),
                _ => Ok(items),
            }
        });

        let ready = self.content.resolve(id, result).items().is_some();
        if ready {
            self.document.set_generated(id, true);
            self.committed(id);
            self.fit_block_to_content(id);
            self.logger.log_event(
                &ActivityEvent::new(ACTIVITY_CATEGORY, "block_generated").with_detail(exercise.token()),
            );
        }
        self.content.get(id).cloned()
    }

    /// Resize a block so its generated content fits. Returns whether it changed.
    pub fn fit_block_to_content(&mut self, id: BlockId) -> bool {
        let Some(block) = self.document.get(id) else {
            return false;
        };
        let Some(items) = self.content.get(id).and_then(GeneratedContent::items) else {
            return false;
        };
        let Some(renderer) = self.registry.get(block.exercise) else {
            return false;
        };

        let preferred = renderer.render(items, block.width).preferred_size;
        let size = clamp_size(block.width.max(preferred.width), preferred.height);
        if size == block.size() {
            return false;
        }
        let rect = Rect::from_origin_size(block.origin(), size);
        self.document.update_geometry(id, rect);
        self.committed(id);
        true
    }

    /// Report the on-screen size of the whiteboard.
    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport_size = Some(size);
    }

    /// Frame every block in a viewport of `viewport` size.
    pub fn fit_to_content(&mut self, viewport: Size) {
        let padding = self.config.fit_padding_px;
        let bounds = self.document.bounds();
        self.viewport.cancel();
        self.viewport.with_camera(|camera| match bounds {
            Some(bounds) => camera.fit_to_bounds(bounds, viewport, padding),
            None => camera.reset(),
        });
    }

    /// Blocks intersecting the visible area, back to front.
    pub fn visible_blocks(&self, viewport: Size) -> Vec<BlockId> {
        let visible = self.viewport.camera().visible_world_rect(viewport);
        self.document
            .blocks_ordered()
            .into_iter()
            .filter(|b| overlaps(visible, self.display_rect(b.id).unwrap_or_else(|| b.bounds())))
            .map(|b| b.id)
            .collect()
    }

    /// Take the board out, e.g. for a final save.
    pub fn into_document(self) -> BoardDocument {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityRecord, RecordingActivityLogger};
    use crate::content::StaticContentProvider;
    use crate::registry::ExerciseRegistry;
    use pollster::block_on;
    use serde_json::json;

    fn whiteboard() -> (Whiteboard, Arc<RecordingActivityLogger>) {
        let logger = Arc::new(RecordingActivityLogger::new());
        let wb = Whiteboard::new(BoardConfig::default(), logger.clone());
        (wb, logger)
    }

    fn left_down(wb: &mut Whiteboard, x: f64, y: f64, t: f64) {
        wb.pointer_down(Point::new(x, y), MouseButton::Left, Modifiers::default(), t);
    }

    #[test]
    fn test_drop_converts_screen_to_world() {
        let (mut wb, logger) = whiteboard();
        wb.viewport.with_camera(|camera| {
            camera.pan = Vec2::new(100.0, 50.0);
            camera.scale = 2.0;
        });

        let id = wb.drop_exercise("matching", Point::new(300.0, 250.0)).unwrap();
        let block = wb.document().get(id).unwrap();
        assert_eq!(block.origin(), Point::new(100.0, 100.0));
        assert_eq!(block.exercise, ExerciseType::Matching);
        assert_eq!(logger.stream_count(StreamKind::Drop), 1);
        assert_eq!(logger.event_concepts(), vec!["block_added".to_string()]);
    }

    #[test]
    fn test_drop_unknown_token_is_ignored() {
        let (mut wb, logger) = whiteboard();
        assert!(wb.drop_exercise("crossword", Point::ZERO).is_none());
        assert!(wb.snapshot().is_empty());
        assert!(logger.records().is_empty());
    }

    #[test]
    fn test_add_block_uses_free_slot() {
        let (mut wb, _) = whiteboard();
        let first = wb.add_block(ExerciseType::Translation, None);
        let second = wb.add_block(ExerciseType::Translation, None);
        assert_eq!(wb.document().get(first).unwrap().origin(), Point::ZERO);
        assert_eq!(wb.document().get(second).unwrap().origin(), Point::new(0.0, 400.0));
    }

    #[test]
    fn test_drag_snaps_and_commits_on_release() {
        let (mut wb, _) = whiteboard();
        let moving = wb.add_block_at(ExerciseType::Translation, Point::ZERO, None);
        wb.add_block_at(ExerciseType::Matching, Point::new(500.0, 1000.0), None);
        let before = wb.revision();

        left_down(&mut wb, 200.0, 150.0, 0.0);
        assert!(wb.is_interacting());
        assert_eq!(wb.focused(), Some(moving));

        wb.pointer_move(Point::new(696.0, 830.0), 16.0);
        let live = wb.live_rect(moving).unwrap();
        assert!((live.x0 - 500.0).abs() < 1e-9);
        assert!((live.y0 - 680.0).abs() < 1e-9);
        assert_eq!(wb.guides().len(), 1);
        // Committed geometry is untouched until release.
        assert_eq!(wb.document().get(moving).unwrap().origin(), Point::ZERO);

        let commit = wb.pointer_up(Point::new(696.0, 830.0), 32.0).unwrap();
        assert_eq!(commit.block_id, moving);
        assert_eq!(wb.document().get(moving).unwrap().origin(), Point::new(500.0, 680.0));
        assert!(wb.live_rect(moving).is_none());
        assert!(wb.guides().is_empty());
        assert!(wb.revision() > before);
    }

    #[test]
    fn test_drag_ignores_block_removed_mid_drag() {
        let (mut wb, _) = whiteboard();
        let moving = wb.add_block_at(ExerciseType::Translation, Point::ZERO, None);
        let other = wb.add_block_at(ExerciseType::Matching, Point::new(500.0, 1000.0), None);

        left_down(&mut wb, 200.0, 150.0, 0.0);
        assert!(wb.remove_block(other).is_some());
        assert!(wb.is_interacting());

        wb.pointer_move(Point::new(696.0, 830.0), 16.0);
        assert!((wb.live_rect(moving).unwrap().x0 - 496.0).abs() < 1e-9);
        assert!(wb.guides().is_empty());

        wb.pointer_up(Point::new(696.0, 830.0), 32.0);
        assert_eq!(wb.snapshot().len(), 1);
        assert_eq!(wb.document().get(moving).unwrap().origin(), Point::new(496.0, 680.0));
    }

    #[test]
    fn test_drag_snaps_to_block_added_mid_drag() {
        let (mut wb, _) = whiteboard();
        let moving = wb.add_block_at(ExerciseType::Translation, Point::ZERO, None);

        left_down(&mut wb, 200.0, 150.0, 0.0);
        wb.pointer_move(Point::new(696.0, 830.0), 16.0);
        assert!(wb.guides().is_empty());
        wb.take_dirty();

        wb.add_block_at(ExerciseType::Matching, Point::new(500.0, 1000.0), None);
        assert!((wb.live_rect(moving).unwrap().x0 - 500.0).abs() < 1e-9);
        assert_eq!(wb.guides().len(), 1);
        assert!(wb.take_dirty().contains(&moving));

        wb.pointer_up(Point::new(696.0, 830.0), 32.0);
        assert_eq!(wb.document().get(moving).unwrap().origin(), Point::new(500.0, 680.0));
    }

    #[test]
    fn test_keyboard_zoom_cancels_momentum_and_is_logged() {
        let (mut wb, logger) = whiteboard();
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::default()
        };
        left_down(&mut wb, 0.0, 0.0, 0.0);
        for i in 1..=10 {
            wb.pointer_move(Point::new(i as f64 * 20.0, 0.0), i as f64 * 10.0);
        }
        wb.pointer_up(Point::new(200.0, 0.0), 110.0);
        assert!(wb.needs_frame());

        assert!(!wb.key(Key::ZoomIn, Modifiers::default(), 115.0));
        assert!(wb.needs_frame());

        assert!(wb.key(Key::ZoomIn, ctrl, 120.0));
        assert!(!wb.needs_frame());
        assert!((wb.camera().scale - 1.25).abs() < 1e-9);

        assert!(wb.key(Key::ZoomOut, ctrl, 130.0));
        assert_eq!(logger.stream_count(StreamKind::Zoom), 1);

        assert!(wb.key(Key::ResetZoom, ctrl, 2000.0));
        assert_eq!(wb.camera().pan, Vec2::ZERO);
        assert_eq!(logger.stream_count(StreamKind::Zoom), 2);
    }

    #[test]
    fn test_resize_from_corner_handle() {
        let (mut wb, _) = whiteboard();
        let id = wb.add_block_at(ExerciseType::Listening, Point::ZERO, None);

        left_down(&mut wb, 400.0, 300.0, 0.0);
        wb.pointer_move(Point::new(500.0, 420.0), 16.0);
        assert_eq!(wb.live_rect(id), Some(Rect::new(0.0, 0.0, 500.0, 420.0)));
        wb.pointer_up(Point::new(500.0, 420.0), 32.0);

        assert_eq!(wb.document().get(id).unwrap().size(), Size::new(500.0, 420.0));
    }

    #[test]
    fn test_pan_momentum_and_cancel_on_press() {
        let (mut wb, logger) = whiteboard();
        left_down(&mut wb, 0.0, 0.0, 0.0);
        assert!(wb.viewport().is_panning());
        for i in 1..=10 {
            wb.pointer_move(Point::new(i as f64 * 20.0, 0.0), i as f64 * 10.0);
        }
        assert!(wb.pointer_up(Point::new(200.0, 0.0), 110.0).is_none());
        assert!((wb.camera().pan.x - 200.0).abs() < 1e-9);
        assert!(wb.needs_frame());

        assert!(wb.frame());
        assert!(wb.camera().pan.x > 200.0);

        // A new press stops the coasting immediately.
        left_down(&mut wb, 10.0, 10.0, 200.0);
        assert!(!wb.needs_frame());
        assert_eq!(wb.viewport().velocity(), Vec2::ZERO);

        assert_eq!(logger.stream_count(StreamKind::PanStart), 2);
        assert_eq!(logger.stream_count(StreamKind::PanEnd), 1);
    }

    #[test]
    fn test_middle_button_pans_over_block() {
        let (mut wb, _) = whiteboard();
        wb.add_block_at(ExerciseType::Matching, Point::ZERO, None);
        wb.pointer_down(Point::new(100.0, 100.0), MouseButton::Middle, Modifiers::default(), 0.0);
        assert!(wb.viewport().is_panning());
        assert!(!wb.is_interacting());

        let space = Modifiers {
            space: true,
            ..Modifiers::default()
        };
        wb.pointer_up(Point::new(100.0, 100.0), 10.0);
        wb.pointer_down(Point::new(100.0, 100.0), MouseButton::Left, space, 20.0);
        assert!(wb.viewport().is_panning());
    }

    #[test]
    fn test_wheel_zoom_is_anchored_and_throttled() {
        let (mut wb, logger) = whiteboard();
        let cursor = Point::new(320.0, 240.0);
        let anchor = wb.viewport().screen_to_world(cursor);

        for i in 0..100 {
            assert!(wb.wheel(cursor, -10.0, i as f64 * 16.0));
        }
        let after = wb.viewport().screen_to_world(cursor);
        assert!((anchor.x - after.x).abs() < 1e-6);
        assert!((anchor.y - after.y).abs() < 1e-6);
        assert!(wb.camera().scale > 2.0);
        // Reported at 0 ms and 1008 ms only.
        assert_eq!(logger.stream_count(StreamKind::Zoom), 2);
    }

    #[test]
    fn test_escape_cancels_drag() {
        let (mut wb, _) = whiteboard();
        let id = wb.add_block_at(ExerciseType::Matching, Point::ZERO, None);
        left_down(&mut wb, 200.0, 150.0, 0.0);
        wb.pointer_move(Point::new(260.0, 150.0), 16.0);

        assert!(wb.key(Key::Escape, Modifiers::default(), 20.0));
        assert!(wb.live_rect(id).is_none());
        assert!(wb.pointer_up(Point::new(260.0, 150.0), 32.0).is_none());
        assert_eq!(wb.document().get(id).unwrap().origin(), Point::ZERO);
    }

    #[test]
    fn test_delete_focused_block() {
        let (mut wb, logger) = whiteboard();
        let id = wb.add_block_at(ExerciseType::TrueFalse, Point::ZERO, None);
        wb.content.resolve(id, Ok(vec![json!({ "statement": "x" })]));
        left_down(&mut wb, 200.0, 150.0, 0.0);
        wb.pointer_up(Point::new(200.0, 150.0), 10.0);
        assert_eq!(wb.focused(), Some(id));

        assert!(wb.key(Key::Delete, Modifiers::default(), 20.0));
        assert!(wb.snapshot().is_empty());
        assert!(wb.focused().is_none());
        assert!(wb.content(id).is_none());
        assert!(logger.event_concepts().contains(&"block_removed".to_string()));
        assert!(!wb.key(Key::Delete, Modifiers::default(), 20.0));
    }

    #[test]
    fn test_focus_brackets_activity() {
        let (mut wb, logger) = whiteboard();
        let a = wb.add_block_at(ExerciseType::Matching, Point::ZERO, None);
        let b = wb.add_block_at(ExerciseType::Listening, Point::new(1000.0, 0.0), None);

        wb.focus_block(Some(a));
        wb.focus_block(Some(a));
        wb.focus_block(Some(b));

        let brackets: Vec<ActivityRecord> = logger
            .records()
            .into_iter()
            .filter(|r| matches!(r, ActivityRecord::Start { .. } | ActivityRecord::End))
            .collect();
        assert_eq!(brackets.len(), 3);
        assert!(matches!(&brackets[0], ActivityRecord::Start { id, name, .. } if *id == a.to_string() && name == "Matching"));
        assert_eq!(brackets[1], ActivityRecord::End);
        assert!(matches!(&brackets[2], ActivityRecord::Start { kind, .. } if kind == "listening"));
        assert_eq!(wb.document().blocks_ordered().last().unwrap().id, b);
    }

    #[test]
    fn test_generate_resizes_block() {
        let (mut wb, _) = whiteboard();
        let id = wb.add_block_at(ExerciseType::Translation, Point::ZERO, None);
        let params = ExerciseParams {
            quantity: Some(12),
            ..ExerciseParams::default()
        };
        assert!(wb.update_params(id, params));

        let content = block_on(wb.generate_block(id, &StaticContentProvider::new())).unwrap();
        assert_eq!(content.items().unwrap().len(), 12);

        let block = wb.document().get(id).unwrap();
        assert!(block.is_generated);
        assert!((block.height - (56.0 + 12.0 * 28.0 + 24.0)).abs() < 1e-9);
        assert!((block.width - 400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_generation_failure_is_inline() {
        let (mut wb, _) = whiteboard();
        let id = wb.add_block_at(ExerciseType::Translation, Point::ZERO, None);

        let content = block_on(wb.generate_block(id, &StaticContentProvider::failing("offline"))).unwrap();
        assert!(content.is_failed());
        let block = wb.document().get(id).unwrap();
        assert!(!block.is_generated);
        assert_eq!(block.size(), DEFAULT_BLOCK_SIZE);

        assert!(block_on(wb.generate_block(999, &StaticContentProvider::new())).is_none());
    }

    #[test]
    fn test_rejected_content_is_inline_failure() {
        let (mut wb, _) = whiteboard();
        let id = wb.add_block_at(ExerciseType::Translation, Point::ZERO, None);
        let provider = StaticContentProvider::new().with_items(ExerciseType::Translation, vec![json!(1), json!(2)]);

        let content = block_on(wb.generate_block(id, &provider)).unwrap();
        assert!(matches!(content, GeneratedContent::Failed(ref msg) if msg.contains("not an object")));
    }

    #[test]
    fn test_dirty_tracking() {
        let mut document = BoardDocument::new();
        let a = document.add_block(ExerciseType::Matching, Point::ZERO, DEFAULT_BLOCK_SIZE);
        let b = document.add_block(ExerciseType::Matching, Point::new(1000.0, 0.0), DEFAULT_BLOCK_SIZE);
        let mut wb = Whiteboard::with_document(document, BoardConfig::default(), Arc::new(RecordingActivityLogger::new()));

        assert_eq!(wb.take_dirty(), vec![a, b]);
        assert!(wb.take_dirty().is_empty());

        // `b` is already on top; moving it only touches `b`.
        left_down(&mut wb, 1200.0, 150.0, 0.0);
        wb.take_dirty();
        wb.pointer_move(Point::new(1210.0, 150.0), 16.0);
        assert_eq!(wb.take_dirty(), vec![b]);

        // Panning dirties no blocks.
        wb.pointer_up(Point::new(1210.0, 150.0), 32.0);
        wb.take_dirty();
        left_down(&mut wb, 5000.0, 5000.0, 100.0);
        wb.pointer_move(Point::new(5100.0, 5000.0), 116.0);
        assert!(wb.take_dirty().is_empty());
    }

    #[test]
    fn test_remove_block_during_drag() {
        let (mut wb, _) = whiteboard();
        let id = wb.add_block_at(ExerciseType::Matching, Point::ZERO, None);
        left_down(&mut wb, 200.0, 150.0, 0.0);
        assert!(wb.remove_block(id).is_some());
        assert!(!wb.is_interacting());
        assert!(wb.pointer_up(Point::new(250.0, 150.0), 16.0).is_none());
    }

    #[test]
    fn test_fit_to_content_shows_all_blocks() {
        let (mut wb, _) = whiteboard();
        let a = wb.add_block_at(ExerciseType::Matching, Point::new(-2000.0, 0.0), None);
        let b = wb.add_block_at(ExerciseType::Matching, Point::new(3000.0, 1500.0), None);
        let viewport = Size::new(800.0, 600.0);
        assert!(wb.visible_blocks(viewport).len() < 2);

        wb.fit_to_content(viewport);
        assert_eq!(wb.visible_blocks(viewport), vec![a, b]);
    }

    #[test]
    fn test_custom_registry_drives_quantity() {
        let logger = Arc::new(RecordingActivityLogger::new());
        let mut wb = Whiteboard::new(BoardConfig::default(), logger).with_registry(ExerciseRegistry::new());
        let id = wb.add_block_at(ExerciseType::Conversation, Point::ZERO, None);

        let content = block_on(wb.generate_block(id, &StaticContentProvider::new())).unwrap();
        assert_eq!(content.items().unwrap().len(), crate::registry::FALLBACK_QUANTITY as usize);
        // No renderer: content is kept but the block keeps its size.
        assert_eq!(wb.document().get(id).unwrap().size(), DEFAULT_BLOCK_SIZE);
    }
}
