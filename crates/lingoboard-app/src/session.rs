//! Recorded input sessions replayed through the whiteboard.
//!
//! A session script is a JSON list of [`SessionEvent`]s as a host would
//! deliver them. Replay drives the same code paths as a live host: every
//! committed change schedules an autosave, the save debounce runs on the
//! script's own clock, and teardown flushes whatever is still pending.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult, read_file};
use crate::shortcuts::ShortcutRegistry;
use kurbo::{Point, Size};
use lingoboard_core::content::StaticContentProvider;
use lingoboard_core::{
    ActivityLogger, AutoSaveManager, BlockId, BoardDocument, Camera, ExerciseParams, ExerciseType, GeneratedContent,
    Modifiers, PointerEvent, Storage, StorageError, Whiteboard,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One recorded host callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Pointer(PointerEvent),
    /// Animation frames requested by the host.
    Frames { count: u32 },
    /// Idle time with no input.
    Wait { ms: f64 },
    /// A palette card dropped at a screen position.
    Drop { exercise: String, position: Point },
    /// "Add block" button.
    Add {
        exercise: ExerciseType,
        #[serde(default)]
        size: Option<Size>,
    },
    Remove { id: BlockId },
    Focus { id: Option<BlockId> },
    /// Key press by host name, e.g. "Escape" or "=".
    Key {
        name: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Params { id: BlockId, params: ExerciseParams },
    Generate { id: BlockId },
    Snapping { enabled: bool },
}

impl SessionEvent {
    fn time_ms(&self) -> Option<f64> {
        match self {
            SessionEvent::Pointer(event) => Some(event.time_ms()),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Script {
    Events(Vec<SessionEvent>),
    Wrapped { events: Vec<SessionEvent> },
}

/// Parse a script: either a bare event list or `{"events": [...]}`.
pub fn parse_script(json: &str) -> AppResult<Vec<SessionEvent>> {
    match serde_json::from_str(json).map_err(AppError::Script)? {
        Script::Events(events) | Script::Wrapped { events } => Ok(events),
    }
}

pub fn load_script(path: &Path) -> AppResult<Vec<SessionEvent>> {
    parse_script(&read_file(path)?)
}

/// What a replay did.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub board_id: String,
    pub events: usize,
    pub commits: usize,
    pub frames: usize,
    pub saves: usize,
    pub failed_generations: usize,
    pub blocks: usize,
    pub camera: Camera,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Board {}: {} blocks", self.board_id, self.blocks)?;
        writeln!(
            f,
            "  {} events, {} commits, {} momentum frames, {} saves",
            self.events, self.commits, self.frames, self.saves
        )?;
        if self.failed_generations > 0 {
            writeln!(f, "  {} generation(s) failed", self.failed_generations)?;
        }
        write!(
            f,
            "  camera at ({:.1}, {:.1}) scale {:.2}",
            self.camera.pan.x, self.camera.pan.y, self.camera.scale
        )
    }
}

/// A whiteboard wired to autosave and an offline content provider.
pub struct Session<S: Storage> {
    whiteboard: Whiteboard,
    autosave: AutoSaveManager<S>,
    provider: StaticContentProvider,
    epoch: Instant,
    clock_ms: f64,
    saved_revision: u64,
    summary: SessionSummary,
}

impl<S: Storage> Session<S> {
    /// Open the configured board, or the last one, or an empty one.
    pub async fn open(config: &AppConfig, storage: Arc<S>, logger: Arc<dyn ActivityLogger>) -> Self {
        let delay = Duration::from_millis(config.board.autosave_debounce_ms);
        let mut autosave = AutoSaveManager::with_delay(storage, delay);

        let document = match &config.board_id {
            Some(id) => match autosave.load(id).await {
                Ok(board) => board,
                Err(e) => {
                    if !matches!(e, StorageError::NotFound(_)) {
                        log::warn!("Could not load board {}, starting empty: {}", id, e);
                    }
                    autosave.set_board_id(Some(id.clone()));
                    BoardDocument::new()
                }
            },
            None => autosave.restore().await,
        };

        let board_id = autosave.board_id().map(str::to_string).unwrap_or_else(|| document.id.clone());
        let mut whiteboard = Whiteboard::with_document(document, config.board.clone(), logger);
        whiteboard.set_viewport_size(config.viewport_size());

        Self {
            summary: SessionSummary {
                board_id,
                events: 0,
                commits: 0,
                frames: 0,
                saves: 0,
                failed_generations: 0,
                blocks: whiteboard.document().len(),
                camera: whiteboard.camera().clone(),
            },
            saved_revision: whiteboard.revision(),
            whiteboard,
            autosave,
            provider: StaticContentProvider::new(),
            epoch: Instant::now(),
            clock_ms: 0.0,
        }
    }

    /// Serve generation requests from `provider` instead of synthesized items.
    pub fn with_provider(mut self, provider: StaticContentProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn whiteboard(&self) -> &Whiteboard {
        &self.whiteboard
    }

    pub fn autosave(&self) -> &AutoSaveManager<S> {
        &self.autosave
    }

    fn now(&self) -> Instant {
        self.epoch + Duration::from_secs_f64(self.clock_ms.max(0.0) / 1000.0)
    }

    /// Deliver one event, then let the autosave catch up.
    pub async fn apply(&mut self, event: &SessionEvent) {
        if let Some(time_ms) = event.time_ms() {
            self.clock_ms = self.clock_ms.max(time_ms);
        }
        self.summary.events += 1;

        match event {
            SessionEvent::Pointer(pointer) => {
                if self.whiteboard.handle_pointer_event(pointer).is_some() {
                    self.summary.commits += 1;
                }
            }
            SessionEvent::Frames { count } => {
                let frame_ms = self.whiteboard.viewport().config().frame_interval_ms;
                for _ in 0..*count {
                    if !self.whiteboard.needs_frame() {
                        break;
                    }
                    self.whiteboard.frame();
                    self.clock_ms += frame_ms;
                    self.summary.frames += 1;
                }
            }
            SessionEvent::Wait { ms } => self.clock_ms += ms.max(0.0),
            SessionEvent::Drop { exercise, position } => {
                self.whiteboard.drop_exercise(exercise, *position);
            }
            SessionEvent::Add { exercise, size } => {
                self.whiteboard.add_block(*exercise, *size);
            }
            SessionEvent::Remove { id } => {
                if self.whiteboard.remove_block(*id).is_none() {
                    log::warn!("Remove: no block {}", id);
                }
            }
            SessionEvent::Focus { id } => self.whiteboard.focus_block(*id),
            SessionEvent::Key { name, modifiers } => match ShortcutRegistry::resolve(name, *modifiers) {
                Some(key) => {
                    self.whiteboard.key(key, *modifiers, self.clock_ms);
                }
                None => log::debug!("Unbound key {}", name),
            },
            SessionEvent::Params { id, params } => {
                if !self.whiteboard.update_params(*id, params.clone()) {
                    log::warn!("Params: no block {}", id);
                }
            }
            SessionEvent::Generate { id } => {
                match self.whiteboard.generate_block(*id, &self.provider).await {
                    Some(GeneratedContent::Failed(_)) => self.summary.failed_generations += 1,
                    Some(_) => {}
                    None => log::warn!("Generate: no block {}", id),
                }
            }
            SessionEvent::Snapping { enabled } => self.whiteboard.set_snapping(*enabled),
        }

        self.sync().await;
    }

    async fn sync(&mut self) {
        let now = self.now();
        if self.whiteboard.revision() != self.saved_revision {
            self.saved_revision = self.whiteboard.revision();
            self.autosave.schedule(self.whiteboard.document(), now);
        }
        match self.autosave.poll(now).await {
            Ok(written) => self.summary.saves += written,
            Err(e) => log::debug!("Auto-save will retry: {}", e),
        }
    }

    /// Replay a whole script.
    pub async fn replay(&mut self, events: &[SessionEvent]) {
        for event in events {
            self.apply(event).await;
        }
    }

    /// Flush pending saves and report.
    pub async fn finish(mut self) -> AppResult<SessionSummary> {
        self.summary.saves += self.autosave.flush().await?;
        self.summary.blocks = self.whiteboard.document().len();
        self.summary.camera = self.whiteboard.camera().clone();
        log::info!("Session finished: {} events", self.summary.events);
        Ok(self.summary)
    }
}
