//! Lingoboard Core Library
//!
//! Platform-agnostic data structures and interaction engine for the
//! Lingoboard exercise whiteboard: an infinite canvas of language-learning
//! exercise blocks.

pub mod activity;
pub mod block;
pub mod board;
pub mod camera;
pub mod config;
pub mod content;
pub mod debounce;
pub mod input;
pub mod interaction;
pub mod placement;
pub mod registry;
pub mod snap;
pub mod spatial;
pub mod storage;
pub mod viewport;
pub mod whiteboard;

pub use activity::{ActivityEvent, ActivityLogger, LogActivityLogger, NullActivityLogger, RecordingActivityLogger, StreamKind};
pub use block::{Block, BlockId, Difficulty, ExerciseParams, ExerciseType, Tone};
pub use board::{BoardDocument, LegacyPage, migrate_pages};
pub use camera::Camera;
pub use config::{BoardConfig, ConfigError};
pub use content::{AnswerChecker, ContentError, ContentProvider, GeneratedContent, GenerationRequest, ItemList};
pub use input::{InputState, Key, Modifiers, MouseButton, PointerEvent};
pub use interaction::{Commit, InteractionCoordinator, InteractionKind, ResizeHandle};
pub use placement::{PlacementConfig, find_free_position};
pub use registry::{ExerciseRegistry, ExerciseRenderer};
pub use snap::{SnapConfig, SnapLine, SnapOutcome, compute_snap};
pub use spatial::SpatialIndex;
pub use storage::{AutoSaveManager, Storage, StorageError};
pub use viewport::{ViewportConfig, ViewportController};
pub use whiteboard::{HitTarget, Whiteboard};
