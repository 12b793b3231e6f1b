//! Lingoboard Application
//!
//! Headless shell around the whiteboard engine: configuration, board
//! persistence, keyboard shortcuts and session replay.

mod cli;
mod config;
mod error;
mod session;
mod shortcuts;

pub use cli::CliArgs;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use session::{Session, SessionEvent, SessionSummary, load_script, parse_script};
pub use shortcuts::{Shortcut, ShortcutRegistry};
