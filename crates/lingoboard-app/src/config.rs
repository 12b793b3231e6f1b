//! Application configuration.

use crate::error::{AppResult, read_file};
use lingoboard_core::BoardConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Shell settings plus the engine's [`BoardConfig`].
///
/// Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub title: String,
    /// Assumed viewport size in screen pixels.
    pub width: u32,
    pub height: u32,
    /// Directory for saved boards. The platform data directory when unset.
    pub storage_dir: Option<PathBuf>,
    /// Board to open. The last opened board when unset.
    pub board_id: Option<String>,
    pub board: BoardConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Lingoboard".to_string(),
            width: 1280,
            height: 800,
            storage_dir: None,
            board_id: None,
            board: BoardConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> AppResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(lingoboard_core::ConfigError::from)?;
        config.board.validate()?;
        Ok(config)
    }

    /// Load from `path`, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(path) => {
                let config = Self::from_json(&read_file(path)?)?;
                log::info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn viewport_size(&self) -> kurbo::Size {
        kurbo::Size::new(f64::from(self.width), f64::from(self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use lingoboard_core::ConfigError;

    #[test]
    fn test_defaults_without_path() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.viewport_size(), kurbo::Size::new(1280.0, 800.0));
    }

    #[test]
    fn test_partial_json() {
        let config = AppConfig::from_json(r#"{"board_id": "lesson-1", "board": {"snap": {"threshold": 4}}}"#).unwrap();
        assert_eq!(config.board_id.as_deref(), Some("lesson-1"));
        assert!((config.board.snap.threshold - 4.0).abs() < f64::EPSILON);
        assert_eq!(config.title, "Lingoboard");
    }

    #[test]
    fn test_invalid_board_config() {
        let err = AppConfig::from_json(r#"{"board": {"viewport": {"min_scale": 5, "max_scale": 1}}}"#).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/lingoboard.json"))).unwrap_err();
        assert!(matches!(err, AppError::Read { .. }));
    }
}
