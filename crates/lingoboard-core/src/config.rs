//! Whiteboard configuration.

use crate::activity::ActivityConfig;
use crate::interaction::HANDLE_HIT_TOLERANCE;
use crate::placement::PlacementConfig;
use crate::snap::SnapConfig;
use crate::storage::DEFAULT_SAVE_DEBOUNCE_MS;
use crate::viewport::ViewportConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// All tunables of the whiteboard engine. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub placement: PlacementConfig,
    pub snap: SnapConfig,
    pub viewport: ViewportConfig,
    pub activity: ActivityConfig,
    /// Quiet period before a change is persisted.
    pub autosave_debounce_ms: u64,
    /// Resize handle grab distance in screen pixels.
    pub handle_tolerance_px: f64,
    /// Screen margin kept around content by "fit to content".
    pub fit_padding_px: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            placement: PlacementConfig::default(),
            snap: SnapConfig::default(),
            viewport: ViewportConfig::default(),
            activity: ActivityConfig::default(),
            autosave_debounce_ms: DEFAULT_SAVE_DEBOUNCE_MS,
            handle_tolerance_px: HANDLE_HIT_TOLERANCE,
            fit_padding_px: 48.0,
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("expected a positive number, got {value}"),
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("expected zero or more, got {value}"),
        })
    }
}

impl BoardConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("placement.grid_step", self.placement.grid_step)?;
        non_negative("placement.extent_width", self.placement.extent_width)?;
        non_negative("placement.extent_height", self.placement.extent_height)?;
        non_negative("placement.padding", self.placement.padding)?;
        positive("placement.bin_size", self.placement.bin_size)?;

        non_negative("snap.threshold", self.snap.threshold)?;
        non_negative("snap.overshoot", self.snap.overshoot)?;
        positive("snap.bin_size", self.snap.bin_size)?;
        non_negative("snap.query_padding", self.snap.query_padding)?;

        let viewport = &self.viewport;
        positive("viewport.min_scale", viewport.min_scale)?;
        positive("viewport.max_scale", viewport.max_scale)?;
        if viewport.min_scale > viewport.max_scale {
            return Err(ConfigError::Invalid {
                field: "viewport.min_scale",
                reason: "must not exceed max_scale".to_string(),
            });
        }
        if !(viewport.friction > 0.0 && viewport.friction < 1.0) {
            return Err(ConfigError::Invalid {
                field: "viewport.friction",
                reason: format!("expected a value in (0, 1), got {}", viewport.friction),
            });
        }
        non_negative("viewport.velocity_threshold", viewport.velocity_threshold)?;
        positive("viewport.frame_interval_ms", viewport.frame_interval_ms)?;
        if !(0.0..=1.0).contains(&viewport.velocity_blend) {
            return Err(ConfigError::Invalid {
                field: "viewport.velocity_blend",
                reason: format!("expected a value in [0, 1], got {}", viewport.velocity_blend),
            });
        }
        positive("viewport.zoom_sensitivity", viewport.zoom_sensitivity)?;

        non_negative("activity.zoom_log_interval_ms", self.activity.zoom_log_interval_ms)?;
        non_negative("handle_tolerance_px", self.handle_tolerance_px)?;
        non_negative("fit_padding_px", self.fit_padding_px)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BoardConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.snap.threshold - 10.0).abs() < f64::EPSILON);
        assert!((config.viewport.friction - 0.92).abs() < f64::EPSILON);
        assert!((config.activity.zoom_log_interval_ms - 1000.0).abs() < f64::EPSILON);
        assert_eq!(config.autosave_debounce_ms, 500);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = BoardConfig::from_json(r#"{"snap": {"threshold": 6}, "autosave_debounce_ms": 250}"#).unwrap();
        assert!((config.snap.threshold - 6.0).abs() < f64::EPSILON);
        assert!(config.snap.enabled);
        assert_eq!(config.autosave_debounce_ms, 250);
        assert_eq!(config.placement, PlacementConfig::default());
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = BoardConfig::from_json(r#"{"viewport": {"friction": 1.5}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "viewport.friction", .. }));

        let err = BoardConfig::from_json(r#"{"placement": {"grid_step": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "placement.grid_step", .. }));

        assert!(matches!(BoardConfig::from_json("[1, 2"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = BoardConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(BoardConfig::from_json(&json).unwrap(), config);
    }
}
