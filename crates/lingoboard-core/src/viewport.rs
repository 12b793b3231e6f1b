//! Viewport controller: click-drag panning, momentum and wheel zoom.
//!
//! The controller is a small state machine over [`ViewportState`]. Timestamps
//! are host-supplied milliseconds (the pointer event / animation frame time),
//! which keeps the physics deterministic.

use crate::camera::{Camera, MAX_SCALE, MIN_SCALE};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Tunables for panning, momentum and zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Velocity multiplier applied every momentum frame.
    pub friction: f64,
    /// Momentum stops once both velocity components are at or below this (px/ms).
    pub velocity_threshold: f64,
    /// Assumed duration of one animation frame (ms).
    pub frame_interval_ms: f64,
    /// Weight of the newest velocity sample in the smoothed estimate.
    pub velocity_blend: f64,
    /// Zoom factor is `exp(-delta_y * zoom_sensitivity)`.
    pub zoom_sensitivity: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            friction: 0.92,
            velocity_threshold: 0.1,
            frame_interval_ms: 16.0,
            velocity_blend: 0.5,
            zoom_sensitivity: 0.001,
        }
    }
}

/// Pan state machine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ViewportState {
    #[default]
    Idle,
    Panning {
        /// Last pointer position in screen coordinates.
        last_position: Point,
        /// Timestamp of the last pointer sample (ms).
        last_time: f64,
    },
    Momentum,
}

/// Owns the camera and drives pan, momentum and zoom.
#[derive(Debug, Clone)]
pub struct ViewportController {
    camera: Camera,
    state: ViewportState,
    /// Smoothed pan velocity in px/ms.
    velocity: Vec2,
    config: ViewportConfig,
    /// Bumped whenever the transform changes.
    revision: u64,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl ViewportController {
    pub fn new(config: ViewportConfig) -> Self {
        let config = sanitize(config);
        Self {
            camera: Camera::with_bounds(config.min_scale, config.max_scale),
            state: ViewportState::Idle,
            velocity: Vec2::ZERO,
            config,
            revision: 0,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.state, ViewportState::Panning { .. })
    }

    /// Whether the host should schedule another animation frame.
    pub fn has_momentum(&self) -> bool {
        self.state == ViewportState::Momentum
    }

    /// Counter that changes whenever pan or scale changes.
    ///
    /// Renderers compare it to decide whether to re-apply the layer transform.
    pub fn transform_revision(&self) -> u64 {
        self.revision
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen: Point) -> Point {
        self.camera.screen_to_world(screen)
    }

    /// Start panning. Cancels any in-flight momentum.
    pub fn begin_pan(&mut self, screen: Point, time_ms: f64) {
        self.cancel_momentum();
        self.velocity = Vec2::ZERO;
        self.state = ViewportState::Panning {
            last_position: screen,
            last_time: time_ms,
        };
    }

    /// Continue panning to `screen`. Returns the applied delta (zero when not panning).
    pub fn pan_to(&mut self, screen: Point, time_ms: f64) -> Vec2 {
        let ViewportState::Panning { last_position, last_time } = self.state else {
            return Vec2::ZERO;
        };

        let delta = screen - last_position;
        if delta != Vec2::ZERO {
            self.camera.pan_by(delta);
            self.revision += 1;
        }

        let dt = time_ms - last_time;
        if dt > 0.0 && dt.is_finite() {
            let instant = delta / dt;
            let blend = self.config.velocity_blend;
            self.velocity = instant * blend + self.velocity * (1.0 - blend);
        }

        self.state = ViewportState::Panning {
            last_position: screen,
            last_time: time_ms,
        };
        delta
    }

    /// Release the pointer. Returns `true` if momentum started.
    pub fn end_pan(&mut self) -> bool {
        if !self.is_panning() {
            return false;
        }
        if self.above_threshold() {
            self.state = ViewportState::Momentum;
            true
        } else {
            self.velocity = Vec2::ZERO;
            self.state = ViewportState::Idle;
            false
        }
    }

    /// Advance momentum by one animation frame.
    ///
    /// Returns `true` while another frame is needed.
    pub fn step_momentum(&mut self) -> bool {
        if self.state != ViewportState::Momentum {
            return false;
        }

        self.camera.pan_by(self.velocity * self.config.frame_interval_ms);
        self.revision += 1;
        self.velocity *= self.config.friction;

        if self.above_threshold() {
            true
        } else {
            self.velocity = Vec2::ZERO;
            self.state = ViewportState::Idle;
            false
        }
    }

    /// Stop momentum immediately and zero the velocity. No-op unless coasting.
    pub fn cancel_momentum(&mut self) {
        if self.state == ViewportState::Momentum {
            self.state = ViewportState::Idle;
            self.velocity = Vec2::ZERO;
        }
    }

    /// Abort any pan or momentum.
    pub fn cancel(&mut self) {
        self.velocity = Vec2::ZERO;
        self.state = ViewportState::Idle;
    }

    /// Apply a wheel event anchored at `screen`. Returns whether the scale changed.
    ///
    /// Cancels momentum. An active pan keeps going.
    pub fn wheel(&mut self, screen: Point, delta_y: f64) -> bool {
        let factor = (-delta_y * self.config.zoom_sensitivity).exp();
        self.zoom_by(screen, factor)
    }

    /// Zoom by `factor` anchored at `screen`. Cancels momentum.
    pub fn zoom_by(&mut self, screen: Point, factor: f64) -> bool {
        self.cancel_momentum();
        let changed = self.camera.zoom_at(screen, factor);
        if changed {
            self.revision += 1;
        }
        changed
    }

    /// Back to 100% at the origin. Cancels momentum. Returns whether the camera moved.
    pub fn reset_zoom(&mut self) -> bool {
        self.cancel_momentum();
        let before = (self.camera.pan, self.camera.scale);
        self.camera.reset();
        let changed = before != (self.camera.pan, self.camera.scale);
        if changed {
            self.revision += 1;
        }
        changed
    }

    /// Replace the camera (e.g. fit to content). Cancels motion.
    pub fn set_camera(&mut self, camera: Camera) {
        self.cancel();
        self.camera = camera;
        self.revision += 1;
    }

    /// Mutable camera access for one-shot adjustments.
    pub fn with_camera(&mut self, f: impl FnOnce(&mut Camera)) {
        f(&mut self.camera);
        self.revision += 1;
    }

    fn above_threshold(&self) -> bool {
        let t = self.config.velocity_threshold;
        self.velocity.x.abs() > t || self.velocity.y.abs() > t
    }
}

fn sanitize(mut config: ViewportConfig) -> ViewportConfig {
    let defaults = ViewportConfig::default();
    if !(config.friction.is_finite() && config.friction >= 0.0 && config.friction < 1.0) {
        log::warn!("Friction {} must be in [0, 1), using {}", config.friction, defaults.friction);
        config.friction = defaults.friction;
    }
    if !(config.velocity_threshold.is_finite() && config.velocity_threshold > 0.0) {
        config.velocity_threshold = defaults.velocity_threshold;
    }
    if !(config.frame_interval_ms.is_finite() && config.frame_interval_ms > 0.0) {
        config.frame_interval_ms = defaults.frame_interval_ms;
    }
    if !(config.velocity_blend.is_finite() && (0.0..=1.0).contains(&config.velocity_blend)) {
        config.velocity_blend = defaults.velocity_blend;
    }
    if !config.zoom_sensitivity.is_finite() {
        config.zoom_sensitivity = defaults.zoom_sensitivity;
    }
    config
}
