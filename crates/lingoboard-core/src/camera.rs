//! Camera module for pan/zoom transforms.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Scale that corresponds to "100%" in the UI.
pub const BASE_SCALE: f64 = 1.0;
/// Default minimum scale.
pub const MIN_SCALE: f64 = 0.1;
/// Default maximum scale.
pub const MAX_SCALE: f64 = 4.0;

/// Camera holds the view transform of the whiteboard.
///
/// `screen = world * scale + pan`. The camera is transient view state and is
/// never persisted with the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Screen position of the world origin.
    pub pan: Vec2,
    /// Current zoom level.
    pub scale: f64,
    pub min_scale: f64,
    pub max_scale: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            scale: BASE_SCALE,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a camera with custom scale bounds.
    pub fn with_bounds(min_scale: f64, max_scale: f64) -> Self {
        let (min_scale, max_scale) = if min_scale > 0.0 && min_scale <= max_scale {
            (min_scale, max_scale)
        } else {
            log::warn!("Invalid scale bounds [{}, {}], using defaults", min_scale, max_scale);
            (MIN_SCALE, MAX_SCALE)
        };
        Self {
            scale: BASE_SCALE.clamp(min_scale, max_scale),
            min_scale,
            max_scale,
            ..Self::default()
        }
    }

    /// World-to-screen transform, applied directly to the rendered layer.
    pub fn affine(&self) -> Affine {
        Affine::translate(self.pan) * Affine::scale(self.scale)
    }

    /// Screen-to-world transform for input handling.
    pub fn inverse_affine(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.pan)
    }

    /// Convert a screen point to world coordinates: `(screen - pan) / scale`.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        Point::new(
            (screen_point.x - self.pan.x) / self.scale,
            (screen_point.y - self.pan.y) / self.scale,
        )
    }

    /// Convert a world point to screen coordinates: `world * scale + pan`.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        Point::new(
            world_point.x * self.scale + self.pan.x,
            world_point.y * self.scale + self.pan.y,
        )
    }

    /// Pan the camera by a delta in screen coordinates.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Zoom by `factor`, keeping the world point under `screen_point` fixed.
    ///
    /// Returns whether the scale changed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let new_scale = (self.scale * factor).clamp(self.min_scale, self.max_scale);
        if (new_scale - self.scale).abs() < f64::EPSILON {
            return false;
        }

        // World point under the cursor with the old transform
        let world_point = self.screen_to_world(screen_point);

        self.scale = new_scale;

        // Solve pan so the same world point maps back to the cursor
        self.pan = Vec2::new(
            screen_point.x - world_point.x * new_scale,
            screen_point.y - world_point.y * new_scale,
        );
        true
    }

    /// Reset camera to default position and zoom.
    pub fn reset(&mut self) {
        self.pan = Vec2::ZERO;
        self.scale = BASE_SCALE.clamp(self.min_scale, self.max_scale);
    }

    /// Visible world rectangle for a viewport of the given size.
    pub fn visible_world_rect(&self, viewport: Size) -> Rect {
        let top_left = self.screen_to_world(Point::ZERO);
        let bottom_right = self.screen_to_world(Point::new(viewport.width, viewport.height));
        Rect::from_points(top_left, bottom_right)
    }

    /// Fit the camera to show the given bounding box.
    pub fn fit_to_bounds(&mut self, bounds: Rect, viewport: Size, padding: f64) {
        if bounds.is_zero_area() {
            self.reset();
            return;
        }

        let padded_viewport = Size::new(
            (viewport.width - padding * 2.0).max(1.0),
            (viewport.height - padding * 2.0).max(1.0),
        );

        let scale_x = padded_viewport.width / bounds.width();
        let scale_y = padded_viewport.height / bounds.height();
        self.scale = scale_x.min(scale_y).clamp(self.min_scale, self.max_scale);

        // Center the bounds in the viewport
        let bounds_center = bounds.center();
        let viewport_center = Point::new(viewport.width / 2.0, viewport.height / 2.0);

        self.pan = Vec2::new(
            viewport_center.x - bounds_center.x * self.scale,
            viewport_center.y - bounds_center.y * self.scale,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera() {
        let camera = Camera::new();
        assert_eq!(camera.pan, Vec2::ZERO);
        assert!((camera.scale - BASE_SCALE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_screen_to_world_with_pan() {
        let mut camera = Camera::new();
        camera.pan = Vec2::new(50.0, 100.0);
        let world = camera.screen_to_world(Point::new(100.0, 200.0));
        assert!((world.x - 50.0).abs() < f64::EPSILON);
        assert!((world.y - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_screen_to_world_with_scale() {
        let mut camera = Camera::new();
        camera.scale = 2.0;
        let world = camera.screen_to_world(Point::new(100.0, 200.0));
        assert!((world.x - 50.0).abs() < f64::EPSILON);
        assert!((world.y - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_roundtrip_conversion() {
        let mut camera = Camera::new();
        camera.pan = Vec2::new(30.0, -20.0);
        camera.scale = 1.5;

        let original = Point::new(123.0, 456.0);
        let back = camera.world_to_screen(camera.screen_to_world(original));
        assert!((back.x - original.x).abs() < 1e-10);
        assert!((back.y - original.y).abs() < 1e-10);
    }

    #[test]
    fn test_affine_matches_point_conversion() {
        let mut camera = Camera::new();
        camera.pan = Vec2::new(12.0, 34.0);
        camera.scale = 0.75;

        let world = Point::new(-80.0, 250.0);
        let via_affine = camera.affine() * world;
        let direct = camera.world_to_screen(world);
        assert!((via_affine.x - direct.x).abs() < 1e-10);
        assert!((via_affine.y - direct.y).abs() < 1e-10);

        let screen = Point::new(400.0, 300.0);
        let inv = camera.inverse_affine() * screen;
        let direct = camera.screen_to_world(screen);
        assert!((inv.x - direct.x).abs() < 1e-10);
        assert!((inv.y - direct.y).abs() < 1e-10);
    }

    #[test]
    fn test_zoom_keeps_cursor_anchored() {
        let mut camera = Camera::new();
        camera.pan = Vec2::new(-37.0, 81.0);
        camera.scale = 1.3;

        let cursor = Point::new(412.0, 287.0);
        let before = camera.screen_to_world(cursor);
        assert!(camera.zoom_at(cursor, 1.7));
        let after = camera.screen_to_world(cursor);

        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_clamp() {
        let mut camera = Camera::new();
        camera.zoom_at(Point::ZERO, 0.001);
        assert!((camera.scale - camera.min_scale).abs() < f64::EPSILON);

        camera.zoom_at(Point::ZERO, 1000.0);
        assert!((camera.scale - camera.max_scale).abs() < f64::EPSILON);

        // Already at the limit: nothing changes
        assert!(!camera.zoom_at(Point::ZERO, 2.0));
        assert!(!camera.zoom_at(Point::ZERO, f64::NAN));
    }

    #[test]
    fn test_pan() {
        let mut camera = Camera::new();
        camera.pan_by(Vec2::new(10.0, 20.0));
        assert!((camera.pan.x - 10.0).abs() < f64::EPSILON);
        assert!((camera.pan.y - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fit_to_bounds_centers_content() {
        let mut camera = Camera::new();
        let bounds = Rect::new(0.0, 0.0, 1000.0, 500.0);
        let viewport = Size::new(800.0, 600.0);
        camera.fit_to_bounds(bounds, viewport, 50.0);

        assert!((camera.scale - 0.7).abs() < 1e-9);
        let center = camera.world_to_screen(bounds.center());
        assert!((center.x - 400.0).abs() < 1e-9);
        assert!((center.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_bounds_fall_back() {
        let camera = Camera::with_bounds(5.0, 1.0);
        assert_eq!(camera.min_scale, MIN_SCALE);
        assert_eq!(camera.max_scale, MAX_SCALE);
    }
}
