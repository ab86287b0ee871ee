//! 2D camera that follows the character.
//!
//! The camera position is the world coordinate of the top-left corner of the
//! viewport. Projectile culling uses the unzoomed viewport; the optional map
//! bounds clamp takes zoom into account.

use serde::{Deserialize, Serialize};
use tilequest_common::{Rect, Vec2};

/// Minimum zoom level.
pub const MIN_ZOOM: f32 = 0.25;
/// Maximum zoom level.
pub const MAX_ZOOM: f32 = 4.0;
/// Default zoom level.
pub const DEFAULT_ZOOM: f32 = 1.0;

/// Camera over the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Top-left corner in world coordinates
    pub position: Vec2,
    /// Viewport size in screen pixels
    pub viewport: Vec2,
    /// Zoom level (1.0 = 1:1)
    pub zoom: f32,
    /// Region the view must stay inside, if any
    pub bounds: Option<Rect>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

impl Camera {
    /// Creates a camera at the origin with the given viewport size.
    #[must_use]
    pub fn new(viewport_width: f32, viewport_height: f32) -> Self {
        Self {
            position: Vec2::ZERO,
            viewport: Vec2::new(viewport_width, viewport_height),
            zoom: DEFAULT_ZOOM,
            bounds: None,
        }
    }

    /// Sets the zoom (clamped).
    #[must_use]
    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.set_zoom(zoom);
        self
    }

    /// Sets the bounds clamp.
    #[must_use]
    pub fn with_bounds(mut self, bounds: Option<Rect>) -> Self {
        self.bounds = bounds;
        self
    }

    /// Sets the zoom (clamped).
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = if zoom.is_finite() {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            DEFAULT_ZOOM
        };
    }

    /// Resizes the viewport.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = Vec2::new(width.max(0.0), height.max(0.0));
    }

    /// Centers the viewport on `target`, then applies the bounds clamp.
    pub fn center_on(&mut self, target: Vec2) {
        self.position = target - self.viewport / 2.0;
        self.clamp_to_bounds();
    }

    fn clamp_to_bounds(&mut self) {
        let Some(bounds) = self.bounds else {
            return;
        };
        let view = self.visible_size();
        let max_x = bounds.x.max(bounds.right() - view.x);
        let max_y = bounds.y.max(bounds.bottom() - view.y);
        self.position.x = self.position.x.clamp(bounds.x, max_x);
        self.position.y = self.position.y.clamp(bounds.y, max_y);
    }

    /// World-space size covered by the viewport at the current zoom.
    #[must_use]
    pub fn visible_size(&self) -> Vec2 {
        self.viewport / self.zoom
    }

    /// Unzoomed view rectangle used for projectile culling.
    #[must_use]
    pub fn view_rect(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.viewport.x, self.viewport.y)
    }

    /// Converts a screen point to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        screen + self.position
    }

    /// Converts a world point to screen coordinates.
    #[must_use]
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        world - self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_on() {
        let mut camera = Camera::new(800.0, 600.0);
        camera.center_on(Vec2::new(1000.0, 1000.0));
        assert_eq!(camera.position, Vec2::new(600.0, 700.0));
        assert_eq!(camera.view_rect(), Rect::new(600.0, 700.0, 800.0, 600.0));
    }

    #[test]
    fn test_bounds_clamp() {
        let mut camera =
            Camera::new(800.0, 600.0).with_bounds(Some(Rect::new(0.0, 0.0, 2000.0, 1000.0)));
        camera.center_on(Vec2::new(10.0, 10.0));
        assert_eq!(camera.position, Vec2::ZERO);

        camera.center_on(Vec2::new(1990.0, 990.0));
        assert_eq!(camera.position, Vec2::new(1200.0, 400.0));
    }

    #[test]
    fn test_bounds_clamp_with_zoom() {
        let mut camera = Camera::new(800.0, 600.0)
            .with_zoom(2.0)
            .with_bounds(Some(Rect::new(0.0, 0.0, 2000.0, 1000.0)));
        camera.center_on(Vec2::new(1990.0, 990.0));
        assert_eq!(camera.position, Vec2::new(1590.0, 690.0));
        camera.center_on(Vec2::new(5000.0, 5000.0));
        assert_eq!(camera.position, Vec2::new(1600.0, 700.0));
    }

    #[test]
    fn test_bounds_smaller_than_view() {
        let mut camera =
            Camera::new(800.0, 600.0).with_bounds(Some(Rect::new(100.0, 100.0, 300.0, 200.0)));
        camera.center_on(Vec2::new(5000.0, 5000.0));
        assert_eq!(camera.position, Vec2::new(100.0, 100.0));
    }

    #[test]
    fn test_screen_world_conversion() {
        let mut camera = Camera::new(800.0, 600.0);
        camera.position = Vec2::new(50.0, 25.0);
        let world = camera.screen_to_world(Vec2::new(10.0, 10.0));
        assert_eq!(world, Vec2::new(60.0, 35.0));
        assert_eq!(camera.world_to_screen(world), Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_zoom_clamped() {
        let camera = Camera::default().with_zoom(100.0);
        assert_eq!(camera.zoom, MAX_ZOOM);
        let camera = Camera::default().with_zoom(f32::NAN);
        assert_eq!(camera.zoom, DEFAULT_ZOOM);
    }
}
