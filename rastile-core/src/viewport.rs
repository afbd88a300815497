use serde::{Deserialize, Serialize};

use crate::types::Extent;

/// Snapshot of the map view for one render pass.
///
/// `resolution` is world units per device pixel. `rotation` is in degrees and
/// turns the map clockwise on screen (device Y points down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center_x: f64,
    pub center_y: f64,
    pub resolution: f64,
    #[serde(default)]
    pub rotation: f64,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(center_x: f64, center_y: f64, resolution: f64, width: u32, height: u32) -> Self {
        Self {
            center_x,
            center_y,
            resolution,
            rotation: 0.0,
            width,
            height,
        }
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.center_x.is_finite()
            && self.center_y.is_finite()
            && self.rotation.is_finite()
            && self.resolution.is_finite()
            && self.resolution > 0.0
            && self.width > 0
            && self.height > 0
    }

    pub fn is_rotated(&self) -> bool {
        self.rotation % 360.0 != 0.0
    }

    /// World extent covered by the device rectangle. With a rotation this is the
    /// bounding box of the rotated rectangle, so it covers every visible point.
    pub fn extent(&self) -> Extent {
        let mut half_w = self.width as f64 * self.resolution * 0.5;
        let mut half_h = self.height as f64 * self.resolution * 0.5;

        if self.is_rotated() {
            let (sin, cos) = self.rotation.to_radians().sin_cos();
            let rotated_w = (half_w * cos).abs() + (half_h * sin).abs();
            let rotated_h = (half_w * sin).abs() + (half_h * cos).abs();
            half_w = rotated_w;
            half_h = rotated_h;
        }

        Extent::new(
            self.center_x - half_w,
            self.center_y - half_h,
            self.center_x + half_w,
            self.center_y + half_h,
        )
    }

    pub fn world_to_screen(&self, world_x: f64, world_y: f64) -> (f64, f64) {
        let dx = (world_x - self.center_x) / self.resolution;
        let dy = (self.center_y - world_y) / self.resolution;
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        (
            cos * dx - sin * dy + self.width as f64 * 0.5,
            sin * dx + cos * dy + self.height as f64 * 0.5,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_extent_without_rotation() {
        let vp = Viewport::new(100.0, 50.0, 2.0, 200, 100);
        assert_eq!(vp.extent(), Extent::new(-100.0, -50.0, 300.0, 150.0));
    }

    #[test]
    fn test_extent_with_quarter_turn_swaps_axes() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 200, 100).with_rotation(90.0);
        let extent = vp.extent();
        assert!((extent.width() - 100.0).abs() < EPS);
        assert!((extent.height() - 200.0).abs() < EPS);
    }

    #[test]
    fn test_world_to_screen_maps_center_and_corners() {
        let vp = Viewport::new(100.0, 50.0, 2.0, 200, 100);
        assert_eq!(vp.world_to_screen(100.0, 50.0), (100.0, 50.0));

        let extent = vp.extent();
        let (x, y) = vp.world_to_screen(extent.min_x, extent.max_y);
        assert!(x.abs() < EPS && y.abs() < EPS);
        let (x, y) = vp.world_to_screen(extent.max_x, extent.min_y);
        assert!((x - 200.0).abs() < EPS && (y - 100.0).abs() < EPS);
    }

    #[test]
    fn test_invalid_viewports() {
        assert!(Viewport::new(0.0, 0.0, 1.0, 10, 10).is_valid());
        assert!(!Viewport::new(0.0, 0.0, 0.0, 10, 10).is_valid());
        assert!(!Viewport::new(0.0, 0.0, 1.0, 0, 10).is_valid());
        assert!(!Viewport::new(f64::NAN, 0.0, 1.0, 10, 10).is_valid());
    }

    #[test]
    fn test_rotation_defaults_when_deserializing() {
        let vp: Viewport = serde_json::from_str(
            r#"{"center_x":1.0,"center_y":2.0,"resolution":0.5,"width":10,"height":20}"#,
        )
        .unwrap();
        assert_eq!(vp.rotation, 0.0);
    }
}
