/*!
# Device Transforms

Builds the affine map from a tile's local drawing box to device pixels.

The local box of a tile with world bounds `B` is `(0, 0, B.width, B.height)`
in world units with Y pointing down, origin at the tile's top-left corner.
The hosting surface may already carry a transform (DPI or retina scaling);
it is kept by composing it last:

```text
prior * center_in_screen * user_rotation * zoom_scale * focal_offset
```
*/

use glam::{DAffine2, DVec2};
use rastile_core::{Extent, Viewport};

const AXIS_EPSILON: f64 = 1e-9;

/// The four steps of the tile transform, kept apart so each can be inspected
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSteps {
    pub focal_offset: DAffine2,
    pub zoom_scale: DAffine2,
    pub user_rotation: DAffine2,
    pub center_in_screen: DAffine2,
}

impl TransformSteps {
    pub fn new(viewport: &Viewport, bounds: &Extent) -> Self {
        let focal_offset = DAffine2::from_translation(DVec2::new(
            bounds.min_x - viewport.center_x,
            viewport.center_y - bounds.max_y,
        ));
        let zoom = 1.0 / viewport.resolution;
        let zoom_scale = DAffine2::from_scale(DVec2::splat(zoom));
        let user_rotation = DAffine2::from_angle(viewport.rotation.to_radians());
        let center_in_screen = DAffine2::from_translation(DVec2::new(
            viewport.width as f64 / 2.0,
            viewport.height as f64 / 2.0,
        ));

        Self {
            focal_offset,
            zoom_scale,
            user_rotation,
            center_in_screen,
        }
    }

    /// Compose the steps, applying the prior surface transform last
    pub fn compose(&self, prior: DAffine2) -> DAffine2 {
        prior * self.center_in_screen * self.user_rotation * (self.zoom_scale * self.focal_offset)
    }
}

/// Transform that places the local box of `bounds` on the device
pub fn build_tile_transform(viewport: &Viewport, bounds: &Extent, prior: DAffine2) -> DAffine2 {
    TransformSteps::new(viewport, bounds).compose(prior)
}

/// True when the transform only applies a positive scale and a translation.
/// Half-turns and mirrors keep the axes but flip the image, so they do not count.
pub fn is_axis_aligned(transform: &DAffine2) -> bool {
    let m = transform.matrix2;
    m.x_axis.y.abs() < AXIS_EPSILON && m.y_axis.x.abs() < AXIS_EPSILON && m.x_axis.x > 0.0 && m.y_axis.y > 0.0
}

/// Bounding box of `transform` applied to the rectangle `(left, top)..(right, bottom)`
pub fn transformed_bounds(transform: &DAffine2, left: f64, top: f64, right: f64, bottom: f64) -> [f64; 4] {
    let corners = [
        transform.transform_point2(DVec2::new(left, top)),
        transform.transform_point2(DVec2::new(right, top)),
        transform.transform_point2(DVec2::new(right, bottom)),
        transform.transform_point2(DVec2::new(left, bottom)),
    ];
    let mut min = corners[0];
    let mut max = corners[0];
    for corner in &corners[1..] {
        min = min.min(*corner);
        max = max.max(*corner);
    }
    [min.x, min.y, max.x, max.y]
}
