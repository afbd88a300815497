/*!
# Compositor

Blends tile bitmaps into a drawing surface. Axis-aligned placements are snapped
to whole device pixels by rounding each edge on its own, so neighbouring tiles
that share a world boundary also share a pixel boundary.
*/

use glam::DAffine2;

use crate::bitmap::Bitmap;
use crate::cache::CacheEntry;
use crate::error::RenderResult;
use crate::surface::{opacity_tint, BlendMode, DrawingSurface, Rect, TransformScope};
use crate::transform::{is_axis_aligned, transformed_bounds};

/// Device coordinates past this are never snapped; the placement is drawn
/// through its transform instead
const SNAP_LIMIT: f64 = 1e9;

/// Device rectangle with integer edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl PixelRect {
    pub fn width(&self) -> i64 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i64 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn to_rect(self) -> Rect {
        Rect::new(self.left as f64, self.top as f64, self.right as f64, self.bottom as f64)
    }
}

/// Round every edge to the nearest pixel. Width and height follow from the
/// rounded edges rather than being rounded themselves.
pub fn round_to_pixel(rect: Rect) -> PixelRect {
    PixelRect {
        left: rect.left.round() as i64,
        top: rect.top.round() as i64,
        right: rect.right.round() as i64,
        bottom: rect.bottom.round() as i64,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compositor {
    blend: BlendMode,
    opacity: f64,
}

impl Compositor {
    pub fn new(blend: BlendMode, opacity: f64) -> Self {
        Self {
            blend,
            opacity: opacity.clamp(0.0, 1.0),
        }
    }

    pub fn blend(&self) -> BlendMode {
        self.blend
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Device rectangle `dest` would occupy under the surface's current
    /// transform, if that transform is axis-aligned and the rectangle lies
    /// within a representable pixel range
    pub fn snapped_rect<S: DrawingSurface + ?Sized>(surface: &S, dest: Rect) -> Option<PixelRect> {
        let transform = surface.transform();
        if !is_axis_aligned(&transform) {
            return None;
        }
        let bounds = transformed_bounds(&transform, dest.left, dest.top, dest.right, dest.bottom);
        if bounds.iter().any(|edge| !edge.is_finite() || edge.abs() > SNAP_LIMIT) {
            return None;
        }
        let [left, top, right, bottom] = bounds;
        Some(round_to_pixel(Rect::new(left, top, right, bottom)))
    }

    /// Draw the `source` region of `bitmap` over `dest`, given in the surface's
    /// current coordinate system
    pub fn composite<S: DrawingSurface + ?Sized>(
        &self,
        surface: &mut S,
        bitmap: &Bitmap,
        dest: Rect,
        source: Rect,
    ) -> RenderResult<()> {
        let tint = opacity_tint(self.opacity);

        match Self::snapped_rect(surface, dest) {
            Some(pixels) => {
                if pixels.is_empty() {
                    return Ok(());
                }
                let mut device = TransformScope::install(surface, DAffine2::IDENTITY);
                device.draw_bitmap(bitmap, pixels.to_rect(), source, self.blend, tint)
            }
            None => surface.draw_bitmap(bitmap, dest, source, self.blend, tint),
        }
    }

    /// Composite and stamp `entry` as used in pass `iteration`
    pub fn composite_entry<S: DrawingSurface + ?Sized>(
        &self,
        surface: &mut S,
        entry: &CacheEntry,
        bitmap: &Bitmap,
        dest: Rect,
        source: Rect,
        iteration: u64,
    ) -> RenderResult<()> {
        self.composite(surface, bitmap, dest, source)?;
        entry.touch(iteration);
        Ok(())
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(BlendMode::SourceOver, 1.0)
    }
}
