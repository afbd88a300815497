/*!
# Drawing Surfaces

The renderer only needs three things from a destination: read its current
transform, replace it, and draw a bitmap into a rectangle. [`RasterSurface`] is
the in-memory implementation used by the CLI and the tests.
*/

use std::ops::{Deref, DerefMut};
use std::path::Path;

use glam::{DAffine2, DVec2};
use image::{DynamicImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::bitmap::{mul_div255, premultiply, unpremultiply, Bitmap};
use crate::error::{RenderError, RenderResult};
use crate::transform::transformed_bounds;

/// Slack allowed when checking a source rectangle against bitmap bounds
const SOURCE_EPSILON: f64 = 1e-6;

/// Rectangle in surface-local coordinates, Y pointing down
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn is_finite(&self) -> bool {
        self.left.is_finite() && self.top.is_finite() && self.right.is_finite() && self.bottom.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    /// Alpha blending, source over destination
    #[default]
    SourceOver,
    /// Replace destination pixels
    Copy,
}

impl BlendMode {
    /// Blend premultiplied `src` onto premultiplied `dst`
    pub fn apply(self, src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
        match self {
            BlendMode::Copy => src,
            BlendMode::SourceOver => {
                let keep = 255 - src.0[3];
                Rgba([
                    src.0[0].saturating_add(mul_div255(dst.0[0], keep)),
                    src.0[1].saturating_add(mul_div255(dst.0[1], keep)),
                    src.0[2].saturating_add(mul_div255(dst.0[2], keep)),
                    src.0[3].saturating_add(mul_div255(dst.0[3], keep)),
                ])
            }
        }
    }
}

/// Tint applied while drawing: white with alpha `opacity`
pub fn opacity_tint(opacity: f64) -> Rgba<u8> {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([255, 255, 255, alpha])
}

/// Multiply a premultiplied texel by a straight-alpha tint color
fn apply_tint(src: Rgba<u8>, tint: Rgba<u8>) -> Rgba<u8> {
    if tint.0 == [255, 255, 255, 255] {
        return src;
    }
    let [tr, tg, tb, ta] = tint.0;
    Rgba([
        mul_div255(mul_div255(src.0[0], tr), ta),
        mul_div255(mul_div255(src.0[1], tg), ta),
        mul_div255(mul_div255(src.0[2], tb), ta),
        mul_div255(src.0[3], ta),
    ])
}

pub trait DrawingSurface {
    /// Transform from local drawing coordinates to device pixels
    fn transform(&self) -> DAffine2;

    fn set_transform(&mut self, transform: DAffine2);

    /// Draw the `source` region of `bitmap` (bitmap pixel coordinates) stretched
    /// over `dest` (local coordinates). Implementations must validate before
    /// writing any pixel, so a failed call leaves the surface untouched.
    fn draw_bitmap(
        &mut self,
        bitmap: &Bitmap,
        dest: Rect,
        source: Rect,
        blend: BlendMode,
        tint: Rgba<u8>,
    ) -> RenderResult<()>;
}

/// Installs a transform on a surface and puts the previous one back when dropped
pub struct TransformScope<'a, S: DrawingSurface + ?Sized> {
    surface: &'a mut S,
    prior: DAffine2,
}

impl<'a, S: DrawingSurface + ?Sized> TransformScope<'a, S> {
    pub fn install(surface: &'a mut S, transform: DAffine2) -> Self {
        let prior = surface.transform();
        surface.set_transform(transform);
        Self { surface, prior }
    }

    pub fn prior(&self) -> DAffine2 {
        self.prior
    }
}

impl<S: DrawingSurface + ?Sized> Deref for TransformScope<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: DrawingSurface + ?Sized> DerefMut for TransformScope<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: DrawingSurface + ?Sized> Drop for TransformScope<'_, S> {
    fn drop(&mut self) {
        self.surface.set_transform(self.prior);
    }
}

/// CPU surface over a premultiplied RGBA8 buffer
#[derive(Debug, Clone)]
pub struct RasterSurface {
    pixels: RgbaImage,
    transform: DAffine2,
}

impl RasterSurface {
    /// Transparent surface with the identity transform
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            transform: DAffine2::IDENTITY,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Fill with a straight-alpha color
    pub fn clear(&mut self, color: Rgba<u8>) {
        let fill = premultiply(color);
        for pixel in self.pixels.pixels_mut() {
            *pixel = fill;
        }
    }

    /// Premultiplied pixel, `None` outside the surface
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.pixels.get_pixel_checked(x, y).copied()
    }

    /// Copy of the surface with straight alpha, ready for encoding
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut out = self.pixels.clone();
        for pixel in out.pixels_mut() {
            *pixel = unpremultiply(*pixel);
        }
        out
    }

    /// Encode to PNG or JPEG, picked from the file extension. JPEG has no
    /// alpha channel, so the image is flattened first.
    pub fn save(&self, path: &Path) -> RenderResult<()> {
        let image = self.to_rgba_image();
        let is_jpeg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
        let result = if is_jpeg {
            DynamicImage::ImageRgba8(image).to_rgb8().save(path)
        } else {
            image.save(path)
        };
        result.map_err(|err| RenderError::composite(format!("cannot write {}: {}", path.display(), err)))
    }
}

impl DrawingSurface for RasterSurface {
    fn transform(&self) -> DAffine2 {
        self.transform
    }

    fn set_transform(&mut self, transform: DAffine2) {
        self.transform = transform;
    }

    fn draw_bitmap(
        &mut self,
        bitmap: &Bitmap,
        dest: Rect,
        source: Rect,
        blend: BlendMode,
        tint: Rgba<u8>,
    ) -> RenderResult<()> {
        if bitmap.is_empty() {
            return Err(RenderError::composite("bitmap has no pixels"));
        }
        if !dest.is_finite() || !source.is_finite() {
            return Err(RenderError::composite("non-finite draw rectangle"));
        }
        let (bw, bh) = (bitmap.width() as f64, bitmap.height() as f64);
        if source.width() <= 0.0
            || source.height() <= 0.0
            || source.left < -SOURCE_EPSILON
            || source.top < -SOURCE_EPSILON
            || source.right > bw + SOURCE_EPSILON
            || source.bottom > bh + SOURCE_EPSILON
        {
            return Err(RenderError::composite(format!(
                "source rectangle {:?} outside {}x{} bitmap",
                source,
                bitmap.width(),
                bitmap.height()
            )));
        }
        let transform = self.transform;
        if !transform.is_finite() || transform.matrix2.determinant().abs() < f64::EPSILON {
            return Err(RenderError::composite("surface transform is not invertible"));
        }
        if dest.width() <= 0.0 || dest.height() <= 0.0 {
            return Ok(());
        }

        let inverse = transform.inverse();
        let [x0, y0, x1, y1] = transformed_bounds(&transform, dest.left, dest.top, dest.right, dest.bottom);
        let px_start = x0.floor().max(0.0) as u32;
        let py_start = y0.floor().max(0.0) as u32;
        let px_end = (x1.ceil().max(0.0) as u32).min(self.width());
        let py_end = (y1.ceil().max(0.0) as u32).min(self.height());

        let scale_x = source.width() / dest.width();
        let scale_y = source.height() / dest.height();
        let max_tx = bitmap.width() as i64 - 1;
        let max_ty = bitmap.height() as i64 - 1;
        let texels = bitmap.as_image();

        for py in py_start..py_end {
            for px in px_start..px_end {
                // Sample at the pixel center
                let local = inverse.transform_point2(DVec2::new(px as f64 + 0.5, py as f64 + 0.5));
                if local.x < dest.left || local.x >= dest.right || local.y < dest.top || local.y >= dest.bottom {
                    continue;
                }

                let u = source.left + (local.x - dest.left) * scale_x;
                let v = source.top + (local.y - dest.top) * scale_y;
                let tx = (u.floor() as i64).clamp(0, max_tx) as u32;
                let ty = (v.floor() as i64).clamp(0, max_ty) as u32;

                let src = apply_tint(*texels.get_pixel(tx, ty), tint);
                let dst = self.pixels.get_pixel_mut(px, py);
                *dst = blend.apply(src, *dst);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, color: [u8; 4]) -> Bitmap {
        Bitmap::from_rgba(RgbaImage::from_pixel(w, h, Rgba(color)))
    }

    #[test]
    fn test_transform_scope_restores_prior() {
        let mut surface = RasterSurface::new(4, 4);
        let prior = DAffine2::from_scale(DVec2::splat(2.0));
        surface.set_transform(prior);
        {
            let scope = TransformScope::install(&mut surface, DAffine2::IDENTITY);
            assert_eq!(scope.transform(), DAffine2::IDENTITY);
            assert_eq!(scope.prior(), prior);
        }
        assert_eq!(surface.transform(), prior);
    }

    #[test]
    fn test_transform_scope_restores_on_error_path() {
        fn failing_draw(surface: &mut RasterSurface) -> RenderResult<()> {
            let mut scope = TransformScope::install(surface, DAffine2::from_scale(DVec2::ZERO));
            let bitmap = solid(2, 2, [255, 0, 0, 255]);
            scope.draw_bitmap(
                &bitmap,
                Rect::from_size(2.0, 2.0),
                Rect::from_size(2.0, 2.0),
                BlendMode::SourceOver,
                opacity_tint(1.0),
            )?;
            Ok(())
        }

        let mut surface = RasterSurface::new(4, 4);
        assert!(failing_draw(&mut surface).is_err());
        assert_eq!(surface.transform(), DAffine2::IDENTITY);
    }

    #[test]
    fn test_blit_fills_exact_integer_rect() {
        let mut surface = RasterSurface::new(6, 6);
        let bitmap = solid(2, 2, [0, 255, 0, 255]);
        surface
            .draw_bitmap(
                &bitmap,
                Rect::new(1.0, 2.0, 4.0, 5.0),
                Rect::from_size(2.0, 2.0),
                BlendMode::SourceOver,
                opacity_tint(1.0),
            )
            .unwrap();

        for y in 0..6 {
            for x in 0..6 {
                let inside = (1..4).contains(&x) && (2..5).contains(&y);
                let expected = if inside { [0, 255, 0, 255] } else { [0, 0, 0, 0] };
                assert_eq!(surface.pixel(x, y).unwrap().0, expected, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_source_rect_selects_sub_image() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        let bitmap = Bitmap::from_rgba(img);

        let mut surface = RasterSurface::new(4, 4);
        surface
            .draw_bitmap(
                &bitmap,
                Rect::from_size(4.0, 4.0),
                Rect::new(1.0, 0.0, 2.0, 1.0),
                BlendMode::Copy,
                opacity_tint(1.0),
            )
            .unwrap();
        assert_eq!(surface.pixel(0, 0).unwrap().0, [0, 0, 255, 255]);
        assert_eq!(surface.pixel(3, 3).unwrap().0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_invalid_source_leaves_surface_untouched() {
        let mut surface = RasterSurface::new(4, 4);
        surface.clear(Rgba([255, 255, 255, 255]));
        let before = surface.to_rgba_image();

        let err = surface
            .draw_bitmap(
                &solid(2, 2, [0, 0, 0, 255]),
                Rect::from_size(4.0, 4.0),
                Rect::from_size(3.0, 2.0),
                BlendMode::SourceOver,
                opacity_tint(1.0),
            )
            .unwrap_err();
        assert!(matches!(err, RenderError::Composite { .. }));
        assert_eq!(surface.to_rgba_image(), before);
    }

    #[test]
    fn test_opacity_blends_over_background() {
        let mut surface = RasterSurface::new(1, 1);
        surface.clear(Rgba([255, 255, 255, 255]));
        surface
            .draw_bitmap(
                &solid(1, 1, [0, 0, 0, 255]),
                Rect::from_size(1.0, 1.0),
                Rect::from_size(1.0, 1.0),
                BlendMode::SourceOver,
                opacity_tint(0.5),
            )
            .unwrap();
        assert_eq!(surface.pixel(0, 0).unwrap().0, [127, 127, 127, 255]);
    }

    #[test]
    fn test_rotated_draw_covers_center() {
        let mut surface = RasterSurface::new(10, 10);
        surface.set_transform(
            DAffine2::from_translation(DVec2::new(5.0, 5.0))
                * DAffine2::from_angle(std::f64::consts::FRAC_PI_4)
                * DAffine2::from_translation(DVec2::new(-2.0, -2.0)),
        );
        surface
            .draw_bitmap(
                &solid(1, 1, [255, 0, 0, 255]),
                Rect::from_size(4.0, 4.0),
                Rect::from_size(1.0, 1.0),
                BlendMode::SourceOver,
                opacity_tint(1.0),
            )
            .unwrap();
        assert_eq!(surface.pixel(5, 5).unwrap().0, [255, 0, 0, 255]);
        // Corners of the surface stay outside the rotated square
        assert_eq!(surface.pixel(0, 0).unwrap().0, [0, 0, 0, 0]);
        assert_eq!(surface.pixel(9, 9).unwrap().0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_to_rgba_image_unpremultiplies() {
        let mut surface = RasterSurface::new(1, 1);
        surface.clear(Rgba([200, 100, 50, 255]));
        assert_eq!(surface.to_rgba_image().get_pixel(0, 0).0, [200, 100, 50, 255]);
    }
}
