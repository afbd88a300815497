/*!
# rastile Rendering Pipeline

Draws tiled raster layers into a pan/zoom/rotate viewport.

## Pipeline

1. **Resolution**: the visible extent is covered with cells of the pyramid
   level nearest to the viewport resolution; cells missing from the cache
   fall back to the coarser level for the uncovered area only
2. **Decoding**: encoded tile bytes become premultiplied bitmaps on first
   draw and stay attached to their cache entry
3. **Compositing**: each tile is placed through an affine transform built from
   the viewport; axis-aligned placements are snapped to whole device pixels so
   neighbouring tiles share an edge without seams

Failures are isolated per tile: the tile is reported to a [`FailureSink`],
evicted from its cache and the pass continues.
*/

pub mod bitmap;
pub mod cache;
pub mod compositor;
pub mod config;
pub mod error;
pub mod failure;
pub mod layer;
pub mod renderer;
pub mod resolver;
pub mod surface;
pub mod transform;

pub use bitmap::Bitmap;
pub use cache::{CacheEntry, CacheStats, MemoryCache, RasterFeature, TileCache};
pub use compositor::{round_to_pixel, Compositor, PixelRect};
pub use config::{parse_hex_color, RenderConfig};
pub use error::{RenderError, RenderResult};
pub use failure::{FailureSink, LogSink, Severity};
pub use layer::TileLayer;
pub use renderer::{RenderStats, Renderer};
pub use resolver::{resolve, DrawCommand, Resolve, ResolveStats};
pub use surface::{BlendMode, DrawingSurface, RasterSurface, Rect, TransformScope};
pub use transform::{build_tile_transform, TransformSteps};

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat, RgbaImage};

    pub fn encode_png(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img.clone())
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }
}
