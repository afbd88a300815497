/*!
# Renderer

Drives one render pass: for every visible layer it picks the pyramid level
closest to the viewport resolution, resolves the visible extent against the
layer's cache and composites each resulting tile. A tile that fails to decode
or draw is reported, dropped from its cache and skipped; the rest of the pass
carries on.
*/

use std::sync::Arc;

use rastile_core::{Extent, Viewport};

use crate::bitmap::Bitmap;
use crate::cache::CacheEntry;
use crate::compositor::Compositor;
use crate::config::RenderConfig;
use crate::error::RenderResult;
use crate::failure::{FailureSink, LogSink, Severity};
use crate::layer::TileLayer;
use crate::resolver::{resolve, DrawCommand};
use crate::surface::{DrawingSurface, Rect, TransformScope};
use crate::transform::build_tile_transform;

/// Outcome of one render pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub iteration: u64,
    pub layers_rendered: usize,
    pub layers_skipped: usize,
    pub drawn: usize,
    /// Draws that used a coarser ancestor tile
    pub fallback_drawn: usize,
    pub failed: usize,
}

pub struct Renderer {
    config: RenderConfig,
    iteration: u64,
    sink: Arc<dyn FailureSink>,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            iteration: 0,
            sink: Arc::new(LogSink),
        }
    }

    pub fn with_failure_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Counter of the last render pass, 0 before the first one
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Render all visible layers, bottom first
    pub fn render<S: DrawingSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        viewport: &Viewport,
        layers: &[TileLayer],
    ) -> RenderStats {
        self.iteration += 1;
        let mut stats = RenderStats {
            iteration: self.iteration,
            ..Default::default()
        };

        if !viewport.is_valid() {
            log::warn!("Skipping render pass {}: invalid viewport {:?}", self.iteration, viewport);
            return stats;
        }

        for layer in layers {
            if !layer.is_visible_at(viewport.resolution) {
                stats.layers_skipped += 1;
                continue;
            }
            self.render_layer(surface, viewport, layer, &mut stats);
            stats.layers_rendered += 1;
        }

        log::debug!(
            "Render pass {}: {} tiles drawn ({} fallback), {} failed",
            stats.iteration,
            stats.drawn,
            stats.fallback_drawn,
            stats.failed
        );
        stats
    }

    fn render_layer<S: DrawingSurface + ?Sized>(
        &self,
        surface: &mut S,
        viewport: &Viewport,
        layer: &TileLayer,
        stats: &mut RenderStats,
    ) {
        let level = layer.schema.nearest_level(viewport.resolution);
        let compositor = Compositor::new(self.config.blend_mode, self.layer_opacity(layer));

        let mut walk = resolve(layer.schema.as_ref(), layer.cache.as_ref(), viewport.extent(), level);
        if let Some(depth) = self.config.max_fallback_depth {
            walk = walk.with_fallback_depth(depth);
        }

        for command in walk.by_ref() {
            match self.draw_command(surface, viewport, &command, &compositor) {
                Ok(()) => {
                    stats.drawn += 1;
                    if command.is_fallback() {
                        stats.fallback_drawn += 1;
                    }
                }
                Err(err) => {
                    stats.failed += 1;
                    let message = format!("Failed to draw tile {} of layer '{}'", command.tile.index, layer.name);
                    self.sink.report(Severity::Error, &message, &err);
                    layer.cache.remove(&command.tile.index);
                }
            }
        }

        log::debug!("Layer '{}' at level {}: {:?}", layer.name, level, walk.stats());
    }

    fn layer_opacity(&self, layer: &TileLayer) -> f64 {
        if self.config.honor_layer_opacity {
            layer.opacity
        } else {
            1.0
        }
    }

    fn draw_command<S: DrawingSurface + ?Sized>(
        &self,
        surface: &mut S,
        viewport: &Viewport,
        command: &DrawCommand,
        compositor: &Compositor,
    ) -> RenderResult<()> {
        let bitmap = command.entry.bitmap_or_decode()?;
        self.draw_region(
            surface,
            viewport,
            &command.entry,
            &bitmap,
            &command.tile.extent,
            &command.clip,
            compositor,
        )
    }

    /// Draw one raster feature over its whole bounding box, outside of any
    /// pyramid walk. The entry is stamped with the current pass.
    pub fn draw_feature<S: DrawingSurface + ?Sized>(
        &self,
        surface: &mut S,
        viewport: &Viewport,
        entry: &CacheEntry,
        opacity: f64,
    ) -> RenderResult<()> {
        let bitmap = entry.bitmap_or_decode()?;
        let extent = entry.feature().extent;
        let compositor = Compositor::new(self.config.blend_mode, opacity);
        self.draw_region(surface, viewport, entry, &bitmap, &extent, &extent, &compositor)
    }

    /// Draw the part of `bitmap` that covers `clip`, where the whole bitmap
    /// spans `tile`
    #[allow(clippy::too_many_arguments)]
    fn draw_region<S: DrawingSurface + ?Sized>(
        &self,
        surface: &mut S,
        viewport: &Viewport,
        entry: &CacheEntry,
        bitmap: &Bitmap,
        tile: &Extent,
        clip: &Extent,
        compositor: &Compositor,
    ) -> RenderResult<()> {
        let source = source_rect(bitmap, tile, clip);
        let matrix = build_tile_transform(viewport, clip, surface.transform());
        let mut scope = TransformScope::install(surface, matrix);
        compositor.composite_entry(
            &mut *scope,
            entry,
            bitmap,
            Rect::from_size(clip.width(), clip.height()),
            source,
            self.iteration,
        )
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

/// Bitmap pixels covering `clip`, for a bitmap stretched over `tile`
fn source_rect(bitmap: &Bitmap, tile: &Extent, clip: &Extent) -> Rect {
    let (bw, bh) = (bitmap.width() as f64, bitmap.height() as f64);
    let sx = bw / tile.width();
    let sy = bh / tile.height();
    Rect::new(
        ((clip.min_x - tile.min_x) * sx).clamp(0.0, bw),
        ((tile.max_y - clip.max_y) * sy).clamp(0.0, bh),
        ((clip.max_x - tile.min_x) * sx).clamp(0.0, bw),
        ((tile.max_y - clip.min_y) * sy).clamp(0.0, bh),
    )
}
