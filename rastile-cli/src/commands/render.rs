//! Render command: draw a tile directory into a PNG or JPEG image

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use rastile_core::{GridSchema, Level, TileSchema, Viewport};
use rastile_render::{MemoryCache, RasterSurface, Renderer, TileLayer};

use crate::config::Config;
use crate::error::CliError;
use crate::provider::load_directory;

#[allow(clippy::too_many_arguments)]
pub fn execute(
    config: &Config,
    tiles: PathBuf,
    output: PathBuf,
    center_x: Option<f64>,
    center_y: Option<f64>,
    resolution: Option<f64>,
    level: Option<Level>,
    rotation: f64,
    width: Option<u32>,
    height: Option<u32>,
    opacity: f64,
) -> Result<()> {
    let schema = Arc::new(config.schema.clone());
    let width = width.unwrap_or(config.output.width);
    let height = height.unwrap_or(config.output.height);
    let center = schema.extent.center();

    let viewport = Viewport::new(
        center_x.unwrap_or(center.0),
        center_y.unwrap_or(center.1),
        view_resolution(&schema, resolution, level, width, height)?,
        width,
        height,
    )
    .with_rotation(rotation);
    if !viewport.is_valid() {
        return Err(CliError::invalid_argument(format!("unusable viewport {:?}", viewport)).into());
    }
    log::info!(
        "Rendering {}x{} at ({}, {}), resolution {}, rotation {}°",
        width,
        height,
        viewport.center_x,
        viewport.center_y,
        viewport.resolution,
        viewport.rotation
    );

    let cache = Arc::new(MemoryCache::new());
    load_directory(&tiles, &schema, &cache)?;

    let layer_name = tiles
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tiles".to_string());
    let layers = vec![TileLayer::new(layer_name, schema.clone(), cache.clone()).with_opacity(opacity)];

    let mut surface = RasterSurface::new(width, height);
    surface.clear(config.output.background_color()?);

    let mut renderer = Renderer::new(config.render.clone());
    let stats = renderer.render(&mut surface, &viewport, &layers);
    log::info!(
        "Drew {} tiles ({} from coarser levels), {} failed",
        stats.drawn,
        stats.fallback_drawn,
        stats.failed
    );

    let cache_stats = cache.stats();
    log::debug!(
        "Cache: {} tiles, {} hits, {} misses ({:.1}% hit rate)",
        cache_stats.total_tiles,
        cache_stats.hits,
        cache_stats.misses,
        cache_stats.hit_rate * 100.0
    );

    surface.save(&output).map_err(|err| CliError::rendering(err.to_string()))?;

    log::info!("Wrote {}", output.display());
    Ok(())
}

/// Resolution for the viewport: explicit, taken from a pyramid level, or the
/// one that fits the whole schema extent into the image
pub fn view_resolution(
    schema: &GridSchema,
    resolution: Option<f64>,
    level: Option<Level>,
    width: u32,
    height: u32,
) -> Result<f64, CliError> {
    if let Some(resolution) = resolution {
        return Ok(resolution);
    }
    if let Some(level) = level {
        return Ok(schema.resolution(level)?);
    }
    if width == 0 || height == 0 {
        return Err(CliError::invalid_argument("image size must be non-zero"));
    }
    let extent = schema.extent();
    Ok((extent.width() / width as f64).max(extent.height() / height as f64))
}
