//! Tiles command: list the cells covering an extent, and with a tile
//! directory, which cached tiles would be drawn for them

use anyhow::Result;
use std::path::PathBuf;

use rastile_core::{Extent, Level, TileSchema};
use rastile_render::{resolve, MemoryCache};

use crate::config::Config;
use crate::error::CliError;
use crate::provider::load_directory;

pub fn execute(config: &Config, extent: Option<Extent>, level: Level, tiles: Option<PathBuf>) -> Result<()> {
    let schema = &config.schema;
    let extent = extent.unwrap_or(schema.extent);
    schema.resolution(level).map_err(CliError::from)?;

    let Some(dir) = tiles else {
        let cells = schema.tiles_in_view(&extent, level).map_err(CliError::from)?;
        for info in &cells {
            println!("{}\t{}", info.index, format_extent(&info.extent));
        }
        log::info!("{} cells at level {}", cells.len(), level);
        return Ok(());
    };

    let cache = MemoryCache::new();
    load_directory(&dir, schema, &cache)?;

    let mut walk = resolve(schema, &cache, extent, level);
    if let Some(depth) = config.render.max_fallback_depth {
        walk = walk.with_fallback_depth(depth);
    }
    for command in walk.by_ref() {
        let marker = if command.is_fallback() { "fallback" } else { "exact" };
        println!("{}\t{}\t{}", command.tile.index, marker, format_extent(&command.clip));
    }

    let stats = walk.stats();
    log::info!(
        "{} exact, {} fallback, {} uncovered",
        stats.hits,
        stats.fallback_hits,
        stats.misses
    );
    Ok(())
}

fn format_extent(extent: &Extent) -> String {
    format!("{},{},{},{}", extent.min_x, extent.min_y, extent.max_x, extent.max_y)
}
