/*!
# Tile Schemas

A tile schema describes the pyramid: one resolution per level, level 0 being
the coarsest, and a regular grid of cells per level anchored at the top-left
corner of the schema extent.
*/

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::types::{Extent, Level, TileIndex, TileInfo};

/// Half the circumference of the spherical mercator world square
pub const WEB_MERCATOR_HALF_SIZE: f64 = 20037508.342789244;
pub const DEFAULT_TILE_SIZE: u32 = 256;

pub trait TileSchema: Send + Sync {
    fn name(&self) -> &str;

    /// Resolutions indexed by level, strictly decreasing
    fn resolutions(&self) -> &[f64];

    fn extent(&self) -> Extent;

    /// Cells of `level` overlapping `extent`, rows top to bottom and columns
    /// left to right. Cells that only touch the boundary are left out.
    fn tiles_in_view(&self, extent: &Extent, level: Level) -> Result<Vec<TileInfo>, SchemaError>;

    fn level_count(&self) -> usize {
        self.resolutions().len()
    }

    fn nearest_level(&self, resolution: f64) -> Level {
        nearest_level(self.resolutions(), resolution)
    }
}

/// Level whose resolution is closest to `resolution`.
///
/// Anything finer than the finest level maps to the finest level, anything
/// coarser than level 0 maps to level 0. Ties go to the coarser level.
pub fn nearest_level(resolutions: &[f64], resolution: f64) -> Level {
    let Some(last) = resolutions.len().checked_sub(1) else {
        return 0;
    };
    if resolution <= resolutions[last] {
        return last.min(Level::MAX as usize) as Level;
    }
    if resolution >= resolutions[0] {
        return 0;
    }

    let mut best_level = 0usize;
    let mut best_distance = f64::INFINITY;
    for (level, candidate) in resolutions.iter().enumerate() {
        let distance = (candidate - resolution).abs();
        if distance < best_distance {
            best_distance = distance;
            best_level = level;
        }
    }
    best_level.min(Level::MAX as usize) as Level
}

/// Regular grid pyramid anchored at the top-left corner of `extent`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSchema {
    pub name: String,
    #[serde(default = "default_tile_size")]
    pub tile_width: u32,
    #[serde(default = "default_tile_size")]
    pub tile_height: u32,
    pub resolutions: Vec<f64>,
    pub extent: Extent,
}

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE
}

impl GridSchema {
    pub fn new(
        name: impl Into<String>,
        extent: Extent,
        tile_width: u32,
        tile_height: u32,
        resolutions: Vec<f64>,
    ) -> Result<Self, SchemaError> {
        let schema = Self {
            name: name.into(),
            extent,
            tile_width,
            tile_height,
            resolutions,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Spherical mercator pyramid with 256 px tiles, as served by OSM-style tile servers
    pub fn web_mercator(levels: Level) -> Self {
        let size = WEB_MERCATOR_HALF_SIZE;
        let top = 2.0 * size / DEFAULT_TILE_SIZE as f64;
        let resolutions = (0..levels.max(1))
            .map(|level| top / 2f64.powi(level as i32))
            .collect();

        Self {
            name: "web-mercator".to_string(),
            extent: Extent::new(-size, -size, size, size),
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,
            resolutions,
        }
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.resolutions.is_empty() {
            return Err(SchemaError::invalid("schema has no resolutions"));
        }
        if self.resolutions.len() > Level::MAX as usize + 1 {
            return Err(SchemaError::invalid(format!(
                "schema has {} levels, at most {} are supported",
                self.resolutions.len(),
                Level::MAX as usize + 1
            )));
        }
        if self.resolutions.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(SchemaError::invalid("resolutions must be positive and finite"));
        }
        if self.resolutions.windows(2).any(|pair| pair[1] >= pair[0]) {
            return Err(SchemaError::invalid(
                "resolutions must strictly decrease from level 0 (coarsest) to the finest level",
            ));
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(SchemaError::invalid("tile size must be non-zero"));
        }
        if !self.extent.is_valid() {
            return Err(SchemaError::invalid("schema extent must have a positive area"));
        }
        Ok(())
    }

    pub fn resolution(&self, level: Level) -> Result<f64, SchemaError> {
        self.resolutions
            .get(level as usize)
            .copied()
            .ok_or(SchemaError::LevelOutOfRange {
                level,
                levels: self.resolutions.len(),
            })
    }

    /// World size of one cell at `level`
    pub fn tile_size_world(&self, level: Level) -> Result<(f64, f64), SchemaError> {
        let resolution = self.resolution(level)?;
        Ok((
            self.tile_width as f64 * resolution,
            self.tile_height as f64 * resolution,
        ))
    }

    /// Number of columns and rows needed to cover the schema extent at `level`
    pub fn matrix_size(&self, level: Level) -> Result<(u32, u32), SchemaError> {
        let (tile_w, tile_h) = self.tile_size_world(level)?;
        let cols = (self.extent.width() / tile_w).ceil().max(1.0) as u32;
        let rows = (self.extent.height() / tile_h).ceil().max(1.0) as u32;
        Ok((cols, rows))
    }

    pub fn tile_extent(&self, index: TileIndex) -> Result<Extent, SchemaError> {
        let (tile_w, tile_h) = self.tile_size_world(index.level)?;
        let min_x = self.extent.min_x + index.col as f64 * tile_w;
        let max_y = self.extent.max_y - index.row as f64 * tile_h;
        Ok(Extent::new(min_x, max_y - tile_h, min_x + tile_w, max_y))
    }
}

impl Default for GridSchema {
    fn default() -> Self {
        Self::web_mercator(19)
    }
}

impl TileSchema for GridSchema {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolutions(&self) -> &[f64] {
        &self.resolutions
    }

    fn extent(&self) -> Extent {
        self.extent
    }

    fn tiles_in_view(&self, extent: &Extent, level: Level) -> Result<Vec<TileInfo>, SchemaError> {
        let (tile_w, tile_h) = self.tile_size_world(level)?;
        let (cols, rows) = self.matrix_size(level)?;

        let Some(area) = extent.intersection(&self.extent) else {
            return Ok(Vec::new());
        };

        let origin_x = self.extent.min_x;
        let origin_y = self.extent.max_y;

        let col_start = ((area.min_x - origin_x) / tile_w).floor().max(0.0) as u32;
        let col_end = (((area.max_x - origin_x) / tile_w).ceil().max(0.0) as u32).min(cols);
        let row_start = ((origin_y - area.max_y) / tile_h).floor().max(0.0) as u32;
        let row_end = (((origin_y - area.min_y) / tile_h).ceil().max(0.0) as u32).min(rows);

        let mut tiles = Vec::new();
        for row in row_start..row_end {
            for col in col_start..col_end {
                let index = TileIndex::new(level, col, row);
                let cell = self.tile_extent(index)?;
                if cell.intersects(&area) {
                    tiles.push(TileInfo::new(index, cell));
                }
            }
        }

        Ok(tiles)
    }
}
