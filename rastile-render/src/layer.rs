use std::sync::Arc;

use rastile_core::TileSchema;

use crate::cache::TileCache;

/// A tiled raster source: the pyramid layout, the cache holding its tiles and
/// the display settings
#[derive(Clone)]
pub struct TileLayer {
    pub name: String,
    pub schema: Arc<dyn TileSchema>,
    pub cache: Arc<dyn TileCache>,
    pub opacity: f64,
    pub enabled: bool,
    /// Finest resolution (world units per pixel) the layer is shown at
    pub min_visible: f64,
    /// Coarsest resolution the layer is shown at
    pub max_visible: f64,
}

impl TileLayer {
    pub fn new(name: impl Into<String>, schema: Arc<dyn TileSchema>, cache: Arc<dyn TileCache>) -> Self {
        Self {
            name: name.into(),
            schema,
            cache,
            opacity: 1.0,
            enabled: true,
            min_visible: 0.0,
            max_visible: f64::INFINITY,
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_visible_range(mut self, min_visible: f64, max_visible: f64) -> Self {
        self.min_visible = min_visible;
        self.max_visible = max_visible;
        self
    }

    pub fn is_visible_at(&self, resolution: f64) -> bool {
        self.enabled && self.min_visible <= resolution && self.max_visible >= resolution
    }
}

impl std::fmt::Debug for TileLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileLayer")
            .field("name", &self.name)
            .field("schema", &self.schema.name())
            .field("opacity", &self.opacity)
            .field("enabled", &self.enabled)
            .field("min_visible", &self.min_visible)
            .field("max_visible", &self.max_visible)
            .finish()
    }
}
