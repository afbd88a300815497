/*!
# Tile Cache

The renderer reads tiles through the [`TileCache`] contract only. Entries have
a stable identity (`Arc<CacheEntry>`), their decoded bitmap is attached lazily
on first draw, and their last-used stamp is updated in place.
*/

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use rastile_core::{Extent, TileIndex};

use crate::bitmap::Bitmap;
use crate::error::RenderResult;

/// Encoded raster data and the world box it covers
#[derive(Debug, Clone)]
pub struct RasterFeature {
    pub extent: Extent,
    pub data: Arc<[u8]>,
}

impl RasterFeature {
    pub fn new(extent: Extent, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            extent,
            data: data.into(),
        }
    }
}

/// One cached tile: the encoded feature, its decoded bitmap once loaded, and
/// the render pass that last drew it.
#[derive(Debug)]
pub struct CacheEntry {
    feature: RasterFeature,
    bitmap: RwLock<Option<Arc<Bitmap>>>,
    last_used: AtomicU64,
}

impl CacheEntry {
    pub fn new(feature: RasterFeature) -> Self {
        Self {
            feature,
            bitmap: RwLock::new(None),
            last_used: AtomicU64::new(0),
        }
    }

    /// Entry whose bitmap is already decoded
    pub fn with_bitmap(feature: RasterFeature, bitmap: Bitmap) -> Self {
        Self {
            feature,
            bitmap: RwLock::new(Some(Arc::new(bitmap))),
            last_used: AtomicU64::new(0),
        }
    }

    pub fn feature(&self) -> &RasterFeature {
        &self.feature
    }

    /// Decoded bitmap if one has been attached
    pub fn bitmap(&self) -> Option<Arc<Bitmap>> {
        self.bitmap.read().clone()
    }

    /// Decoded bitmap, decoding the feature data on first use. A failed decode
    /// leaves the slot empty.
    pub fn bitmap_or_decode(&self) -> RenderResult<Arc<Bitmap>> {
        if let Some(bitmap) = self.bitmap.read().as_ref() {
            return Ok(bitmap.clone());
        }

        let mut slot = self.bitmap.write();
        if let Some(bitmap) = slot.as_ref() {
            return Ok(bitmap.clone());
        }
        let bitmap = Arc::new(Bitmap::decode(&self.feature.data)?);
        *slot = Some(bitmap.clone());
        Ok(bitmap)
    }

    /// Record use in render pass `iteration`. The stamp never goes backwards.
    pub fn touch(&self, iteration: u64) {
        self.last_used.fetch_max(iteration, Ordering::Relaxed);
    }

    pub fn last_used(&self) -> u64 {
        self.last_used.load(Ordering::Relaxed)
    }
}

/// Storage the renderer pulls tiles from. Fetchers insert from any thread.
pub trait TileCache: Send + Sync {
    fn find(&self, index: &TileIndex) -> Option<Arc<CacheEntry>>;

    fn remove(&self, index: &TileIndex) -> Option<Arc<CacheEntry>>;

    /// Insert or replace the entry for `index`
    fn insert(&self, index: TileIndex, entry: CacheEntry) -> Arc<CacheEntry>;
}

/// In-memory cache backed by a concurrent map
pub struct MemoryCache {
    tiles: DashMap<TileIndex, Arc<CacheEntry>>,

    // Lookup metrics
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            tiles: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, index: &TileIndex) -> bool {
        self.tiles.contains_key(index)
    }

    /// Drop entries that were not drawn in the last `max_idle_passes` passes
    /// and return how many went. The renderer never evicts on its own; hosts
    /// that keep a cache across passes call this between them.
    pub fn cleanup_stale(&self, current_iteration: u64, max_idle_passes: u64) -> usize {
        let before = self.tiles.len();
        self.tiles.retain(|_, entry| {
            current_iteration.saturating_sub(entry.last_used()) <= max_idle_passes
        });
        let evicted = before.saturating_sub(self.tiles.len());
        if evicted > 0 {
            log::debug!("Evicted {} stale tiles (pass {})", evicted, current_iteration);
        }
        evicted
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let hit_rate = if hits + misses > 0 {
            hits as f64 / (hits + misses) as f64
        } else {
            0.0
        };

        CacheStats {
            total_tiles: self.tiles.len(),
            hits,
            misses,
            hit_rate,
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TileCache for MemoryCache {
    fn find(&self, index: &TileIndex) -> Option<Arc<CacheEntry>> {
        match self.tiles.get(index) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value().clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn remove(&self, index: &TileIndex) -> Option<Arc<CacheEntry>> {
        self.tiles.remove(index).map(|(_, entry)| entry)
    }

    fn insert(&self, index: TileIndex, entry: CacheEntry) -> Arc<CacheEntry> {
        let entry = Arc::new(entry);
        self.tiles.insert(index, entry.clone());
        entry
    }
}

/// Cache lookup statistics
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub total_tiles: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}
