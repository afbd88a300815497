/*!
# Tile Pyramid Resolution

Walks the pyramid from the requested level towards level 0 and yields one
[`DrawCommand`] per cell that has a cached tile. A cell without a tile is
covered by the coarser level, restricted to the part of the cell that is still
missing, so a lower resolution placeholder fills the gap until the detail tile
arrives.

The walk uses an explicit stack instead of recursion; its depth is bounded by
the number of pyramid levels since every fallback step lowers the level.
*/

use std::sync::Arc;

use rastile_core::{Extent, Level, TileInfo, TileSchema};

use crate::cache::{CacheEntry, TileCache};

/// A cached tile to draw, and the part of its cell that should be drawn
#[derive(Debug, Clone)]
pub struct DrawCommand {
    /// Cell whose bitmap is drawn
    pub tile: TileInfo,
    /// World region to cover, always inside `tile.extent`
    pub clip: Extent,
    pub entry: Arc<CacheEntry>,
    /// Level the walk started from
    pub requested_level: Level,
}

impl DrawCommand {
    /// True when a coarser ancestor stands in for missing detail tiles
    pub fn is_fallback(&self) -> bool {
        self.tile.index.level < self.requested_level
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Cells drawn at the requested level
    pub hits: usize,
    /// Cells drawn from a coarser level
    pub fallback_hits: usize,
    /// Cache misses that moved the walk one level up
    pub fallbacks: usize,
    /// Cells with nothing cached down to level 0
    pub misses: usize,
    /// Levels the schema did not know about
    pub schema_mismatches: usize,
}

#[derive(Debug)]
enum Work {
    Level { level: Level, extent: Extent },
    Cell { info: TileInfo, clip: Extent },
}

/// Lazy iterator over the draw commands of one pyramid walk
pub struct Resolve<'a, S: TileSchema + ?Sized, C: TileCache + ?Sized> {
    schema: &'a S,
    cache: &'a C,
    requested_level: Level,
    floor: Level,
    stack: Vec<Work>,
    stats: ResolveStats,
}

/// Resolve `visible` against `cache`, starting at `start_level`
pub fn resolve<'a, S, C>(schema: &'a S, cache: &'a C, visible: Extent, start_level: Level) -> Resolve<'a, S, C>
where
    S: TileSchema + ?Sized,
    C: TileCache + ?Sized,
{
    let mut stack = Vec::new();
    if visible.is_valid() {
        stack.push(Work::Level {
            level: start_level,
            extent: visible,
        });
    }

    Resolve {
        schema,
        cache,
        requested_level: start_level,
        floor: 0,
        stack,
        stats: ResolveStats::default(),
    }
}

impl<S: TileSchema + ?Sized, C: TileCache + ?Sized> Resolve<'_, S, C> {
    /// Stop falling back more than `depth` levels below the requested level
    pub fn with_fallback_depth(mut self, depth: Level) -> Self {
        self.floor = self.requested_level.saturating_sub(depth);
        self
    }

    pub fn stats(&self) -> ResolveStats {
        self.stats
    }

    fn expand(&mut self, level: Level, extent: Extent) {
        match self.schema.tiles_in_view(&extent, level) {
            Ok(tiles) => {
                // Reversed so cells pop in the order the schema listed them
                for info in tiles.into_iter().rev() {
                    if let Some(clip) = info.extent.intersection(&extent) {
                        self.stack.push(Work::Cell { info, clip });
                    }
                }
            }
            Err(err) => {
                self.stats.schema_mismatches += 1;
                log::debug!("{}; treating level {} as a miss", err, level);
                if level > self.floor {
                    self.stack.push(Work::Level {
                        level: level - 1,
                        extent,
                    });
                }
            }
        }
    }
}

impl<S: TileSchema + ?Sized, C: TileCache + ?Sized> Iterator for Resolve<'_, S, C> {
    type Item = DrawCommand;

    fn next(&mut self) -> Option<DrawCommand> {
        while let Some(work) = self.stack.pop() {
            match work {
                Work::Level { level, extent } => self.expand(level, extent),
                Work::Cell { info, clip } => {
                    if let Some(entry) = self.cache.find(&info.index) {
                        if info.index.level < self.requested_level {
                            self.stats.fallback_hits += 1;
                        } else {
                            self.stats.hits += 1;
                        }
                        return Some(DrawCommand {
                            tile: info,
                            clip,
                            entry,
                            requested_level: self.requested_level,
                        });
                    }

                    if info.index.level > self.floor {
                        self.stats.fallbacks += 1;
                        self.stack.push(Work::Level {
                            level: info.index.level - 1,
                            extent: clip,
                        });
                    } else {
                        self.stats.misses += 1;
                        log::debug!("No tile cached for {} or any usable ancestor", info.index);
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, RasterFeature};
    use rastile_core::{GridSchema, TileIndex};

    fn schema() -> GridSchema {
        GridSchema::new("square", Extent::new(0.0, 0.0, 256.0, 256.0), 256, 256, vec![1.0, 0.5, 0.25]).unwrap()
    }

    fn put(cache: &MemoryCache, schema: &GridSchema, index: TileIndex) {
        let extent = schema.tile_extent(index).unwrap();
        cache.insert(index, CacheEntry::new(RasterFeature::new(extent, vec![index.level])));
    }

    fn indices(commands: &[DrawCommand]) -> Vec<TileIndex> {
        commands.iter().map(|c| c.tile.index).collect()
    }

    #[test]
    fn test_all_cached_at_requested_level() {
        let schema = schema();
        let cache = MemoryCache::default();
        for info in schema.tiles_in_view(&schema.extent(), 1).unwrap() {
            put(&cache, &schema, info.index);
        }

        let commands: Vec<_> = resolve(&schema, &cache, schema.extent(), 1).collect();
        assert_eq!(
            indices(&commands),
            vec![
                TileIndex::new(1, 0, 0),
                TileIndex::new(1, 1, 0),
                TileIndex::new(1, 0, 1),
                TileIndex::new(1, 1, 1),
            ]
        );
        assert!(commands.iter().all(|c| !c.is_fallback() && c.clip == c.tile.extent));
    }

    #[test]
    fn test_fallback_keeps_enumeration_order() {
        let schema = schema();
        let cache = MemoryCache::default();
        put(&cache, &schema, TileIndex::new(0, 0, 0));
        put(&cache, &schema, TileIndex::new(1, 1, 0));
        put(&cache, &schema, TileIndex::new(1, 0, 1));
        put(&cache, &schema, TileIndex::new(1, 1, 1));

        let mut walk = resolve(&schema, &cache, schema.extent(), 1);
        let commands: Vec<_> = walk.by_ref().collect();
        assert_eq!(
            indices(&commands),
            vec![
                TileIndex::new(0, 0, 0),
                TileIndex::new(1, 1, 0),
                TileIndex::new(1, 0, 1),
                TileIndex::new(1, 1, 1),
            ]
        );

        // The ancestor only covers the missing top-left quarter
        assert!(commands[0].is_fallback());
        assert_eq!(commands[0].clip, Extent::new(0.0, 128.0, 128.0, 256.0));

        let stats = walk.stats();
        assert_eq!((stats.hits, stats.fallback_hits, stats.fallbacks, stats.misses), (3, 1, 1, 0));
    }

    #[test]
    fn test_empty_cache_yields_nothing() {
        let schema = schema();
        let cache = MemoryCache::default();
        let mut walk = resolve(&schema, &cache, schema.extent(), 2);
        assert_eq!(walk.by_ref().count(), 0);

        let stats = walk.stats();
        // Every level-2 cell walks its own way down to level 0
        assert_eq!(stats.fallbacks, 32);
        assert_eq!(stats.misses, 16);
    }

    #[test]
    fn test_level_outside_schema_falls_back() {
        let schema = schema();
        let cache = MemoryCache::default();
        put(&cache, &schema, TileIndex::new(2, 0, 0));

        let visible = Extent::new(0.0, 200.0, 60.0, 256.0);
        let mut walk = resolve(&schema, &cache, visible, 5);
        let commands: Vec<_> = walk.by_ref().collect();
        assert_eq!(indices(&commands), vec![TileIndex::new(2, 0, 0)]);
        assert_eq!(commands[0].clip, visible);
        assert_eq!(walk.stats().schema_mismatches, 3);
    }

    #[test]
    fn test_fallback_depth_limits_the_walk() {
        let schema = schema();
        let cache = MemoryCache::default();
        put(&cache, &schema, TileIndex::new(0, 0, 0));

        assert_eq!(resolve(&schema, &cache, schema.extent(), 2).count(), 16);

        let mut walk = resolve(&schema, &cache, schema.extent(), 2).with_fallback_depth(1);
        assert_eq!(walk.by_ref().count(), 0);
        assert_eq!(walk.stats().misses, 16);
    }

    #[test]
    fn test_invalid_visible_extent() {
        let schema = schema();
        let cache = MemoryCache::default();
        put(&cache, &schema, TileIndex::new(0, 0, 0));
        let empty = Extent::new(10.0, 10.0, 10.0, 20.0);
        assert_eq!(resolve(&schema, &cache, empty, 0).count(), 0);
    }
}
