//! Reads a tile pyramid laid out as `<level>/<col>/<row>.<png|jpg>` into a
//! memory cache. Bytes are kept encoded; decoding happens on first draw.

use std::fs;
use std::path::Path;

use rastile_core::{GridSchema, Level, TileIndex};
use rastile_render::{CacheEntry, MemoryCache, RasterFeature, TileCache};

use crate::error::{CliError, CliResult};

const TILE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Summary of a directory load
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub skipped: usize,
}

/// Insert every tile found under `root` into `cache`
pub fn load_directory(root: &Path, schema: &GridSchema, cache: &MemoryCache) -> CliResult<LoadSummary> {
    if !root.is_dir() {
        return Err(CliError::tile_dir_not_found(root.to_path_buf()));
    }

    let mut summary = LoadSummary::default();
    for level_dir in fs::read_dir(root)? {
        let level_dir = level_dir?.path();
        let Some(level) = numeric_name::<Level>(&level_dir) else {
            log::debug!("Ignoring {}", level_dir.display());
            continue;
        };
        if !level_dir.is_dir() {
            continue;
        }

        for col_dir in fs::read_dir(&level_dir)? {
            let col_dir = col_dir?.path();
            let Some(col) = numeric_name::<u32>(&col_dir) else {
                log::debug!("Ignoring {}", col_dir.display());
                continue;
            };
            if !col_dir.is_dir() {
                continue;
            }

            for file in fs::read_dir(&col_dir)? {
                let file = file?.path();
                let Some(row) = tile_row(&file) else {
                    log::debug!("Ignoring {}", file.display());
                    continue;
                };

                let index = TileIndex::new(level, col, row);
                let extent = match schema.tile_extent(index) {
                    Ok(extent) => extent,
                    Err(err) => {
                        log::warn!("Skipping {}: {}", file.display(), err);
                        summary.skipped += 1;
                        continue;
                    }
                };

                let bytes = fs::read(&file)?;
                cache.insert(index, CacheEntry::new(RasterFeature::new(extent, bytes)));
                summary.loaded += 1;
            }
        }
    }

    log::info!(
        "Loaded {} tiles from {} ({} skipped)",
        summary.loaded,
        root.display(),
        summary.skipped
    );
    Ok(summary)
}

fn numeric_name<T: std::str::FromStr>(path: &Path) -> Option<T> {
    path.file_name()?.to_str()?.parse().ok()
}

fn tile_row(path: &Path) -> Option<u32> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if !TILE_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    path.file_stem()?.to_str()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rastile_core::Extent;
    use tempfile::TempDir;

    fn schema() -> GridSchema {
        GridSchema::new("test", Extent::new(0.0, 0.0, 512.0, 512.0), 256, 256, vec![2.0, 1.0]).unwrap()
    }

    fn write(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"bytes").unwrap();
    }

    #[test]
    fn test_load_pyramid_layout() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "0/0/0.png");
        write(dir.path(), "1/1/0.jpg");
        write(dir.path(), "1/0/1.JPEG");
        write(dir.path(), "1/0/notes.txt");
        write(dir.path(), "thumbs/0/0.png");

        let cache = MemoryCache::default();
        let summary = load_directory(dir.path(), &schema(), &cache).unwrap();

        assert_eq!(summary, LoadSummary { loaded: 3, skipped: 0 });
        assert!(cache.contains(&TileIndex::new(0, 0, 0)));
        assert!(cache.contains(&TileIndex::new(1, 1, 0)));
        assert!(cache.contains(&TileIndex::new(1, 0, 1)));

        let entry = cache.find(&TileIndex::new(1, 1, 0)).unwrap();
        assert_eq!(entry.feature().extent, Extent::new(256.0, 256.0, 512.0, 512.0));
    }

    #[test]
    fn test_levels_outside_schema_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "0/0/0.png");
        write(dir.path(), "7/0/0.png");

        let cache = MemoryCache::default();
        let summary = load_directory(dir.path(), &schema(), &cache).unwrap();
        assert_eq!(summary, LoadSummary { loaded: 1, skipped: 1 });
    }

    #[test]
    fn test_missing_directory() {
        let cache = MemoryCache::default();
        let err = load_directory(Path::new("/definitely/not/here"), &schema(), &cache).unwrap_err();
        assert!(matches!(err, CliError::TileDirNotFound { .. }));
    }
}
