#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use parking_lot::Mutex;
use rastile_core::{Extent, GridSchema, Level, TileIndex, TileSchema};
use rastile_render::{CacheEntry, FailureSink, MemoryCache, RasterFeature, RenderError, Severity, TileCache};

pub const RED: [u8; 4] = [255, 0, 0, 255];
pub const GREEN: [u8; 4] = [0, 255, 0, 255];
pub const BLUE: [u8; 4] = [0, 0, 255, 255];
pub const WHITE: [u8; 4] = [255, 255, 255, 255];

/// 64x64 world units, 16 px tiles, three levels down to 1 unit per pixel
pub fn grid() -> GridSchema {
    GridSchema::new("grid", Extent::new(0.0, 0.0, 64.0, 64.0), 16, 16, vec![4.0, 2.0, 1.0]).unwrap()
}

pub fn png(color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(16, 16, Rgba(color));
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub fn put(cache: &MemoryCache, schema: &GridSchema, index: TileIndex, bytes: Vec<u8>) -> Arc<CacheEntry> {
    let extent = schema.tile_extent(index).unwrap();
    cache.insert(index, CacheEntry::new(RasterFeature::new(extent, bytes)))
}

/// Cache every cell of `level`, colored by `color(col, row)`
pub fn fill_level(cache: &MemoryCache, schema: &GridSchema, level: Level, color: impl Fn(u32, u32) -> [u8; 4]) {
    for info in schema.tiles_in_view(&schema.extent, level).unwrap() {
        let index = info.index;
        put(cache, schema, index, png(color(index.col, index.row)));
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub reports: Mutex<Vec<(Severity, String)>>,
}

impl FailureSink for RecordingSink {
    fn report(&self, severity: Severity, message: &str, _error: &RenderError) {
        self.reports.lock().push((severity, message.to_string()));
    }
}
