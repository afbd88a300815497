use serde::{Deserialize, Serialize};

pub type Level = u8;

/// Axis-aligned rectangle in world coordinates. Y grows upward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// True when the extent has a positive, finite area.
    pub fn is_valid(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
            && self.max_x > self.min_x
            && self.max_y > self.min_y
    }

    /// Overlap with positive area. Extents that only share an edge do not intersect.
    pub fn intersects(&self, other: &Extent) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        if !self.intersects(other) {
            return None;
        }
        Some(Extent {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        })
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) * 0.5, (self.min_y + self.max_y) * 0.5)
    }
}

/// Identifies one cell of the tile pyramid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileIndex {
    pub level: Level,
    pub col: u32,
    pub row: u32,
}

impl TileIndex {
    pub fn new(level: Level, col: u32, row: u32) -> Self {
        Self { level, col, row }
    }
}

impl std::fmt::Display for TileIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.col, self.row)
    }
}

/// A pyramid cell together with its world footprint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileInfo {
    pub index: TileIndex,
    pub extent: Extent,
}

impl TileInfo {
    pub fn new(index: TileIndex, extent: Extent) -> Self {
        Self { index, extent }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection_clips_to_overlap() {
        let a = Extent::new(0.0, 0.0, 10.0, 10.0);
        let b = Extent::new(5.0, -5.0, 15.0, 5.0);
        assert_eq!(a.intersection(&b), Some(Extent::new(5.0, 0.0, 10.0, 5.0)));
    }

    #[test]
    fn test_touching_extents_do_not_intersect() {
        let a = Extent::new(0.0, 0.0, 10.0, 10.0);
        let b = Extent::new(10.0, 0.0, 20.0, 10.0);
        assert!(!a.intersects(&b));
        assert_eq!(a.intersection(&b), None);
    }

    #[test]
    fn test_extent_validity() {
        assert!(Extent::new(0.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!Extent::new(0.0, 0.0, 0.0, 1.0).is_valid());
        assert!(!Extent::new(0.0, f64::NAN, 1.0, 1.0).is_valid());
    }

    #[test]
    fn test_tile_index_display() {
        assert_eq!(TileIndex::new(4, 8, 9).to_string(), "4/8/9");
    }
}
