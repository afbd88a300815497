//! rastile core library
//!
//! World-space geometry, viewport snapshots and tile pyramid schemas shared by
//! the renderer and the command line tool.

pub mod error;
pub mod schema;
pub mod types;
pub mod viewport;

// Re-export commonly used types
pub use error::SchemaError;
pub use schema::{nearest_level, GridSchema, TileSchema};
pub use types::{Extent, Level, TileIndex, TileInfo};
pub use viewport::Viewport;

/// Version information for the rastile core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
