//! Command implementations for the rastile CLI

pub mod render;
pub mod tiles;

use rastile_core::Extent;

use crate::error::{CliError, CliResult};

/// Parse `minx,miny,maxx,maxy`
pub fn parse_extent(s: &str) -> CliResult<Extent> {
    let values = s
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| CliError::invalid_argument(format!("extent '{}': {}", s, err)))?;

    let [min_x, min_y, max_x, max_y] = values[..] else {
        return Err(CliError::invalid_argument(format!(
            "extent '{}' needs four comma-separated numbers",
            s
        )));
    };

    let extent = Extent::new(min_x, min_y, max_x, max_y);
    if !extent.is_valid() {
        return Err(CliError::invalid_argument(format!("extent '{}' has no area", s)));
    }
    Ok(extent)
}
