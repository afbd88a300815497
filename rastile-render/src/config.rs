//! Renderer configuration

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::surface::BlendMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// How tile pixels are combined with the surface
    #[serde(default)]
    pub blend_mode: BlendMode,

    /// Apply each layer's opacity. When false every tile is drawn opaque.
    #[serde(default = "default_true")]
    pub honor_layer_opacity: bool,

    /// Maximum number of coarser levels searched for a missing tile
    #[serde(default)]
    pub max_fallback_depth: Option<u8>,
}

fn default_true() -> bool {
    true
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            blend_mode: BlendMode::default(),
            honor_layer_opacity: default_true(),
            max_fallback_depth: None,
        }
    }
}

/// Parse `#RRGGBB` or `#RRGGBBAA` into a straight-alpha color
pub fn parse_hex_color(s: &str) -> Option<Rgba<u8>> {
    let hex = s.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        6 => Some(Rgba([channel(0)?, channel(2)?, channel(4)?, 255])),
        8 => Some(Rgba([channel(0)?, channel(2)?, channel(4)?, channel(6)?])),
        _ => None,
    }
}
