//! Configuration handling for the rastile CLI
//!
//! Loaded from a rastile.toml file, command-line arguments override the
//! output settings.

use anyhow::{Context, Result};
use image::Rgba;
use rastile_core::GridSchema;
use rastile_render::{parse_hex_color, RenderConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CliError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub render: RenderConfig,
    pub output: OutputConfig,
    pub schema: GridSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default image width
    #[serde(default = "default_size")]
    pub width: u32,

    /// Default image height
    #[serde(default = "default_size")]
    pub height: u32,

    /// Color the image is cleared to before drawing
    #[serde(default = "default_background")]
    pub background: String,
}

fn default_size() -> u32 { 512 }
fn default_background() -> String { "#ffffff".to_string() }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_size(),
            height: default_size(),
            background: default_background(),
        }
    }
}

impl OutputConfig {
    pub fn background_color(&self) -> Result<Rgba<u8>, CliError> {
        parse_hex_color(&self.background)
            .ok_or_else(|| CliError::config(format!("invalid background color '{}'", self.background)))
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                let default_path = PathBuf::from("rastile.toml");
                if default_path.exists() {
                    log::info!("Loading configuration from: rastile.toml");
                    Self::load_from_file(&default_path)?
                } else {
                    log::info!("Using default configuration");
                    Self::default()
                }
            }
        };

        Ok(config)
    }

    /// Load and validate configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .map_err(CliError::from)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CliError> {
        self.schema.validate()?;
        self.output.background_color()?;
        if self.output.width == 0 || self.output.height == 0 {
            return Err(CliError::config("output width and height must be non-zero"));
        }
        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// Generate example configuration file content
    pub fn example_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default()).context("Failed to serialize default configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rastile_render::BlendMode;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.output.background, "#ffffff");
        assert_eq!(config.schema.name, "web-mercator");
        assert!(config.render.honor_layer_opacity);
        config.validate().unwrap();
    }

    #[test]
    fn test_config_roundtrip() -> Result<()> {
        let mut config = Config::default();
        config.render.blend_mode = BlendMode::Copy;
        config.output.width = 300;
        let temp_file = NamedTempFile::new()?;

        config.save_to_file(temp_file.path())?;
        let loaded = Config::load_from_file(temp_file.path())?;

        assert_eq!(loaded.render, config.render);
        assert_eq!(loaded.schema, config.schema);
        assert_eq!(loaded.output.width, 300);

        Ok(())
    }

    #[test]
    fn test_partial_file_uses_defaults() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        std::fs::write(temp_file.path(), "[output]\nbackground = \"#00000000\"\n")?;

        let config = Config::load_from_file(temp_file.path())?;
        assert_eq!(config.output.background_color()?, Rgba([0, 0, 0, 0]));
        assert_eq!(config.output.width, 512);
        assert_eq!(config.schema, GridSchema::default());
        Ok(())
    }

    #[test]
    fn test_invalid_background_is_rejected() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        std::fs::write(temp_file.path(), "[output]\nbackground = \"white\"\n")?;
        assert!(Config::load_from_file(temp_file.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_example_toml_generation() -> Result<()> {
        let example = Config::example_toml()?;
        assert!(example.contains("[render]"));
        assert!(example.contains("[output]"));
        assert!(example.contains("[schema]"));
        Ok(())
    }
}
