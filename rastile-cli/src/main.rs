use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod error;
mod provider;

use config::Config;
use error::{print_error_and_exit, CliError};

#[derive(Parser)]
#[command(name = "rastile")]
#[command(about = "rastile - tiled raster renderer")]
#[command(version)]
#[command(long_about = "
rastile renders tile pyramids stored on disk as <level>/<col>/<row>.png into a
single image, falling back to coarser levels where detail tiles are missing.

Examples:
  rastile render --tiles ./tiles --output map.png --level 3
  rastile render --tiles ./tiles --output map.png --center-x 0 --center-y 0 --resolution 2000 --rotation 30
  rastile tiles --level 2 --extent -1e6,-1e6,1e6,1e6
  rastile config --example > rastile.toml
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a tile directory into a PNG or JPEG image
    Render {
        /// Tile directory laid out as <level>/<col>/<row>.<png|jpg>
        #[arg(long, required = true)]
        tiles: PathBuf,

        /// Output image file
        #[arg(short, long, required = true)]
        output: PathBuf,

        /// View center X in world units (defaults to the schema center)
        #[arg(long, allow_hyphen_values = true)]
        center_x: Option<f64>,

        /// View center Y in world units (defaults to the schema center)
        #[arg(long, allow_hyphen_values = true)]
        center_y: Option<f64>,

        /// World units per pixel
        #[arg(long, conflicts_with = "level")]
        resolution: Option<f64>,

        /// Use the resolution of this pyramid level
        #[arg(long)]
        level: Option<u8>,

        /// Map rotation in degrees, clockwise
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        rotation: f64,

        /// Width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Layer opacity between 0 and 1
        #[arg(long, default_value = "1.0")]
        opacity: f64,
    },

    /// List the cells covering an extent at one level
    Tiles {
        /// Pyramid level
        #[arg(long, required = true)]
        level: u8,

        /// Extent as minx,miny,maxx,maxy (defaults to the schema extent)
        #[arg(long, allow_hyphen_values = true)]
        extent: Option<String>,

        /// Resolve against this tile directory, showing fallbacks
        #[arg(long)]
        tiles: Option<PathBuf>,
    },

    /// Configuration helpers
    Config {
        /// Print an example configuration with every default
        #[arg(long)]
        example: bool,

        /// Write the configuration to this file instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn setup_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Render {
            tiles,
            output,
            center_x,
            center_y,
            resolution,
            level,
            rotation,
            width,
            height,
            opacity,
        } => commands::render::execute(
            &config, tiles, output, center_x, center_y, resolution, level, rotation, width, height, opacity,
        ),

        Commands::Tiles { level, extent, tiles } => {
            let extent = extent.as_deref().map(commands::parse_extent).transpose()?;
            commands::tiles::execute(&config, extent, level, tiles)
        }

        Commands::Config { example, output } => {
            let config = if example { Config::default() } else { config };
            match output {
                Some(path) => {
                    config.save_to_file(&path)?;
                    log::info!("Wrote configuration to {}", path.display());
                }
                None if example => print!("{}", Config::example_toml()?),
                None => print!("{}", toml::to_string_pretty(&config)?),
            }
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    if let Err(err) = run(cli) {
        if let Some(cli_err) = err.downcast_ref::<CliError>() {
            print_error_and_exit(cli_err);
        }
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_render_arguments() {
        let cli = Cli::parse_from([
            "rastile", "render", "--tiles", "t", "-o", "out.png", "--center-x", "-12.5", "--level", "3",
        ]);
        match cli.command {
            Commands::Render { center_x, level, rotation, .. } => {
                assert_eq!(center_x, Some(-12.5));
                assert_eq!(level, Some(3));
                assert_eq!(rotation, 0.0);
            }
            _ => panic!("expected render"),
        }
    }
}
