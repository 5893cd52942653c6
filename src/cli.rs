// src/cli.rs
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::config::{year_bounds, PipelineConfig};

#[derive(Parser)]
#[command(name = "s2-composite")]
#[command(about = "Cloud-masked Sentinel-2 spectral index median composites")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Worker threads for scene processing (default: number of CPUs)
    #[arg(long, global = true)]
    pub threads: Option<usize>,

    /// GeoTIFF compression (DEFLATE, ZSTD, LZW, NONE)
    #[arg(long, global = true)]
    pub compress: Option<String>,

    /// Compression level for DEFLATE/ZSTD
    #[arg(long, global = true)]
    pub compress_level: Option<u8>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the NDVI/EVI/SAVI/NDWI/MNDWI median composite and export it
    Run(RunArgs),

    /// List the catalog scenes that pass the date, cloud and AOI filters
    Scenes(RunArgs),

    /// Run every job of a JSON batch file
    Batch {
        /// Batch configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// JSON pipeline configuration; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Catalog manifest or directory containing catalog.json
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Area of interest (any OGR polygon source)
    #[arg(long)]
    pub aoi: Option<PathBuf>,

    /// Calendar year to composite (sets start and end)
    #[arg(long, conflicts_with_all = ["start", "end"])]
    pub year: Option<i32>,

    /// First acquisition date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last acquisition date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Keep scenes whose cloudy pixel percentage is below this value
    #[arg(long)]
    pub cloud_threshold: Option<f64>,

    /// Output pixel size in CRS units
    #[arg(long)]
    pub scale: Option<f64>,

    /// Output coordinate reference system
    #[arg(long)]
    pub crs: Option<String>,

    /// Output folder
    #[arg(short, long)]
    pub destination: Option<PathBuf>,

    /// Output file name prefix
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Refuse outputs with more pixels than this
    #[arg(long)]
    pub max_pixels: Option<u64>,

    /// Abandon the run after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl RunArgs {
    /// Merge the optional config file with the command-line overrides
    pub fn into_config(self) -> Result<PipelineConfig> {
        let (year_start, year_end) = match self.year {
            Some(year) => {
                let (s, e) = year_bounds(year)?;
                (Some(s), Some(e))
            }
            None => (None, None),
        };
        let start = year_start.or(self.start);
        let end = year_end.or(self.end);

        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::new(
                self.catalog.clone().ok_or_else(|| anyhow!("--catalog is required without --config"))?,
                self.aoi.clone().ok_or_else(|| anyhow!("--aoi is required without --config"))?,
                start.ok_or_else(|| anyhow!("--year or --start is required without --config"))?,
                end.ok_or_else(|| anyhow!("--year or --end is required without --config"))?,
                self.prefix.clone().ok_or_else(|| anyhow!("--prefix is required without --config"))?,
            ),
        };

        if let Some(catalog) = self.catalog {
            config.catalog = catalog;
        }
        if let Some(aoi) = self.aoi {
            config.aoi = aoi;
        }
        if let Some(start) = start {
            config.start = start;
        }
        if let Some(end) = end {
            config.end = end;
        }
        if let Some(threshold) = self.cloud_threshold {
            config.cloud_threshold = threshold;
        }
        if let Some(scale) = self.scale {
            config.scale = scale;
        }
        if let Some(crs) = self.crs {
            config.crs = crs;
        }
        if let Some(destination) = self.destination {
            config.destination = destination;
        }
        if let Some(prefix) = self.prefix {
            config.prefix = prefix;
        }
        if let Some(max_pixels) = self.max_pixels {
            config.max_pixels = max_pixels;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = Some(timeout);
        }

        Ok(config)
    }
}

impl Cli {
    /// Apply the global flags to a pipeline configuration
    pub fn apply_globals(&self, config: &mut PipelineConfig) {
        if let Some(threads) = self.threads {
            config.io_threads = Some(threads);
        }
        if let Some(compress) = &self.compress {
            config.output.compress = compress.clone();
        }
        if let Some(level) = self.compress_level {
            config.output.compress_level = level;
        }
    }
}
