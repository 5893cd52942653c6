// src/batch.rs
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};

use crate::config::{year_bounds, GeoTiffOptions, PipelineConfig};
use crate::pipeline::Pipeline;
use crate::scene::SceneClass;

#[derive(Deserialize, Serialize, Debug)]
pub struct BatchConfig {
    #[serde(default)]
    pub global: GlobalParams,
    pub jobs: Vec<Job>,
}

/// Values shared by every job unless the job overrides them
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct GlobalParams {
    pub catalog: Option<PathBuf>,
    pub aoi: Option<PathBuf>,
    pub cloud_threshold: Option<f64>,
    pub scale: Option<f64>,
    pub crs: Option<String>,
    pub destination: Option<PathBuf>,
    pub max_pixels: Option<u64>,
    pub excluded_classes: Option<Vec<SceneClass>>,
    #[serde(default)]
    pub output: GeoTiffOptions,
    pub io_threads: Option<usize>,
    pub timeout_secs: Option<u64>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct Job {
    pub prefix: String,
    pub catalog: Option<PathBuf>,
    pub aoi: Option<PathBuf>,
    pub year: Option<i32>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub cloud_threshold: Option<f64>,
    pub scale: Option<f64>,
    pub crs: Option<String>,
    pub destination: Option<PathBuf>,
    pub max_pixels: Option<u64>,
    pub excluded_classes: Option<Vec<SceneClass>>,
    pub output: Option<GeoTiffOptions>,
    pub io_threads: Option<usize>,
    pub timeout_secs: Option<u64>,
}

impl Job {
    /// Resolve this job against the batch-wide defaults
    pub fn to_config(&self, global: &GlobalParams) -> Result<PipelineConfig> {
        let catalog = self
            .catalog
            .clone()
            .or_else(|| global.catalog.clone())
            .ok_or_else(|| anyhow!("job {} has no catalog", self.prefix))?;
        let aoi = self
            .aoi
            .clone()
            .or_else(|| global.aoi.clone())
            .ok_or_else(|| anyhow!("job {} has no aoi", self.prefix))?;
        let (start, end) = match (self.year, self.start, self.end) {
            (Some(year), None, None) => year_bounds(year)?,
            (None, Some(start), Some(end)) => (start, end),
            _ => return Err(anyhow!("job {} needs either year or start and end", self.prefix)),
        };

        let mut config = PipelineConfig::new(catalog, aoi, start, end, self.prefix.clone());
        if let Some(v) = self.cloud_threshold.or(global.cloud_threshold) {
            config.cloud_threshold = v;
        }
        if let Some(v) = self.scale.or(global.scale) {
            config.scale = v;
        }
        if let Some(v) = self.crs.clone().or_else(|| global.crs.clone()) {
            config.crs = v;
        }
        if let Some(v) = self.destination.clone().or_else(|| global.destination.clone()) {
            config.destination = v;
        }
        if let Some(v) = self.max_pixels.or(global.max_pixels) {
            config.max_pixels = v;
        }
        if let Some(v) = self
            .excluded_classes
            .clone()
            .or_else(|| global.excluded_classes.clone())
        {
            config.excluded_classes = v;
        }
        config.output = self.output.clone().unwrap_or_else(|| global.output.clone());
        config.io_threads = self.io_threads.or(global.io_threads);
        config.timeout_secs = self.timeout_secs.or(global.timeout_secs);
        Ok(config)
    }
}

pub fn process_batch(config_path: &Path) -> Result<()> {
    // Read and parse configuration file
    let config_content = fs::read_to_string(config_path)
        .with_context(|| format!("reading batch file {}", config_path.display()))?;
    let config: BatchConfig = serde_json::from_str(&config_content)?;

    info!("Starting batch processing with {} jobs...", config.jobs.len());

    for (i, job) in config.jobs.iter().enumerate() {
        info!("[{}/{}] Processing {}", i + 1, config.jobs.len(), job.prefix);

        let pipeline_config = job.to_config(&config.global)?;
        let task = Pipeline::new(pipeline_config)
            .run_and_export()
            .with_context(|| format!("job {}", job.prefix))?;
        let path = task.wait().with_context(|| format!("exporting job {}", job.prefix))?;
        info!("[{}/{}] Wrote {}", i + 1, config.jobs.len(), path.display());
    }

    info!("Batch processing complete!");
    Ok(())
}
