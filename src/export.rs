// src/export.rs
use std::fs;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use log::{error, info};

use crate::config::{GeoTiffOptions, PipelineConfig};
use crate::error::{Error, Result};
use crate::io::write_composite;
use crate::processing::CompositeRaster;

/// Destination and limits of one export
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub path: PathBuf,
    pub max_pixels: u64,
    pub options: GeoTiffOptions,
    /// Dataset-level metadata items
    pub metadata: Vec<(String, String)>,
}

impl ExportRequest {
    pub fn from_config(config: &PipelineConfig, catalog_id: &str) -> Self {
        Self {
            path: config.output_path(),
            max_pixels: config.max_pixels,
            options: config.output.clone(),
            metadata: vec![
                ("CATALOG".to_string(), catalog_id.to_string()),
                ("START_DATE".to_string(), config.start.to_string()),
                ("END_DATE".to_string(), config.end.to_string()),
                ("CLOUD_THRESHOLD".to_string(), config.cloud_threshold.to_string()),
            ],
        }
    }
}

/// Handle on an export running in the background
pub struct ExportTask {
    path: PathBuf,
    handle: JoinHandle<Result<PathBuf>>,
}

impl ExportTask {
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the export finishes and return the written file
    pub fn wait(self) -> Result<PathBuf> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(Error::Export(format!(
                "writer thread for {} panicked",
                self.path.display()
            ))),
        }
    }
}

pub struct Exporter;

impl Exporter {
    /// Checks that would make the export fail, run before anything is written
    pub fn check(composite: &CompositeRaster, max_pixels: u64) -> Result<()> {
        let pixels = composite.grid().pixel_count();
        if pixels > max_pixels {
            return Err(Error::TooManyPixels { pixels, max_pixels });
        }
        if composite.is_empty() {
            return Err(Error::EmptyComposite);
        }
        Ok(())
    }

    /// Start writing `composite` on its own thread. Failures surface
    /// through `ExportTask::wait`; nothing is retried.
    pub fn submit(composite: CompositeRaster, request: ExportRequest) -> ExportTask {
        let path = request.path.clone();
        let handle = thread::spawn(move || {
            let result = export(&composite, &request);
            match &result {
                Ok(path) => info!(
                    "Exported composite of {} scenes to {}",
                    composite.scene_count(),
                    path.display()
                ),
                Err(e) => error!("Export to {} failed: {}", request.path.display(), e),
            }
            result
        });
        ExportTask { path, handle }
    }
}

fn export(composite: &CompositeRaster, request: &ExportRequest) -> Result<PathBuf> {
    Exporter::check(composite, request.max_pixels)?;

    if let Some(parent) = request.path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut metadata: Vec<(&str, String)> = request
        .metadata
        .iter()
        .map(|(k, v)| (k.as_str(), v.clone()))
        .collect();
    metadata.push(("SCENE_COUNT", composite.scene_count().to_string()));

    write_composite(composite, &request.path, &request.options, &metadata)?;
    Ok(request.path.clone())
}
