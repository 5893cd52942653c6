// src/pipeline.rs
use std::time::{Duration, Instant};

use itertools::Itertools;
use log::{info, warn};

use crate::catalog::{Catalog, CollectionLoader, SceneEntry};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::export::{ExportRequest, ExportTask, Exporter};
use crate::io::{srs, Aoi, GeoInfo};
use crate::processing::parallel::ProcessReport;
use crate::processing::{
    CloudMasker, CompositeRaster, ParallelProcessor, SceneStages, SpectralIndices, TemporalCompositor,
};
use crate::scene::INDEX_BANDS;

/// Inputs resolved from the configuration before any scene is read
pub struct RunContext {
    pub catalog: Catalog,
    pub aoi: Aoi,
    pub grid: GeoInfo,
    pub entries: Vec<SceneEntry>,
}

/// Eager Sentinel-2 index composite: filter, mask, index, median, clip
pub struct Pipeline {
    config: PipelineConfig,
    processor: ParallelProcessor,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let processor = ParallelProcessor::new(config.io_threads);
        Self { config, processor }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validate the configuration, load the AOI and catalog, build the
    /// working grid and select the scenes. Every failure here is a setup
    /// error.
    pub fn prepare(&self) -> Result<RunContext> {
        self.config.validate()?;

        let working_srs = srs::spatial_ref(&self.config.crs)
            .map_err(|e| Error::Config(format!("unknown CRS {}: {e}", self.config.crs)))?;
        let aoi = Aoi::load(&self.config.aoi, &working_srs)?;

        let grid = GeoInfo::covering(aoi.bounds(), self.config.scale, working_srs.to_wkt()?)?;
        let pixels = grid.pixel_count();
        if pixels > self.config.max_pixels {
            return Err(Error::TooManyPixels {
                pixels,
                max_pixels: self.config.max_pixels,
            });
        }
        info!(
            "Working grid {}x{} at {} in {}",
            grid.width, grid.height, self.config.scale, self.config.crs
        );

        let catalog = Catalog::open(&self.config.catalog)?;
        let loader = CollectionLoader::new(self.config.window(), self.config.cloud_threshold);
        let entries = loader.load(&catalog, &aoi, &working_srs);

        Ok(RunContext {
            catalog,
            aoi,
            grid,
            entries,
        })
    }

    /// Process the selected scenes and reduce them to the composite.
    ///
    /// The index bands of every processed scene are held in memory until
    /// the median runs, so peak memory grows with scene count times grid
    /// size. `max_pixels` only bounds the grid.
    pub fn composite(&self, context: &RunContext) -> Result<CompositeRaster> {
        let started = Instant::now();
        info!(
            "Up to {:.1} MiB of index bands for {} scenes",
            context.grid.working_set_bytes(context.entries.len(), INDEX_BANDS.len()) as f64
                / (1024.0 * 1024.0),
            context.entries.len()
        );
        let deadline = self
            .config
            .timeout_secs
            .map(|secs| (started + Duration::from_secs(secs), secs));

        let masker = CloudMasker::new(context.catalog.bands.clone(), &self.config.excluded_classes);
        let indices = SpectralIndices::new(context.catalog.bands.clone());
        let stages = SceneStages {
            bands: &context.catalog.bands,
            grid: &context.grid,
            masker: &masker,
            indices: &indices,
            keep: &INDEX_BANDS,
        };

        let ProcessReport { scenes, skipped } =
            self.processor.process_scenes(&context.entries, &stages, deadline)?;
        if !skipped.is_empty() {
            info!(
                "{} scene(s) left out: {}",
                skipped.len(),
                skipped.iter().map(|s| &s.id).join(", ")
            );
        }
        if let Some(first) = scenes.first() {
            info!("First scene band types: {}", format_types(&first.band_types()));
        }

        let composite =
            TemporalCompositor::new(&INDEX_BANDS).composite(&scenes, &context.grid, &context.aoi)?;
        info!("Composite band types: {}", format_types(&composite.band_types()));
        if composite.is_empty() {
            warn!("Composite has no valid pixels");
        }

        info!(
            "Composite of {} scenes built in {:.2}s",
            composite.scene_count(),
            started.elapsed().as_secs_f64()
        );
        Ok(composite)
    }

    /// `prepare` then `composite`
    pub fn run(&self) -> Result<CompositeRaster> {
        let context = self.prepare()?;
        self.composite(&context)
    }

    /// Run, then hand the composite to a background export
    pub fn run_and_export(&self) -> Result<ExportTask> {
        let context = self.prepare()?;
        let composite = self.composite(&context)?;
        let request = ExportRequest::from_config(&self.config, &context.catalog.id);
        Ok(Exporter::submit(composite, request))
    }
}

fn format_types(types: &[(&str, &str)]) -> String {
    types
        .iter()
        .map(|(name, kind)| format!("{name}={kind}"))
        .join(", ")
}
