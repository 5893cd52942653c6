// src/processing/composite.rs
use gdal::raster::Buffer;
use log::debug;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::io::{Aoi, GeoInfo};
use crate::scene::Scene;
use crate::utils::stats::median_in_place;
use crate::utils::TypedBuffer;

/// Per-pixel temporal median of the index bands, clipped to the AOI
#[derive(Debug, Clone)]
pub struct CompositeRaster {
    grid: GeoInfo,
    bands: Vec<(String, Buffer<f32>)>,
    scene_count: usize,
}

impl CompositeRaster {
    pub fn grid(&self) -> &GeoInfo {
        &self.grid
    }

    pub fn bands(&self) -> &[(String, Buffer<f32>)] {
        &self.bands
    }

    pub fn band(&self, name: &str) -> Option<&Buffer<f32>> {
        self.bands.iter().find(|(n, _)| n == name).map(|(_, b)| b)
    }

    /// Number of scenes the median was taken over
    pub fn scene_count(&self) -> usize {
        self.scene_count
    }

    /// Pixels holding a value in at least one band
    pub fn valid_pixel_count(&self) -> usize {
        let len = self.grid.width * self.grid.height;
        (0..len)
            .filter(|&i| self.bands.iter().any(|(_, b)| !b.data()[i].is_nan()))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.bands
            .iter()
            .all(|(_, b)| b.data().iter().all(|v| v.is_nan()))
    }

    pub fn band_types(&self) -> Vec<(&str, &'static str)> {
        self.bands.iter().map(|(n, _)| (n.as_str(), "Float32")).collect()
    }
}

/// Reduces a scene collection to one raster per band name
pub struct TemporalCompositor {
    band_names: Vec<String>,
}

impl TemporalCompositor {
    pub fn new<S: AsRef<str>>(band_names: &[S]) -> Self {
        Self {
            band_names: band_names.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    /// Median over the finite values of each pixel. Pixels with no valid
    /// sample, or whose centre lies outside the AOI, are NaN. An empty
    /// collection yields an all-NaN composite on `grid`.
    pub fn composite(&self, scenes: &[Scene], grid: &GeoInfo, aoi: &Aoi) -> Result<CompositeRaster> {
        let inside = aoi.mask(grid);
        let shape = grid.shape();

        let mut bands = Vec::with_capacity(self.band_names.len());
        for name in &self.band_names {
            let layers = scenes
                .iter()
                .map(|scene| band_values(scene, name, shape))
                .collect::<Result<Vec<_>>>()?;

            let mut result = vec![f32::NAN; shape.0 * shape.1];
            result
                .par_chunks_mut(shape.0)
                .enumerate()
                .for_each_init(Vec::new, |samples, (row, out_row)| {
                    for (col, out) in out_row.iter_mut().enumerate() {
                        let i = row * shape.0 + col;
                        if !inside[i] {
                            continue;
                        }
                        samples.clear();
                        samples.extend(
                            layers
                                .iter()
                                .map(|layer| layer[i])
                                .filter(|v| !v.is_nan())
                                .map(f64::from),
                        );
                        if let Some(m) = median_in_place(samples) {
                            *out = m as f32;
                        }
                    }
                });

            debug!("Composited {} over {} scenes", name, scenes.len());
            bands.push((name.clone(), Buffer::new(shape, result)));
        }

        Ok(CompositeRaster {
            grid: grid.clone(),
            bands,
            scene_count: scenes.len(),
        })
    }
}

fn band_values<'a>(scene: &'a Scene, name: &str, shape: (usize, usize)) -> Result<&'a [f32]> {
    let band = scene.require_band(name)?;
    if band.shape() != shape {
        return Err(Error::ShapeMismatch {
            band: format!("{}/{}", scene.id, name),
            expected: shape,
            found: band.shape(),
        });
    }
    match band {
        TypedBuffer::F32(b) => Ok(b.data()),
        other => Err(Error::UnsupportedBufferType {
            operation: "temporal median",
            found: other.type_name(),
        }),
    }
}
