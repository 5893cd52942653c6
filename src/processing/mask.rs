// src/processing/mask.rs
use std::collections::HashSet;

use gdal::raster::Buffer;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::scene::{BandMap, Scene, SceneClass, REFLECTANCE_SCALE};
use crate::utils::TypedBuffer;

/// Removes excluded scene classes and rescales digital numbers to reflectance
pub struct CloudMasker {
    bands: BandMap,
    excluded: HashSet<u8>,
}

impl CloudMasker {
    pub fn new(bands: BandMap, excluded: &[SceneClass]) -> Self {
        Self {
            bands,
            excluded: excluded.iter().map(|c| c.code()).collect(),
        }
    }

    /// True where the pixel's class may be used
    pub fn is_valid(&self, class_code: u8) -> bool {
        !self.excluded.contains(&class_code)
    }

    /// Mask every band except the classification band, then divide it by
    /// the reflectance scale. The classification band is passed through.
    pub fn apply(&self, scene: Scene) -> Result<Scene> {
        let classification = scene.require_band(&self.bands.classification)?;
        let classes = classification
            .as_u8()
            .ok_or(Error::UnsupportedBufferType {
                operation: "cloud masking",
                found: classification.type_name(),
            })?;
        let valid: Vec<bool> = classes.data().iter().map(|&c| self.is_valid(c)).collect();
        let expected = classes.shape();

        let mut masked = Scene::new(scene.id.clone(), scene.acquired);

        for band in scene.bands() {
            if band.name == self.bands.classification {
                masked = masked.with_band(band.name.clone(), band.data.clone());
                continue;
            }
            if band.data.shape() != expected {
                return Err(Error::ShapeMismatch {
                    band: band.name.clone(),
                    expected,
                    found: band.data.shape(),
                });
            }

            let values = band.data.values_f64("cloud masking")?;
            let mut result = vec![0.0f64; values.len()];
            result.par_iter_mut().enumerate().for_each(|(i, out)| {
                *out = if valid[i] {
                    values[i] / REFLECTANCE_SCALE
                } else {
                    f64::NAN
                };
            });

            masked = masked.with_band(
                band.name.clone(),
                TypedBuffer::F64(Buffer::new(expected, result)),
            );
        }

        Ok(masked)
    }
}
