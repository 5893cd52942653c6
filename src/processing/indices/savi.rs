// src/processing/indices/savi.rs
use gdal::raster::Buffer;
use rayon::prelude::*;

use super::{checked_shape, ratio};
use crate::error::Result;
use crate::processing::parallel::IndexCalculator;
use crate::utils::gdal_ext::TypedBuffer;

/// Soil brightness correction used for the composite's SAVI band
pub const DEFAULT_SOIL_FACTOR: f64 = 0.5;

/// Soil Adjusted Vegetation Index (SAVI) calculator
pub struct SAVI {
    nir_index: usize,
    red_index: usize,
    soil_factor: f64,
    name: String,
}

impl SAVI {
    pub fn new(nir_index: usize, red_index: usize, soil_factor: f64, name: Option<String>) -> Self {
        Self {
            nir_index,
            red_index,
            soil_factor,
            name: name.unwrap_or_else(|| "SAVI".to_string()),
        }
    }
}

impl IndexCalculator for SAVI {
    fn calculate(&self, inputs: &[TypedBuffer]) -> Result<TypedBuffer> {
        let nir = &inputs[self.nir_index];
        let red = &inputs[self.red_index];
        let shape = checked_shape(&self.name, &[nir, red])?;

        let nir_band = nir.values_f64("SAVI")?;
        let red_band = red.values_f64("SAVI")?;
        let l = self.soil_factor;

        let mut result_data = vec![0.0f32; shape.0 * shape.1];
        result_data.par_iter_mut().enumerate().for_each(|(i, result)| {
            let nir_val = nir_band[i];
            let red_val = red_band[i];

            // SAVI = ((NIR - RED) * (1 + L)) / (NIR + RED + L)
            *result = ratio((nir_val - red_val) * (1.0 + l), nir_val + red_val + l);
        });

        Ok(TypedBuffer::F32(Buffer::new(shape, result_data)))
    }

    fn required_bands(&self) -> usize {
        2 // NIR, RED
    }

    fn name(&self) -> &str {
        &self.name
    }
}
