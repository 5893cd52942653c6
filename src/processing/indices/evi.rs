// src/processing/indices/evi.rs
use gdal::raster::Buffer;
use rayon::prelude::*;

use super::{checked_shape, ratio};
use crate::error::Result;
use crate::processing::parallel::IndexCalculator;
use crate::utils::gdal_ext::TypedBuffer;

// EVI coefficients from MODIS documentation
const G: f64 = 2.5; // Gain factor
const L: f64 = 1.0; // Canopy background adjustment
const C1: f64 = 6.0; // Aerosol resistance (red)
const C2: f64 = 7.5; // Aerosol resistance (blue)

/// Enhanced Vegetation Index (EVI) calculator
///
/// `EVI = G * (NIR - RED) / (NIR + C1*RED - C2*BLUE + L)` on reflectance.
/// Results are not clamped and may leave [-1, 1] for extreme inputs.
pub struct EVI {
    nir_index: usize,
    red_index: usize,
    blue_index: usize,
    name: String,
}

impl EVI {
    pub fn new(nir_index: usize, red_index: usize, blue_index: usize, name: Option<String>) -> Self {
        Self {
            nir_index,
            red_index,
            blue_index,
            name: name.unwrap_or_else(|| "EVI".to_string()),
        }
    }
}

impl IndexCalculator for EVI {
    fn calculate(&self, inputs: &[TypedBuffer]) -> Result<TypedBuffer> {
        let nir = &inputs[self.nir_index];
        let red = &inputs[self.red_index];
        let blue = &inputs[self.blue_index];
        let shape = checked_shape(&self.name, &[nir, red, blue])?;

        let nir_band = nir.values_f64("EVI")?;
        let red_band = red.values_f64("EVI")?;
        let blue_band = blue.values_f64("EVI")?;

        let mut result_data = vec![0.0f32; shape.0 * shape.1];
        result_data.par_iter_mut().enumerate().for_each(|(i, result)| {
            let nir_val = nir_band[i];
            let red_val = red_band[i];
            let blue_val = blue_band[i];

            let denominator = nir_val + C1 * red_val - C2 * blue_val + L;
            *result = ratio(G * (nir_val - red_val), denominator);
        });

        Ok(TypedBuffer::F32(Buffer::new(shape, result_data)))
    }

    fn required_bands(&self) -> usize {
        3 // NIR, RED, BLUE
    }

    fn name(&self) -> &str {
        &self.name
    }
}
