// src/processing/indices/ndi.rs
use gdal::raster::Buffer;
use rayon::prelude::*;

use super::{checked_shape, ratio};
use crate::error::Result;
use crate::processing::parallel::IndexCalculator;
use crate::utils::gdal_ext::TypedBuffer;

/// Normalized Difference Index (NDI) calculator: (A - B) / (A + B)
///
/// NDVI, NDWI and MNDWI are all instances with different band pairs.
pub struct NDI {
    band_a_index: usize,
    band_b_index: usize,
    name: String,
}

impl NDI {
    pub fn new(band_a_index: usize, band_b_index: usize, name: Option<String>) -> Self {
        Self {
            band_a_index,
            band_b_index,
            name: name.unwrap_or_else(|| "NDI".to_string()),
        }
    }
}

impl IndexCalculator for NDI {
    fn calculate(&self, inputs: &[TypedBuffer]) -> Result<TypedBuffer> {
        let band_a = &inputs[self.band_a_index];
        let band_b = &inputs[self.band_b_index];
        let shape = checked_shape(&self.name, &[band_a, band_b])?;

        let a_data = band_a.values_f64("normalized difference")?;
        let b_data = band_b.values_f64("normalized difference")?;

        let mut result_data = vec![0.0f32; shape.0 * shape.1];
        result_data.par_iter_mut().enumerate().for_each(|(i, result)| {
            let a_val = a_data[i];
            let b_val = b_data[i];
            *result = ratio(a_val - b_val, a_val + b_val);
        });

        Ok(TypedBuffer::F32(Buffer::new(shape, result_data)))
    }

    fn required_bands(&self) -> usize {
        2
    }

    fn name(&self) -> &str {
        &self.name
    }
}
