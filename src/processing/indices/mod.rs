// src/processing/indices/mod.rs
pub mod evi;
pub mod ndi;
pub mod savi;

// Re-export indices
pub use evi::EVI;
pub use ndi::NDI;
pub use savi::{DEFAULT_SOIL_FACTOR, SAVI};

use log::debug;

use crate::error::{Error, Result};
use crate::processing::parallel::IndexCalculator;
use crate::scene::{BandMap, Scene};
use crate::utils::TypedBuffer;

// Positions of the reflectance bands in the calculator inputs
const BLUE: usize = 0;
const GREEN: usize = 1;
const RED: usize = 2;
const NIR: usize = 3;
const SWIR1: usize = 4;

/// Divide and cast to the band's single precision. A zero denominator,
/// a NaN input or a non-finite quotient gives NaN (no data).
pub(crate) fn ratio(numerator: f64, denominator: f64) -> f32 {
    if denominator == 0.0 {
        return f32::NAN;
    }
    let value = numerator / denominator;
    if value.is_finite() {
        value as f32
    } else {
        f32::NAN
    }
}

/// Common shape of the inputs, or the first mismatching one
pub(crate) fn checked_shape(index: &str, inputs: &[&TypedBuffer]) -> Result<(usize, usize)> {
    let expected = inputs[0].shape();
    match inputs.iter().find(|b| b.shape() != expected) {
        Some(other) => Err(Error::ShapeMismatch {
            band: format!("{index} input"),
            expected,
            found: other.shape(),
        }),
        None => Ok(expected),
    }
}

/// Attaches the five composite indices to a masked reflectance scene
pub struct SpectralIndices {
    bands: BandMap,
    calculators: Vec<Box<dyn IndexCalculator>>,
}

impl SpectralIndices {
    pub fn new(bands: BandMap) -> Self {
        let calculators: Vec<Box<dyn IndexCalculator>> = vec![
            Box::new(NDI::new(NIR, RED, Some("NDVI".to_string()))),
            Box::new(EVI::new(NIR, RED, BLUE, None)),
            Box::new(SAVI::new(NIR, RED, DEFAULT_SOIL_FACTOR, None)),
            Box::new(NDI::new(GREEN, NIR, Some("NDWI".to_string()))),
            Box::new(NDI::new(GREEN, SWIR1, Some("MNDWI".to_string()))),
        ];
        Self { bands, calculators }
    }

    pub fn names(&self) -> Vec<&str> {
        self.calculators.iter().map(|c| c.name()).collect()
    }

    /// Return the scene with one Float32 band per index appended.
    /// Reflectance bands are left in place.
    pub fn apply(&self, scene: Scene) -> Result<Scene> {
        let inputs = self
            .bands
            .reflectance()
            .iter()
            .map(|name| scene.require_band(name).cloned())
            .collect::<Result<Vec<_>>>()?;

        let mut outputs = Vec::with_capacity(self.calculators.len());
        for calculator in &self.calculators {
            outputs.push((calculator.name().to_string(), calculator.calculate(&inputs)?));
        }
        debug!("{}: computed {}", scene.id, self.names().join(", "));

        Ok(outputs
            .into_iter()
            .fold(scene, |scene, (name, data)| scene.with_band(name, data)))
    }
}
