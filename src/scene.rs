// src/scene.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::TypedBuffer;

/// Names of the composite's bands, in export order
pub const INDEX_BANDS: [&str; 5] = ["NDVI", "EVI", "SAVI", "NDWI", "MNDWI"];

/// Sentinel-2 L2A digital numbers are reflectance scaled by this factor
pub const REFLECTANCE_SCALE: f64 = 10000.0;

/// Sentinel-2 scene-classification (SCL) legend.
///
/// Codes come from the L2A product specification; other catalogs need
/// their own mapping into these classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneClass {
    NoData,
    SaturatedOrDefective,
    DarkAreaPixels,
    CloudShadows,
    Vegetation,
    NotVegetated,
    Water,
    Unclassified,
    CloudMediumProbability,
    CloudHighProbability,
    ThinCirrus,
    SnowIce,
}

impl SceneClass {
    pub const ALL: [SceneClass; 12] = [
        SceneClass::NoData,
        SceneClass::SaturatedOrDefective,
        SceneClass::DarkAreaPixels,
        SceneClass::CloudShadows,
        SceneClass::Vegetation,
        SceneClass::NotVegetated,
        SceneClass::Water,
        SceneClass::Unclassified,
        SceneClass::CloudMediumProbability,
        SceneClass::CloudHighProbability,
        SceneClass::ThinCirrus,
        SceneClass::SnowIce,
    ];

    /// Classes removed before any index is computed: cloud shadow,
    /// medium/high probability cloud, thin cirrus and snow/ice.
    pub const DEFAULT_EXCLUDED: [SceneClass; 5] = [
        SceneClass::CloudShadows,
        SceneClass::CloudMediumProbability,
        SceneClass::CloudHighProbability,
        SceneClass::ThinCirrus,
        SceneClass::SnowIce,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

/// Catalog band names for each role the pipeline reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandMap {
    pub blue: String,
    pub green: String,
    pub red: String,
    pub nir: String,
    pub swir1: String,
    pub classification: String,
}

impl Default for BandMap {
    fn default() -> Self {
        Self {
            blue: "B2".to_string(),
            green: "B3".to_string(),
            red: "B4".to_string(),
            nir: "B8".to_string(),
            swir1: "B11".to_string(),
            classification: "SCL".to_string(),
        }
    }
}

impl BandMap {
    /// Reflectance bands in the order blue, green, red, nir, swir1
    pub fn reflectance(&self) -> [&str; 5] {
        [&self.blue, &self.green, &self.red, &self.nir, &self.swir1]
    }
}

#[derive(Debug, Clone)]
pub struct Band {
    pub name: String,
    pub data: TypedBuffer,
}

/// One acquisition sampled on the working grid.
///
/// Stages consume a scene and hand back a new one; bands are never
/// shared between scenes.
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: String,
    pub acquired: DateTime<Utc>,
    bands: Vec<Band>,
}

impl Scene {
    pub fn new(id: impl Into<String>, acquired: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            acquired,
            bands: Vec::new(),
        }
    }

    /// Append a band, replacing any band already carrying that name
    pub fn with_band(mut self, name: impl Into<String>, data: TypedBuffer) -> Self {
        let name = name.into();
        self.bands.retain(|b| b.name != name);
        self.bands.push(Band { name, data });
        self
    }

    pub fn band(&self, name: &str) -> Option<&TypedBuffer> {
        self.bands.iter().find(|b| b.name == name).map(|b| &b.data)
    }

    pub fn require_band(&self, name: &str) -> Result<&TypedBuffer> {
        self.band(name).ok_or_else(|| Error::MissingBand {
            scene: self.id.clone(),
            band: name.to_string(),
        })
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    /// (band name, pixel type) pairs
    pub fn band_types(&self) -> Vec<(&str, &'static str)> {
        self.bands
            .iter()
            .map(|b| (b.name.as_str(), b.data.type_name()))
            .collect()
    }

    /// Keep only the named bands, in the order given
    pub fn select(self, names: &[&str]) -> Result<Scene> {
        let Scene { id, acquired, mut bands } = self;
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            match bands.iter().position(|b| b.name == *name) {
                Some(pos) => selected.push(bands.swap_remove(pos)),
                None => {
                    return Err(Error::MissingBand {
                        scene: id,
                        band: name.to_string(),
                    })
                }
            }
        }
        Ok(Scene {
            id,
            acquired,
            bands: selected,
        })
    }

    pub fn into_bands(self) -> Vec<Band> {
        self.bands
    }
}
