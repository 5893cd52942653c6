// src/config.rs
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::DateWindow;
use crate::error::{Error, Result};
use crate::scene::SceneClass;

/// GeoTIFF creation settings for the exported composite
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GeoTiffOptions {
    #[serde(default = "default_compress")]
    pub compress: String,
    #[serde(default = "default_compress_level")]
    pub compress_level: u8,
    #[serde(default = "default_true")]
    pub tiled: bool,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self {
            compress: default_compress(),
            compress_level: default_compress_level(),
            tiled: true,
        }
    }
}

/// Every input of one composite run
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Catalog manifest, or the directory holding `catalog.json`
    pub catalog: PathBuf,
    /// Any OGR-readable polygon source
    pub aoi: PathBuf,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Scenes must report strictly less cloud than this percentage
    #[serde(default = "default_cloud_threshold")]
    pub cloud_threshold: f64,
    /// Pixel size in units of `crs`
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default = "default_crs")]
    pub crs: String,
    #[serde(default = "default_destination")]
    pub destination: PathBuf,
    pub prefix: String,
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
    #[serde(default = "default_excluded_classes")]
    pub excluded_classes: Vec<SceneClass>,
    #[serde(default)]
    pub output: GeoTiffOptions,
    #[serde(default)]
    pub io_threads: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_compress() -> String {
    "DEFLATE".to_string()
}

fn default_compress_level() -> u8 {
    6
}

fn default_true() -> bool {
    true
}

fn default_cloud_threshold() -> f64 {
    50.0
}

fn default_scale() -> f64 {
    10.0
}

fn default_crs() -> String {
    "EPSG:3857".to_string()
}

fn default_destination() -> PathBuf {
    PathBuf::from("exports")
}

fn default_max_pixels() -> u64 {
    10_000_000_000_000
}

fn default_excluded_classes() -> Vec<SceneClass> {
    SceneClass::DEFAULT_EXCLUDED.to_vec()
}

impl PipelineConfig {
    pub fn new(
        catalog: impl Into<PathBuf>,
        aoi: impl Into<PathBuf>,
        start: NaiveDate,
        end: NaiveDate,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            aoi: aoi.into(),
            start,
            end,
            cloud_threshold: default_cloud_threshold(),
            scale: default_scale(),
            crs: default_crs(),
            destination: default_destination(),
            prefix: prefix.into(),
            max_pixels: default_max_pixels(),
            excluded_classes: default_excluded_classes(),
            output: GeoTiffOptions::default(),
            io_threads: None,
            timeout_secs: None,
        }
    }

    /// Configuration covering 1 January to 31 December of `year`
    pub fn for_year(
        catalog: impl Into<PathBuf>,
        aoi: impl Into<PathBuf>,
        year: i32,
        prefix: impl Into<String>,
    ) -> Result<Self> {
        let (start, end) = year_bounds(year)?;
        Ok(Self::new(catalog, aoi, start, end, prefix))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn window(&self) -> DateWindow {
        DateWindow {
            start: self.start,
            end: self.end,
        }
    }

    /// Where the composite is written
    pub fn output_path(&self) -> PathBuf {
        self.destination.join(format!("{}_ALL_INDICES.tif", self.prefix))
    }

    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(Error::Config(format!(
                "start date {} is after end date {}",
                self.start, self.end
            )));
        }
        if !(self.cloud_threshold > 0.0 && self.cloud_threshold <= 100.0) {
            return Err(Error::Config(format!(
                "cloud threshold must be in (0, 100], got {}",
                self.cloud_threshold
            )));
        }
        if !(self.scale > 0.0 && self.scale.is_finite()) {
            return Err(Error::Config(format!("scale must be positive, got {}", self.scale)));
        }
        if self.prefix.trim().is_empty() {
            return Err(Error::Config("file name prefix is empty".to_string()));
        }
        if self.max_pixels == 0 {
            return Err(Error::Config("max_pixels must be at least 1".to_string()));
        }
        if self.crs.trim().is_empty() {
            return Err(Error::Config("output CRS is empty".to_string()));
        }
        Ok(())
    }
}

pub fn year_bounds(year: i32) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1);
    let end = NaiveDate::from_ymd_opt(year, 12, 31);
    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(Error::Config(format!("year {year} is out of range"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_json_gets_defaults() {
        let json = r#"{
            "catalog": "data/catalog.json",
            "aoi": "data/limite.geojson",
            "start": "2022-01-01",
            "end": "2022-12-31",
            "prefix": "sanbernardo_indices_2022"
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.cloud_threshold, 50.0);
        assert_eq!(config.scale, 10.0);
        assert_eq!(config.crs, "EPSG:3857");
        assert_eq!(config.max_pixels, 10_000_000_000_000);
        assert_eq!(config.excluded_classes, SceneClass::DEFAULT_EXCLUDED.to_vec());
        assert_eq!(config.output, GeoTiffOptions::default());
        assert!(config.validate().is_ok());
        assert_eq!(
            config.output_path(),
            PathBuf::from("exports/sanbernardo_indices_2022_ALL_INDICES.tif")
        );
    }

    #[test]
    fn excluded_classes_use_legend_names() {
        let json = r#"{
            "catalog": "c", "aoi": "a", "start": "2022-01-01", "end": "2022-12-31",
            "prefix": "p", "excluded_classes": ["cloud_high_probability", "snow_ice"]
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.excluded_classes,
            vec![SceneClass::CloudHighProbability, SceneClass::SnowIce]
        );
    }

    #[test]
    fn for_year_spans_the_calendar_year() {
        let config = PipelineConfig::for_year("c", "a", 2022, "p").unwrap();
        assert_eq!(config.start, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(config.end, NaiveDate::from_ymd_opt(2022, 12, 31).unwrap());
    }

    #[test]
    fn validation_rejects_bad_setups() {
        let base = PipelineConfig::for_year("c", "a", 2022, "p").unwrap();

        let mut reversed = base.clone();
        std::mem::swap(&mut reversed.start, &mut reversed.end);
        assert!(matches!(reversed.validate(), Err(Error::Config(_))));

        let mut threshold = base.clone();
        threshold.cloud_threshold = 0.0;
        assert!(threshold.validate().is_err());

        let mut scale = base.clone();
        scale.scale = -10.0;
        assert!(scale.validate().is_err());

        let mut prefix = base;
        prefix.prefix = "  ".to_string();
        assert!(prefix.validate().is_err());
    }
}
