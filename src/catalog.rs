// src/catalog.rs
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use gdal::spatial_ref::SpatialRef;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::io::{reader, Aoi};
use crate::scene::BandMap;

pub const MANIFEST_FILE: &str = "catalog.json";

/// One scene as listed in the catalog manifest
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SceneEntry {
    pub id: String,
    pub acquired: DateTime<Utc>,
    pub cloudy_pixel_percentage: f64,
    /// Band name -> raster path, relative to the manifest until resolved
    pub assets: BTreeMap<String, PathBuf>,
}

impl SceneEntry {
    pub fn asset(&self, band: &str) -> Result<&Path> {
        self.assets
            .get(band)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::MissingBand {
                scene: self.id.clone(),
                band: band.to_string(),
            })
    }
}

#[derive(Deserialize, Serialize, Debug)]
struct Manifest {
    id: String,
    #[serde(default)]
    bands: BandMap,
    scenes: Vec<SceneEntry>,
}

/// A local scene catalog backed by a JSON manifest
#[derive(Debug, Clone)]
pub struct Catalog {
    pub id: String,
    pub bands: BandMap,
    scenes: Vec<SceneEntry>,
}

impl Catalog {
    /// Open `catalog.json`, either given directly or inside a directory
    pub fn open(path: &Path) -> Result<Self> {
        let manifest_path = if path.is_dir() {
            path.join(MANIFEST_FILE)
        } else {
            path.to_path_buf()
        };
        let root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let content = fs::read_to_string(&manifest_path).map_err(|e| {
            Error::Catalog(format!("cannot read {}: {e}", manifest_path.display()))
        })?;
        let manifest: Manifest = serde_json::from_str(&content).map_err(|e| {
            Error::Catalog(format!("malformed manifest {}: {e}", manifest_path.display()))
        })?;

        let scenes = manifest
            .scenes
            .into_iter()
            .map(|mut scene| {
                for asset in scene.assets.values_mut() {
                    if asset.is_relative() {
                        *asset = root.join(&*asset);
                    }
                }
                scene
            })
            .collect::<Vec<_>>();

        debug!("Catalog {} lists {} scenes", manifest.id, scenes.len());
        Ok(Self {
            id: manifest.id,
            bands: manifest.bands,
            scenes,
        })
    }

    pub fn from_entries(id: impl Into<String>, bands: BandMap, scenes: Vec<SceneEntry>) -> Self {
        Self {
            id: id.into(),
            bands,
            scenes,
        }
    }

    pub fn scenes(&self) -> &[SceneEntry] {
        &self.scenes
    }
}

/// Closed acquisition-date interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, acquired: &DateTime<Utc>) -> bool {
        let date = acquired.date_naive();
        self.start <= date && date <= self.end
    }
}

/// Selects the scenes a composite is built from
pub struct CollectionLoader {
    pub window: DateWindow,
    pub cloud_threshold: f64,
}

impl CollectionLoader {
    pub fn new(window: DateWindow, cloud_threshold: f64) -> Self {
        Self {
            window,
            cloud_threshold,
        }
    }

    /// Date and scene-level cloud filters, which need no raster access
    pub fn matches_metadata(&self, entry: &SceneEntry) -> bool {
        self.window.contains(&entry.acquired) && entry.cloudy_pixel_percentage < self.cloud_threshold
    }

    /// Scenes acquired inside the window, under the cloud threshold and
    /// overlapping the AOI, sorted by acquisition time.
    ///
    /// The footprint is the extent of the red band. Scenes whose footprint
    /// cannot be read are skipped. No match is not an error.
    pub fn load(&self, catalog: &Catalog, aoi: &Aoi, working_srs: &SpatialRef) -> Vec<SceneEntry> {
        let mut selected = Vec::new();

        for entry in catalog.scenes().iter().filter(|e| self.matches_metadata(e)) {
            let footprint = entry
                .asset(&catalog.bands.red)
                .and_then(|path| reader::footprint(path, working_srs));
            match footprint {
                Ok(rect) if aoi.intersects_rect(&rect) => selected.push(entry.clone()),
                Ok(_) => debug!("Scene {} does not overlap the area of interest", entry.id),
                Err(e) => warn!("Skipping scene {}: {}", entry.id, e),
            }
        }

        selected.sort_by(|a, b| a.acquired.cmp(&b.acquired).then_with(|| a.id.cmp(&b.id)));
        info!(
            "Selected {} of {} scenes in {} between {} and {} (cloud < {}%)",
            selected.len(),
            catalog.scenes().len(),
            catalog.id,
            self.window.start,
            self.window.end,
            self.cloud_threshold
        );
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(acquired: &str, cloud: f64) -> SceneEntry {
        SceneEntry {
            id: format!("S2_{acquired}"),
            acquired: acquired.parse().unwrap(),
            cloudy_pixel_percentage: cloud,
            assets: BTreeMap::new(),
        }
    }

    fn year_2022() -> DateWindow {
        DateWindow {
            start: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2022, 12, 31).unwrap(),
        }
    }

    #[test]
    fn window_includes_both_boundary_days() {
        let window = year_2022();
        assert!(window.contains(&entry("2022-01-01T00:00:00Z", 0.0).acquired));
        assert!(window.contains(&entry("2022-12-31T23:59:59Z", 0.0).acquired));
        assert!(!window.contains(&entry("2021-12-31T23:59:59Z", 0.0).acquired));
        assert!(!window.contains(&entry("2023-01-01T00:00:00Z", 0.0).acquired));
    }

    #[test]
    fn metadata_filter_needs_cloud_strictly_below_threshold() {
        let loader = CollectionLoader::new(year_2022(), 20.0);
        assert!(loader.matches_metadata(&entry("2022-12-31T23:59:59Z", 19.99)));
        assert!(!loader.matches_metadata(&entry("2022-06-01T10:00:00Z", 20.0)));
        assert!(!loader.matches_metadata(&entry("2021-12-31T23:59:59Z", 0.0)));
    }
}
