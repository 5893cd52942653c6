// src/io/aoi.rs
use std::path::Path;

use gdal::spatial_ref::SpatialRef;
use gdal::vector::LayerAccess;
use gdal::Dataset;
use geo::{BoundingRect, Geometry, Intersects, MultiPolygon, Point, Polygon, Rect};
use log::{debug, warn};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::io::reader::GeoInfo;

/// Area of interest, held in the working CRS
#[derive(Debug, Clone)]
pub struct Aoi {
    geometry: MultiPolygon<f64>,
    bounds: Rect<f64>,
}

impl Aoi {
    pub fn from_polygons(geometry: MultiPolygon<f64>) -> Result<Self> {
        let bounds = geometry
            .bounding_rect()
            .ok_or_else(|| Error::Config("area of interest has no polygons".to_string()))?;
        Ok(Self { geometry, bounds })
    }

    /// Read every polygon of the first layer of an OGR source and move
    /// it into `target`. Layers without a CRS are taken as already in it.
    pub fn load(path: &Path, target: &SpatialRef) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidAoi {
            path: path.to_path_buf(),
            reason,
        };

        let dataset = Dataset::open(path).map_err(|e| invalid(e.to_string()))?;
        let mut layer = dataset.layer(0).map_err(|e| invalid(e.to_string()))?;
        let has_srs = layer.spatial_ref().is_some();

        let mut polygons = Vec::new();
        for feature in layer.features() {
            let Some(geometry) = feature.geometry() else {
                warn!("Skipping feature without geometry in {}", path.display());
                continue;
            };
            let geometry = if has_srs {
                geometry.transform_to(target).map_err(|e| invalid(e.to_string()))?
            } else {
                geometry.clone()
            };
            let geometry = geometry.to_geo().map_err(|e| invalid(e.to_string()))?;
            collect_polygons(geometry, &mut polygons).map_err(invalid)?;
        }

        if polygons.is_empty() {
            return Err(invalid("no polygon features".to_string()));
        }
        debug!("Loaded {} AOI polygon(s) from {}", polygons.len(), path.display());

        Self::from_polygons(MultiPolygon::new(polygons))
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    pub fn intersects_rect(&self, rect: &Rect<f64>) -> bool {
        self.bounds.intersects(rect) && self.geometry.intersects(&rect.to_polygon())
    }

    /// Row-major flags telling which pixel centres of `grid` fall in the AOI
    pub fn mask(&self, grid: &GeoInfo) -> Vec<bool> {
        let mut mask = vec![false; grid.width * grid.height];
        mask.par_chunks_mut(grid.width)
            .enumerate()
            .for_each(|(row, flags)| {
                for (col, flag) in flags.iter_mut().enumerate() {
                    let (x, y) = grid.pixel_center(col, row);
                    *flag = self.geometry.intersects(&Point::new(x, y));
                }
            });
        mask
    }
}

fn collect_polygons(geometry: Geometry<f64>, out: &mut Vec<Polygon<f64>>) -> std::result::Result<(), String> {
    match geometry {
        Geometry::Polygon(p) => out.push(p),
        Geometry::MultiPolygon(mp) => out.extend(mp),
        Geometry::Rect(r) => out.push(r.to_polygon()),
        Geometry::GeometryCollection(gc) => {
            for g in gc {
                collect_polygons(g, out)?;
            }
        }
        _ => return Err("only polygon geometries can bound the area of interest".to_string()),
    }
    Ok(())
}
