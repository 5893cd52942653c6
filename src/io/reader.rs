// src/io/reader.rs
use std::path::Path;
use std::ptr;

use gdal::raster::{Buffer, GdalType};
use gdal::{Dataset, DriverManager};
use geo::{coord, Rect};
use log::debug;

use crate::catalog::SceneEntry;
use crate::error::{Error, Result};
use crate::io::srs;
use crate::scene::{BandMap, Scene, SceneClass};
use crate::utils::TypedBuffer;

/// Working grid every scene is warped onto, and the composite's grid
#[derive(Debug, Clone, PartialEq)]
pub struct GeoInfo {
    pub projection: String,
    pub geo_transform: [f64; 6],
    pub width: usize,
    pub height: usize,
}

impl GeoInfo {
    /// North-up grid covering `bounds`, with edges snapped outward to
    /// multiples of `scale`.
    pub fn covering(bounds: Rect<f64>, scale: f64, projection: String) -> Result<Self> {
        if !(scale > 0.0) {
            return Err(Error::Config(format!("scale must be positive, got {scale}")));
        }

        let min_x = (bounds.min().x / scale).floor() * scale;
        let min_y = (bounds.min().y / scale).floor() * scale;
        let max_x = (bounds.max().x / scale).ceil() * scale;
        let max_y = (bounds.max().y / scale).ceil() * scale;

        let width = (((max_x - min_x) / scale).round() as usize).max(1);
        let height = (((max_y - min_y) / scale).round() as usize).max(1);

        Ok(Self {
            projection,
            geo_transform: [min_x, scale, 0.0, max_y, 0.0, -scale],
            width,
            height,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Bytes held by `scenes` scenes of `bands` Float32 bands on this grid
    pub fn working_set_bytes(&self, scenes: usize, bands: usize) -> u64 {
        self.pixel_count() * scenes as u64 * bands as u64 * std::mem::size_of::<f32>() as u64
    }

    /// Map coordinates of the centre of pixel (col, row)
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        let gt = &self.geo_transform;
        let (c, r) = (col as f64 + 0.5, row as f64 + 0.5);
        (gt[0] + c * gt[1] + r * gt[2], gt[3] + c * gt[4] + r * gt[5])
    }

    pub fn bounds(&self) -> Rect<f64> {
        let gt = &self.geo_transform;
        let x1 = gt[0] + self.width as f64 * gt[1];
        let y1 = gt[3] + self.height as f64 * gt[5];
        Rect::new(coord! { x: gt[0], y: gt[3] }, coord! { x: x1, y: y1 })
    }
}

/// Extent of a raster file, expressed in the `target` CRS
pub fn footprint(path: &Path, target: &gdal::spatial_ref::SpatialRef) -> Result<Rect<f64>> {
    let dataset = Dataset::open(path)?;
    let (width, height) = dataset.raster_size();
    let gt = dataset.geo_transform()?;

    if gt[2] != 0.0 || gt[4] != 0.0 {
        return Err(Error::Read {
            path: path.to_path_buf(),
            reason: "rotated geotransforms are not supported".to_string(),
        });
    }

    let extent = Rect::new(
        coord! { x: gt[0], y: gt[3] },
        coord! { x: gt[0] + width as f64 * gt[1], y: gt[3] + height as f64 * gt[5] },
    );

    let source = dataset.spatial_ref()?;
    srs::use_traditional_axis_order(&source);
    srs::transform_rect(extent, &source, target)
}

/// Warp band 1 of `path` onto `grid` (nearest neighbour).
///
/// Pixels the source does not cover keep `fill`. Also returns the
/// source band's no-data value, if any.
pub fn warp_band<T: GdalType + Copy>(path: &Path, grid: &GeoInfo, fill: T) -> Result<(Buffer<T>, Option<f64>)> {
    let source = Dataset::open(path)?;
    let source_nodata = source.rasterband(1)?.no_data_value();

    let driver = DriverManager::get_driver_by_name("MEM")?;
    let mut target = driver.create_with_band_type::<T, _>("", grid.width, grid.height, 1)?;
    target.set_projection(&grid.projection)?;
    target.set_geo_transform(&grid.geo_transform)?;

    {
        let mut band = target.rasterband(1)?;
        let mut prefill = Buffer::new(grid.shape(), vec![fill; grid.width * grid.height]);
        band.write((0, 0), grid.shape(), &mut prefill)?;
    }

    let status = unsafe {
        gdal_sys::GDALReprojectImage(
            source.c_dataset(),
            ptr::null(),
            target.c_dataset(),
            ptr::null(),
            gdal_sys::GDALResampleAlg::GRA_NearestNeighbour,
            0.0,
            0.0,
            None,
            ptr::null_mut(),
            ptr::null_mut(),
        )
    };
    if status != gdal_sys::CPLErr::CE_None {
        return Err(Error::Read {
            path: path.to_path_buf(),
            reason: "GDALReprojectImage failed".to_string(),
        });
    }

    let buffer = target
        .rasterband(1)?
        .read_as::<T>((0, 0), grid.shape(), grid.shape(), None)?;
    Ok((buffer, source_nodata))
}

/// Read the reflectance and classification bands of one catalog scene on `grid`.
///
/// Reflectance comes back as Float64 digital numbers with uncovered and
/// no-data pixels set to NaN. Classification comes back as Byte with
/// uncovered pixels set to the no-data class.
pub fn read_scene(entry: &SceneEntry, bands: &BandMap, grid: &GeoInfo) -> Result<Scene> {
    let mut scene = Scene::new(entry.id.clone(), entry.acquired);

    for name in bands.reflectance() {
        let path = entry.asset(name)?;
        let (buffer, nodata) = warp_band::<f64>(path, grid, f64::NAN)?;
        let (shape, mut data) = buffer.into_shape_and_vec();
        if let Some(nodata) = nodata {
            for value in data.iter_mut().filter(|v| **v == nodata) {
                *value = f64::NAN;
            }
        }
        debug!("{}: read {} from {}", entry.id, name, path.display());
        scene = scene.with_band(name, TypedBuffer::F64(Buffer::new(shape, data)));
    }

    let path = entry.asset(&bands.classification)?;
    let (classes, _) = warp_band::<u8>(path, grid, SceneClass::NoData.code())?;
    debug!("{}: read {} from {}", entry.id, bands.classification, path.display());

    Ok(scene.with_band(bands.classification.clone(), TypedBuffer::U8(classes)))
}
