// src/io/writer.rs
use std::path::Path;

use gdal::raster::{Buffer, RasterCreationOptions};
use gdal::{DriverManager, Metadata};
use log::debug;

use crate::config::GeoTiffOptions;
use crate::error::Result;
use crate::processing::composite::CompositeRaster;

/// No-data marker of the exported bands. NaN pixels are written as this
/// value, so a computed value of exactly -999.0 (possible for unclamped
/// EVI) reads back as no-data.
pub const NODATA_VALUE_FLOAT: f32 = -999.0;

fn creation_options(options: &GeoTiffOptions) -> Vec<String> {
    let mut creation = Vec::new();

    // Add compression if not NONE
    let compress = options.compress.to_uppercase();
    if compress != "NONE" {
        creation.push(format!("COMPRESS={compress}"));
        match compress.as_str() {
            "DEFLATE" => creation.push(format!("ZLEVEL={}", options.compress_level.min(9))),
            "ZSTD" => creation.push(format!("ZSTD_LEVEL={}", options.compress_level.min(22))),
            _ => {}
        }
    }

    if options.tiled {
        creation.push("TILED=YES".to_string());
    }

    creation.push("NUM_THREADS=ALL_CPUS".to_string());
    creation
}

/// Write the composite as a multi-band Float32 GeoTIFF.
///
/// Bands keep the composite's order and are described by their index
/// name. NaN pixels are written as `NODATA_VALUE_FLOAT`.
pub fn write_composite(
    composite: &CompositeRaster,
    output_path: &Path,
    options: &GeoTiffOptions,
    metadata: &[(&str, String)],
) -> Result<()> {
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let creation_options = RasterCreationOptions::from_iter(creation_options(options));
    let grid = composite.grid();

    let mut out_ds = driver.create_with_band_type_with_options::<f32, _>(
        output_path,
        grid.width,
        grid.height,
        composite.bands().len(),
        &creation_options,
    )?;

    out_ds.set_projection(&grid.projection)?;
    out_ds.set_geo_transform(&grid.geo_transform)?;
    for (key, value) in metadata {
        out_ds.set_metadata_item(key, value, "")?;
    }

    for (i, (name, data)) in composite.bands().iter().enumerate() {
        let mut band = out_ds.rasterband(i + 1)?;
        band.set_no_data_value(Some(NODATA_VALUE_FLOAT as f64))?;
        band.set_description(name)?;

        let values = data
            .data()
            .iter()
            .map(|&v| if v.is_nan() { NODATA_VALUE_FLOAT } else { v })
            .collect();
        let mut buffer = Buffer::new(data.shape(), values);
        band.write((0, 0), data.shape(), &mut buffer)?;
        debug!("Wrote band {} ({}) to {}", i + 1, name, output_path.display());
    }

    out_ds.flush_cache()?;
    Ok(())
}
