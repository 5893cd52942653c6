// src/io/srs.rs
use gdal::spatial_ref::{CoordTransform, SpatialRef};
use geo::{coord, Rect};

use crate::error::Result;

/// Parse a CRS definition ("EPSG:3857", WKT, PROJ string) with x/y axis order.
pub fn spatial_ref(definition: &str) -> Result<SpatialRef> {
    let srs = SpatialRef::from_definition(definition)?;
    use_traditional_axis_order(&srs);
    Ok(srs)
}

/// Force longitude/easting first, whatever the authority says.
///
/// Geographic CRSs like EPSG:4326 are latitude-first under GDAL 3, which
/// would swap every coordinate we push through a transform.
pub fn use_traditional_axis_order(srs: &SpatialRef) {
    unsafe {
        gdal_sys::OSRSetAxisMappingStrategy(
            srs.to_c_hsrs(),
            gdal_sys::OSRAxisMappingStrategy::OAMS_TRADITIONAL_GIS_ORDER,
        );
    }
}

/// Bounding rectangle of `rect` once its corners are moved from `source` to `target`.
pub fn transform_rect(rect: Rect<f64>, source: &SpatialRef, target: &SpatialRef) -> Result<Rect<f64>> {
    if source == target {
        return Ok(rect);
    }

    let transform = CoordTransform::new(source, target)?;
    let (min, max) = (rect.min(), rect.max());
    let mut xs = [min.x, max.x, max.x, min.x];
    let mut ys = [min.y, min.y, max.y, max.y];
    let mut zs = [0.0; 4];
    transform.transform_coords(&mut xs, &mut ys, &mut zs)?;

    let min_x = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let max_x = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_y = ys.iter().copied().fold(f64::INFINITY, f64::min);
    let max_y = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok(Rect::new(
        coord! { x: min_x, y: min_y },
        coord! { x: max_x, y: max_y },
    ))
}
