// tests/composite_tests.rs
use chrono::{TimeZone, Utc};
use gdal::raster::Buffer;
use geo::{coord, MultiPolygon, Rect};
use s2_composite::export::Exporter;
use s2_composite::io::{Aoi, GeoInfo};
use s2_composite::processing::{CloudMasker, SpectralIndices, TemporalCompositor};
use s2_composite::scene::{BandMap, Scene, SceneClass, INDEX_BANDS};
use s2_composite::utils::gdal_ext::TypedBuffer;
use s2_composite::Error;

/// 4x4 grid of 1 unit pixels with its origin at (0, 4)
fn test_grid() -> GeoInfo {
    GeoInfo {
        projection: String::new(),
        geo_transform: [0.0, 1.0, 0.0, 4.0, 0.0, -1.0],
        width: 4,
        height: 4,
    }
}

fn rect_aoi(min: (f64, f64), max: (f64, f64)) -> Aoi {
    let rect = Rect::new(coord! { x: min.0, y: min.1 }, coord! { x: max.0, y: max.1 });
    Aoi::from_polygons(MultiPolygon::new(vec![rect.to_polygon()])).unwrap()
}

fn index_scene(id: &str, day: u32, ndvi: Vec<f32>) -> Scene {
    let acquired = Utc.with_ymd_and_hms(2022, 1, day, 14, 0, 0).unwrap();
    Scene::new(id, acquired).with_band("NDVI", TypedBuffer::F32(Buffer::new((4, 4), ndvi)))
}

#[test]
fn test_masker_removes_excluded_classes_and_scales() {
    let bands = BandMap::default();
    let acquired = Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap();
    // vegetation, shadow, medium cloud, high cloud, cirrus, snow, bare, water
    let classes = vec![4u8, 3, 8, 9, 10, 11, 5, 6];
    let scene = bands
        .reflectance()
        .iter()
        .fold(Scene::new("S2A_MASK", acquired), |scene, name| {
            scene.with_band(*name, TypedBuffer::F64(Buffer::new((8, 1), vec![2500.0; 8])))
        })
        .with_band("SCL", TypedBuffer::U8(Buffer::new((8, 1), classes.clone())));

    let masker = CloudMasker::new(bands.clone(), &SceneClass::DEFAULT_EXCLUDED);
    let masked = masker.apply(scene).unwrap();

    for name in bands.reflectance() {
        let values = masked.band(name).unwrap().as_f64().unwrap().data();
        assert!((values[0] - 0.25).abs() < 1e-12);
        for value in &values[1..6] {
            assert!(value.is_nan(), "{name}: excluded class kept a value");
        }
        assert!((values[6] - 0.25).abs() < 1e-12);
        assert!((values[7] - 0.25).abs() < 1e-12);
    }

    // Classification is passed through untouched
    assert_eq!(masked.band("SCL").unwrap().as_u8().unwrap().data(), &classes[..]);
}

#[test]
fn test_masked_pixels_are_nodata_in_every_index() {
    let bands = BandMap::default();
    let acquired = Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap();
    let scene = bands
        .reflectance()
        .iter()
        .zip([1000.0, 3000.0, 2000.0, 4000.0, 1000.0])
        .fold(Scene::new("S2B_CIRRUS", acquired), |scene, (name, dn)| {
            scene.with_band(*name, TypedBuffer::F64(Buffer::new((2, 1), vec![dn; 2])))
        })
        .with_band("SCL", TypedBuffer::U8(Buffer::new((2, 1), vec![10u8, 4])));

    let masker = CloudMasker::new(bands.clone(), &SceneClass::DEFAULT_EXCLUDED);
    let scene = SpectralIndices::new(bands).apply(masker.apply(scene).unwrap()).unwrap();

    for name in INDEX_BANDS {
        let values = scene.band(name).unwrap().as_f32().unwrap().data();
        assert!(values[0].is_nan(), "{name} kept a cirrus pixel");
        assert!(!values[1].is_nan(), "{name} lost a clear pixel");
    }
}

#[test]
fn test_masker_respects_configured_classes() {
    let masker = CloudMasker::new(BandMap::default(), &[SceneClass::CloudHighProbability]);
    assert!(!masker.is_valid(9));
    assert!(masker.is_valid(8));
    assert!(masker.is_valid(3));
}

#[test]
fn test_masker_requires_byte_classification() {
    let acquired = Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap();
    let scene = Scene::new("S2A_BAD_SCL", acquired)
        .with_band("B4", TypedBuffer::F64(Buffer::new((1, 1), vec![1000.0])))
        .with_band("SCL", TypedBuffer::F64(Buffer::new((1, 1), vec![4.0])));

    let masker = CloudMasker::new(BandMap::default(), &SceneClass::DEFAULT_EXCLUDED);
    match masker.apply(scene) {
        Err(Error::UnsupportedBufferType { found, .. }) => assert_eq!(found, "Float64"),
        other => panic!("expected unsupported buffer type, got {other:?}"),
    }
}

#[test]
fn test_median_of_two_valid_values() {
    let grid = test_grid();
    let aoi = rect_aoi((0.0, 0.0), (4.0, 4.0));
    let scenes = vec![
        index_scene("a", 1, vec![0.2; 16]),
        index_scene("b", 2, vec![0.8; 16]),
        index_scene("c", 3, vec![f32::NAN; 16]),
    ];

    let composite = TemporalCompositor::new(&["NDVI"])
        .composite(&scenes, &grid, &aoi)
        .unwrap();
    let ndvi = composite.band("NDVI").unwrap().data();

    assert_eq!(composite.scene_count(), 3);
    for value in ndvi {
        assert!((value - 0.5).abs() < 1e-6, "median was {value}");
    }
}

#[test]
fn test_median_odd_count_and_no_valid_samples() {
    let grid = test_grid();
    let aoi = rect_aoi((0.0, 0.0), (4.0, 4.0));

    let mut first = vec![0.1f32; 16];
    let mut second = vec![0.9f32; 16];
    let mut third = vec![0.3f32; 16];
    // pixel 5 never has a valid sample
    first[5] = f32::NAN;
    second[5] = f32::NAN;
    third[5] = f32::NAN;
    let scenes = vec![
        index_scene("a", 1, first),
        index_scene("b", 2, second),
        index_scene("c", 3, third),
    ];

    let composite = TemporalCompositor::new(&["NDVI"])
        .composite(&scenes, &grid, &aoi)
        .unwrap();
    let ndvi = composite.band("NDVI").unwrap().data();

    assert!(ndvi[5].is_nan());
    assert!((ndvi[0] - 0.3).abs() < 1e-6);
    assert_eq!(composite.valid_pixel_count(), 15);
}

#[test]
fn test_composite_is_clipped_to_aoi() {
    let grid = test_grid();
    // Left half of the grid
    let aoi = rect_aoi((0.0, 0.0), (2.0, 4.0));
    let scenes = vec![index_scene("a", 1, vec![0.4; 16])];

    let composite = TemporalCompositor::new(&["NDVI"])
        .composite(&scenes, &grid, &aoi)
        .unwrap();
    let ndvi = composite.band("NDVI").unwrap().data();

    for row in 0..4 {
        for col in 0..4 {
            let value = ndvi[row * 4 + col];
            if col < 2 {
                assert!((value - 0.4).abs() < 1e-6);
            } else {
                assert!(value.is_nan(), "pixel ({col}, {row}) outside the AOI kept a value");
            }
        }
    }
    assert_eq!(composite.valid_pixel_count(), 8);
}

#[test]
fn test_empty_collection_gives_nodata_composite() {
    let grid = test_grid();
    let aoi = rect_aoi((0.0, 0.0), (4.0, 4.0));

    let composite = TemporalCompositor::new(&["NDVI", "EVI"])
        .composite(&[], &grid, &aoi)
        .unwrap();

    assert_eq!(composite.scene_count(), 0);
    assert_eq!(composite.bands().len(), 2);
    assert!(composite.is_empty());
    assert_eq!(composite.grid(), &grid);
    assert!(matches!(
        Exporter::check(&composite, u64::MAX),
        Err(Error::EmptyComposite)
    ));
}

#[test]
fn test_export_check_enforces_pixel_limit() {
    let grid = test_grid();
    let aoi = rect_aoi((0.0, 0.0), (4.0, 4.0));
    let scenes = vec![index_scene("a", 1, vec![0.4; 16])];
    let composite = TemporalCompositor::new(&["NDVI"])
        .composite(&scenes, &grid, &aoi)
        .unwrap();

    assert!(Exporter::check(&composite, 16).is_ok());
    match Exporter::check(&composite, 15) {
        Err(Error::TooManyPixels { pixels, max_pixels }) => {
            assert_eq!(pixels, 16);
            assert_eq!(max_pixels, 15);
        }
        other => panic!("expected too many pixels, got {other:?}"),
    }
}

#[test]
fn test_composite_rejects_non_index_bands() {
    let grid = test_grid();
    let aoi = rect_aoi((0.0, 0.0), (4.0, 4.0));
    let acquired = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
    let scene = Scene::new("a", acquired)
        .with_band("NDVI", TypedBuffer::F64(Buffer::new((4, 4), vec![0.4; 16])));

    assert!(matches!(
        TemporalCompositor::new(&["NDVI"]).composite(&[scene], &grid, &aoi),
        Err(Error::UnsupportedBufferType { .. })
    ));
}

#[test]
fn test_working_set_grows_with_scene_count() {
    let grid = test_grid();
    assert_eq!(grid.working_set_bytes(0, 5), 0);
    assert_eq!(grid.working_set_bytes(3, 5), 16 * 3 * 5 * 4);
    assert_eq!(grid.working_set_bytes(6, 5), 2 * grid.working_set_bytes(3, 5));
}

#[test]
fn test_grid_covering_snaps_to_scale() {
    let bounds = Rect::new(coord! { x: 300003.0, y: 6290001.0 }, coord! { x: 300038.0, y: 6290035.0 });
    let grid = GeoInfo::covering(bounds, 10.0, String::new()).unwrap();

    assert_eq!(grid.geo_transform, [300000.0, 10.0, 0.0, 6290040.0, 0.0, -10.0]);
    assert_eq!(grid.shape(), (4, 4));
    assert_eq!(grid.pixel_center(0, 0), (300005.0, 6290035.0));
    assert!(GeoInfo::covering(bounds, 0.0, String::new()).is_err());
}
