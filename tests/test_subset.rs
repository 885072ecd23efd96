use anyhow::Result;
use ndarray::Array2;
use sarstack::core::{Coordinate, GeoGridLookup, GeoStatus, RadarGridLookup};
use sarstack::{DatasetCatalog, DatasetKind, GeoBox, LoadConfig, PixelBox, StackLoader, SubsetRequest};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn write_raster(dir: &Path, name: &str, length: usize, width: usize, extra: &[(&str, &str)]) {
    File::create(dir.join(name)).expect("Failed to create data file");
    let mut rsc = File::create(dir.join(format!("{}.rsc", name))).expect("Failed to create sidecar");
    writeln!(rsc, "WIDTH {}", width).unwrap();
    writeln!(rsc, "LENGTH {}", length).unwrap();
    for (key, value) in extra {
        writeln!(rsc, "{} {}", key, value).unwrap();
    }
}

fn make_pair(root: &Path, pair: &str, extra: &[(&str, &str)]) {
    let dir = root.join("interferograms").join(pair);
    fs::create_dir_all(&dir).expect("Failed to create pair directory");
    write_raster(&dir, "filt_fine.unw", 100, 200, extra);
    write_raster(&dir, "filt_fine.cor", 100, 200, extra);
}

fn config_for(root: &Path) -> LoadConfig {
    let mut catalog = DatasetCatalog::new();
    catalog
        .insert(
            DatasetKind::UnwrapPhase,
            format!("{}/interferograms/*/filt_fine.unw", root.display()),
        )
        .insert(
            DatasetKind::Coherence,
            format!("{}/interferograms/*/filt_fine.cor", root.display()),
        );
    let mut config = LoadConfig::default();
    config.catalog = catalog;
    config.out_dir = root.join("inputs");
    config
}

const GEOCODED: &[(&str, &str)] = &[
    ("Y_FIRST", "43.2"),
    ("Y_STEP", "-0.01"),
    ("X_FIRST", "125.0"),
    ("X_STEP", "0.01"),
];

#[test]
fn test_geo_subset_on_geocoded_data() -> Result<()> {
    init_logs();
    let dir = TempDir::new()?;
    let root = dir.path();
    make_pair(root, "20200101_20200113", GEOCODED);
    make_pair(root, "20200113_20200125", GEOCODED);

    let mut config = config_for(root);
    config.subset = SubsetRequest {
        geo: Some(GeoBox::new(125.1, 43.1, 125.2, 43.0)),
        pixel: None,
    };
    let loader = StackLoader::new(config);
    let plan = loader.run(None)?;

    assert_eq!(plan.geo_status, GeoStatus::Applied);
    assert_eq!(plan.data_box, Some(PixelBox::new(10, 10, 20, 20)));
    assert_eq!(plan.metadata["SUBSET_XMIN"], "10");
    assert_eq!(plan.metadata["SUBSET_YMAX"], "20");

    Ok(())
}

#[test]
fn test_geo_subset_without_lookup_is_discarded() -> Result<()> {
    init_logs();
    let dir = TempDir::new()?;
    let root = dir.path();
    make_pair(root, "20200101_20200113", &[]);

    let mut config = config_for(root);
    config.subset = SubsetRequest {
        geo: Some(GeoBox::new(125.1, 43.1, 125.2, 43.0)),
        pixel: None,
    };
    let loader = StackLoader::new(config);
    let plan = loader.run(None)?;

    assert!(matches!(plan.geo_status, GeoStatus::Discarded(_)));
    assert!(plan.data_box.is_none());

    Ok(())
}

#[test]
fn test_incomplete_geocoding_attributes_degrade_to_full_extent() -> Result<()> {
    init_logs();
    let dir = TempDir::new()?;
    let root = dir.path();
    // Y_FIRST marks the data geocoded, but the rest of the grid is absent
    make_pair(root, "20200101_20200113", &[("Y_FIRST", "43.2")]);

    let loader = StackLoader::new(config_for(root));
    let plan = loader.run(None)?;
    assert_eq!(plan.geo_status, GeoStatus::NotRequested);
    assert!(plan.data_box.is_none());
    assert!(plan.pair_stack.is_some());

    // a geographic request cannot resolve against the broken grid either
    let mut config = config_for(root);
    config.subset = SubsetRequest {
        geo: Some(GeoBox::new(125.1, 43.1, 125.2, 43.0)),
        pixel: None,
    };
    let plan = StackLoader::new(config).run(None)?;
    assert!(matches!(plan.geo_status, GeoStatus::Discarded(_)));
    assert!(plan.data_box.is_none());

    Ok(())
}

#[test]
fn test_geo_subset_through_radar_lookup_grids() -> Result<()> {
    init_logs();
    let dir = TempDir::new()?;
    let root = dir.path();
    make_pair(root, "20200101_20200113", &[]);

    let latitude = Array2::from_shape_fn((100, 200), |(r, _)| 43.0 - r as f64 * 0.01);
    let longitude = Array2::from_shape_fn((100, 200), |(_, c)| 125.0 + c as f64 * 0.01);
    let lookup = RadarGridLookup::new(latitude, longitude).expect("valid lookup grids");

    let mut config = config_for(root);
    config.subset = SubsetRequest {
        geo: Some(GeoBox::new(125.095, 42.905, 125.205, 42.795)),
        pixel: None,
    };
    let loader = StackLoader::new(config);
    let plan = loader.run(Some(&lookup))?;

    assert_eq!(plan.geo_status, GeoStatus::Applied);
    assert_eq!(plan.data_box, Some(PixelBox::new(10, 10, 21, 21)));
    // radar-frame lookup grids are read with the data box itself
    assert!(plan.lookup_box.is_none());

    Ok(())
}

#[test]
fn test_geocoded_lookup_grids_get_their_own_window() -> Result<()> {
    init_logs();
    let dir = TempDir::new()?;
    let root = dir.path();
    make_pair(root, "20200101_20200113", &[]);

    let transform = Coordinate::new(43.2, -0.01, 125.0, 0.01, 100, 100).expect("valid transform");
    let azimuth = Array2::from_shape_fn((100, 100), |(r, _)| 1.0 + r as f64 * 2.0);
    let range = Array2::from_shape_fn((100, 100), |(_, c)| 1.0 + c as f64 * 3.0);
    let lookup = GeoGridLookup::new(azimuth, range, transform).expect("valid lookup grids");

    let mut config = config_for(root);
    config.subset = SubsetRequest {
        geo: None,
        pixel: Some(PixelBox::new(31, 21, 58, 39)),
    };
    let loader = StackLoader::new(config);
    let plan = loader.run(Some(&lookup))?;

    assert_eq!(plan.data_box, Some(PixelBox::new(31, 21, 58, 39)));
    assert_eq!(plan.lookup_box, Some(PixelBox::new(10, 10, 19, 19)));

    Ok(())
}
