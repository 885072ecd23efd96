use anyhow::Result;
use chrono::NaiveDate;
use sarstack::{DatasetCatalog, DatasetKind, LoadConfig, StackLoader};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn write_raster(dir: &Path, name: &str, extra: &[(&str, &str)]) {
    File::create(dir.join(name)).expect("Failed to create data file");
    let mut rsc = File::create(dir.join(format!("{}.rsc", name))).expect("Failed to create sidecar");
    writeln!(rsc, "WIDTH 200").unwrap();
    writeln!(rsc, "LENGTH 100").unwrap();
    for (key, value) in extra {
        writeln!(rsc, "{} {}", key, value).unwrap();
    }
}

fn make_slc(root: &Path, date: &str) {
    let dir = root.join("SLC").join(date);
    fs::create_dir_all(&dir).expect("Failed to create SLC directory");
    write_raster(&dir, &format!("{}.slc", date), &[]);
}

fn make_pair(root: &Path, dir_name: &str, with_coherence: bool, extra: &[(&str, &str)]) {
    let dir = root.join("interferograms").join(dir_name);
    fs::create_dir_all(&dir).expect("Failed to create pair directory");
    write_raster(&dir, "filt_fine.unw", extra);
    if with_coherence {
        write_raster(&dir, "filt_fine.cor", &[]);
    }
}

fn ifgram_config(root: &Path) -> LoadConfig {
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

#[test]
fn test_slc_stack_with_date_window() -> Result<()> {
    init_logs();
    let dir = TempDir::new()?;
    let root = dir.path();
    for date in ["20200101", "20200113", "20200125"] {
        make_slc(root, date);
    }

    let mut catalog = DatasetCatalog::new();
    catalog.insert(
        DatasetKind::Slc,
        format!("{}/SLC/*/*.slc", root.display()),
    );
    let mut config = LoadConfig::default();
    config.catalog = catalog;
    config.primary = DatasetKind::Slc;
    config.out_dir = root.join("inputs");
    config.start_date = NaiveDate::from_ymd_opt(2020, 1, 10);
    config.end_date = NaiveDate::from_ymd_opt(2020, 1, 20);

    let loader = StackLoader::new(config);
    let plan = loader.run(None)?;

    let slc = plan.epoch_stack.as_ref().expect("SLC stack expected");
    assert_eq!(slc.num_epochs(), 1);
    assert_eq!(slc.key_strings(), vec!["20200113"]);
    assert_eq!(plan.outputs.len(), 1);
    assert_eq!(plan.outputs[0].name, "slcStack");
    assert_eq!(plan.outputs[0].shape, (1, 100, 200));

    Ok(())
}

#[test]
fn test_plans_are_deterministic() -> Result<()> {
    init_logs();
    let dir = TempDir::new()?;
    let root = dir.path();
    for pair in ["20200125_20200206", "20200101_20200113", "20200113_20200125"] {
        make_pair(root, pair, true, &[]);
    }

    let loader = StackLoader::new(ifgram_config(root));
    let first = loader.run(None)?;
    let second = loader.run(None)?;

    let keys1 = first.pair_stack.as_ref().expect("pair stack").key_strings();
    let keys2 = second.pair_stack.as_ref().expect("pair stack").key_strings();
    assert_eq!(keys1, keys2);
    assert_eq!(
        keys1,
        vec![
            "20200101_20200113",
            "20200113_20200125",
            "20200125_20200206"
        ]
    );
    for (a, b) in first.outputs.iter().zip(second.outputs.iter()) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.keys, b.keys);
        assert_eq!(a.shape, b.shape);
    }

    Ok(())
}

#[test]
fn test_pair_without_coherence_still_loads() -> Result<()> {
    init_logs();
    let dir = TempDir::new()?;
    let root = dir.path();
    make_pair(root, "20200101_20200113", true, &[]);
    make_pair(root, "20200113_20200125", false, &[]);

    let loader = StackLoader::new(ifgram_config(root));
    let plan = loader.run(None)?;

    let pairs = plan.pair_stack.as_ref().expect("pair stack expected");
    assert_eq!(pairs.num_pairs(), 2);
    let full = &pairs.pairs[&sarstack::core::parse_pair_tag("20200101_20200113")?];
    let partial = &pairs.pairs[&sarstack::core::parse_pair_tag("20200113_20200125")?];
    assert!(full.contains_key(&DatasetKind::Coherence));
    assert!(!partial.contains_key(&DatasetKind::Coherence));

    Ok(())
}

#[test]
fn test_sidecar_date_tag_overrides_path_tokens() -> Result<()> {
    init_logs();
    let dir = TempDir::new()?;
    let root = dir.path();
    // directory name carries no dates at all
    make_pair(root, "reprocessed", true, &[("DATE12", "200101-200113")]);

    let loader = StackLoader::new(ifgram_config(root));
    let plan = loader.run(None)?;

    let pairs = plan.pair_stack.as_ref().expect("pair stack expected");
    assert_eq!(pairs.key_strings(), vec!["20200101_20200113"]);
    // coherence can only be matched through path tokens, which are absent
    let layers = &pairs.pairs[&sarstack::core::parse_pair_tag("20200101_20200113")?];
    assert!(!layers.contains_key(&DatasetKind::Coherence));

    Ok(())
}
