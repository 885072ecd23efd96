//! File discovery.
//!
//! Expands the glob pattern of each configured dataset kind into a sorted
//! list of [`FileRecord`]s, reading each file's metadata sidecar on the way.
//! Files whose sidecar is missing or unreadable are skipped with a warning
//! rather than failing the whole run.

use crate::config::DatasetCatalog;
use crate::io::attributes::{read_attributes, strip_sidecar_extension};
use crate::types::{FileRecord, PathIndex, StackResult};
use glob::glob;
use std::path::PathBuf;

/// Expand one glob pattern into a sorted, de-duplicated list of data paths.
///
/// Matches that point at a `.rsc`/`.xml` sidecar are folded back onto the
/// data file they describe, so patterns may target either.
pub fn glob_sorted(pattern: &str) -> StackResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in glob(pattern)? {
        match entry {
            Ok(path) => paths.push(strip_sidecar_extension(&path)),
            Err(e) => log::warn!("skipping unreadable glob entry: {}", e),
        }
    }
    paths.sort();
    paths.dedup();
    Ok(paths)
}

/// Discover all files of every kind in the catalog.
///
/// Kinds whose pattern matches nothing are left out of the index entirely.
pub fn discover(catalog: &DatasetCatalog) -> StackResult<PathIndex> {
    let mut index = PathIndex::new();
    for (kind, pattern) in catalog.iter() {
        let mut records = Vec::new();
        for path in glob_sorted(pattern)? {
            match read_attributes(&path) {
                Ok(attrs) => {
                    let size = match attrs.size() {
                        Ok(size) => size,
                        Err(e) => {
                            log::warn!("skipping {}: {}", path.display(), e);
                            continue;
                        }
                    };
                    let date_tag = attrs
                        .date12()
                        .or_else(|| attrs.date())
                        .map(str::to_string);
                    records.push(FileRecord {
                        path,
                        kind,
                        size,
                        coord: attrs.coordinate_system(),
                        date_tag,
                    });
                }
                Err(e) => log::warn!("skipping {}: {}", path.display(), e),
            }
        }
        log::info!("number of {:<16} files: {}", kind.name(), records.len());
        if !records.is_empty() {
            index.insert(kind, records);
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DatasetKind;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn write_raster(dir: &std::path::Path, name: &str, width: usize, length: usize) {
        File::create(dir.join(name)).unwrap();
        let mut rsc = File::create(dir.join(format!("{}.rsc", name))).unwrap();
        writeln!(rsc, "WIDTH {}\nLENGTH {}", width, length).unwrap();
    }

    #[test]
    fn test_discover_builds_sorted_index() {
        let dir = TempDir::new().unwrap();
        let b = dir.path().join("20200113_20200125");
        let a = dir.path().join("20200101_20200113");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        write_raster(&b, "filt.unw", 300, 200);
        write_raster(&a, "filt.unw", 300, 200);
        write_raster(&a, "filt.cor", 300, 200);
        // data file without a sidecar gets skipped
        File::create(b.join("filt.cor")).unwrap();

        let mut catalog = DatasetCatalog::new();
        catalog
            .insert(
                DatasetKind::UnwrapPhase,
                format!("{}/*/filt.unw", dir.path().display()),
            )
            .insert(
                DatasetKind::Coherence,
                format!("{}/*/filt.cor", dir.path().display()),
            );

        let index = discover(&catalog).unwrap();
        let unw = &index[&DatasetKind::UnwrapPhase];
        assert_eq!(unw.len(), 2);
        assert!(unw[0].path < unw[1].path);
        assert_eq!(index[&DatasetKind::Coherence].len(), 1);
    }

    #[test]
    fn test_sidecar_matches_fold_onto_data_path() {
        let dir = TempDir::new().unwrap();
        write_raster(dir.path(), "20200101.slc", 100, 80);

        let paths = glob_sorted(&format!("{}/*.slc*", dir.path().display())).unwrap();
        assert_eq!(paths, vec![dir.path().join("20200101.slc")]);
    }

    #[test]
    fn test_empty_pattern_left_out() {
        let dir = TempDir::new().unwrap();
        let mut catalog = DatasetCatalog::new();
        catalog.insert(
            DatasetKind::Ionosphere,
            format!("{}/*.iono", dir.path().display()),
        );
        let index = discover(&catalog).unwrap();
        assert!(index.is_empty());
    }
}
