//! Size reconciliation.
//!
//! Input files of one stack do not always agree on their row/column counts
//! (partial reprocessing, mixed multilooking). Reconciliation inspects the
//! primary kind's sizes and either derives a common subset box covering the
//! smallest extent, or, when a requested box needs more than the smallest
//! file offers, drops the keys that deviate from the majority size from
//! every kind's list.

use crate::core::keys::key_for_record;
use crate::types::{DatasetKind, FileRecord, PathIndex, PixelBox, RasterSize};
use std::collections::BTreeSet;

/// Outcome of a reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    /// All primary files already agreed on their size
    pub consistent: bool,
    /// Subset box derived to cover the smallest common extent
    pub derived_box: Option<PixelBox>,
    /// Keys removed from every kind's list
    pub dropped: Vec<String>,
}

/// Reconcile the file lists against the primary kind's sizes.
///
/// With consistent sizes nothing changes. With inconsistent sizes and no
/// requested box, a box over the smallest common extent is derived and no
/// file is dropped. A requested box that every file can satisfy also keeps
/// all files. Only a requested box larger than the smallest file triggers
/// dropping: the keys whose size deviates from the majority size are removed
/// from every kind's list.
pub fn reconcile_sizes(
    index: &mut PathIndex,
    primary: DatasetKind,
    requested: Option<PixelBox>,
) -> ReconcileReport {
    let primary_records: Vec<FileRecord> = match index.get(&primary) {
        Some(records) if !records.is_empty() => records.clone(),
        _ => {
            return ReconcileReport {
                consistent: true,
                ..ReconcileReport::default()
            }
        }
    };

    let sizes: Vec<RasterSize> = primary_records.iter().map(|r| r.size).collect();
    if sizes.windows(2).all(|w| w[0] == w[1]) {
        return ReconcileReport {
            consistent: true,
            ..ReconcileReport::default()
        };
    }

    let min_length = sizes.iter().map(|s| s.length).min().unwrap_or(0);
    let min_width = sizes.iter().map(|s| s.width).min().unwrap_or(0);
    log::warn!(
        "input {} files do not share the same row/column number",
        primary.name()
    );
    log::warn!(
        "smallest size among them: {} rows by {} columns",
        min_length,
        min_width
    );

    match requested {
        None => {
            let derived = PixelBox::new(0, 0, min_width, min_length);
            log::warn!("continuing with the common subset box {}", derived);
            ReconcileReport {
                consistent: false,
                derived_box: Some(derived),
                dropped: Vec::new(),
            }
        }
        Some(requested) if requested.x1 <= min_width && requested.y1 <= min_length => {
            log::debug!(
                "requested box {} is readable from every file, keeping all",
                requested
            );
            ReconcileReport {
                consistent: false,
                ..ReconcileReport::default()
            }
        }
        Some(requested) => {
            let majority = majority_size(&sizes);
            let drop_keys: BTreeSet<String> = primary_records
                .iter()
                .filter(|r| r.size != majority)
                .filter_map(|r| key_for_record(r).map(|k| k.to_string()))
                .collect();

            log::warn!(
                "requested box {} exceeds the smallest file, dropping {} keys deviating from the majority size ({} x {})",
                requested,
                drop_keys.len(),
                majority.length,
                majority.width
            );
            for key in &drop_keys {
                log::warn!("dropping {}", key);
            }
            for records in index.values_mut() {
                records.retain(|r| {
                    key_for_record(r).map_or(true, |k| !drop_keys.contains(&k.to_string()))
                });
            }
            ReconcileReport {
                consistent: false,
                derived_box: None,
                dropped: drop_keys.into_iter().collect(),
            }
        }
    }
}

/// Most frequent size, ties resolved to the one encountered first.
fn majority_size(sizes: &[RasterSize]) -> RasterSize {
    let mut counts: Vec<(RasterSize, usize)> = Vec::new();
    for size in sizes {
        match counts.iter_mut().find(|entry| entry.0 == *size) {
            Some(entry) => entry.1 += 1,
            None => counts.push((*size, 1)),
        }
    }
    let mut best = counts[0];
    for candidate in &counts[1..] {
        if candidate.1 > best.1 {
            best = *candidate;
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CoordinateSystem;
    use std::path::PathBuf;

    fn record(kind: DatasetKind, pair: &str, length: usize, width: usize) -> FileRecord {
        FileRecord {
            path: PathBuf::from(format!("/d/{}/file.{}", pair, kind.name())),
            kind,
            size: RasterSize::new(length, width),
            coord: CoordinateSystem::Radar,
            date_tag: None,
        }
    }

    fn index_with_sizes(sizes: &[(usize, usize)]) -> PathIndex {
        let pairs = [
            "20200101_20200113",
            "20200113_20200125",
            "20200125_20200206",
        ];
        let mut index = PathIndex::new();
        let unw: Vec<FileRecord> = sizes
            .iter()
            .zip(pairs.iter())
            .map(|(&(l, w), pair)| record(DatasetKind::UnwrapPhase, pair, l, w))
            .collect();
        let cor: Vec<FileRecord> = sizes
            .iter()
            .zip(pairs.iter())
            .map(|(&(l, w), pair)| record(DatasetKind::Coherence, pair, l, w))
            .collect();
        index.insert(DatasetKind::UnwrapPhase, unw);
        index.insert(DatasetKind::Coherence, cor);
        index
    }

    #[test]
    fn test_consistent_sizes_change_nothing() {
        let mut index = index_with_sizes(&[(100, 50), (100, 50), (100, 50)]);
        let report = reconcile_sizes(&mut index, DatasetKind::UnwrapPhase, None);
        assert!(report.consistent);
        assert!(report.derived_box.is_none());
        assert!(report.dropped.is_empty());
        assert_eq!(index[&DatasetKind::UnwrapPhase].len(), 3);
    }

    #[test]
    fn test_inconsistent_without_box_derives_minimum_extent() {
        let mut index = index_with_sizes(&[(100, 50), (99, 60), (100, 50)]);
        let report = reconcile_sizes(&mut index, DatasetKind::UnwrapPhase, None);
        assert!(!report.consistent);
        assert_eq!(report.derived_box, Some(PixelBox::new(0, 0, 50, 99)));
        assert!(report.dropped.is_empty());
        assert_eq!(index[&DatasetKind::UnwrapPhase].len(), 3);
    }

    #[test]
    fn test_box_within_minimum_keeps_all_files() {
        let mut index = index_with_sizes(&[(100, 50), (99, 60), (100, 50)]);
        let requested = PixelBox::new(0, 0, 40, 90);
        let report = reconcile_sizes(&mut index, DatasetKind::UnwrapPhase, Some(requested));
        assert!(!report.consistent);
        assert!(report.derived_box.is_none());
        assert!(report.dropped.is_empty());
        assert_eq!(index[&DatasetKind::UnwrapPhase].len(), 3);
    }

    #[test]
    fn test_oversized_box_drops_minority_from_every_kind() {
        let mut index = index_with_sizes(&[(100, 50), (99, 60), (100, 50)]);
        let requested = PixelBox::new(0, 0, 55, 100);
        let report = reconcile_sizes(&mut index, DatasetKind::UnwrapPhase, Some(requested));
        assert_eq!(report.dropped, vec!["20200113_20200125".to_string()]);
        assert_eq!(index[&DatasetKind::UnwrapPhase].len(), 2);
        assert_eq!(index[&DatasetKind::Coherence].len(), 2);
        assert!(index[&DatasetKind::Coherence]
            .iter()
            .all(|r| !r.path_str().contains("20200113_20200125")));
    }

    #[test]
    fn test_three_way_tie_keeps_first_encountered_size() {
        let mut index = index_with_sizes(&[(100, 50), (99, 60), (98, 70)]);
        let requested = PixelBox::new(0, 0, 65, 100);
        let report = reconcile_sizes(&mut index, DatasetKind::UnwrapPhase, Some(requested));
        // the first size seen (100 x 50) is the majority, both others drop
        assert_eq!(
            report.dropped,
            vec![
                "20200113_20200125".to_string(),
                "20200125_20200206".to_string()
            ]
        );
        assert_eq!(index[&DatasetKind::UnwrapPhase].len(), 1);
        assert_eq!(
            index[&DatasetKind::UnwrapPhase][0].size,
            RasterSize::new(100, 50)
        );
    }
}
