//! Stack assembly.
//!
//! Matched groups are folded into the in-memory description of the output
//! stacks: pair-keyed layers for interferogram stacks, epoch-keyed layers
//! for SLC stacks, and a per-kind map for geometry. Geometry files split
//! into a radar-coded and a geocoded stack according to each file's own
//! coordinate system; perpendicular-baseline files are keyed by the
//! acquisition date in their parent directory name.

use crate::core::keys::parent_dir_date;
use crate::core::matcher::MatchedGroup;
use crate::types::{DatasetKind, EpochKey, PairKey, PathIndex, PixelBox, RasterSize, StackKey};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// One file per dataset kind
pub type LayerPaths = BTreeMap<DatasetKind, PathBuf>;

/// Interferogram stack: pair-keyed layers
#[derive(Debug, Clone)]
pub struct PairStack {
    pub size: RasterSize,
    pub pairs: BTreeMap<PairKey, LayerPaths>,
}

impl PairStack {
    /// Fold matched groups into a pair stack; `None` when no group carries
    /// a pair key.
    pub fn from_groups(groups: &[MatchedGroup]) -> Option<PairStack> {
        let mut size: Option<RasterSize> = None;
        let mut pairs: BTreeMap<PairKey, LayerPaths> = BTreeMap::new();
        for group in groups {
            let pair = match group.key {
                StackKey::Pair(pair) => pair,
                StackKey::Epoch(_) => continue,
            };
            if size.is_none() {
                size = group.records.values().next().map(|r| r.size);
            }
            let layers = group
                .records
                .iter()
                .map(|(kind, record)| (*kind, record.path.clone()))
                .collect();
            pairs.insert(pair, layers);
        }
        if pairs.is_empty() {
            return None;
        }
        Some(PairStack {
            size: size?,
            pairs,
        })
    }

    pub fn num_pairs(&self) -> usize {
        self.pairs.len()
    }

    pub fn kinds(&self) -> BTreeSet<DatasetKind> {
        self.pairs.values().flat_map(|l| l.keys().copied()).collect()
    }

    /// `reference_secondary` strings in key order
    pub fn key_strings(&self) -> Vec<String> {
        self.pairs.keys().map(|p| p.to_string()).collect()
    }

    /// Unique acquisition dates across all pairs, sorted
    pub fn date_list(&self) -> Vec<String> {
        let mut dates: BTreeSet<EpochKey> = BTreeSet::new();
        for pair in self.pairs.keys() {
            dates.insert(pair.reference);
            dates.insert(pair.secondary);
        }
        dates.iter().map(|d| d.compact()).collect()
    }

    /// (bands, length, width) of the stack to be written
    pub fn shape(&self, data_box: Option<&PixelBox>) -> (usize, usize, usize) {
        let (length, width) = spatial_extent(self.size, data_box);
        (self.pairs.len(), length, width)
    }
}

/// SLC stack: epoch-keyed layers
#[derive(Debug, Clone)]
pub struct EpochStack {
    pub size: RasterSize,
    pub epochs: BTreeMap<EpochKey, LayerPaths>,
}

impl EpochStack {
    pub fn from_groups(groups: &[MatchedGroup]) -> Option<EpochStack> {
        let mut size: Option<RasterSize> = None;
        let mut epochs: BTreeMap<EpochKey, LayerPaths> = BTreeMap::new();
        for group in groups {
            let epoch = match group.key {
                StackKey::Epoch(epoch) => epoch,
                StackKey::Pair(_) => continue,
            };
            if size.is_none() {
                size = group.records.values().next().map(|r| r.size);
            }
            let layers = group
                .records
                .iter()
                .map(|(kind, record)| (*kind, record.path.clone()))
                .collect();
            epochs.insert(epoch, layers);
        }
        if epochs.is_empty() {
            return None;
        }
        Some(EpochStack {
            size: size?,
            epochs,
        })
    }

    pub fn num_epochs(&self) -> usize {
        self.epochs.len()
    }

    /// `YYYYMMDD` strings in date order
    pub fn key_strings(&self) -> Vec<String> {
        self.epochs.keys().map(|e| e.compact()).collect()
    }

    pub fn shape(&self, data_box: Option<&PixelBox>) -> (usize, usize, usize) {
        let (length, width) = spatial_extent(self.size, data_box);
        (self.epochs.len(), length, width)
    }
}

/// Geometry stack: one file per kind, plus baseline files by date
#[derive(Debug, Clone)]
pub struct GeometryStack {
    pub size: RasterSize,
    pub datasets: LayerPaths,
    pub baselines: BTreeMap<EpochKey, PathBuf>,
    /// Attributes inherited from the primary stack, radar side only
    pub metadata: BTreeMap<String, String>,
}

impl GeometryStack {
    /// Split the geometry kinds of an index into a radar-coded and a
    /// geocoded stack. The first (path-sorted) file of each kind wins on
    /// each side.
    pub fn radar_and_geo(index: &PathIndex) -> (Option<GeometryStack>, Option<GeometryStack>) {
        let mut radar = GeometryBuilder::default();
        let mut geo = GeometryBuilder::default();
        for (kind, records) in index.iter() {
            if !kind.is_geometry() {
                continue;
            }
            for record in records {
                let side = if record.is_geocoded() {
                    &mut geo
                } else {
                    &mut radar
                };
                if *kind == DatasetKind::PerpBaseline {
                    match parent_dir_date(&record.path) {
                        Some(date) => {
                            side.baselines.insert(date, record.path.clone());
                        }
                        None => log::warn!(
                            "no acquisition date in the directory of {}, skipping",
                            record.path.display()
                        ),
                    }
                } else {
                    side.datasets
                        .entry(*kind)
                        .or_insert_with(|| record.path.clone());
                }
                if side.size.is_none() {
                    side.size = Some(record.size);
                }
            }
        }
        (radar.build(), geo.build())
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty() && self.baselines.is_empty()
    }

    /// Dataset kind names, the keys a written geometry stack is gated on
    pub fn dataset_names(&self) -> Vec<String> {
        self.datasets.keys().map(|k| k.name().to_string()).collect()
    }

    pub fn shape(&self, data_box: Option<&PixelBox>) -> (usize, usize, usize) {
        let (length, width) = spatial_extent(self.size, data_box);
        (self.datasets.len(), length, width)
    }
}

#[derive(Debug, Default)]
struct GeometryBuilder {
    size: Option<RasterSize>,
    datasets: LayerPaths,
    baselines: BTreeMap<EpochKey, PathBuf>,
}

impl GeometryBuilder {
    fn build(self) -> Option<GeometryStack> {
        if self.datasets.is_empty() && self.baselines.is_empty() {
            return None;
        }
        Some(GeometryStack {
            size: self.size?,
            datasets: self.datasets,
            baselines: self.baselines,
            metadata: BTreeMap::new(),
        })
    }
}

fn spatial_extent(size: RasterSize, data_box: Option<&PixelBox>) -> (usize, usize) {
    match data_box {
        Some(b) => (b.length(), b.width()),
        None => (size.length, size.width),
    }
}
