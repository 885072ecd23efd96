//! Run configuration: dataset search catalog, processor selection and
//! subset requests.
//!
//! Upstream template handling is out of scope; these types are the explicit
//! values every component receives instead of a shared mutable table, so a
//! per-run filtering (e.g. dropping geometry kinds for a processor) can never
//! leak into the next run.

use crate::types::{DatasetKind, GeoBox, PixelBox, StackError, StackResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

/// Upstream InSAR processor that produced the input rasters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Processor {
    Isce,
    Gamma,
    RoiPac,
    Snap,
    Doris,
    GmtSar,
}

impl FromStr for Processor {
    type Err = StackError;

    fn from_str(s: &str) -> StackResult<Self> {
        match s.to_lowercase().as_str() {
            "isce" => Ok(Processor::Isce),
            "gamma" => Ok(Processor::Gamma),
            "roipac" => Ok(Processor::RoiPac),
            "snap" => Ok(Processor::Snap),
            "doris" => Ok(Processor::Doris),
            "gmtsar" => Ok(Processor::GmtSar),
            other => Err(StackError::InvalidFormat(format!(
                "unrecognized InSAR processor: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Processor::Isce => "isce",
            Processor::Gamma => "gamma",
            Processor::RoiPac => "roipac",
            Processor::Snap => "snap",
            Processor::Doris => "doris",
            Processor::GmtSar => "gmtsar",
        };
        write!(f, "{}", name)
    }
}

/// Compression hint forwarded to the external writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compression {
    Gzip,
    Lzf,
}

impl FromStr for Compression {
    type Err = StackError;

    fn from_str(s: &str) -> StackResult<Self> {
        match s.to_lowercase().as_str() {
            "gzip" => Ok(Compression::Gzip),
            "lzf" => Ok(Compression::Lzf),
            other => Err(StackError::InvalidFormat(format!(
                "unrecognized compression: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::Gzip => write!(f, "gzip"),
            Compression::Lzf => write!(f, "lzf"),
        }
    }
}

/// Search patterns for each dataset kind, e.g.
/// `unwrapPhase -> "interferograms/*/filt_fine.unw"`.
///
/// Kinds without a pattern are simply not searched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetCatalog {
    patterns: BTreeMap<DatasetKind, String>,
}

impl DatasetCatalog {
    pub fn new() -> Self {
        DatasetCatalog::default()
    }

    pub fn insert<S: Into<String>>(&mut self, kind: DatasetKind, pattern: S) -> &mut Self {
        self.patterns.insert(kind, pattern.into());
        self
    }

    pub fn pattern(&self, kind: DatasetKind) -> Option<&str> {
        self.patterns.get(&kind).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterate configured kinds and patterns in dataset order.
    pub fn iter(&self) -> impl Iterator<Item = (DatasetKind, &str)> {
        self.patterns.iter().map(|(kind, pattern)| (*kind, pattern.as_str()))
    }

    /// Return a copy with the geometry kinds the given processor does not
    /// produce removed: ISCE and DORIS ship latitude/longitude lookups,
    /// GAMMA and ROI_PAC ship azimuth/range coordinate lookups.
    pub fn for_processor(&self, processor: Processor) -> DatasetCatalog {
        let mut filtered = self.clone();
        match processor {
            Processor::Isce | Processor::Doris => {
                filtered.patterns.remove(&DatasetKind::AzimuthCoord);
                filtered.patterns.remove(&DatasetKind::RangeCoord);
            }
            Processor::Gamma | Processor::RoiPac => {
                filtered.patterns.remove(&DatasetKind::Latitude);
                filtered.patterns.remove(&DatasetKind::Longitude);
            }
            Processor::Snap => {}
            other => {
                log::warn!("no geometry filtering rule for processor {}", other);
            }
        }
        filtered
    }
}

/// Requested subset window, in either or both coordinate systems.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsetRequest {
    pub geo: Option<GeoBox>,
    pub pixel: Option<PixelBox>,
}

impl SubsetRequest {
    pub fn none() -> Self {
        SubsetRequest::default()
    }

    pub fn is_empty(&self) -> bool {
        self.geo.is_none() && self.pixel.is_none()
    }

    /// Parse the `lat0:lat1,lon0:lon1` / `y0:y1,x0:x1` template values.
    /// Each range is sorted, so `43.2:42.9` and `42.9:43.2` are equivalent.
    pub fn from_template_values(lalo: Option<&str>, yx: Option<&str>) -> StackResult<Self> {
        let geo = match lalo {
            Some(text) => {
                let (lats, lons) = split_ranges_f64(text)?;
                Some(GeoBox::new(lons.0, lats.1, lons.1, lats.0))
            }
            None => None,
        };
        let pixel = match yx {
            Some(text) => {
                let (ys, xs) = split_ranges_usize(text)?;
                Some(PixelBox::new(xs.0, ys.0, xs.1, ys.1))
            }
            None => None,
        };
        Ok(SubsetRequest { geo, pixel })
    }
}

fn split_ranges_f64(text: &str) -> StackResult<((f64, f64), (f64, f64))> {
    let (first, second) = split_two(text)?;
    Ok((parse_range_f64(&first)?, parse_range_f64(&second)?))
}

fn split_ranges_usize(text: &str) -> StackResult<((usize, usize), (usize, usize))> {
    let (first, second) = split_two(text)?;
    Ok((parse_range_usize(&first)?, parse_range_usize(&second)?))
}

fn split_two(text: &str) -> StackResult<(String, String)> {
    let cleaned = text.replace(['[', ']'], "");
    let parts: Vec<&str> = cleaned.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(StackError::InvalidFormat(format!(
            "expected two comma-separated ranges, got '{}'",
            text
        )));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

fn parse_range_f64(text: &str) -> StackResult<(f64, f64)> {
    let parts: Vec<&str> = text.split(':').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(StackError::InvalidFormat(format!("expected 'min:max', got '{}'", text)));
    }
    let mut values = [
        parts[0].parse::<f64>().map_err(|e| {
            StackError::InvalidFormat(format!("bad coordinate '{}': {}", parts[0], e))
        })?,
        parts[1].parse::<f64>().map_err(|e| {
            StackError::InvalidFormat(format!("bad coordinate '{}': {}", parts[1], e))
        })?,
    ];
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Ok((values[0], values[1]))
}

fn parse_range_usize(text: &str) -> StackResult<(usize, usize)> {
    let parts: Vec<&str> = text.split(':').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(StackError::InvalidFormat(format!("expected 'min:max', got '{}'", text)));
    }
    let mut values = [
        parts[0].parse::<usize>().map_err(|e| {
            StackError::InvalidFormat(format!("bad pixel coordinate '{}': {}", parts[0], e))
        })?,
        parts[1].parse::<usize>().map_err(|e| {
            StackError::InvalidFormat(format!("bad pixel coordinate '{}': {}", parts[1], e))
        })?,
    ];
    values.sort_unstable();
    Ok((values[0], values[1]))
}

/// Complete configuration of one ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub processor: Processor,
    pub catalog: DatasetCatalog,
    /// Dataset kind whose keys define the matching domain. `UnwrapPhase`
    /// drives an interferogram run, `Slc` an epoch run.
    pub primary: DatasetKind,
    pub subset: SubsetRequest,
    /// Inclusive epoch window applied to epoch runs
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Skip writing when the persisted stack already satisfies the request
    pub update_mode: bool,
    pub compression: Option<Compression>,
    /// Write-time decimation steps, forwarded to the writer
    pub xstep: usize,
    pub ystep: usize,
    /// Directory receiving the persisted stacks
    pub out_dir: PathBuf,
    pub project_name: Option<String>,
    pub platform: Option<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            processor: Processor::Isce,
            catalog: DatasetCatalog::new(),
            primary: DatasetKind::UnwrapPhase,
            subset: SubsetRequest::none(),
            start_date: None,
            end_date: None,
            update_mode: true,
            compression: None,
            xstep: 1,
            ystep: 1,
            out_dir: PathBuf::from("./inputs"),
            project_name: None,
            platform: None,
        }
    }
}
