use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Mapping from dataset kind to the discovered candidate files, in
/// lexicographic path order. Built once per run; only reconciliation
/// removes entries.
pub type PathIndex = BTreeMap<DatasetKind, Vec<FileRecord>>;

/// Coordinate system of a raster product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateSystem {
    /// Radar (image-space) coordinates: row/column
    Radar,
    /// Geographic coordinates: latitude/longitude
    Geographic,
}

/// Semantic role of a raster within an epoch or pair.
///
/// The set is closed: every loadable product maps onto one of these kinds,
/// mirroring the dataset names of the persisted container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DatasetKind {
    Slc,
    UnwrapPhase,
    Coherence,
    ConnectComponent,
    WrapPhase,
    Ionosphere,
    Height,
    Latitude,
    Longitude,
    AzimuthCoord,
    RangeCoord,
    IncidenceAngle,
    AzimuthAngle,
    ShadowMask,
    WaterMask,
    PerpBaseline,
}

impl DatasetKind {
    /// All kinds, in the order they are reported and persisted.
    pub const ALL: [DatasetKind; 16] = [
        DatasetKind::Slc,
        DatasetKind::UnwrapPhase,
        DatasetKind::Coherence,
        DatasetKind::ConnectComponent,
        DatasetKind::WrapPhase,
        DatasetKind::Ionosphere,
        DatasetKind::Height,
        DatasetKind::Latitude,
        DatasetKind::Longitude,
        DatasetKind::AzimuthCoord,
        DatasetKind::RangeCoord,
        DatasetKind::IncidenceAngle,
        DatasetKind::AzimuthAngle,
        DatasetKind::ShadowMask,
        DatasetKind::WaterMask,
        DatasetKind::PerpBaseline,
    ];

    /// Dataset name as used by the persisted container
    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::Slc => "slc",
            DatasetKind::UnwrapPhase => "unwrapPhase",
            DatasetKind::Coherence => "coherence",
            DatasetKind::ConnectComponent => "connectComponent",
            DatasetKind::WrapPhase => "wrapPhase",
            DatasetKind::Ionosphere => "iono",
            DatasetKind::Height => "height",
            DatasetKind::Latitude => "latitude",
            DatasetKind::Longitude => "longitude",
            DatasetKind::AzimuthCoord => "azimuthCoord",
            DatasetKind::RangeCoord => "rangeCoord",
            DatasetKind::IncidenceAngle => "incidenceAngle",
            DatasetKind::AzimuthAngle => "azimuthAngle",
            DatasetKind::ShadowMask => "shadowMask",
            DatasetKind::WaterMask => "waterMask",
            DatasetKind::PerpBaseline => "bperp",
        }
    }

    /// Geometry layers are loaded once per stack, not per epoch or pair.
    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            DatasetKind::Height
                | DatasetKind::Latitude
                | DatasetKind::Longitude
                | DatasetKind::AzimuthCoord
                | DatasetKind::RangeCoord
                | DatasetKind::IncidenceAngle
                | DatasetKind::AzimuthAngle
                | DatasetKind::ShadowMask
                | DatasetKind::WaterMask
                | DatasetKind::PerpBaseline
        )
    }

    /// Kinds that participate in the per-epoch / per-pair matching domain.
    pub fn is_stack_product(&self) -> bool {
        !self.is_geometry()
    }

    /// Kinds keyed by a date pair rather than a single acquisition date.
    pub fn is_pair_keyed(&self) -> bool {
        matches!(
            self,
            DatasetKind::UnwrapPhase
                | DatasetKind::Coherence
                | DatasetKind::ConnectComponent
                | DatasetKind::WrapPhase
                | DatasetKind::Ionosphere
        )
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single acquisition date, canonically an 8-digit `YYYYMMDD` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpochKey(pub NaiveDate);

impl EpochKey {
    pub fn new(date: NaiveDate) -> Self {
        EpochKey(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Canonical 8-digit form, e.g. `20200113`
    pub fn compact(&self) -> String {
        format!("{:04}{:02}{:02}", self.0.year(), self.0.month(), self.0.day())
    }

    /// 6-digit `YYMMDD` token as it appears in most product file names
    pub fn short_token(&self) -> String {
        format!("{:02}{:02}{:02}", self.0.year() % 100, self.0.month(), self.0.day())
    }
}

impl std::fmt::Display for EpochKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.compact())
    }
}

/// A (reference, secondary) date pair identifying an interferometric product.
///
/// Reference precedes secondary by convention, but the order found in the
/// `DATE12` tag is preserved; matching tests both dates independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub reference: EpochKey,
    pub secondary: EpochKey,
}

impl PairKey {
    pub fn new(reference: EpochKey, secondary: EpochKey) -> Self {
        PairKey { reference, secondary }
    }
}

impl std::fmt::Display for PairKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.reference, self.secondary)
    }
}

/// Key of one entry in a stack: a single epoch or an interferometric pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StackKey {
    Epoch(EpochKey),
    Pair(PairKey),
}

impl StackKey {
    /// Date tokens that a candidate path must contain to match this key.
    ///
    /// Epochs match on the full 8-digit date; pairs match on the two 6-digit
    /// `YYMMDD` tokens so that both `20200101_20200113` and `200101_200113`
    /// style names are recognised.
    pub fn date_tokens(&self) -> Vec<String> {
        match self {
            StackKey::Epoch(epoch) => vec![epoch.compact()],
            StackKey::Pair(pair) => {
                vec![pair.reference.short_token(), pair.secondary.short_token()]
            }
        }
    }
}

impl std::fmt::Display for StackKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackKey::Epoch(epoch) => write!(f, "{}", epoch),
            StackKey::Pair(pair) => write!(f, "{}", pair),
        }
    }
}

/// Raster dimensions in pixels (rows, columns)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RasterSize {
    pub length: usize,
    pub width: usize,
}

impl RasterSize {
    pub fn new(length: usize, width: usize) -> Self {
        RasterSize { length, width }
    }
}

impl std::fmt::Display for RasterSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.length, self.width)
    }
}

/// One discovered raster product. Immutable once read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub kind: DatasetKind,
    pub size: RasterSize,
    pub coord: CoordinateSystem,
    /// Raw `DATE` or `DATE12` tag from the file metadata, when present
    pub date_tag: Option<String>,
}

impl FileRecord {
    pub fn is_geocoded(&self) -> bool {
        self.coord == CoordinateSystem::Geographic
    }

    /// Lossy path string used for date-token containment tests
    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Subset window in image coordinates: half-open `(x0, y0, x1, y1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl PixelBox {
    pub fn new(x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        PixelBox { x0, y0, x1, y1 }
    }

    /// Full-extent window of a raster
    pub fn full(size: RasterSize) -> Self {
        PixelBox::new(0, 0, size.width, size.length)
    }

    pub fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0)
    }

    pub fn length(&self) -> usize {
        self.y1.saturating_sub(self.y0)
    }
}

impl std::fmt::Display for PixelBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x0, self.y0, self.x1, self.y1)
    }
}

/// Subset window in geographic coordinates, upper-left / lower-right corners
/// (`north >= south`, `west <= east`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBox {
    pub west: f64,
    pub north: f64,
    pub east: f64,
    pub south: f64,
}

impl GeoBox {
    pub fn new(west: f64, north: f64, east: f64, south: f64) -> Self {
        GeoBox { west, north, east, south }
    }
}

impl std::fmt::Display for GeoBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4}, {:.4}, {:.4})", self.west, self.north, self.east, self.south)
    }
}

/// Error types for stack ingestion
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("XML parsing error: {0}")]
    XmlParsing(String),

    #[error("Invalid search pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Store manifest error: {0}")]
    Store(#[from] serde_json::Error),

    #[error("No required {0} data files found")]
    MissingDataset(DatasetKind),

    #[error("Subset box {0} is outside the data coverage")]
    OutsideCoverage(PixelBox),
}

/// Result type for stack ingestion operations
pub type StackResult<T> = Result<T, StackError>;
