//! sarstack: A Fast, Modular InSAR Stack Ingestion Engine
//!
//! This library turns loose interferogram, SLC, and geometry files from
//! ISCE, GAMMA, ROI_PAC, and similar processors into a coherent plan for
//! writing analysis-ready stacks: it discovers files by glob pattern,
//! matches them across dataset kinds by acquisition date, reconciles
//! inconsistent raster sizes, resolves geographic subsets into pixel
//! windows, and decides which outputs an incremental re-run can skip.

pub mod config;
pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    CoordinateSystem, DatasetKind, EpochKey, FileRecord, GeoBox, PairKey, PathIndex, PixelBox,
    RasterSize, StackError, StackKey, StackResult,
};

pub use config::{Compression, DatasetCatalog, LoadConfig, Processor, SubsetRequest};
pub use self::core::{IngestPlan, LookupTable, StackLoader, WriteDecision};
pub use io::{RasterAttributes, StackManifest};
