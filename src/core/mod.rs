//! Core stack ingestion modules

pub mod assemble;
pub mod coord;
pub mod keys;
pub mod matcher;
pub mod pipeline;
pub mod reconcile;
pub mod subset;
pub mod update;

// Re-export main types
pub use assemble::{EpochStack, GeometryStack, LayerPaths, PairStack};
pub use coord::{box_for_lookup, Coordinate, GeoGridLookup, LookupTable, RadarGridLookup};
pub use keys::{key_for_record, parse_date_token, parse_pair_tag};
pub use matcher::{match_groups, MatchedGroup};
pub use pipeline::{IngestPlan, OutputPlan, StackLoader};
pub use reconcile::{reconcile_sizes, ReconcileReport};
pub use subset::{derive_lookup_box, resolve_subset, GeoStatus, SubsetResolution};
pub use update::{decide, WriteDecision};
