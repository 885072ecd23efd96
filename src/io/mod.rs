//! I/O modules for locating files, reading sidecar metadata, and probing written stacks

pub mod attributes;
pub mod discover;
pub mod store;

pub use attributes::{read_attributes, RasterAttributes};
pub use discover::{discover, glob_sorted};
pub use store::{PersistedStack, StackManifest};
