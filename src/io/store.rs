//! Persisted stack manifests.
//!
//! The writer side of the pipeline records what it wrote (spatial shape plus
//! the key of every layer) in a JSON manifest next to each output stack.
//! Re-runs only need that summary to decide whether a stack can be skipped,
//! so the incremental-write check probes the manifest instead of the data.

use crate::types::{StackError, StackResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// What the incremental-write decision needs to know about a stack that is
/// already on disk.
pub trait PersistedStack {
    /// (bands, length, width)
    fn shape(&self) -> (usize, usize, usize);

    /// Keys of the layers the stack holds
    fn keys(&self) -> &BTreeSet<String>;
}

/// JSON manifest describing one written stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackManifest {
    pub name: String,
    pub bands: usize,
    pub length: usize,
    pub width: usize,
    pub keys: BTreeSet<String>,
}

impl StackManifest {
    pub fn new<S: Into<String>>(name: S, shape: (usize, usize, usize), keys: BTreeSet<String>) -> Self {
        StackManifest {
            name: name.into(),
            bands: shape.0,
            length: shape.1,
            width: shape.2,
            keys,
        }
    }

    /// Manifest location for a stack of the given name
    pub fn manifest_path(out_dir: &Path, name: &str) -> PathBuf {
        out_dir.join(format!("{}.json", name))
    }

    pub fn open<P: AsRef<Path>>(path: P) -> StackResult<StackManifest> {
        let text = fs::read_to_string(path.as_ref())?;
        let manifest = serde_json::from_str(&text)?;
        Ok(manifest)
    }

    /// Write the manifest atomically: serialize into a temporary file in the
    /// same directory, then rename it over the target.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> StackResult<()> {
        let path = path.as_ref();
        let dir = path.parent().ok_or_else(|| {
            StackError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("manifest path {} has no parent directory", path.display()),
            ))
        })?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        let text = serde_json::to_string_pretty(self)?;
        tmp.write_all(text.as_bytes())?;
        tmp.persist(path).map_err(|e| StackError::Io(e.error))?;
        log::debug!("wrote manifest {}", path.display());
        Ok(())
    }
}

impl PersistedStack for StackManifest {
    fn shape(&self) -> (usize, usize, usize) {
        (self.bands, self.length, self.width)
    }

    fn keys(&self) -> &BTreeSet<String> {
        &self.keys
    }
}
