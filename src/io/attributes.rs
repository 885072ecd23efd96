//! Sidecar metadata reader.
//!
//! Raster products arrive with their scalar metadata in a sidecar next to the
//! data file: ROI_PAC/GAMMA-style `.rsc` text (`KEY value` per line) or
//! ISCE-style `.xml` property trees. Both are flattened into the same
//! upper-cased key/value map; presence of `Y_FIRST` marks a product as
//! geocoded.

use crate::types::{CoordinateSystem, RasterSize, StackError, StackResult};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Scalar metadata of one raster product
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RasterAttributes {
    values: HashMap<String, String>,
}

impl RasterAttributes {
    pub fn from_map(values: HashMap<String, String>) -> Self {
        let mut attrs = RasterAttributes { values };
        attrs.normalize();
        attrs
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.values.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of rows
    pub fn length(&self) -> StackResult<usize> {
        self.parse_usize("LENGTH")
    }

    /// Number of columns
    pub fn width(&self) -> StackResult<usize> {
        self.parse_usize("WIDTH")
    }

    pub fn size(&self) -> StackResult<RasterSize> {
        Ok(RasterSize::new(self.length()?, self.width()?))
    }

    /// Single acquisition date tag, when present
    pub fn date(&self) -> Option<&str> {
        self.get("DATE")
    }

    /// Date-pair tag (`YYYYMMDD-YYYYMMDD` or similar), when present
    pub fn date12(&self) -> Option<&str> {
        self.get("DATE12")
    }

    /// Products with a `Y_FIRST` attribute are geocoded; everything else is
    /// treated as radar (image-space) coordinates.
    pub fn is_geocoded(&self) -> bool {
        self.contains("Y_FIRST")
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        if self.is_geocoded() {
            CoordinateSystem::Geographic
        } else {
            CoordinateSystem::Radar
        }
    }

    pub fn float(&self, key: &str) -> StackResult<f64> {
        let raw = self
            .get(key)
            .ok_or_else(|| StackError::Metadata(format!("missing attribute {}", key)))?;
        raw.trim()
            .parse::<f64>()
            .map_err(|e| StackError::Metadata(format!("bad value for {}: '{}' ({})", key, raw, e)))
    }

    fn parse_usize(&self, key: &str) -> StackResult<usize> {
        let raw = self
            .get(key)
            .ok_or_else(|| StackError::Metadata(format!("missing attribute {}", key)))?;
        // a few processors write sizes as floats
        let trimmed = raw.trim();
        trimmed
            .parse::<usize>()
            .or_else(|_| trimmed.parse::<f64>().map(|v| v as usize))
            .map_err(|e| StackError::Metadata(format!("bad value for {}: '{}' ({})", key, raw, e)))
    }

    fn normalize(&mut self) {
        if !self.values.contains_key("LENGTH") {
            if let Some(value) = self.values.get("FILE_LENGTH").cloned() {
                self.values.insert("LENGTH".to_string(), value);
            }
        }
    }
}

/// Locate and parse the metadata sidecar for a data file.
///
/// A path that itself ends in `.rsc` or `.xml` is read directly; otherwise
/// `<path>.rsc` is tried first, then `<path>.xml`.
pub fn read_attributes<P: AsRef<Path>>(path: P) -> StackResult<RasterAttributes> {
    let path = path.as_ref();
    let sidecar = locate_sidecar(path)?;
    log::debug!("reading attributes from {}", sidecar.display());

    let text = fs::read_to_string(&sidecar)?;
    match sidecar.extension().and_then(|ext| ext.to_str()) {
        Some("xml") => parse_isce_xml(&text),
        _ => Ok(parse_rsc(&text)),
    }
}

/// Strip a trailing `.rsc`/`.xml` sidecar extension from a discovered path,
/// yielding the data-file path the record should carry.
pub fn strip_sidecar_extension(path: &Path) -> PathBuf {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("rsc") | Some("xml") => path.with_extension(""),
        _ => path.to_path_buf(),
    }
}

fn locate_sidecar(path: &Path) -> StackResult<PathBuf> {
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        if matches!(ext, "rsc" | "xml") && path.is_file() {
            return Ok(path.to_path_buf());
        }
    }
    for ext in ["rsc", "xml"] {
        let candidate = PathBuf::from(format!("{}.{}", path.display(), ext));
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(StackError::Metadata(format!(
        "no metadata sidecar (.rsc/.xml) found for {}",
        path.display()
    )))
}

/// Parse ROI_PAC/GAMMA `.rsc` text: one `KEY value` pair per line.
pub fn parse_rsc(text: &str) -> RasterAttributes {
    let mut values = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        if let Some(key) = parts.next() {
            let value = parts.collect::<Vec<_>>().join(" ");
            values.insert(key.to_uppercase(), value);
        }
    }
    RasterAttributes::from_map(values)
}

/// Simplified XML structure of an ISCE image sidecar: nested components
/// holding named properties with a `<value>` child.
#[derive(Debug, Deserialize)]
struct XmlNode {
    #[serde(rename = "@name", default)]
    name: Option<String>,
    #[serde(rename = "property", default)]
    properties: Vec<XmlProperty>,
    #[serde(rename = "component", default)]
    components: Vec<XmlNode>,
}

#[derive(Debug, Deserialize)]
struct XmlProperty {
    #[serde(rename = "@name")]
    name: String,
    #[serde(default)]
    value: Option<String>,
}

/// Parse an ISCE `.xml` property file.
///
/// Top-level properties map directly (upper-cased); the `coordinate1` /
/// `coordinate2` components map onto the `X_FIRST`/`X_STEP`/`WIDTH` and
/// `Y_FIRST`/`Y_STEP`/`LENGTH` attributes so geocoded ISCE products expose
/// the same keys as `.rsc` sidecars.
pub fn parse_isce_xml(text: &str) -> StackResult<RasterAttributes> {
    let root: XmlNode = from_str(text)
        .map_err(|e| StackError::XmlParsing(format!("failed to parse ISCE sidecar: {}", e)))?;

    let mut values = HashMap::new();
    collect_node(&root, &mut values);
    Ok(RasterAttributes::from_map(values))
}

fn collect_node(node: &XmlNode, values: &mut HashMap<String, String>) {
    for property in &node.properties {
        if let Some(value) = &property.value {
            values.insert(property.name.to_uppercase(), value.trim().to_string());
        }
    }
    for component in &node.components {
        match component.name.as_deref().map(str::to_lowercase).as_deref() {
            Some("coordinate1") => collect_coordinate(component, "X_FIRST", "X_STEP", "WIDTH", values),
            Some("coordinate2") => collect_coordinate(component, "Y_FIRST", "Y_STEP", "LENGTH", values),
            _ => collect_node(component, values),
        }
    }
}

fn collect_coordinate(
    node: &XmlNode,
    first_key: &str,
    step_key: &str,
    size_key: &str,
    values: &mut HashMap<String, String>,
) {
    for property in &node.properties {
        let value = match &property.value {
            Some(value) => value.trim().to_string(),
            None => continue,
        };
        match property.name.to_lowercase().as_str() {
            "startingvalue" => {
                values.insert(first_key.to_string(), value);
            }
            "delta" => {
                values.insert(step_key.to_string(), value);
            }
            "size" => {
                values.insert(size_key.to_string(), value);
            }
            _ => {}
        }
    }
}
