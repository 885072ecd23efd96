//! Load pipeline.
//!
//! Ties the stages together: discover files, resolve the subset request,
//! reconcile sizes, window the lookup grids, match files across kinds,
//! assemble the stacks, and decide per output whether writing is needed.
//! The result is an [`IngestPlan`] describing exactly what a writer should
//! produce; no pixel data is touched here.

use crate::config::LoadConfig;
use crate::core::assemble::{EpochStack, GeometryStack, PairStack};
use crate::core::coord::{Coordinate, LookupTable};
use crate::core::matcher::match_groups;
use crate::core::reconcile::{reconcile_sizes, ReconcileReport};
use crate::core::subset::{derive_lookup_box, resolve_subset, GeoStatus};
use crate::core::update::{decide, WriteDecision};
use crate::io::attributes::read_attributes;
use crate::io::discover::discover;
use crate::io::store::{PersistedStack, StackManifest};
use crate::types::{DatasetKind, PathIndex, PixelBox, StackError, StackResult};
use std::collections::BTreeMap;
use std::fs;

/// One output stack the writer should produce
#[derive(Debug, Clone)]
pub struct OutputPlan {
    pub name: String,
    /// (bands, length, width) after subsetting and multilooking
    pub shape: (usize, usize, usize),
    pub keys: Vec<String>,
    pub decision: WriteDecision,
}

/// Everything a writer needs to know about one load run
#[derive(Debug, Clone)]
pub struct IngestPlan {
    /// Subset box in the data frame, `None` for the full extent
    pub data_box: Option<PixelBox>,
    /// Window of geocoded lookup grids matching `data_box`
    pub lookup_box: Option<PixelBox>,
    pub geo_status: GeoStatus,
    pub reconcile: ReconcileReport,
    pub pair_stack: Option<PairStack>,
    pub epoch_stack: Option<EpochStack>,
    pub geometry_radar: Option<GeometryStack>,
    pub geometry_geo: Option<GeometryStack>,
    /// Attributes the writer should attach to every output
    pub metadata: BTreeMap<String, String>,
    pub outputs: Vec<OutputPlan>,
}

impl IngestPlan {
    pub fn decision(&self, name: &str) -> Option<WriteDecision> {
        self.outputs
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.decision)
    }

    /// Whether any output still needs writing
    pub fn needs_writing(&self) -> bool {
        self.outputs
            .iter()
            .any(|o| o.decision == WriteDecision::Write)
    }
}

/// Stack ingestion driver
pub struct StackLoader {
    config: LoadConfig,
}

impl StackLoader {
    pub fn new(config: LoadConfig) -> StackLoader {
        StackLoader { config }
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Run the full ingestion pipeline and produce the plan.
    ///
    /// `lookup` is only needed for geographic subsets of radar-coded data
    /// and for windowing geocoded lookup grids; passing `None` disables
    /// both.
    pub fn run(&self, lookup: Option<&dyn LookupTable>) -> StackResult<IngestPlan> {
        let cfg = &self.config;
        fs::create_dir_all(&cfg.out_dir)?;

        let catalog = cfg.catalog.for_processor(cfg.processor);
        let mut index = discover(&catalog)?;

        let primary = index
            .get(&cfg.primary)
            .and_then(|records| records.first())
            .cloned()
            .ok_or(StackError::MissingDataset(cfg.primary))?;

        // Attribute lookups never abort the run; a primary with an unreadable
        // or incomplete sidecar just loses whatever depends on it.
        let primary_attrs = match read_attributes(&primary.path) {
            Ok(attrs) => Some(attrs),
            Err(e) => {
                log::warn!(
                    "could not read attributes of {}: {}",
                    primary.path.display(),
                    e
                );
                None
            }
        };
        let transform = if primary.is_geocoded() {
            primary_attrs
                .as_ref()
                .and_then(|attrs| match Coordinate::from_attributes(attrs) {
                    Ok(transform) => Some(transform),
                    Err(e) => {
                        log::warn!(
                            "no geocoding transform for {}: {}",
                            primary.path.display(),
                            e
                        );
                        None
                    }
                })
        } else {
            None
        };
        let resolution = resolve_subset(&cfg.subset, primary.size, transform.as_ref(), lookup)?;

        let report = reconcile_sizes(&mut index, cfg.primary, resolution.data_box);
        let data_box = resolution.data_box.or(report.derived_box);
        let lookup_box = derive_lookup_box(lookup, data_box);

        let pair_stack = self.assemble_pairs(&index)?;
        let epoch_stack = self.assemble_epochs(&index)?;
        let (mut geometry_radar, geometry_geo) = GeometryStack::radar_and_geo(&index);
        if !primary.is_geocoded() {
            // Radar-frame geometry shares the primary stack's acquisition
            // metadata; geocoded geometry describes its own grid.
            if let (Some(stack), Some(attrs)) = (geometry_radar.as_mut(), primary_attrs.as_ref()) {
                stack.metadata = attrs
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect();
            }
        }

        if cfg.primary.is_pair_keyed() && pair_stack.is_none() {
            return Err(StackError::MissingDataset(cfg.primary));
        }
        if cfg.primary == DatasetKind::Slc && epoch_stack.is_none() {
            return Err(StackError::MissingDataset(cfg.primary));
        }

        let metadata = self.extra_metadata(data_box.as_ref());
        self.log_write_setting(data_box.as_ref());

        let mut outputs = Vec::new();
        if let Some(stack) = &pair_stack {
            outputs.push(self.plan_output(
                "ifgramStack",
                stack.shape(data_box.as_ref()),
                stack.key_strings(),
            ));
        }
        if let Some(stack) = &epoch_stack {
            outputs.push(self.plan_output(
                "slcStack",
                stack.shape(data_box.as_ref()),
                stack.key_strings(),
            ));
        }
        if let Some(stack) = &geometry_radar {
            outputs.push(self.plan_output(
                "geometryRadar",
                stack.shape(data_box.as_ref()),
                stack.dataset_names(),
            ));
        }
        if let Some(stack) = &geometry_geo {
            // geocoded geometry lives in the lookup frame, not the data frame
            outputs.push(self.plan_output(
                "geometryGeo",
                stack.shape(lookup_box.as_ref()),
                stack.dataset_names(),
            ));
        }

        Ok(IngestPlan {
            data_box,
            lookup_box,
            geo_status: resolution.geo_status,
            reconcile: report,
            pair_stack,
            epoch_stack,
            geometry_radar,
            geometry_geo,
            metadata,
            outputs,
        })
    }

    /// Record the manifests of every output planned for writing, so the
    /// next run in update mode can skip them.
    pub fn commit(&self, plan: &IngestPlan) -> StackResult<()> {
        for output in &plan.outputs {
            if output.decision != WriteDecision::Write {
                continue;
            }
            let manifest = StackManifest::new(
                output.name.clone(),
                output.shape,
                output.keys.iter().cloned().collect(),
            );
            manifest.write(StackManifest::manifest_path(
                &self.config.out_dir,
                &output.name,
            ))?;
        }
        Ok(())
    }

    fn assemble_pairs(&self, index: &PathIndex) -> StackResult<Option<PairStack>> {
        let pair_index = filter_index(index, |kind| kind.is_pair_keyed());
        if pair_index.is_empty() {
            return Ok(None);
        }
        let primary = if self.config.primary.is_pair_keyed()
            && pair_index.contains_key(&self.config.primary)
        {
            self.config.primary
        } else {
            match pair_index.keys().next() {
                Some(kind) => *kind,
                None => return Ok(None),
            }
        };
        let groups = match_groups(&pair_index, primary, None, None)?;
        Ok(PairStack::from_groups(&groups))
    }

    fn assemble_epochs(&self, index: &PathIndex) -> StackResult<Option<EpochStack>> {
        let slc_index = filter_index(index, |kind| kind == DatasetKind::Slc);
        if slc_index.is_empty() {
            return Ok(None);
        }
        let groups = match_groups(
            &slc_index,
            DatasetKind::Slc,
            self.config.start_date,
            self.config.end_date,
        )?;
        Ok(EpochStack::from_groups(&groups))
    }

    fn plan_output(&self, name: &str, shape: (usize, usize, usize), keys: Vec<String>) -> OutputPlan {
        let shape = stepped_shape(shape, self.config.ystep, self.config.xstep);
        let manifest =
            StackManifest::open(StackManifest::manifest_path(&self.config.out_dir, name)).ok();
        let decision = decide(
            name,
            shape,
            &keys,
            manifest.as_ref().map(|m| m as &dyn PersistedStack),
            self.config.update_mode,
        );
        OutputPlan {
            name: name.to_string(),
            shape,
            keys,
            decision,
        }
    }

    fn extra_metadata(&self, data_box: Option<&PixelBox>) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        if let Some(project) = &self.config.project_name {
            metadata.insert("PROJECT_NAME".to_string(), project.clone());
        }
        if let Some(platform) = &self.config.platform {
            metadata.insert("PLATFORM".to_string(), platform.clone());
        }
        if let Some(b) = data_box {
            metadata.insert("SUBSET_XMIN".to_string(), b.x0.to_string());
            metadata.insert("SUBSET_YMIN".to_string(), b.y0.to_string());
            metadata.insert("SUBSET_XMAX".to_string(), b.x1.to_string());
            metadata.insert("SUBSET_YMAX".to_string(), b.y1.to_string());
        }
        metadata
    }

    fn log_write_setting(&self, data_box: Option<&PixelBox>) {
        let cfg = &self.config;
        log::info!("update mode : {}", cfg.update_mode);
        match &cfg.compression {
            Some(c) => log::info!("compression : {}", c),
            None => log::info!("compression : none"),
        }
        log::info!("multilook x/y step : {}/{}", cfg.xstep, cfg.ystep);
        match data_box {
            Some(b) => log::info!("subset box  : {}", b),
            None => log::info!("subset box  : full extent"),
        }
        log::info!("output dir  : {}", cfg.out_dir.display());
    }
}

fn filter_index(index: &PathIndex, pred: impl Fn(DatasetKind) -> bool) -> PathIndex {
    index
        .iter()
        .filter(|(kind, _)| pred(**kind))
        .map(|(kind, records)| (*kind, records.clone()))
        .collect()
}

/// Multilooked output extent: truncating division, matching a writer that
/// drops the ragged remainder rows and columns.
fn stepped_shape(shape: (usize, usize, usize), ystep: usize, xstep: usize) -> (usize, usize, usize) {
    (
        shape.0,
        shape.1 / ystep.max(1),
        shape.2 / xstep.max(1),
    )
}
