//! Subset resolution.
//!
//! A subset request arrives either as a geographic box or as a pixel box.
//! Resolution turns it into a pixel box in the data frame: geocoded data
//! converts through its own affine, radar-coded data goes through the
//! lookup table. A geographic request that cannot be honored (radar data,
//! no lookup) is discarded with a warning instead of failing the run, and
//! any pixel request then still applies.

use crate::config::SubsetRequest;
use crate::core::coord::{box_for_lookup, Coordinate, LookupTable};
use crate::types::{PixelBox, RasterSize, StackError, StackResult};

/// What happened to the geographic part of a subset request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoStatus {
    /// No geographic box was requested
    NotRequested,
    /// The geographic box was translated into the data frame
    Applied,
    /// The geographic box had to be ignored; the reason is attached
    Discarded(String),
}

/// Resolved subset of a load run
#[derive(Debug, Clone)]
pub struct SubsetResolution {
    /// Subset box in the data frame; `None` loads the full extent
    pub data_box: Option<PixelBox>,
    pub geo_status: GeoStatus,
}

/// Resolve a subset request against the primary raster.
///
/// `data_transform` must be given when the data itself is geocoded;
/// `lookup` is consulted for geographic requests on radar-coded data. A
/// resolved box covering the full extent collapses to `None`.
pub fn resolve_subset(
    request: &SubsetRequest,
    data_size: RasterSize,
    data_transform: Option<&Coordinate>,
    lookup: Option<&dyn LookupTable>,
) -> StackResult<SubsetResolution> {
    let mut geo_status = GeoStatus::NotRequested;
    let mut data_box: Option<PixelBox> = None;

    if let Some(geo) = &request.geo {
        match (data_transform, lookup) {
            (Some(transform), _) => {
                let pix = transform.clip_to_coverage(&transform.geo_to_image(geo))?;
                log::info!("geographic subset {} resolved to pixel box {}", geo, pix);
                data_box = Some(pix);
                geo_status = GeoStatus::Applied;
            }
            (None, Some(lookup)) => {
                let pix = clip_box(&lookup.geo_to_image(geo)?, data_size)?;
                log::info!("geographic subset {} resolved to pixel box {}", geo, pix);
                data_box = Some(pix);
                geo_status = GeoStatus::Applied;
            }
            (None, None) => {
                let reason =
                    "no lookup table available to translate the geographic subset".to_string();
                log::warn!("{}; ignoring it", reason);
                geo_status = GeoStatus::Discarded(reason);
            }
        }
    }

    if data_box.is_none() {
        if let Some(pix) = &request.pixel {
            data_box = Some(clip_box(pix, data_size)?);
        }
    } else if request.pixel.is_some() {
        log::debug!("pixel subset ignored in favor of the geographic subset");
    }

    // a box spanning everything is the same as no box
    if data_box == Some(PixelBox::full(data_size)) {
        log::debug!("subset box covers the full extent, dropping it");
        data_box = None;
    }

    Ok(SubsetResolution {
        data_box,
        geo_status,
    })
}

/// Window of the lookup grids matching the effective data box.
///
/// Only geocoded lookup grids need their own window; radar-frame lookup
/// grids are read with the data box directly. Failures here degrade to
/// `None` so a bad lookup never blocks the load.
pub fn derive_lookup_box(
    lookup: Option<&dyn LookupTable>,
    data_box: Option<PixelBox>,
) -> Option<PixelBox> {
    let lookup = lookup?;
    let data_box = data_box?;
    if !lookup.is_geocoded() {
        return None;
    }
    match box_for_lookup(lookup, &data_box) {
        Ok(window) => {
            log::info!("lookup grids windowed to {}", window);
            Some(window)
        }
        Err(e) => {
            log::warn!("could not window the lookup grids: {}", e);
            None
        }
    }
}

fn clip_box(pix: &PixelBox, size: RasterSize) -> StackResult<PixelBox> {
    let clipped = PixelBox::new(
        pix.x0.min(size.width),
        pix.y0.min(size.length),
        pix.x1.min(size.width),
        pix.y1.min(size.length),
    );
    if clipped.x0 >= clipped.x1 || clipped.y0 >= clipped.y1 {
        return Err(StackError::OutsideCoverage(*pix));
    }
    Ok(clipped)
}
