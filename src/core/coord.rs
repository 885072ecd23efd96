//! Coordinate transforms between geographic and image space.
//!
//! Geocoded rasters carry an affine grid (`Y_FIRST`/`Y_STEP`/`X_FIRST`/
//! `X_STEP`) and convert directly. Radar-coded rasters need a lookup table:
//! either latitude/longitude grids sampled in the radar frame, or
//! azimuth/range coordinate grids sampled in a geocoded frame. Both are
//! behind the [`LookupTable`] trait so subset resolution does not care
//! which processor produced the stack.

use crate::io::attributes::RasterAttributes;
use crate::types::{GeoBox, PixelBox, StackError, StackResult};
use approx::abs_diff_eq;
use ndarray::{s, Array2};

/// Affine transform of a geocoded raster grid
#[derive(Debug, Clone)]
pub struct Coordinate {
    y_first: f64,
    y_step: f64,
    x_first: f64,
    x_step: f64,
    length: usize,
    width: usize,
}

impl Coordinate {
    pub fn new(
        y_first: f64,
        y_step: f64,
        x_first: f64,
        x_step: f64,
        length: usize,
        width: usize,
    ) -> StackResult<Coordinate> {
        if abs_diff_eq!(y_step, 0.0, epsilon = 1e-12) || abs_diff_eq!(x_step, 0.0, epsilon = 1e-12)
        {
            return Err(StackError::Metadata(
                "degenerate pixel step in geocoded grid".to_string(),
            ));
        }
        Ok(Coordinate {
            y_first,
            y_step,
            x_first,
            x_step,
            length,
            width,
        })
    }

    pub fn from_attributes(attrs: &RasterAttributes) -> StackResult<Coordinate> {
        Coordinate::new(
            attrs.float("Y_FIRST")?,
            attrs.float("Y_STEP")?,
            attrs.float("X_FIRST")?,
            attrs.float("X_STEP")?,
            attrs.length()?,
            attrs.width()?,
        )
    }

    pub fn size(&self) -> (usize, usize) {
        (self.length, self.width)
    }

    /// Geographic box to image box: floor for the upper-left corner, ceil
    /// for the lower-right, clamped at zero. `Y_STEP` is negative for
    /// north-up grids, so north maps to the smaller row index. Corners are
    /// snapped before rounding so affine round trips do not drift by a pixel.
    pub fn geo_to_image(&self, geo: &GeoBox) -> PixelBox {
        const SNAP: f64 = 1e-6;
        let x0 = ((geo.west - self.x_first) / self.x_step + SNAP).floor() as i64;
        let y0 = ((geo.north - self.y_first) / self.y_step + SNAP).floor() as i64;
        let x1 = ((geo.east - self.x_first) / self.x_step - SNAP).ceil() as i64;
        let y1 = ((geo.south - self.y_first) / self.y_step - SNAP).ceil() as i64;
        PixelBox::new(
            x0.max(0) as usize,
            y0.max(0) as usize,
            x1.max(0) as usize,
            y1.max(0) as usize,
        )
    }

    /// Image box corners back to geographic coordinates
    pub fn image_to_geo(&self, pix: &PixelBox) -> GeoBox {
        GeoBox {
            west: self.x_first + pix.x0 as f64 * self.x_step,
            north: self.y_first + pix.y0 as f64 * self.y_step,
            east: self.x_first + pix.x1 as f64 * self.x_step,
            south: self.y_first + pix.y1 as f64 * self.y_step,
        }
    }

    /// Intersect a box with the grid coverage; an empty intersection is an
    /// error carrying the offending box.
    pub fn clip_to_coverage(&self, pix: &PixelBox) -> StackResult<PixelBox> {
        let clipped = PixelBox::new(
            pix.x0.min(self.width),
            pix.y0.min(self.length),
            pix.x1.min(self.width),
            pix.y1.min(self.length),
        );
        if clipped.x0 >= clipped.x1 || clipped.y0 >= clipped.y1 {
            return Err(StackError::OutsideCoverage(*pix));
        }
        Ok(clipped)
    }
}

/// Conversion between geographic boxes and data-frame pixel boxes,
/// independent of how the stack was geocoded.
pub trait LookupTable {
    /// Whether the lookup grids themselves live in a geocoded frame
    fn is_geocoded(&self) -> bool;

    /// Geographic box to a pixel box in the data frame
    fn geo_to_image(&self, geo: &GeoBox) -> StackResult<PixelBox>;

    /// Data-frame pixel box to the geographic box it covers
    fn image_to_geo(&self, pix: &PixelBox) -> StackResult<GeoBox>;

    /// Geographic box to a pixel box in the lookup grid's own frame
    fn lookup_window(&self, geo: &GeoBox) -> StackResult<PixelBox>;
}

/// Latitude/longitude grids sampled in the radar frame (ISCE-style).
///
/// The grids are co-registered with the data, so a window in the lookup
/// grid is a window in the data.
#[derive(Debug, Clone)]
pub struct RadarGridLookup {
    latitude: Array2<f64>,
    longitude: Array2<f64>,
}

impl RadarGridLookup {
    pub fn new(latitude: Array2<f64>, longitude: Array2<f64>) -> StackResult<RadarGridLookup> {
        if latitude.dim() != longitude.dim() {
            return Err(StackError::Processing(format!(
                "latitude grid {:?} and longitude grid {:?} differ in shape",
                latitude.dim(),
                longitude.dim()
            )));
        }
        Ok(RadarGridLookup {
            latitude,
            longitude,
        })
    }
}

impl LookupTable for RadarGridLookup {
    fn is_geocoded(&self) -> bool {
        false
    }

    /// Scan the grids for samples inside the geographic box and bound them.
    fn geo_to_image(&self, geo: &GeoBox) -> StackResult<PixelBox> {
        let mut row_min = usize::MAX;
        let mut row_max = 0usize;
        let mut col_min = usize::MAX;
        let mut col_max = 0usize;
        for ((row, col), &lat) in self.latitude.indexed_iter() {
            let lon = self.longitude[(row, col)];
            if lat <= geo.north && lat >= geo.south && lon >= geo.west && lon <= geo.east {
                row_min = row_min.min(row);
                row_max = row_max.max(row);
                col_min = col_min.min(col);
                col_max = col_max.max(col);
            }
        }
        if row_min == usize::MAX {
            return Err(StackError::Processing(format!(
                "geographic box {} has no overlap with the lookup grids",
                geo
            )));
        }
        Ok(PixelBox::new(col_min, row_min, col_max + 1, row_max + 1))
    }

    fn image_to_geo(&self, pix: &PixelBox) -> StackResult<GeoBox> {
        let (length, width) = self.latitude.dim();
        let y1 = pix.y1.min(length);
        let x1 = pix.x1.min(width);
        if pix.y0 >= y1 || pix.x0 >= x1 {
            return Err(StackError::OutsideCoverage(*pix));
        }
        let lat = self.latitude.slice(s![pix.y0..y1, pix.x0..x1]);
        let lon = self.longitude.slice(s![pix.y0..y1, pix.x0..x1]);
        let mut geo = GeoBox {
            west: f64::INFINITY,
            north: f64::NEG_INFINITY,
            east: f64::NEG_INFINITY,
            south: f64::INFINITY,
        };
        for (&la, &lo) in lat.iter().zip(lon.iter()) {
            if la.is_finite() && lo.is_finite() {
                geo.north = geo.north.max(la);
                geo.south = geo.south.min(la);
                geo.east = geo.east.max(lo);
                geo.west = geo.west.min(lo);
            }
        }
        if !geo.north.is_finite() {
            return Err(StackError::Processing(format!(
                "no valid lookup samples inside pixel box {}",
                pix
            )));
        }
        Ok(geo)
    }

    fn lookup_window(&self, geo: &GeoBox) -> StackResult<PixelBox> {
        // same frame as the data
        self.geo_to_image(geo)
    }
}

/// Azimuth/range coordinate grids sampled in a geocoded frame
/// (GAMMA/ROI_PAC-style). Grid values are radar pixel coordinates; the
/// grid's own placement comes from its affine transform.
#[derive(Debug, Clone)]
pub struct GeoGridLookup {
    azimuth_coord: Array2<f64>,
    range_coord: Array2<f64>,
    transform: Coordinate,
}

impl GeoGridLookup {
    pub fn new(
        azimuth_coord: Array2<f64>,
        range_coord: Array2<f64>,
        transform: Coordinate,
    ) -> StackResult<GeoGridLookup> {
        if azimuth_coord.dim() != range_coord.dim() {
            return Err(StackError::Processing(format!(
                "azimuth grid {:?} and range grid {:?} differ in shape",
                azimuth_coord.dim(),
                range_coord.dim()
            )));
        }
        if azimuth_coord.dim() != (transform.length, transform.width) {
            return Err(StackError::Processing(format!(
                "lookup grids {:?} do not match their transform ({} x {})",
                azimuth_coord.dim(),
                transform.length,
                transform.width
            )));
        }
        Ok(GeoGridLookup {
            azimuth_coord,
            range_coord,
            transform,
        })
    }
}

impl LookupTable for GeoGridLookup {
    fn is_geocoded(&self) -> bool {
        true
    }

    /// Window the grids through their own affine, then bound the radar
    /// coordinates found in the window. Zero and non-finite samples mark
    /// pixels without a radar counterpart and are ignored.
    fn geo_to_image(&self, geo: &GeoBox) -> StackResult<PixelBox> {
        let window = self.transform.clip_to_coverage(&self.transform.geo_to_image(geo))?;
        let az = self
            .azimuth_coord
            .slice(s![window.y0..window.y1, window.x0..window.x1]);
        let rg = self
            .range_coord
            .slice(s![window.y0..window.y1, window.x0..window.x1]);

        let mut az_min = f64::INFINITY;
        let mut az_max = f64::NEG_INFINITY;
        let mut rg_min = f64::INFINITY;
        let mut rg_max = f64::NEG_INFINITY;
        for (&a, &r) in az.iter().zip(rg.iter()) {
            if a.is_finite() && r.is_finite() && a > 0.0 && r > 0.0 {
                az_min = az_min.min(a);
                az_max = az_max.max(a);
                rg_min = rg_min.min(r);
                rg_max = rg_max.max(r);
            }
        }
        if !az_min.is_finite() {
            return Err(StackError::Processing(format!(
                "no valid radar coordinates inside geographic box {}",
                geo
            )));
        }
        Ok(PixelBox::new(
            rg_min.floor() as usize,
            az_min.floor() as usize,
            rg_max.ceil() as usize,
            az_max.ceil() as usize,
        ))
    }

    /// Scan for grid cells whose radar coordinates fall inside the box and
    /// bound them in the grid's own frame, then convert through the affine.
    fn image_to_geo(&self, pix: &PixelBox) -> StackResult<GeoBox> {
        let mut row_min = usize::MAX;
        let mut row_max = 0usize;
        let mut col_min = usize::MAX;
        let mut col_max = 0usize;
        for ((row, col), &az) in self.azimuth_coord.indexed_iter() {
            let rg = self.range_coord[(row, col)];
            if az >= pix.y0 as f64
                && az < pix.y1 as f64
                && rg >= pix.x0 as f64
                && rg < pix.x1 as f64
            {
                row_min = row_min.min(row);
                row_max = row_max.max(row);
                col_min = col_min.min(col);
                col_max = col_max.max(col);
            }
        }
        if row_min == usize::MAX {
            return Err(StackError::Processing(format!(
                "pixel box {} maps to no cell of the geocoded lookup grids",
                pix
            )));
        }
        let grid_box = PixelBox::new(col_min, row_min, col_max + 1, row_max + 1);
        Ok(self.transform.image_to_geo(&grid_box))
    }

    fn lookup_window(&self, geo: &GeoBox) -> StackResult<PixelBox> {
        self.transform.clip_to_coverage(&self.transform.geo_to_image(geo))
    }
}

/// Box of the lookup grids that covers a data-frame box, for windowed reads
/// of geocoded lookup files.
pub fn box_for_lookup(lookup: &dyn LookupTable, data_box: &PixelBox) -> StackResult<PixelBox> {
    let geo = lookup.image_to_geo(data_box)?;
    lookup.lookup_window(&geo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn transform() -> Coordinate {
        // north-up grid over 43.2..42.2 N, 125.0..126.0 E
        Coordinate::new(43.2, -0.01, 125.0, 0.01, 100, 100).unwrap()
    }

    #[test]
    fn test_geo_to_image_floor_ceil() {
        let coord = transform();
        let geo = GeoBox {
            west: 125.104,
            north: 43.096,
            east: 125.204,
            south: 42.996,
        };
        let pix = coord.geo_to_image(&geo);
        assert_eq!(pix, PixelBox::new(10, 10, 21, 21));
    }

    #[test]
    fn test_image_to_geo_round_trip() {
        let coord = transform();
        let pix = PixelBox::new(10, 20, 30, 40);
        let geo = coord.image_to_geo(&pix);
        assert_abs_diff_eq!(geo.west, 125.1, epsilon = 1e-9);
        assert_abs_diff_eq!(geo.north, 43.0, epsilon = 1e-9);
        let back = coord.geo_to_image(&geo);
        assert_eq!(back, pix);
    }

    #[test]
    fn test_clip_to_coverage() {
        let coord = transform();
        let clipped = coord.clip_to_coverage(&PixelBox::new(90, 90, 150, 150)).unwrap();
        assert_eq!(clipped, PixelBox::new(90, 90, 100, 100));

        let outside = coord.clip_to_coverage(&PixelBox::new(120, 0, 150, 50));
        assert!(matches!(outside, Err(StackError::OutsideCoverage(_))));
    }

    #[test]
    fn test_degenerate_step_rejected() {
        assert!(Coordinate::new(43.2, 0.0, 125.0, 0.01, 100, 100).is_err());
    }

    fn radar_lookup() -> RadarGridLookup {
        // latitude falls along rows, longitude grows along columns
        let latitude = Array2::from_shape_fn((50, 40), |(r, _)| 43.0 - r as f64 * 0.01);
        let longitude = Array2::from_shape_fn((50, 40), |(_, c)| 125.0 + c as f64 * 0.01);
        RadarGridLookup::new(latitude, longitude).unwrap()
    }

    #[test]
    fn test_radar_lookup_bounds_samples() {
        let lookup = radar_lookup();
        // edges sit between grid samples so the bounds are unambiguous
        let geo = GeoBox {
            west: 125.095,
            north: 42.905,
            east: 125.205,
            south: 42.795,
        };
        let pix = lookup.geo_to_image(&geo).unwrap();
        assert_eq!(pix, PixelBox::new(10, 10, 21, 21));

        let disjoint = GeoBox {
            west: 10.0,
            north: 1.0,
            east: 11.0,
            south: 0.0,
        };
        assert!(lookup.geo_to_image(&disjoint).is_err());
    }

    #[test]
    fn test_radar_lookup_image_to_geo() {
        let lookup = radar_lookup();
        let geo = lookup.image_to_geo(&PixelBox::new(10, 10, 21, 21)).unwrap();
        assert_abs_diff_eq!(geo.north, 42.90, epsilon = 1e-9);
        assert_abs_diff_eq!(geo.south, 42.80, epsilon = 1e-9);
        assert_abs_diff_eq!(geo.west, 125.10, epsilon = 1e-9);
        assert_abs_diff_eq!(geo.east, 125.20, epsilon = 1e-9);
    }

    fn geo_lookup() -> GeoGridLookup {
        // radar row tracks the grid row, radar column tracks the grid column
        let azimuth = Array2::from_shape_fn((100, 100), |(r, _)| 1.0 + r as f64 * 2.0);
        let range = Array2::from_shape_fn((100, 100), |(_, c)| 1.0 + c as f64 * 3.0);
        GeoGridLookup::new(azimuth, range, transform()).unwrap()
    }

    #[test]
    fn test_geo_lookup_windows_through_affine() {
        let lookup = geo_lookup();
        assert!(lookup.is_geocoded());
        let geo = GeoBox {
            west: 125.10,
            north: 43.10,
            east: 125.20,
            south: 43.00,
        };
        let pix = lookup.geo_to_image(&geo).unwrap();
        // grid window rows 10..20, cols 10..20 holds az 21..=39, rg 31..=58
        assert_eq!(pix, PixelBox::new(31, 21, 58, 39));
    }

    #[test]
    fn test_box_for_lookup_round_trip() {
        let lookup = geo_lookup();
        let data_box = PixelBox::new(31, 21, 61, 41);
        let window = box_for_lookup(&lookup, &data_box).unwrap();
        assert_eq!(window, PixelBox::new(10, 10, 20, 20));
    }
}
