//! Georeferenced multi-band rasters
//!
//! A [`Raster`] owns an ordered list of equally sized [`Band`]s and the
//! affine [`Georeference`] they share. Every band added to a raster receives
//! a snapshot of the raster's georeference, refreshed whenever the raster's
//! geotransform or SRID changes, which offline bands consult when loading
//! their external pixels.
//!
//! # Example
//!
//! ```
//! use georaster::{PixelType, Raster};
//!
//! let mut raster = Raster::new(3, 2)?;
//! raster.set_scale(10.0, -10.0);
//! raster.set_offsets(500.0, 1000.0);
//! raster.set_srid(32632);
//!
//! let index = raster.generate_new_band(PixelType::UInt8, 1.0, true, 0.0, 0)?;
//! assert_eq!(index, 0);
//! assert_eq!(raster.cell_to_geopoint(1.0, 1.0), (510.0, 990.0));
//! # Ok::<(), georaster::Error>(())
//! ```

mod alignment;
mod geometry;
mod geotransform;
mod summary;

pub use geometry::{Envelope, SridGeometry};
pub use geotransform::{
    clamp_srid, GeoTransform, GeoTransformEx, Georeference, PhysicalParams, DEFAULT_GEOTRANSFORM,
    SRID_UNKNOWN,
};
pub use summary::{BandSummary, RasterSummary};

use crate::band::Band;
use crate::error::{Error, Result};
use crate::types::{flt_eq, PixelType};

/// Largest width or height a raster can have
pub const MAX_DIMENSION: usize = u16::MAX as usize;

/// A grid of bands placed in a coordinate system
#[derive(Debug)]
pub struct Raster<'a> {
    width: u16,
    height: u16,
    georef: Georeference,
    bands: Vec<Band<'a>>,
    size: u32,
    version: u16,
}

impl<'a> Raster<'a> {
    /// Creates a band-less raster on the default north-up unit grid with an
    /// unknown SRID
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(Error::invalid(format!(
                "Raster dimensions {}x{} exceed the maximum of {}",
                width, height, MAX_DIMENSION
            )));
        }
        Ok(Self::empty(width as u16, height as u16, Georeference::default()))
    }

    pub(crate) fn empty(width: u16, height: u16, georef: Georeference) -> Self {
        Self {
            width,
            height,
            georef,
            bands: Vec::new(),
            size: 0,
            version: 0,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn georeference(&self) -> &Georeference {
        &self.georef
    }

    pub fn srid(&self) -> i32 {
        self.georef.srid
    }

    pub fn geotransform(&self) -> GeoTransform {
        self.georef.geotransform
    }

    /// Byte length recorded by the last storage serialization
    pub fn stored_size(&self) -> u32 {
        self.size
    }

    /// Format version recorded by the last storage serialization
    pub fn version(&self) -> u16 {
        self.version
    }

    pub(crate) fn set_stored_header(&mut self, size: u32, version: u16) {
        self.size = size;
        self.version = version;
    }

    /// Sets the SRID, folding out-of-range ids into the accepted range
    pub fn set_srid(&mut self, srid: i32) {
        self.georef.srid = clamp_srid(srid);
        self.georef_changed();
    }

    pub fn set_scale(&mut self, scale_x: f64, scale_y: f64) {
        self.georef.geotransform[1] = scale_x;
        self.georef.geotransform[5] = scale_y;
        self.georef_changed();
    }

    pub fn set_skews(&mut self, skew_x: f64, skew_y: f64) {
        self.georef.geotransform[2] = skew_x;
        self.georef.geotransform[4] = skew_y;
        self.georef_changed();
    }

    /// Sets the world coordinates of the upper-left corner
    pub fn set_offsets(&mut self, x: f64, y: f64) {
        self.georef.geotransform[0] = x;
        self.georef.geotransform[3] = y;
        self.georef_changed();
    }

    pub fn set_geotransform(&mut self, gt: GeoTransform) {
        self.georef.geotransform = gt;
        self.georef_changed();
    }

    /// Physical description of the current scale and skew coefficients
    pub fn physical_params(&self) -> PhysicalParams {
        let gt = &self.georef.geotransform;
        Self::calc_physical_params(gt[1], gt[2], gt[4], gt[5])
    }

    /// Replaces scale and skew from a physical description. Collinear
    /// basis vectors are rejected and leave the raster unchanged.
    pub fn set_physical_params(&mut self, params: &PhysicalParams) -> Result<()> {
        let (scale_x, skew_x, skew_y, scale_y) = Self::calc_geotransform_coefficients(params)?;
        self.georef.geotransform[1] = scale_x;
        self.georef.geotransform[2] = skew_x;
        self.georef.geotransform[4] = skew_y;
        self.georef.geotransform[5] = scale_y;
        self.georef_changed();
        Ok(())
    }

    pub fn calc_physical_params(scale_x: f64, skew_x: f64, skew_y: f64, scale_y: f64) -> PhysicalParams {
        PhysicalParams::from_coefficients(scale_x, skew_x, skew_y, scale_y)
    }

    /// Returns `(scale_x, skew_x, skew_y, scale_y)`
    pub fn calc_geotransform_coefficients(params: &PhysicalParams) -> Result<(f64, f64, f64, f64)> {
        params.to_coefficients()
    }

    fn georef_changed(&mut self) {
        if self.bands.iter().any(Band::is_offline) {
            log::warn!("Changes made to raster geotransform matrix may affect out-db band data");
        }
        let georef = self.georef;
        for band in &mut self.bands {
            band.attach(georef);
        }
    }

    pub fn cell_to_geopoint(&self, col: f64, row: f64) -> (f64, f64) {
        self.georef.cell_to_geopoint(col, row)
    }

    /// Cell containing a world coordinate
    pub fn geopoint_to_cell(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        self.georef.geopoint_to_cell(x, y)
    }

    /// Inverse of the current geotransform, computed on every call
    pub fn inverse_geotransform(&self) -> Result<GeoTransform> {
        self.georef.inverse()
    }

    pub fn num_bands(&self) -> usize {
        self.bands.len()
    }

    pub fn has_band(&self, index: usize) -> bool {
        index < self.bands.len()
    }

    pub fn band(&self, index: usize) -> Option<&Band<'a>> {
        self.bands.get(index)
    }

    pub fn band_mut(&mut self, index: usize) -> Option<&mut Band<'a>> {
        self.bands.get_mut(index)
    }

    pub fn bands(&self) -> &[Band<'a>] {
        &self.bands
    }

    fn check_band_dimensions(&self, band: &Band<'_>) -> Result<()> {
        if band.width() != self.width || band.height() != self.height {
            return Err(Error::invalid(format!(
                "Can't add a {}x{} band to a {}x{} raster",
                band.width(),
                band.height(),
                self.width,
                self.height
            )));
        }
        Ok(())
    }

    /// Inserts a band before `index`, clamped to the band count, and
    /// returns the index it landed at
    pub fn add_band(&mut self, mut band: Band<'a>, index: usize) -> Result<usize> {
        self.check_band_dimensions(&band)?;
        if self.bands.len() >= u16::MAX as usize {
            return Err(Error::invalid("Raster already holds the maximum number of bands"));
        }

        let index = index.min(self.bands.len());
        band.attach(self.georef);
        self.bands.insert(index, band);
        log::debug!("Added band at index {} of {}", index, self.bands.len());
        Ok(index)
    }

    /// Creates an owned band filled with `initial` and inserts it at `index`
    pub fn generate_new_band(
        &mut self,
        pixtype: PixelType,
        initial: f64,
        has_nodata: bool,
        nodata: f64,
        index: usize,
    ) -> Result<usize> {
        let mut band = Band::new_owned(self.width, self.height, pixtype, has_nodata.then_some(nodata));

        let value = pixtype.clamp(initial);
        pixtype.report_conversion(initial, value);
        band.fill(value)?;
        if has_nodata && flt_eq(initial, nodata) {
            band.set_is_nodata(true)?;
        }
        self.add_band(band, index)
    }

    /// Swaps in `band` at `index` and hands back the band it replaced
    pub fn replace_band(&mut self, mut band: Band<'a>, index: usize) -> Result<Band<'a>> {
        if !self.has_band(index) {
            return Err(Error::out_of_range(format!(
                "Band index {} outside raster with {} bands",
                index,
                self.bands.len()
            )));
        }
        self.check_band_dimensions(&band)?;

        band.attach(self.georef);
        let mut old = std::mem::replace(&mut self.bands[index], band);
        old.detach();
        Ok(old)
    }

    /// Removes and returns the band at `index`
    pub fn remove_band(&mut self, index: usize) -> Result<Band<'a>> {
        if !self.has_band(index) {
            return Err(Error::out_of_range(format!(
                "Band index {} outside raster with {} bands",
                index,
                self.bands.len()
            )));
        }
        let mut band = self.bands.remove(index);
        band.detach();
        Ok(band)
    }

    /// Duplicates band `from_index` of `from` into this raster before
    /// `to_index`. Out-of-range indices are clamped with a warning.
    pub fn copy_band(&mut self, from: &Raster<'_>, from_index: usize, to_index: usize) -> Result<usize> {
        if from.width != self.width || from.height != self.height {
            return Err(Error::invalid(
                "Attempting to add a band with different width or height",
            ));
        }
        if from.bands.is_empty() {
            return Err(Error::invalid("Source raster has no band"));
        }

        let last = from.bands.len() - 1;
        let from_index = if from_index > last {
            log::warn!("Invalid band index {} for source raster, using {}", from_index, last);
            last
        } else {
            from_index
        };
        let to_index = if to_index > self.bands.len() {
            log::warn!(
                "Invalid band index {} for destination raster, using {}",
                to_index,
                self.bands.len()
            );
            self.bands.len()
        } else {
            to_index
        };

        let band = from.bands[from_index].duplicate()?;
        self.add_band(band, to_index)
    }

    /// New raster with the same grid and copies of the listed bands, in
    /// the listed order
    pub fn from_band(&self, indices: &[usize]) -> Result<Raster<'static>> {
        let mut raster = Raster::empty(self.width, self.height, self.georef);
        for &index in indices {
            let band = self.bands.get(index).ok_or_else(|| {
                Error::out_of_range(format!(
                    "Band index {} outside raster with {} bands",
                    index,
                    self.bands.len()
                ))
            })?;
            let at = raster.bands.len();
            raster.add_band(band.duplicate()?, at)?;
        }
        Ok(raster)
    }

    /// Copies the grid and SRID. With `deep` every band is duplicated too.
    pub fn duplicate(&self, deep: bool) -> Result<Raster<'static>> {
        if !deep {
            return Ok(Raster::empty(self.width, self.height, self.georef));
        }
        let indices: Vec<usize> = (0..self.bands.len()).collect();
        self.from_band(&indices)
    }

    /// Serializable description of the raster and its bands
    pub fn summary(&self) -> RasterSummary {
        RasterSummary::of(self)
    }
}
