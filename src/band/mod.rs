//! Raster bands
//!
//! A [`Band`] is one channel of a raster: a `width * height` grid of pixels
//! of a single [`PixelType`] plus NODATA bookkeeping. Pixel storage is one
//! of four kinds (see [`BandData`]); only [`BandData::Owned`] reports
//! ownership of its bytes.
//!
//! # Example
//!
//! ```
//! use georaster::{Band, PixelType};
//!
//! let mut band = Band::new_owned(2, 2, PixelType::UInt8, Some(255.0));
//! band.set_pixel(0, 0, 7.0)?;
//! assert_eq!(band.get_pixel(0, 0)?, (7.0, false));
//! assert_eq!(band.get_pixel(1, 1)?, (0.0, false));
//! # Ok::<(), georaster::Error>(())
//! ```

mod offline;
mod search;

use std::cell::OnceCell;

use crate::error::{Error, Result};
use crate::raster::Georeference;
use crate::types::{flt_eq, PixelType, FLT_TOLERANCE};

pub use search::PixelHit;

/// Result of comparing a value against a band's NODATA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodataMatch {
    /// The band has no NODATA, or the clamped values differ
    No,
    /// Clamped value equals clamped NODATA but the raw values differ
    Clamped,
    /// Raw value equals NODATA within float tolerance
    Exact,
}

/// External pixel source of an offline band
#[derive(Debug)]
pub struct OfflineData {
    band_index: u8,
    path: String,
    cache: OnceCell<Vec<u8>>,
}

impl OfflineData {
    fn new(band_index: u8, path: String) -> Self {
        Self {
            band_index,
            path,
            cache: OnceCell::new(),
        }
    }

    /// 0-based band index inside the external file
    pub fn band_index(&self) -> u8 {
        self.band_index
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns true once pixels have been loaded
    pub fn is_loaded(&self) -> bool {
        self.cache.get().is_some()
    }
}

/// Pixel storage of a band
#[derive(Debug)]
pub enum BandData<'a> {
    /// Buffer allocated and released by the band
    Owned(Vec<u8>),
    /// Caller memory the band reads and writes but never releases
    Borrowed(&'a mut [u8]),
    /// Read-only view into a serialized buffer; copied on first write
    Aliased(&'a [u8]),
    /// Pixels live in an external file and are cached on first access
    Offline(OfflineData),
}

/// One raster channel
#[derive(Debug)]
pub struct Band<'a> {
    pixtype: PixelType,
    width: u16,
    height: u16,
    has_nodata: bool,
    is_nodata: bool,
    nodata: f64,
    data: BandData<'a>,
    georef: Option<Georeference>,
}

impl Band<'static> {
    /// Creates a band owning a zero-filled buffer
    pub fn new_owned(width: u16, height: u16, pixtype: PixelType, nodata: Option<f64>) -> Self {
        let len = width as usize * height as usize * pixtype.size();
        Self::with_data(width, height, pixtype, nodata, BandData::Owned(vec![0u8; len]))
    }

    /// Creates a band taking ownership of host-order pixel bytes
    pub fn from_vec(
        width: u16,
        height: u16,
        pixtype: PixelType,
        nodata: Option<f64>,
        data: Vec<u8>,
    ) -> Result<Self> {
        check_buffer_len(width, height, pixtype, data.len())?;
        Ok(Self::with_data(width, height, pixtype, nodata, BandData::Owned(data)))
    }

    /// Creates a band whose pixels come from band `band_index` of the file at `path`
    pub fn new_offline(
        width: u16,
        height: u16,
        pixtype: PixelType,
        nodata: Option<f64>,
        band_index: u8,
        path: impl Into<String>,
    ) -> Self {
        let offline = OfflineData::new(band_index, path.into());
        Self::with_data(width, height, pixtype, nodata, BandData::Offline(offline))
    }
}

impl<'a> Band<'a> {
    /// Creates a band over caller memory. The buffer must hold at least
    /// `width * height * pixtype.size()` host-order bytes.
    pub fn from_buffer(
        width: u16,
        height: u16,
        pixtype: PixelType,
        nodata: Option<f64>,
        buffer: &'a mut [u8],
    ) -> Result<Self> {
        check_buffer_len(width, height, pixtype, buffer.len())?;
        Ok(Self::with_data(width, height, pixtype, nodata, BandData::Borrowed(buffer)))
    }

    /// Creates a read-only view over serialized bytes
    pub fn from_slice(
        width: u16,
        height: u16,
        pixtype: PixelType,
        nodata: Option<f64>,
        bytes: &'a [u8],
    ) -> Result<Self> {
        check_buffer_len(width, height, pixtype, bytes.len())?;
        Ok(Self::with_data(width, height, pixtype, nodata, BandData::Aliased(bytes)))
    }

    fn with_data(
        width: u16,
        height: u16,
        pixtype: PixelType,
        nodata: Option<f64>,
        data: BandData<'a>,
    ) -> Self {
        let mut band = Self {
            pixtype,
            width,
            height,
            has_nodata: false,
            is_nodata: false,
            nodata: 0.0,
            data,
            georef: None,
        };
        if let Some(value) = nodata {
            band.set_nodata(value);
        }
        band
    }

    /// Deep copy with freshly allocated pixel data. Offline bands copy
    /// their path and index but not the loaded cache.
    pub fn duplicate(&self) -> Result<Band<'static>> {
        let nodata = self.has_nodata.then_some(self.nodata);
        let data = match &self.data {
            BandData::Offline(offline) => BandData::Offline(OfflineData::new(offline.band_index, offline.path.clone())),
            _ => BandData::Owned(self.data()?.to_vec()),
        };
        let mut copy = Band::with_data(self.width, self.height, self.pixtype, nodata, data);
        copy.is_nodata = self.is_nodata;
        Ok(copy)
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixtype
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Byte length of the pixel stream
    pub fn data_len(&self) -> usize {
        self.pixel_count() * self.pixtype.size()
    }

    pub fn is_offline(&self) -> bool {
        matches!(self.data, BandData::Offline(_))
    }

    /// True only when the band allocated its pixel buffer itself
    pub fn owns_data(&self) -> bool {
        matches!(self.data, BandData::Owned(_))
    }

    pub fn storage(&self) -> &BandData<'a> {
        &self.data
    }

    /// Path of the external file, `None` for inline bands
    pub fn offline_path(&self) -> Option<&str> {
        match &self.data {
            BandData::Offline(offline) => Some(offline.path()),
            _ => None,
        }
    }

    /// Band index inside the external file
    pub fn offline_band_index(&self) -> Result<u8> {
        match &self.data {
            BandData::Offline(offline) => Ok(offline.band_index()),
            _ => Err(Error::invalid("Band is not offline")),
        }
    }

    /// Grid placement of the owning raster, if the band is attached to one
    pub fn georeference(&self) -> Option<&Georeference> {
        self.georef.as_ref()
    }

    pub(crate) fn attach(&mut self, georef: Georeference) {
        self.georef = Some(georef);
    }

    pub(crate) fn detach(&mut self) {
        self.georef = None;
    }

    pub fn has_nodata(&self) -> bool {
        self.has_nodata
    }

    /// Setting to false also clears the cached all-NODATA flag
    pub fn set_has_nodata(&mut self, flag: bool) {
        self.has_nodata = flag;
        if !flag {
            self.is_nodata = false;
        }
    }

    /// Cached "every pixel is NODATA" flag; always false without NODATA
    pub fn is_nodata(&self) -> bool {
        self.has_nodata && self.is_nodata
    }

    pub fn set_is_nodata(&mut self, flag: bool) -> Result<()> {
        if flag && !self.has_nodata {
            return Err(Error::invalid("Cannot set isnodata flag as band has no NODATA"));
        }
        self.is_nodata = flag;
        Ok(())
    }

    /// The NODATA value, an error when the band has none
    pub fn nodata(&self) -> Result<f64> {
        if !self.has_nodata {
            return Err(Error::invalid("Band has no NODATA value"));
        }
        Ok(self.nodata)
    }

    /// Stored NODATA value regardless of the has-NODATA flag
    pub(crate) fn raw_nodata(&self) -> f64 {
        self.nodata
    }

    pub(crate) fn restore_nodata(&mut self, has_nodata: bool, value: f64, is_nodata: bool) {
        self.has_nodata = has_nodata;
        self.nodata = value;
        self.is_nodata = has_nodata && is_nodata;
    }

    /// Clamps and stores a NODATA value, enabling NODATA on the band.
    /// Returns true when the stored value differs from the requested one.
    pub fn set_nodata(&mut self, value: f64) -> bool {
        self.nodata = self.pixtype.clamp(value);
        self.has_nodata = true;
        self.is_nodata = false;
        self.pixtype.report_conversion(value, self.nodata)
    }

    pub fn min_value(&self) -> f64 {
        self.pixtype.min_value()
    }

    /// Compares a value against NODATA, first raw and then clamped
    pub fn clamped_value_is_nodata(&self, value: f64) -> NodataMatch {
        if !self.has_nodata {
            NodataMatch::No
        } else if flt_eq(value, self.nodata) {
            NodataMatch::Exact
        } else if self.pixtype.clamped_equal(value, self.nodata) {
            NodataMatch::Clamped
        } else {
            NodataMatch::No
        }
    }

    /// Moves a value whose clamped form collides with NODATA to the
    /// adjacent representable value. Returns the value to store and
    /// whether it was changed.
    pub fn corrected_clamped_value(&self, value: f64) -> (f64, bool) {
        if self.clamped_value_is_nodata(value) != NodataMatch::Clamped {
            return (value, false);
        }

        let pt = self.pixtype;
        let clamped = pt.clamp(value);
        let at_floor = pt.clamped_equal(clamped, pt.min_value());
        let corrected = match pt {
            PixelType::Bool1 => {
                if self.nodata != 0.0 {
                    0.0
                } else {
                    1.0
                }
            }
            PixelType::Float32 => {
                let step = (clamped.abs() * FLT_TOLERANCE * 2.0).max(FLT_TOLERANCE * 2.0);
                if at_floor {
                    clamped + step
                } else {
                    clamped - step
                }
            }
            PixelType::Float64 => return (value, false),
            _ => {
                if at_floor {
                    clamped + 1.0
                } else {
                    clamped - 1.0
                }
            }
        };
        (corrected, true)
    }

    /// Host-order pixel bytes; offline bands load on first access
    pub fn data(&self) -> Result<&[u8]> {
        match &self.data {
            BandData::Owned(bytes) => Ok(&bytes[..]),
            BandData::Borrowed(bytes) => Ok(&bytes[..]),
            BandData::Aliased(bytes) => Ok(bytes),
            BandData::Offline(offline) => self.offline_cache(offline),
        }
    }

    fn inline_data_mut(&mut self) -> Option<&mut [u8]> {
        if let BandData::Aliased(bytes) = self.data {
            self.data = BandData::Owned(bytes.to_vec());
        }
        match &mut self.data {
            BandData::Owned(bytes) => Some(&mut bytes[..]),
            BandData::Borrowed(bytes) => Some(&mut bytes[..]),
            BandData::Aliased(_) | BandData::Offline(_) => None,
        }
    }

    fn check_coords(&self, x: usize, y: usize) -> Result<usize> {
        if x >= self.width as usize || y >= self.height as usize {
            return Err(Error::out_of_range(format!(
                "Pixel ({}, {}) outside band extent {}x{}",
                x, y, self.width, self.height
            )));
        }
        Ok(x + y * self.width as usize)
    }

    /// Reads one pixel as `(value, is_nodata)`
    pub fn get_pixel(&self, x: usize, y: usize) -> Result<(f64, bool)> {
        let offset = self.check_coords(x, y)?;

        if self.is_nodata() {
            return Ok((self.nodata, true));
        }

        let size = self.pixtype.size();
        let data = self.data()?;
        let value = self.pixtype.decode(&data[offset * size..]);
        let is_nodata = self.clamped_value_is_nodata(value) != NodataMatch::No;
        Ok((value, is_nodata))
    }

    /// Writes one pixel, clamping to the band's type. Returns true when
    /// the stored value differs from `value`, either because of clamping
    /// or because it was moved off NODATA.
    pub fn set_pixel(&mut self, x: usize, y: usize, value: f64) -> Result<bool> {
        if self.is_offline() {
            return Err(Error::invalid("Cannot set pixel value of an offline band"));
        }
        let offset = self.check_coords(x, y)?;

        let mut value = value;
        let mut converted = false;
        if self.has_nodata && self.pixtype != PixelType::Float64 {
            let (corrected, changed) = self.corrected_clamped_value(value);
            if changed {
                log::debug!(
                    "Value for pixel {} x {} has been corrected as clamped value becomes NODATA",
                    x,
                    y
                );
                value = corrected;
                converted = true;
            }
        }

        let pixtype = self.pixtype;
        let size = pixtype.size();
        let data = self
            .inline_data_mut()
            .ok_or_else(|| Error::invalid("Band data is not writable"))?;
        pixtype.encode(value, &mut data[offset * size..]);
        let stored = pixtype.decode(&data[offset * size..]);

        if self.clamped_value_is_nodata(value) == NodataMatch::No {
            self.is_nodata = false;
        }

        if pixtype.report_conversion(value, stored) {
            converted = true;
        }
        Ok(converted)
    }

    /// Raw pixel bytes for `count` pixels starting at `(x, y)` in the
    /// linear pixel stream. Runs past the end are truncated.
    pub fn get_pixel_line(&self, x: usize, y: usize, count: usize) -> Result<&[u8]> {
        let offset = self.check_coords(x, y)?;
        let available = self.pixel_count() - offset;
        let count = if count > available {
            log::warn!(
                "Truncating pixel line of {} values at ({}, {}) to {}",
                count,
                x,
                y,
                available
            );
            available
        } else {
            count
        };

        let size = self.pixtype.size();
        let data = self.data()?;
        Ok(&data[offset * size..(offset + count) * size])
    }

    /// Copies raw host-order pixel bytes into the linear pixel stream
    pub fn set_pixel_line(&mut self, x: usize, y: usize, values: &[u8]) -> Result<()> {
        if self.is_offline() {
            return Err(Error::Unsupported("Setting a pixel line of an offline band".to_string()));
        }
        let offset = self.check_coords(x, y)?;

        let size = self.pixtype.size();
        if values.len() % size != 0 {
            return Err(Error::invalid(format!(
                "Pixel line of {} bytes is not a whole number of {} values",
                values.len(),
                self.pixtype
            )));
        }
        let count = values.len() / size;
        if count > self.pixel_count() - offset {
            return Err(Error::out_of_range(format!(
                "Pixel line of {} values at ({}, {}) exceeds end of data",
                count, x, y
            )));
        }

        let data = self
            .inline_data_mut()
            .ok_or_else(|| Error::invalid("Band data is not writable"))?;
        data[offset * size..offset * size + values.len()].copy_from_slice(values);

        if self.has_nodata {
            self.is_nodata = false;
        }
        Ok(())
    }

    /// Scans every pixel and refreshes the cached all-NODATA flag
    pub fn is_fully_nodata(&mut self) -> Result<bool> {
        if !self.has_nodata {
            self.is_nodata = false;
            return Ok(false);
        }

        let size = self.pixtype.size();
        let all_nodata = {
            let data = self.data()?;
            data[..self.data_len()]
                .chunks_exact(size)
                .all(|px| self.clamped_value_is_nodata(self.pixtype.decode(px)) != NodataMatch::No)
        };
        self.is_nodata = all_nodata;
        Ok(all_nodata)
    }

    /// Fills every pixel with `value` without NODATA correction
    pub(crate) fn fill(&mut self, value: f64) -> Result<()> {
        let pixtype = self.pixtype;
        let data = self
            .inline_data_mut()
            .ok_or_else(|| Error::invalid("Cannot fill an offline band"))?;
        if flt_eq(value, 0.0) {
            data.fill(0);
        } else {
            let encoded = pixtype.encode_to_vec(value);
            for px in data.chunks_exact_mut(pixtype.size()) {
                px.copy_from_slice(&encoded);
            }
        }
        Ok(())
    }
}

fn check_buffer_len(width: u16, height: u16, pixtype: PixelType, len: usize) -> Result<()> {
    let needed = width as usize * height as usize * pixtype.size();
    if len < needed {
        return Err(Error::invalid(format!(
            "Buffer of {} bytes cannot hold {}x{} {} pixels",
            len, width, height, pixtype
        )));
    }
    Ok(())
}
