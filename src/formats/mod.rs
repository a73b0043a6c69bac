//! Byte encodings of rasters
//!
//! - [`serialize`]: the padded storage form, host byte order, aligned for
//!   direct embedding in a record
//! - [`wkb`]: the packed well-known-binary form with an endianness byte,
//!   plus its uppercase hex text
//! - [`tiff`]: GeoTIFF reading for offline band sources
//!
//! Both raster encodings share one header layout after their leading fields
//! and one band type byte.

pub mod serialize;
pub mod tiff;
pub mod wkb;

use bitflags::bitflags;

use crate::band::Band;
use crate::error::Result;
use crate::io::{ByteCursor, ByteWriter};
use crate::raster::{Georeference, GeoTransform};
use crate::types::PixelType;

/// Mask selecting the pixel type ordinal in a band type byte
pub const PIXTYPE_MASK: u8 = 0x0F;

bitflags! {
    /// Flags stored in the high bits of a band type byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BandFlags: u8 {
        /// Pixels live in an external file
        const OFFLINE = 0x80;
        const HAS_NODATA = 0x40;
        /// Every pixel is NODATA
        const IS_NODATA = 0x20;
    }
}

/// Builds the type byte of `band`. `offline` is false when an offline band
/// is written with its pixels inline.
pub(crate) fn band_type_byte(band: &Band<'_>, offline: bool) -> u8 {
    let mut flags = BandFlags::empty();
    flags.set(BandFlags::OFFLINE, offline);
    flags.set(BandFlags::HAS_NODATA, band.has_nodata());
    flags.set(BandFlags::IS_NODATA, band.is_nodata());
    band.pixel_type().ordinal() | flags.bits()
}

/// Splits a band type byte; unknown ordinals are malformed data
pub(crate) fn parse_band_type_byte(byte: u8) -> Result<(PixelType, BandFlags)> {
    let pixtype = PixelType::from_ordinal(byte & PIXTYPE_MASK)?;
    Ok((pixtype, BandFlags::from_bits_truncate(byte)))
}

/// Grid fields shared by both headers, in stored order
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GridHeader {
    pub geotransform: GeoTransform,
    pub srid: i32,
    pub width: u16,
    pub height: u16,
}

impl GridHeader {
    pub fn new(georef: &Georeference, width: u16, height: u16) -> Self {
        Self {
            geotransform: georef.geotransform,
            srid: georef.srid,
            width,
            height,
        }
    }

    pub fn write(&self, w: &mut ByteWriter) {
        let gt = &self.geotransform;
        // scaleX, scaleY, ipX, ipY, skewX, skewY
        for value in [gt[1], gt[5], gt[0], gt[3], gt[2], gt[4]] {
            w.write_f64(value);
        }
        w.write_i32(self.srid);
        w.write_u16(self.width);
        w.write_u16(self.height);
    }

    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let scale_x = cursor.read_f64()?;
        let scale_y = cursor.read_f64()?;
        let ip_x = cursor.read_f64()?;
        let ip_y = cursor.read_f64()?;
        let skew_x = cursor.read_f64()?;
        let skew_y = cursor.read_f64()?;
        Ok(Self {
            geotransform: [ip_x, scale_x, skew_x, ip_y, skew_y, scale_y],
            srid: cursor.read_i32()?,
            width: cursor.read_u16()?,
            height: cursor.read_u16()?,
        })
    }
}

/// Reads a stored NODATA value, masking sub-byte types to their bit width
pub(crate) fn read_nodata(cursor: &mut ByteCursor<'_>, pixtype: PixelType) -> Result<f64> {
    let value = cursor.read_pixel(pixtype)?;
    Ok(match pixtype.sub_byte_mask() {
        Some(mask) => f64::from(value as u8 & mask),
        None => value,
    })
}
