//! Well-known-binary raster form
//!
//! Same logical fields as the storage form but packed: a leading
//! endianness byte (0 big, 1 little) and version replace the size field,
//! and there is no padding anywhere. Every multi-byte field, pixels
//! included, uses the declared byte order.

use super::{band_type_byte, parse_band_type_byte, read_nodata, BandFlags, GridHeader};
use crate::band::Band;
use crate::error::{Error, Result};
use crate::io::{ByteCursor, ByteOrder, ByteWriter};
use crate::raster::{clamp_srid, Georeference, Raster};

/// Byte length of the WKB header
pub const WKB_HEADER_SIZE: usize = 61;

/// The only WKB version
pub const WKB_VERSION: u16 = 0;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

impl<'a> Raster<'a> {
    /// Length of the WKB form
    pub fn wkb_size(&self, outasin: bool) -> usize {
        self.bands().iter().fold(WKB_HEADER_SIZE, |size, band| {
            let mut size = size + 1 + band.pixel_type().size();
            size += match band.offline_path() {
                Some(path) if !outasin => 1 + path.len() + 1,
                _ => band.data_len(),
            };
            size
        })
    }

    /// Encodes WKB in host byte order. With `outasin` offline bands are
    /// written with their pixels, loading them if needed.
    pub fn to_wkb(&self, outasin: bool) -> Result<Vec<u8>> {
        self.to_wkb_with_order(outasin, ByteOrder::host())
    }

    pub fn to_wkb_with_order(&self, outasin: bool, order: ByteOrder) -> Result<Vec<u8>> {
        let num_bands = u16::try_from(self.num_bands())
            .map_err(|_| Error::invalid(format!("Too many bands to encode: {}", self.num_bands())))?;

        let size = self.wkb_size(outasin);
        let mut w = ByteWriter::with_capacity(size, order);
        w.write_u8(order.wkb_flag());
        w.write_u16(WKB_VERSION);
        w.write_u16(num_bands);
        GridHeader::new(self.georeference(), self.width(), self.height()).write(&mut w);

        for band in self.bands() {
            let pixtype = band.pixel_type();
            let offline = band.is_offline() && !outasin;

            w.write_u8(band_type_byte(band, offline));
            w.write_pixel(pixtype, band.raw_nodata());
            match band.offline_path() {
                Some(path) if offline => {
                    w.write_u8(band.offline_band_index()?);
                    w.write_cstr(path);
                }
                _ => w.write_pixels(pixtype, &band.data()?[..band.data_len()]),
            }
        }

        debug_assert_eq!(w.len(), size);
        Ok(w.into_inner())
    }

    /// Uppercase hex text of [`to_wkb`](Self::to_wkb)
    pub fn to_hex_wkb(&self, outasin: bool) -> Result<String> {
        Ok(encode_hex(&self.to_wkb(outasin)?))
    }

    /// Decodes WKB in either byte order. Inline bands own copies of their
    /// pixels in host order.
    pub fn from_wkb(bytes: &[u8]) -> Result<Raster<'static>> {
        if bytes.len() < WKB_HEADER_SIZE {
            return Err(Error::malformed(format!(
                "WKB size ({}) < min size ({})",
                bytes.len(),
                WKB_HEADER_SIZE
            )));
        }

        let mut cursor = ByteCursor::new(bytes, ByteOrder::host());
        let order = ByteOrder::from_wkb_flag(cursor.read_u8()?)?;
        cursor.set_order(order);

        let version = cursor.read_u16()?;
        if version != WKB_VERSION {
            return Err(Error::malformed(format!("WKB version {} unsupported", version)));
        }
        let num_bands = cursor.read_u16()?;
        let grid = GridHeader::read(&mut cursor)?;
        let georef = Georeference {
            geotransform: grid.geotransform,
            srid: clamp_srid(grid.srid),
        };

        let mut raster = Raster::empty(grid.width, grid.height, georef);
        for i in 0..num_bands as usize {
            let band = read_band(&mut cursor, grid.width, grid.height).map_err(|e| {
                log::debug!("Error reading WKB form of band {}: {}", i, e);
                e
            })?;
            raster.add_band(band, i)?;
        }

        if !cursor.is_exhausted() {
            log::warn!("{} bytes of WKB remained unparsed", cursor.remaining());
        }
        Ok(raster)
    }

    pub fn from_hex_wkb(hex: &str) -> Result<Raster<'static>> {
        Raster::from_wkb(&decode_hex(hex)?)
    }
}

fn read_band(cursor: &mut ByteCursor<'_>, width: u16, height: u16) -> Result<Band<'static>> {
    let (pixtype, flags) = parse_band_type_byte(cursor.read_u8()?)?;
    let nodata = read_nodata(cursor, pixtype)?;

    let mut band = if flags.contains(BandFlags::OFFLINE) {
        let band_index = cursor.read_u8()?;
        let path = cursor.read_cstr()?;
        Band::new_offline(width, height, pixtype, None, band_index, path)
    } else {
        let count = width as usize * height as usize;
        let data = cursor.read_pixels(pixtype, count)?;
        if pixtype.sub_byte_mask().is_some() {
            let max = pixtype.max_value() as u8;
            if let Some(&bad) = data.iter().find(|&&v| v > max) {
                return Err(Error::malformed(format!(
                    "Invalid value {} for pixel of type {}",
                    bad, pixtype
                )));
            }
        }
        Band::from_vec(width, height, pixtype, None, data)?
    };
    band.restore_nodata(
        flags.contains(BandFlags::HAS_NODATA),
        nodata,
        flags.contains(BandFlags::IS_NODATA),
    );
    Ok(band)
}

/// Renders bytes as uppercase hex nibbles without separators
pub fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(HEX_DIGITS[(b >> 4) as usize] as char);
        out.push(HEX_DIGITS[(b & 0x0F) as usize] as char);
    }
    out
}

/// Parses hex text in either case
pub fn decode_hex(hex: &str) -> Result<Vec<u8>> {
    let digits = hex.as_bytes();
    if digits.len() % 2 != 0 {
        return Err(Error::malformed(
            "Raster HEXWKB input must have an even number of characters",
        ));
    }
    digits
        .chunks_exact(2)
        .map(|pair| Ok(nibble(pair[0])? << 4 | nibble(pair[1])?))
        .collect()
}

fn nibble(c: u8) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        _ => Err(Error::malformed(format!("Invalid hex character '{}'", c as char))),
    }
}
