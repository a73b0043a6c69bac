//! Storage form
//!
//! ```text
//! header (64 bytes, host order)
//!   u32 size, u16 version, u16 band count,
//!   f64 scaleX, scaleY, ipX, ipY, skewX, skewY, i32 srid, u16 width, u16 height
//! per band
//!   u8 type byte, (pixel size - 1) zero bytes, NODATA (pixel size bytes)
//!   offline: u8 external band index, NUL-terminated path
//!   inline:  width * height pixels
//!   zero padding to the next 8-byte boundary
//! ```
//!
//! Pixel data of a deserialized inline band borrows the input buffer.

use super::{band_type_byte, parse_band_type_byte, read_nodata, BandFlags, GridHeader};
use crate::band::Band;
use crate::error::{Error, Result};
use crate::io::{ByteCursor, ByteOrder, ByteWriter};
use crate::raster::{Georeference, Raster};

/// Byte length of the storage header
pub const STORAGE_HEADER_SIZE: usize = 64;

/// The only storage format version
pub const STORAGE_VERSION: u16 = 0;

const BAND_ALIGNMENT: usize = 8;

/// Leading fields of a storage buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageHeader {
    pub size: u32,
    pub version: u16,
    pub num_bands: u16,
    pub georeference: Georeference,
    pub width: u16,
    pub height: u16,
}

impl StorageHeader {
    /// Parses the header without touching band data
    pub fn read(bytes: &[u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes, ByteOrder::host());
        Self::read_from(&mut cursor)
    }

    fn read_from(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let size = cursor.read_u32()?;
        let version = cursor.read_u16()?;
        let num_bands = cursor.read_u16()?;
        let grid = GridHeader::read(cursor)?;
        Ok(Self {
            size,
            version,
            num_bands,
            georeference: Georeference {
                geotransform: grid.geotransform,
                srid: grid.srid,
            },
            width: grid.width,
            height: grid.height,
        })
    }
}

fn round_up(len: usize, align: usize) -> usize {
    match len % align {
        0 => len,
        rem => len + align - rem,
    }
}

impl<'a> Raster<'a> {
    /// Exact length of the storage form. A band region already on an
    /// 8-byte boundary gets no padding.
    pub fn serialized_size(&self) -> usize {
        self.bands().iter().fold(STORAGE_HEADER_SIZE, |size, band| {
            let pixbytes = band.pixel_type().size();
            // type byte with padding, then NODATA
            let mut size = size + pixbytes * 2;
            size += match band.offline_path() {
                Some(path) => 1 + path.len() + 1,
                None => band.data_len(),
            };
            round_up(size, BAND_ALIGNMENT)
        })
    }

    /// Encodes the storage form. Records the encoded size and version on
    /// the raster.
    pub fn serialize(&mut self) -> Result<Vec<u8>> {
        let total = self.serialized_size();
        let size = u32::try_from(total).map_err(|_| {
            Error::OutOfMemory(format!("Serialized raster of {} bytes exceeds the storage limit", total))
        })?;
        let num_bands = u16::try_from(self.num_bands())
            .map_err(|_| Error::invalid(format!("Too many bands to serialize: {}", self.num_bands())))?;

        let mut w = ByteWriter::with_capacity(total, ByteOrder::host());
        w.write_u32(size);
        w.write_u16(STORAGE_VERSION);
        w.write_u16(num_bands);
        GridHeader::new(self.georeference(), self.width(), self.height()).write(&mut w);

        for band in self.bands() {
            write_band(&mut w, band)?;
        }

        debug_assert_eq!(w.len(), total);
        self.set_stored_header(size, STORAGE_VERSION);
        log::debug!("Serialized raster with {} bands into {} bytes", num_bands, total);
        Ok(w.into_inner())
    }

    /// Decodes the storage form. Inline bands borrow `bytes`; with
    /// `header_only` no band is read.
    pub fn deserialize(bytes: &'a [u8], header_only: bool) -> Result<Raster<'a>> {
        let mut cursor = ByteCursor::new(bytes, ByteOrder::host());
        let header = StorageHeader::read_from(&mut cursor)?;

        let mut raster = Raster::empty(header.width, header.height, header.georeference);
        raster.set_stored_header(header.size, header.version);
        if header_only {
            return Ok(raster);
        }

        for i in 0..header.num_bands as usize {
            let band = read_band(&mut cursor, header.width, header.height)?;
            raster.add_band(band, i)?;
        }
        Ok(raster)
    }
}

fn write_band(w: &mut ByteWriter, band: &Band<'_>) -> Result<()> {
    let pixtype = band.pixel_type();
    let pixbytes = pixtype.size();

    w.write_u8(band_type_byte(band, band.is_offline()));
    w.write_zeros(pixbytes - 1);
    w.write_pixel(pixtype, band.raw_nodata());

    match band.offline_path() {
        Some(path) => {
            w.write_u8(band.offline_band_index()?);
            w.write_cstr(path);
        }
        None => w.write_pixels(pixtype, &band.data()?[..band.data_len()]),
    }
    w.pad_to(BAND_ALIGNMENT);
    Ok(())
}

fn read_band<'a>(cursor: &mut ByteCursor<'a>, width: u16, height: u16) -> Result<Band<'a>> {
    let (pixtype, flags) = parse_band_type_byte(cursor.read_u8()?)?;
    let pixbytes = pixtype.size();
    cursor.skip(pixbytes - 1)?;
    let nodata = read_nodata(cursor, pixtype)?;

    let mut band = if flags.contains(BandFlags::OFFLINE) {
        let band_index = cursor.read_u8()?;
        let path = cursor.read_cstr()?;
        Band::new_offline(width, height, pixtype, None, band_index, path)
    } else {
        let len = width as usize * height as usize * pixbytes;
        Band::from_slice(width, height, pixtype, None, cursor.take(len)?)?
    };
    band.restore_nodata(
        flags.contains(BandFlags::HAS_NODATA),
        nodata,
        flags.contains(BandFlags::IS_NODATA),
    );

    // the final band may end without padding
    let padded = round_up(cursor.position(), BAND_ALIGNMENT).min(cursor.position() + cursor.remaining());
    cursor.seek(padded)?;
    Ok(band)
}
