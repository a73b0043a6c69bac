//! Image File Directory (IFD) structures

use std::collections::HashMap;

use super::tags::{self, field_types, sample_formats};
use crate::error::{Error, Result};
use crate::io::{ByteCursor, ByteOrder};
use crate::types::{Dimensions, PixelType};

/// One directory entry with its value bytes already resolved
#[derive(Debug, Clone)]
pub struct IfdEntry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u64,
    bytes: Vec<u8>,
    order: ByteOrder,
}

impl IfdEntry {
    /// Creates an entry from the raw value bytes in file byte order
    pub fn new(tag: u16, field_type: u16, count: u64, bytes: Vec<u8>, order: ByteOrder) -> Self {
        Self {
            tag,
            field_type,
            count,
            bytes,
            order,
        }
    }

    fn cursor(&self) -> ByteCursor<'_> {
        ByteCursor::new(&self.bytes, self.order)
    }

    /// Decodes integer values, widening every unsigned type to `u64`
    pub fn as_u64s(&self) -> Result<Vec<u64>> {
        let mut cursor = self.cursor();
        (0..self.count)
            .map(|_| match self.field_type {
                field_types::BYTE | field_types::UNDEFINED => cursor.read_u8().map(u64::from),
                field_types::SHORT => cursor.read_u16().map(u64::from),
                field_types::LONG | field_types::IFD => cursor.read_u32().map(u64::from),
                field_types::LONG8 | field_types::IFD8 => cursor.read_u64(),
                other => Err(Error::malformed(format!(
                    "Tag {} has type {} where an unsigned integer is expected",
                    tags::tag_name(self.tag),
                    other
                ))),
            })
            .collect()
    }

    /// Decodes numeric values as `f64`
    pub fn as_f64s(&self) -> Result<Vec<f64>> {
        let mut cursor = self.cursor();
        match self.field_type {
            field_types::DOUBLE => (0..self.count).map(|_| cursor.read_f64()).collect(),
            field_types::FLOAT => (0..self.count).map(|_| cursor.read_f32().map(f64::from)).collect(),
            field_types::RATIONAL => (0..self.count)
                .map(|_| {
                    let num = cursor.read_u32()?;
                    let den = cursor.read_u32()?;
                    Ok(num as f64 / den as f64)
                })
                .collect(),
            _ => Ok(self.as_u64s()?.into_iter().map(|v| v as f64).collect()),
        }
    }

    /// Decodes an ASCII value, dropping trailing NULs
    pub fn as_ascii(&self) -> String {
        String::from_utf8_lossy(&self.bytes)
            .trim_end_matches('\0')
            .to_string()
    }
}

/// Storage type of one TIFF sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    /// Stored exactly as a band pixel type
    Native(PixelType),
    UInt64,
    Int64,
}

impl SampleType {
    /// Bytes per sample
    pub fn size(self) -> usize {
        match self {
            SampleType::Native(pixtype) => pixtype.size(),
            SampleType::UInt64 | SampleType::Int64 => 8,
        }
    }

    /// 64-bit integers widen to `Float64`; reads into narrower bands
    /// saturate through the band type's clamp.
    pub fn pixel_type(self) -> PixelType {
        match self {
            SampleType::Native(pixtype) => pixtype,
            SampleType::UInt64 | SampleType::Int64 => PixelType::Float64,
        }
    }

    /// Decodes one host-order sample
    pub fn decode(self, bytes: &[u8]) -> f64 {
        match self {
            SampleType::Native(pixtype) => pixtype.decode(bytes),
            SampleType::UInt64 => u64::from_ne_bytes(word(bytes)) as f64,
            SampleType::Int64 => i64::from_ne_bytes(word(bytes)) as f64,
        }
    }
}

fn word(bytes: &[u8]) -> [u8; 8] {
    bytes.get(..8).and_then(|b| b.try_into().ok()).unwrap_or([0; 8])
}

/// An Image File Directory
#[derive(Debug, Clone)]
pub struct Ifd {
    /// Position in the IFD chain (0-based)
    pub index: usize,
    /// File offset of the directory
    pub offset: u64,
    entries: Vec<IfdEntry>,
    tag_map: HashMap<u16, usize>,
}

impl Ifd {
    pub fn new(index: usize, offset: u64) -> Self {
        Self {
            index,
            offset,
            entries: Vec::new(),
            tag_map: HashMap::new(),
        }
    }

    pub fn add_entry(&mut self, entry: IfdEntry) {
        self.tag_map.insert(entry.tag, self.entries.len());
        self.entries.push(entry);
    }

    pub fn get_entry(&self, tag: u16) -> Option<&IfdEntry> {
        self.tag_map.get(&tag).and_then(|&idx| self.entries.get(idx))
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// First integer value of a tag
    pub fn get_u64(&self, tag: u16) -> Option<u64> {
        self.get_entry(tag)
            .and_then(|e| e.as_u64s().ok())
            .and_then(|values| values.first().copied())
    }

    /// All integer values of a required tag
    pub fn require_u64s(&self, tag: u16) -> Result<Vec<u64>> {
        self.get_entry(tag)
            .ok_or_else(|| Error::malformed(format!("Missing TIFF tag {}", tags::tag_name(tag))))?
            .as_u64s()
    }

    pub fn dimensions(&self) -> Option<Dimensions> {
        let width = self.get_u64(tags::IMAGE_WIDTH)?;
        let height = self.get_u64(tags::IMAGE_LENGTH)?;
        Some(Dimensions::new(width, height))
    }

    pub fn compression(&self) -> u64 {
        self.get_u64(tags::COMPRESSION).unwrap_or(1)
    }

    pub fn samples_per_pixel(&self) -> u64 {
        self.get_u64(tags::SAMPLES_PER_PIXEL).unwrap_or(1)
    }

    pub fn bits_per_sample(&self) -> u64 {
        self.get_u64(tags::BITS_PER_SAMPLE).unwrap_or(1)
    }

    pub fn sample_format(&self) -> u64 {
        self.get_u64(tags::SAMPLE_FORMAT).unwrap_or(sample_formats::UNSIGNED)
    }

    /// 1 = chunky (interleaved samples), 2 = planar (one plane per sample)
    pub fn planar_configuration(&self) -> u64 {
        self.get_u64(tags::PLANAR_CONFIGURATION).unwrap_or(1)
    }

    pub fn predictor(&self) -> u64 {
        self.get_u64(tags::PREDICTOR).unwrap_or(1)
    }

    pub fn is_tiled(&self) -> bool {
        self.get_entry(tags::TILE_WIDTH).is_some()
    }

    pub fn tile_dimensions(&self) -> Option<Dimensions> {
        let width = self.get_u64(tags::TILE_WIDTH)?;
        let height = self.get_u64(tags::TILE_LENGTH)?;
        Some(Dimensions::new(width, height))
    }

    /// Rows per strip, the whole image when absent
    pub fn rows_per_strip(&self) -> Option<u64> {
        let height = self.dimensions()?.height;
        Some(self.get_u64(tags::ROWS_PER_STRIP).unwrap_or(height).min(height.max(1)))
    }

    /// Storage type of one sample
    pub fn sample_type(&self) -> Option<SampleType> {
        let pixtype = match (self.sample_format(), self.bits_per_sample()) {
            (sample_formats::UNSIGNED, 8) => PixelType::UInt8,
            (sample_formats::UNSIGNED, 16) => PixelType::UInt16,
            (sample_formats::UNSIGNED, 32) => PixelType::UInt32,
            (sample_formats::UNSIGNED, 64) => return Some(SampleType::UInt64),
            (sample_formats::SIGNED, 8) => PixelType::Int8,
            (sample_formats::SIGNED, 16) => PixelType::Int16,
            (sample_formats::SIGNED, 32) => PixelType::Int32,
            (sample_formats::SIGNED, 64) => return Some(SampleType::Int64),
            (sample_formats::FLOAT, 32) => PixelType::Float32,
            (sample_formats::FLOAT, 64) => PixelType::Float64,
            _ => return None,
        };
        Some(SampleType::Native(pixtype))
    }

    /// Pixel type bands read from this image are exposed as
    pub fn pixel_type(&self) -> Option<PixelType> {
        self.sample_type().map(SampleType::pixel_type)
    }

    /// Checks for any of the GeoTIFF georeferencing tags
    pub fn is_geotiff(&self) -> bool {
        [
            tags::MODEL_PIXEL_SCALE,
            tags::MODEL_TIEPOINT,
            tags::MODEL_TRANSFORMATION,
            tags::GEO_KEY_DIRECTORY,
        ]
        .iter()
        .any(|&tag| self.get_entry(tag).is_some())
    }
}
