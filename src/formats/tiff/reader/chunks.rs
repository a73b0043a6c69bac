//! Strip and tile decoding with caching

use std::sync::Arc;

use super::{to_usize, TiffReader};
use crate::compression::Compression;
use crate::error::{Error, Result};
use crate::formats::tiff::{tags, Ifd, SampleType};
use crate::io::{ByteCursor, ByteOrder};
use crate::types::PixelType;

/// Largest decoded strip or tile accepted
pub const MAX_CHUNK_BYTES: usize = 1 << 30;

/// Geometry and storage of the strips or tiles of one image
#[derive(Debug, Clone)]
pub struct ChunkLayout {
    pub width: usize,
    pub height: usize,
    /// Strips span the full image width
    pub chunk_width: usize,
    pub chunk_height: usize,
    pub chunks_across: usize,
    pub chunks_down: usize,
    pub samples: usize,
    /// One plane per sample instead of interleaved samples
    pub planar: bool,
    pub sample: SampleType,
    /// Type the samples are exposed as
    pub pixtype: PixelType,
    pub compression: Compression,
    pub predictor: u64,
    offsets: Vec<u64>,
    byte_counts: Vec<u64>,
}

impl ChunkLayout {
    /// Reads the chunk layout of an IFD
    pub fn from_ifd(ifd: &Ifd) -> Result<Self> {
        let dims = ifd
            .dimensions()
            .ok_or_else(|| Error::malformed("TIFF image has no dimensions"))?;
        let sample = ifd.sample_type().ok_or_else(|| {
            Error::Unsupported(format!(
                "TIFF sample format {} with {} bits",
                ifd.sample_format(),
                ifd.bits_per_sample()
            ))
        })?;
        let compression = Compression::from_tag(ifd.compression())?;
        let predictor = ifd.predictor();
        if predictor > 2 {
            return Err(Error::Unsupported(format!("TIFF predictor {}", predictor)));
        }

        let (chunk_width, chunk_height, offsets, byte_counts) = match ifd.tile_dimensions() {
            Some(tile) => (
                tile.width,
                tile.height,
                ifd.require_u64s(tags::TILE_OFFSETS)?,
                ifd.require_u64s(tags::TILE_BYTE_COUNTS)?,
            ),
            None => (
                dims.width,
                ifd.rows_per_strip().unwrap_or(dims.height).min(dims.height),
                ifd.require_u64s(tags::STRIP_OFFSETS)?,
                ifd.require_u64s(tags::STRIP_BYTE_COUNTS)?,
            ),
        };
        if chunk_width == 0 || chunk_height == 0 {
            return Err(Error::malformed("TIFF chunk dimensions are zero"));
        }

        let samples = to_usize(ifd.samples_per_pixel().max(1))?;
        let planar = ifd.planar_configuration() == 2 && samples > 1;
        let chunks_across = to_usize(dims.width.div_ceil(chunk_width))?;
        let chunks_down = to_usize(dims.height.div_ceil(chunk_height))?;
        let planes = if planar { samples } else { 1 };
        let expected = chunks_across
            .checked_mul(chunks_down)
            .and_then(|n| n.checked_mul(planes))
            .ok_or_else(|| Error::malformed("TIFF chunk count overflows"))?;
        if offsets.len() < expected || byte_counts.len() < expected {
            return Err(Error::malformed(format!(
                "TIFF lists {} chunks where {} are needed",
                offsets.len().min(byte_counts.len()),
                expected
            )));
        }

        let layout = Self {
            width: to_usize(dims.width)?,
            height: to_usize(dims.height)?,
            chunk_width: to_usize(chunk_width)?,
            chunk_height: to_usize(chunk_height)?,
            chunks_across,
            chunks_down,
            samples,
            planar,
            sample,
            pixtype: sample.pixel_type(),
            compression,
            predictor,
            offsets,
            byte_counts,
        };
        let chunk_len = layout.chunk_len()?;
        if chunk_len > MAX_CHUNK_BYTES {
            return Err(Error::malformed(format!(
                "TIFF chunk of {} bytes exceeds the {} byte limit",
                chunk_len, MAX_CHUNK_BYTES
            )));
        }
        Ok(layout)
    }

    /// Samples stored per pixel inside one chunk
    pub fn chunk_stride(&self) -> usize {
        if self.planar {
            1
        } else {
            self.samples
        }
    }

    /// Decoded byte length of one chunk
    pub fn chunk_len(&self) -> Result<usize> {
        self.chunk_width
            .checked_mul(self.chunk_height)
            .and_then(|n| n.checked_mul(self.chunk_stride()))
            .and_then(|n| n.checked_mul(self.sample.size()))
            .ok_or_else(|| {
                Error::malformed(format!(
                    "TIFF chunk of {}x{} samples overflows",
                    self.chunk_width, self.chunk_height
                ))
            })
    }

    /// Index of the chunk holding `(col, row)` for the given sample
    pub fn chunk_index(&self, sample: usize, col: usize, row: usize) -> usize {
        let plane = if self.planar { sample } else { 0 };
        plane * self.chunks_across * self.chunks_down
            + (row / self.chunk_height) * self.chunks_across
            + col / self.chunk_width
    }
}

impl TiffReader {
    /// Decodes one chunk to host-order samples, consulting the cache first
    pub fn read_chunk(&self, layout: &ChunkLayout, index: usize) -> Result<Arc<Vec<u8>>> {
        if let Some(cached) = self.cache.get(0, index) {
            return Ok(cached);
        }

        let (offset, byte_count) = match (layout.offsets.get(index), layout.byte_counts.get(index)) {
            (Some(&offset), Some(&count)) => (to_usize(offset)?, to_usize(count)?),
            _ => return Err(Error::out_of_range(format!("TIFF chunk {} does not exist", index))),
        };
        let expected = layout.chunk_len()?;

        let mut decoded = if byte_count == 0 {
            // sparse chunk
            vec![0u8; expected]
        } else {
            let raw = ByteCursor::new(self.data(), self.byte_order).slice_at(offset, byte_count)?;
            layout.compression.decompress(raw)?
        };
        if decoded.len() < expected {
            log::debug!("Chunk {} decoded to {} of {} bytes", index, decoded.len(), expected);
        }
        decoded.resize(expected, 0);

        let size = layout.sample.size();
        if self.byte_order.needs_swap() {
            ByteOrder::swap_words(&mut decoded, size);
        }
        if layout.predictor == 2 {
            let row_values = layout.chunk_width * layout.chunk_stride();
            undo_horizontal_predictor(&mut decoded, row_values, layout.chunk_stride(), size);
        }

        Ok(self.cache.put(0, index, decoded))
    }
}

macro_rules! accumulate_rows {
    ($data:expr, $row_values:expr, $stride:expr, $ty:ty) => {{
        const N: usize = std::mem::size_of::<$ty>();
        for row in $data.chunks_exact_mut($row_values * N) {
            for i in $stride..$row_values {
                let prev = <$ty>::from_ne_bytes(row[(i - $stride) * N..(i - $stride + 1) * N].try_into().unwrap_or([0; N]));
                let cur = <$ty>::from_ne_bytes(row[i * N..(i + 1) * N].try_into().unwrap_or([0; N]));
                row[i * N..(i + 1) * N].copy_from_slice(&cur.wrapping_add(prev).to_ne_bytes());
            }
        }
    }};
}

/// Reverses horizontal differencing on host-order samples. `stride` is the
/// distance in samples between neighbouring values of the same component.
fn undo_horizontal_predictor(data: &mut [u8], row_values: usize, stride: usize, sample_size: usize) {
    if row_values <= stride {
        return;
    }
    match sample_size {
        1 => accumulate_rows!(data, row_values, stride, u8),
        2 => accumulate_rows!(data, row_values, stride, u16),
        4 => accumulate_rows!(data, row_values, stride, u32),
        _ => accumulate_rows!(data, row_values, stride, u64),
    }
}
