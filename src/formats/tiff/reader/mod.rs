//! TIFF file reader
//!
//! The whole file is exposed as one byte slice, either memory-mapped or
//! read into memory, and every structure is decoded from it through a
//! fail-closed [`ByteCursor`].

mod chunks;
mod pixels;

use std::fs::File;
use std::io::Read;
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;

pub use chunks::ChunkLayout;

use crate::cache::ChunkCache;
use crate::config::RasterConfig;
use crate::error::{Error, Result};
use crate::formats::tiff::{tags, Ifd, IfdEntry, BIGTIFF_MAGIC, TIFF_MAGIC};
use crate::io::{ByteCursor, ByteOrder};

/// Upper bound on the IFD chain, guards against offset loops
const MAX_IFDS: usize = 1000;

enum TiffBytes {
    Mapped(Mmap),
    Loaded(Vec<u8>),
}

impl Deref for TiffBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            TiffBytes::Mapped(mmap) => &mmap[..],
            TiffBytes::Loaded(bytes) => &bytes[..],
        }
    }
}

/// A parsed TIFF or BigTIFF file
pub struct TiffReader {
    bytes: TiffBytes,
    byte_order: ByteOrder,
    is_big_tiff: bool,
    ifds: Vec<Ifd>,
    cache: ChunkCache,
}

impl TiffReader {
    /// Opens a TIFF file with the default configuration
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, &RasterConfig::default())
    }

    /// Opens a TIFF file, memory-mapping it when `config.use_mmap` is set
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: &RasterConfig) -> Result<Self> {
        let mut file = File::open(path.as_ref())?;

        let bytes = if config.use_mmap {
            let mmap = unsafe { Mmap::map(&file)? };
            #[cfg(unix)]
            mmap.advise(memmap2::Advice::Sequential)?;
            TiffBytes::Mapped(mmap)
        } else {
            let mut buffer = Vec::new();
            file.read_to_end(&mut buffer)?;
            TiffBytes::Loaded(buffer)
        };

        log::debug!("Opened TIFF {} ({} bytes)", path.as_ref().display(), bytes.len());
        Self::parse(bytes, config.chunk_cache_size)
    }

    /// Parses a TIFF held in memory
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::parse(TiffBytes::Loaded(bytes), RasterConfig::default().chunk_cache_size)
    }

    fn parse(bytes: TiffBytes, cache_size: usize) -> Result<Self> {
        let data: &[u8] = &bytes;
        let magic = data
            .get(..2)
            .ok_or_else(|| Error::malformed("File too short for a TIFF header"))?;
        let byte_order = ByteOrder::from_tiff_magic([magic[0], magic[1]])
            .ok_or_else(|| Error::malformed("Not a TIFF file"))?;

        let mut cursor = ByteCursor::new(data, byte_order);
        cursor.skip(2)?;
        let is_big_tiff = match cursor.read_u16()? {
            TIFF_MAGIC => false,
            BIGTIFF_MAGIC => true,
            other => return Err(Error::malformed(format!("Invalid TIFF magic number {}", other))),
        };

        let mut next_ifd = if is_big_tiff {
            let offset_size = cursor.read_u16()?;
            if offset_size != 8 {
                return Err(Error::malformed(format!("Invalid BigTIFF offset size: {}", offset_size)));
            }
            cursor.skip(2)?;
            cursor.read_u64()?
        } else {
            u64::from(cursor.read_u32()?)
        };

        let mut ifds = Vec::new();
        while next_ifd != 0 {
            if ifds.len() >= MAX_IFDS {
                return Err(Error::malformed("Too many IFDs"));
            }
            let (ifd, following) = read_ifd(data, byte_order, is_big_tiff, ifds.len(), next_ifd)?;
            ifds.push(ifd);
            next_ifd = following;
        }

        Ok(Self {
            bytes,
            byte_order,
            is_big_tiff,
            ifds,
            cache: ChunkCache::new(cache_size),
        })
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    pub fn ifds(&self) -> &[Ifd] {
        &self.ifds
    }

    /// The first (full resolution) image
    pub fn main_ifd(&self) -> Option<&Ifd> {
        self.ifds.first()
    }

    pub fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    fn data(&self) -> &[u8] {
        &self.bytes
    }
}

/// Reads the IFD at `offset` and returns it with the offset of the next one
fn read_ifd(
    data: &[u8],
    order: ByteOrder,
    is_big_tiff: bool,
    index: usize,
    offset: u64,
) -> Result<(Ifd, u64)> {
    let mut cursor = ByteCursor::new(data, order);
    cursor.seek(to_usize(offset)?)?;

    let entry_count = if is_big_tiff {
        cursor.read_u64()?
    } else {
        u64::from(cursor.read_u16()?)
    };
    let inline_size = if is_big_tiff { 8 } else { 4 };

    let mut ifd = Ifd::new(index, offset);
    for _ in 0..entry_count {
        let tag = cursor.read_u16()?;
        let field_type = cursor.read_u16()?;
        let count = if is_big_tiff {
            cursor.read_u64()?
        } else {
            u64::from(cursor.read_u32()?)
        };
        let value_field = cursor.take(inline_size)?;

        let Some(size) = tags::field_types::size(field_type) else {
            log::debug!("Skipping tag {} with unknown field type {}", tag, field_type);
            continue;
        };
        let len = to_usize(count)?
            .checked_mul(size)
            .ok_or_else(|| Error::malformed(format!("Tag {} value length overflows", tag)))?;

        let bytes = if len <= inline_size {
            value_field[..len].to_vec()
        } else {
            let mut field = ByteCursor::new(value_field, order);
            let value_offset = if is_big_tiff {
                field.read_u64()?
            } else {
                u64::from(field.read_u32()?)
            };
            cursor.slice_at(to_usize(value_offset)?, len)?.to_vec()
        };

        ifd.add_entry(IfdEntry::new(tag, field_type, count, bytes, order));
    }

    let next = if is_big_tiff {
        cursor.read_u64()?
    } else {
        u64::from(cursor.read_u32()?)
    };
    Ok((ifd, next))
}

pub(crate) fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::malformed(format!("Offset {} does not fit in memory", value)))
}
