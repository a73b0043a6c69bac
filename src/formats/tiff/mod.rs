//! TIFF and BigTIFF reading for offline band sources

pub mod geotiff;
pub mod ifd;
pub mod reader;
pub mod tags;

pub use geotiff::GeoInfo;
pub use ifd::{Ifd, IfdEntry, SampleType};
pub use reader::{ChunkLayout, TiffReader};

/// TIFF magic number (42)
pub const TIFF_MAGIC: u16 = 42;

/// BigTIFF magic number (43)
pub const BIGTIFF_MAGIC: u16 = 43;
