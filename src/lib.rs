//! georaster - georeferenced multi-band rasters for Rust
//!
//! georaster holds rasters in memory with an affine georeference and SRID,
//! encodes them to a padded storage form and to WKB, and loads offline
//! band pixels from external GeoTIFF files.
//!
//! # Examples
//!
//! ## Building and encoding a raster
//!
//! ```
//! use georaster::{Band, PixelType, Raster};
//!
//! let mut raster = Raster::new(2, 2)?;
//! raster.set_srid(4326);
//! let band = Band::from_vec(2, 2, PixelType::UInt8, Some(255.0), vec![1, 255, 3, 4])?;
//! raster.add_band(band, 0)?;
//!
//! let stored = raster.serialize()?;
//! let restored = Raster::deserialize(&stored, false)?;
//! assert_eq!(restored.band(0).unwrap().get_pixel(1, 0)?, (255.0, true));
//!
//! let hex = raster.to_hex_wkb(false)?;
//! assert_eq!(Raster::from_hex_wkb(&hex)?.srid(), 4326);
//! # Ok::<(), georaster::Error>(())
//! ```
//!
//! ## Offline bands
//!
//! ```no_run
//! use georaster::{Band, PixelType, Raster, RasterConfig, SourceRegistry};
//!
//! SourceRegistry::install(SourceRegistry::new(RasterConfig::default().with_mmap(false)))?;
//!
//! let mut raster = Raster::new(256, 256)?;
//! raster.add_band(Band::new_offline(256, 256, PixelType::Int16, Some(-9999.0), 0, "dem.tif"), 0)?;
//! let (value, is_nodata) = raster.band(0).unwrap().get_pixel(10, 10)?;
//! println!("{} {}", value, is_nodata);
//! # Ok::<(), georaster::Error>(())
//! ```

pub mod band;
pub mod cache;
pub mod compression;
pub mod config;
pub mod error;
pub mod formats;
pub mod io;
pub mod raster;
pub mod source;
pub mod types;

pub use band::{Band, BandData, NodataMatch, OfflineData, PixelHit};
pub use config::RasterConfig;
pub use error::{Error, Result};
pub use formats::serialize::{StorageHeader, STORAGE_HEADER_SIZE};
pub use formats::wkb::WKB_HEADER_SIZE;
pub use formats::BandFlags;
pub use io::ByteOrder;
pub use raster::{
    BandSummary, Envelope, GeoTransform, Georeference, PhysicalParams, Raster, RasterSummary,
    SridGeometry, DEFAULT_GEOTRANSFORM, SRID_UNKNOWN,
};
pub use source::{GeoTiffDriver, GeoTiffSource, RasterSource, SourceDriver, SourceRegistry};
pub use types::{flt_eq, ConversionLoss, PixelType};
