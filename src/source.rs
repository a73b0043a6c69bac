//! External raster sources backing offline bands
//!
//! A [`SourceRegistry`] holds an ordered list of [`SourceDriver`]s and the
//! [`RasterConfig`] consulted before any file is touched. Offline bands use
//! the process-wide registry unless one is passed explicitly.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::OnceLock;

use crate::config::RasterConfig;
use crate::error::{Error, Result};
use crate::formats::tiff::{ChunkLayout, GeoInfo, TiffReader};
use crate::raster::GeoTransform;
use crate::types::PixelType;

/// An opened external raster
pub trait RasterSource: Send {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    fn band_count(&self) -> usize;

    /// Affine georeference, `None` when the file carries none
    fn geotransform(&self) -> Option<GeoTransform>;

    /// NODATA value declared by the file
    fn nodata(&self) -> Option<f64> {
        None
    }

    /// Reads one row of a 0-based band
    fn read_row(&self, band: usize, row: usize) -> Result<Vec<f64>>;

    /// Reads a `width` x `height` window starting at source cell `(x0, y0)`
    /// into host-order pixels of `pixtype`. Cells outside the source take
    /// `fill`; values are clamped to the target type.
    #[allow(clippy::too_many_arguments)]
    fn read_window(
        &self,
        band: usize,
        x0: i64,
        y0: i64,
        width: usize,
        height: usize,
        pixtype: PixelType,
        fill: f64,
    ) -> Result<Vec<u8>> {
        let size = pixtype.size();
        let fill_bytes = pixtype.encode_to_vec(fill);
        let mut out = Vec::with_capacity(width * height * size);

        for y in 0..height as i64 {
            let src_row = y0 + y;
            let row = if src_row >= 0 && (src_row as usize) < self.height() {
                Some(self.read_row(band, src_row as usize)?)
            } else {
                None
            };

            for x in 0..width as i64 {
                let src_col = x0 + x;
                let value = row
                    .as_ref()
                    .filter(|_| src_col >= 0)
                    .and_then(|r| r.get(src_col as usize).copied());
                match value {
                    Some(v) => out.extend_from_slice(&pixtype.encode_to_vec(v)),
                    None => out.extend_from_slice(&fill_bytes),
                }
            }
        }
        Ok(out)
    }
}

/// Recognises and opens one file format
pub trait SourceDriver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Checks the path and the first bytes of the file
    fn can_open(&self, path: &Path, header: &[u8]) -> bool;

    fn open(&self, path: &Path, config: &RasterConfig) -> Result<Box<dyn RasterSource>>;
}

/// Ordered driver list plus configuration
pub struct SourceRegistry {
    drivers: Vec<Box<dyn SourceDriver>>,
    config: RasterConfig,
}

static GLOBAL: OnceLock<SourceRegistry> = OnceLock::new();

impl SourceRegistry {
    /// Creates a registry with the built-in GeoTIFF driver
    pub fn new(config: RasterConfig) -> Self {
        let mut registry = Self::empty(config);
        registry.register(Box::new(GeoTiffDriver));
        registry
    }

    /// Creates a registry without drivers
    pub fn empty(config: RasterConfig) -> Self {
        Self {
            drivers: Vec::new(),
            config,
        }
    }

    /// Appends a driver; earlier drivers are tried first
    pub fn register(&mut self, driver: Box<dyn SourceDriver>) {
        log::debug!("Registered raster source driver {}", driver.name());
        self.drivers.push(driver);
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    pub fn driver_names(&self) -> Vec<&'static str> {
        self.drivers.iter().map(|d| d.name()).collect()
    }

    /// Opens `path` with the first driver that recognises it
    pub fn open(&self, path: &str) -> Result<Box<dyn RasterSource>> {
        let path = Path::new(path);
        let mut header = Vec::with_capacity(16);
        File::open(path)?.take(16).read_to_end(&mut header)?;

        let driver = self
            .drivers
            .iter()
            .find(|d| d.can_open(path, &header))
            .ok_or_else(|| {
                Error::Io(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("No driver recognises raster file {}", path.display()),
                ))
            })?;

        log::debug!("Opening {} with the {} driver", path.display(), driver.name());
        driver.open(path, &self.config)
    }

    /// The process-wide registry, created with defaults on first use
    pub fn global() -> &'static SourceRegistry {
        GLOBAL.get_or_init(|| SourceRegistry::new(RasterConfig::default()))
    }

    /// Installs the process-wide registry. Fails once it has been
    /// installed or already used.
    pub fn install(registry: SourceRegistry) -> Result<()> {
        GLOBAL
            .set(registry)
            .map_err(|_| Error::invalid("Raster source registry is already initialised"))
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new(RasterConfig::default())
    }
}

/// Built-in driver for GeoTIFF and plain TIFF files
pub struct GeoTiffDriver;

impl SourceDriver for GeoTiffDriver {
    fn name(&self) -> &'static str {
        "GTiff"
    }

    fn can_open(&self, _path: &Path, header: &[u8]) -> bool {
        header.starts_with(b"II") || header.starts_with(b"MM")
    }

    fn open(&self, path: &Path, config: &RasterConfig) -> Result<Box<dyn RasterSource>> {
        let reader = TiffReader::open_with_config(path, config)?;
        Ok(Box::new(GeoTiffSource::new(reader)?))
    }
}

/// First image of a TIFF file exposed as a raster source; each sample is a band
pub struct GeoTiffSource {
    reader: TiffReader,
    layout: ChunkLayout,
    geo: Option<GeoInfo>,
}

impl GeoTiffSource {
    pub fn new(reader: TiffReader) -> Result<Self> {
        let ifd = reader
            .main_ifd()
            .ok_or_else(|| Error::malformed("TIFF file contains no image"))?;
        let layout = ChunkLayout::from_ifd(ifd)?;
        let geo = GeoInfo::from_ifd(ifd)?;
        Ok(Self { reader, layout, geo })
    }

    pub fn pixel_type(&self) -> PixelType {
        self.layout.pixtype
    }

    pub fn epsg_code(&self) -> Option<u16> {
        self.geo.as_ref().and_then(|g| g.epsg_code)
    }
}

impl RasterSource for GeoTiffSource {
    fn width(&self) -> usize {
        self.layout.width
    }

    fn height(&self) -> usize {
        self.layout.height
    }

    fn band_count(&self) -> usize {
        self.layout.samples
    }

    fn geotransform(&self) -> Option<GeoTransform> {
        self.geo.as_ref().and_then(|g| g.affine_transform())
    }

    fn nodata(&self) -> Option<f64> {
        self.geo.as_ref().and_then(|g| g.nodata)
    }

    fn read_row(&self, band: usize, row: usize) -> Result<Vec<f64>> {
        self.reader.read_row(&self.layout, band, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ramp {
        width: usize,
        height: usize,
    }

    impl RasterSource for Ramp {
        fn width(&self) -> usize {
            self.width
        }

        fn height(&self) -> usize {
            self.height
        }

        fn band_count(&self) -> usize {
            1
        }

        fn geotransform(&self) -> Option<GeoTransform> {
            None
        }

        fn read_row(&self, _band: usize, row: usize) -> Result<Vec<f64>> {
            Ok((0..self.width).map(|x| (row * 10 + x) as f64).collect())
        }
    }

    #[test]
    fn test_read_window_inside() {
        let src = Ramp { width: 4, height: 4 };
        let out = src.read_window(0, 1, 2, 2, 2, PixelType::UInt8, 0.0).unwrap();
        assert_eq!(out, vec![21, 22, 31, 32]);
    }

    #[test]
    fn test_read_window_fills_outside() {
        let src = Ramp { width: 2, height: 2 };
        let out = src.read_window(0, 1, 1, 2, 2, PixelType::UInt8, 99.0).unwrap();
        assert_eq!(out, vec![11, 99, 99, 99]);
    }

    #[test]
    fn test_read_window_clamps() {
        let src = Ramp { width: 40, height: 40 };
        let out = src.read_window(0, 30, 30, 1, 1, PixelType::UInt8, 0.0).unwrap();
        assert_eq!(out, vec![255]);
    }

    #[test]
    fn test_empty_registry_rejects_files() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let registry = SourceRegistry::empty(RasterConfig::default());
        let path = file.path().to_str().unwrap();
        assert!(matches!(registry.open(path), Err(Error::Io(_))));
    }

    #[test]
    fn test_default_registry_has_geotiff() {
        let registry = SourceRegistry::default();
        assert_eq!(registry.driver_names(), vec!["GTiff"]);
        assert!(registry.config().enable_offline_rasters);
    }

    #[test]
    fn test_geotiff_driver_sniffs_magic() {
        let driver = GeoTiffDriver;
        assert!(driver.can_open(Path::new("x"), b"II*\0"));
        assert!(driver.can_open(Path::new("x"), b"MM\0*"));
        assert!(!driver.can_open(Path::new("x.tif"), b"\x89PNG"));
    }
}
