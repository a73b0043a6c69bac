//! Loading offline band pixels from external files

use std::cell::OnceCell;
use std::io;

use super::{Band, BandData, OfflineData};
use crate::error::{Error, Result};
use crate::raster::{Georeference, DEFAULT_GEOTRANSFORM};
use crate::source::SourceRegistry;

impl<'a> Band<'a> {
    /// Reads the external pixels through the process-wide registry and
    /// replaces any cached copy.
    pub fn load_offline_data(&mut self) -> Result<()> {
        self.load_offline_data_with(SourceRegistry::global())
    }

    /// Reads the external pixels through `registry` and replaces any
    /// cached copy.
    pub fn load_offline_data_with(&mut self, registry: &SourceRegistry) -> Result<()> {
        let loaded = match &self.data {
            BandData::Offline(offline) => self.read_offline(offline, registry)?,
            _ => return Err(Error::invalid("Band is not offline")),
        };
        if let BandData::Offline(offline) = &mut self.data {
            offline.cache = OnceCell::from(loaded);
        }
        Ok(())
    }

    pub(super) fn offline_cache<'s>(&'s self, offline: &'s OfflineData) -> Result<&'s [u8]> {
        if let Some(cached) = offline.cache.get() {
            return Ok(cached);
        }
        let loaded = self.read_offline(offline, SourceRegistry::global())?;
        Ok(offline.cache.get_or_init(|| loaded))
    }

    fn read_offline(&self, offline: &OfflineData, registry: &SourceRegistry) -> Result<Vec<u8>> {
        if offline.path.is_empty() {
            return Err(Error::invalid("Offline band does not have a specified file"));
        }
        if !registry.config().enable_offline_rasters {
            return Err(Error::invalid("Access to offline bands disabled"));
        }
        let georef = self
            .georef
            .as_ref()
            .ok_or_else(|| Error::invalid("Offline band is not attached to a raster"))?;

        let source = registry.open(&offline.path)?;
        let count = source.band_count();
        if count == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("No bands found in offline raster: {}", offline.path),
            )));
        }
        if offline.band_index as usize + 1 > count {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "Specified band {} not found in offline raster: {}",
                    offline.band_index, offline.path
                ),
            )));
        }

        let ogt = source.geotransform().unwrap_or(DEFAULT_GEOTRANSFORM);
        let (aligned, _) = georef.alignment_with(&Georeference {
            geotransform: ogt,
            srid: georef.srid,
        })?;
        if !aligned {
            log::warn!("The in-db representation of the out-db raster is not aligned. Band data may be incorrect");
        }

        let (col, row) = georef.geopoint_to_cell(ogt[0], ogt[3])?;
        let fill = if self.has_nodata { self.nodata } else { 0.0 };
        log::debug!(
            "Loading band {} of {} at offset ({}, {})",
            offline.band_index,
            offline.path,
            col.abs(),
            row.abs()
        );

        source.read_window(
            offline.band_index as usize,
            col.abs() as i64,
            row.abs() as i64,
            self.width as usize,
            self.height as usize,
            self.pixtype,
            fill,
        )
    }
}
