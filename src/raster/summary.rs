//! Serializable raster metadata

use serde::Serialize;

use super::{Envelope, GeoTransform, Raster};
use crate::band::Band;
use crate::types::PixelType;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterSummary {
    pub width: u16,
    pub height: u16,
    pub srid: i32,
    pub geotransform: GeoTransform,
    pub envelope: Envelope,
    pub num_bands: usize,
    pub bands: Vec<BandSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandSummary {
    pub index: usize,
    pub pixel_type: PixelType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodata: Option<f64>,
    pub is_nodata: bool,
    pub is_offline: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_band: Option<u8>,
}

impl BandSummary {
    fn of(index: usize, band: &Band<'_>) -> Self {
        Self {
            index,
            pixel_type: band.pixel_type(),
            nodata: band.nodata().ok(),
            is_nodata: band.is_nodata(),
            is_offline: band.is_offline(),
            path: band.offline_path().map(str::to_string),
            external_band: band.offline_band_index().ok(),
        }
    }
}

impl RasterSummary {
    pub(crate) fn of(raster: &Raster<'_>) -> Self {
        Self {
            width: raster.width(),
            height: raster.height(),
            srid: raster.srid(),
            geotransform: raster.geotransform(),
            envelope: raster.envelope(),
            num_bands: raster.num_bands(),
            bands: raster
                .bands()
                .iter()
                .enumerate()
                .map(|(i, band)| BandSummary::of(i, band))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_json() {
        let mut raster = Raster::new(2, 1).unwrap();
        raster.set_srid(4326);
        raster.generate_new_band(PixelType::Int16, 0.0, true, -1.0, 0).unwrap();
        let offline = Band::new_offline(2, 1, PixelType::UInt8, None, 2, "/data/dem.tif");
        raster.add_band(offline, 1).unwrap();

        let summary = raster.summary();
        assert_eq!(summary.num_bands, 2);
        assert_eq!(summary.bands[0].nodata, Some(-1.0));
        assert_eq!(summary.bands[1].external_band, Some(2));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["srid"], 4326);
        assert_eq!(json["bands"][0]["pixel_type"], "16BSI");
        assert_eq!(json["bands"][1]["path"], "/data/dem.tif");
        assert!(json["bands"][0].get("path").is_none());
        assert_eq!(json["envelope"]["max_x"], 2.0);
    }
}
