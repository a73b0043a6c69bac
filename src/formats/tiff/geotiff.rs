//! GeoTIFF georeferencing

use super::ifd::Ifd;
use super::tags;
use crate::error::Result;
use crate::raster::GeoTransform;

/// Georeferencing tags read from an IFD
#[derive(Debug, Clone, Default)]
pub struct GeoInfo {
    /// Model pixel scale (ScaleX, ScaleY, ScaleZ)
    pub pixel_scale: Option<(f64, f64, f64)>,
    /// Raster to model tiepoints
    pub tiepoints: Vec<TiePoint>,
    /// Row-major 4x4 ModelTransformation matrix
    pub transformation: Option<[f64; 16]>,
    /// EPSG code from the GeoKey directory
    pub epsg_code: Option<u16>,
    /// GDAL NODATA tag value
    pub nodata: Option<f64>,
}

/// Maps a raster position to a model position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiePoint {
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub pixel_z: f64,
    pub geo_x: f64,
    pub geo_y: f64,
    pub geo_z: f64,
}

mod geo_keys {
    pub const GEOGRAPHIC_TYPE: u16 = 2048;
    pub const PROJECTED_CS_TYPE: u16 = 3072;
}

impl GeoInfo {
    /// Extracts georeferencing from an IFD, `None` when it has no GeoTIFF tags
    pub fn from_ifd(ifd: &Ifd) -> Result<Option<Self>> {
        if !ifd.is_geotiff() && ifd.get_entry(tags::GDAL_NODATA).is_none() {
            return Ok(None);
        }

        let mut info = GeoInfo::default();

        if let Some(entry) = ifd.get_entry(tags::MODEL_PIXEL_SCALE) {
            let values = entry.as_f64s()?;
            if values.len() >= 3 {
                info.pixel_scale = Some((values[0], values[1], values[2]));
            }
        }

        if let Some(entry) = ifd.get_entry(tags::MODEL_TIEPOINT) {
            info.tiepoints = entry
                .as_f64s()?
                .chunks_exact(6)
                .map(|c| TiePoint {
                    pixel_x: c[0],
                    pixel_y: c[1],
                    pixel_z: c[2],
                    geo_x: c[3],
                    geo_y: c[4],
                    geo_z: c[5],
                })
                .collect();
        }

        if let Some(entry) = ifd.get_entry(tags::MODEL_TRANSFORMATION) {
            let values = entry.as_f64s()?;
            if values.len() >= 16 {
                let mut matrix = [0.0; 16];
                matrix.copy_from_slice(&values[..16]);
                info.transformation = Some(matrix);
            }
        }

        if let Some(entry) = ifd.get_entry(tags::GEO_KEY_DIRECTORY) {
            let keys = entry.as_u64s()?;
            if keys.len() >= 4 {
                let num_keys = keys[3] as usize;
                for key in keys[4..].chunks_exact(4).take(num_keys) {
                    // location 0 means the value is stored in place
                    let (key_id, location, value) = (key[0] as u16, key[1], key[3]);
                    if location == 0
                        && matches!(key_id, geo_keys::GEOGRAPHIC_TYPE | geo_keys::PROJECTED_CS_TYPE)
                    {
                        info.epsg_code = Some(value as u16);
                    }
                }
            }
        }

        if let Some(entry) = ifd.get_entry(tags::GDAL_NODATA) {
            let text = entry.as_ascii();
            match text.trim().parse::<f64>() {
                Ok(value) => info.nodata = Some(value),
                Err(_) => log::warn!("Ignoring unparsable GDAL_NODATA value {:?}", text),
            }
        }

        Ok(Some(info))
    }

    /// Affine transform in GDAL order, from the transformation matrix or
    /// from pixel scale plus the first tiepoint
    pub fn affine_transform(&self) -> Option<GeoTransform> {
        if let Some(m) = &self.transformation {
            return Some([m[3], m[0], m[1], m[7], m[4], m[5]]);
        }

        let (scale_x, scale_y, _) = self.pixel_scale?;
        let tp = self.tiepoints.first()?;
        Some([
            tp.geo_x - scale_x * tp.pixel_x,
            scale_x,
            0.0,
            tp.geo_y + scale_y * tp.pixel_y,
            0.0,
            -scale_y,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::tiff::ifd::IfdEntry;
    use crate::formats::tiff::tags::field_types;
    use crate::io::ByteOrder;

    fn doubles(tag: u16, values: &[f64]) -> IfdEntry {
        let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        IfdEntry::new(tag, field_types::DOUBLE, values.len() as u64, bytes, ByteOrder::LittleEndian)
    }

    #[test]
    fn test_plain_tiff_has_no_geoinfo() {
        let ifd = Ifd::new(0, 8);
        assert!(GeoInfo::from_ifd(&ifd).unwrap().is_none());
    }

    #[test]
    fn test_scale_and_tiepoint() {
        let mut ifd = Ifd::new(0, 8);
        ifd.add_entry(doubles(tags::MODEL_PIXEL_SCALE, &[10.0, 5.0, 0.0]));
        ifd.add_entry(doubles(tags::MODEL_TIEPOINT, &[0.0, 0.0, 0.0, 500.0, 1000.0, 0.0]));

        let info = GeoInfo::from_ifd(&ifd).unwrap().unwrap();
        assert_eq!(info.affine_transform(), Some([500.0, 10.0, 0.0, 1000.0, 0.0, -5.0]));
    }

    #[test]
    fn test_tiepoint_off_origin() {
        let mut ifd = Ifd::new(0, 8);
        ifd.add_entry(doubles(tags::MODEL_PIXEL_SCALE, &[2.0, 2.0, 0.0]));
        ifd.add_entry(doubles(tags::MODEL_TIEPOINT, &[1.0, 1.0, 0.0, 12.0, 20.0, 0.0]));

        let gt = GeoInfo::from_ifd(&ifd).unwrap().unwrap().affine_transform().unwrap();
        assert_eq!(gt, [10.0, 2.0, 0.0, 22.0, 0.0, -2.0]);
    }

    #[test]
    fn test_model_transformation_wins() {
        let mut ifd = Ifd::new(0, 8);
        #[rustfmt::skip]
        let matrix = [
            1.5, 0.1, 0.0, 100.0,
            0.2, -1.5, 0.0, 200.0,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        ifd.add_entry(doubles(tags::MODEL_TRANSFORMATION, &matrix));
        ifd.add_entry(doubles(tags::MODEL_PIXEL_SCALE, &[9.0, 9.0, 0.0]));

        let gt = GeoInfo::from_ifd(&ifd).unwrap().unwrap().affine_transform().unwrap();
        assert_eq!(gt, [100.0, 1.5, 0.1, 200.0, 0.2, -1.5]);
    }

    #[test]
    fn test_epsg_and_nodata() {
        let mut ifd = Ifd::new(0, 8);
        let keys: Vec<u8> = [1u16, 1, 0, 1, 3072, 0, 1, 32633]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        ifd.add_entry(IfdEntry::new(tags::GEO_KEY_DIRECTORY, field_types::SHORT, 8, keys, ByteOrder::LittleEndian));
        ifd.add_entry(IfdEntry::new(tags::GDAL_NODATA, field_types::ASCII, 5, b"-9999\0".to_vec(), ByteOrder::LittleEndian));

        let info = GeoInfo::from_ifd(&ifd).unwrap().unwrap();
        assert_eq!(info.epsg_code, Some(32633));
        assert_eq!(info.nodata, Some(-9999.0));
        assert_eq!(info.affine_transform(), None);
    }
}
