//! Pixel searches over a band

use serde::Serialize;

use super::{Band, NodataMatch};
use crate::error::Result;
use crate::types::flt_eq;

/// A located pixel value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PixelHit {
    pub x: i64,
    pub y: i64,
    pub value: f64,
    /// Set for cells outside a band that has no NODATA value
    pub is_nodata: bool,
}

impl<'a> Band<'a> {
    /// Collects the cells on square rings around `(x, y)`, growing one cell
    /// per step up to the given per-axis distances. With both distances 0
    /// the search grows until a ring yields at least one cell, bounded by
    /// the band extent.
    ///
    /// Cells outside the band are reported with the NODATA value (or the
    /// type minimum when the band has none) and count as NODATA.
    pub fn nearest_pixel(
        &self,
        x: i32,
        y: i32,
        distance_x: u16,
        distance_y: u16,
        exclude_nodata: bool,
    ) -> Result<Vec<PixelHit>> {
        let width = i64::from(self.width);
        let height = i64::from(self.height);
        let mut x = i64::from(x);
        let mut y = i64::from(y);
        let mut distance = [i64::from(distance_x), i64::from(distance_y)];
        let unbounded = distance_x == 0 && distance_y == 0;
        let mut exclude = exclude_nodata;

        if exclude && (x < 0 || x > width || y < 0 || y > height) {
            if unbounded {
                // jump next to the band
                if x < 0 {
                    x = -1;
                } else if x > width {
                    x = width;
                }
                if y < 0 {
                    y = -1;
                } else if y > height {
                    y = height;
                }
            } else if (x < 0 && x.abs() > distance[0])
                || x - width >= distance[0]
                || (y < 0 && y.abs() > distance[1])
                || y - height >= distance[1]
            {
                return Ok(Vec::new());
            }
        }

        if !self.has_nodata {
            exclude = false;
        } else if exclude && self.is_nodata {
            log::debug!("Band is NODATA and NODATA is excluded, no nearest pixels");
            return Ok(Vec::new());
        }

        if unbounded {
            distance[0] = x.abs().max((x - width).abs());
            distance[1] = y.abs().max((y - height).abs());
        }

        let outside_value = if self.has_nodata {
            self.nodata
        } else {
            self.min_value()
        };
        let max_extent = [
            x - distance[0],
            y - distance[1],
            x + distance[0],
            y + distance[1],
        ];

        let mut hits = Vec::new();
        let visit = |cx: i64, cy: i64, hits: &mut Vec<PixelHit>| -> Result<()> {
            if cx < max_extent[0] || cx > max_extent[2] || cy < max_extent[1] || cy > max_extent[3] {
                return Ok(());
            }

            let inside = cx >= 0 && cx < width && cy >= 0 && cy < height;
            let (value, is_nodata) = if inside {
                self.get_pixel(cx as usize, cy as usize)?
            } else {
                (outside_value, true)
            };

            if !exclude || !is_nodata {
                hits.push(PixelHit {
                    x: cx,
                    y: cy,
                    value,
                    is_nodata: !inside && !self.has_nodata,
                });
            }
            Ok(())
        };

        let mut step = 0i64;
        loop {
            step += 1;
            let extent = [x - step, y - step, x + step, y + step];

            // top and bottom rows, corners included
            for row in [extent[1], extent[3]] {
                for cx in extent[0]..=extent[2] {
                    visit(cx, row, &mut hits)?;
                }
            }

            // left and right columns between the rows
            for col in [extent[0], extent[2]] {
                for cy in extent[1] + 1..extent[3] {
                    visit(col, cy, &mut hits)?;
                }
            }

            if step >= distance[0] && step >= distance[1] {
                break;
            }
            if unbounded && !hits.is_empty() {
                break;
            }
        }

        Ok(hits)
    }

    /// Every cell whose value matches one of `search`, scanning columns
    /// then rows. A match needs both the clamped values and the raw values
    /// to agree.
    pub fn pixel_of_value(&self, search: &[f64], exclude_nodata: bool) -> Result<Vec<PixelHit>> {
        let mut exclude = exclude_nodata;
        if !self.has_nodata {
            exclude = false;
        } else if exclude && self.is_nodata {
            return Ok(Vec::new());
        }

        let mut hits = Vec::new();
        for x in 0..self.width {
            for y in 0..self.height {
                let (value, is_nodata) = self.get_pixel(x.into(), y.into())?;
                if exclude && is_nodata {
                    continue;
                }

                for &wanted in search {
                    if self.pixtype.clamped_equal(wanted, value) && flt_eq(value, wanted) {
                        hits.push(PixelHit {
                            x: x.into(),
                            y: y.into(),
                            value,
                            is_nodata: false,
                        });
                    }
                }
            }
        }
        Ok(hits)
    }

    /// Counts cells whose value is NODATA
    pub fn count_nodata(&self) -> Result<usize> {
        if !self.has_nodata {
            return Ok(0);
        }
        if self.is_nodata {
            return Ok(self.pixel_count());
        }
        let size = self.pixtype.size();
        let data = self.data()?;
        Ok(data[..self.data_len()]
            .chunks_exact(size)
            .filter(|px| self.clamped_value_is_nodata(self.pixtype.decode(px)) != NodataMatch::No)
            .count())
    }
}

#[cfg(test)]
mod tests {
    use crate::band::Band;
    use crate::types::PixelType;

    fn numbered(width: u16, height: u16, nodata: Option<f64>) -> Band<'static> {
        let mut band = Band::new_owned(width, height, PixelType::Int16, nodata);
        for y in 0..height as usize {
            for x in 0..width as usize {
                band.set_pixel(x, y, (y * width as usize + x) as f64 + 1.0).unwrap();
            }
        }
        band
    }

    #[test]
    fn test_nearest_first_ring() {
        let band = numbered(5, 5, None);
        let hits = band.nearest_pixel(2, 2, 1, 1, false).unwrap();
        assert_eq!(hits.len(), 8);
        assert!(hits.iter().all(|h| (h.x - 2).abs() <= 1 && (h.y - 2).abs() <= 1));
        assert!(!hits.iter().any(|h| h.x == 2 && h.y == 2));
        // top-left corner of the ring comes first
        assert_eq!((hits[0].x, hits[0].y), (1, 1));
    }

    #[test]
    fn test_nearest_two_rings() {
        let band = numbered(5, 5, None);
        let hits = band.nearest_pixel(2, 2, 2, 2, false).unwrap();
        assert_eq!(hits.len(), 24);
    }

    #[test]
    fn test_nearest_outside_cells_without_nodata() {
        let band = numbered(3, 3, None);
        let hits = band.nearest_pixel(0, 0, 1, 1, false).unwrap();
        assert_eq!(hits.len(), 8);
        let outside: Vec<_> = hits.iter().filter(|h| h.x < 0 || h.y < 0).collect();
        assert_eq!(outside.len(), 5);
        assert!(outside.iter().all(|h| h.is_nodata && h.value == PixelType::Int16.min_value()));
        assert!(hits.iter().filter(|h| h.x >= 0 && h.y >= 0).all(|h| !h.is_nodata));
    }

    #[test]
    fn test_nearest_excludes_nodata() {
        let mut band = numbered(3, 3, Some(-1.0));
        band.set_pixel(1, 0, -1.0).unwrap();
        let hits = band.nearest_pixel(0, 0, 1, 1, true).unwrap();
        let coords: Vec<_> = hits.iter().map(|h| (h.x, h.y)).collect();
        assert_eq!(coords, vec![(0, 1), (1, 1)]);
    }

    #[test]
    fn test_nearest_unbounded_stops_at_first_hit() {
        let mut band = Band::new_owned(5, 5, PixelType::UInt8, Some(0.0));
        band.set_pixel(4, 4, 9.0).unwrap();
        let hits = band.nearest_pixel(0, 0, 0, 0, true).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].x, hits[0].y, hits[0].value), (4, 4, 9.0));
    }

    #[test]
    fn test_nearest_out_of_reach() {
        let band = numbered(3, 3, Some(-1.0));
        assert!(band.nearest_pixel(-10, 1, 2, 2, true).unwrap().is_empty());
        assert!(band.nearest_pixel(1, 20, 2, 2, true).unwrap().is_empty());
    }

    #[test]
    fn test_nearest_past_i32_range() {
        let band = numbered(3, 3, None);
        let hits = band.nearest_pixel(i32::MAX, i32::MIN, 1, 1, false).unwrap();
        assert_eq!(hits.len(), 8);
        assert!(hits.iter().any(|h| h.x == i64::from(i32::MAX) + 1));
        assert!(hits.iter().any(|h| h.y == i64::from(i32::MIN) - 1));
        assert!(hits.iter().all(|h| h.is_nodata));
    }

    #[test]
    fn test_nearest_on_nodata_band() {
        let mut band = numbered(3, 3, Some(-1.0));
        band.set_is_nodata(true).unwrap();
        assert!(band.nearest_pixel(1, 1, 1, 1, true).unwrap().is_empty());
        assert_eq!(band.nearest_pixel(1, 1, 1, 1, false).unwrap().len(), 8);
    }

    #[test]
    fn test_pixel_of_value() {
        let mut band = numbered(3, 2, Some(0.0));
        band.set_pixel(2, 1, 2.0).unwrap();
        let hits = band.pixel_of_value(&[2.0, 5.0], true).unwrap();
        let coords: Vec<_> = hits.iter().map(|h| (h.x, h.y)).collect();
        assert_eq!(coords, vec![(1, 0), (1, 1), (2, 1)]);
        assert!(hits.iter().all(|h| !h.is_nodata));
    }

    #[test]
    fn test_pixel_of_value_needs_raw_match() {
        let band = numbered(2, 1, None);
        assert!(band.pixel_of_value(&[1.4], false).unwrap().is_empty());
        assert_eq!(band.pixel_of_value(&[1.0], false).unwrap().len(), 1);
    }

    #[test]
    fn test_count_nodata() {
        let mut band = Band::new_owned(2, 2, PixelType::UInt8, Some(3.0));
        assert_eq!(band.count_nodata().unwrap(), 0);
        band.set_pixel(0, 0, 3.0).unwrap();
        assert_eq!(band.count_nodata().unwrap(), 1);
        band.set_is_nodata(true).unwrap();
        assert_eq!(band.count_nodata().unwrap(), 4);
    }
}
