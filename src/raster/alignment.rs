//! Pixel grid alignment tests

use super::{Georeference, Raster};
use crate::error::Result;
use crate::types::flt_eq;

impl Georeference {
    /// Tests whether the grid of `self` coincides with the grid of `other`,
    /// returning the verdict with a textual reason.
    pub fn alignment_with(&self, other: &Georeference) -> Result<(bool, &'static str)> {
        if self.srid != other.srid {
            return Ok((false, "The rasters have different SRIDs"));
        }
        if !flt_eq(self.scale_x().abs(), other.scale_x().abs()) {
            return Ok((false, "The rasters have different scales on the X axis"));
        }
        if !flt_eq(self.scale_y().abs(), other.scale_y().abs()) {
            return Ok((false, "The rasters have different scales on the Y axis"));
        }
        if !flt_eq(self.skew_x(), other.skew_x()) {
            return Ok((false, "The rasters have different skews on the X axis"));
        }
        if !flt_eq(self.skew_y(), other.skew_y()) {
            return Ok((false, "The rasters have different skews on the Y axis"));
        }

        // upper-left corner of self, snapped to a cell of other and back
        let (col, row) = other.geopoint_to_cell(self.upper_left_x(), self.upper_left_y())?;
        let (x, y) = other.cell_to_geopoint(col, row);
        if flt_eq(x, self.upper_left_x()) && flt_eq(y, self.upper_left_y()) {
            Ok((true, "The rasters are aligned"))
        } else {
            Ok((false, "The rasters (pixel corner coordinates) are not aligned"))
        }
    }
}

impl<'a> Raster<'a> {
    /// Alignment test with the reason for the verdict
    pub fn same_alignment_with_reason(a: &Raster<'_>, b: &Raster<'_>) -> Result<(bool, &'static str)> {
        a.georeference().alignment_with(b.georeference())
    }

    /// True when both rasters share SRID, absolute scales, skews and
    /// pixel corner positions
    pub fn same_alignment(a: &Raster<'_>, b: &Raster<'_>) -> Result<bool> {
        Self::same_alignment_with_reason(a, b).map(|(aligned, _)| aligned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(ulx: f64, uly: f64) -> Raster<'static> {
        let mut r = Raster::new(10, 10).unwrap();
        r.set_offsets(ulx, uly);
        r
    }

    #[test]
    fn test_identical_grids_align() {
        let a = raster(0.0, 0.0);
        let b = raster(0.0, 0.0);
        assert_eq!(
            Raster::same_alignment_with_reason(&a, &b).unwrap(),
            (true, "The rasters are aligned")
        );
    }

    #[test]
    fn test_shifted_by_whole_cells_aligns() {
        let a = raster(3.0, -7.0);
        let b = raster(0.0, 0.0);
        assert!(Raster::same_alignment(&a, &b).unwrap());
    }

    #[test]
    fn test_half_cell_shift_does_not_align() {
        let a = raster(0.5, 0.0);
        let b = raster(0.0, 0.0);
        assert_eq!(
            Raster::same_alignment_with_reason(&a, &b).unwrap(),
            (false, "The rasters (pixel corner coordinates) are not aligned")
        );
    }

    #[test]
    fn test_reasons_in_order() {
        let base = raster(0.0, 0.0);

        let mut other = raster(0.0, 0.0);
        other.set_srid(4326);
        other.set_scale(2.0, -2.0);
        assert_eq!(
            Raster::same_alignment_with_reason(&base, &other).unwrap().1,
            "The rasters have different SRIDs"
        );

        let mut other = raster(0.0, 0.0);
        other.set_scale(2.0, -1.0);
        assert_eq!(
            Raster::same_alignment_with_reason(&base, &other).unwrap().1,
            "The rasters have different scales on the X axis"
        );

        let mut other = raster(0.0, 0.0);
        other.set_scale(1.0, -3.0);
        assert_eq!(
            Raster::same_alignment_with_reason(&base, &other).unwrap().1,
            "The rasters have different scales on the Y axis"
        );

        let mut other = raster(0.0, 0.0);
        other.set_skews(0.5, 0.0);
        assert_eq!(
            Raster::same_alignment_with_reason(&base, &other).unwrap().1,
            "The rasters have different skews on the X axis"
        );

        let mut other = raster(0.0, 0.0);
        other.set_skews(0.0, 0.5);
        assert_eq!(
            Raster::same_alignment_with_reason(&base, &other).unwrap().1,
            "The rasters have different skews on the Y axis"
        );
    }

    #[test]
    fn test_scale_sign_is_ignored() {
        let a = raster(0.0, 0.0);
        let mut b = raster(0.0, 0.0);
        b.set_scale(-1.0, 1.0);
        assert!(Raster::same_alignment(&a, &b).unwrap());
    }
}
