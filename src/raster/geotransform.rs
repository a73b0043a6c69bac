//! Affine georeference helpers
//!
//! A [`GeoTransform`] uses the GDAL coefficient order:
//!
//! ```text
//! [upper_left_x, scale_x, skew_x, upper_left_y, skew_y, scale_y]
//! ```
//!
//! so that `x = gt[0] + col * gt[1] + row * gt[2]` and
//! `y = gt[3] + col * gt[4] + row * gt[5]`.

use std::f64::consts::{FRAC_PI_2, PI};

use serde::Serialize;

use crate::error::{Error, Result};

/// Six affine coefficients in GDAL order
pub type GeoTransform = [f64; 6];

/// North-up unit grid anchored at the origin
pub const DEFAULT_GEOTRANSFORM: GeoTransform = [0.0, 1.0, 0.0, 0.0, 0.0, -1.0];

/// Extension methods on [`GeoTransform`]
pub trait GeoTransformEx {
    /// Maps a (column, row) position to world coordinates
    fn apply(&self, col: f64, row: f64) -> (f64, f64);

    /// Computes the inverse transform mapping world coordinates to cells
    fn invert(&self) -> Result<GeoTransform>;
}

impl GeoTransformEx for GeoTransform {
    fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self[0] + col * self[1] + row * self[2],
            self[3] + col * self[4] + row * self[5],
        )
    }

    fn invert(&self) -> Result<GeoTransform> {
        let gt = self;

        // No rotation: invert each axis on its own.
        if gt[2] == 0.0 && gt[4] == 0.0 && gt[1] != 0.0 && gt[5] != 0.0 {
            return Ok([
                -gt[0] / gt[1],
                1.0 / gt[1],
                0.0,
                -gt[3] / gt[5],
                0.0,
                1.0 / gt[5],
            ]);
        }

        let det = gt[1] * gt[5] - gt[2] * gt[4];
        let magnitude = gt[1].abs().max(gt[2].abs()).max(gt[4].abs().max(gt[5].abs()));
        if det.abs() <= 1e-10 * magnitude * magnitude {
            return Err(Error::invalid("Geotransform is not invertible"));
        }

        let inv_det = 1.0 / det;
        Ok([
            (gt[2] * gt[3] - gt[0] * gt[5]) * inv_det,
            gt[5] * inv_det,
            -gt[2] * inv_det,
            (-gt[1] * gt[3] + gt[0] * gt[4]) * inv_det,
            -gt[4] * inv_det,
            gt[1] * inv_det,
        ])
    }
}

/// Pixel geometry described by basis-vector lengths and angles
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhysicalParams {
    /// Pixel size along the column (i) basis vector
    pub i_mag: f64,
    /// Pixel size along the row (j) basis vector
    pub j_mag: f64,
    /// Rotation of the i basis vector from the x axis, in radians
    pub theta_i: f64,
    /// Angle between the i and j basis vectors, in radians
    pub theta_ij: f64,
}

impl PhysicalParams {
    /// Derives the physical description from scale and skew coefficients
    pub fn from_coefficients(scale_x: f64, skew_x: f64, skew_y: f64, scale_y: f64) -> Self {
        let i_mag = (scale_x * scale_x + skew_y * skew_y).sqrt();
        let j_mag = (skew_x * skew_x + scale_y * scale_y).sqrt();

        let mut theta_i = (scale_x / i_mag).acos();
        if (skew_y / i_mag).acos() < FRAC_PI_2 {
            theta_i = -theta_i;
        }

        let mut theta_ij = ((scale_x * skew_x + skew_y * scale_y) / (i_mag * j_mag)).acos();
        if ((-skew_y * skew_x + scale_x * scale_y) / (i_mag * j_mag)).acos() > FRAC_PI_2 {
            theta_ij = -theta_ij;
        }

        Self {
            i_mag,
            j_mag,
            theta_i,
            theta_ij,
        }
    }

    /// Converts back to `(scale_x, skew_x, skew_y, scale_y)`.
    ///
    /// Collinear basis vectors (`theta_ij` of 0 or π) have no affine
    /// representation.
    pub fn to_coefficients(&self) -> Result<(f64, f64, f64, f64)> {
        if self.theta_ij == 0.0 || self.theta_ij == PI {
            return Err(Error::Unsupported(format!(
                "Angle between basis vectors ({}) must not be 0 or pi",
                self.theta_ij
            )));
        }

        let f = if self.theta_ij < 0.0 { -1.0 } else { 1.0 };
        let k_i = (f * FRAC_PI_2 - self.theta_ij).tan();
        let s_i = self.i_mag;
        let s_j = self.j_mag / (k_i * k_i + 1.0).sqrt();
        let (sin_i, cos_i) = self.theta_i.sin_cos();

        Ok((
            s_i * cos_i,
            k_i * s_j * f * cos_i + s_j * f * sin_i,
            -s_i * sin_i,
            -k_i * s_j * f * sin_i + s_j * f * cos_i,
        ))
    }
}

/// Spatial reference id meaning "unknown"
pub const SRID_UNKNOWN: i32 = 0;

const SRID_MAXIMUM: i32 = 999_999;
const SRID_USER_MAXIMUM: i32 = 998_999;

/// Folds an SRID into the accepted range: non-positive ids become
/// [`SRID_UNKNOWN`] and ids above the maximum wrap into the user range.
pub fn clamp_srid(srid: i32) -> i32 {
    if srid <= 0 {
        if srid != SRID_UNKNOWN {
            log::info!("SRID value {} converted to the officially unknown SRID value {}", srid, SRID_UNKNOWN);
        }
        SRID_UNKNOWN
    } else if srid > SRID_MAXIMUM {
        let folded = SRID_USER_MAXIMUM + 1 + (srid % (SRID_MAXIMUM - SRID_USER_MAXIMUM - 1));
        log::info!("SRID value {} > SRID_MAXIMUM converted to {}", srid, folded);
        folded
    } else {
        srid
    }
}

/// The grid placement a raster shares with all of its bands
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Georeference {
    pub geotransform: GeoTransform,
    pub srid: i32,
}

impl Default for Georeference {
    fn default() -> Self {
        Self {
            geotransform: DEFAULT_GEOTRANSFORM,
            srid: SRID_UNKNOWN,
        }
    }
}

impl Georeference {
    pub fn new(geotransform: GeoTransform, srid: i32) -> Self {
        Self {
            geotransform,
            srid: clamp_srid(srid),
        }
    }

    pub fn scale_x(&self) -> f64 {
        self.geotransform[1]
    }

    pub fn scale_y(&self) -> f64 {
        self.geotransform[5]
    }

    pub fn skew_x(&self) -> f64 {
        self.geotransform[2]
    }

    pub fn skew_y(&self) -> f64 {
        self.geotransform[4]
    }

    pub fn upper_left_x(&self) -> f64 {
        self.geotransform[0]
    }

    pub fn upper_left_y(&self) -> f64 {
        self.geotransform[3]
    }

    /// World coordinates of a (possibly fractional) cell corner
    pub fn cell_to_geopoint(&self, col: f64, row: f64) -> (f64, f64) {
        self.geotransform.apply(col, row)
    }

    /// Inverse transform, recomputed on every call
    pub fn inverse(&self) -> Result<GeoTransform> {
        self.geotransform.invert()
    }

    /// Cell containing a world coordinate; near-integer results round, others floor
    pub fn geopoint_to_cell(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let (col, row) = self.inverse()?.apply(x, y);
        Ok((snap_cell(col), snap_cell(row)))
    }
}

/// Snaps a fractional cell index: values within float tolerance of an
/// integer round to it, everything else floors.
pub(crate) fn snap_cell(value: f64) -> f64 {
    let rounded = value.round();
    if crate::types::flt_eq(rounded, value) {
        rounded
    } else {
        value.floor()
    }
}
