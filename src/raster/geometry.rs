//! Raster outlines as `geo_types` geometries

use geo_types::{Coord, Geometry, LineString, Point, Polygon};
use serde::Serialize;

use super::Raster;

/// Axis-aligned bounds in world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Envelope {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

/// A geometry with the spatial reference id of the raster it came from
#[derive(Debug, Clone, PartialEq)]
pub struct SridGeometry {
    pub srid: i32,
    pub geometry: Geometry<f64>,
}

impl<'a> Raster<'a> {
    fn corner(&self, col: f64, row: f64) -> Coord<f64> {
        let (x, y) = self.cell_to_geopoint(col, row);
        Coord { x, y }
    }

    /// Bounds of the four corner cells
    pub fn envelope(&self) -> Envelope {
        let w = f64::from(self.width);
        let h = f64::from(self.height);
        let corners = [
            self.corner(0.0, 0.0),
            self.corner(0.0, h),
            self.corner(w, h),
            self.corner(w, 0.0),
        ];

        let mut env = Envelope {
            min_x: corners[0].x,
            max_x: corners[0].x,
            min_y: corners[0].y,
            max_y: corners[0].y,
        };
        for c in &corners[1..] {
            env.min_x = env.min_x.min(c.x);
            env.max_x = env.max_x.max(c.x);
            env.min_y = env.min_y.min(c.y);
            env.max_y = env.max_y.max(c.y);
        }
        env
    }

    /// Point or line for rasters with an empty dimension
    fn degenerate_outline(&self) -> Option<Geometry<f64>> {
        let upper_left = self.corner(0.0, 0.0);
        match (self.width, self.height) {
            (0, 0) => Some(Geometry::Point(Point(upper_left))),
            (0, _) | (_, 0) => {
                let far = self.corner(f64::from(self.width), f64::from(self.height));
                Some(Geometry::LineString(LineString(vec![upper_left, far])))
            }
            _ => None,
        }
    }

    fn tagged(&self, geometry: Geometry<f64>) -> SridGeometry {
        SridGeometry {
            srid: self.srid(),
            geometry,
        }
    }

    /// The envelope as a closed ring starting at (min_x, max_y)
    pub fn envelope_geometry(&self) -> SridGeometry {
        if let Some(outline) = self.degenerate_outline() {
            return self.tagged(outline);
        }

        let env = self.envelope();
        let ring = LineString(vec![
            Coord { x: env.min_x, y: env.max_y },
            Coord { x: env.max_x, y: env.max_y },
            Coord { x: env.max_x, y: env.min_y },
            Coord { x: env.min_x, y: env.min_y },
            Coord { x: env.min_x, y: env.max_y },
        ]);
        self.tagged(Geometry::Polygon(Polygon::new(ring, vec![])))
    }

    /// Footprint of the raster including rotation, clockwise from the
    /// upper-left corner
    pub fn convex_hull(&self) -> SridGeometry {
        if let Some(outline) = self.degenerate_outline() {
            return self.tagged(outline);
        }

        let w = f64::from(self.width);
        let h = f64::from(self.height);
        let upper_left = self.corner(0.0, 0.0);
        let ring = LineString(vec![
            upper_left,
            self.corner(w, 0.0),
            self.corner(w, h),
            self.corner(0.0, h),
            upper_left,
        ]);
        self.tagged(Geometry::Polygon(Polygon::new(ring, vec![])))
    }

    /// Outline of one cell. `x` and `y` may lie outside the raster.
    pub fn pixel_as_polygon(&self, x: i32, y: i32) -> SridGeometry {
        let gt = self.geotransform();
        let (scale_x, skew_x, skew_y, scale_y) = (gt[1], gt[2], gt[4], gt[5]);
        let (x, y) = (f64::from(x), f64::from(y));

        let p0 = Coord {
            x: scale_x * x + skew_x * y + gt[0],
            y: scale_y * y + skew_y * x + gt[3],
        };
        let ring = LineString(vec![
            p0,
            Coord { x: p0.x + scale_x, y: p0.y + skew_y },
            Coord { x: p0.x + scale_x + skew_x, y: p0.y + scale_y + skew_y },
            Coord { x: p0.x + skew_x, y: p0.y + scale_y },
            p0,
        ]);
        self.tagged(Geometry::Polygon(Polygon::new(ring, vec![])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exterior(geom: &SridGeometry) -> Vec<(f64, f64)> {
        match &geom.geometry {
            Geometry::Polygon(p) => p.exterior().0.iter().map(|c| (c.x, c.y)).collect(),
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_envelope_north_up() {
        let mut raster = Raster::new(4, 2).unwrap();
        raster.set_offsets(10.0, 20.0);
        raster.set_scale(2.0, -3.0);
        assert_eq!(
            raster.envelope(),
            Envelope { min_x: 10.0, max_x: 18.0, min_y: 14.0, max_y: 20.0 }
        );
    }

    #[test]
    fn test_envelope_geometry_ring() {
        let mut raster = Raster::new(2, 2).unwrap();
        raster.set_srid(4326);
        let geom = raster.envelope_geometry();
        assert_eq!(geom.srid, 4326);
        assert_eq!(
            exterior(&geom),
            vec![(0.0, 0.0), (2.0, 0.0), (2.0, -2.0), (0.0, -2.0), (0.0, 0.0)]
        );
    }

    #[test]
    fn test_degenerate_outlines() {
        let raster = Raster::new(0, 0).unwrap();
        assert_eq!(raster.convex_hull().geometry, Geometry::Point(Point::new(0.0, 0.0)));

        let raster = Raster::new(3, 0).unwrap();
        match raster.envelope_geometry().geometry {
            Geometry::LineString(line) => {
                assert_eq!(line.0, vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 3.0, y: 0.0 }]);
            }
            other => panic!("expected line, got {:?}", other),
        }
    }

    #[test]
    fn test_convex_hull_rotated() {
        let mut raster = Raster::new(2, 1).unwrap();
        raster.set_skews(1.0, 1.0);
        assert_eq!(
            exterior(&raster.convex_hull()),
            vec![(0.0, 0.0), (2.0, 2.0), (3.0, 1.0), (1.0, -1.0), (0.0, 0.0)]
        );
    }

    #[test]
    fn test_pixel_as_polygon() {
        let mut raster = Raster::new(5, 5).unwrap();
        raster.set_offsets(100.0, 50.0);
        raster.set_scale(10.0, -10.0);
        assert_eq!(
            exterior(&raster.pixel_as_polygon(1, 2)),
            vec![(110.0, 30.0), (120.0, 30.0), (120.0, 20.0), (110.0, 20.0), (110.0, 30.0)]
        );
    }
}
