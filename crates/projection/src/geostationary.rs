//! Geostationary satellite projection.
//!
//! The satellite views Earth from a fixed position above the equator, and
//! coordinates are scan angles in radians from nadir.
//!
//! Reference: GOES-R Product Definition and Users' Guide (PUG) Volume 4

use crate::ellipsoid::Ellipsoid;

/// Axis the instrument sweeps along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAxis {
    /// GOES-R
    X,
    /// Meteosat, Himawari
    Y,
}

/// Geostationary projection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Geostationary {
    /// Satellite height above Earth center (meters)
    /// This is perspective_point_height + semi_major_axis
    pub h: f64,
    /// Perspective point height above Earth surface (meters)
    pub perspective_point_height: f64,
    /// Semi-major axis of Earth ellipsoid (meters)
    pub req: f64,
    /// Semi-minor axis of Earth ellipsoid (meters)
    pub rpol: f64,
    /// Longitude of satellite nadir point (radians)
    pub lambda_0: f64,
    pub sweep: SweepAxis,
}

impl Geostationary {
    /// Build from CF `geostationary` grid-mapping parameters.
    pub fn new(
        perspective_point_height: f64,
        ellipsoid: Ellipsoid,
        longitude_origin_deg: f64,
        sweep: SweepAxis,
    ) -> Self {
        Self {
            h: perspective_point_height + ellipsoid.semi_major_axis,
            perspective_point_height,
            req: ellipsoid.semi_major_axis,
            rpol: ellipsoid.semi_minor_axis,
            lambda_0: longitude_origin_deg.to_radians(),
            sweep,
        }
    }

    /// GOES-16 (GOES-East at 75°W) fixed grid.
    pub fn goes16() -> Self {
        Self::new(
            35786023.0,
            Ellipsoid {
                semi_major_axis: 6378137.0,
                semi_minor_axis: 6356752.31414,
            },
            -75.0,
            SweepAxis::X,
        )
    }

    /// Convert scan angles (radians) to geographic coordinates (lon, lat degrees).
    ///
    /// Based on GOES-R PUG Volume 4, Section 4.2.8.
    /// Returns None if the scan angle points to space (off Earth).
    pub fn scan_to_geo(&self, x_rad: f64, y_rad: f64) -> Option<(f64, f64)> {
        let (x_rad, y_rad) = match self.sweep {
            SweepAxis::X => (x_rad, y_rad),
            SweepAxis::Y => y_sweep_to_x_sweep(x_rad, y_rad),
        };

        let sin_x = x_rad.sin();
        let cos_x = x_rad.cos();
        let sin_y = y_rad.sin();
        let cos_y = y_rad.cos();

        // Quadratic coefficients for finding distance to Earth surface
        let a = sin_x.powi(2)
            + cos_x.powi(2) * (cos_y.powi(2) + (self.req / self.rpol).powi(2) * sin_y.powi(2));
        let b = -2.0 * self.h * cos_x * cos_y;
        let c = self.h.powi(2) - self.req.powi(2);

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let rs = (-b - discriminant.sqrt()) / (2.0 * a);

        let sx = rs * cos_x * cos_y;
        let sy = -rs * sin_x;
        let sz = rs * cos_x * sin_y;

        let lat = ((self.req / self.rpol).powi(2) * sz / (self.h - sx).hypot(sy)).atan();
        let lon = self.lambda_0 - sy.atan2(self.h - sx);

        Some((lon.to_degrees(), lat.to_degrees()))
    }

    /// Convert geographic coordinates (lon, lat degrees) to x-sweep scan angles.
    ///
    /// Returns None if the point is not visible from the satellite.
    pub fn geo_to_scan(&self, lon_deg: f64, lat_deg: f64) -> Option<(f64, f64)> {
        let lat_rad = lat_deg.to_radians();
        let lon_rad = lon_deg.to_radians();

        let dlon = lon_rad - self.lambda_0;
        let cos_c = lat_rad.cos() * dlon.cos();
        let horizon_angle = (self.req / self.h).acos();
        if cos_c.acos() > horizon_angle {
            return None;
        }

        // Geocentric latitude
        let phi_c = ((self.rpol / self.req).powi(2) * lat_rad.tan()).atan();
        let e2 = 1.0 - (self.rpol / self.req).powi(2);
        let rc = self.rpol / (1.0 - e2 * phi_c.cos().powi(2)).sqrt();

        let sx = self.h - rc * phi_c.cos() * dlon.cos();
        let sy = -rc * phi_c.cos() * dlon.sin();
        let sz = rc * phi_c.sin();
        if sx <= 0.0 {
            return None;
        }

        let y_rad = sz.atan2(sx.hypot(sy));
        let x_rad = (-sy).atan2(sx);
        Some((x_rad, y_rad))
    }
}

/// Re-express y-sweep scan angles as the x-sweep angles of the same view ray.
fn y_sweep_to_x_sweep(x_rad: f64, y_rad: f64) -> (f64, f64) {
    let vy = x_rad.tan();
    let vz = y_rad.tan() * vy.hypot(1.0);
    let y = vz.atan();
    let x = (vy / vz.hypot(1.0)).atan();
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nadir() {
        let proj = Geostationary::goes16();
        let (lon, lat) = proj.scan_to_geo(0.0, 0.0).unwrap();
        assert!((lon + 75.0).abs() < 1e-9, "Nadir longitude should be -75, got {}", lon);
        assert!(lat.abs() < 1e-9, "Nadir latitude should be 0, got {}", lat);
    }

    #[test]
    fn test_scan_roundtrip() {
        let proj = Geostationary::goes16();
        let (x, y) = proj.geo_to_scan(-95.0, 39.0).unwrap();
        let (lon, lat) = proj.scan_to_geo(x, y).unwrap();
        assert!((lon + 95.0).abs() < 1e-6, "lon roundtrip failed: {}", lon);
        assert!((lat - 39.0).abs() < 1e-6, "lat roundtrip failed: {}", lat);
    }

    #[test]
    fn test_off_earth() {
        let proj = Geostationary::goes16();
        assert!(proj.scan_to_geo(0.5, 0.5).is_none());
    }

    #[test]
    fn test_not_visible() {
        let proj = Geostationary::goes16();
        assert!(proj.geo_to_scan(180.0, 0.0).is_none());
    }

    #[test]
    fn test_sweep_axes_agree_on_axes() {
        // Along either scan axis both sweep conventions see the same ray.
        let x_sweep = Geostationary::goes16();
        let mut y_sweep = x_sweep.clone();
        y_sweep.sweep = SweepAxis::Y;

        for (x, y) in [(0.05, 0.0), (0.0, 0.05)] {
            let a = x_sweep.scan_to_geo(x, y).unwrap();
            let b = y_sweep.scan_to_geo(x, y).unwrap();
            assert!((a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9);
        }

        let a = x_sweep.scan_to_geo(0.05, 0.05).unwrap();
        let b = y_sweep.scan_to_geo(0.05, 0.05).unwrap();
        assert!((a.0 - b.0).abs() > 1e-6 || (a.1 - b.1).abs() > 1e-6);
    }
}
