//! Equirectangular (plate carrée) projection on a sphere.

/// `x = R·cos(φ1)·(λ − λ0)`, `y = R·φ`.
#[derive(Debug, Clone, PartialEq)]
pub struct Equirectangular {
    /// Central meridian in degrees
    pub lon0: f64,
    /// Standard parallel in degrees
    pub lat_ts: f64,
    pub earth_radius: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl Equirectangular {
    pub fn new(
        lon0: f64,
        lat_ts: f64,
        earth_radius: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        Self {
            lon0,
            lat_ts,
            earth_radius,
            false_easting,
            false_northing,
        }
    }

    /// Projected metres to geographic (lon, lat) degrees.
    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let scale_x = self.earth_radius * self.lat_ts.to_radians().cos();
        let lon = self.lon0 + ((x - self.false_easting) / scale_x).to_degrees();
        let lat = ((y - self.false_northing) / self.earth_radius).to_degrees();
        (lon, lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_unit_degree_radius() {
        // One projected unit per degree.
        let proj = Equirectangular::new(0.0, 0.0, 180.0 / PI, 0.0, 0.0);
        let (lon, lat) = proj.unproject(12.5, -40.0);
        assert!((lon - 12.5).abs() < 1e-9);
        assert!((lat + 40.0).abs() < 1e-9);
    }
}
