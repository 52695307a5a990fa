//! Mercator projection (spherical).

use std::f64::consts::PI;

/// Mercator projection with an optional true-scale latitude.
///
/// CF parameters: `longitude_of_projection_origin`, `standard_parallel` or
/// `scale_factor_at_projection_origin`, `false_easting`, `false_northing`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mercator {
    /// Central meridian in radians
    pub lon0: f64,
    /// Scale factor along the equator
    pub k0: f64,
    pub earth_radius: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl Mercator {
    pub fn new(
        lon0_deg: f64,
        k0: f64,
        earth_radius: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        Self {
            lon0: lon0_deg.to_radians(),
            k0,
            earth_radius,
            false_easting,
            false_northing,
        }
    }

    /// Scale factor for a standard parallel given in degrees.
    pub fn scale_for_parallel(lat_ts_deg: f64) -> f64 {
        lat_ts_deg.to_radians().cos()
    }

    pub fn project(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let r = self.earth_radius * self.k0;
        let x = r * (lon_deg.to_radians() - self.lon0) + self.false_easting;
        let y = r * (PI / 4.0 + lat_deg.to_radians() / 2.0).tan().ln() + self.false_northing;
        (x, y)
    }

    /// Projected metres to geographic (lon, lat) degrees.
    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let r = self.earth_radius * self.k0;
        let lon = self.lon0 + (x - self.false_easting) / r;
        let lat = 2.0 * ((y - self.false_northing) / r).exp().atan() - PI / 2.0;
        (lon.to_degrees(), lat.to_degrees())
    }
}
