//! Lambert Conformal Conic projection (spherical).
//!
//! Maps a cone tangent or secant to the Earth onto a plane. Projected
//! coordinates are metres from the projection origin, offset by the
//! false easting/northing.
//!
//! CF parameters:
//! - `standard_parallel`: one value (tangent cone) or two (secant cone)
//! - `longitude_of_central_meridian`
//! - `latitude_of_projection_origin`
//! - `false_easting`, `false_northing` (default 0)

use std::f64::consts::PI;

/// Lambert Conformal Conic projection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LambertConformal {
    /// Central meridian in radians
    pub lon0: f64,
    /// Latitude of the projection origin in radians
    pub lat0: f64,
    /// First standard parallel in radians
    pub latin1: f64,
    /// Second standard parallel in radians
    pub latin2: f64,
    /// Earth radius (meters)
    pub earth_radius: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    /// Cone constant (n)
    n: f64,
    /// F constant
    f: f64,
    /// Rho at the projection origin
    rho0: f64,
}

fn tan_half(lat: f64) -> f64 {
    (PI / 4.0 + lat / 2.0).tan()
}

impl LambertConformal {
    /// Build from degrees. Equal parallels give a tangent cone.
    pub fn new(
        lon0_deg: f64,
        lat0_deg: f64,
        latin1_deg: f64,
        latin2_deg: f64,
        earth_radius: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let lon0 = lon0_deg.to_radians();
        let lat0 = lat0_deg.to_radians();
        let latin1 = latin1_deg.to_radians();
        let latin2 = latin2_deg.to_radians();

        let n = if (latin1 - latin2).abs() < 1e-10 {
            latin1.sin()
        } else {
            let ln_ratio = (latin1.cos() / latin2.cos()).ln();
            let tan_ratio = (tan_half(latin2) / tan_half(latin1)).ln();
            ln_ratio / tan_ratio
        };

        let f = (latin1.cos() * tan_half(latin1).powf(n)) / n;
        let rho0 = earth_radius * f / tan_half(lat0).powf(n);

        Self {
            lon0,
            lat0,
            latin1,
            latin2,
            earth_radius,
            false_easting,
            false_northing,
            n,
            f,
            rho0,
        }
    }

    /// Geographic (degrees) to projected metres.
    pub fn project(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let mut dlon = lon_deg.to_radians() - self.lon0;
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }

        let rho = self.earth_radius * self.f / tan_half(lat).powf(self.n);
        let theta = self.n * dlon;

        let x = rho * theta.sin() + self.false_easting;
        let y = self.rho0 - rho * theta.cos() + self.false_northing;
        (x, y)
    }

    /// Projected metres to geographic (lon, lat) degrees.
    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let x = x - self.false_easting;
        let dy = self.rho0 - (y - self.false_northing);
        let sign = self.n.signum();

        let rho = sign * (x * x + dy * dy).sqrt();
        let theta = (sign * x).atan2(sign * dy);

        let lat = if rho == 0.0 {
            sign * PI / 2.0
        } else {
            2.0 * (self.earth_radius * self.f / rho).powf(1.0 / self.n).atan() - PI / 2.0
        };
        let lon = self.lon0 + theta / self.n;

        (lon.to_degrees(), lat.to_degrees())
    }
}
