//! CRS resolution and source-to-geographic transforms.
//!
//! [`GeodesyService`] is the seam the archive writer uses to turn the
//! native X/Y coordinates of a source grid into longitude/latitude.
//! [`CfGeodesy`] implements it for the CF grid mappings listed on [`Crs`].

use grid_common::CoordinateSystem;
use tracing::warn;

use crate::ellipsoid::Ellipsoid;
use crate::equirectangular::Equirectangular;
use crate::error::GeodesyError;
use crate::geostationary::{Geostationary, SweepAxis};
use crate::lambert::LambertConformal;
use crate::mercator::Mercator;

/// A resolved coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub enum Crs {
    /// Coordinates are already (lon, lat) degrees.
    LatitudeLongitude,
    Equirectangular(Equirectangular),
    Mercator(Mercator),
    LambertConformal(LambertConformal),
    /// Coordinates are scan angles in radians.
    Geostationary(Geostationary),
}

impl Crs {
    /// CF grid-mapping name of this CRS.
    pub fn mapping_name(&self) -> &'static str {
        match self {
            Crs::LatitudeLongitude => "latitude_longitude",
            Crs::Equirectangular(_) => "equirectangular",
            Crs::Mercator(_) => "mercator",
            Crs::LambertConformal(_) => "lambert_conformal_conic",
            Crs::Geostationary(_) => "geostationary",
        }
    }

    /// Inverse-project one point. `None` if it has no geographic image.
    pub fn to_geographic(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let (lon, lat) = match self {
            Crs::LatitudeLongitude => return Some((x, y)),
            Crs::Equirectangular(p) => p.unproject(x, y),
            Crs::Mercator(p) => p.unproject(x, y),
            Crs::LambertConformal(p) => p.unproject(x, y),
            Crs::Geostationary(p) => p.scan_to_geo(x, y)?,
        };
        if lon.is_finite() && lat.is_finite() {
            Some((normalize_longitude(lon), lat))
        } else {
            None
        }
    }
}

/// Wrap a longitude into [-180, 180).
pub fn normalize_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped.abs() < 1e-12 {
        0.0
    } else {
        wrapped
    }
}

/// Coordinate-system resolution and transformation.
pub trait GeodesyService {
    /// Resolve a CF grid-mapping description into a usable CRS.
    fn resolve_crs(&self, cs: &CoordinateSystem) -> Result<Crs, GeodesyError>;

    /// Transform interleaved `(x, y)` pairs into `(lon, lat)` pairs in place.
    fn transform_to_geographic(&self, crs: &Crs, points: &mut [f64]) -> Result<(), GeodesyError>;
}

/// CF grid-mapping geodesy.
///
/// Lenient mode (the default) assumes WGS84 when the earth shape is not
/// given and writes NaN for points without a geographic image. Strict mode
/// fails in both cases.
#[derive(Debug, Clone)]
pub struct CfGeodesy {
    pub lenient: bool,
}

impl Default for CfGeodesy {
    fn default() -> Self {
        Self { lenient: true }
    }
}

impl CfGeodesy {
    pub fn lenient() -> Self {
        Self { lenient: true }
    }

    pub fn strict() -> Self {
        Self { lenient: false }
    }

    fn ellipsoid(&self, cs: &CoordinateSystem) -> Result<Ellipsoid, GeodesyError> {
        match Ellipsoid::from_parameters(cs) {
            Some(e) => Ok(e),
            None if self.lenient => {
                warn!(
                    mapping = %cs.grid_mapping_name,
                    "No earth shape in grid mapping, assuming WGS84"
                );
                Ok(Ellipsoid::WGS84)
            }
            None => Err(GeodesyError::Transform(format!(
                "grid mapping '{}' has no earth shape parameters",
                cs.grid_mapping_name
            ))),
        }
    }
}

fn required(cs: &CoordinateSystem, name: &str) -> Result<f64, GeodesyError> {
    cs.parameter_f64(name).ok_or_else(|| {
        GeodesyError::resolution(&cs.grid_mapping_name, format!("missing parameter '{}'", name))
    })
}

fn optional(cs: &CoordinateSystem, name: &str) -> f64 {
    cs.parameter_f64(name).unwrap_or(0.0)
}

impl GeodesyService for CfGeodesy {
    fn resolve_crs(&self, cs: &CoordinateSystem) -> Result<Crs, GeodesyError> {
        let name = cs.grid_mapping_name.to_lowercase();
        match name.as_str() {
            "latitude_longitude" | "latitude_longitude_projection" => Ok(Crs::LatitudeLongitude),
            "equirectangular" | "equidistant_cylindrical" => {
                let e = self.ellipsoid(cs)?;
                Ok(Crs::Equirectangular(Equirectangular::new(
                    cs.parameter_f64("longitude_of_central_meridian")
                        .or_else(|| cs.parameter_f64("longitude_of_projection_origin"))
                        .unwrap_or(0.0),
                    optional(cs, "standard_parallel"),
                    e.radius(),
                    optional(cs, "false_easting"),
                    optional(cs, "false_northing"),
                )))
            }
            "mercator" => {
                let e = self.ellipsoid(cs)?;
                let k0 = match cs.parameter_f64("standard_parallel") {
                    Some(lat_ts) => Mercator::scale_for_parallel(lat_ts),
                    None => cs
                        .parameter_f64("scale_factor_at_projection_origin")
                        .unwrap_or(1.0),
                };
                Ok(Crs::Mercator(Mercator::new(
                    optional(cs, "longitude_of_projection_origin"),
                    k0,
                    e.radius(),
                    optional(cs, "false_easting"),
                    optional(cs, "false_northing"),
                )))
            }
            "lambert_conformal_conic" => {
                let parallels = cs.parameter_f64_vec("standard_parallel");
                let (latin1, latin2) = match parallels.as_slice() {
                    [p] => (*p, *p),
                    [p1, p2] => (*p1, *p2),
                    _ => {
                        return Err(GeodesyError::resolution(
                            &cs.grid_mapping_name,
                            format!("expected 1 or 2 standard parallels, found {}", parallels.len()),
                        ))
                    }
                };
                let lon0 = required(cs, "longitude_of_central_meridian")?;
                let lat0 = cs
                    .parameter_f64("latitude_of_projection_origin")
                    .unwrap_or(latin1);
                let e = self.ellipsoid(cs)?;
                Ok(Crs::LambertConformal(LambertConformal::new(
                    lon0,
                    lat0,
                    latin1,
                    latin2,
                    e.radius(),
                    optional(cs, "false_easting"),
                    optional(cs, "false_northing"),
                )))
            }
            "geostationary" => {
                let height = required(cs, "perspective_point_height")?;
                let lon0 = optional(cs, "longitude_of_projection_origin");
                let sweep = match cs.parameters.get_str("sweep_angle_axis") {
                    Some("y") => SweepAxis::Y,
                    Some("x") => SweepAxis::X,
                    Some(other) => {
                        return Err(GeodesyError::resolution(
                            &cs.grid_mapping_name,
                            format!("invalid sweep_angle_axis '{}'", other),
                        ))
                    }
                    None => match cs.parameters.get_str("fixed_angle_axis") {
                        Some("x") => SweepAxis::Y,
                        _ => SweepAxis::X,
                    },
                };
                let e = self.ellipsoid(cs)?;
                Ok(Crs::Geostationary(Geostationary::new(height, e, lon0, sweep)))
            }
            _ => Err(GeodesyError::resolution(
                &cs.grid_mapping_name,
                "unsupported grid mapping",
            )),
        }
    }

    fn transform_to_geographic(&self, crs: &Crs, points: &mut [f64]) -> Result<(), GeodesyError> {
        if points.len() % 2 != 0 {
            return Err(GeodesyError::Transform(format!(
                "point buffer length {} is not a whole number of (x, y) pairs",
                points.len()
            )));
        }

        let mut unmapped = 0usize;
        for pair in points.chunks_exact_mut(2) {
            match crs.to_geographic(pair[0], pair[1]) {
                Some((lon, lat)) => {
                    pair[0] = lon;
                    pair[1] = lat;
                }
                None if self.lenient => {
                    pair[0] = f64::NAN;
                    pair[1] = f64::NAN;
                    unmapped += 1;
                }
                None => {
                    return Err(GeodesyError::Transform(format!(
                        "point ({}, {}) has no geographic position in {}",
                        pair[0],
                        pair[1],
                        crs.mapping_name()
                    )))
                }
            }
        }

        if unmapped > 0 {
            warn!(
                crs = crs.mapping_name(),
                unmapped,
                total = points.len() / 2,
                "Points without a geographic position set to NaN"
            );
        }
        Ok(())
    }
}
