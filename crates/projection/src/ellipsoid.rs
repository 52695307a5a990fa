//! Earth figure parameters.

use grid_common::CoordinateSystem;

/// An oblate ellipsoid (a sphere when both axes are equal). Metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub semi_major_axis: f64,
    pub semi_minor_axis: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        semi_major_axis: 6378137.0,
        semi_minor_axis: 6356752.314245,
    };

    pub fn sphere(radius: f64) -> Self {
        Self {
            semi_major_axis: radius,
            semi_minor_axis: radius,
        }
    }

    /// Read the earth shape from CF grid-mapping parameters.
    ///
    /// Recognises `earth_radius`, or `semi_major_axis` together with
    /// `semi_minor_axis` or `inverse_flattening` (a lone `semi_major_axis`
    /// is a sphere). Returns `None` when no shape is given.
    pub fn from_parameters(cs: &CoordinateSystem) -> Option<Self> {
        if let Some(r) = cs.parameter_f64("earth_radius") {
            return Some(Self::sphere(r));
        }
        let a = cs.parameter_f64("semi_major_axis")?;
        if let Some(b) = cs.parameter_f64("semi_minor_axis") {
            return Some(Self {
                semi_major_axis: a,
                semi_minor_axis: b,
            });
        }
        match cs.parameter_f64("inverse_flattening") {
            Some(inv_f) if inv_f > 0.0 => Some(Self {
                semi_major_axis: a,
                semi_minor_axis: a * (1.0 - 1.0 / inv_f),
            }),
            _ => Some(Self::sphere(a)),
        }
    }

    /// Radius used by the spherical projections.
    pub fn radius(&self) -> f64 {
        self.semi_major_axis
    }
}
