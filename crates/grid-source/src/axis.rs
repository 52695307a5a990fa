//! Coordinate axes exposed by grid sources.

use chrono::{DateTime, Utc};
use grid_common::CfTimeUnits;

use crate::error::{AxisError, AxisKind};

/// A coordinate variable as stored in the source, before any rank checks.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAxis {
    pub kind: AxisKind,
    pub variable_name: String,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    /// Row-major values.
    pub values: Vec<f64>,
    pub units: Option<String>,
}

impl RawAxis {
    fn require_1d(&self) -> Result<(), AxisError> {
        if self.shape.len() != 1 || self.dimensions.len() != 1 {
            return Err(AxisError::NotOneDimensional {
                kind: self.kind,
                variable: self.variable_name.clone(),
                rank: self.shape.len(),
            });
        }
        Ok(())
    }
}

/// A one-dimensional spatial coordinate axis.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateAxis {
    pub kind: AxisKind,
    pub variable_name: String,
    pub dimension: String,
    pub values: Vec<f64>,
    pub units: Option<String>,
}

impl CoordinateAxis {
    /// Accept a raw axis only if it is one-dimensional.
    pub fn try_from_raw(raw: RawAxis) -> Result<Self, AxisError> {
        raw.require_1d()?;
        let RawAxis {
            kind,
            variable_name,
            mut dimensions,
            values,
            units,
            ..
        } = raw;
        Ok(Self {
            kind,
            variable_name,
            dimension: dimensions.remove(0),
            values,
            units,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values scaled to metres when the axis is in kilometres.
    pub fn values_in_metres(&self) -> Vec<f64> {
        match self.units.as_deref() {
            Some("km") | Some("kilometer") | Some("kilometers") | Some("kilometre") => {
                self.values.iter().map(|v| v * 1000.0).collect()
            }
            _ => self.values.clone(),
        }
    }
}

/// A one-dimensional time axis with its calendar times.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    pub variable_name: String,
    pub dimension: String,
    /// Raw offsets as stored in the source.
    pub values: Vec<f64>,
    pub units: CfTimeUnits,
}

impl TimeAxis {
    /// Accept a raw axis only if it is one-dimensional with CF time units.
    pub fn try_from_raw(raw: RawAxis) -> Result<Self, AxisError> {
        raw.require_1d()?;
        let units_text = raw.units.clone().unwrap_or_default();
        let units = CfTimeUnits::parse(&units_text).map_err(|_| AxisError::InvalidTimeUnits {
            variable: raw.variable_name.clone(),
            units: units_text,
        })?;
        let RawAxis {
            variable_name,
            mut dimensions,
            values,
            ..
        } = raw;
        Ok(Self {
            variable_name,
            dimension: dimensions.remove(0),
            values,
            units,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Calendar time of step `index`.
    pub fn time_at(&self, index: usize) -> Option<DateTime<Utc>> {
        self.values.get(index).map(|v| self.units.to_datetime(*v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(kind: AxisKind, dims: &[&str], shape: Vec<usize>, units: Option<&str>) -> RawAxis {
        let len = shape.iter().product();
        RawAxis {
            kind,
            variable_name: "v".to_string(),
            dimensions: dims.iter().map(|d| d.to_string()).collect(),
            shape,
            values: (0..len).map(|i| i as f64).collect(),
            units: units.map(str::to_string),
        }
    }

    #[test]
    fn test_two_dimensional_axis_rejected() {
        let err = CoordinateAxis::try_from_raw(raw(AxisKind::X, &["y", "x"], vec![2, 3], None))
            .unwrap_err();
        assert!(matches!(err, AxisError::NotOneDimensional { rank: 2, .. }));
    }

    #[test]
    fn test_km_axis_scaled() {
        let axis =
            CoordinateAxis::try_from_raw(raw(AxisKind::X, &["x"], vec![3], Some("km"))).unwrap();
        assert_eq!(axis.dimension, "x");
        assert_eq!(axis.values_in_metres(), vec![0.0, 1000.0, 2000.0]);
    }

    #[test]
    fn test_time_axis_calendar() {
        let axis = TimeAxis::try_from_raw(raw(
            AxisKind::Time,
            &["time"],
            vec![3],
            Some("hours since 2024-01-15 00:00:00"),
        ))
        .unwrap();
        assert_eq!(
            axis.time_at(2),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 2, 0, 0).unwrap())
        );
        assert_eq!(axis.time_at(3), None);
    }

    #[test]
    fn test_time_axis_requires_units() {
        let err = TimeAxis::try_from_raw(raw(AxisKind::Time, &["time"], vec![2], Some("level")))
            .unwrap_err();
        assert!(matches!(err, AxisError::InvalidTimeUnits { .. }));
    }
}
