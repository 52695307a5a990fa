//! Common grid sources for rolling archive tests.
//!
//! All sources share one layout: an unlimited `time` dimension followed by
//! `y` and `x`, 1-D coordinate variables for each, and record grids shaped
//! `(time, y, x)`.

use grid_common::{CoordinateSystem, DataType, Variable};
use grid_source::{AxisKind, MemoryGridSource};

use crate::generators::{axis_values, create_time_series_grid};

/// Variable and dimension names used by the fixtures.
pub mod names {
    pub const TEMP: &str = "temp";
    pub const RH: &str = "rh";
    pub const TIME: &str = "time";
    pub const X: &str = "x";
    pub const Y: &str = "y";
    /// Units of every fixture time axis.
    pub const TIME_UNITS: &str = "hours since 2024-01-15 00:00:00";
}

/// Common grid specifications for testing.
pub mod grid {
    /// A regular grid in degrees.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct GridSpec {
        pub nx: usize,
        pub ny: usize,
        pub x0: f64,
        pub dx: f64,
        pub y0: f64,
        pub dy: f64,
    }

    impl GridSpec {
        pub fn size(&self) -> usize {
            self.nx * self.ny
        }
    }

    /// 4 columns by 3 rows.
    pub const SMALL: GridSpec = GridSpec {
        nx: 4,
        ny: 3,
        x0: -100.0,
        dx: 0.5,
        y0: 35.0,
        dy: 0.5,
    };

    /// 2 by 2.
    pub const TINY: GridSpec = GridSpec {
        nx: 2,
        ny: 2,
        x0: 10.0,
        dx: 10.0,
        y0: 30.0,
        dy: 10.0,
    };
}

use grid::GridSpec;

fn temp_variable() -> Variable {
    Variable::new(names::TEMP, DataType::Float, [names::TIME, names::Y, names::X])
        .with_attribute("units", "K")
        .with_attribute("long_name", "Temperature")
}

fn rh_variable() -> Variable {
    Variable::new(names::RH, DataType::Float, [names::TIME, names::Y, names::X])
        .with_attribute("units", "%")
        .with_attribute("long_name", "Relative humidity")
}

/// A forecast file holding `steps` hourly steps of `temp` and `rh`,
/// starting at hour `first_step`.
///
/// `temp` values follow [`create_time_series_grid`] with step numbers
/// `first_step..first_step + steps`; `rh` holds the same values negated.
pub fn forecast_source(
    location: &str,
    spec: &GridSpec,
    first_step: usize,
    steps: usize,
) -> MemoryGridSource {
    let temp = create_time_series_grid(first_step, steps, spec.nx, spec.ny);
    let rh: Vec<f64> = temp.iter().map(|v| -v).collect();
    MemoryGridSource::builder(location)
        .unlimited_dimension(names::TIME, steps)
        .dimension(names::Y, spec.ny)
        .dimension(names::X, spec.nx)
        .global_attribute("title", "Synthetic forecast")
        .global_attribute("institution", "test-utils")
        .coordinate_system(CoordinateSystem::latitude_longitude())
        .axis(
            AxisKind::Time,
            names::TIME,
            axis_values(first_step as f64, 1.0, steps),
            Some(names::TIME_UNITS),
        )
        .axis(
            AxisKind::Y,
            names::Y,
            axis_values(spec.y0, spec.dy, spec.ny),
            Some("degrees_north"),
        )
        .axis(
            AxisKind::X,
            names::X,
            axis_values(spec.x0, spec.dx, spec.nx),
            Some("degrees_east"),
        )
        .grid_f64(temp_variable(), &temp)
        .grid_f64(rh_variable(), &rh)
        .build()
        .expect("forecast fixture is consistent")
}

/// The prototype used to define archives: one step of a forecast.
pub fn prototype_source(spec: &GridSpec) -> MemoryGridSource {
    forecast_source("mem://prototype", spec, 0, 1)
}

/// Prototype with dimensions `time` (unlimited), `y=3`, `x=4`, a single
/// grid `temp(time, y, x)` and X/Y coordinate variables only.
pub fn scenario_prototype() -> MemoryGridSource {
    let spec = grid::SMALL;
    let temp = create_time_series_grid(0, 1, spec.nx, spec.ny);
    MemoryGridSource::builder("mem://scenario")
        .unlimited_dimension(names::TIME, 1)
        .dimension(names::Y, spec.ny)
        .dimension(names::X, spec.nx)
        .coordinate_system(CoordinateSystem::latitude_longitude())
        .axis(
            AxisKind::Y,
            names::Y,
            axis_values(spec.y0, spec.dy, spec.ny),
            Some("degrees_north"),
        )
        .axis(
            AxisKind::X,
            names::X,
            axis_values(spec.x0, spec.dx, spec.nx),
            Some("degrees_east"),
        )
        .grid_f64(temp_variable(), &temp)
        .build()
        .expect("scenario fixture is consistent")
}

/// Equirectangular grid mapping on a sphere of radius `180 / π`, so one
/// projected unit is one degree and there is no origin offset.
pub fn unit_equirectangular() -> CoordinateSystem {
    CoordinateSystem::new("equirectangular")
        .with_parameter("earth_radius", 180.0 / std::f64::consts::PI)
        .with_parameter("longitude_of_central_meridian", 0.0)
        .with_parameter("standard_parallel", 0.0)
        .with_parameter("false_easting", 0.0)
        .with_parameter("false_northing", 0.0)
}

/// A one-step prototype on `spec` whose X/Y axes are in the
/// [`unit_equirectangular`] projection.
pub fn equirectangular_prototype(spec: &GridSpec) -> MemoryGridSource {
    let temp = create_time_series_grid(0, 1, spec.nx, spec.ny);
    MemoryGridSource::builder("mem://equirectangular")
        .unlimited_dimension(names::TIME, 1)
        .dimension(names::Y, spec.ny)
        .dimension(names::X, spec.nx)
        .coordinate_system(unit_equirectangular())
        .axis(AxisKind::Y, names::Y, axis_values(spec.y0, spec.dy, spec.ny), Some("m"))
        .axis(AxisKind::X, names::X, axis_values(spec.x0, spec.dx, spec.nx), Some("m"))
        .grid_f64(temp_variable(), &temp)
        .build()
        .expect("equirectangular fixture is consistent")
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_source::GridSource;

    #[test]
    fn test_forecast_layout() {
        let source = forecast_source("mem://f", &grid::SMALL, 3, 2);
        assert_eq!(source.grid_names(), vec![names::TEMP, names::RH]);
        assert_eq!(source.dimension(names::TIME).unwrap().length, 2);
        let slice = source.read_slice(names::TEMP, 1).unwrap();
        assert_eq!(slice.shape(), &[3, 4]);
        assert_eq!(slice.to_f64_vec()[0], crate::step_value(4, 0, 0));
    }

    #[test]
    fn test_scenario_prototype_variables() {
        let source = scenario_prototype();
        let vars: Vec<&str> = source.variables().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(vars, vec![names::Y, names::X, names::TEMP]);
    }
}
