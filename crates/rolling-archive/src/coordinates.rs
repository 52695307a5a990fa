//! Projecting the prototype's X/Y axes to 2-D latitude/longitude.

use grid_common::{CommonResult, DataType, GridArray};
use grid_source::{CoordinateAxis, RawAxis};
use projection::{Crs, GeodesyError, GeodesyService};
use tracing::debug;

use crate::error::Result;

/// Latitude and longitude of every cell of a `ny × nx` grid, row-major by
/// Y then X.
#[derive(Debug, Clone, PartialEq)]
pub struct LatLonGrid {
    pub ny: usize,
    pub nx: usize,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
}

impl LatLonGrid {
    pub fn lat_at(&self, y: usize, x: usize) -> f64 {
        self.lat[y * self.nx + x]
    }

    pub fn lon_at(&self, y: usize, x: usize) -> f64 {
        self.lon[y * self.nx + x]
    }

    pub fn lat_array(&self) -> CommonResult<GridArray> {
        GridArray::from_f64(DataType::Double, vec![self.ny, self.nx], &self.lat)
    }

    pub fn lon_array(&self) -> CommonResult<GridArray> {
        GridArray::from_f64(DataType::Double, vec![self.ny, self.nx], &self.lon)
    }
}

/// Interleave `(x, y)` pairs with Y outer and X inner, so cell `(y, x)`
/// starts at index `2 * (y * nx + x)`.
pub fn interleave(x: &[f64], y: &[f64]) -> Vec<f64> {
    let mut points = Vec::with_capacity(2 * x.len() * y.len());
    for yv in y {
        for xv in x {
            points.push(*xv);
            points.push(*yv);
        }
    }
    points
}

/// Turns 1-D projected X/Y axes into 2-D geographic coordinates through a
/// [`GeodesyService`].
pub struct CoordinateProjector<'a, G: GeodesyService + ?Sized> {
    geodesy: &'a G,
}

impl<'a, G: GeodesyService + ?Sized> CoordinateProjector<'a, G> {
    pub fn new(geodesy: &'a G) -> Self {
        Self { geodesy }
    }

    /// Project axes as read from a source, rejecting axes that are not
    /// one-dimensional.
    pub fn project_raw(&self, x: RawAxis, y: RawAxis, crs: &Crs) -> Result<LatLonGrid> {
        let x = CoordinateAxis::try_from_raw(x)?;
        let y = CoordinateAxis::try_from_raw(y)?;
        Ok(self.project(&x, &y, crs)?)
    }

    /// Project one-dimensional axes. Kilometre axes are scaled to metres
    /// first.
    pub fn project(
        &self,
        x: &CoordinateAxis,
        y: &CoordinateAxis,
        crs: &Crs,
    ) -> std::result::Result<LatLonGrid, GeodesyError> {
        let (nx, ny) = (x.len(), y.len());
        let mut points = interleave(&x.values_in_metres(), &y.values_in_metres());
        self.geodesy.transform_to_geographic(crs, &mut points)?;

        let mut lat = Vec::with_capacity(nx * ny);
        let mut lon = Vec::with_capacity(nx * ny);
        for pair in points.chunks_exact(2) {
            lon.push(pair[0]);
            lat.push(pair[1]);
        }

        debug!(mapping = crs.mapping_name(), nx, ny, "Projected grid to lat/lon");
        Ok(LatLonGrid { ny, nx, lat, lon })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_source::AxisKind;
    use projection::{CfGeodesy, LambertConformal};

    fn axis(kind: AxisKind, values: Vec<f64>, units: Option<&str>) -> CoordinateAxis {
        let name = if kind == AxisKind::X { "x" } else { "y" };
        CoordinateAxis {
            kind,
            variable_name: name.to_string(),
            dimension: name.to_string(),
            values,
            units: units.map(str::to_string),
        }
    }

    #[test]
    fn test_interleave_order() {
        let points = interleave(&[1.0, 2.0, 3.0], &[10.0, 20.0]);
        assert_eq!(
            points,
            vec![1.0, 10.0, 2.0, 10.0, 3.0, 10.0, 1.0, 20.0, 2.0, 20.0, 3.0, 20.0]
        );
        // cell (y=1, x=2)
        assert_eq!(points[2 * (1 * 3 + 2)], 3.0);
        assert_eq!(points[2 * (1 * 3 + 2) + 1], 20.0);
    }

    #[test]
    fn test_latlon_identity_layout() {
        let geodesy = CfGeodesy::default();
        let x = axis(AxisKind::X, vec![-100.0, -99.0, -98.0], Some("degrees_east"));
        let y = axis(AxisKind::Y, vec![30.0, 31.0], Some("degrees_north"));
        let grid = CoordinateProjector::new(&geodesy)
            .project(&x, &y, &Crs::LatitudeLongitude)
            .unwrap();

        assert_eq!((grid.ny, grid.nx), (2, 3));
        assert_eq!(grid.lat, vec![30.0, 30.0, 30.0, 31.0, 31.0, 31.0]);
        assert_eq!(grid.lon_at(1, 2), -98.0);
        assert_eq!(grid.lat_array().unwrap().shape(), &[2, 3]);
    }

    #[test]
    fn test_km_axes_scaled_before_transform() {
        let geodesy = CfGeodesy::default();
        let lcc = LambertConformal::new(-97.5, 38.5, 38.5, 38.5, 6371229.0, 0.0, 0.0);
        let crs = Crs::LambertConformal(lcc);
        let metres = CoordinateProjector::new(&geodesy)
            .project(
                &axis(AxisKind::X, vec![0.0, 3000.0], Some("m")),
                &axis(AxisKind::Y, vec![0.0], Some("m")),
                &crs,
            )
            .unwrap();
        let km = CoordinateProjector::new(&geodesy)
            .project(
                &axis(AxisKind::X, vec![0.0, 3.0], Some("km")),
                &axis(AxisKind::Y, vec![0.0], Some("km")),
                &crs,
            )
            .unwrap();

        assert!((metres.lon_at(0, 0) + 97.5).abs() < 1e-9);
        assert!((metres.lat_at(0, 0) - 38.5).abs() < 1e-9);
        for (a, b) in metres.lon.iter().zip(&km.lon) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_project_raw_rejects_2d_axis() {
        let geodesy = CfGeodesy::default();
        let x = RawAxis {
            kind: AxisKind::X,
            variable_name: "x".to_string(),
            dimensions: vec!["y".to_string(), "x".to_string()],
            shape: vec![1, 2],
            values: vec![0.0, 1.0],
            units: None,
        };
        let y = RawAxis {
            kind: AxisKind::Y,
            variable_name: "y".to_string(),
            dimensions: vec!["y".to_string()],
            shape: vec![1],
            values: vec![0.0],
            units: None,
        };
        let err = CoordinateProjector::new(&geodesy)
            .project_raw(x, y, &Crs::LatitudeLongitude)
            .unwrap_err();
        assert!(matches!(err, crate::error::ArchiveError::Axis(_)));
    }
}
