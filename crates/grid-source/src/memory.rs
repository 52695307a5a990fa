//! Grid sources held entirely in memory.

use std::collections::HashMap;

use grid_common::{
    ArrayValues, AttributeValue, Attributes, CoordinateSystem, DataType, Dimension, GridArray,
    Variable,
};

use crate::axis::RawAxis;
use crate::error::{AxisError, AxisKind, SourceError, SourceResult};
use crate::source::GridSource;

/// A fully materialised grid dataset.
#[derive(Debug, Clone)]
pub struct MemoryGridSource {
    location: String,
    dimensions: Vec<Dimension>,
    variables: Vec<Variable>,
    global_attributes: Attributes,
    coordinate_system: Option<CoordinateSystem>,
    grids: Vec<String>,
    axes: HashMap<AxisKind, String>,
    data: HashMap<String, GridArray>,
}

impl MemoryGridSource {
    pub fn builder(location: impl Into<String>) -> MemoryGridSourceBuilder {
        MemoryGridSourceBuilder::new(location)
    }

    /// Full array of a variable, if it has data.
    pub fn data(&self, name: &str) -> Option<&GridArray> {
        self.data.get(name)
    }

    fn raw_axis(&self, kind: AxisKind, name: &str) -> SourceResult<RawAxis> {
        let var = self.variable(name).ok_or_else(|| AxisError::Missing {
            kind,
            location: self.location.clone(),
        })?;
        let data = self.data.get(name).ok_or_else(|| {
            SourceError::InvalidData(format!("axis variable '{}' has no values", name))
        })?;
        Ok(RawAxis {
            kind,
            variable_name: var.name.clone(),
            dimensions: var.dimensions.clone(),
            shape: data.shape().to_vec(),
            values: data.to_f64_vec(),
            units: var.attributes.get_str("units").map(str::to_string),
        })
    }

    fn spatial_axis(&self, kind: AxisKind) -> SourceResult<RawAxis> {
        let name = self.axes.get(&kind).ok_or_else(|| AxisError::Missing {
            kind,
            location: self.location.clone(),
        })?;
        self.raw_axis(kind, name)
    }

    fn grid(&self, grid: &str) -> SourceResult<(&Variable, &GridArray)> {
        let not_found = || SourceError::GridNotFound {
            grid: grid.to_string(),
            location: self.location.clone(),
        };
        if !self.grids.iter().any(|g| g == grid) {
            return Err(not_found());
        }
        let var = self.variable(grid).ok_or_else(not_found)?;
        let data = self.data.get(grid).ok_or_else(not_found)?;
        Ok((var, data))
    }

    /// Position of the time dimension among `var`'s dimensions.
    fn time_position(&self, var: &Variable) -> SourceResult<usize> {
        let time_var = self.axes.get(&AxisKind::Time).and_then(|n| self.variable(n));
        time_var
            .and_then(|tv| tv.dimensions.first())
            .and_then(|dim| var.dimensions.iter().position(|d| d == dim))
            .ok_or_else(|| {
                SourceError::Axis(AxisError::Missing {
                    kind: AxisKind::Time,
                    location: format!("{} (grid '{}')", self.location, var.name),
                })
            })
    }
}

impl GridSource for MemoryGridSource {
    fn location(&self) -> &str {
        &self.location
    }

    fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    fn variables(&self) -> &[Variable] {
        &self.variables
    }

    fn global_attributes(&self) -> &Attributes {
        &self.global_attributes
    }

    fn grid_names(&self) -> Vec<String> {
        self.grids.clone()
    }

    fn coordinate_system(&self) -> Option<&CoordinateSystem> {
        self.coordinate_system.as_ref()
    }

    fn x_axis(&self) -> SourceResult<RawAxis> {
        self.spatial_axis(AxisKind::X)
    }

    fn y_axis(&self) -> SourceResult<RawAxis> {
        self.spatial_axis(AxisKind::Y)
    }

    fn time_axis(&self, grid: &str) -> SourceResult<RawAxis> {
        let (var, _) = self.grid(grid)?;
        self.time_position(var)?;
        let name = self.axes.get(&AxisKind::Time).ok_or_else(|| AxisError::Missing {
            kind: AxisKind::Time,
            location: self.location.clone(),
        })?;
        self.raw_axis(AxisKind::Time, name)
    }

    fn read_slice(&self, grid: &str, time_index: usize) -> SourceResult<GridArray> {
        let (var, data) = self.grid(grid)?;
        let t = self.time_position(var)?;
        let shape = data.shape();
        let steps = shape[t];
        if time_index >= steps {
            return Err(SourceError::TimeIndexOutOfRange {
                grid: grid.to_string(),
                index: time_index,
                len: steps,
            });
        }

        let outer: usize = shape[..t].iter().product();
        let inner: usize = shape[t + 1..].iter().product();
        let mut values = ArrayValues::filled(data.data_type(), 0);
        for o in 0..outer {
            let start = (o * steps + time_index) * inner;
            values.extend(&data.values().slice(start, start + inner))?;
        }

        let slice_shape: Vec<usize> = shape
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != t)
            .map(|(_, len)| *len)
            .collect();
        Ok(GridArray::new(slice_shape, values)?)
    }
}

/// Builds a [`MemoryGridSource`], checking every array against its
/// variable's dimensions.
#[derive(Debug)]
pub struct MemoryGridSourceBuilder {
    source: MemoryGridSource,
    error: Option<SourceError>,
}

impl MemoryGridSourceBuilder {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            source: MemoryGridSource {
                location: location.into(),
                dimensions: Vec::new(),
                variables: Vec::new(),
                global_attributes: Attributes::new(),
                coordinate_system: None,
                grids: Vec::new(),
                axes: HashMap::new(),
                data: HashMap::new(),
            },
            error: None,
        }
    }

    pub fn dimension(mut self, name: impl Into<String>, length: usize) -> Self {
        self.source.dimensions.push(Dimension::fixed(name, length));
        self
    }

    pub fn unlimited_dimension(mut self, name: impl Into<String>, length: usize) -> Self {
        self.source.dimensions.push(Dimension::unlimited(name, length));
        self
    }

    pub fn global_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.source.global_attributes.set(name, value);
        self
    }

    pub fn coordinate_system(mut self, cs: CoordinateSystem) -> Self {
        self.source.coordinate_system = Some(cs);
        self
    }

    /// A variable with optional data.
    pub fn variable(mut self, var: Variable, data: Option<GridArray>) -> Self {
        if let Some(data) = data {
            self.source.data.insert(var.name.clone(), data);
        }
        self.source.variables.push(var);
        self
    }

    /// A grid variable with its full data.
    pub fn grid(mut self, var: Variable, data: GridArray) -> Self {
        self.source.grids.push(var.name.clone());
        self.variable(var, Some(data))
    }

    /// A grid variable of `f64` values converted to the variable's type.
    pub fn grid_f64(mut self, var: Variable, values: &[f64]) -> Self {
        let shape = self.shape_of(&var);
        match GridArray::from_f64(var.data_type, shape, values) {
            Ok(data) => self.grid(var, data),
            Err(e) => {
                self.error.get_or_insert(e.into());
                self
            }
        }
    }

    /// An arbitrary variable used as the `kind` coordinate axis.
    pub fn axis_variable(mut self, kind: AxisKind, var: Variable, data: GridArray) -> Self {
        self.source.axes.insert(kind, var.name.clone());
        self.variable(var, Some(data))
    }

    /// A 1-D coordinate variable named after its dimension.
    pub fn axis(
        mut self,
        kind: AxisKind,
        name: impl Into<String>,
        values: Vec<f64>,
        units: Option<&str>,
    ) -> Self {
        let name = name.into();
        let mut var = Variable::new(&name, DataType::Double, [name.as_str()]);
        if let Some(units) = units {
            var.attributes.set("units", units);
        }
        let axis_attr = match kind {
            AxisKind::X => "X",
            AxisKind::Y => "Y",
            AxisKind::Time => "T",
        };
        var.attributes.set("axis", axis_attr);
        let len = values.len();
        match GridArray::new(vec![len], ArrayValues::Double(values)) {
            Ok(data) => self.axis_variable(kind, var, data),
            Err(e) => {
                self.error.get_or_insert(e.into());
                self
            }
        }
    }

    fn shape_of(&self, var: &Variable) -> Vec<usize> {
        var.dimensions
            .iter()
            .map(|d| {
                self.source
                    .dimensions
                    .iter()
                    .find(|dim| &dim.name == d)
                    .map(|dim| dim.length)
                    .unwrap_or(0)
            })
            .collect()
    }

    /// Validate and build.
    pub fn build(self) -> SourceResult<MemoryGridSource> {
        if let Some(err) = self.error {
            return Err(err);
        }
        for var in &self.source.variables {
            for dim in &var.dimensions {
                if !self.source.dimensions.iter().any(|d| &d.name == dim) {
                    return Err(SourceError::InvalidData(format!(
                        "variable '{}' uses undeclared dimension '{}'",
                        var.name, dim
                    )));
                }
            }
            if let Some(data) = self.source.data.get(&var.name) {
                let expected = self.shape_of(var);
                if data.shape() != expected.as_slice() && !(var.is_scalar() && data.len() == 1) {
                    return Err(SourceError::InvalidData(format!(
                        "variable '{}' has shape {:?}, dimensions give {:?}",
                        var.name,
                        data.shape(),
                        expected
                    )));
                }
            }
        }
        Ok(self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryGridSource {
        let temp = Variable::new("temp", DataType::Float, ["time", "y", "x"])
            .with_attribute("units", "K");
        let values: Vec<f64> = (0..2 * 2 * 3).map(|i| i as f64).collect();
        MemoryGridSource::builder("mem://sample")
            .dimension("time", 2)
            .dimension("y", 2)
            .dimension("x", 3)
            .axis(AxisKind::Time, "time", vec![0.0, 6.0], Some("hours since 2024-01-15"))
            .axis(AxisKind::Y, "y", vec![10.0, 20.0], Some("m"))
            .axis(AxisKind::X, "x", vec![1.0, 2.0, 3.0], Some("m"))
            .grid_f64(temp, &values)
            .build()
            .unwrap()
    }

    #[test]
    fn test_read_slice_leading_time() {
        let src = sample();
        let slice = src.read_slice("temp", 1).unwrap();
        assert_eq!(slice.shape(), &[2, 3]);
        assert_eq!(slice.to_f64_vec(), vec![6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
        assert!(matches!(
            src.read_slice("temp", 2),
            Err(SourceError::TimeIndexOutOfRange { len: 2, .. })
        ));
    }

    #[test]
    fn test_read_slice_inner_time() {
        let var = Variable::new("v", DataType::Double, ["y", "time"]);
        let src = MemoryGridSource::builder("mem://inner")
            .dimension("y", 2)
            .dimension("time", 3)
            .axis(AxisKind::Time, "time", vec![0.0, 1.0, 2.0], Some("days since 2000-01-01"))
            .grid_f64(var, &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0])
            .build()
            .unwrap();
        assert_eq!(src.read_slice("v", 2).unwrap().to_f64_vec(), vec![2.0, 12.0]);
    }

    #[test]
    fn test_axes_and_grids() {
        let src = sample();
        assert_eq!(src.grid_names(), vec!["temp".to_string()]);
        assert_eq!(src.primary_data_type(), Some(DataType::Float));
        assert_eq!(src.x_axis().unwrap().values, vec![1.0, 2.0, 3.0]);
        assert_eq!(src.time_axis("temp").unwrap().units.as_deref(), Some("hours since 2024-01-15"));
        assert!(matches!(
            src.time_axis("nope"),
            Err(SourceError::GridNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_axis() {
        let src = MemoryGridSource::builder("mem://bare").dimension("x", 1).build().unwrap();
        assert!(matches!(
            src.x_axis(),
            Err(SourceError::Axis(AxisError::Missing { kind: AxisKind::X, .. }))
        ));
    }

    #[test]
    fn test_build_rejects_bad_shape() {
        let var = Variable::new("v", DataType::Double, ["x"]);
        let result = MemoryGridSource::builder("mem://bad")
            .dimension("x", 3)
            .grid(var, GridArray::filled(DataType::Double, vec![2]))
            .build();
        assert!(matches!(result, Err(SourceError::InvalidData(_))));
    }
}
