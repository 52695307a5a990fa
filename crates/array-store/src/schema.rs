//! The persisted layout of a store: dimensions, variables and attributes.

use grid_common::{AttributeValue, Attributes, DataType, Dimension, GridArray, Variable};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Everything a store knows about its structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSchema {
    pub dimensions: Vec<Dimension>,
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub global_attributes: Attributes,
}

impl StoreSchema {
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn unlimited_dimension(&self) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.unlimited)
    }

    /// Current shape of `var`.
    pub fn shape_of(&self, var: &Variable) -> Vec<usize> {
        var.dimensions
            .iter()
            .map(|d| self.dimension(d).map(|dim| dim.length).unwrap_or(0))
            .collect()
    }

    /// True if `var` grows along the unlimited dimension.
    pub fn is_record_variable(&self, var: &Variable) -> bool {
        match (self.unlimited_dimension(), var.dimensions.first()) {
            (Some(unlimited), Some(first)) => unlimited.name == *first,
            _ => false,
        }
    }

    pub(crate) fn add_dimension(&mut self, dimension: Dimension) -> StoreResult<()> {
        if self.dimension(&dimension.name).is_some() {
            return Err(StoreError::AlreadyExists(dimension.name));
        }
        if dimension.unlimited {
            if let Some(existing) = self.unlimited_dimension() {
                return Err(StoreError::InvalidSchema(format!(
                    "cannot add unlimited dimension '{}', '{}' is already unlimited",
                    dimension.name, existing.name
                )));
            }
        }
        self.dimensions.push(dimension);
        Ok(())
    }

    pub(crate) fn add_variable(
        &mut self,
        name: &str,
        data_type: DataType,
        dimensions: &[String],
    ) -> StoreResult<()> {
        if self.variable(name).is_some() {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        for (i, dim) in dimensions.iter().enumerate() {
            let dimension = self
                .dimension(dim)
                .ok_or_else(|| StoreError::UnknownDimension(dim.clone()))?;
            if dimension.unlimited && i != 0 {
                return Err(StoreError::InvalidSchema(format!(
                    "unlimited dimension '{}' must be the first dimension of '{}'",
                    dim, name
                )));
            }
        }
        self.variables
            .push(Variable::new(name, data_type, dimensions.iter().cloned()));
        Ok(())
    }

    pub(crate) fn set_variable_attribute(
        &mut self,
        variable: &str,
        name: &str,
        value: AttributeValue,
    ) -> StoreResult<()> {
        let var = self
            .variables
            .iter_mut()
            .find(|v| v.name == variable)
            .ok_or_else(|| StoreError::UnknownVariable(variable.to_string()))?;
        var.attributes.set(name, value);
        Ok(())
    }

    pub(crate) fn variable_or_err(&self, name: &str) -> StoreResult<&Variable> {
        self.variable(name)
            .ok_or_else(|| StoreError::UnknownVariable(name.to_string()))
    }

    /// Check a block write and return the unlimited length it requires, if
    /// it extends the unlimited dimension.
    pub(crate) fn plan_write(
        &self,
        variable: &str,
        origin: &[usize],
        data: &GridArray,
    ) -> StoreResult<Option<usize>> {
        let var = self.variable_or_err(variable)?;
        if data.data_type() != var.data_type {
            return Err(StoreError::TypeMismatch {
                variable: variable.to_string(),
                expected: var.data_type,
                actual: data.data_type(),
            });
        }
        self.check_rank(var, origin, data.shape())?;

        let bounds = self.shape_of(var);
        let record = self.is_record_variable(var);
        let mut grows_to = None;
        for (d, (&o, &n)) in origin.iter().zip(data.shape()).enumerate() {
            let end = o + n;
            if d == 0 && record {
                if end > bounds[0] {
                    grows_to = Some(end);
                }
            } else if end > bounds[d] {
                return Err(StoreError::OutOfBounds {
                    variable: variable.to_string(),
                    origin: origin.to_vec(),
                    shape: data.shape().to_vec(),
                    bounds,
                });
            }
        }
        Ok(grows_to)
    }

    /// Check a block read against the variable's current shape.
    pub(crate) fn check_read(
        &self,
        variable: &str,
        origin: &[usize],
        shape: &[usize],
    ) -> StoreResult<&Variable> {
        let var = self.variable_or_err(variable)?;
        self.check_rank(var, origin, shape)?;
        let bounds = self.shape_of(var);
        if origin
            .iter()
            .zip(shape)
            .zip(&bounds)
            .any(|((o, n), b)| o + n > *b)
        {
            return Err(StoreError::OutOfBounds {
                variable: variable.to_string(),
                origin: origin.to_vec(),
                shape: shape.to_vec(),
                bounds,
            });
        }
        Ok(var)
    }

    fn check_rank(&self, var: &Variable, origin: &[usize], shape: &[usize]) -> StoreResult<()> {
        for actual in [origin.len(), shape.len()] {
            if actual != var.rank() {
                return Err(StoreError::RankMismatch {
                    variable: var.name.clone(),
                    expected: var.rank(),
                    actual,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn set_unlimited_length(&mut self, length: usize) {
        if let Some(dim) = self.dimensions.iter_mut().find(|d| d.unlimited) {
            dim.length = length;
        }
    }

    /// Check that the unlimited dimension can be frozen at `length`.
    pub(crate) fn check_fix(&self, length: usize) -> StoreResult<()> {
        match self.unlimited_dimension() {
            Some(dim) if length > dim.length => Err(StoreError::InvalidSchema(format!(
                "cannot fix '{}' at {} records, it holds {}",
                dim.name, length, dim.length
            ))),
            _ => Ok(()),
        }
    }

    /// Turn the unlimited dimension into a fixed one at its current length.
    pub(crate) fn fix_unlimited(&mut self) -> Option<&Dimension> {
        let dim = self.dimensions.iter_mut().find(|d| d.unlimited)?;
        dim.unlimited = false;
        Some(dim)
    }
}

/// Visit every element of a block of `shape` placed at `origin` inside an
/// array of shape `full`, as `(block_index, full_index)` pairs in row-major
/// order.
pub(crate) fn for_each_element(
    origin: &[usize],
    shape: &[usize],
    full: &[usize],
    mut f: impl FnMut(usize, usize),
) {
    let rank = shape.len();
    if rank == 0 {
        f(0, 0);
        return;
    }
    let total: usize = shape.iter().product();
    if total == 0 {
        return;
    }

    let mut strides = vec![1usize; rank];
    for d in (0..rank - 1).rev() {
        strides[d] = strides[d + 1] * full[d + 1];
    }

    let mut index = vec![0usize; rank];
    for block_index in 0..total {
        let full_index = (0..rank)
            .map(|d| (origin[d] + index[d]) * strides[d])
            .sum();
        f(block_index, full_index);

        for d in (0..rank).rev() {
            index[d] += 1;
            if index[d] < shape[d] {
                break;
            }
            index[d] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> StoreSchema {
        let mut schema = StoreSchema::default();
        schema.add_dimension(Dimension::unlimited("time", 0)).unwrap();
        schema.add_dimension(Dimension::fixed("y", 2)).unwrap();
        schema.add_dimension(Dimension::fixed("x", 3)).unwrap();
        schema
            .add_variable("t", DataType::Float, &["time".to_string(), "y".to_string(), "x".to_string()])
            .unwrap();
        schema
    }

    #[test]
    fn test_single_unlimited_dimension() {
        let mut schema = schema();
        assert!(matches!(
            schema.add_dimension(Dimension::unlimited("record", 0)),
            Err(StoreError::InvalidSchema(_))
        ));
        assert!(matches!(
            schema.add_dimension(Dimension::fixed("x", 9)),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_unlimited_must_lead() {
        let mut schema = schema();
        let err = schema
            .add_variable("bad", DataType::Float, &["y".to_string(), "time".to_string()])
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidSchema(_)));
    }

    #[test]
    fn test_plan_write_growth_and_bounds() {
        let schema = schema();
        let block = GridArray::filled(DataType::Float, vec![1, 2, 3]);
        assert_eq!(schema.plan_write("t", &[4, 0, 0], &block).unwrap(), Some(5));

        let wide = GridArray::filled(DataType::Float, vec![1, 2, 4]);
        assert!(matches!(
            schema.plan_write("t", &[0, 0, 0], &wide),
            Err(StoreError::OutOfBounds { .. })
        ));

        let flat = GridArray::filled(DataType::Float, vec![2, 3]);
        assert!(matches!(
            schema.plan_write("t", &[0, 0], &flat),
            Err(StoreError::RankMismatch { .. })
        ));

        let doubles = GridArray::filled(DataType::Double, vec![1, 2, 3]);
        assert!(matches!(
            schema.plan_write("t", &[0, 0, 0], &doubles),
            Err(StoreError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_for_each_element_offsets() {
        let mut pairs = Vec::new();
        for_each_element(&[1, 1], &[2, 2], &[3, 4], |b, f| pairs.push((b, f)));
        assert_eq!(pairs, vec![(0, 5), (1, 6), (2, 9), (3, 10)]);
    }
}
