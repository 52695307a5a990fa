//! In-process array store.

use std::collections::HashMap;

use grid_common::{ArrayValues, AttributeValue, DataType, Dimension, GridArray};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::schema::{for_each_element, StoreSchema};
use crate::store::{ArrayStore, StoreMode};

/// Keeps every variable in a flat row-major buffer.
///
/// Record variables (those leading with the unlimited dimension) grow by
/// appending fill values at the end of their buffer.
#[derive(Debug)]
pub struct MemoryArrayStore {
    schema: StoreSchema,
    buffers: HashMap<String, ArrayValues>,
    mode: StoreMode,
}

impl Default for MemoryArrayStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryArrayStore {
    pub fn new() -> Self {
        Self {
            schema: StoreSchema::default(),
            buffers: HashMap::new(),
            mode: StoreMode::Define,
        }
    }

    fn grow(&mut self, length: usize) -> StoreResult<()> {
        self.schema.set_unlimited_length(length);
        for var in &self.schema.variables {
            if !self.schema.is_record_variable(var) {
                continue;
            }
            let needed: usize = self.schema.shape_of(var).iter().product();
            if let Some(buffer) = self.buffers.get_mut(&var.name) {
                let missing = needed.saturating_sub(buffer.len());
                if missing > 0 {
                    buffer.extend(&ArrayValues::filled(var.data_type, missing))?;
                }
            }
        }
        Ok(())
    }
}

impl ArrayStore for MemoryArrayStore {
    fn mode(&self) -> StoreMode {
        self.mode
    }

    fn add_dimension(&mut self, name: &str, length: usize) -> StoreResult<()> {
        self.mode.require_define("add_dimension")?;
        self.schema.add_dimension(Dimension::fixed(name, length))
    }

    fn add_unlimited_dimension(&mut self, name: &str) -> StoreResult<()> {
        self.mode.require_define("add_unlimited_dimension")?;
        self.schema.add_dimension(Dimension::unlimited(name, 0))
    }

    fn add_variable(
        &mut self,
        name: &str,
        data_type: DataType,
        dimensions: &[String],
    ) -> StoreResult<()> {
        self.mode.require_define("add_variable")?;
        self.schema.add_variable(name, data_type, dimensions)
    }

    fn set_variable_attribute(
        &mut self,
        variable: &str,
        name: &str,
        value: AttributeValue,
    ) -> StoreResult<()> {
        self.mode.require_define("set_variable_attribute")?;
        self.schema.set_variable_attribute(variable, name, value)
    }

    fn set_global_attribute(&mut self, name: &str, value: AttributeValue) -> StoreResult<()> {
        self.mode.require_define("set_global_attribute")?;
        self.schema.global_attributes.set(name, value);
        Ok(())
    }

    fn create(&mut self) -> StoreResult<()> {
        self.mode.require_define("create")?;
        for var in &self.schema.variables {
            let len = self.schema.shape_of(var).iter().product();
            self.buffers
                .insert(var.name.clone(), ArrayValues::filled(var.data_type, len));
        }
        self.mode = StoreMode::Data;
        debug!(
            dimensions = self.schema.dimensions.len(),
            variables = self.schema.variables.len(),
            "Created in-memory store"
        );
        Ok(())
    }

    fn write(&mut self, variable: &str, origin: &[usize], data: &GridArray) -> StoreResult<()> {
        self.mode.require_data("write")?;
        if let Some(length) = self.schema.plan_write(variable, origin, data)? {
            self.grow(length)?;
        }

        let var = self.schema.variable_or_err(variable)?;
        let full = self.schema.shape_of(var);
        let buffer = self
            .buffers
            .get_mut(variable)
            .ok_or_else(|| StoreError::UnknownVariable(variable.to_string()))?;

        let mut result = Ok(());
        for_each_element(origin, data.shape(), &full, |src, dst| {
            if result.is_ok() {
                result = buffer.copy_element(dst, data.values(), src);
            }
        });
        Ok(result?)
    }

    fn read(&self, variable: &str, origin: &[usize], shape: &[usize]) -> StoreResult<GridArray> {
        self.mode.require_data("read")?;
        let var = self.schema.check_read(variable, origin, shape)?;
        let full = self.schema.shape_of(var);
        let buffer = self
            .buffers
            .get(variable)
            .ok_or_else(|| StoreError::UnknownVariable(variable.to_string()))?;

        let mut out = ArrayValues::filled(var.data_type, shape.iter().product());
        let mut result = Ok(());
        for_each_element(origin, shape, &full, |dst, src| {
            if result.is_ok() {
                result = out.copy_element(dst, buffer, src);
            }
        });
        result?;
        Ok(GridArray::new(shape.to_vec(), out)?)
    }

    fn flush(&mut self) -> StoreResult<()> {
        self.mode.require_data("flush")
    }

    fn fix_unlimited_dimension(&mut self, length: usize) -> StoreResult<()> {
        self.mode.require_data("fix_unlimited_dimension")?;
        self.schema.check_fix(length)?;
        self.schema.set_unlimited_length(length);
        for var in &self.schema.variables {
            if !self.schema.is_record_variable(var) {
                continue;
            }
            let kept: usize = self.schema.shape_of(var).iter().product();
            if let Some(buffer) = self.buffers.get_mut(&var.name) {
                if buffer.len() > kept {
                    *buffer = buffer.slice(0, kept);
                }
            }
        }
        if let Some(dim) = self.schema.fix_unlimited() {
            debug!(dimension = %dim.name, length = dim.length, "Fixed unlimited dimension");
        }
        Ok(())
    }

    fn close(&mut self) -> StoreResult<()> {
        if self.mode == StoreMode::Closed {
            return Err(StoreError::Closed);
        }
        self.mode = StoreMode::Closed;
        Ok(())
    }

    fn schema(&self) -> StoreResult<StoreSchema> {
        if self.mode == StoreMode::Closed {
            return Err(StoreError::Closed);
        }
        Ok(self.schema.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn record_store() -> MemoryArrayStore {
        let mut store = MemoryArrayStore::new();
        store.add_unlimited_dimension("time").unwrap();
        store.add_dimension("y", 2).unwrap();
        store.add_dimension("x", 2).unwrap();
        store
            .add_variable("t", DataType::Double, &dims(&["time", "y", "x"]))
            .unwrap();
        store
            .add_variable("lat", DataType::Double, &dims(&["y", "x"]))
            .unwrap();
        store.create().unwrap();
        store
    }

    #[test]
    fn test_define_mode_enforced() {
        let mut store = record_store();
        assert!(matches!(
            store.add_dimension("z", 1),
            Err(StoreError::NotInDefineMode("add_dimension"))
        ));

        let mut fresh = MemoryArrayStore::new();
        fresh.add_dimension("x", 1).unwrap();
        fresh.add_variable("v", DataType::Int, &dims(&["x"])).unwrap();
        let block = GridArray::filled(DataType::Int, vec![1]);
        assert!(matches!(
            fresh.write("v", &[0], &block),
            Err(StoreError::InDefineMode("write"))
        ));
    }

    #[test]
    fn test_record_growth_keeps_earlier_records() {
        let mut store = record_store();
        for t in 0..3 {
            let block = GridArray::from_f64(
                DataType::Double,
                vec![1, 2, 2],
                &[t as f64, t as f64 + 0.1, t as f64 + 0.2, t as f64 + 0.3],
            )
            .unwrap();
            store.write("t", &[t, 0, 0], &block).unwrap();
        }

        let schema = store.schema().unwrap();
        assert_eq!(schema.unlimited_dimension().unwrap().length, 3);

        let second = store.read("t", &[1, 0, 0], &[1, 2, 2]).unwrap();
        assert_eq!(second.to_f64_vec(), vec![1.0, 1.1, 1.2, 1.3]);
        assert_eq!(store.read_all("t").unwrap().shape(), &[3, 2, 2]);
    }

    #[test]
    fn test_gap_is_filled() {
        let mut store = record_store();
        let block = GridArray::from_f64(DataType::Double, vec![1, 2, 2], &[1.0; 4]).unwrap();
        store.write("t", &[2, 0, 0], &block).unwrap();
        let first = store.read("t", &[0, 0, 0], &[1, 2, 2]).unwrap();
        assert!(first.to_f64_vec().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_fixed_dimension_bounds() {
        let mut store = record_store();
        let block = GridArray::filled(DataType::Double, vec![2, 2]);
        assert!(matches!(
            store.write("lat", &[1, 0], &block),
            Err(StoreError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_fix_unlimited_then_no_growth() {
        let mut store = record_store();
        let block = GridArray::filled(DataType::Double, vec![1, 2, 2]);
        store.write("t", &[0, 0, 0], &block).unwrap();
        store.fix_unlimited_dimension(1).unwrap();

        let schema = store.schema().unwrap();
        assert!(schema.unlimited_dimension().is_none());
        assert_eq!(schema.dimension("time").unwrap().length, 1);
        assert!(matches!(
            store.write("t", &[1, 0, 0], &block),
            Err(StoreError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_fix_unlimited_drops_trailing_records() {
        let mut store = record_store();
        let block = GridArray::from_f64(DataType::Double, vec![3, 2, 2], &[1.0; 12]).unwrap();
        store.write("t", &[0, 0, 0], &block).unwrap();

        assert!(matches!(
            store.fix_unlimited_dimension(4),
            Err(StoreError::InvalidSchema(_))
        ));
        store.fix_unlimited_dimension(2).unwrap();

        let kept = store.read_all("t").unwrap();
        assert_eq!(kept.shape(), &[2, 2, 2]);
        assert_eq!(kept.to_f64_vec(), vec![1.0; 8]);
        assert!(matches!(
            store.read("t", &[2, 0, 0], &[1, 2, 2]),
            Err(StoreError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_second_close_fails() {
        let mut store = record_store();
        store.close().unwrap();
        assert!(matches!(store.close(), Err(StoreError::Closed)));
        assert!(matches!(store.flush(), Err(StoreError::Closed)));
    }

    #[test]
    fn test_scalar_variable() {
        let mut store = MemoryArrayStore::new();
        store.add_variable("crs", DataType::Int, &[]).unwrap();
        store.create().unwrap();
        let value = GridArray::new(vec![], ArrayValues::Int(vec![7])).unwrap();
        store.write("crs", &[], &value).unwrap();
        assert_eq!(store.read("crs", &[], &[]).unwrap().to_f64_vec(), vec![7.0]);
    }
}
