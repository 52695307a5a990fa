//! The array store interface.

use grid_common::{AttributeValue, DataType, GridArray};

use crate::error::{StoreError, StoreResult};
use crate::schema::StoreSchema;

/// Lifecycle of a store handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Structure may be declared; no data access.
    Define,
    /// Structure is fixed; data may be written and read.
    Data,
    Closed,
}

impl StoreMode {
    pub(crate) fn require_define(self, operation: &'static str) -> StoreResult<()> {
        match self {
            StoreMode::Define => Ok(()),
            StoreMode::Data => Err(StoreError::NotInDefineMode(operation)),
            StoreMode::Closed => Err(StoreError::Closed),
        }
    }

    pub(crate) fn require_data(self, operation: &'static str) -> StoreResult<()> {
        match self {
            StoreMode::Data => Ok(()),
            StoreMode::Define => Err(StoreError::InDefineMode(operation)),
            StoreMode::Closed => Err(StoreError::Closed),
        }
    }
}

/// A structured store of named, typed, multi-dimensional arrays.
///
/// A fresh store starts in define mode, where dimensions, variables and
/// attributes are declared. [`create`](ArrayStore::create) allocates the
/// declared structure and switches to data mode, where blocks are written
/// and read at explicit origins. Writes past the end of the unlimited
/// dimension extend it.
pub trait ArrayStore {
    fn mode(&self) -> StoreMode;

    fn add_dimension(&mut self, name: &str, length: usize) -> StoreResult<()>;

    fn add_unlimited_dimension(&mut self, name: &str) -> StoreResult<()>;

    /// Declare a variable over previously declared dimensions. An unlimited
    /// dimension may only appear first.
    fn add_variable(
        &mut self,
        name: &str,
        data_type: DataType,
        dimensions: &[String],
    ) -> StoreResult<()>;

    fn set_variable_attribute(
        &mut self,
        variable: &str,
        name: &str,
        value: AttributeValue,
    ) -> StoreResult<()>;

    fn set_global_attribute(&mut self, name: &str, value: AttributeValue) -> StoreResult<()>;

    /// Leave define mode and allocate storage.
    fn create(&mut self) -> StoreResult<()>;

    /// Write `data` with its first element at `origin`. The block's rank must
    /// equal the variable's rank.
    fn write(&mut self, variable: &str, origin: &[usize], data: &GridArray) -> StoreResult<()>;

    fn read(&self, variable: &str, origin: &[usize], shape: &[usize]) -> StoreResult<GridArray>;

    fn flush(&mut self) -> StoreResult<()>;

    /// Convert the unlimited dimension to a fixed one holding the first
    /// `length` records. Records past `length` are dropped; a `length` beyond
    /// the current one is an error.
    fn fix_unlimited_dimension(&mut self, length: usize) -> StoreResult<()>;

    /// Release the handle. Closing twice fails with [`StoreError::Closed`].
    fn close(&mut self) -> StoreResult<()>;

    /// The structure as currently declared or persisted.
    fn schema(&self) -> StoreResult<StoreSchema>;

    /// Read a whole variable.
    fn read_all(&self, variable: &str) -> StoreResult<GridArray> {
        let schema = self.schema()?;
        let var = schema.variable_or_err(variable)?;
        let shape = schema.shape_of(var);
        let origin = vec![0; shape.len()];
        self.read(variable, &origin, &shape)
    }
}
