//! The grid dataset capability interfaces.

use std::path::Path;

use grid_common::{Attributes, CoordinateSystem, DataType, Dimension, GridArray, Variable};

use crate::axis::RawAxis;
use crate::error::{OpenError, SourceResult};

/// An open grid dataset.
///
/// A grid source exposes its dimensions, variables and attributes, the grids
/// it holds (data variables over a spatial grid), the coordinate system and
/// X/Y axes of that spatial grid, and per-time-index slice reads. The first
/// entry of [`grid_names`](GridSource::grid_names) is the primary grid.
///
/// Handles are released when the source is dropped.
pub trait GridSource {
    /// Path or other identifier the source was opened from.
    fn location(&self) -> &str;

    fn dimensions(&self) -> &[Dimension];

    fn variables(&self) -> &[Variable];

    fn global_attributes(&self) -> &Attributes;

    /// Names of the grid variables, primary grid first.
    fn grid_names(&self) -> Vec<String>;

    /// Coordinate system of the spatial grid, if the source declares one.
    fn coordinate_system(&self) -> Option<&CoordinateSystem>;

    fn x_axis(&self) -> SourceResult<RawAxis>;

    fn y_axis(&self) -> SourceResult<RawAxis>;

    /// Time axis of `grid`.
    fn time_axis(&self, grid: &str) -> SourceResult<RawAxis>;

    /// Data of `grid` at `time_index`, shaped over the grid's non-time
    /// dimensions.
    fn read_slice(&self, grid: &str, time_index: usize) -> SourceResult<GridArray>;

    fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables().iter().find(|v| v.name == name)
    }

    fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions().iter().find(|d| d.name == name)
    }

    fn has_grid(&self, name: &str) -> bool {
        self.grid_names().iter().any(|g| g == name)
    }

    /// Data type of the primary grid.
    fn primary_data_type(&self) -> Option<DataType> {
        let primary = self.grid_names().into_iter().next()?;
        self.variable(&primary).map(|v| v.data_type)
    }
}

/// Opens paths as grid sources.
pub trait GridOpener {
    /// Open `path`. A path that exists but is not a grid dataset fails with
    /// [`OpenError::NotGridDataset`].
    fn open(&self, path: &Path) -> Result<Box<dyn GridSource>, OpenError>;
}
