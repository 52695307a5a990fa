//! A path-addressed catalog of in-memory grid sources.
//!
//! [`MemoryCatalog`] implements [`GridOpener`] and counts the handles it has
//! handed out that are still alive, so callers can verify that every open
//! source is released.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use grid_common::{Attributes, CoordinateSystem, Dimension, GridArray, Variable};
use tracing::debug;

use crate::axis::RawAxis;
use crate::error::{OpenError, SourceResult};
use crate::memory::MemoryGridSource;
use crate::source::{GridOpener, GridSource};

#[derive(Debug, Clone)]
enum Entry {
    Grid(Arc<MemoryGridSource>),
    /// A dataset that exists but holds no grids.
    NotGrid(String),
}

/// In-memory [`GridOpener`].
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    entries: HashMap<PathBuf, Entry>,
    open_handles: Arc<AtomicUsize>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, source: MemoryGridSource) {
        self.entries.insert(path.into(), Entry::Grid(Arc::new(source)));
    }

    /// Register a path that opens but is not a grid dataset.
    pub fn insert_non_grid(&mut self, path: impl Into<PathBuf>, reason: impl Into<String>) {
        self.entries.insert(path.into(), Entry::NotGrid(reason.into()));
    }

    /// Number of handles opened and not yet dropped.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }
}

impl GridOpener for MemoryCatalog {
    fn open(&self, path: &Path) -> Result<Box<dyn GridSource>, OpenError> {
        let entry = self
            .entries
            .get(path)
            .ok_or_else(|| OpenError::NotFound(path.display().to_string()))?;

        // The handle is acquired before the dataset is inspected and is
        // released on drop if inspection fails.
        let handle = HandleGuard::acquire(&self.open_handles);
        match entry {
            Entry::Grid(source) => {
                debug!(path = %path.display(), "Opened grid source");
                Ok(Box::new(CatalogHandle {
                    source: Arc::clone(source),
                    _guard: handle,
                }))
            }
            Entry::NotGrid(reason) => Err(OpenError::NotGridDataset {
                location: path.display().to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

#[derive(Debug)]
struct HandleGuard {
    counter: Arc<AtomicUsize>,
}

impl HandleGuard {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self {
            counter: Arc::clone(counter),
        }
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// An open catalog entry.
#[derive(Debug)]
struct CatalogHandle {
    source: Arc<MemoryGridSource>,
    _guard: HandleGuard,
}

impl GridSource for CatalogHandle {
    fn location(&self) -> &str {
        self.source.location()
    }

    fn dimensions(&self) -> &[Dimension] {
        self.source.dimensions()
    }

    fn variables(&self) -> &[Variable] {
        self.source.variables()
    }

    fn global_attributes(&self) -> &Attributes {
        self.source.global_attributes()
    }

    fn grid_names(&self) -> Vec<String> {
        self.source.grid_names()
    }

    fn coordinate_system(&self) -> Option<&CoordinateSystem> {
        self.source.coordinate_system()
    }

    fn x_axis(&self) -> SourceResult<RawAxis> {
        self.source.x_axis()
    }

    fn y_axis(&self) -> SourceResult<RawAxis> {
        self.source.y_axis()
    }

    fn time_axis(&self, grid: &str) -> SourceResult<RawAxis> {
        self.source.time_axis(grid)
    }

    fn read_slice(&self, grid: &str, time_index: usize) -> SourceResult<GridArray> {
        self.source.read_slice(grid, time_index)
    }
}
