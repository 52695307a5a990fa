//! Grid dataset interfaces.
//!
//! A [`GridSource`] is an open dataset exposing dimensions, variables,
//! attributes, a spatial grid with X/Y axes and a coordinate system, and
//! time-indexed slice reads. A [`GridOpener`] turns paths into sources and
//! reports datasets that are not grids with a typed error at open time.
//!
//! [`MemoryGridSource`] and [`MemoryCatalog`] are in-memory implementations.

pub mod axis;
pub mod catalog;
pub mod error;
pub mod memory;
pub mod source;

pub use axis::{CoordinateAxis, RawAxis, TimeAxis};
pub use catalog::MemoryCatalog;
pub use error::{AxisError, AxisKind, OpenError, SourceError, SourceResult};
pub use memory::{MemoryGridSource, MemoryGridSourceBuilder};
pub use source::{GridOpener, GridSource};
