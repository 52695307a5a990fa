//! Error types for grid sources.

use std::fmt;

use grid_common::CommonError;
use thiserror::Error;

/// Result type for grid source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Which coordinate axis an error or axis refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKind {
    X,
    Y,
    Time,
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisKind::X => f.write_str("X"),
            AxisKind::Y => f.write_str("Y"),
            AxisKind::Time => f.write_str("time"),
        }
    }
}

/// A coordinate axis is missing or unusable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AxisError {
    #[error("{kind} axis not found in {location}")]
    Missing { kind: AxisKind, location: String },

    #[error("{kind} axis '{variable}' must be one-dimensional, found rank {rank}")]
    NotOneDimensional {
        kind: AxisKind,
        variable: String,
        rank: usize,
    },

    #[error("time axis '{variable}' has unusable units '{units}'")]
    InvalidTimeUnits { variable: String, units: String },

    #[error("{0}")]
    Mismatch(String),
}

/// Errors raised while reading an open grid source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Axis(#[from] AxisError),

    #[error("Grid '{grid}' not found in {location}")]
    GridNotFound { grid: String, location: String },

    #[error("Time index {index} out of range for grid '{grid}' ({len} steps)")]
    TimeIndexOutOfRange {
        grid: String,
        index: usize,
        len: usize,
    },

    #[error("Invalid source data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while opening a path as a grid dataset.
#[derive(Error, Debug)]
pub enum OpenError {
    #[error("No dataset at {0}")]
    NotFound(String),

    #[error("{location} is not a grid dataset: {reason}")]
    NotGridDataset { location: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
