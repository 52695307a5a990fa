//! Error types for array stores.

use grid_common::{CommonError, DataType};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while defining, writing or reading a store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A define-mode operation was attempted after `create`.
    #[error("{0} requires define mode")]
    NotInDefineMode(&'static str),

    /// A data operation was attempted before `create`.
    #[error("{0} is not allowed in define mode")]
    InDefineMode(&'static str),

    /// The store has been closed.
    #[error("store is closed")]
    Closed,

    #[error("'{0}' is already defined")]
    AlreadyExists(String),

    #[error("unknown dimension '{0}'")]
    UnknownDimension(String),

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// Schema rule violated (e.g. a second unlimited dimension).
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("variable '{variable}' has rank {expected}, got {actual}")]
    RankMismatch {
        variable: String,
        expected: usize,
        actual: usize,
    },

    #[error("variable '{variable}' holds {expected} data, got {actual}")]
    TypeMismatch {
        variable: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("block at {origin:?} with shape {shape:?} exceeds variable '{variable}' shape {bounds:?}")]
    OutOfBounds {
        variable: String,
        origin: Vec<usize>,
        shape: Vec<usize>,
        bounds: Vec<usize>,
    },

    /// Zarr format error.
    #[error("Zarr format error: {0}")]
    Zarr(String),

    #[error("invalid archive manifest: {0}")]
    Manifest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn zarr(err: impl ToString) -> Self {
        Self::Zarr(err.to_string())
    }
}
