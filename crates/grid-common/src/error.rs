//! Error types for the shared grid types.

use thiserror::Error;

use crate::schema::DataType;

/// Result type alias using CommonError.
pub type CommonResult<T> = Result<T, CommonError>;

/// Errors raised while building or converting shared grid values.
#[derive(Debug, Error)]
pub enum CommonError {
    #[error("shape {shape:?} holds {expected} values but {actual} were supplied")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    /// A value the target type cannot hold exactly.
    #[error("value {value} cannot be stored as {data_type}")]
    Unrepresentable { value: f64, data_type: DataType },

    #[error("expected {expected} data but found {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("unknown data type: {0}")]
    UnknownDataType(String),

    #[error("invalid time units '{0}'")]
    InvalidTimeUnits(String),

    #[error("invalid time reference '{0}'")]
    InvalidTimeReference(String),
}
