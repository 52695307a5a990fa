//! Error types for the rolling archive.

use std::fmt;

use array_store::StoreError;
use grid_common::{CommonError, DataType};
use grid_source::{AxisError, OpenError, SourceError};
use projection::GeodesyError;
use thiserror::Error;

use crate::writer::ArchiveState;

/// Why an operation needed a defined archive and did not get one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotDefinedReason {
    /// `define` was called on an archive that already has a schema.
    AlreadyDefined,
    /// The operation is not legal in the writer's current state.
    WrongState {
        operation: &'static str,
        state: ArchiveState,
    },
    /// Prototype grid geometry (axes, CRS) is not known, e.g. on a reopened
    /// archive or when the prototype CRS could not be resolved.
    PrototypeUnavailable,
}

impl fmt::Display for NotDefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotDefinedReason::AlreadyDefined => f.write_str("AlreadyDefined"),
            NotDefinedReason::WrongState { operation, state } => {
                write!(f, "{} is not allowed in state {}", operation, state)
            }
            NotDefinedReason::PrototypeUnavailable => {
                f.write_str("prototype grid geometry is unavailable")
            }
        }
    }
}

/// The prototype cannot be turned into an archive schema, or the archive
/// schema cannot accept a requested write.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("{location} has no dimensions")]
    NoDimensions { location: String },

    #[error("{location} has no variables")]
    NoVariables { location: String },

    #[error("unlimited dimension '{name}' not found in {location}")]
    UnlimitedDimensionMissing { name: String, location: String },

    #[error("variable '{variable}' uses dimension '{dimension}', which is not in the archive")]
    UndefinedDimension { variable: String, dimension: String },

    #[error("variable '{variable}' uses unlimited dimension '{dimension}' in a position other than first")]
    UnlimitedNotFirst { variable: String, dimension: String },

    #[error("duplicate dimension '{0}'")]
    DuplicateDimension(String),

    #[error("duplicate variable '{0}'")]
    DuplicateVariable(String),

    #[error("archive variable '{0}' is not a record variable along the unlimited dimension")]
    NotRecordVariable(String),

    #[error("archive has no time coordinate variable '{0}'")]
    MissingTimeVariable(String),

    #[error("slice of '{variable}' has shape {actual:?}, archive expects {expected:?}")]
    SliceShape {
        variable: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("value {value} of '{variable}' cannot be stored as {data_type}")]
    ValueOutOfRange {
        variable: String,
        data_type: DataType,
        value: f64,
    },
}

/// Errors that can occur while defining or appending to an archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Archive not defined: {0}")]
    NotDefined(NotDefinedReason),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Unsupported dataset {location}: {reason}")]
    UnsupportedDataset { location: String, reason: String },

    #[error("Axis error: {0}")]
    Axis(#[from] AxisError),

    #[error("Transform error: {0}")]
    Transform(#[from] GeodesyError),

    #[error("Variable '{name}' not found in {location}")]
    VariableNotFound { name: String, location: String },

    /// Storage read, write or close failure.
    #[error("Storage error: {0}")]
    Io(#[from] StoreError),

    /// Source read failure not covered by a more specific kind.
    #[error("Source error: {0}")]
    Source(SourceError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ArchiveError {
    pub(crate) fn wrong_state(operation: &'static str, state: ArchiveState) -> Self {
        ArchiveError::NotDefined(NotDefinedReason::WrongState { operation, state })
    }
}

impl From<SourceError> for ArchiveError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Axis(e) => ArchiveError::Axis(e),
            SourceError::GridNotFound { grid, location } => ArchiveError::VariableNotFound {
                name: grid,
                location,
            },
            SourceError::Io(e) => ArchiveError::Io(StoreError::Io(e)),
            other => ArchiveError::Source(other),
        }
    }
}

impl From<OpenError> for ArchiveError {
    fn from(err: OpenError) -> Self {
        match err {
            OpenError::NotFound(location) => ArchiveError::UnsupportedDataset {
                location,
                reason: "no dataset at this path".to_string(),
            },
            OpenError::NotGridDataset { location, reason } => {
                ArchiveError::UnsupportedDataset { location, reason }
            }
            OpenError::Io(e) => ArchiveError::Io(StoreError::Io(e)),
        }
    }
}

impl From<std::io::Error> for ArchiveError {
    fn from(err: std::io::Error) -> Self {
        ArchiveError::Io(StoreError::Io(err))
    }
}

impl From<CommonError> for ArchiveError {
    fn from(err: CommonError) -> Self {
        ArchiveError::Source(SourceError::Common(err))
    }
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_not_found_maps_to_variable_not_found() {
        let err: ArchiveError = SourceError::GridNotFound {
            grid: "temp".to_string(),
            location: "mem://a".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            ArchiveError::VariableNotFound { ref name, ref location }
                if name == "temp" && location == "mem://a"
        ));
    }

    #[test]
    fn test_not_grid_dataset_maps_to_unsupported() {
        let err: ArchiveError = OpenError::NotGridDataset {
            location: "obs.nc".to_string(),
            reason: "station data".to_string(),
        }
        .into();
        assert!(matches!(err, ArchiveError::UnsupportedDataset { .. }));
        assert!(err.to_string().contains("obs.nc"));
    }

    #[test]
    fn test_already_defined_message() {
        let err = ArchiveError::NotDefined(NotDefinedReason::AlreadyDefined);
        assert_eq!(err.to_string(), "Archive not defined: AlreadyDefined");
    }
}
