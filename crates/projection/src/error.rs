//! Error types for the projection crate.

use thiserror::Error;

/// Errors raised while resolving or applying a coordinate transform.
#[derive(Error, Debug)]
pub enum GeodesyError {
    /// The coordinate system could not be turned into a usable CRS.
    #[error("Cannot resolve CRS '{mapping}': {reason}")]
    Resolution { mapping: String, reason: String },

    /// A resolved CRS could not be applied to the supplied points.
    #[error("Transform failed: {0}")]
    Transform(String),
}

impl GeodesyError {
    pub fn resolution(mapping: impl Into<String>, reason: impl Into<String>) -> Self {
        GeodesyError::Resolution {
            mapping: mapping.into(),
            reason: reason.into(),
        }
    }
}
