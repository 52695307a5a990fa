//! Rolling archive of gridded time series.
//!
//! Builds a growing, schema-stable archive from a sequence of source grid
//! files that share one spatial grid but advance in time.
//!
//! # Architecture
//!
//! - [`SchemaBuilder`] derives the archive schema once from a prototype
//!   source, applying [`ExclusionRules`] and optionally replacing the
//!   source X/Y axes with 2-D `lat`/`lon` variables.
//! - [`CoordinateProjector`] computes those `lat`/`lon` arrays through a
//!   [`projection::GeodesyService`].
//! - [`SliceAppender`] writes every time step of each new source at the
//!   archive cursor.
//! - [`ArchiveWriter`] owns the store, the schema and the cursor, and
//!   enforces the `Created → Defined → Ready → Finalized` lifecycle.
//!
//! Storage goes through [`array_store::ArrayStore`]; sources are read
//! through [`grid_source::GridSource`].

pub mod append;
pub mod config;
pub mod coordinates;
pub mod error;
pub mod schema;
pub mod writer;

// Re-exports
pub use append::{AppendReport, SliceAppender};
pub use config::{load_archive_config, ArchiveConfig, ExclusionRules};
pub use coordinates::{interleave, CoordinateProjector, LatLonGrid};
pub use error::{ArchiveError, NotDefinedReason, Result, SchemaError};
pub use schema::{ArchiveSchema, SchemaBuilder, CF_CONVENTIONS, LAT_VARIABLE, LON_VARIABLE};
pub use writer::{ArchiveState, ArchiveWriter};
