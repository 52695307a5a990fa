//! Structured array storage.
//!
//! An [`ArrayStore`] holds named dimensions, typed variables over those
//! dimensions, and attributes, with at most one unlimited dimension that
//! grows as records are written. Two backends are provided:
//!
//! - [`MemoryArrayStore`]: in-process buffers
//! - [`ZarrArrayStore`]: one Zarr V3 array per variable on the local
//!   filesystem, reopenable through its root group manifest

pub mod config;
pub mod error;
pub mod memory;
pub mod schema;
pub mod store;
pub mod zarr;

pub use config::{ZarrCompression, ZarrStoreConfig};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryArrayStore;
pub use schema::StoreSchema;
pub use store::{ArrayStore, StoreMode};
pub use zarr::ZarrArrayStore;
