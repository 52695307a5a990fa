//! Coordinate reference system transformations.
//!
//! Implements the CF grid mappings needed to place a gridded source on the
//! globe, from scratch without external projection libraries.

pub mod ellipsoid;
pub mod equirectangular;
pub mod error;
pub mod geodesy;
pub mod geostationary;
pub mod lambert;
pub mod mercator;

pub use ellipsoid::Ellipsoid;
pub use error::GeodesyError;
pub use geodesy::{normalize_longitude, CfGeodesy, Crs, GeodesyService};
pub use geostationary::{Geostationary, SweepAxis};
pub use lambert::LambertConformal;
pub use mercator::Mercator;
pub use equirectangular::Equirectangular;
