//! Common types shared across the rolling archive workspace.
//!
//! Everything here is plain data: the schema vocabulary (dimensions,
//! variables, data types, attributes), dense typed arrays, the CF
//! grid-mapping description a source exposes, and CF time units.

pub mod array;
pub mod attributes;
pub mod crs;
pub mod error;
pub mod schema;
pub mod time;

pub use array::{ArrayValues, GridArray};
pub use attributes::{AttributeValue, Attributes};
pub use crs::CoordinateSystem;
pub use error::{CommonError, CommonResult};
pub use schema::{DataType, Dimension, Variable};
pub use time::{CfTimeUnits, TimeUnit};
