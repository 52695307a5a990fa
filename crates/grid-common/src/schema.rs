//! Dimension and variable descriptions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeValue, Attributes};
use crate::error::CommonError;

/// Element type of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 8-bit signed integer
    Byte,
    /// 16-bit signed integer
    Short,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 32-bit IEEE float
    Float,
    /// 64-bit IEEE float
    Double,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Byte => "byte",
            DataType::Short => "short",
            DataType::Int => "int",
            DataType::Long => "long",
            DataType::Float => "float",
            DataType::Double => "double",
        }
    }

    /// Size of one element in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            DataType::Byte => 1,
            DataType::Short => 2,
            DataType::Int | DataType::Float => 4,
            DataType::Long | DataType::Double => 8,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "byte" | "i8" => Ok(DataType::Byte),
            "short" | "i16" => Ok(DataType::Short),
            "int" | "i32" => Ok(DataType::Int),
            "long" | "i64" => Ok(DataType::Long),
            "float" | "f32" => Ok(DataType::Float),
            "double" | "f64" => Ok(DataType::Double),
            _ => Err(CommonError::UnknownDataType(s.to_string())),
        }
    }
}

/// A named dimension.
///
/// `length` is the current length; for an unlimited dimension it is the
/// number of records written so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub length: usize,
    #[serde(default)]
    pub unlimited: bool,
}

impl Dimension {
    pub fn fixed(name: impl Into<String>, length: usize) -> Self {
        Self {
            name: name.into(),
            length,
            unlimited: false,
        }
    }

    pub fn unlimited(name: impl Into<String>, length: usize) -> Self {
        Self {
            name: name.into(),
            length,
            unlimited: true,
        }
    }
}

/// A named, typed, shaped variable with attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub data_type: DataType,
    /// Dimension names, outermost first.
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub attributes: Attributes,
    /// Name of the grid-mapping variable this variable is associated with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_mapping: Option<String>,
}

impl Variable {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        data_type: DataType,
        dimensions: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type,
            dimensions: dimensions.into_iter().map(Into::into).collect(),
            attributes: Attributes::new(),
            grid_mapping: None,
        }
    }

    /// A rank-0 variable.
    pub fn scalar(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new::<String>(name, data_type, Vec::new())
    }

    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.set(name, value);
        self
    }

    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn uses_dimension(&self, name: &str) -> bool {
        self.dimensions.iter().any(|d| d == name)
    }

    /// Space-separated dimension names, e.g. `"time y x"`.
    pub fn dimensions_string(&self) -> String {
        self.dimensions.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_parse() {
        assert_eq!("double".parse::<DataType>().unwrap(), DataType::Double);
        assert_eq!("F32".parse::<DataType>().unwrap(), DataType::Float);
        assert!("complex".parse::<DataType>().is_err());
    }

    #[test]
    fn test_variable_shape_helpers() {
        let var = Variable::new("temp", DataType::Float, ["time", "y", "x"]);
        assert_eq!(var.rank(), 3);
        assert!(var.uses_dimension("y"));
        assert_eq!(var.dimensions_string(), "time y x");
        assert!(Variable::scalar("crs", DataType::Int).is_scalar());
    }
}
