//! CF grid-mapping descriptions.

use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeValue, Attributes};

/// The grid-mapping a source exposes for its primary grid.
///
/// `parameters` holds the CF grid-mapping attributes other than
/// `grid_mapping_name` itself (e.g. `standard_parallel`,
/// `longitude_of_central_meridian`, `semi_major_axis`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSystem {
    pub grid_mapping_name: String,
    #[serde(default)]
    pub parameters: Attributes,
}

impl CoordinateSystem {
    pub fn new(grid_mapping_name: impl Into<String>) -> Self {
        Self {
            grid_mapping_name: grid_mapping_name.into(),
            parameters: Attributes::new(),
        }
    }

    /// Plain geographic coordinates.
    pub fn latitude_longitude() -> Self {
        Self::new("latitude_longitude")
    }

    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.parameters.set(name, value);
        self
    }

    pub fn parameter_f64(&self, name: &str) -> Option<f64> {
        self.parameters.get_f64(name)
    }

    /// All numeric values of a parameter; empty if absent.
    pub fn parameter_f64_vec(&self, name: &str) -> Vec<f64> {
        self.parameters
            .get(name)
            .map(AttributeValue::as_f64_vec)
            .unwrap_or_default()
    }

    /// Build from the attributes of a CF grid-mapping variable.
    ///
    /// Returns `None` when `grid_mapping_name` is missing.
    pub fn from_attributes(attrs: &Attributes) -> Option<Self> {
        let name = attrs.get_str("grid_mapping_name")?;
        let parameters = attrs
            .iter()
            .filter(|(n, _)| *n != "grid_mapping_name")
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect();
        Some(Self {
            grid_mapping_name: name.to_string(),
            parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_attributes() {
        let attrs = Attributes::new()
            .with("grid_mapping_name", "lambert_conformal_conic")
            .with("standard_parallel", vec![25.0, 25.0])
            .with("longitude_of_central_meridian", 265.0);

        let cs = CoordinateSystem::from_attributes(&attrs).unwrap();
        assert_eq!(cs.grid_mapping_name, "lambert_conformal_conic");
        assert_eq!(cs.parameter_f64_vec("standard_parallel"), vec![25.0, 25.0]);
        assert_eq!(cs.parameter_f64("longitude_of_central_meridian"), Some(265.0));
        assert!(!cs.parameters.contains("grid_mapping_name"));
    }

    #[test]
    fn test_from_attributes_requires_name() {
        let attrs = Attributes::new().with("semi_major_axis", 6371229.0);
        assert!(CoordinateSystem::from_attributes(&attrs).is_none());
    }
}
