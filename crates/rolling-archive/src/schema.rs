//! Deriving the archive schema from a prototype source.

use std::collections::HashSet;

use array_store::StoreSchema;
use grid_common::{AttributeValue, Attributes, DataType, Dimension, Variable};
use grid_source::{CoordinateAxis, GridSource};
use tracing::debug;

use crate::config::ArchiveConfig;
use crate::error::{Result, SchemaError};

/// The CF conventions version written to every archive.
pub const CF_CONVENTIONS: &str = "CF-1.6";

/// Name of the 2-D latitude variable synthesized for replace-X/Y.
pub const LAT_VARIABLE: &str = "lat";

/// Name of the 2-D longitude variable synthesized for replace-X/Y.
pub const LON_VARIABLE: &str = "lon";

/// Dimensions, variables and global attributes of an archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveSchema {
    pub dimensions: Vec<Dimension>,
    pub variables: Vec<Variable>,
    pub global_attributes: Attributes,
    /// Name of the unlimited dimension, if the archive has one.
    pub unlimited_dimension: Option<String>,
    /// Name of the synthesized grid-mapping variable, if any.
    pub grid_mapping_variable: Option<String>,
}

impl ArchiveSchema {
    /// Describe a persisted archive.
    pub fn from_store(store: StoreSchema, config: &ArchiveConfig) -> Self {
        let unlimited_dimension = store.unlimited_dimension().map(|d| d.name.clone());
        let has_lat_lon = store.variable(LAT_VARIABLE).is_some() && store.variable(LON_VARIABLE).is_some();
        let grid_mapping_variable = store
            .variable(&config.grid_mapping)
            .filter(|v| v.is_scalar() && has_lat_lon)
            .map(|v| v.name.clone());
        Self {
            dimensions: store.dimensions,
            variables: store.variables,
            global_attributes: store.global_attributes,
            unlimited_dimension,
            grid_mapping_variable,
        }
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_str())
    }

    /// True if the schema holds synthesized `lat`/`lon` variables.
    pub fn has_lat_lon(&self) -> bool {
        self.variable(LAT_VARIABLE).is_some() && self.variable(LON_VARIABLE).is_some()
    }

    /// True if `var`'s first dimension is the unlimited dimension.
    pub fn is_record_variable(&self, var: &Variable) -> bool {
        match (&self.unlimited_dimension, var.dimensions.first()) {
            (Some(unlimited), Some(first)) => unlimited == first,
            _ => false,
        }
    }

    /// Lengths of `var`'s dimensions after the first.
    pub fn slice_shape(&self, var: &Variable) -> Vec<usize> {
        var.dimensions
            .iter()
            .skip(1)
            .map(|d| self.dimension(d).map(|dim| dim.length).unwrap_or(0))
            .collect()
    }
}

/// Builds an [`ArchiveSchema`] from a prototype [`GridSource`].
pub struct SchemaBuilder<'a> {
    config: &'a ArchiveConfig,
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(config: &'a ArchiveConfig) -> Self {
        Self { config }
    }

    /// Derive the archive schema from `source`.
    ///
    /// Dimensions keep source order. The dimension named after the
    /// configured unlimited dimension becomes unlimited with length zero;
    /// excluded dimensions are dropped. With replace-X/Y, a scalar
    /// grid-mapping variable and 2-D `lat`/`lon` come first and the source
    /// X/Y variables are dropped. Every retained source variable keeps its
    /// name, type, shape and attributes and gains `grid_mapping` and
    /// `coordinates`.
    pub fn build(&self, source: &dyn GridSource) -> Result<ArchiveSchema> {
        let location = source.location();
        if source.dimensions().is_empty() {
            return Err(SchemaError::NoDimensions {
                location: location.to_string(),
            }
            .into());
        }
        if source.variables().is_empty() {
            return Err(SchemaError::NoVariables {
                location: location.to_string(),
            }
            .into());
        }

        let rules = &self.config.exclusions;
        let unlimited_name = self.config.unlimited_dimension.as_str();

        let mut dimensions = Vec::new();
        let mut unlimited_dimension = None;
        for dim in source.dimensions() {
            if dim.name == unlimited_name {
                dimensions.push(Dimension::unlimited(&dim.name, 0));
                unlimited_dimension = Some(dim.name.clone());
            } else if rules.is_dimension_excluded(&dim.name) {
                debug!(dimension = %dim.name, "Excluding dimension");
            } else {
                dimensions.push(Dimension::fixed(&dim.name, dim.length));
            }
        }

        if unlimited_dimension.is_none() && self.config.require_unlimited_dimension {
            return Err(SchemaError::UnlimitedDimensionMissing {
                name: unlimited_name.to_string(),
                location: location.to_string(),
            }
            .into());
        }

        let mut variables = Vec::new();
        let mut grid_mapping_variable = None;
        let mut source_xy = Vec::new();
        if rules.replace_xy_with_lat_lon() {
            let x = CoordinateAxis::try_from_raw(source.x_axis()?)?;
            let y = CoordinateAxis::try_from_raw(source.y_axis()?)?;
            variables.push(self.grid_mapping_variable());
            variables.push(lat_lon_variable(LAT_VARIABLE, &y.dimension, &x.dimension));
            variables.push(lat_lon_variable(LON_VARIABLE, &y.dimension, &x.dimension));
            grid_mapping_variable = Some(self.config.grid_mapping.clone());
            source_xy.push(x.variable_name);
            source_xy.push(y.variable_name);
        }

        let xy_names: Vec<&str> = source_xy.iter().map(String::as_str).collect();
        let excluded = rules.variable_exclusions(&xy_names);

        for var in source.variables() {
            if excluded.contains(&var.name) {
                debug!(variable = %var.name, "Excluding variable");
                continue;
            }
            let mut target = Variable::new(&var.name, var.data_type, var.dimensions.iter().cloned());
            target.attributes.extend_from(&var.attributes);
            target.attributes.set("grid_mapping", self.config.grid_mapping.as_str());
            target.attributes.set("coordinates", "lon lat");
            target.grid_mapping = Some(self.config.grid_mapping.clone());
            variables.push(target);
        }

        let mut global_attributes = source.global_attributes().clone();
        global_attributes.set("Conventions", CF_CONVENTIONS);

        let schema = ArchiveSchema {
            dimensions,
            variables,
            global_attributes,
            unlimited_dimension,
            grid_mapping_variable,
        };
        check_consistency(&schema)?;

        debug!(
            source = %location,
            dimensions = schema.dimensions.len(),
            variables = schema.variables.len(),
            unlimited = ?schema.unlimited_dimension,
            "Built archive schema"
        );
        Ok(schema)
    }

    fn grid_mapping_variable(&self) -> Variable {
        let mut var = Variable::scalar(&self.config.grid_mapping, DataType::Int);
        var.attributes.set("grid_mapping_name", "latitude_longitude");
        var.attributes.set("semi_major_axis", 6378137.0);
        var.attributes.set("semi_minor_axis", 6356752.314245);
        var.attributes
            .set("longitude_of_prime_meridian", AttributeValue::Int(0));
        var
    }
}

fn lat_lon_variable(name: &str, y_dim: &str, x_dim: &str) -> Variable {
    let (units, long_name, standard_name) = if name == LAT_VARIABLE {
        ("degrees_north", "Latitude", "latitude")
    } else {
        ("degrees_east", "Longitude", "longitude")
    };
    Variable::new(name, DataType::Double, [y_dim, x_dim])
        .with_attribute("units", units)
        .with_attribute("long_name", long_name)
        .with_attribute("standard_name", standard_name)
}

fn check_consistency(schema: &ArchiveSchema) -> std::result::Result<(), SchemaError> {
    let mut dims = HashSet::new();
    for dim in &schema.dimensions {
        if !dims.insert(dim.name.as_str()) {
            return Err(SchemaError::DuplicateDimension(dim.name.clone()));
        }
    }

    let mut vars = HashSet::new();
    for var in &schema.variables {
        if !vars.insert(var.name.as_str()) {
            return Err(SchemaError::DuplicateVariable(var.name.clone()));
        }
        for (position, dim) in var.dimensions.iter().enumerate() {
            if !dims.contains(dim.as_str()) {
                return Err(SchemaError::UndefinedDimension {
                    variable: var.name.clone(),
                    dimension: dim.clone(),
                });
            }
            if position > 0 && schema.unlimited_dimension.as_deref() == Some(dim.as_str()) {
                return Err(SchemaError::UnlimitedNotFirst {
                    variable: var.name.clone(),
                    dimension: dim.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExclusionRules;
    use crate::error::ArchiveError;
    use grid_source::{AxisKind, MemoryGridSource};

    fn prototype() -> MemoryGridSource {
        let temp = Variable::new("temp", DataType::Float, ["time", "y", "x"])
            .with_attribute("units", "K")
            .with_attribute("long_name", "Temperature");
        let values: Vec<f64> = (0..2 * 3 * 4).map(|i| i as f64).collect();
        MemoryGridSource::builder("mem://prototype")
            .unlimited_dimension("time", 2)
            .dimension("y", 3)
            .dimension("x", 4)
            .dimension("nv", 2)
            .global_attribute("title", "Prototype")
            .axis(AxisKind::X, "x", vec![0.0, 1.0, 2.0, 3.0], Some("degrees_east"))
            .axis(AxisKind::Y, "y", vec![10.0, 11.0, 12.0], Some("degrees_north"))
            .axis(AxisKind::Time, "time", vec![0.0, 1.0], Some("hours since 2024-01-01"))
            .grid_f64(temp, &values)
            .variable(Variable::new("time_bounds", DataType::Double, ["time", "nv"]), None)
            .build()
            .unwrap()
    }

    #[test]
    fn test_dimensions_follow_source_order() {
        let config = ArchiveConfig::default();
        let schema = SchemaBuilder::new(&config).build(&prototype()).unwrap();
        let names: Vec<&str> = schema.dimensions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["time", "y", "x", "nv"]);
        assert_eq!(schema.dimensions[0], Dimension::unlimited("time", 0));
        assert_eq!(schema.unlimited_dimension.as_deref(), Some("time"));
        assert_eq!(
            schema.global_attributes.get_str("Conventions"),
            Some(CF_CONVENTIONS)
        );
        assert_eq!(schema.global_attributes.get_str("title"), Some("Prototype"));
    }

    #[test]
    fn test_excluded_dimension_still_used_is_an_error() {
        let config = ArchiveConfig::default()
            .with_exclusions(ExclusionRules::new().with_dimension("nv"));
        let err = SchemaBuilder::new(&config).build(&prototype()).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::Schema(SchemaError::UndefinedDimension { ref variable, .. })
                if variable == "time_bounds"
        ));

        let config = ArchiveConfig::default().with_exclusions(
            ExclusionRules::new()
                .with_dimension("nv")
                .with_variable("time_bounds"),
        );
        let schema = SchemaBuilder::new(&config).build(&prototype()).unwrap();
        assert!(schema.dimension("nv").is_none());
        assert!(schema.variable("time_bounds").is_none());
    }

    #[test]
    fn test_attributes_appended_without_replace_xy() {
        let config = ArchiveConfig::default();
        let schema = SchemaBuilder::new(&config).build(&prototype()).unwrap();
        let temp = schema.variable("temp").unwrap();
        let names: Vec<&str> = temp.attributes.names().collect();
        assert_eq!(names, vec!["units", "long_name", "grid_mapping", "coordinates"]);
        assert_eq!(temp.grid_mapping.as_deref(), Some("Latitude_Longitude"));
        assert!(!schema.has_lat_lon());
        assert!(schema.variable("Latitude_Longitude").is_none());
        assert!(schema.variable("x").is_some());
    }

    #[test]
    fn test_replace_xy_synthesizes_grid_mapping() {
        let config = ArchiveConfig::default()
            .with_exclusions(ExclusionRules::new().with_replace_xy(true));
        let schema = SchemaBuilder::new(&config).build(&prototype()).unwrap();

        let names: Vec<&str> = schema.variable_names().collect();
        assert_eq!(
            &names[..3],
            &["Latitude_Longitude", LAT_VARIABLE, LON_VARIABLE]
        );
        assert!(schema.variable("x").is_none());
        assert!(schema.variable("y").is_none());

        let gm = schema.variable("Latitude_Longitude").unwrap();
        assert!(gm.is_scalar());
        assert_eq!(gm.data_type, DataType::Int);
        assert_eq!(gm.attributes.get_f64("semi_minor_axis"), Some(6356752.314245));
        assert_eq!(
            gm.attributes.get("longitude_of_prime_meridian"),
            Some(&AttributeValue::Int(0))
        );

        let lat = schema.variable(LAT_VARIABLE).unwrap();
        assert_eq!(lat.dimensions, vec!["y", "x"]);
        assert_eq!(lat.attributes.get_str("units"), Some("degrees_north"));
        assert_eq!(
            schema.variable(LON_VARIABLE).unwrap().attributes.get_str("standard_name"),
            Some("longitude")
        );
    }

    #[test]
    fn test_missing_unlimited_dimension() {
        let config = ArchiveConfig::default().with_unlimited_dimension("record");
        let schema = SchemaBuilder::new(&config).build(&prototype()).unwrap();
        assert!(schema.unlimited_dimension.is_none());
        assert!(!schema.dimension("time").unwrap().unlimited);

        let strict = config.with_require_unlimited_dimension(true);
        let err = SchemaBuilder::new(&strict).build(&prototype()).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::Schema(SchemaError::UnlimitedDimensionMissing { .. })
        ));
    }

    #[test]
    fn test_unlimited_must_lead() {
        let source = MemoryGridSource::builder("mem://transposed")
            .dimension("x", 2)
            .unlimited_dimension("time", 1)
            .grid_f64(
                Variable::new("temp", DataType::Double, ["x", "time"]),
                &[1.0, 2.0],
            )
            .build()
            .unwrap();
        let config = ArchiveConfig::default();
        let err = SchemaBuilder::new(&config).build(&source).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::Schema(SchemaError::UnlimitedNotFirst { .. })
        ));
    }

    #[test]
    fn test_grid_mapping_name_clash() {
        let config = ArchiveConfig::default()
            .with_grid_mapping("temp")
            .with_exclusions(ExclusionRules::new().with_replace_xy(true));
        let err = SchemaBuilder::new(&config).build(&prototype()).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::Schema(SchemaError::DuplicateVariable(ref name)) if name == "temp"
        ));
    }

    #[test]
    fn test_empty_source() {
        let source = MemoryGridSource::builder("mem://empty").build().unwrap();
        let config = ArchiveConfig::default();
        let err = SchemaBuilder::new(&config).build(&source).unwrap_err();
        assert!(matches!(err, ArchiveError::Schema(SchemaError::NoDimensions { .. })));

        let source = MemoryGridSource::builder("mem://dims-only")
            .dimension("x", 2)
            .build()
            .unwrap();
        let err = SchemaBuilder::new(&config).build(&source).unwrap_err();
        assert!(matches!(err, ArchiveError::Schema(SchemaError::NoVariables { .. })));
    }

    #[test]
    fn test_slice_shape() {
        let config = ArchiveConfig::default();
        let schema = SchemaBuilder::new(&config).build(&prototype()).unwrap();
        let temp = schema.variable("temp").unwrap();
        assert!(schema.is_record_variable(temp));
        assert_eq!(schema.slice_shape(temp), vec![3, 4]);
        assert!(!schema.is_record_variable(schema.variable("x").unwrap()));
    }
}
