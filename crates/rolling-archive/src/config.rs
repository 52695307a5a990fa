//! Archive configuration.
//!
//! [`ArchiveConfig`] holds the names the archive is built around (unlimited
//! dimension, grid mapping, appendable grid variables) and the
//! [`ExclusionRules`] applied to the prototype. It can be built in code,
//! read from `ARCHIVE_*` environment variables, or loaded from YAML with
//! `${VAR}` / `${VAR:-default}` substitution.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};

/// What to leave out of the archive when copying the prototype's structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionRules {
    /// Dimensions omitted from the archive.
    pub dimensions: BTreeSet<String>,
    /// Variables omitted from the archive.
    pub variables: BTreeSet<String>,
    /// Replace the source X/Y coordinate variables with 2-D `lat`/`lon`.
    pub replace_xy: bool,
    /// X/Y variable names to drop when `replace_xy` is set. Empty means the
    /// source's own X/Y axis variables.
    pub xy_variables: BTreeSet<String>,
}

impl ExclusionRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimension(mut self, name: impl Into<String>) -> Self {
        self.dimensions.insert(name.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>) -> Self {
        self.variables.insert(name.into());
        self
    }

    pub fn with_replace_xy(mut self, replace: bool) -> Self {
        self.replace_xy = replace;
        self
    }

    /// Name an X/Y variable explicitly. Implies `replace_xy`.
    pub fn with_xy_variable(mut self, name: impl Into<String>) -> Self {
        self.replace_xy = true;
        self.xy_variables.insert(name.into());
        self
    }

    pub fn is_dimension_excluded(&self, name: &str) -> bool {
        self.dimensions.contains(name)
    }

    /// True if `name` is explicitly excluded, or is a configured X/Y
    /// variable while `replace_xy` is set.
    pub fn is_variable_excluded(&self, name: &str) -> bool {
        self.variables.contains(name) || (self.replace_xy && self.xy_variables.contains(name))
    }

    pub fn replace_xy_with_lat_lon(&self) -> bool {
        self.replace_xy
    }

    /// Every variable name to omit, given the source's X/Y axis variable
    /// names (used when no X/Y names are configured).
    pub fn variable_exclusions(&self, source_xy: &[&str]) -> BTreeSet<String> {
        let mut excluded = self.variables.clone();
        if self.replace_xy {
            if self.xy_variables.is_empty() {
                excluded.extend(source_xy.iter().map(|s| s.to_string()));
            } else {
                excluded.extend(self.xy_variables.iter().cloned());
            }
        }
        excluded
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.xy_variables.is_empty() && !self.replace_xy {
            return Err("xy_variables are set but replace_xy is false".to_string());
        }

        let names = self
            .dimensions
            .iter()
            .chain(&self.variables)
            .chain(&self.xy_variables);
        for name in names {
            if name.trim().is_empty() {
                return Err("exclusion names must not be empty".to_string());
            }
        }

        Ok(())
    }
}

/// Configuration for building and appending to an archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Name of the dimension that grows with each append.
    pub unlimited_dimension: String,

    /// Name of the synthesized grid-mapping variable, and the value of the
    /// `grid_mapping` attribute on every retained variable.
    pub grid_mapping: String,

    /// Variables appended from each new source.
    pub grid_variables: Vec<String>,

    pub exclusions: ExclusionRules,

    /// Fail `define` when the prototype has no dimension named
    /// `unlimited_dimension`.
    pub require_unlimited_dimension: bool,

    /// Also write each appended step's timestamp into the archive variable
    /// named after the unlimited dimension.
    pub write_time_coordinate: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            unlimited_dimension: "time".to_string(),
            grid_mapping: "Latitude_Longitude".to_string(),
            grid_variables: Vec::new(),
            exclusions: ExclusionRules::default(),
            require_unlimited_dimension: false,
            write_time_coordinate: false,
        }
    }
}

fn parse_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

impl ArchiveConfig {
    pub fn new(grid_variables: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            grid_variables: grid_variables.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionRules) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_unlimited_dimension(mut self, name: impl Into<String>) -> Self {
        self.unlimited_dimension = name.into();
        self
    }

    pub fn with_grid_mapping(mut self, name: impl Into<String>) -> Self {
        self.grid_mapping = name.into();
        self
    }

    pub fn with_write_time_coordinate(mut self, write: bool) -> Self {
        self.write_time_coordinate = write;
        self
    }

    pub fn with_require_unlimited_dimension(mut self, require: bool) -> Self {
        self.require_unlimited_dimension = require;
        self
    }

    /// Load configuration from environment variables on top of defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ARCHIVE_UNLIMITED_DIMENSION") {
            config.unlimited_dimension = val;
        }

        if let Ok(val) = std::env::var("ARCHIVE_GRID_MAPPING") {
            config.grid_mapping = val;
        }

        if let Ok(val) = std::env::var("ARCHIVE_GRID_VARIABLES") {
            config.grid_variables = parse_list(&val);
        }

        if let Ok(val) = std::env::var("ARCHIVE_EXCLUDE_DIMENSIONS") {
            config.exclusions.dimensions = parse_list(&val).into_iter().collect();
        }

        if let Ok(val) = std::env::var("ARCHIVE_EXCLUDE_VARIABLES") {
            config.exclusions.variables = parse_list(&val).into_iter().collect();
        }

        if let Ok(val) = std::env::var("ARCHIVE_REPLACE_XY") {
            config.exclusions.replace_xy = parse_bool(&val);
        }

        if let Ok(val) = std::env::var("ARCHIVE_XY_VARIABLES") {
            config.exclusions.xy_variables = parse_list(&val).into_iter().collect();
        }

        if let Ok(val) = std::env::var("ARCHIVE_REQUIRE_UNLIMITED") {
            config.require_unlimited_dimension = parse_bool(&val);
        }

        if let Ok(val) = std::env::var("ARCHIVE_WRITE_TIME_COORDINATE") {
            config.write_time_coordinate = parse_bool(&val);
        }

        config
    }

    /// Parse YAML after environment substitution, then validate.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let config: ArchiveConfig = serde_yaml::from_str(&expanded)
            .map_err(|e| ArchiveError::Config(format!("Failed to parse archive config YAML: {}", e)))?;
        config.validate().map_err(ArchiveError::Config)?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.unlimited_dimension.trim().is_empty() {
            return Err("unlimited_dimension must not be empty".to_string());
        }

        if self.grid_mapping.trim().is_empty() {
            return Err("grid_mapping must not be empty".to_string());
        }

        let mut seen = BTreeSet::new();
        for name in &self.grid_variables {
            if name.trim().is_empty() {
                return Err("grid variable names must not be empty".to_string());
            }
            if !seen.insert(name.as_str()) {
                return Err(format!("duplicate grid variable '{}'", name));
            }
            if self.exclusions.is_variable_excluded(name) {
                return Err(format!("grid variable '{}' is also excluded", name));
            }
        }

        self.exclusions.validate()
    }
}

/// Load and parse an archive config file with environment variable
/// substitution.
pub fn load_archive_config<P: AsRef<Path>>(path: P) -> Result<ArchiveConfig> {
    let content = fs::read_to_string(path.as_ref())?;
    ArchiveConfig::from_yaml_str(&content)
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut expr = String::new();
        let mut depth = 1;
        while depth > 0 {
            match chars.next() {
                Some('{') => {
                    depth += 1;
                    expr.push('{');
                }
                Some('}') => {
                    depth -= 1;
                    if depth > 0 {
                        expr.push('}');
                    }
                }
                Some(c) => expr.push(c),
                None => {
                    return Err(ArchiveError::Config(format!(
                        "Unclosed variable substitution: ${{{}",
                        expr
                    )))
                }
            }
        }

        result.push_str(&resolve_var_expr(&expr)?);
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    match expr.split_once(":-") {
        Some((name, default)) => match std::env::var(name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        },
        None => std::env::var(expr.trim()).map_err(|_| {
            ArchiveError::Config(format!("Environment variable {} not set", expr.trim()))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ArchiveConfig::default();
        assert_eq!(config.unlimited_dimension, "time");
        assert_eq!(config.grid_mapping, "Latitude_Longitude");
        assert!(!config.require_unlimited_dimension);
        assert!(!config.write_time_coordinate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_variable_exclusions_use_source_xy() {
        let rules = ExclusionRules::new()
            .with_variable("reftime")
            .with_replace_xy(true);
        let excluded = rules.variable_exclusions(&["x", "y"]);
        assert_eq!(
            excluded.into_iter().collect::<Vec<_>>(),
            vec!["reftime", "x", "y"]
        );

        let off = ExclusionRules::new().with_variable("reftime");
        assert_eq!(off.variable_exclusions(&["x", "y"]).len(), 1);
    }

    #[test]
    fn test_configured_xy_variables_win() {
        let rules = ExclusionRules::new().with_xy_variable("easting");
        assert!(rules.replace_xy_with_lat_lon());
        assert!(rules.is_variable_excluded("easting"));
        let excluded = rules.variable_exclusions(&["x", "y"]);
        assert!(excluded.contains("easting"));
        assert!(!excluded.contains("x"));
    }

    #[test]
    fn test_xy_variables_without_replace_rejected() {
        let mut rules = ExclusionRules::new();
        rules.xy_variables.insert("x".to_string());
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_empty() {
        let dup = ArchiveConfig::new(["temp", "temp"]);
        assert!(dup.validate().unwrap_err().contains("duplicate"));

        let empty = ArchiveConfig::new([""]);
        assert!(empty.validate().is_err());

        let unnamed = ArchiveConfig::default().with_unlimited_dimension(" ");
        assert!(unnamed.validate().is_err());

        let clash = ArchiveConfig::new(["temp"])
            .with_exclusions(ExclusionRules::new().with_variable("temp"));
        assert!(clash.validate().is_err());
    }

    #[test]
    fn test_from_yaml_with_env_expansion() {
        std::env::set_var("ARCHIVE_TEST_GRID_VAR", "Temperature_surface");
        std::env::remove_var("ARCHIVE_TEST_UNSET");
        let yaml = r#"
grid_variables:
  - ${ARCHIVE_TEST_GRID_VAR}
unlimited_dimension: ${ARCHIVE_TEST_UNSET:-time1}
exclusions:
  dimensions: [height_above_ground]
  replace_xy: true
"#;
        let config = ArchiveConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.grid_variables, vec!["Temperature_surface"]);
        assert_eq!(config.unlimited_dimension, "time1");
        assert_eq!(config.grid_mapping, "Latitude_Longitude");
        assert!(config.exclusions.is_dimension_excluded("height_above_ground"));
        assert!(config.exclusions.replace_xy_with_lat_lon());
    }

    #[test]
    fn test_from_yaml_missing_required_var() {
        std::env::remove_var("ARCHIVE_TEST_REQUIRED");
        let err = ArchiveConfig::from_yaml_str("grid_mapping: ${ARCHIVE_TEST_REQUIRED}").unwrap_err();
        assert!(matches!(err, ArchiveError::Config(_)));
    }

    #[test]
    fn test_unclosed_substitution() {
        assert!(expand_env_vars("value: ${OPEN").is_err());
    }

    #[test]
    fn test_load_archive_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.yaml");
        fs::write(&path, "grid_variables: [temp]\nwrite_time_coordinate: true\n").unwrap();
        let config = load_archive_config(&path).unwrap();
        assert_eq!(config.grid_variables, vec!["temp"]);
        assert!(config.write_time_coordinate);

        let missing = load_archive_config(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(missing, ArchiveError::Io(_)));
    }

    #[test]
    fn test_from_env_overrides_defaults() {
        let vars = [
            ("ARCHIVE_UNLIMITED_DIMENSION", "time1"),
            ("ARCHIVE_GRID_MAPPING", "LambertConformal_Projection"),
            ("ARCHIVE_GRID_VARIABLES", "Temperature_surface, Relative_humidity"),
            ("ARCHIVE_EXCLUDE_DIMENSIONS", "height_above_ground"),
            ("ARCHIVE_EXCLUDE_VARIABLES", "reftime,height_above_ground"),
            ("ARCHIVE_REPLACE_XY", "true"),
            ("ARCHIVE_XY_VARIABLES", "easting,northing"),
            ("ARCHIVE_REQUIRE_UNLIMITED", "1"),
            ("ARCHIVE_WRITE_TIME_COORDINATE", "TRUE"),
        ];
        for (name, value) in vars {
            std::env::set_var(name, value);
        }
        let config = ArchiveConfig::from_env();
        for (name, _) in vars {
            std::env::remove_var(name);
        }

        assert_eq!(config.unlimited_dimension, "time1");
        assert_eq!(config.grid_mapping, "LambertConformal_Projection");
        assert_eq!(
            config.grid_variables,
            vec!["Temperature_surface", "Relative_humidity"]
        );
        assert!(config.exclusions.is_dimension_excluded("height_above_ground"));
        assert!(config.exclusions.is_variable_excluded("reftime"));
        assert!(config.exclusions.is_variable_excluded("easting"));
        assert!(config.exclusions.replace_xy_with_lat_lon());
        assert!(config.require_unlimited_dimension);
        assert!(config.write_time_coordinate);
        assert!(config.validate().is_ok());

        let unset = ArchiveConfig::from_env();
        assert_eq!(unset.grid_variables, Vec::<String>::new());
        assert_eq!(unset.unlimited_dimension, "time");
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" a, b ,,c"), vec!["a", "b", "c"]);
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("yes"));
    }
}
