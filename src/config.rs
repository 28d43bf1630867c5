//! Pipeline configuration loaded from TOML.
//!
//! A pipeline file names the input and output LAS files, the logging setup and
//! an ordered list of `[[stages]]`, each tagged with its `type`:
//!
//! ```toml
//! input = "tile.las"
//! output = "tile.out.las"
//!
//! [[stages]]
//! type = "assign"
//! dimension = "REF_DOMAIN"
//! value = 1
//! where = { op = "in", dimension = "Classification", values = [6] }
//!
//! [[stages]]
//! type = "radius_assign"
//! src_domain = ""
//! radius = 2.0
//! ```

use pcdomain_filters::{
    AssignOptions, DistanceParams, FilterError, GeoOptions, GridOptions, Predicate,
    RadiusAssignOptions, RadiusSearchOptions,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cli::CliArgs;
use crate::error::AppError;

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl LoggingSettings {
    /// Settings to install before the pipeline runs: the config file's when
    /// it loaded, the defaults otherwise, with the command-line level on top.
    pub fn resolve(config: Option<&PipelineConfig>, args: &CliArgs) -> Self {
        let mut settings = config.map(|c| c.logging.clone()).unwrap_or_default();
        if let Some(level) = &args.log_level {
            settings.level = level.clone();
        }
        settings
    }
}

/// One entry of `[[stages]]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageConfig {
    Assign(AssignOptions),
    ClassifyByDistance(DistanceParams),
    RadiusAssign(RadiusAssignOptions),
    RadiusSearch(RadiusSearchOptions),
    GridDecimation(GridOptions),
    ClassifyByGeo(GeoOptions),
}

impl StageConfig {
    pub fn name(&self) -> &'static str {
        match self {
            StageConfig::Assign(_) => "assign",
            StageConfig::ClassifyByDistance(_) => "classify_by_distance",
            StageConfig::RadiusAssign(_) => "radius_assign",
            StageConfig::RadiusSearch(_) => "radius_search",
            StageConfig::GridDecimation(_) => "grid_decimation",
            StageConfig::ClassifyByGeo(_) => "classify_by_geo",
        }
    }

    /// Checks the options without touching any point table.
    pub fn validate(&self) -> Result<(), FilterError> {
        match self {
            StageConfig::Assign(opts) => opts.validate(),
            StageConfig::ClassifyByDistance(params) => params.validate(),
            StageConfig::RadiusAssign(opts) => opts.validate(),
            StageConfig::RadiusSearch(opts) => opts.validate(),
            StageConfig::GridDecimation(opts) => opts.validate().map(|_| ()),
            StageConfig::ClassifyByGeo(opts) => opts.prepare().map(|_| ()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub input: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Only points matching this predicate are written to `output`.
    #[serde(default)]
    pub keep_where: Option<Predicate>,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

impl PipelineConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, AppError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies command-line overrides.
    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(input) = &args.input {
            self.input = Some(input.clone());
        }
        if let Some(output) = &args.output {
            self.output = Some(output.clone());
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.input.is_none() {
            return Err(AppError::Config("no input file given".to_string()));
        }
        if self.stages.is_empty() {
            return Err(AppError::Config("pipeline has no stages".to_string()));
        }
        for (index, stage) in self.stages.iter().enumerate() {
            stage.validate().map_err(|e| {
                AppError::Config(format!("stage {} ({}): {}", index, stage.name(), e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcdomain_filters::DimKind;

    #[test]
    fn logging_resolves_without_config() {
        let args = CliArgs::try_parse_from(["pcdomain", "-l", "debug"]).unwrap();
        let settings = LoggingSettings::resolve(None, &args);
        assert_eq!(settings.level, "debug");
        assert!(!settings.json_format);

        let args = CliArgs::try_parse_from(["pcdomain"]).unwrap();
        assert_eq!(LoggingSettings::resolve(None, &args), LoggingSettings::default());
    }

    #[test]
    fn logging_resolves_config_then_cli() {
        let config =
            PipelineConfig::from_toml_str("[logging]\nlevel = \"warn\"\njson_format = true\n")
                .unwrap();
        let args = CliArgs::try_parse_from(["pcdomain"]).unwrap();
        let settings = LoggingSettings::resolve(Some(&config), &args);
        assert_eq!(settings.level, "warn");
        assert!(settings.json_format);

        let args = CliArgs::try_parse_from(["pcdomain", "-l", "trace"]).unwrap();
        assert_eq!(LoggingSettings::resolve(Some(&config), &args).level, "trace");
    }

    const FULL: &str = r#"
input = "in.las"
output = "out.las"
keep_where = { op = "equals", dimension = "grid", value = 1 }

[logging]
level = "debug"

[[stages]]
type = "assign"
dimension = "REF_DOMAIN"
value = 1
where = { op = "in", dimension = "Classification", values = [6, 9] }

[[stages]]
type = "classify_by_distance"
src_domain = 2
reference_domain = 6
distance_max = 3.5

[[stages]]
type = "radius_assign"
src_domain = ""
radius = 2.0
max2d_above = 0.5

[[stages]]
type = "radius_search"
output_name_attribute = "near"
search_2d_bellow = 1.5

[[stages]]
type = "grid_decimation"
resolution = 5.0
output_type = "min"

[[stages]]
type = "classify_by_geo"
[[stages.polygons]]
exterior = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]
class_value = 12
"#;

    #[test]
    fn parses_every_stage_type() {
        let config = PipelineConfig::from_toml_str(FULL).unwrap();
        assert_eq!(config.input, Some(PathBuf::from("in.las")));
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.json_format);
        let names: Vec<_> = config.stages.iter().map(StageConfig::name).collect();
        assert_eq!(
            names,
            vec![
                "assign",
                "classify_by_distance",
                "radius_assign",
                "radius_search",
                "grid_decimation",
                "classify_by_geo",
            ]
        );
        config.validate().unwrap();
    }

    #[test]
    fn stage_defaults_are_filled_in() {
        let config = PipelineConfig::from_toml_str(FULL).unwrap();
        match &config.stages[0] {
            StageConfig::Assign(opts) => {
                assert_eq!(opts.kind, DimKind::Uint8);
                assert!(opts.selection.is_some());
            }
            other => panic!("unexpected stage {other:?}"),
        }
        match &config.stages[1] {
            StageConfig::ClassifyByDistance(params) => {
                assert_eq!(params.new_class_value, 100);
                assert_eq!(params.distance_min, 0.0);
                assert!(!params.only_above);
            }
            other => panic!("unexpected stage {other:?}"),
        }
        match &config.stages[2] {
            StageConfig::RadiusAssign(opts) => {
                assert_eq!(opts.reference_domain, "REF_DOMAIN");
                assert_eq!(opts.output_dimension, "radius");
                assert_eq!(opts.max2d_below, -1.0);
            }
            other => panic!("unexpected stage {other:?}"),
        }
        match &config.stages[3] {
            StageConfig::RadiusSearch(opts) => {
                assert_eq!(opts.search_2d_below, 1.5);
                assert_eq!(opts.src_domain, "SRC_DOMAIN");
            }
            other => panic!("unexpected stage {other:?}"),
        }
        match &config.stages[4] {
            StageConfig::GridDecimation(opts) => {
                assert_eq!(opts.output_dimension, "grid");
                assert!(opts.output_wkt.is_empty());
            }
            other => panic!("unexpected stage {other:?}"),
        }
    }

    #[test]
    fn unknown_stage_type_is_rejected() {
        let err = PipelineConfig::from_toml_str("[[stages]]\ntype = \"smooth\"\n").unwrap_err();
        assert!(matches!(err, AppError::Toml(_)));
    }

    #[test]
    fn unknown_option_is_rejected() {
        let text = "[[stages]]\ntype = \"radius_assign\"\nradious = 2.0\n";
        assert!(PipelineConfig::from_toml_str(text).is_err());
    }

    #[test]
    fn class_value_must_fit_a_byte() {
        let text = "[[stages]]\ntype = \"classify_by_distance\"\nnew_class_value = 300\n";
        assert!(PipelineConfig::from_toml_str(text).is_err());
    }

    #[test]
    fn validation_names_failing_stage() {
        let text = r#"
input = "in.las"
[[stages]]
type = "grid_decimation"
resolution = 0.0
"#;
        let config = PipelineConfig::from_toml_str(text).unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("grid_decimation"), "{err}");
        assert!(err.contains("resolution"), "{err}");
    }

    #[test]
    fn missing_input_is_a_config_error() {
        let text = "[[stages]]\ntype = \"grid_decimation\"\n";
        let config = PipelineConfig::from_toml_str(text).unwrap();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn cli_overrides_file() {
        let mut config = PipelineConfig::from_toml_str(FULL).unwrap();
        let args =
            CliArgs::try_parse_from(["pcdomain", "-i", "other.las", "-l", "warn"]).unwrap();
        config.apply_cli(&args);
        assert_eq!(config.input, Some(PathBuf::from("other.las")));
        assert_eq!(config.output, Some(PathBuf::from("out.las")));
        assert_eq!(config.logging.level, "warn");
    }
}
