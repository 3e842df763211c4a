use crate::error::{GeodrillError, Result};
use crate::trajectory::DEFAULT_FALLBACK_STEP;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Placeholder replaced by the iteration cursor in source URL templates
pub const INDEX_PLACEHOLDER: &str = "{index}";

/// Current drilling-data endpoint layout
pub const DEFAULT_SOURCE_PATH_TEMPLATE: &str = "/drilling-data?index={index}";

/// Older deployments expose the data directly on the base URL
pub const LEGACY_SOURCE_PATH_TEMPLATE: &str = "?index={index}";

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for the polling worker
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// Path appended to a project's external API URL, containing `{index}`
    pub source_path_template: ConfigValue<String>,
    /// Depth increment used when a step length is missing
    pub fallback_step_md: ConfigValue<f64>,
    /// Polling interval (seconds) given to new projects
    pub default_polling_interval: ConfigValue<u64>,
    /// Iterations run when a start request omits the count
    pub default_iterations: ConfigValue<u32>,
    /// Upper bound on iterations per start request
    pub max_iterations: ConfigValue<u32>,
    /// Object storage bucket holding frame images
    pub image_bucket: ConfigValue<String>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            source_path_template: ConfigValue::new(
                DEFAULT_SOURCE_PATH_TEMPLATE.to_string(),
                ConfigSource::Default,
            ),
            fallback_step_md: ConfigValue::new(DEFAULT_FALLBACK_STEP, ConfigSource::Default),
            default_polling_interval: ConfigValue::new(5, ConfigSource::Default),
            default_iterations: ConfigValue::new(5, ConfigSource::Default),
            max_iterations: ConfigValue::new(500, ConfigSource::Default),
            image_bucket: ConfigValue::new("project-images".to_string(), ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| GeodrillError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| GeodrillError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(template) = file_config.source_path_template {
            self.source_path_template.update(template, ConfigSource::File);
        }

        if let Some(step) = file_config.fallback_step_md {
            self.fallback_step_md.update(step, ConfigSource::File);
        }

        if let Some(interval) = file_config.default_polling_interval {
            self.default_polling_interval.update(interval, ConfigSource::File);
        }

        if let Some(iterations) = file_config.default_iterations {
            self.default_iterations.update(iterations, ConfigSource::File);
        }

        if let Some(max) = file_config.max_iterations {
            self.max_iterations.update(max, ConfigSource::File);
        }

        if let Some(bucket) = file_config.image_bucket {
            self.image_bucket.update(bucket, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        if let Ok(template) = env::var("GEODRILL_SOURCE_PATH_TEMPLATE") {
            self.source_path_template.update(template, ConfigSource::Environment);
        }

        if let Ok(step_str) = env::var("GEODRILL_FALLBACK_STEP") {
            match step_str.parse::<f64>() {
                Ok(step) => self.fallback_step_md.update(step, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEODRILL_FALLBACK_STEP value '{}': expected a number",
                    step_str
                ),
            }
        }

        if let Ok(interval_str) = env::var("GEODRILL_DEFAULT_INTERVAL") {
            match interval_str.parse::<u64>() {
                Ok(interval) => {
                    self.default_polling_interval.update(interval, ConfigSource::Environment)
                }
                Err(_) => tracing::warn!(
                    "Invalid GEODRILL_DEFAULT_INTERVAL value '{}': expected whole seconds",
                    interval_str
                ),
            }
        }

        if let Ok(iterations_str) = env::var("GEODRILL_DEFAULT_ITERATIONS") {
            match iterations_str.parse::<u32>() {
                Ok(iterations) => {
                    self.default_iterations.update(iterations, ConfigSource::Environment)
                }
                Err(_) => tracing::warn!(
                    "Invalid GEODRILL_DEFAULT_ITERATIONS value '{}': expected an integer",
                    iterations_str
                ),
            }
        }

        if let Ok(max_str) = env::var("GEODRILL_MAX_ITERATIONS") {
            match max_str.parse::<u32>() {
                Ok(max) => self.max_iterations.update(max, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEODRILL_MAX_ITERATIONS value '{}': expected an integer",
                    max_str
                ),
            }
        }

        if let Ok(bucket) = env::var("GEODRILL_IMAGE_BUCKET") {
            self.image_bucket.update(bucket, ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(template) = overrides.source_path_template {
            self.source_path_template.update(template, ConfigSource::Cli);
        }

        if let Some(step) = overrides.fallback_step_md {
            self.fallback_step_md.update(step, ConfigSource::Cli);
        }

        if let Some(iterations) = overrides.default_iterations {
            self.default_iterations.update(iterations, ConfigSource::Cli);
        }

        if let Some(max) = overrides.max_iterations {
            self.max_iterations.update(max, ConfigSource::Cli);
        }
    }

    /// Reject values the poll worker cannot run with
    pub fn validate(&self) -> Result<()> {
        validate_path_template(&self.source_path_template.value)?;

        let step = self.fallback_step_md.value;
        if !step.is_finite() || step <= 0.0 {
            return Err(GeodrillError::ConfigInvalid {
                key: "fallback_step_md".to_string(),
                reason: format!("must be a positive number, got {}", step),
            });
        }

        if self.max_iterations.value == 0 {
            return Err(GeodrillError::ConfigInvalid {
                key: "max_iterations".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.default_iterations.value > self.max_iterations.value {
            return Err(GeodrillError::ConfigInvalid {
                key: "default_iterations".to_string(),
                reason: format!(
                    "{} exceeds max_iterations ({})",
                    self.default_iterations.value, self.max_iterations.value
                ),
            });
        }

        if self.image_bucket.value.trim().is_empty() {
            return Err(GeodrillError::ConfigInvalid {
                key: "image_bucket".to_string(),
                reason: "cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "source_path_template".to_string(),
            (self.source_path_template.value.clone(), self.source_path_template.source),
        );
        map.insert(
            "fallback_step_md".to_string(),
            (self.fallback_step_md.value.to_string(), self.fallback_step_md.source),
        );
        map.insert(
            "default_polling_interval".to_string(),
            (
                format!("{}s", self.default_polling_interval.value),
                self.default_polling_interval.source,
            ),
        );
        map.insert(
            "default_iterations".to_string(),
            (self.default_iterations.value.to_string(), self.default_iterations.source),
        );
        map.insert(
            "max_iterations".to_string(),
            (self.max_iterations.value.to_string(), self.max_iterations.source),
        );
        map.insert(
            "image_bucket".to_string(),
            (self.image_bucket.value.clone(), self.image_bucket.source),
        );

        map
    }
}

impl Default for LayeredConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    source_path_template: Option<String>,
    fallback_step_md: Option<f64>,
    default_polling_interval: Option<u64>,
    default_iterations: Option<u32>,
    max_iterations: Option<u32>,
    image_bucket: Option<String>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub source_path_template: Option<String>,
    pub fallback_step_md: Option<f64>,
    pub default_iterations: Option<u32>,
    pub max_iterations: Option<u32>,
}

/// Check that a source path template carries the index placeholder
pub fn validate_path_template(template: &str) -> Result<()> {
    if !template.contains(INDEX_PLACEHOLDER) {
        return Err(GeodrillError::ConfigInvalid {
            key: "source_path_template".to_string(),
            reason: format!("'{}' must contain {}", template, INDEX_PLACEHOLDER),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = LayeredConfig::with_defaults();
        assert_eq!(config.source_path_template.value, DEFAULT_SOURCE_PATH_TEMPLATE);
        assert_eq!(config.source_path_template.source, ConfigSource::Default);
        assert_eq!(config.fallback_step_md.value, 10.0);
        assert_eq!(config.default_iterations.value, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_precedence() {
        let mut value = ConfigValue::new(100, ConfigSource::Default);

        value.update(200, ConfigSource::File);
        assert_eq!(value.value, 200);
        assert_eq!(value.source, ConfigSource::File);

        value.update(300, ConfigSource::Environment);
        assert_eq!(value.value, 300);

        value.update(400, ConfigSource::Cli);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);

        // Lower precedence should not override
        value.update(500, ConfigSource::File);
        assert_eq!(value.value, 400);
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
source_path_template = "?index={{index}}"
fallback_step_md = 2.5
default_polling_interval = 1
max_iterations = 20
"#
        )
        .unwrap();

        let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.source_path_template.value, LEGACY_SOURCE_PATH_TEMPLATE);
        assert_eq!(config.source_path_template.source, ConfigSource::File);
        assert_eq!(config.fallback_step_md.value, 2.5);
        assert_eq!(config.default_polling_interval.value, 1);
        assert_eq!(config.max_iterations.value, 20);
        assert_eq!(config.image_bucket.source, ConfigSource::Default);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = LayeredConfig::with_defaults();
        config.source_path_template.update("/drilling-data".to_string(), ConfigSource::Cli);
        assert!(config.validate().is_err());

        let mut config = LayeredConfig::with_defaults();
        config.fallback_step_md.update(0.0, ConfigSource::Cli);
        assert!(config.validate().is_err());

        let mut config = LayeredConfig::with_defaults();
        config.update_from_cli(CliConfigOverrides {
            default_iterations: Some(10),
            max_iterations: Some(3),
            ..CliConfigOverrides::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inspection_map() {
        let config = LayeredConfig::with_defaults();
        let map = config.to_inspection_map();

        let (interval, source) = &map["default_polling_interval"];
        assert_eq!(interval, "5s");
        assert_eq!(*source, ConfigSource::Default);
        assert!(map.contains_key("image_bucket"));
    }
}
