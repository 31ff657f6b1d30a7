//! [`AlarmConfig`] loading from a file or inline JSON.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::schema::{AlarmFile, RuleDefinition};
use crate::validation::{validate_rules, ValidationWarning};

use super::error::{ConfigError, Result};

/// Where an alarm configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A `.json`, `.yml` or `.yaml` file; reloadable and watchable.
    File(PathBuf),
    /// A JSON document given directly, e.g. on the command line.
    Inline(String),
}

impl ConfigSource {
    /// Interpret a command-line style argument: `@path` names a file,
    /// anything else is inline JSON.
    pub fn from_arg(input: &str) -> Self {
        match input.strip_prefix('@') {
            Some(path) => ConfigSource::File(PathBuf::from(path)),
            None => ConfigSource::Inline(input.to_string()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::File(path) => Some(path),
            ConfigSource::Inline(_) => None,
        }
    }

    /// Read and parse without validating.
    pub fn read(&self) -> Result<AlarmFile> {
        match self {
            ConfigSource::File(path) => parse_file(path),
            ConfigSource::Inline(json) => parse_inline(json),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Inline(_) => f.write_str("<inline>"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(Format::Json),
            "yml" | "yaml" => Ok(Format::Yaml),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Parse an alarm file, choosing the format by extension.
pub fn parse_file(path: &Path) -> Result<AlarmFile> {
    let format = Format::from_path(path)?;
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match format {
        Format::Json => Ok(serde_json::from_str(&contents)?),
        Format::Yaml => Ok(serde_yaml::from_str(&contents)?),
    }
}

/// Parse inline JSON, hinting at the `@` prefix when the input looks
/// like a file path.
pub fn parse_inline(json: &str) -> Result<AlarmFile> {
    serde_json::from_str(json).map_err(|source| {
        let trimmed = json.trim();
        let looks_like_path = !trimmed.starts_with('{')
            && (trimmed.ends_with(".json")
                || trimmed.ends_with(".yml")
                || trimmed.ends_with(".yaml")
                || trimmed.contains('/'));
        let hint = looks_like_path.then(|| {
            format!(". Did you mean '@{trimmed}'? File paths must be prefixed with @")
        });
        ConfigError::Json { source, hint }
    })
}

/// A validated set of alarm rules and where it came from.
#[derive(Debug, Clone)]
pub struct AlarmConfig {
    pub alarms: Vec<RuleDefinition>,
    pub source: Option<ConfigSource>,
    /// Advisory findings from validation.
    pub warnings: Vec<ValidationWarning>,
}

impl AlarmConfig {
    /// Read, parse and validate `source`.
    pub fn load(source: ConfigSource) -> Result<Self> {
        let file = source.read()?;
        let config = Self::validated(file.alarms, Some(source))?;
        info!(
            source = %config.source_display(),
            alarms = config.alarms.len(),
            warnings = config.warnings.len(),
            "loaded alarm config"
        );
        Ok(config)
    }

    /// Convenience for [`load`](Self::load) with a file path.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::load(ConfigSource::File(path.into()))
    }

    /// Validate rules supplied programmatically.
    pub fn from_rules(alarms: Vec<RuleDefinition>) -> Result<Self> {
        Self::validated(alarms, None)
    }

    fn validated(alarms: Vec<RuleDefinition>, source: Option<ConfigSource>) -> Result<Self> {
        let result = validate_rules(&alarms);
        if !result.valid {
            return Err(ConfigError::Validation(result.errors));
        }
        result.log_warnings();
        Ok(Self {
            alarms,
            source,
            warnings: result.warnings,
        })
    }

    pub fn enabled_count(&self) -> usize {
        self.alarms.iter().filter(|a| a.enabled).count()
    }

    fn source_display(&self) -> String {
        self.source
            .as_ref()
            .map_or_else(|| "<programmatic>".to_string(), ToString::to_string)
    }
}
