//! Error types for alarm configuration loading.

use std::path::PathBuf;

use crate::validation::ValidationError;

/// Errors that can occur while loading, validating or watching an alarm
/// configuration. The previously active configuration stays in place.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Filesystem I/O error.
    #[error("failed to read alarm config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error: {source}{}", .hint.as_deref().unwrap_or(""))]
    Json {
        #[source]
        source: serde_json::Error,
        hint: Option<String>,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported alarm config format '{0}', expected .json, .yml or .yaml")]
    UnsupportedFormat(String),

    /// One or more rules failed validation.
    #[error("invalid alarm config: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("alarm config has no file to reload from")]
    NoSource,

    /// Filesystem watcher error.
    #[error("config watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("rule manager has stopped")]
    ManagerStopped,
}

impl From<serde_json::Error> for ConfigError {
    fn from(source: serde_json::Error) -> Self {
        ConfigError::Json { source, hint: None }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
