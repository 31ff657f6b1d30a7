//! Alarm configuration validation with structured errors and suggestions.
//!
//! Checks every rule in a configuration: names, conditions, channels and
//! schedules. Returns a [`ValidationResult`] with errors (reject the load)
//! and warnings (logged, load proceeds).

mod channel_checks;
mod rule_checks;
mod schedule_checks;

pub mod fuzzy;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::RuleDefinition;

// ── Result types ────────────────────────────────────────────────────

/// Overall validation outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A blocking validation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// JSON-path-like location, e.g. `"alarms[2].channels[0].email.to"`.
    pub path: String,
    pub message: String,
    /// Optional "Did you mean …?" suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A non-blocking advisory warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

fn write_entry(
    f: &mut fmt::Formatter<'_>,
    path: &str,
    message: &str,
    suggestion: Option<&str>,
) -> fmt::Result {
    if path.is_empty() {
        write!(f, "{message}")?;
    } else {
        write!(f, "{path}: {message}")?;
    }
    if let Some(s) = suggestion {
        write!(f, " (did you mean '{s}'?)")?;
    }
    Ok(())
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_entry(f, &self.path, &self.message, self.suggestion.as_deref())
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_entry(f, &self.path, &self.message, self.suggestion.as_deref())
    }
}

impl ValidationResult {
    pub(crate) fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    pub(crate) fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warn_with_suggestion(path, message, None::<String>);
    }

    pub(crate) fn warn_with_suggestion(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
        suggestion: Option<impl Into<String>>,
    ) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
            suggestion: suggestion.map(Into::into),
        });
    }

    /// Log every warning at `warn` level.
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            tracing::warn!(path = %warning.path, "{warning}");
        }
    }
}

// ── Public API ──────────────────────────────────────────────────────

/// Validate a single rule in isolation.
pub fn validate_rule(rule: &RuleDefinition) -> ValidationResult {
    let mut result = ValidationResult::new();
    check_rule(rule, "alarm", &mut result);
    result
}

/// Validate a full rule set, including cross-rule name uniqueness.
pub fn validate_rules(rules: &[RuleDefinition]) -> ValidationResult {
    let mut result = ValidationResult::new();
    let mut seen = HashSet::new();
    for (i, rule) in rules.iter().enumerate() {
        let path = format!("alarms[{i}]");
        check_rule(rule, &path, &mut result);
        let name = rule.name.trim();
        if !name.is_empty() && !seen.insert(name) {
            result.error(
                format!("{path}.name"),
                format!("Duplicate alarm name '{name}'"),
            );
        }
    }
    result
}

fn check_rule(rule: &RuleDefinition, path: &str, result: &mut ValidationResult) {
    rule_checks::validate_identity(rule, path, result);
    rule_checks::validate_condition(rule, path, result);
    channel_checks::validate_channels(rule, path, result);
    schedule_checks::validate_schedule(rule, path, result);
}
