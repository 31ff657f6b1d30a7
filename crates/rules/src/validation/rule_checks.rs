//! Rule identity and condition checks.

use stormwatch_core::Field;

use super::fuzzy::fuzzy_match;
use super::ValidationResult;
use crate::expression::{Condition, Diagnostic};
use crate::schema::RuleDefinition;

pub(super) fn validate_identity(rule: &RuleDefinition, path: &str, result: &mut ValidationResult) {
    if rule.name.trim().is_empty() {
        result.error(format!("{path}.name"), "Alarm name is required");
    }
}

pub(super) fn validate_condition(rule: &RuleDefinition, path: &str, result: &mut ValidationResult) {
    let path = format!("{path}.condition");
    if rule.condition.trim().is_empty() {
        result.error(path, "Condition is required");
        return;
    }

    let condition = match Condition::parse(&rule.condition) {
        Ok(c) => c,
        Err(e) => {
            result.error(path, format!("Invalid condition: {e}"));
            return;
        }
    };

    let known = Field::known_names();
    for diagnostic in condition.diagnostics() {
        match diagnostic {
            Diagnostic::UnknownField(name) => {
                result.warn_with_suggestion(
                    &path,
                    format!("Unknown field '{name}'; the condition will never fire"),
                    fuzzy_match(&name, &known),
                );
            }
            Diagnostic::InvalidLiteral { literal, reason } => {
                result.warn(&path, format!("Invalid value '{literal}': {reason}"));
            }
        }
    }
}
