//! Template rendering for notification messages.
//!
//! Templates use `{{name}}` placeholders. Known names are substituted with
//! formatted observation values and rule metadata; unknown placeholders are
//! left in the output verbatim. Templates are rendered through minijinja so
//! filters such as `{{ alarm_name | upper }}` work, and any template the
//! engine rejects falls back to plain placeholder substitution. Rendering
//! never fails.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use stormwatch_core::field::{
    cardinal_direction, celsius_to_fahrenheit, mm_to_inches, mps_to_mph,
};
use stormwatch_core::{Field, Observation};

use crate::format;
use crate::traits::NotifyError;

/// Rule metadata exposed to templates.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AlarmSummary {
    pub name: String,
    pub description: String,
    pub condition: String,
    pub tags: Vec<String>,
    pub enabled: bool,
    pub cooldown_secs: u64,
}

/// Everything a template can reference for one firing of a rule.
#[derive(Debug, Clone)]
pub struct AlarmContext {
    pub alarm: AlarmSummary,
    pub station: String,
    pub observation: Observation,
    /// Previous values as they were before this observation was applied.
    pub previous: HashMap<Field, f64>,
    /// Values captured when the rule last fired.
    pub trigger_snapshot: HashMap<Field, f64>,
    /// Observation time in the station's zone.
    pub local_time: DateTime<FixedOffset>,
    pub uptime: Duration,
}

impl AlarmContext {
    /// Value shown for `last_<field>`: the snapshot from the rule's last
    /// fire when there is one, otherwise the previous observation's value.
    pub fn last_value(&self, field: Field) -> Option<f64> {
        self.trigger_snapshot
            .get(&field)
            .or_else(|| self.previous.get(&field))
            .copied()
    }

    /// Placeholder name to rendered string.
    ///
    /// `html` selects the HTML flavour of the composite blocks.
    pub fn variables(&self, html: bool) -> BTreeMap<String, String> {
        let obs = &self.observation;
        let mut vars = BTreeMap::new();
        let mut put = |k: &str, v: String| {
            vars.insert(k.to_string(), v);
        };

        for field in Field::ALL {
            put(field.name(), format::format_value(field, obs.get(field)));
            put(
                &format!("last_{}", field.name()),
                self.last_value(field)
                    .map(|v| format::format_value(field, v))
                    .unwrap_or_else(|| "N/A".to_string()),
            );
        }

        put("temperature_c", format!("{:.1}", obs.temperature));
        put(
            "temperature_f",
            format!("{:.1}", celsius_to_fahrenheit(obs.temperature)),
        );
        put("wind_speed_mph", format!("{:.1}", mps_to_mph(obs.wind_speed)));
        put("wind_gust_mph", format!("{:.1}", mps_to_mph(obs.wind_gust)));
        put(
            "wind_cardinal",
            cardinal_direction(obs.wind_direction).to_string(),
        );
        put("rain_daily_in", format!("{:.2}", mm_to_inches(obs.rain_daily)));
        put(
            "timestamp",
            self.local_time.format("%Y-%m-%d %H:%M:%S %:z").to_string(),
        );

        put("station", self.station.clone());
        put("alarm_name", self.alarm.name.clone());
        put("alarm_description", self.alarm.description.clone());
        put("alarm_condition", self.alarm.condition.clone());
        put("condition", self.alarm.condition.clone());
        put("alarm_tags", self.alarm.tags.join(", "));
        put("message", format!("ALARM: {} triggered", self.alarm.name));

        put("app_info", format::app_info(self.uptime, html));
        put("alarm_info", format::alarm_info(&self.alarm, html));
        put("sensor_info", format::sensor_info(self, html));

        vars
    }
}

/// Renders notification templates.
///
/// A fresh [`minijinja::Environment`] is created per render call since
/// templates are dynamic strings, not pre-registered files.
#[derive(Debug, Default)]
pub struct TemplateRenderer {
    _private: (),
}

/// Names usable in templates besides the placeholder variables.
const ENGINE_NAMES: &[&str] = &["values", "env"];

impl TemplateRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Build a configured minijinja environment with custom filters and globals.
    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.set_keep_trailing_newline(true);

        env.add_filter("round", round_filter);
        env.add_filter("lower", lower_filter);
        env.add_filter("upper", upper_filter);

        env.add_function("env", env_function);

        env
    }

    /// Render `template` against `ctx`.
    pub fn render(&self, template: &str, ctx: &AlarmContext) -> String {
        let vars = ctx.variables(format::is_html(template));
        let is_known =
            |name: &str| vars.contains_key(name) || ENGINE_NAMES.contains(&name);
        let protected = protect_unknown(template, &is_known);

        let mut engine_ctx: BTreeMap<&str, minijinja::Value> = vars
            .iter()
            .map(|(k, v)| (k.as_str(), minijinja::Value::from(v.as_str())))
            .collect();
        let values: BTreeMap<&str, f64> = Field::ALL
            .iter()
            .map(|f| (f.name(), ctx.observation.get(*f)))
            .collect();
        engine_ctx.insert("values", minijinja::Value::from_serialize(&values));

        match Self::build_env().render_str(&protected, engine_ctx) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::debug!(error = %e, "template engine rejected template, using plain substitution");
                substitute(template, &vars)
            }
        }
    }

    /// Check that a template parses.
    ///
    /// A template that fails here still renders through plain substitution,
    /// so callers treat this as advisory.
    pub fn validate(&self, template: &str) -> Result<(), NotifyError> {
        let protected = protect_unknown(template, &|name: &str| {
            KNOWN_PLACEHOLDERS.contains(&name) || ENGINE_NAMES.contains(&name)
        });
        let env = Self::build_env();
        env.template_from_str(&protected)
            .map_err(|e| NotifyError::Config(format!("template: {e}")))?;
        Ok(())
    }
}

/// Placeholders that are not derived from a field name.
const KNOWN_PLACEHOLDERS: &[&str] = &[
    "temperature", "humidity", "pressure", "wind_speed", "wind_gust", "wind_direction", "lux",
    "uv", "rain_rate", "rain_daily", "lightning_count", "lightning_distance",
    "precipitation_type", "temperature_c", "temperature_f", "wind_speed_mph", "wind_gust_mph",
    "wind_cardinal", "rain_daily_in", "timestamp", "station", "alarm_name", "alarm_description",
    "alarm_condition", "condition", "alarm_tags", "message", "app_info", "alarm_info",
    "sensor_info",
];

/// True if `name` is a placeholder any context can fill.
pub fn is_known_placeholder(name: &str) -> bool {
    KNOWN_PLACEHOLDERS.contains(&name)
        || name
            .strip_prefix("last_")
            .and_then(Field::resolve)
            .is_some_and(|f| f.name() == &name[5..])
}

/// Names of all `{{ ... }}` expressions in a template, by leading identifier.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    for_each_expression(template, |expr| {
        if let Some(inner) = expr {
            names.push(leading_identifier(inner).to_string());
        }
    });
    names
}

/// Walk a template, calling `f` with `Some(inner)` for each complete
/// `{{ inner }}` expression and `None` for the text between them.
fn for_each_expression(template: &str, mut f: impl FnMut(Option<&str>)) {
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                f(Some(&after[..end]));
                rest = &after[end + 2..];
            }
            None => break,
        }
    }
}

fn leading_identifier(inner: &str) -> &str {
    let trimmed = inner.trim_start_matches(['-', '+']).trim_start();
    let end = trimmed
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}

/// Wrap every `{{ ... }}` whose leading identifier is unknown in a raw
/// block so the engine emits it untouched.
fn protect_unknown(template: &str, is_known: &dyn Fn(&str) -> bool) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let expr = &rest[start..start + end + 4];
        let name = leading_identifier(&after[..end]);
        if !name.is_empty() && is_known(name) {
            out.push_str(expr);
        } else {
            out.push_str("{% raw %}");
            out.push_str(expr);
            out.push_str("{% endraw %}");
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

/// Replace `{{name}}` (whitespace allowed) with known values; everything
/// else is copied through.
fn substitute(template: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        match vars.get(after[..end].trim()) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + end + 4]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

const MAX_ROUND_DECIMALS: u32 = 10;

/// Custom filter: round a float to N decimal places, at most ten.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0).min(MAX_ROUND_DECIMALS);
    format!("{:.prec$}", value, prec = n as usize)
}

fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

fn upper_filter(value: String) -> String {
    value.to_uppercase()
}

/// Global function: read an environment variable by name.
fn env_function(name: String) -> String {
    match std::env::var(&name) {
        Ok(val) => val,
        Err(_) => {
            tracing::warn!(var = %name, "Environment variable not found, returning empty string");
            String::new()
        }
    }
}
