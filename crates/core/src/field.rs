//! Canonical sensor fields, name aliases, and unit conversions.
//!
//! Every value stored in an [`Observation`](crate::Observation) is in the
//! field's native unit: Celsius for temperature, metres per second for wind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A sensor field the rule engine knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Temperature,
    Humidity,
    Pressure,
    WindSpeed,
    WindGust,
    WindDirection,
    Lux,
    Uv,
    RainRate,
    RainDaily,
    LightningCount,
    LightningDistance,
    PrecipitationType,
}

/// Alternate spellings accepted in conditions, mapped to their canonical field.
const ALIASES: &[(&str, Field)] = &[
    ("temp", Field::Temperature),
    ("wind", Field::WindSpeed),
    ("gust", Field::WindGust),
    ("light", Field::Lux),
    ("illuminance", Field::Lux),
    ("uv_index", Field::Uv),
    ("uvi", Field::Uv),
    ("rain_accumulated", Field::RainRate),
    ("rain_accumulation", Field::RainDaily),
    ("rain_total", Field::RainDaily),
];

impl Field {
    /// All fields in display order.
    pub const ALL: [Field; 13] = [
        Field::Temperature,
        Field::Humidity,
        Field::Pressure,
        Field::WindSpeed,
        Field::WindGust,
        Field::WindDirection,
        Field::Lux,
        Field::Uv,
        Field::RainRate,
        Field::RainDaily,
        Field::LightningCount,
        Field::LightningDistance,
        Field::PrecipitationType,
    ];

    /// Canonical snake_case name.
    pub fn name(self) -> &'static str {
        match self {
            Field::Temperature => "temperature",
            Field::Humidity => "humidity",
            Field::Pressure => "pressure",
            Field::WindSpeed => "wind_speed",
            Field::WindGust => "wind_gust",
            Field::WindDirection => "wind_direction",
            Field::Lux => "lux",
            Field::Uv => "uv",
            Field::RainRate => "rain_rate",
            Field::RainDaily => "rain_daily",
            Field::LightningCount => "lightning_count",
            Field::LightningDistance => "lightning_distance",
            Field::PrecipitationType => "precipitation_type",
        }
    }

    /// Resolve a user-supplied field name.
    ///
    /// Matching is case-insensitive, spaces count as underscores, and the
    /// alias table is consulted after canonical names.
    pub fn resolve(input: &str) -> Option<Field> {
        let normalized = normalize_name(input);
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.name() == normalized)
            .or_else(|| {
                ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == normalized)
                    .map(|(_, f)| *f)
            })
    }

    /// Every accepted spelling (canonical names then aliases), for suggestions.
    pub fn known_names() -> Vec<&'static str> {
        Field::ALL
            .iter()
            .map(|f| f.name())
            .chain(ALIASES.iter().map(|(alias, _)| *alias))
            .collect()
    }

    /// Unit family that literal suffixes may convert into.
    pub fn unit_family(self) -> UnitFamily {
        match self {
            Field::Temperature => UnitFamily::Temperature,
            Field::WindSpeed | Field::WindGust => UnitFamily::Speed,
            _ => UnitFamily::None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::resolve(s).ok_or_else(|| CoreError::UnknownField(s.trim().to_string()))
    }
}

/// Lowercase, trim, and collapse whitespace runs into single underscores.
pub fn normalize_name(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

// ── Units ─────────────────────────────────────────────────────

/// Which unit suffixes a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitFamily {
    Temperature,
    Speed,
    None,
}

/// A unit suffix on a numeric literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Fahrenheit,
    Celsius,
    MilesPerHour,
    MetersPerSecond,
}

impl Unit {
    /// Parse a suffix case-insensitively: `F`, `C`, `mph`, `m/s`, `ms`.
    pub fn parse(suffix: &str) -> Option<Unit> {
        match suffix.trim().to_lowercase().as_str() {
            "f" => Some(Unit::Fahrenheit),
            "c" => Some(Unit::Celsius),
            "mph" => Some(Unit::MilesPerHour),
            "m/s" | "ms" => Some(Unit::MetersPerSecond),
            _ => None,
        }
    }

    pub fn family(self) -> UnitFamily {
        match self {
            Unit::Fahrenheit | Unit::Celsius => UnitFamily::Temperature,
            Unit::MilesPerHour | Unit::MetersPerSecond => UnitFamily::Speed,
        }
    }

    /// Convert a value expressed in this unit into the field's native unit.
    pub fn to_native(self, value: f64) -> f64 {
        match self {
            Unit::Fahrenheit => fahrenheit_to_celsius(value),
            Unit::MilesPerHour => mph_to_mps(value),
            Unit::Celsius | Unit::MetersPerSecond => value,
        }
    }
}

const MPS_PER_MPH: f64 = 0.44704;
const MM_PER_INCH: f64 = 25.4;

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

pub fn mph_to_mps(mph: f64) -> f64 {
    mph * MPS_PER_MPH
}

pub fn mps_to_mph(mps: f64) -> f64 {
    mps / MPS_PER_MPH
}

pub fn mm_to_inches(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

/// Sixteen-point compass label for a bearing in degrees.
pub fn cardinal_direction(degrees: f64) -> &'static str {
    const POINTS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];
    let normalized = degrees.rem_euclid(360.0);
    let index = ((normalized + 11.25) / 22.5) as usize % 16;
    POINTS[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_canonical_and_aliases() {
        assert_eq!(Field::resolve("temperature"), Some(Field::Temperature));
        assert_eq!(Field::resolve("TEMP"), Some(Field::Temperature));
        assert_eq!(Field::resolve("wind"), Some(Field::WindSpeed));
        assert_eq!(Field::resolve("illuminance"), Some(Field::Lux));
        assert_eq!(Field::resolve("uv_index"), Some(Field::Uv));
        assert_eq!(Field::resolve("rain_accumulation"), Some(Field::RainDaily));
        assert_eq!(Field::resolve("rain_accumulated"), Some(Field::RainRate));
    }

    #[test]
    fn resolve_treats_spaces_as_underscores() {
        assert_eq!(Field::resolve("wind speed"), Some(Field::WindSpeed));
        assert_eq!(Field::resolve("  Lightning   Count "), Some(Field::LightningCount));
    }

    #[test]
    fn resolve_unknown_returns_none() {
        assert_eq!(Field::resolve("dew_point"), None);
        assert!("dew_point".parse::<Field>().is_err());
    }

    #[test]
    fn unit_conversions() {
        assert!((Unit::Fahrenheit.to_native(80.0) - 26.6667).abs() < 1e-3);
        assert!((Unit::MilesPerHour.to_native(25.0) - 11.176).abs() < 1e-9);
        assert_eq!(Unit::Celsius.to_native(12.5), 12.5);
        assert_eq!(Unit::parse("M/S"), Some(Unit::MetersPerSecond));
        assert_eq!(Unit::parse("ms"), Some(Unit::MetersPerSecond));
        assert_eq!(Unit::parse("kph"), None);
    }

    #[test]
    fn unit_families_match_fields() {
        assert_eq!(Field::Temperature.unit_family(), Unit::Celsius.family());
        assert_eq!(Field::WindGust.unit_family(), Unit::MilesPerHour.family());
        assert_eq!(Field::Humidity.unit_family(), UnitFamily::None);
    }

    #[test]
    fn cardinal_points() {
        assert_eq!(cardinal_direction(0.0), "N");
        assert_eq!(cardinal_direction(359.0), "N");
        assert_eq!(cardinal_direction(90.0), "E");
        assert_eq!(cardinal_direction(202.5), "SSW");
        assert_eq!(cardinal_direction(-90.0), "W");
    }
}
