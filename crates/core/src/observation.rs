//! A single weather reading delivered by the acquisition pipeline.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::field::Field;

/// Read access to sensor values by [`Field`].
///
/// Implemented by [`Observation`] and by plain maps so conditions can be
/// evaluated against either.
pub trait FieldLookup {
    /// Current value of `field` in its native unit, if present.
    fn value(&self, field: Field) -> Option<f64>;
}

/// Immutable snapshot of one sensor reading.
///
/// Values are in native units (Celsius, metres per second, millibars, mm).
/// Fields omitted from JSON input default to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub humidity: f64,
    #[serde(default)]
    pub pressure: f64,
    #[serde(default)]
    pub wind_speed: f64,
    #[serde(default)]
    pub wind_gust: f64,
    #[serde(default)]
    pub wind_direction: f64,
    #[serde(default, alias = "illuminance")]
    pub lux: f64,
    #[serde(default)]
    pub uv: f64,
    #[serde(default, alias = "rain_accumulated")]
    pub rain_rate: f64,
    #[serde(default)]
    pub rain_daily: f64,
    #[serde(default)]
    pub lightning_count: f64,
    #[serde(default)]
    pub lightning_distance: f64,
    #[serde(default)]
    pub precipitation_type: f64,
}

impl Observation {
    /// An all-zero observation at `timestamp`.
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            temperature: 0.0,
            humidity: 0.0,
            pressure: 0.0,
            wind_speed: 0.0,
            wind_gust: 0.0,
            wind_direction: 0.0,
            lux: 0.0,
            uv: 0.0,
            rain_rate: 0.0,
            rain_daily: 0.0,
            lightning_count: 0.0,
            lightning_distance: 0.0,
            precipitation_type: 0.0,
        }
    }

    /// Builder-style setter used by producers and tests.
    pub fn with(mut self, field: Field, value: f64) -> Self {
        *self.slot_mut(field) = value;
        self
    }

    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Temperature => self.temperature,
            Field::Humidity => self.humidity,
            Field::Pressure => self.pressure,
            Field::WindSpeed => self.wind_speed,
            Field::WindGust => self.wind_gust,
            Field::WindDirection => self.wind_direction,
            Field::Lux => self.lux,
            Field::Uv => self.uv,
            Field::RainRate => self.rain_rate,
            Field::RainDaily => self.rain_daily,
            Field::LightningCount => self.lightning_count,
            Field::LightningDistance => self.lightning_distance,
            Field::PrecipitationType => self.precipitation_type,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut f64 {
        match field {
            Field::Temperature => &mut self.temperature,
            Field::Humidity => &mut self.humidity,
            Field::Pressure => &mut self.pressure,
            Field::WindSpeed => &mut self.wind_speed,
            Field::WindGust => &mut self.wind_gust,
            Field::WindDirection => &mut self.wind_direction,
            Field::Lux => &mut self.lux,
            Field::Uv => &mut self.uv,
            Field::RainRate => &mut self.rain_rate,
            Field::RainDaily => &mut self.rain_daily,
            Field::LightningCount => &mut self.lightning_count,
            Field::LightningDistance => &mut self.lightning_distance,
            Field::PrecipitationType => &mut self.precipitation_type,
        }
    }

    /// All field values keyed by field.
    pub fn values(&self) -> HashMap<Field, f64> {
        Field::ALL.iter().map(|f| (*f, self.get(*f))).collect()
    }
}

impl FieldLookup for Observation {
    fn value(&self, field: Field) -> Option<f64> {
        Some(self.get(field))
    }
}

impl FieldLookup for HashMap<Field, f64> {
    fn value(&self, field: Field) -> Option<f64> {
        self.get(&field).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_partial_json_defaults_missing_fields() {
        let obs: Observation = serde_json::from_str(
            r#"{"timestamp":"2026-06-01T12:00:00Z","temperature":21.5,"illuminance":40000}"#,
        )
        .unwrap();
        assert_eq!(obs.temperature, 21.5);
        assert_eq!(obs.lux, 40000.0);
        assert_eq!(obs.humidity, 0.0);
    }

    #[test]
    fn with_sets_named_field() {
        let obs = Observation::at(Utc::now())
            .with(Field::WindGust, 12.0)
            .with(Field::LightningCount, 3.0);
        assert_eq!(obs.value(Field::WindGust), Some(12.0));
        assert_eq!(obs.get(Field::LightningCount), 3.0);
        assert_eq!(obs.values().len(), Field::ALL.len());
    }

    #[test]
    fn map_lookup_reports_missing() {
        let map = HashMap::from([(Field::Humidity, 55.0)]);
        assert_eq!(map.value(Field::Humidity), Some(55.0));
        assert_eq!(map.value(Field::Pressure), None);
    }
}
