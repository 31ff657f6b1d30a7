//! Optional activity windows for rules.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    #[default]
    Always,
    Time,
    Daily,
    Weekly,
    Sun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SunEvent {
    Sunrise,
    Sunset,
}

impl SunEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            SunEvent::Sunrise => "sunrise",
            SunEvent::Sunset => "sunset",
        }
    }
}

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// When a rule is allowed to fire.
///
/// Times are `HH:MM` in the station's local zone; weekdays count from
/// 0 = Sunday. Sun offsets are minutes, negative meaning before the event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(rename = "type", default)]
    pub kind: ScheduleKind,
    #[serde(default, alias = "start", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, alias = "end", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days_of_week: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sun_event: Option<SunEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sun_event_end: Option<SunEvent>,
    #[serde(default)]
    pub sun_offset: i64,
    #[serde(default)]
    pub sun_offset_end: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Prefer the station's coordinates over `latitude`/`longitude`.
    #[serde(default)]
    pub use_station_location: bool,
}

fn offset_suffix(minutes: i64) -> String {
    match minutes {
        0 => String::new(),
        m if m > 0 => format!(" +{m}m"),
        m => format!(" {m}m"),
    }
}

impl Schedule {
    pub fn always() -> Self {
        Self::default()
    }

    pub fn daily(start: &str, end: &str) -> Self {
        Self {
            kind: ScheduleKind::Daily,
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
            ..Self::default()
        }
    }

    pub fn weekly(days: &[u32], range: Option<(&str, &str)>) -> Self {
        Self {
            kind: ScheduleKind::Weekly,
            days_of_week: days.to_vec(),
            start_time: range.map(|(s, _)| s.to_string()),
            end_time: range.map(|(_, e)| e.to_string()),
            ..Self::default()
        }
    }

    pub fn sun(event: SunEvent, offset: i64, end: Option<(SunEvent, i64)>) -> Self {
        Self {
            kind: ScheduleKind::Sun,
            sun_event: Some(event),
            sun_offset: offset,
            sun_event_end: end.map(|(e, _)| e),
            sun_offset_end: end.map(|(_, o)| o).unwrap_or(0),
            ..Self::default()
        }
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Coordinates given on the schedule itself.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// Human-readable summary for status output.
    pub fn describe(&self) -> String {
        let range = match (&self.start_time, &self.end_time) {
            (Some(start), Some(end)) => Some(format!("{start} to {end}")),
            _ => None,
        };
        match self.kind {
            ScheduleKind::Always => "Always active (24/7)".to_string(),
            ScheduleKind::Time | ScheduleKind::Daily => match range {
                Some(r) => format!("Daily from {r}"),
                None => "Daily (no time range)".to_string(),
            },
            ScheduleKind::Weekly => {
                let days: Vec<&str> = self
                    .days_of_week
                    .iter()
                    .filter_map(|d| DAY_NAMES.get(*d as usize).copied())
                    .collect();
                let days = days.join(", ");
                match range {
                    Some(r) => format!("{days} from {r}"),
                    None => format!("{days} (all day)"),
                }
            }
            ScheduleKind::Sun => {
                let location = if self.use_station_location {
                    " (station location)".to_string()
                } else if let Some((lat, lon)) = self.coordinates() {
                    format!(" ({lat:.4}, {lon:.4})")
                } else {
                    String::new()
                };
                let start = match self.sun_event {
                    Some(e) => format!("{}{}", e.as_str(), offset_suffix(self.sun_offset)),
                    None => "sun event".to_string(),
                };
                match self.sun_event_end {
                    Some(end) => format!(
                        "{start} to {}{}{location}",
                        end.as_str(),
                        offset_suffix(self.sun_offset_end)
                    ),
                    None => format!("After {start}{location}"),
                }
            }
        }
    }
}
