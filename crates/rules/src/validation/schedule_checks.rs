//! Schedule validation: time ranges, weekdays, sun events and coordinates.

use super::ValidationResult;
use crate::scheduler::parse_time_of_day;
use crate::schema::{RuleDefinition, Schedule, ScheduleKind};

pub(super) fn validate_schedule(rule: &RuleDefinition, path: &str, result: &mut ValidationResult) {
    let Some(schedule) = &rule.schedule else {
        return;
    };
    let path = format!("{path}.schedule");

    match schedule.kind {
        ScheduleKind::Always => {}
        ScheduleKind::Time | ScheduleKind::Daily => {
            require_time(schedule.start_time.as_deref(), &format!("{path}.start_time"), result);
            require_time(schedule.end_time.as_deref(), &format!("{path}.end_time"), result);
            warn_empty_range(schedule, &path, result);
        }
        ScheduleKind::Weekly => {
            if schedule.days_of_week.is_empty() {
                result.error(
                    format!("{path}.days_of_week"),
                    "Weekly schedule requires at least one day (0 = Sunday .. 6 = Saturday)",
                );
            }
            for day in schedule.days_of_week.iter().filter(|d| **d > 6) {
                result.error(
                    format!("{path}.days_of_week"),
                    format!("Invalid day {day}, expected 0 (Sunday) to 6 (Saturday)"),
                );
            }
            match (&schedule.start_time, &schedule.end_time) {
                (None, None) => {}
                (Some(_), Some(_)) => {
                    require_time(schedule.start_time.as_deref(), &format!("{path}.start_time"), result);
                    require_time(schedule.end_time.as_deref(), &format!("{path}.end_time"), result);
                    warn_empty_range(schedule, &path, result);
                }
                _ => result.error(
                    path.clone(),
                    "Weekly schedule needs both start_time and end_time, or neither",
                ),
            }
        }
        ScheduleKind::Sun => validate_sun(schedule, &path, result),
    }
}

fn require_time(value: Option<&str>, path: &str, result: &mut ValidationResult) {
    match value {
        None => result.error(path, "Time is required (HH:MM)"),
        Some(v) if parse_time_of_day(v).is_none() => {
            result.error(path, format!("Invalid time '{v}', expected HH:MM"))
        }
        Some(_) => {}
    }
}

fn warn_empty_range(schedule: &Schedule, path: &str, result: &mut ValidationResult) {
    let start = schedule.start_time.as_deref().and_then(parse_time_of_day);
    let end = schedule.end_time.as_deref().and_then(parse_time_of_day);
    if let (Some(s), Some(e)) = (start, end) {
        if s == e {
            result.warn(path, "Start and end times are equal; the schedule is never active");
        }
    }
}

fn validate_sun(schedule: &Schedule, path: &str, result: &mut ValidationResult) {
    if schedule.sun_event.is_none() {
        result.error(
            format!("{path}.sun_event"),
            "Sun schedule requires 'sun_event' (sunrise or sunset)",
        );
    }

    match (schedule.latitude, schedule.longitude) {
        (Some(lat), Some(lon)) => {
            if !(-90.0..=90.0).contains(&lat) {
                result.error(format!("{path}.latitude"), format!("Latitude {lat} out of range"));
            }
            if !(-180.0..=180.0).contains(&lon) {
                result.error(format!("{path}.longitude"), format!("Longitude {lon} out of range"));
            }
        }
        (None, None) => {
            if !schedule.use_station_location {
                result.warn(
                    path,
                    "Sun schedule has no coordinates; station location is used if set, otherwise always active",
                );
            }
        }
        _ => result.error(
            path,
            "Sun schedule needs both latitude and longitude, or neither",
        ),
    }
}
