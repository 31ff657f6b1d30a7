use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Timelike, Utc};
use tracing::debug;

use super::solar::{sun_times, SunTimes};
use super::Location;
use crate::schema::{Schedule, ScheduleKind, SunEvent};

/// Parse `HH:MM` into minutes after midnight.
pub fn parse_time_of_day(input: &str) -> Option<u32> {
    let time = NaiveTime::parse_from_str(input.trim(), "%H:%M").ok()?;
    Some(time.hour() * 60 + time.minute())
}

fn in_range(minute: u32, start: u32, end: u32) -> bool {
    if start <= end {
        start <= minute && minute < end
    } else {
        minute >= start || minute < end
    }
}

/// `None` when the schedule carries no usable range.
fn time_range_active<Tz: TimeZone>(schedule: &Schedule, now: &DateTime<Tz>) -> Option<bool> {
    let start = parse_time_of_day(schedule.start_time.as_deref()?)?;
    let end = parse_time_of_day(schedule.end_time.as_deref()?)?;
    Some(in_range(now.hour() * 60 + now.minute(), start, end))
}

fn weekly_active<Tz: TimeZone>(schedule: &Schedule, now: &DateTime<Tz>) -> bool {
    if schedule.days_of_week.is_empty() {
        return true;
    }
    let today = now.weekday().num_days_from_sunday();
    if !schedule.days_of_week.contains(&today) {
        return false;
    }
    time_range_active(schedule, now).unwrap_or(true)
}

fn sun_active<Tz: TimeZone>(
    schedule: &Schedule,
    now: &DateTime<Tz>,
    station: Option<Location>,
) -> bool {
    let own = schedule.coordinates().map(Location::from);
    let location = if schedule.use_station_location {
        station.or(own)
    } else {
        own.or(station)
    };
    let (Some(location), Some(start_event)) = (location, schedule.sun_event) else {
        return true;
    };

    let (sunrise, sunset) = match sun_times(now.date_naive(), location) {
        Some(SunTimes::Normal { sunrise, sunset }) => (sunrise, sunset),
        Some(SunTimes::PolarDay) | None => return true,
        Some(SunTimes::PolarNight) => return false,
    };
    let at = |event: SunEvent, offset: i64| -> DateTime<Utc> {
        let base = match event {
            SunEvent::Sunrise => sunrise,
            SunEvent::Sunset => sunset,
        };
        base + Duration::minutes(offset)
    };

    let now = now.with_timezone(&Utc);
    let start = at(start_event, schedule.sun_offset);
    let Some(end_event) = schedule.sun_event_end else {
        return now >= start;
    };
    let end = at(end_event, schedule.sun_offset_end);
    debug!(%start, %end, "sun schedule window");
    if start <= end {
        start <= now && now < end
    } else {
        now >= start || now < end
    }
}

/// Whether a rule with `schedule` may fire at `now`.
///
/// No schedule means always active. Unusable schedule data (unparsable
/// times, no location for a sun schedule) degrades to active.
pub fn is_active<Tz: TimeZone>(
    schedule: Option<&Schedule>,
    now: &DateTime<Tz>,
    station: Option<Location>,
) -> bool {
    let Some(schedule) = schedule else {
        return true;
    };
    match schedule.kind {
        ScheduleKind::Always => true,
        ScheduleKind::Time | ScheduleKind::Daily => {
            time_range_active(schedule, now).unwrap_or(true)
        }
        ScheduleKind::Weekly => weekly_active(schedule, now),
        ScheduleKind::Sun => sun_active(schedule, now, station),
    }
}
