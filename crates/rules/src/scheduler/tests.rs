use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use super::*;
use crate::schema::{Schedule, SunEvent};

const LONDON: Location = Location {
    latitude: 51.5074,
    longitude: -0.1278,
};
const SVALBARD: Location = Location {
    latitude: 78.22,
    longitude: 15.65,
};

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

#[test]
fn parse_time_of_day_accepts_hh_mm() {
    assert_eq!(parse_time_of_day("09:30"), Some(570));
    assert_eq!(parse_time_of_day(" 00:00 "), Some(0));
    assert_eq!(parse_time_of_day("23:59"), Some(1439));
    assert_eq!(parse_time_of_day("24:00"), None);
    assert_eq!(parse_time_of_day("9am"), None);
}

#[test]
fn no_schedule_is_always_active() {
    assert!(is_active(None, &utc(2026, 10, 20, 3, 0), None));
    assert!(is_active(Some(&Schedule::always()), &utc(2026, 10, 20, 3, 0), None));
}

#[test]
fn daily_range_is_half_open() {
    let schedule = Schedule::daily("09:00", "17:00");
    assert!(!is_active(Some(&schedule), &utc(2026, 10, 20, 8, 59), None));
    assert!(is_active(Some(&schedule), &utc(2026, 10, 20, 9, 0), None));
    assert!(is_active(Some(&schedule), &utc(2026, 10, 20, 16, 59), None));
    assert!(!is_active(Some(&schedule), &utc(2026, 10, 20, 17, 0), None));
}

#[test]
fn overnight_range_wraps_midnight() {
    let schedule = Schedule::daily("22:00", "06:00");
    assert!(is_active(Some(&schedule), &utc(2026, 10, 20, 23, 15), None));
    assert!(is_active(Some(&schedule), &utc(2026, 10, 20, 2, 0), None));
    assert!(!is_active(Some(&schedule), &utc(2026, 10, 20, 6, 0), None));
    assert!(!is_active(Some(&schedule), &utc(2026, 10, 20, 12, 0), None));
}

#[test]
fn equal_start_and_end_is_never_active() {
    let schedule = Schedule::daily("08:00", "08:00");
    assert!(!is_active(Some(&schedule), &utc(2026, 10, 20, 8, 0), None));
    assert!(!is_active(Some(&schedule), &utc(2026, 10, 20, 20, 0), None));
}

#[test]
fn range_uses_local_wall_clock() {
    let schedule = Schedule::daily("09:00", "17:00");
    let denver = FixedOffset::west_opt(6 * 3600).unwrap();
    // 15:30 UTC is 09:30 in UTC-6.
    let now = utc(2026, 10, 20, 15, 30).with_timezone(&denver);
    assert!(is_active(Some(&schedule), &now, None));
    let now = utc(2026, 10, 20, 14, 30).with_timezone(&denver);
    assert!(!is_active(Some(&schedule), &now, None));
}

#[test]
fn weekly_checks_day_then_range() {
    let weekdays = Schedule::weekly(&[1, 2, 3, 4, 5], Some(("09:00", "17:00")));
    // 2026-10-20 is a Tuesday, 2026-10-24 a Saturday.
    assert!(is_active(Some(&weekdays), &utc(2026, 10, 20, 10, 0), None));
    assert!(!is_active(Some(&weekdays), &utc(2026, 10, 24, 10, 0), None));
    assert!(!is_active(Some(&weekdays), &utc(2026, 10, 20, 18, 0), None));

    let weekend = Schedule::weekly(&[0, 6], None);
    assert!(is_active(Some(&weekend), &utc(2026, 10, 24, 3, 0), None));
    assert!(!is_active(Some(&weekend), &utc(2026, 10, 20, 3, 0), None));
}

#[test]
fn weekly_without_days_is_active() {
    let schedule = Schedule::weekly(&[], None);
    assert!(is_active(Some(&schedule), &utc(2026, 10, 21, 12, 0), None));
}

#[test]
fn unparsable_times_degrade_to_active() {
    let schedule = Schedule::daily("nine", "17:00");
    assert!(is_active(Some(&schedule), &utc(2026, 10, 20, 3, 0), None));
    let mut missing_end = Schedule::daily("09:00", "17:00");
    missing_end.end_time = None;
    assert!(is_active(Some(&missing_end), &utc(2026, 10, 20, 3, 0), None));
}

#[test]
fn sun_window_spanning_the_night() {
    // London 2024-06-21: sunrise ~03:43 UTC, sunset ~20:21 UTC.
    let schedule = Schedule::sun(SunEvent::Sunset, -30, Some((SunEvent::Sunrise, 0)))
        .with_location(LONDON.latitude, LONDON.longitude);
    assert!(is_active(Some(&schedule), &utc(2024, 6, 21, 20, 0), None));
    assert!(!is_active(Some(&schedule), &utc(2024, 6, 21, 12, 0), None));
    assert!(is_active(Some(&schedule), &utc(2024, 6, 21, 2, 0), None));
}

#[test]
fn sun_event_without_end_runs_to_midnight() {
    let schedule = Schedule::sun(SunEvent::Sunrise, 60, None)
        .with_location(LONDON.latitude, LONDON.longitude);
    assert!(!is_active(Some(&schedule), &utc(2024, 6, 21, 4, 0), None));
    assert!(is_active(Some(&schedule), &utc(2024, 6, 21, 5, 0), None));
    assert!(is_active(Some(&schedule), &utc(2024, 6, 21, 23, 30), None));
}

#[test]
fn sun_schedule_without_location_is_active() {
    let schedule = Schedule::sun(SunEvent::Sunset, 0, None);
    assert!(is_active(Some(&schedule), &utc(2024, 6, 21, 12, 0), None));
}

#[test]
fn sun_schedule_falls_back_to_station() {
    let schedule = Schedule::sun(SunEvent::Sunset, 0, None);
    assert!(!is_active(Some(&schedule), &utc(2024, 6, 21, 12, 0), Some(LONDON)));
    assert!(is_active(Some(&schedule), &utc(2024, 6, 21, 21, 0), Some(LONDON)));
}

#[test]
fn station_location_overrides_schedule_coordinates_when_requested() {
    let mut schedule = Schedule::sun(SunEvent::Sunrise, 0, Some((SunEvent::Sunset, 0)))
        .with_location(SVALBARD.latitude, SVALBARD.longitude);
    let noon_in_winter = utc(2024, 12, 21, 12, 0);
    // Polar night at the schedule's own coordinates.
    assert!(!is_active(Some(&schedule), &noon_in_winter, Some(LONDON)));

    schedule.use_station_location = true;
    assert!(is_active(Some(&schedule), &noon_in_winter, Some(LONDON)));
}

#[test]
fn polar_day_is_active_and_polar_night_is_not() {
    let schedule = Schedule::sun(SunEvent::Sunset, 0, Some((SunEvent::Sunrise, 0)))
        .with_location(SVALBARD.latitude, SVALBARD.longitude);
    assert!(is_active(Some(&schedule), &utc(2024, 6, 21, 0, 0), None));
    assert!(!is_active(Some(&schedule), &utc(2024, 12, 21, 0, 0), None));
}
