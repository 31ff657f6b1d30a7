//! Sunrise and sunset times from the NOAA sunrise equation.
//!
//! Accurate to a minute or two at non-polar latitudes, which is plenty for
//! gating alarms.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use super::Location;

const J2000: f64 = 2_451_545.0;
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;
/// Sun centre below the horizon at apparent sunrise (refraction + radius).
const HORIZON_DEG: f64 = -0.833;
const OBLIQUITY_DEG: f64 = 23.44;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SunTimes {
    Normal {
        sunrise: DateTime<Utc>,
        sunset: DateTime<Utc>,
    },
    /// The sun stays above the horizon all day.
    PolarDay,
    /// The sun never rises.
    PolarNight,
}

fn julian_to_utc(jd: f64) -> Option<DateTime<Utc>> {
    let millis = ((jd - UNIX_EPOCH_JD) * 86_400_000.0).round() as i64;
    DateTime::from_timestamp_millis(millis)
}

/// Sun events for the solar day nearest local noon of `date` at `location`.
///
/// Returns `None` only if the result falls outside chrono's range.
pub fn sun_times(date: NaiveDate, location: Location) -> Option<SunTimes> {
    let sin = |deg: f64| deg.to_radians().sin();

    let unix_days = date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE;
    let jd_midnight = f64::from(unix_days) + UNIX_EPOCH_JD;
    let n = (jd_midnight - J2000 + 0.0008).ceil();

    let mean_solar_time = n - location.longitude / 360.0;
    let anomaly = (357.5291 + 0.985_600_28 * mean_solar_time).rem_euclid(360.0);
    let center = 1.9148 * sin(anomaly) + 0.02 * sin(2.0 * anomaly) + 0.0003 * sin(3.0 * anomaly);
    let ecliptic_longitude = (anomaly + center + 180.0 + 102.9372).rem_euclid(360.0);
    let transit =
        J2000 + mean_solar_time + 0.0053 * sin(anomaly) - 0.0069 * sin(2.0 * ecliptic_longitude);

    let sin_declination = sin(ecliptic_longitude) * sin(OBLIQUITY_DEG);
    let cos_declination = sin_declination.asin().cos();
    let cos_hour_angle = (sin(HORIZON_DEG) - sin(location.latitude) * sin_declination)
        / (location.latitude.to_radians().cos() * cos_declination);

    if cos_hour_angle > 1.0 {
        return Some(SunTimes::PolarNight);
    }
    if cos_hour_angle < -1.0 {
        return Some(SunTimes::PolarDay);
    }

    let hour_angle = cos_hour_angle.acos().to_degrees();
    Some(SunTimes::Normal {
        sunrise: julian_to_utc(transit - hour_angle / 360.0)?,
        sunset: julian_to_utc(transit + hour_angle / 360.0)?,
    })
}
