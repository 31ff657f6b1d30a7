//! Schedule gating: decides whether a rule may fire at a given local time.
//!
//! Time ranges are half-open `[start, end)` and wrap past midnight when the
//! end precedes the start. Sun schedules use sunrise and sunset computed for
//! the local date at the schedule's (or the station's) coordinates.

mod gate;
pub mod solar;

#[cfg(test)]
mod tests;

pub use self::gate::{is_active, parse_time_of_day};
pub use self::solar::{sun_times, SunTimes};

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl From<(f64, f64)> for Location {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}
