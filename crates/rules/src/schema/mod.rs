//! Alarm configuration schema types with serde deserialization.
//!
//! An alarm file holds an `alarms` array of [`RuleDefinition`]s, each with
//! a condition, notification channels, and an optional [`Schedule`].

mod rule;
mod schedule;

pub use rule::*;
pub use schedule::*;
