//! Weather alarm rule engine.
//!
//! This crate provides:
//! - Condition expressions with comparisons, change detection and unit suffixes
//! - Per-rule state (previous values, cooldown, trigger snapshots, counters)
//! - Schedule gating by time of day, weekday, and sunrise/sunset
//! - JSON/YAML alarm configuration with validation and hot-reload
//! - A rule manager that evaluates observations and dispatches notifications

pub mod expression;
pub mod loader;
pub mod manager;
pub mod scheduler;
pub mod schema;
pub mod state;
pub mod validation;

pub use expression::{Condition, EvalError, ParseError};
pub use loader::{AlarmConfig, ConfigError, ConfigSource};
pub use manager::{
    DispatchHandle, ManagerCommand, ManagerHandle, ProcessReport, RuleManager, RuleStatus,
};
pub use scheduler::Location;
pub use schema::{RuleDefinition, Schedule};
pub use state::{RuleState, RuleStateStore, RuleStateView};
