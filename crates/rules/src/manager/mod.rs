//! Rule manager: ties conditions, state, schedules and delivery together.
//!
//! Per rule and observation: disabled or out-of-schedule rules are skipped,
//! a true condition fires unless the rule is in cooldown, and the previous
//! values of every referenced field are updated whatever the outcome.
//! The active configuration is swapped atomically on reload; state survives
//! for rules whose name is unchanged.

mod command;
mod core;
mod status;


pub use self::command::{ManagerCommand, ManagerHandle};
pub use self::core::{DispatchHandle, ProcessReport, RuleManager};
pub use self::status::RuleStatus;
