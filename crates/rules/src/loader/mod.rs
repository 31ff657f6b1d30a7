//! Alarm configuration loading with hot-reload via a `notify` watcher.
//!
//! Configurations come from a JSON or YAML file (or inline JSON) holding an
//! `alarms` array. Every load is validated as a whole; a failed load never
//! replaces the active configuration.

mod core;
mod error;
mod watcher;


pub use self::core::{parse_file, parse_inline, AlarmConfig, ConfigSource};
pub use self::error::{ConfigError, Result};
pub use self::watcher::{ConfigWatcher, DEFAULT_DEBOUNCE};
