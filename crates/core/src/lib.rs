pub mod config;
pub mod error;
pub mod field;
pub mod observation;

pub use config::Config;
pub use error::*;
pub use field::{Field, Unit, UnitFamily};
pub use observation::{FieldLookup, Observation};
