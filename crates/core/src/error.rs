use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("invalid value for {key}: {value}")]
    InvalidSetting { key: String, value: String },
}
