use std::time::Duration;
use thiserror::Error;

/// Errors raised while validating a run before it starts.
///
/// The run itself never fails; only configuration can abort it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Duration must be greater than zero")]
    ZeroDuration,

    #[error("Time unit must be greater than zero")]
    ZeroTimeUnit,

    #[error("Rate {rate} per {time_unit:?} is finer than the timer resolution of 1ns")]
    RateTooHigh { rate: u32, time_unit: Duration },

    #[error("preAllocatedVUs must be greater than zero")]
    ZeroPreAllocatedVus,

    #[error("maxVUs ({max}) must be at least preAllocatedVUs ({pre_allocated})")]
    MaxBelowPreAllocated { pre_allocated: usize, max: usize },

    #[error("At least one virtual user is required")]
    ZeroVus,

    #[error("Missing required option `{0}` for {1} mode")]
    MissingOption(&'static str, &'static str),

    #[error("Option `{0}` is not supported in {1} mode")]
    UnexpectedOption(&'static str, &'static str),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported URL scheme `{0}`, expected http or https")]
    UnsupportedScheme(String),

    #[error("Payload must be a JSON object")]
    PayloadNotObject,

    #[error("Error parsing plan: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Error reading plan: {0}")]
    Io(#[from] std::io::Error),
}
