//! Shared types for surge: run configuration, the request to send, plan files,
//! per-iteration results and run statistics.
mod config;
mod constants;
mod error;
mod iteration;
pub mod plan;
mod request;
mod stats;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use iteration::*;
pub use plan::TestPlan;
pub use request::*;
pub use stats::*;
