use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Outcome of one iteration: the response status code or the reason it failed.
pub type Outcome = Result<u16, IterationError>;

/// Per-iteration failures. These are recorded, never propagated to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IterationError {
    #[error("No free virtual user; all maxVUs are busy")]
    CapacityExceeded,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP error status {0}")]
    Http(u16),
}

impl IterationError {
    /// Stable label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            IterationError::CapacityExceeded => "capacity_exceeded",
            IterationError::Network(_) => "network",
            IterationError::Timeout => "timeout",
            IterationError::Http(_) => "http",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IterationResult {
    /// Issuance order within the run, starting at zero.
    pub iteration: u64,
    /// Virtual user that ran the iteration. `None` when it was dropped.
    pub vu: Option<usize>,
    pub start: Instant,
    pub end: Instant,
    pub outcome: Outcome,
}

impl IterationResult {
    /// An iteration that was never started because the pool was exhausted.
    pub fn dropped(iteration: u64, at: Instant) -> Self {
        Self {
            iteration,
            vu: None,
            start: at,
            end: at,
            outcome: Err(IterationError::CapacityExceeded),
        }
    }

    pub fn latency(&self) -> Duration {
        self.end.saturating_duration_since(self.start)
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn outcome_label(&self) -> &'static str {
        match &self.outcome {
            Ok(_) => "success",
            Err(err) => err.kind(),
        }
    }
}
