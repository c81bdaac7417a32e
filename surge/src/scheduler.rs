//! Iteration scheduling for both run modes.
mod arrival_rate;
mod ramping_vus;

use std::future::Future;
use surge_core::{IterationError, IterationResult, Mode, Outcome, RunConfig};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{timeout_at, Instant};

/// Run the schedule described by `config`, sending every result to `tx`.
///
/// Returns once no further iterations will be issued and every in-flight iteration has
/// finished or been abandoned at the hard deadline. Returns the peak number of busy
/// virtual users.
pub(crate) async fn run<T, F>(
    action: T,
    config: &RunConfig,
    tx: UnboundedSender<IterationResult>,
) -> usize
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = Outcome> + Send + 'static,
{
    let start = Instant::now();
    let end = start + config.duration();
    let hard_deadline = config.graceful_stop().map(|grace| end + grace);

    match config.mode() {
        Mode::RateDriven(rate) => arrival_rate::run(action, rate, start, hard_deadline, tx).await,
        Mode::ConcurrencyDriven(vus) => {
            ramping_vus::run(action, vus, start, hard_deadline, tx).await
        }
    }
}

/// Execute a single iteration on virtual user `vu` and time it from `start`.
///
/// `start` is when the iteration was due, so any delay before the task got to run is
/// part of its latency.
async fn iterate<T, F>(
    action: &T,
    iteration: u64,
    vu: usize,
    start: Instant,
    hard_deadline: Option<Instant>,
) -> IterationResult
where
    T: Fn() -> F,
    F: Future<Output = Outcome>,
{
    let outcome = match hard_deadline {
        Some(deadline) => timeout_at(deadline, action())
            .await
            .unwrap_or(Err(IterationError::Timeout)),
        None => action().await,
    };

    IterationResult {
        iteration,
        vu: Some(vu),
        start,
        end: Instant::now(),
        outcome,
    }
}
