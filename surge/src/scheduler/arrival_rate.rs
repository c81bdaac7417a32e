use super::iterate;
use crate::pool::WorkerPool;
use std::future::Future;
use surge_core::{IterationResult, Outcome, RateConfig};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Constant arrival rate: one iteration per period, independent of how long each takes.
pub(super) async fn run<T, F>(
    action: T,
    config: &RateConfig,
    start: Instant,
    hard_deadline: Option<Instant>,
    tx: UnboundedSender<IterationResult>,
) -> usize
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = Outcome> + Send + 'static,
{
    let pool = WorkerPool::new(config.pre_allocated_vus(), config.max_vus());
    let end = start + config.duration();
    let period = config.period();
    debug!(
        "Issuing one iteration every {} for {}",
        humantime::format_duration(period),
        humantime::format_duration(config.duration())
    );

    let mut ticker = interval_at(start, period);
    // NOTE: Burst catches up on ticks missed while the scheduler was starved, keeping the
    // issued count at rate * duration.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    let deadline = sleep_until(end);
    tokio::pin!(deadline);

    let mut iteration = 0u64;
    loop {
        let at = tokio::select! {
            biased;
            _ = &mut deadline => break,
            at = ticker.tick() => at,
        };
        if at >= end {
            break;
        }

        match pool.acquire() {
            Ok(mut lease) => {
                let action = action.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result =
                        iterate(&action, iteration, lease.id(), at, hard_deadline).await;
                    lease.record_iteration();
                    drop(lease);
                    let _ = tx.send(result);
                });
            }
            Err(err) => {
                trace!("Dropping iteration {iteration}: {err}");
                let _ = tx.send(IterationResult::dropped(iteration, at));
            }
        }

        iteration += 1;
    }

    debug!(
        "Issued {iteration} iterations; pool grew to {} of {} virtual users.",
        pool.size(),
        pool.max_vus()
    );

    // In-flight iterations hold their own senders; the run drains once they are done.
    pool.peak_busy()
}
