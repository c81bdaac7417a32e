use super::iterate;
use std::future::Future;
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use surge_core::{IterationResult, Outcome, VusConfig, STAGE_TICK};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Looping virtual users whose count follows the stage targets.
pub(super) async fn run<T, F>(
    action: T,
    config: &VusConfig,
    start: Instant,
    hard_deadline: Option<Instant>,
    tx: UnboundedSender<IterationResult>,
) -> usize
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = Outcome> + Send + 'static,
{
    let end = start + config.duration();
    let mut vus = VirtualUsers::new(
        action,
        Shared {
            target: AtomicUsize::new(0),
            sequence: AtomicU64::new(0),
            end,
            hard_deadline,
            sleep_interval: config.sleep_interval(),
            tx,
        },
    );

    let mut ticker = interval(STAGE_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let deadline = sleep_until(end);
    tokio::pin!(deadline);

    // NOTE: The first tick completes immediately, which spawns the starting VUs.
    loop {
        tokio::select! {
            biased;
            _ = &mut deadline => break,
            _ = ticker.tick() => vus.set_target(config.target_at(start.elapsed())),
        }
    }

    vus.wait_for_shutdown().await
}

struct Shared {
    target: AtomicUsize,
    sequence: AtomicU64,
    end: Instant,
    hard_deadline: Option<Instant>,
    sleep_interval: std::time::Duration,
    tx: UnboundedSender<IterationResult>,
}

struct VirtualUsers<T> {
    action: T,
    shared: Arc<Shared>,
    tasks: Vec<JoinHandle<()>>,
    peak: usize,
}

impl<T, F> VirtualUsers<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = Outcome> + Send + 'static,
{
    fn new(action: T, shared: Shared) -> Self {
        Self {
            action,
            shared: Arc::new(shared),
            tasks: vec![],
            peak: 0,
        }
    }

    /// VUs with an id at or above `target` retire after their current iteration; missing
    /// ones below it are spawned.
    fn set_target(&mut self, target: usize) {
        let previous = self.shared.target.swap(target, Ordering::Relaxed);
        if previous != target {
            debug!("Virtual user target {previous} -> {target}");
        }

        for id in 0..target {
            if id >= self.tasks.len() {
                let task = self.spawn(id);
                self.tasks.push(task);
            } else if self.tasks[id].is_finished() {
                // A VU retired by an earlier ramp-down; the slot is free again
                self.tasks[id] = self.spawn(id);
            }
        }

        self.peak = self.peak.max(target);
    }

    fn spawn(&self, id: usize) -> JoinHandle<()> {
        trace!("Spawning virtual user {id}.");
        let action = self.action.clone();
        let shared = self.shared.clone();
        tokio::spawn(async move {
            let mut iterations = 0u64;
            while id < shared.target.load(Ordering::Relaxed) && Instant::now() < shared.end {
                let iteration = shared.sequence.fetch_add(1, Ordering::Relaxed);
                let result =
                    iterate(&action, iteration, id, Instant::now(), shared.hard_deadline).await;
                let _ = shared.tx.send(result);
                iterations += 1;

                let wake = (Instant::now() + shared.sleep_interval).min(shared.end);
                sleep_until(wake).await;
            }
            trace!("Virtual user {id} finished after {iterations} iterations.");
        })
    }

    /// Wait for every VU to finish its last iteration. Returns the peak VU count.
    async fn wait_for_shutdown(self) -> usize {
        let Self { tasks, shared, peak, .. } = self;
        // Drop our handle on the shared state so the result channel closes with the last VU
        drop(shared);

        for task in tasks {
            if let Err(err) = task.await {
                error!("Virtual user task failed: {err}");
            }
        }
        peak
    }
}
