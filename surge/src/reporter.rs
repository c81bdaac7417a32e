//! Consumers of the per-iteration result stream.
use hdrhistogram::Histogram;
use std::time::Duration;
use surge_core::{IterationError, IterationResult, RunStatistics};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Significant figures kept by the latency histogram.
const LATENCY_SIGFIG: u8 = 3;

/// Receives every [`IterationResult`] of a run, in completion order, and the final
/// statistics once the run has drained.
pub trait Reporter: Send {
    fn record(&mut self, result: &IterationResult);

    fn finish(&mut self, _stats: &RunStatistics) {}
}

/// Forwards the raw result stream to a channel.
impl Reporter for UnboundedSender<IterationResult> {
    fn record(&mut self, result: &IterationResult) {
        // A closed receiver only means nobody is listening anymore
        let _ = self.send(result.clone());
    }
}

/// Logs failed iterations and the run summary.
#[derive(Debug, Default)]
pub struct TracingReporter {
    capacity_warned: bool,
}

impl Reporter for TracingReporter {
    fn record(&mut self, result: &IterationResult) {
        match &result.outcome {
            Ok(status) => trace!(
                "Iteration {} on VU {:?}: {} in {:?}",
                result.iteration,
                result.vu,
                status,
                result.latency()
            ),
            Err(IterationError::CapacityExceeded) if !self.capacity_warned => {
                self.capacity_warned = true;
                warn!(
                    "Iteration {} dropped: all virtual users are busy. Consider raising maxVUs.",
                    result.iteration
                );
            }
            Err(err) => debug!(
                "Iteration {} on VU {:?} failed after {:?}: {err}",
                result.iteration,
                result.vu,
                result.latency()
            ),
        }
    }

    fn finish(&mut self, stats: &RunStatistics) {
        info!("{stats}");
    }
}

/// Aggregates the stream into [`RunStatistics`].
pub(crate) struct Collector {
    stats: RunStatistics,
    /// Latencies in nanoseconds.
    latency: Histogram<u64>,
}

impl Collector {
    pub fn new() -> Self {
        Self {
            stats: RunStatistics::default(),
            latency: latency_histogram(),
        }
    }

    pub fn record(&mut self, result: &IterationResult) {
        self.stats.iterations += 1;
        match &result.outcome {
            Ok(_) => self.stats.successes += 1,
            Err(IterationError::CapacityExceeded) => self.stats.capacity_exceeded += 1,
            Err(IterationError::Network(_)) => self.stats.network_errors += 1,
            Err(IterationError::Timeout) => self.stats.timeouts += 1,
            Err(IterationError::Http(_)) => self.stats.http_errors += 1,
        }

        // Dropped iterations never ran, so they carry no latency
        let ran = !matches!(result.outcome, Err(IterationError::CapacityExceeded));
        if ran {
            let nanos = u64::try_from(result.latency().as_nanos()).unwrap_or(u64::MAX);
            if let Err(err) = self.latency.record(nanos) {
                error!("Unable to record latency of iteration {}: {err}", result.iteration);
            }
        }

        #[cfg(feature = "metrics")]
        {
            metrics::counter!("surge_iterations_total", "outcome" => result.outcome_label())
                .increment(1);
            if ran {
                metrics::histogram!("surge_iteration_latency")
                    .record(result.latency().as_nanos() as f64);
            }
        }
    }

    pub fn finish(mut self, elapsed: Duration, peak_vus: usize) -> RunStatistics {
        self.stats.elapsed = elapsed;
        self.stats.peak_vus = peak_vus;
        self.stats.latency_p50 = self.quantile(0.5);
        self.stats.latency_p90 = self.quantile(0.9);
        self.stats.latency_p99 = self.quantile(0.99);
        self.stats
    }

    fn quantile(&self, quantile: f64) -> Duration {
        if self.latency.is_empty() {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.latency.value_at_quantile(quantile))
    }
}

/// Auto-resizing, so no latency is ever out of range.
fn latency_histogram() -> Histogram<u64> {
    Histogram::new(LATENCY_SIGFIG).expect("sigfig within 0..=5")
}

/// Drain `rx` until every sender is gone, feeding the collector and the reporters.
pub(crate) async fn collect(
    mut rx: UnboundedReceiver<IterationResult>,
    reporters: &mut [Box<dyn Reporter>],
) -> Collector {
    #[cfg(feature = "metrics")]
    {
        metrics::describe_counter!("surge_iterations_total", "Iterations by outcome");
        metrics::describe_histogram!(
            "surge_iteration_latency",
            metrics::Unit::Nanoseconds,
            "Latency of iterations that ran"
        );
        metrics::describe_gauge!("surge_active_vus", "Virtual users running an iteration");
    }

    let mut collector = Collector::new();
    while let Some(result) = rx.recv().await {
        collector.record(&result);
        for reporter in reporters.iter_mut() {
            reporter.record(&result);
        }
    }
    collector
}
