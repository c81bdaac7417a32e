use std::fmt;
use std::time::Duration;

/// Summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatistics {
    /// Every iteration the scheduler issued, dropped ones included.
    pub iterations: u64,
    pub successes: u64,
    pub capacity_exceeded: u64,
    pub network_errors: u64,
    pub timeouts: u64,
    pub http_errors: u64,
    /// Wall time from the first tick until the last in-flight iteration finished.
    pub elapsed: Duration,
    /// Largest number of virtual users simultaneously running an iteration.
    pub peak_vus: usize,
    pub latency_p50: Duration,
    pub latency_p90: Duration,
    pub latency_p99: Duration,
}

impl RunStatistics {
    pub fn failures(&self) -> u64 {
        self.capacity_exceeded + self.network_errors + self.timeouts + self.http_errors
    }

    pub fn error_rate(&self) -> f64 {
        if self.iterations == 0 {
            0.
        } else {
            self.failures() as f64 / self.iterations as f64
        }
    }

    /// Issued iterations per second of elapsed time.
    pub fn iteration_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0. {
            0.
        } else {
            self.iterations as f64 / secs
        }
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iterations={} ({:.2}/s), success={}, capacity_exceeded={}, network={}, timeout={}, http={}, error_rate={:.2}, peak_vus={}, p50={:?}, p90={:?}, p99={:?}, elapsed={}",
            self.iterations,
            self.iteration_rate(),
            self.successes,
            self.capacity_exceeded,
            self.network_errors,
            self.timeouts,
            self.http_errors,
            self.error_rate(),
            self.peak_vus,
            self.latency_p50,
            self.latency_p90,
            self.latency_p99,
            humantime::format_duration(self.elapsed),
        )
    }
}
