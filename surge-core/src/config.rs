use crate::{ConfigError, DEFAULT_SLEEP_INTERVAL, DEFAULT_TIME_UNIT};
use std::num::NonZeroU32;
use std::time::Duration;

/// Validated, immutable description of a single run.
///
/// Only built through [`RunConfig::rate_driven`], [`RunConfig::concurrency_driven`] or
/// [`RunConfig::staged`], which enforce the invariants of each mode. Fields are private
/// so a config cannot be assembled around them.
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    mode: Mode,
    graceful_stop: Option<Duration>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Mode {
    RateDriven(RateConfig),
    ConcurrencyDriven(VusConfig),
}

/// Constant arrival rate: `rate` iterations per `time_unit`.
///
/// ```compile_fail
/// use std::{num::NonZeroU32, time::Duration};
/// use surge_core::RateConfig;
///
/// let unchecked = RateConfig {
///     rate: NonZeroU32::MIN,
///     time_unit: Duration::ZERO,
///     duration: Duration::ZERO,
///     pre_allocated_vus: 0,
///     max_vus: 0,
/// };
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RateConfig {
    rate: NonZeroU32,
    time_unit: Duration,
    duration: Duration,
    pre_allocated_vus: usize,
    max_vus: usize,
}

impl RateConfig {
    pub fn rate(&self) -> NonZeroU32 {
        self.rate
    }

    pub fn time_unit(&self) -> Duration {
        self.time_unit
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn pre_allocated_vus(&self) -> usize {
        self.pre_allocated_vus
    }

    pub fn max_vus(&self) -> usize {
        self.max_vus
    }

    /// Time between two scheduled iterations. Never zero.
    pub fn period(&self) -> Duration {
        self.time_unit / self.rate.get()
    }

    /// Number of iterations the schedule issues over the whole run.
    pub fn expected_iterations(&self) -> u64 {
        self.duration.as_nanos().div_ceil(self.period().as_nanos()) as u64
    }

    fn check_period(rate: NonZeroU32, time_unit: Duration) -> Result<(), ConfigError> {
        if (time_unit / rate.get()).is_zero() {
            return Err(ConfigError::RateTooHigh {
                rate: rate.get(),
                time_unit,
            });
        }
        Ok(())
    }
}

/// Looping virtual users, ramped linearly across stages.
#[derive(Clone, Debug, PartialEq)]
pub struct VusConfig {
    start_vus: usize,
    stages: Vec<Stage>,
    sleep_interval: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }
}

impl VusConfig {
    pub fn start_vus(&self) -> usize {
        self.start_vus
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Pause a virtual user takes after each iteration.
    pub fn sleep_interval(&self) -> Duration {
        self.sleep_interval
    }

    pub fn duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    pub fn max_vus(&self) -> usize {
        self.stages
            .iter()
            .map(|s| s.target)
            .fold(self.start_vus, usize::max)
    }

    /// Virtual-user target at `elapsed` into the run.
    ///
    /// Moves linearly from the previous target to the stage target over the stage. Past
    /// the last stage the last target holds.
    pub fn target_at(&self, elapsed: Duration) -> usize {
        let mut from = self.start_vus;
        let mut offset = Duration::ZERO;

        for stage in &self.stages {
            if elapsed < offset + stage.duration {
                let progress = (elapsed - offset).as_secs_f64() / stage.duration.as_secs_f64();
                let delta = stage.target as f64 - from as f64;
                return (from as f64 + delta * progress).round().max(0.) as usize;
            }
            offset += stage.duration;
            from = stage.target;
        }

        from
    }
}

impl RunConfig {
    /// Constant arrival rate of `rate` iterations per second.
    pub fn rate_driven(
        rate: NonZeroU32,
        duration: Duration,
        pre_allocated_vus: usize,
        max_vus: usize,
    ) -> Result<Self, ConfigError> {
        if duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        RateConfig::check_period(rate, DEFAULT_TIME_UNIT)?;
        if pre_allocated_vus == 0 {
            return Err(ConfigError::ZeroPreAllocatedVus);
        }
        if max_vus < pre_allocated_vus {
            return Err(ConfigError::MaxBelowPreAllocated {
                pre_allocated: pre_allocated_vus,
                max: max_vus,
            });
        }

        Ok(Self {
            mode: Mode::RateDriven(RateConfig {
                rate,
                time_unit: DEFAULT_TIME_UNIT,
                duration,
                pre_allocated_vus,
                max_vus,
            }),
            graceful_stop: None,
        })
    }

    /// A fixed number of virtual users for the whole duration.
    pub fn concurrency_driven(vus: usize, duration: Duration) -> Result<Self, ConfigError> {
        if vus == 0 {
            return Err(ConfigError::ZeroVus);
        }
        Self::staged(vus, vec![Stage::new(duration, vus)])
    }

    /// Virtual users starting at `start_vus` and ramped through `stages`.
    pub fn staged(start_vus: usize, stages: Vec<Stage>) -> Result<Self, ConfigError> {
        let config = VusConfig {
            start_vus,
            stages,
            sleep_interval: DEFAULT_SLEEP_INTERVAL,
        };

        if config.duration().is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        if config.max_vus() == 0 {
            return Err(ConfigError::ZeroVus);
        }

        Ok(Self {
            mode: Mode::ConcurrencyDriven(config),
            graceful_stop: None,
        })
    }

    /// Express the arrival rate per `time_unit` instead of per second.
    ///
    /// Ignored in concurrency-driven mode.
    pub fn with_time_unit(mut self, time_unit: Duration) -> Result<Self, ConfigError> {
        if time_unit.is_zero() {
            return Err(ConfigError::ZeroTimeUnit);
        }
        if let Mode::RateDriven(rate) = &mut self.mode {
            RateConfig::check_period(rate.rate, time_unit)?;
            rate.time_unit = time_unit;
        }
        Ok(self)
    }

    /// Pause between iterations of a virtual user. Ignored in rate-driven mode.
    pub fn with_sleep_interval(mut self, sleep_interval: Duration) -> Self {
        if let Mode::ConcurrencyDriven(vus) = &mut self.mode {
            vus.sleep_interval = sleep_interval;
        }
        self
    }

    pub fn with_graceful_stop(mut self, graceful_stop: Option<Duration>) -> Self {
        self.graceful_stop = graceful_stop;
        self
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Hard deadline after the run ends. In-flight iterations still running past it are
    /// abandoned and reported as timeouts. `None` drains them fully.
    pub fn graceful_stop(&self) -> Option<Duration> {
        self.graceful_stop
    }

    /// Total time during which new iterations are issued.
    pub fn duration(&self) -> Duration {
        match &self.mode {
            Mode::RateDriven(rate) => rate.duration,
            Mode::ConcurrencyDriven(vus) => vus.duration(),
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self.mode {
            Mode::RateDriven(_) => "rate",
            Mode::ConcurrencyDriven(_) => "vus",
        }
    }
}
