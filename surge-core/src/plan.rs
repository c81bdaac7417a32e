//! JSON plan files.
//!
//! A plan is the on-disk form of a run: the schedule options plus the request to send.
//! Durations are humantime strings such as `"1m"` or `"250ms"`.
use crate::request::RequestSpec;
use crate::{
    ConfigError, RunConfig, Stage, DEFAULT_GRACEFUL_STOP, DEFAULT_SLEEP_INTERVAL,
    DEFAULT_TIME_UNIT,
};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// A validated plan, ready to run.
#[derive(Clone, Debug, PartialEq)]
pub struct TestPlan {
    pub run: RunConfig,
    pub request: RequestSpec,
}

impl TestPlan {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: PlanFile = serde_json::from_str(json)?;
        file.try_into()
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading plan from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl FromStr for TestPlan {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(s)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PlanMode {
    Rate,
    Vus,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PlanFile {
    mode: PlanMode,
    target_rate: Option<NonZeroU32>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    time_unit: Option<humantime::Duration>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    duration: Option<humantime::Duration>,
    #[serde(rename = "preAllocatedVUs")]
    pre_allocated_vus: Option<usize>,
    #[serde(rename = "maxVUs")]
    max_vus: Option<usize>,
    vus: Option<usize>,
    stages: Option<Vec<PlanStage>>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    sleep_interval: Option<humantime::Duration>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    graceful_stop: Option<humantime::Duration>,

    url: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    payload: serde_json::Value,
    #[serde_as(as = "Option<DisplayFromStr>")]
    request_timeout: Option<humantime::Duration>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlanStage {
    #[serde_as(as = "DisplayFromStr")]
    duration: humantime::Duration,
    target: usize,
}

impl TryFrom<PlanFile> for TestPlan {
    type Error = ConfigError;

    fn try_from(file: PlanFile) -> Result<Self, Self::Error> {
        let run = match file.mode {
            PlanMode::Rate => rate_config(&file)?,
            PlanMode::Vus => vus_config(&file)?,
        };
        let graceful_stop = std_duration(&file.graceful_stop).unwrap_or(DEFAULT_GRACEFUL_STOP);
        let run = run.with_graceful_stop(Some(graceful_stop));

        if !file.payload.is_object() {
            return Err(ConfigError::PayloadNotObject);
        }

        let mut request = RequestSpec::json(&file.url, &file.payload)?
            .with_timeout(std_duration(&file.request_timeout));
        for (name, value) in file.headers {
            if name.eq_ignore_ascii_case("content-type") {
                request
                    .headers
                    .retain(|k, _| !k.eq_ignore_ascii_case("content-type"));
            }
            request.headers.insert(name, value);
        }

        Ok(TestPlan { run, request })
    }
}

fn rate_config(file: &PlanFile) -> Result<RunConfig, ConfigError> {
    const MODE: &str = "rate";
    reject(file.vus.is_some(), "vus", MODE)?;
    reject(file.stages.is_some(), "stages", MODE)?;
    reject(file.sleep_interval.is_some(), "sleepInterval", MODE)?;

    let rate = file
        .target_rate
        .ok_or(ConfigError::MissingOption("targetRate", MODE))?;
    let duration = std_duration(&file.duration)
        .ok_or(ConfigError::MissingOption("duration", MODE))?;
    let pre_allocated_vus = file
        .pre_allocated_vus
        .ok_or(ConfigError::MissingOption("preAllocatedVUs", MODE))?;
    let max_vus = file.max_vus.unwrap_or(pre_allocated_vus);

    RunConfig::rate_driven(rate, duration, pre_allocated_vus, max_vus)?
        .with_time_unit(std_duration(&file.time_unit).unwrap_or(DEFAULT_TIME_UNIT))
}

fn vus_config(file: &PlanFile) -> Result<RunConfig, ConfigError> {
    const MODE: &str = "vus";
    reject(file.target_rate.is_some(), "targetRate", MODE)?;
    reject(file.time_unit.is_some(), "timeUnit", MODE)?;
    reject(file.pre_allocated_vus.is_some(), "preAllocatedVUs", MODE)?;
    reject(file.max_vus.is_some(), "maxVUs", MODE)?;

    let config = match &file.stages {
        Some(stages) => {
            reject(file.duration.is_some(), "duration", "staged vus")?;
            let stages = stages
                .iter()
                .map(|s| Stage::new(*s.duration, s.target))
                .collect();
            RunConfig::staged(file.vus.unwrap_or(1), stages)?
        }
        None => {
            let vus = file.vus.ok_or(ConfigError::MissingOption("vus", MODE))?;
            let duration = std_duration(&file.duration)
                .ok_or(ConfigError::MissingOption("duration", MODE))?;
            RunConfig::concurrency_driven(vus, duration)?
        }
    };

    let sleep_interval = std_duration(&file.sleep_interval).unwrap_or(DEFAULT_SLEEP_INTERVAL);
    Ok(config.with_sleep_interval(sleep_interval))
}

fn std_duration(duration: &Option<humantime::Duration>) -> Option<Duration> {
    duration.as_ref().map(|d| **d)
}

fn reject(present: bool, option: &'static str, mode: &'static str) -> Result<(), ConfigError> {
    if present {
        Err(ConfigError::UnexpectedOption(option, mode))
    } else {
        Ok(())
    }
}
