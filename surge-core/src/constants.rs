use std::time::Duration;

/// Default unit the arrival rate is expressed in.
pub const DEFAULT_TIME_UNIT: Duration = Duration::from_secs(1);

/// Default pause between two iterations of the same virtual user.
pub const DEFAULT_SLEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Default hard deadline applied by plan files after the run ends.
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);

/// How often the virtual-user controller re-evaluates the stage target.
pub const STAGE_TICK: Duration = Duration::from_millis(100);

pub const JSON_CONTENT_TYPE: &str = "application/json";
