#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod executor;
mod pool;
mod reporter;
mod scheduler;

pub use surge_core as core;

pub use executor::{ExecutorError, RequestExecutor};
pub use load_test::{BoxedFut, LoadTest};
pub use pool::{CapacityExceeded, Worker, WorkerLease, WorkerPool};
pub use reporter::{Reporter, TracingReporter};

pub mod prelude {
    pub use crate::{LoadTest, Reporter, RequestExecutor};
    pub use surge_core::{
        CompletionPayload, IterationError, IterationResult, RequestSpec, RunConfig,
        RunStatistics, Stage, TestPlan,
    };
}
