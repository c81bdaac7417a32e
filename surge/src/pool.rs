//! Bounded pool of virtual users for the arrival-rate executor.
//!
//! Starts with `pre_allocated` idle workers and grows on demand up to `max_vus`. The pool
//! never shrinks during a run. Workers are handed out as [`WorkerLease`]s which return the
//! worker to the pool when dropped, whether the iteration succeeded, failed or was abandoned.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Every one of the pool's `max_vus` workers is busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("All {max_vus} virtual users are busy")]
pub struct CapacityExceeded {
    pub max_vus: usize,
}

/// A virtual user owned by the pool.
#[derive(Debug)]
pub struct Worker {
    id: usize,
    iterations: u64,
}

impl Worker {
    fn new(id: usize) -> Self {
        Self { id, iterations: 0 }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Iterations this worker has completed over its lifetime.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    state: Arc<Mutex<PoolState>>,
    max_vus: usize,
}

#[derive(Debug)]
struct PoolState {
    free: Vec<Worker>,
    size: usize,
    busy: usize,
    peak_busy: usize,
}

impl WorkerPool {
    pub fn new(pre_allocated: usize, max_vus: usize) -> Self {
        let max_vus = max_vus.max(pre_allocated);
        // Reversed so that the lowest ids are handed out first
        let free = (0..pre_allocated).rev().map(Worker::new).collect();

        Self {
            state: Arc::new(Mutex::new(PoolState {
                free,
                size: pre_allocated,
                busy: 0,
                peak_busy: 0,
            })),
            max_vus,
        }
    }

    /// Borrow a free worker, growing the pool if none is free and it is below `max_vus`.
    pub fn acquire(&self) -> Result<WorkerLease, CapacityExceeded> {
        let mut state = self.lock();

        let worker = match state.free.pop() {
            Some(worker) => worker,
            None if state.size < self.max_vus => {
                let worker = Worker::new(state.size);
                state.size += 1;
                debug!("Growing pool to {} virtual users.", state.size);
                worker
            }
            None => {
                return Err(CapacityExceeded {
                    max_vus: self.max_vus,
                })
            }
        };

        state.busy += 1;
        state.peak_busy = state.peak_busy.max(state.busy);

        #[cfg(feature = "metrics")]
        metrics::gauge!("surge_active_vus").set(state.busy as f64);

        Ok(WorkerLease {
            worker: Some(worker),
            pool: self.clone(),
        })
    }

    fn release(&self, worker: Worker) {
        let mut state = self.lock();
        trace!(
            "Worker {} released after {} iterations.",
            worker.id,
            worker.iterations
        );
        state.busy -= 1;
        state.free.push(worker);

        #[cfg(feature = "metrics")]
        metrics::gauge!("surge_active_vus").set(state.busy as f64);
    }

    /// Workers allocated so far, busy or idle.
    pub fn size(&self) -> usize {
        self.lock().size
    }

    pub fn busy(&self) -> usize {
        self.lock().busy
    }

    pub fn peak_busy(&self) -> usize {
        self.lock().peak_busy
    }

    pub fn max_vus(&self) -> usize {
        self.max_vus
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // NOTE: The state is updated in single statements, so a panic while holding the lock
        // cannot leave it half-written.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A worker on loan from a [`WorkerPool`]. Dropping it releases the worker.
#[derive(Debug)]
pub struct WorkerLease {
    worker: Option<Worker>,
    pool: WorkerPool,
}

impl WorkerLease {
    pub fn id(&self) -> usize {
        self.worker.as_ref().map_or(0, Worker::id)
    }

    pub fn record_iteration(&mut self) {
        if let Some(worker) = &mut self.worker {
            worker.iterations += 1;
        }
    }
}

impl Drop for WorkerLease {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.pool.release(worker);
        }
    }
}
