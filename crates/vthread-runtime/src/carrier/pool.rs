//! Elastic carrier pool
//!
//! Carriers are OS threads that run virtual-thread units. The pool never
//! queues a unit behind a busy carrier: a submission either hands the unit
//! to a parked carrier or starts a new one. Units that block (joining a
//! nested scope, waiting on a subtask) therefore never starve the rest.
//! Carriers above `core_carriers` retire after `keep_alive` of idleness,
//! so a burst of blocking units does not leave a burst of threads behind.
//!
//! ```text
//!   submit ──► parked carrier? ──yes──► push to queue, notify one
//!                    │
//!                    no
//!                    ▼
//!              spawn carrier with the unit as its first job
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_queue::SegQueue;
use parking_lot::{Condvar, Mutex};

use vthread_core::error::{TaskFailure, VtError, VtResult};
use vthread_core::thread::Task;

use crate::config::CarrierConfig;

/// Pool of carrier threads
#[derive(Clone)]
pub struct CarrierPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    config: CarrierConfig,

    /// Units handed to parked carriers
    queue: SegQueue<Task>,

    /// Carrier bookkeeping; the condvar parks idle carriers on it
    state: Mutex<PoolState>,
    condvar: Condvar,

    /// Suffix for the next carrier's OS thread name
    next_carrier: AtomicUsize,
}

#[derive(Debug, Default)]
struct PoolState {
    /// Live carriers
    carriers: usize,
    /// Carriers parked on the condvar
    idle: usize,
    /// Wakeups issued but not yet consumed by a carrier
    notified: usize,
}

/// Point-in-time counters for diagnostics and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub carriers: usize,
    pub idle: usize,
    pub queued: usize,
}

impl CarrierPool {
    /// Create a pool; no carrier starts until the first submission
    pub fn new(config: CarrierConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                config,
                queue: SegQueue::new(),
                state: Mutex::new(PoolState::default()),
                condvar: Condvar::new(),
                next_carrier: AtomicUsize::new(0),
            }),
        }
    }

    pub fn config(&self) -> &CarrierConfig {
        &self.inner.config
    }

    /// Run `job` on a parked carrier, or on a new one if none is parked
    pub fn submit(&self, job: Task) -> VtResult<()> {
        let mut state = self.inner.state.lock();
        if state.idle > state.notified {
            state.notified += 1;
            self.inner.queue.push(job);
            self.inner.condvar.notify_one();
            return Ok(());
        }
        state.carriers += 1;
        drop(state);

        if let Err(e) = self.spawn_carrier(job) {
            self.inner.state.lock().carriers -= 1;
            tracing::warn!(error = %e, "failed to start carrier");
            return Err(e);
        }
        Ok(())
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        PoolStats {
            carriers: state.carriers,
            idle: state.idle,
            queued: self.inner.queue.len(),
        }
    }

    fn spawn_carrier(&self, first: Task) -> VtResult<()> {
        let id = self.inner.next_carrier.fetch_add(1, Ordering::Relaxed);
        let mut builder = thread::Builder::new()
            .name(format!("{}{}", self.inner.config.carrier_name_prefix, id));
        if let Some(size) = self.inner.config.stack_size {
            builder = builder.stack_size(size);
        }

        let inner = self.inner.clone();
        builder
            .spawn(move || carrier_main_loop(inner, first))
            .map(|_| ())
            .map_err(|e| VtError::Spawn(e.to_string()))
    }
}

impl std::fmt::Debug for CarrierPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarrierPool")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Run one unit, containing any panic that escaped its own handling
fn run_job(job: Task) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        let failure = TaskFailure::from_panic(payload);
        tracing::warn!(error = %failure, "virtual thread panicked on carrier");
    }
}

fn carrier_main_loop(inner: Arc<PoolInner>, first: Task) {
    tracing::trace!("carrier started");
    run_job(first);

    loop {
        if let Some(job) = inner.queue.pop() {
            run_job(job);
            continue;
        }

        let mut state = inner.state.lock();
        // Re-check under the lock; a submitter only pushes while holding it
        if let Some(job) = inner.queue.pop() {
            drop(state);
            run_job(job);
            continue;
        }

        state.idle += 1;
        let timed_out = inner
            .condvar
            .wait_for(&mut state, inner.config.keep_alive)
            .timed_out();
        state.idle -= 1;

        if state.notified > 0 {
            state.notified -= 1;
            continue;
        }

        if timed_out && state.carriers > inner.config.core_carriers && inner.queue.is_empty() {
            state.carriers -= 1;
            tracing::trace!(remaining = state.carriers, "idle carrier retiring");
            return;
        }
    }
}
