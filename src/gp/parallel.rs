//! Worker pool for parallel spawning and evaluation.
//!
//! Tasks run on a bounded rayon pool and send their results back over an mpsc
//! channel, so the controller sees them in completion order. Shared state is
//! read-only and lives behind an `Arc`. A panicking task does not take the
//! pool down: it is reported as [`SearchError::PoolFailure`] with the label of
//! the work item that caused it.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, mpsc};

use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::evaluation::Evaluator;
use super::spawner::GeneSpawner;
use crate::error::{Result, SearchError};

/// Read-only state every worker task may use.
pub struct SharedContext {
    pub spawner: Arc<GeneSpawner>,
    pub evaluator: Arc<dyn Evaluator>,
}

/// Owns the worker pool. The pool is released when the context is closed or
/// dropped, whichever comes first.
pub struct ParallelContext {
    pool: ThreadPool,
    shared: Arc<SharedContext>,
}

impl ParallelContext {
    /// Build a pool with `workers` threads, or one per available core.
    pub fn new(
        workers: Option<usize>,
        spawner: Arc<GeneSpawner>,
        evaluator: Arc<dyn Evaluator>,
    ) -> Result<Self> {
        let workers = workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("push-synth-worker-{i}"))
            .build()?;
        debug!("Started worker pool with {workers} threads");
        Ok(Self {
            pool,
            shared: Arc::new(SharedContext { spawner, evaluator }),
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn shared(&self) -> &Arc<SharedContext> {
        &self.shared
    }

    /// Run `task` on every item and collect results in completion order.
    ///
    /// Each item carries a label used to identify it if its task panics.
    pub fn dispatch_unordered<T, R, F>(&self, items: Vec<(String, T)>, task: F) -> Vec<Result<R>>
    where
        T: Send,
        R: Send,
        F: Fn(&SharedContext, T) -> R + Send + Sync,
    {
        let (tx, rx) = mpsc::channel();
        let shared: &SharedContext = &self.shared;
        let task = &task;

        self.pool.scope(|scope| {
            for (label, item) in items {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let outcome = catch_unwind(AssertUnwindSafe(|| task(shared, item)))
                        .map_err(|payload| SearchError::PoolFailure {
                            genome: label,
                            message: panic_message(payload.as_ref()),
                        });
                    // the receiver outlives the scope, so this cannot fail
                    let _ = tx.send(outcome);
                });
            }
        });
        drop(tx);

        rx.into_iter().collect()
    }

    /// Release the pool now rather than at drop.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for ParallelContext {
    fn drop(&mut self) {
        debug!("Releasing worker pool ({} threads)", self.pool.current_num_threads());
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
