//! Bounded fan-out executor.
//!
//! Dispatches an `Invoker` over a work list on a dedicated rayon pool and
//! streams outcomes back to the caller as they complete. The pool size is
//! chosen from a workload hint:
//!
//! ```text
//! Cpu  ->  cores                    (encoders: one child per core)
//! Io   ->  cores * io_multiplier    (git/pkg queries, HTTP fetches)
//! ```
//!
//! Either way the pool never exceeds the number of items, and an explicit
//! `max_workers` replaces the hint.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use rayon::ThreadPoolBuilder;
use thiserror::Error;

use crate::config::RunnerSettings;
use crate::process::{Invoker, Outcome, Status};
use crate::work::WorkItem;

/// Errors from the runner itself (never from individual items).
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("failed to build worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// What kind of work each item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    /// Short calls that mostly wait (queries, network).
    Io,
    /// Long calls that saturate a core (encoding).
    Cpu,
}

impl std::fmt::Display for Workload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Workload::Io => write!(f, "io"),
            Workload::Cpu => write!(f, "cpu"),
        }
    }
}

/// Pool sizing for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub workload: Workload,
    /// Explicit worker count; replaces the workload hint when set.
    pub max_workers: Option<usize>,
    /// Workers per core for `Workload::Io`.
    pub io_multiplier: usize,
}

impl RunnerConfig {
    pub fn new(workload: Workload) -> Self {
        Self {
            workload,
            max_workers: None,
            io_multiplier: 4,
        }
    }

    /// Build from the `[runner]` settings section.
    pub fn from_settings(workload: Workload, settings: &RunnerSettings) -> Self {
        Self {
            workload,
            max_workers: (settings.max_workers > 0).then_some(settings.max_workers),
            io_multiplier: settings.io_multiplier.max(1),
        }
    }

    /// Set an explicit worker count (builder pattern). Zero clears it.
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = (workers > 0).then_some(workers);
        self
    }

    /// Number of workers to use for `item_count` items.
    pub fn pool_size(&self, item_count: usize) -> usize {
        self.pool_size_for_cores(item_count, available_cores())
    }

    fn pool_size_for_cores(&self, item_count: usize, cores: usize) -> usize {
        let hinted = match self.workload {
            Workload::Cpu => cores,
            Workload::Io => cores * self.io_multiplier.max(1),
        };
        self.max_workers
            .unwrap_or(hinted)
            .min(item_count)
            .max(1)
    }
}

fn available_cores() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Runs an invoker over a work list with bounded concurrency.
pub struct Runner {
    config: RunnerConfig,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Invoke every item and return one outcome per item.
    ///
    /// Outcomes are returned in completion order. `on_outcome` is called on
    /// the calling thread as each one arrives. A panicking invocation is
    /// recorded as a `Status::Error` outcome for its item.
    pub fn run<I, F>(
        &self,
        items: Vec<WorkItem>,
        invoker: &I,
        mut on_outcome: F,
    ) -> RunnerResult<Vec<Outcome>>
    where
        I: Invoker + ?Sized,
        F: FnMut(&Outcome),
    {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let total = items.len();
        let workers = self.config.pool_size(total);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("wst-worker-{}", i))
            .build()?;

        tracing::info!(
            "Running {} items on {} workers ({} workload)",
            total,
            workers,
            self.config.workload
        );
        let started = Instant::now();

        let (tx, rx) = mpsc::channel::<Outcome>();
        let mut outcomes = Vec::with_capacity(total);

        thread::scope(|scope| {
            scope.spawn(move || {
                pool.scope(|s| {
                    for item in items {
                        let tx = tx.clone();
                        s.spawn(move |_| {
                            let _ = tx.send(invoke_isolated(invoker, item));
                        });
                    }
                });
            });

            // Ends once every sender clone has been dropped
            for outcome in rx {
                on_outcome(&outcome);
                outcomes.push(outcome);
            }
        });

        tracing::info!(
            "Finished {} items in {:.1}s",
            outcomes.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(outcomes)
    }
}

fn invoke_isolated<I: Invoker + ?Sized>(invoker: &I, item: WorkItem) -> Outcome {
    let fallback = item.clone();
    panic::catch_unwind(AssertUnwindSafe(|| invoker.invoke(item))).unwrap_or_else(|_| {
        tracing::error!("Worker panicked while processing {}", fallback);
        Outcome::new(fallback, Status::Error("worker panicked".to_string()))
    })
}
