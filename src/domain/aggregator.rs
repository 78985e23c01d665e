//! Concurrent evaluation of (strategy, pair) jobs into a metrics table.
//!
//! Jobs run on a private rayon pool. Each one moves Pending -> Running ->
//! Succeeded | Failed; typed errors and panics both end as failed rows, so a
//! bad job never takes its siblings down. There are no retries.

use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::error::BacktestError;
use super::ohlcv::PriceSeries;
use super::simulator::{Simulation, SimulationParams};
use super::strategy::Strategy;
use super::table::{MetricsTable, RunResult};

/// One strategy over one pair's price data.
#[derive(Debug, Clone)]
pub struct RunJob {
    pub strategy: Strategy,
    pub series: Arc<PriceSeries>,
    pub params: SimulationParams,
}

impl RunJob {
    pub fn new(strategy: Strategy, series: Arc<PriceSeries>, params: SimulationParams) -> Self {
        RunJob {
            strategy,
            series,
            params,
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn pair(&self) -> &str {
        self.series.pair()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunState::Pending => "pending",
            RunState::Running => "running",
            RunState::Succeeded => "succeeded",
            RunState::Failed => "failed",
        })
    }
}

#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    workers: usize,
    cancel: Arc<AtomicBool>,
}

impl MetricsAggregator {
    pub fn new(workers: usize) -> Self {
        MetricsAggregator {
            workers: workers.max(1),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an externally owned cancellation flag.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Evaluate every job with its strategy and parameters.
    pub fn run(&self, jobs: Vec<RunJob>) -> Result<MetricsTable, BacktestError> {
        self.run_with(jobs, |job| job.strategy.evaluate(&job.series, &job.params))
    }

    /// Evaluate every job with `evaluate`. Jobs not yet started when the
    /// cancel flag is raised produce no row.
    pub fn run_with<F>(&self, jobs: Vec<RunJob>, evaluate: F) -> Result<MetricsTable, BacktestError>
    where
        F: Fn(&RunJob) -> Result<Simulation, BacktestError> + Sync,
    {
        let jobs = dedup_jobs(jobs);
        let total = jobs.len();
        for job in &jobs {
            debug!(strategy = job.strategy_name(), pair = job.pair(), state = %RunState::Pending, "queued");
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("backtest-{i}"))
            .build()
            .map_err(|e| BacktestError::RunFailure {
                reason: format!("failed to build worker pool: {e}"),
            })?;

        let cancel = &self.cancel;
        let rows: Vec<RunResult> = pool.install(|| {
            jobs.par_iter()
                .filter_map(|job| {
                    if cancel.load(Ordering::Relaxed) {
                        debug!(strategy = job.strategy_name(), pair = job.pair(), "skipped after cancel");
                        return None;
                    }
                    Some(run_job(job, &evaluate))
                })
                .collect()
        });

        let table: MetricsTable = rows.into_iter().collect();
        info!(
            total,
            completed = table.len(),
            succeeded = table.succeeded_count(),
            failed = table.failed_count(),
            "runs finished"
        );
        Ok(table)
    }
}

/// Keep the first job for each (strategy, pair).
fn dedup_jobs(jobs: Vec<RunJob>) -> Vec<RunJob> {
    let mut seen = HashSet::new();
    jobs.into_iter()
        .filter(|job| {
            let fresh = seen.insert((job.strategy_name(), job.pair().to_string()));
            if !fresh {
                warn!(strategy = job.strategy_name(), pair = job.pair(), "dropping duplicate job");
            }
            fresh
        })
        .collect()
}

fn run_job<F>(job: &RunJob, evaluate: &F) -> RunResult
where
    F: Fn(&RunJob) -> Result<Simulation, BacktestError>,
{
    let strategy = job.strategy_name();
    let pair = job.pair();
    debug!(strategy, pair, state = %RunState::Running, "started");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| evaluate(job)));
    let row = match outcome {
        Ok(Ok(sim)) => RunResult::succeeded(strategy, pair, sim),
        Ok(Err(err)) => RunResult::from_error(strategy, pair, &err),
        Err(payload) => {
            let err = BacktestError::RunFailure {
                reason: panic_message(payload.as_ref()),
            };
            RunResult::from_error(strategy, pair, &err)
        }
    };

    match row.error() {
        None => debug!(strategy, pair, state = %RunState::Succeeded, "finished"),
        Some(error) => warn!(strategy, pair, state = %RunState::Failed, %error, "run failed"),
    }
    row
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
