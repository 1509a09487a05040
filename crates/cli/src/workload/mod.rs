//! Synthetic workload driven through a dispatcher.
//!
//! Each worker task hammers the dispatcher with the full operation mix and
//! keeps its own latency statistics; the driver merges them and reads the
//! totals back once every worker has stopped.

mod stats;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::TelemetryEvent;
use dispatcher::{ClientMetrics, TelemetryClient, TelemetryDispatcher};
use observability::DispatchStats;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::CliError;

pub use stats::{ReadBack, WorkloadStats};

/// Hit incremented once per iteration by every worker
pub const REQUESTS_HIT: &str = "requests";

/// Metric incremented once per iteration, variation chosen by iteration
pub const LATENCY_METRIC: &str = "latency_bucket";

/// Variations of [`LATENCY_METRIC`]
pub const LATENCY_BUCKETS: [&str; 3] = ["fast", "normal", "slow"];

/// Exception tracked every [`EXCEPTION_EVERY`] iterations
pub const SYNTHETIC_EXCEPTION: &str = "SyntheticTimeout";

const EXCEPTION_EVERY: u64 = 100;

/// Workload parameters
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Concurrent worker tasks
    pub workers: usize,
    /// Iterations per worker (None = until stopped)
    pub iterations: Option<u64>,
    /// Wall-clock limit (None = no limit)
    pub duration: Option<Duration>,
    /// TTL of heartbeat events
    pub event_ttl: Duration,
}

/// Last iteration completed by a worker, stored with a TTL
#[derive(Debug, Clone)]
pub struct Heartbeat {
    name: String,
    iteration: u64,
}

impl Heartbeat {
    pub fn new(worker: usize, iteration: u64) -> Self {
        Self {
            name: worker_name(worker),
            iteration,
        }
    }
}

impl TelemetryEvent for Heartbeat {
    type Payload = u64;

    fn name(&self) -> &str {
        &self.name
    }

    fn payload(&self) -> u64 {
        self.iteration
    }
}

pub fn worker_name(worker: usize) -> String {
    format!("worker-{worker}")
}

/// Drives [`WorkloadConfig::workers`] tasks against a shared dispatcher
pub struct Workload {
    config: WorkloadConfig,
    dispatcher: Arc<TelemetryDispatcher>,
    isolated: Vec<(String, Arc<ClientMetrics>)>,
}

impl Workload {
    pub fn new(
        config: WorkloadConfig,
        dispatcher: TelemetryDispatcher,
        isolated: Vec<(String, Arc<ClientMetrics>)>,
    ) -> Self {
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
            isolated,
        }
    }

    /// Run until every worker finishes, the time limit passes or `shutdown` resolves
    pub async fn run<S>(self, shutdown: S) -> Result<WorkloadStats, CliError>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let start = Instant::now();
        let deadline = self.config.duration.map(|d| start + d);
        let (stop_tx, stop_rx) = watch::channel(false);

        // Report how many clients were resolved for the dispatcher itself
        if let Err(e) = self
            .dispatcher
            .track_dependency_of::<dyn TelemetryClient>(self.dispatcher.len() as u64)
        {
            warn!(error = %e, "Failed to track client count");
        }

        let signal = tokio::spawn(async move {
            shutdown.await;
            warn!("Received shutdown signal, stopping workers...");
            let _ = stop_tx.send(true);
        });

        info!(
            workers = self.config.workers,
            iterations = ?self.config.iterations,
            duration = ?self.config.duration,
            clients = ?self.dispatcher.client_names(),
            "Starting workload"
        );

        let handles: Vec<_> = (0..self.config.workers)
            .map(|worker| {
                let dispatcher = Arc::clone(&self.dispatcher);
                let stop = stop_rx.clone();
                let config = self.config.clone();
                tokio::spawn(run_worker(worker, dispatcher, config, deadline, stop))
            })
            .collect();

        let mut stats = WorkloadStats::default();
        for (worker, handle) in handles.into_iter().enumerate() {
            let (iterations, dispatch) = handle
                .await
                .map_err(|e| CliError::worker(worker, e.to_string()))?;
            stats.iterations += iterations;
            stats.dispatch.merge(&dispatch);
        }
        signal.abort();

        stats.duration = start.elapsed();
        stats.read_back = self.read_back();
        stats.isolated = self
            .isolated
            .iter()
            .map(|(name, metrics)| (name.clone(), metrics.snapshot()))
            .collect();

        Ok(stats)
    }

    fn read_back(&self) -> ReadBack {
        let mut read_back = ReadBack::default();

        match self.dispatcher.get_hit(REQUESTS_HIT) {
            Ok(total) => read_back.requests = total,
            Err(e) => warn!(error = %e, "Failed to read back requests"),
        }

        for worker in 0..self.config.workers {
            let name = worker_name(worker);
            match self.dispatcher.get_hit(&name) {
                Ok(hits) => {
                    read_back.worker_hits.insert(name, hits);
                }
                Err(e) => warn!(worker = %name, error = %e, "Failed to read back worker hits"),
            }

            match self.dispatcher.get_event(&Heartbeat::new(worker, 0)) {
                Ok(Some(iteration)) => {
                    read_back.heartbeats.insert(worker_name(worker), iteration);
                }
                Ok(None) => debug!(worker, "No live heartbeat"),
                Err(e) => warn!(worker, error = %e, "Failed to read back heartbeat"),
            }
        }

        for bucket in LATENCY_BUCKETS {
            match self.dispatcher.get_metric(LATENCY_METRIC, bucket) {
                Ok(value) => {
                    read_back.buckets.insert(bucket.to_string(), value);
                }
                Err(e) => warn!(bucket, error = %e, "Failed to read back metric"),
            }
        }

        read_back
    }
}

async fn run_worker(
    worker: usize,
    dispatcher: Arc<TelemetryDispatcher>,
    config: WorkloadConfig,
    deadline: Option<Instant>,
    stop: watch::Receiver<bool>,
) -> (u64, DispatchStats) {
    let name = worker_name(worker);
    let mut stats = DispatchStats::new();
    let mut iteration = 0_u64;

    loop {
        if config.iterations.is_some_and(|limit| iteration >= limit)
            || deadline.is_some_and(|at| Instant::now() >= at)
            || *stop.borrow()
        {
            break;
        }

        timed(&mut stats, "track_hit", || dispatcher.track_hit(REQUESTS_HIT));
        timed(&mut stats, "track_hit", || dispatcher.track_hit(&name));

        let bucket = LATENCY_BUCKETS[(iteration as usize) % LATENCY_BUCKETS.len()];
        timed(&mut stats, "track_metric", || {
            dispatcher.track_metric(LATENCY_METRIC, bucket)
        });

        let heartbeat = Heartbeat::new(worker, iteration);
        timed(&mut stats, "track_event_with_ttl", || {
            dispatcher.track_event_with_ttl(&heartbeat, config.event_ttl)
        });

        timed(&mut stats, "get_hit", || dispatcher.get_hit(REQUESTS_HIT));

        if iteration % EXCEPTION_EVERY == EXCEPTION_EVERY - 1 {
            timed(&mut stats, "track_exception", || {
                dispatcher.track_exception(SYNTHETIC_EXCEPTION)
            });
        }

        iteration += 1;
        tokio::task::yield_now().await;
    }

    debug!(worker = %name, iterations = iteration, "Worker finished");
    (iteration, stats)
}

fn timed<T, F>(stats: &mut DispatchStats, op: &str, call: F)
where
    F: FnOnce() -> contracts::Result<T>,
{
    let started = Instant::now();
    match call() {
        Ok(_) => stats.record(op, started.elapsed()),
        Err(e) => {
            debug!(op, error = %e, "Dispatch failed");
            stats.record_failure(op);
        }
    }
}
