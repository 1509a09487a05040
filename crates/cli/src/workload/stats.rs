//! Workload statistics.

use std::collections::BTreeMap;
use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::{DispatchStats, StatsSummary};

use super::{LATENCY_METRIC, REQUESTS_HIT};

/// Values read back through the dispatcher after the run
#[derive(Debug, Clone, Default)]
pub struct ReadBack {
    /// Total of the shared requests hit
    pub requests: u64,
    /// Hits per worker
    pub worker_hits: BTreeMap<String, u64>,
    /// Latency bucket counts
    pub buckets: BTreeMap<String, i64>,
    /// Last live heartbeat per worker (expired ones are absent)
    pub heartbeats: BTreeMap<String, u64>,
}

/// Statistics from a workload run
#[derive(Debug, Clone, Default)]
pub struct WorkloadStats {
    /// Iterations completed across all workers
    pub iterations: u64,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Per-operation latency and failures, merged across workers
    pub dispatch: DispatchStats,

    /// Totals read back after the run
    pub read_back: ReadBack,

    /// Counters of clients configured with `isolate_failures`
    pub isolated: Vec<(String, MetricsSnapshot)>,
}

impl WorkloadStats {
    /// Dispatcher calls per second
    pub fn calls_per_sec(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            (self.dispatch.total_calls() + self.dispatch.total_failures()) as f64 / secs
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Workload Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Iterations: {}", self.iterations);
        println!("   ├─ Calls/s: {:.0}", self.calls_per_sec());
        println!("   └─ Failed calls: {}", self.dispatch.total_failures());

        println!("\n⏱️  Dispatch Latency (us)");
        for (op, stats) in &self.dispatch.latency_us {
            println!("   ├─ {}: {}", op, StatsSummary::from(stats));
        }
        for (op, count) in &self.dispatch.failures {
            println!("   ├─ {} failures: {}", op, count);
        }

        let read_back = &self.read_back;
        println!("\n🔎 Read Back");
        println!("   ├─ {}: {}", REQUESTS_HIT, read_back.requests);
        for (worker, hits) in &read_back.worker_hits {
            let heartbeat = read_back
                .heartbeats
                .get(worker)
                .map(|i| format!("last heartbeat #{i}"))
                .unwrap_or_else(|| "no live heartbeat".to_string());
            println!("   ├─ {}: {} hits, {}", worker, hits, heartbeat);
        }
        for (bucket, value) in &read_back.buckets {
            println!("   ├─ {}/{}: {}", LATENCY_METRIC, bucket, value);
        }
        println!("   └─ (0 means no readable client answered)");

        if !self.isolated.is_empty() {
            println!("\n🛡️  Isolated Clients");
            for (name, snapshot) in &self.isolated {
                println!(
                    "   ├─ {}: writes={}, reads={}, failures={}",
                    name, snapshot.write_count, snapshot.read_count, snapshot.failure_count
                );
            }
        }

        println!();
    }
}
