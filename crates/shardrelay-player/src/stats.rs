//! Player statistics: counters, sliding-window rates, timing
//! aggregates, and a read-only JSON snapshot.
//!
//! Counters are atomics safe for concurrent updates; everything else
//! is touched only by the player task and the rate sampler. Counter
//! updates are also emitted to the `metrics` facade for whatever
//! exporter the process has installed.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Number of samples kept in a rate window.
pub const RATE_SAMPLES: usize = 15;
/// Interval between rate samples.
pub const RATE_INTERVAL: Duration = Duration::from_secs(60);

/// Timing aggregate for one class of operations.
#[derive(Debug, Default)]
struct Timing {
    count: AtomicU64,
    total_micros: AtomicU64,
    max_micros: AtomicU64,
}

impl Timing {
    fn record(&self, elapsed: Duration) {
        let micros = elapsed.as_micros() as u64;
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
        self.max_micros.fetch_max(micros, Ordering::Relaxed);
    }

    fn snapshot(&self) -> TimingSnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let total_micros = self.total_micros.load(Ordering::Relaxed);
        TimingSnapshot {
            count,
            total_micros,
            max_micros: self.max_micros.load(Ordering::Relaxed),
            avg_micros: if count > 0 { total_micros / count } else { 0 },
        }
    }
}

/// Aggregate view of one timing class.
#[derive(Debug, Clone, Serialize)]
pub struct TimingSnapshot {
    /// Operations recorded.
    pub count: u64,
    /// Total time across all operations, microseconds.
    pub total_micros: u64,
    /// Slowest operation, microseconds.
    pub max_micros: u64,
    /// Mean time, microseconds.
    pub avg_micros: u64,
}

/// Sliding window of counter samples.
#[derive(Debug, Default)]
struct RateWindow {
    samples: Mutex<VecDeque<(Instant, u64)>>,
}

impl RateWindow {
    fn sample(&self, value: u64) {
        let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.push_back((Instant::now(), value));
        while samples.len() > RATE_SAMPLES {
            samples.pop_front();
        }
    }

    fn per_second(&self) -> f64 {
        let samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        let (Some(first), Some(last)) = (samples.front(), samples.back()) else {
            return 0.0;
        };
        let elapsed = last.0.duration_since(first.0).as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        last.1.saturating_sub(first.1) as f64 / elapsed
    }
}

/// Statistics registry for one player, alive from construction to
/// process exit.
#[derive(Debug, Default)]
pub struct PlayerStats {
    txn_count: AtomicU64,
    query_count: AtomicU64,
    txn_time: Timing,
    query_time: Timing,
    txn_rate: RateWindow,
    query_rate: RateWindow,
}

impl PlayerStats {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add applied source transactions.
    pub fn add_txns(&self, n: u64) {
        self.txn_count.fetch_add(n, Ordering::Relaxed);
        metrics::counter!("shardrelay_txn_total").increment(n);
    }

    /// Add executed downstream queries.
    pub fn add_queries(&self, n: u64) {
        self.query_count.fetch_add(n, Ordering::Relaxed);
        metrics::counter!("shardrelay_query_total").increment(n);
    }

    /// Record a downstream transaction duration from its start time.
    pub fn record_txn_time(&self, start: Instant) {
        let elapsed = start.elapsed();
        self.txn_time.record(elapsed);
        metrics::histogram!("shardrelay_txn_seconds").record(elapsed.as_secs_f64());
    }

    /// Record a single query duration from its start time.
    pub fn record_query_time(&self, start: Instant) {
        let elapsed = start.elapsed();
        self.query_time.record(elapsed);
        metrics::histogram!("shardrelay_query_seconds").record(elapsed.as_secs_f64());
    }

    /// Total applied source transactions.
    pub fn txn_count(&self) -> u64 {
        self.txn_count.load(Ordering::Relaxed)
    }

    /// Total executed downstream queries.
    pub fn query_count(&self) -> u64 {
        self.query_count.load(Ordering::Relaxed)
    }

    /// Push one sample into both rate windows. Called by the sampler
    /// task; tests drive it directly.
    pub fn sample_rates(&self) {
        self.txn_rate.sample(self.txn_count());
        self.query_rate.sample(self.query_count());
    }

    /// Point-in-time view of all statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            txn_count: self.txn_count(),
            query_count: self.query_count(),
            queries_per_sec: self.query_rate.per_second(),
            txn_per_sec: self.txn_rate.per_second(),
            txn_time: self.txn_time.snapshot(),
            query_time: self.query_time.snapshot(),
        }
    }

    /// JSON rendering of [`PlayerStats::snapshot`].
    pub fn stats_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_default()
    }
}

/// Read-only statistics view serialized for operators.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// Applied source transactions.
    #[serde(rename = "TxnCount")]
    pub txn_count: u64,
    /// Executed downstream queries.
    #[serde(rename = "QueryCount")]
    pub query_count: u64,
    /// Query rate over the sampling window.
    #[serde(rename = "QueriesPerSec")]
    pub queries_per_sec: f64,
    /// Transaction rate over the sampling window.
    #[serde(rename = "TxnPerSec")]
    pub txn_per_sec: f64,
    /// Downstream transaction timings.
    #[serde(rename = "TxnTime")]
    pub txn_time: TimingSnapshot,
    /// Downstream query timings.
    #[serde(rename = "QueryTime")]
    pub query_time: TimingSnapshot,
}

/// Spawn a task sampling the rate windows every [`RATE_INTERVAL`].
pub fn spawn_rate_sampler(stats: Arc<PlayerStats>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_INTERVAL);
        // The first tick fires immediately and seeds the window.
        loop {
            interval.tick().await;
            stats.sample_rates();
        }
    })
}
