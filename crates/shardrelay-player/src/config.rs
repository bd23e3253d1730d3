//! Player configuration.

use crate::retry::RetryPolicy;
use shardrelay_protocol::KeyRange;
use std::time::Duration;

/// Tuning and scoping knobs for one player instance.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Consumer id; primary key in the checkpoint table.
    pub uid: u32,
    /// Key range forwarded to the upstream, `[start, end)`.
    pub key_range: KeyRange,
    /// Tables this consumer applies. Empty applies everything.
    pub tables: Vec<String>,
    /// Completed source transactions collapsed into one downstream
    /// transaction.
    pub txn_batch: usize,
    /// Flush when the current batch has been open longer than this.
    pub max_txn_interval: Duration,
    /// Whether DDL events are applied or discarded.
    pub exec_ddl: bool,
    /// Backoff policy for deadlocked flush retries.
    pub retry: RetryPolicy,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            uid: 0,
            key_range: KeyRange::default(),
            tables: Vec::new(),
            txn_batch: 10,
            max_txn_interval: Duration::from_secs(5),
            exec_ddl: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl PlayerConfig {
    /// Config for one consumer uid and its key range.
    pub fn new(uid: u32, key_range: KeyRange) -> Self {
        Self {
            uid,
            key_range,
            ..Default::default()
        }
    }

    /// Restrict the consumer to the named tables.
    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = tables;
        self
    }

    /// Set the transaction batch size.
    pub fn with_txn_batch(mut self, n: usize) -> Self {
        self.txn_batch = n;
        self
    }

    /// Set the batch age limit.
    pub fn with_max_txn_interval(mut self, d: Duration) -> Self {
        self.max_txn_interval = d;
        self
    }

    /// Enable or disable DDL application.
    pub fn with_exec_ddl(mut self, v: bool) -> Self {
        self.exec_ddl = v;
        self
    }

    /// Set the deadlock retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
