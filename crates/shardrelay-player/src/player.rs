//! The binlog player: event state machine and transaction batcher.
//!
//! Whole source transactions are buffered as they arrive and
//! collapsed into a single downstream transaction at flush time: one
//! downstream BEGIN at the first applied DML, the recovery UPDATE at
//! the last buffered COMMIT, then one downstream COMMIT. The
//! checkpoint therefore advances atomically with the data it
//! describes.

use crate::checkpoint::{CheckpointStore, RecoveryState};
use crate::config::PlayerConfig;
use crate::error::{PlayerError, Result};
use crate::filter::TableFilter;
use crate::stats::PlayerStats;
use shardrelay_dbc::DbClient;
use shardrelay_protocol::{BinlogResponse, SqlType};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, info};

/// Outcome of one flush attempt.
enum FlushOutcome {
    /// The batch is applied and committed downstream.
    Applied,
    /// A deadlock rolled the batch back; flush again.
    Retry,
}

/// Applies a filtered upstream binlog stream to the downstream
/// database in batched, checkpointed transactions.
///
/// The player is single-threaded: the state machine, the batcher, and
/// the database client are only ever touched from the task driving
/// [`BinlogPlayer::process_event`].
pub struct BinlogPlayer {
    config: PlayerConfig,
    recovery_state: RecoveryState,
    checkpoint: CheckpointStore,
    filter: TableFilter,
    client: Box<dyn DbClient>,

    in_txn: bool,
    txn_buffer: Vec<BinlogResponse>,
    txn_index: usize,
    batch_start: Instant,

    stats: Arc<PlayerStats>,
}

impl std::fmt::Debug for BinlogPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinlogPlayer")
            .field("config", &self.config)
            .field("recovery_state", &self.recovery_state)
            .field("checkpoint", &self.checkpoint)
            .field("filter", &self.filter)
            .field("in_txn", &self.in_txn)
            .field("txn_buffer", &self.txn_buffer)
            .field("txn_index", &self.txn_index)
            .field("batch_start", &self.batch_start)
            .field("stats", &self.stats)
            .finish()
    }
}

impl BinlogPlayer {
    /// Create a player. Fails when the recovery state is not valid
    /// (empty addr, unaddressable start coordinates).
    pub fn new(
        client: Box<dyn DbClient>,
        config: PlayerConfig,
        start: RecoveryState,
    ) -> Result<Self> {
        start.validate()?;
        let checkpoint = CheckpointStore::new(config.uid);
        let filter = TableFilter::new(config.tables.clone());
        Ok(Self {
            config,
            recovery_state: start,
            checkpoint,
            filter,
            client,
            in_txn: false,
            txn_buffer: Vec::new(),
            txn_index: 0,
            batch_start: Instant::now(),
            stats: Arc::new(PlayerStats::new()),
        })
    }

    /// Shared handle to this player's statistics registry.
    pub fn stats(&self) -> Arc<PlayerStats> {
        Arc::clone(&self.stats)
    }

    /// JSON snapshot of the statistics registry.
    pub fn stats_json(&self) -> String {
        self.stats.stats_json()
    }

    /// The recovery state the player was constructed with.
    pub fn recovery_state(&self) -> &RecoveryState {
        &self.recovery_state
    }

    /// The player configuration.
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Feed one upstream event through the state machine.
    ///
    /// Terminal in-band errors return an error after draining; the
    /// caller distinguishes a normal end-of-stream with
    /// [`PlayerError::is_eof`].
    pub async fn process_event(&mut self, event: BinlogResponse) -> Result<()> {
        if event.is_error() {
            return self.handle_stream_error(event).await;
        }

        match event.data.sql_type {
            SqlType::Ddl => {
                if self.txn_index > 0 {
                    info!(
                        "flushing before ddl, batch {} buffered {}",
                        self.txn_index,
                        self.txn_buffer.len()
                    );
                    self.flush_txn_batch().await?;
                }
                if self.config.exec_ddl {
                    self.handle_ddl(&event).await?;
                } else {
                    debug!("discarding ddl at {}", event.position.position);
                }
            }
            SqlType::Begin => {
                if self.in_txn {
                    return Err(PlayerError::TxnAlreadyInProgress {
                        buffered: self.txn_buffer.len(),
                    });
                }
                if self.txn_index == 0 {
                    self.txn_buffer.clear();
                    self.batch_start = Instant::now();
                }
                self.in_txn = true;
                self.txn_buffer.push(event);
            }
            SqlType::Commit => {
                if !self.in_txn {
                    return Err(PlayerError::CommitWithoutTxn);
                }
                self.txn_index += 1;
                self.txn_buffer.push(event);
                self.in_txn = false;

                if self.batch_start.elapsed() > self.config.max_txn_interval
                    || self.txn_index == self.config.txn_batch
                {
                    self.flush_txn_batch().await?;
                }
            }
            SqlType::Dml => {
                if !self.in_txn {
                    return Err(PlayerError::DmlOutsideTxn);
                }
                self.txn_buffer.push(event);
            }
        }

        Ok(())
    }

    /// Terminal drain. An EOF-class error flushes any complete batch
    /// and persists the group id the stream ended at; every in-band
    /// error then propagates to the driver.
    async fn handle_stream_error(&mut self, event: BinlogResponse) -> Result<()> {
        if event.is_eof() {
            info!(
                "flushing remaining txns before exit, batch {} buffered {}",
                self.txn_index,
                self.txn_buffer.len()
            );
            let ends_on_commit = self
                .txn_buffer
                .last()
                .is_some_and(|e| e.data.sql_type == SqlType::Commit);
            if self.txn_index > 0 && ends_on_commit {
                self.flush_txn_batch().await?;
            }

            // Nothing left to process, we got it all. A buffer still
            // holding an unterminated transaction ends dirty and must
            // not move the EOF marker.
            if self.txn_buffer.is_empty() {
                self.checkpoint
                    .save_last_eof_group_id(
                        self.client.as_mut(),
                        &event.position.position.group_id,
                    )
                    .await?;
            }
        }

        if !event.position.position.master_filename.is_empty() {
            Err(PlayerError::StreamAt {
                position: event.position.position,
                message: event.error,
            })
        } else {
            Err(PlayerError::Stream {
                message: event.error,
            })
        }
    }

    /// Flush the buffered batch, retrying deadlocked attempts under
    /// the configured backoff policy.
    async fn flush_txn_batch(&mut self) -> Result<()> {
        let mut attempt = 0u32;
        loop {
            match self.handle_txn().await? {
                FlushOutcome::Applied => break,
                FlushOutcome::Retry => {
                    if !self.config.retry.allows(attempt) {
                        return Err(PlayerError::RetryExhausted { attempts: attempt });
                    }
                    let delay = self.config.retry.delay_for(attempt);
                    attempt += 1;
                    info!("retrying txn after {:?}", delay);
                    sleep(delay).await;
                }
            }
        }
        self.in_txn = false;
        self.txn_buffer.clear();
        self.txn_index = 0;
        Ok(())
    }

    /// One flush attempt over the whole buffer.
    ///
    /// The buffer holds `txn_index` complete source transactions. One
    /// downstream BEGIN is issued at the first DML that passes the
    /// filter, intermediate COMMITs are skipped, and at the last one
    /// the recovery position is written and the downstream
    /// transaction committed. A batch with no matching DMLs never
    /// opens a downstream transaction and never moves the checkpoint.
    async fn handle_txn(&mut self) -> Result<FlushOutcome> {
        let mut dml_match = 0usize;
        let mut commit_count = 0usize;
        let mut query_count: u64 = 0;
        let mut txn_start = Instant::now();

        for event in self.txn_buffer.iter() {
            match event.data.sql_type {
                SqlType::Begin => continue,
                SqlType::Commit => {
                    commit_count += 1;
                    if commit_count < self.txn_index {
                        continue;
                    }
                    if dml_match == 0 {
                        debug!("batch of {} txns had no matching dml", self.txn_index);
                        break;
                    }
                    let query_start = Instant::now();
                    self.checkpoint
                        .write_recovery_position(self.client.as_mut(), &event.position.position)
                        .await?;
                    self.stats.record_query_time(query_start);
                    self.client.commit().await.map_err(|e| PlayerError::Query {
                        sql: "commit".into(),
                        source: e,
                    })?;

                    // One extra query for the recovery update.
                    query_count += 1;
                    self.stats.add_queries(query_count);
                    self.stats.add_txns(self.txn_index as u64);
                    self.stats.record_txn_time(txn_start);
                }
                SqlType::Dml => {
                    if !self.filter.matches(&event.data.sql) {
                        continue;
                    }
                    dml_match += 1;
                    if dml_match == 1 {
                        self.client.begin().await.map_err(|e| PlayerError::Query {
                            sql: "begin".into(),
                            source: e,
                        })?;
                        txn_start = Instant::now();
                    }

                    for sql in &event.data.sql {
                        let query_start = Instant::now();
                        if let Err(err) = self.client.execute(sql, 0, false).await {
                            if err.is_deadlock() {
                                info!("deadlock detected, rolling back batch");
                                let _ = self.client.rollback().await;
                                return Ok(FlushOutcome::Retry);
                            }
                            return Err(PlayerError::Query {
                                sql: sql.clone(),
                                source: err,
                            });
                        }
                        self.stats.record_query_time(query_start);
                    }
                    query_count += event.data.sql.len() as u64;
                }
                SqlType::Ddl => {
                    return Err(PlayerError::UnexpectedSqlType(SqlType::Ddl));
                }
            }
        }
        Ok(FlushOutcome::Applied)
    }

    /// Apply a DDL event: each statement runs outside a transaction,
    /// then the recovery position moves to the DDL's position in a
    /// fresh transaction.
    async fn handle_ddl(&mut self, event: &BinlogResponse) -> Result<()> {
        for sql in &event.data.sql {
            if sql.is_empty() {
                continue;
            }
            if let Err(err) = self.client.execute(sql, 0, false).await {
                return Err(PlayerError::Query {
                    sql: sql.clone(),
                    source: err,
                });
            }
        }
        self.client.begin().await.map_err(|e| PlayerError::Query {
            sql: "begin".into(),
            source: e,
        })?;
        let query_start = Instant::now();
        self.checkpoint
            .write_recovery_position(self.client.as_mut(), &event.position.position)
            .await?;
        self.stats.record_query_time(query_start);
        self.client.commit().await.map_err(|e| PlayerError::Query {
            sql: "commit".into(),
            source: e,
        })
    }
}
