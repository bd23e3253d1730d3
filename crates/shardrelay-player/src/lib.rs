//! # shardrelay-player
//!
//! Streaming replication consumer: subscribes to an upstream binlog
//! server, filters its event stream by key range and table set, and
//! applies the resulting logical changes to a downstream MySQL
//! database in batched, checkpointed transactions.
//!
//! ## Architecture
//!
//! ```text
//! upstream stream ──► event state machine ──► (table filter)
//!                                                  │
//!                              transaction batcher ◄┘
//!                                   │
//!                     downstream client + checkpoint store
//! ```
//!
//! Whole source transactions are buffered and collapsed into a single
//! downstream transaction, bounded by a count threshold and a time
//! threshold. The recovery position is updated inside that
//! transaction, so the checkpoint advances atomically with the data:
//! a crash loses at most one uncommitted batch and a restart resumes
//! without duplication across the committed boundary.
//!
//! ## Quick start
//!
//! ```ignore
//! use shardrelay_dbc::{ConnectionParams, DbClient, LiveDbClient};
//! use shardrelay_player::{BinlogPlayer, CheckpointStore, PlayerConfig};
//! use tokio::sync::watch;
//!
//! let mut client = LiveDbClient::new(ConnectionParams::new(url));
//! client.connect().await?;
//!
//! let start = CheckpointStore::new(uid).read_start_position(&mut client).await?;
//! let config = PlayerConfig::new(uid, key_range).with_tables(tables);
//! let mut player = BinlogPlayer::new(Box::new(client), config, start)?;
//!
//! let (_stop, interrupted) = watch::channel(false);
//! player.apply_binlog_events(interrupted).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod checkpoint;
pub mod config;
pub mod driver;
pub mod error;
pub mod filter;
pub mod player;
pub mod retry;
pub mod stats;

pub use checkpoint::{CheckpointStore, RecoveryState, SLOW_QUERY_THRESHOLD};
pub use config::PlayerConfig;
pub use error::{PlayerError, Result};
pub use filter::{TableFilter, STREAM_COMMENT_START};
pub use player::BinlogPlayer;
pub use retry::RetryPolicy;
pub use stats::{spawn_rate_sampler, PlayerStats, StatsSnapshot};
