//! Error types for the replication player.

use shardrelay_protocol::{ReplicationCoordinates, SqlType};
use thiserror::Error;

/// Result type for player operations.
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Errors raised by the player, the checkpoint store, and the stream
/// driver.
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Construction-time validation failure.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Upstream transport failure (dial, framing, socket).
    #[error("binlog stream transport error: {0}")]
    Transport(#[from] shardrelay_protocol::ProtocolError),

    /// Terminal error delivered in-band by the upstream, with the
    /// position it was observed at.
    #[error("error encountered at position {position}, err: '{message}'")]
    StreamAt {
        /// Position the upstream reported.
        position: ReplicationCoordinates,
        /// Upstream message.
        message: String,
    },

    /// Terminal error delivered in-band by the upstream.
    #[error("error encountered from server: {message}")]
    Stream {
        /// Upstream message.
        message: String,
    },

    /// BEGIN while a transaction is already open.
    #[error("invalid txn: txn already in progress, buffered events {buffered}")]
    TxnAlreadyInProgress {
        /// Events buffered when the BEGIN arrived.
        buffered: usize,
    },

    /// COMMIT with no open transaction.
    #[error("invalid event: COMMIT event without a transaction")]
    CommitWithoutTxn,

    /// DML with no open transaction.
    #[error("invalid event: DML outside txn context")]
    DmlOutsideTxn,

    /// A statement class that cannot legally appear in the
    /// transaction buffer.
    #[error("invalid SqlType {0} in transaction buffer")]
    UnexpectedSqlType(SqlType),

    /// A checkpoint UPDATE touched an unexpected number of rows.
    #[error("cannot update checkpoint table, affected {rows_affected} rows")]
    CheckpointRows {
        /// Rows the UPDATE affected.
        rows_affected: u64,
    },

    /// The checkpoint row for this consumer does not exist.
    #[error("checkpoint information not available in db for {uid}")]
    CheckpointMissing {
        /// Consumer uid looked up.
        uid: u32,
    },

    /// A checkpoint field failed to parse.
    #[error("couldn't obtain correct value for '{field}'")]
    CheckpointField {
        /// Offending column name.
        field: String,
    },

    /// A downstream statement failed.
    #[error("error {source} in executing sql {sql}")]
    Query {
        /// Statement that failed.
        sql: String,
        /// Underlying client error.
        #[source]
        source: shardrelay_dbc::Error,
    },

    /// The deadlock retry budget ran out.
    #[error("giving up flush after {attempts} deadlock retries")]
    RetryExhausted {
        /// Retries attempted.
        attempts: u32,
    },
}

impl PlayerError {
    /// True when the upstream signalled end-of-stream. The driver
    /// treats this as clean shutdown rather than a failure.
    pub fn is_eof(&self) -> bool {
        match self {
            Self::StreamAt { message, .. } | Self::Stream { message } => message.contains("EOF"),
            _ => false,
        }
    }
}
