//! Binlog event model served over the `ServeBinlog` stream.
//!
//! Events arrive pre-decoded: the upstream parses raw log frames and
//! serves logical statements grouped by statement class. The player
//! never sees raw binlog bytes.

use crate::coordinates::{KeyRange, ReplicationCoordinates};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Statement class of a binlog event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    /// Opens a source transaction.
    #[default]
    Begin,
    /// Terminates a source transaction.
    Commit,
    /// Row-changing statement inside a transaction.
    Dml,
    /// Schema-changing statement, delivered outside transactions.
    Ddl,
}

impl SqlType {
    /// Uppercase wire name of this statement class.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Dml => "DML",
            Self::Ddl => "DDL",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statement payload of an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BinlogData {
    /// Statement class shared by all statements in `sql`.
    pub sql_type: SqlType,
    /// Statement text, one entry per statement.
    pub sql: Vec<String>,
}

/// Where an event sits in the upstream log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPosition {
    /// Coordinates of the underlying log entry.
    pub position: ReplicationCoordinates,
    /// Server timestamp of the log entry, seconds since the epoch.
    pub timestamp: i64,
}

/// One event from the upstream server.
///
/// When `error` is empty the event is well-formed and `data` carries
/// the payload. When non-empty the stream is terminating: an "EOF"
/// substring marks a normal drain, anything else a fatal upstream
/// error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BinlogResponse {
    /// Terminal condition, empty on well-formed events.
    pub error: String,
    /// Position of the event in the upstream log.
    pub position: EventPosition,
    /// Statement payload.
    pub data: BinlogData,
}

impl BinlogResponse {
    /// Whether this event signals stream termination.
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }

    /// Whether this event is the upstream's normal end-of-stream
    /// marker.
    pub fn is_eof(&self) -> bool {
        self.error.contains("EOF")
    }

    /// Encode for the wire.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(postcard::to_stdvec(self)?)
    }

    /// Decode from the wire.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(postcard::from_bytes(data)?)
    }
}

/// Opening request of a `ServeBinlog` stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BinlogServerRequest {
    /// Position to resume from.
    pub start_position: ReplicationCoordinates,
    /// Keyspace interval the server filters rows by.
    pub key_range: KeyRange,
}

impl BinlogServerRequest {
    /// Encode for the wire.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(postcard::to_stdvec(self)?)
    }

    /// Decode from the wire.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(postcard::from_bytes(data)?)
    }
}
