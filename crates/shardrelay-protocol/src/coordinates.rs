//! Replication coordinates and the keyspace interval filter.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;

/// A position in the upstream binary log.
///
/// A position is addressed either by a group id or by a log filename
/// plus a byte offset into it; [`ReplicationCoordinates::is_valid`]
/// encodes that rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationCoordinates {
    /// Name of the upstream log file.
    pub master_filename: String,
    /// Byte offset into `master_filename`.
    pub master_position: u64,
    /// Group id, when the upstream uses group-based addressing.
    pub group_id: String,
}

impl ReplicationCoordinates {
    /// Coordinates addressed by filename and offset.
    pub fn for_file_position(filename: impl Into<String>, position: u64) -> Self {
        Self {
            master_filename: filename.into(),
            master_position: position,
            group_id: String::new(),
        }
    }

    /// Coordinates addressed by group id.
    pub fn for_group_id(group_id: impl Into<String>) -> Self {
        Self {
            master_filename: String::new(),
            master_position: 0,
            group_id: group_id.into(),
        }
    }

    /// Whether these coordinates address a position: a non-empty
    /// group id, or both a filename and a non-zero offset.
    pub fn is_valid(&self) -> bool {
        !self.group_id.is_empty()
            || (!self.master_filename.is_empty() && self.master_position != 0)
    }
}

impl fmt::Display for ReplicationCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.master_filename, self.master_position)?;
        if !self.group_id.is_empty() {
            write!(f, " (group {})", self.group_id)?;
        }
        Ok(())
    }
}

/// A half-open `[start, end)` interval over the binary keyspace.
///
/// The player forwards it to the upstream unchanged; row-level
/// enforcement happens there. An empty bound is unbounded on that
/// side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    /// Inclusive lower bound.
    pub start: Bytes,
    /// Exclusive upper bound.
    pub end: Bytes,
}

impl KeyRange {
    /// Create a key range from its bounds.
    pub fn new(start: impl Into<Bytes>, end: impl Into<Bytes>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Lower bound rendered as lowercase hex.
    pub fn hex_start(&self) -> String {
        to_hex(&self.start)
    }

    /// Upper bound rendered as lowercase hex.
    pub fn hex_end(&self) -> String {
        to_hex(&self.end)
    }
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}
