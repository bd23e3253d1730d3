//! Checkpoint persistence in the destination database.
//!
//! The player's position lives in `_vt.blp_checkpoint` on the
//! downstream itself: the recovery UPDATE rides in the same
//! transaction as the applied writes, so a restart resumes exactly at
//! the last committed boundary. One row per consumer uid.

use crate::error::{PlayerError, Result};
use shardrelay_dbc::DbClient;
use shardrelay_protocol::ReplicationCoordinates;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Checkpoint updates slower than this are logged.
pub const SLOW_QUERY_THRESHOLD: Duration = Duration::from_millis(100);

/// Persisted identity and position of one consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryState {
    /// Consumer id.
    pub uid: u32,
    /// Upstream endpoint to dial.
    pub addr: String,
    /// Position to resume from.
    pub position: ReplicationCoordinates,
}

impl RecoveryState {
    /// Validity required before a stream may be opened.
    pub fn validate(&self) -> Result<()> {
        if self.addr.is_empty() {
            return Err(PlayerError::Config(
                "invalid connection params, empty addr".into(),
            ));
        }
        if !self.position.is_valid() {
            return Err(PlayerError::Config(
                "invalid start coordinates, need group_id or master_filename+master_position"
                    .into(),
            ));
        }
        Ok(())
    }
}

/// Reads and writes the checkpoint row for one consumer uid.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    uid: u32,
}

impl CheckpointStore {
    /// Store for the given consumer uid.
    pub fn new(uid: u32) -> Self {
        Self { uid }
    }

    /// Load the consumer's start position. Fails when the checkpoint
    /// row is absent.
    ///
    /// Fields are matched by name case-insensitively; NULL values
    /// leave the corresponding field zero.
    pub async fn read_start_position(&self, client: &mut dyn DbClient) -> Result<RecoveryState> {
        let query = format!(
            "select * from _vt.blp_checkpoint where source_shard_uid={}",
            self.uid
        );
        let qr = client
            .execute(&query, 1, true)
            .await
            .map_err(|e| PlayerError::Query {
                sql: query.clone(),
                source: e,
            })?;
        if qr.rows.len() != 1 {
            return Err(PlayerError::CheckpointMissing { uid: self.uid });
        }

        let mut state = RecoveryState {
            uid: self.uid,
            ..Default::default()
        };
        let row = &qr.rows[0];
        for (i, field) in qr.fields.iter().enumerate() {
            let value = match row.get(i) {
                Some(Some(v)) => v,
                _ => continue,
            };
            match field.to_lowercase().as_str() {
                "addr" => state.addr = value.clone(),
                "master_filename" => state.position.master_filename = value.clone(),
                "master_position" => {
                    state.position.master_position = parse_u64_base0(value).ok_or_else(|| {
                        PlayerError::CheckpointField {
                            field: field.clone(),
                        }
                    })?;
                }
                "group_id" => state.position.group_id = value.clone(),
                _ => continue,
            }
        }
        Ok(state)
    }

    /// Write the recovery position inside the caller's open
    /// transaction. Must affect exactly one row.
    pub async fn write_recovery_position(
        &self,
        client: &mut dyn DbClient,
        position: &ReplicationCoordinates,
    ) -> Result<()> {
        let query = format!(
            "update _vt.blp_checkpoint set master_filename='{}', master_position={}, group_id='{}', txn_timestamp=unix_timestamp(), time_updated={} where source_shard_uid={}",
            position.master_filename,
            position.master_position,
            position.group_id,
            unix_now(),
            self.uid
        );
        self.run_update(client, &query).await
    }

    /// Persist the group id the stream ended at, in its own short
    /// transaction.
    pub async fn save_last_eof_group_id(
        &self,
        client: &mut dyn DbClient,
        group_id: &str,
    ) -> Result<()> {
        client.begin().await.map_err(|e| PlayerError::Query {
            sql: "begin".into(),
            source: e,
        })?;
        let query = format!(
            "update _vt.blp_checkpoint set last_eof_group_id='{}' where source_shard_uid={}",
            group_id, self.uid
        );
        self.run_update(client, &query).await?;
        client.commit().await.map_err(|e| PlayerError::Query {
            sql: "commit".into(),
            source: e,
        })?;
        Ok(())
    }

    async fn run_update(&self, client: &mut dyn DbClient, query: &str) -> Result<()> {
        let start = Instant::now();
        let qr = client
            .execute(query, 0, false)
            .await
            .map_err(|e| PlayerError::Query {
                sql: query.to_string(),
                source: e,
            })?;
        if qr.rows_affected != 1 {
            return Err(PlayerError::CheckpointRows {
                rows_affected: qr.rows_affected,
            });
        }
        if start.elapsed() > SLOW_QUERY_THRESHOLD {
            warn!("slow query '{}'", query);
        }
        Ok(())
    }
}

/// Parse an unsigned integer the way a base-0 parse does: `0x` hex,
/// leading-zero octal, decimal otherwise.
fn parse_u64_base0(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else if s.len() > 1 && s.starts_with('0') {
        u64::from_str_radix(&s[1..], 8).ok()
    } else {
        s.parse().ok()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shardrelay_dbc::{QueryResult, Result as DbcResult};
    use std::sync::{Arc, Mutex};

    /// Records every statement and replays canned results.
    #[derive(Default)]
    struct RecordingClient {
        log: Arc<Mutex<Vec<String>>>,
        select_result: Option<QueryResult>,
        update_rows_affected: u64,
    }

    impl RecordingClient {
        fn new() -> Self {
            Self {
                update_rows_affected: 1,
                ..Default::default()
            }
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DbClient for RecordingClient {
        async fn connect(&mut self) -> DbcResult<()> {
            Ok(())
        }
        async fn begin(&mut self) -> DbcResult<()> {
            self.log.lock().unwrap().push("BEGIN".into());
            Ok(())
        }
        async fn commit(&mut self) -> DbcResult<()> {
            self.log.lock().unwrap().push("COMMIT".into());
            Ok(())
        }
        async fn rollback(&mut self) -> DbcResult<()> {
            self.log.lock().unwrap().push("ROLLBACK".into());
            Ok(())
        }
        async fn close(&mut self) -> DbcResult<()> {
            Ok(())
        }
        async fn execute(
            &mut self,
            query: &str,
            _maxrows: usize,
            _want_fields: bool,
        ) -> DbcResult<QueryResult> {
            self.log.lock().unwrap().push(query.to_string());
            if query.starts_with("select") {
                return Ok(self.select_result.clone().unwrap_or_default());
            }
            Ok(QueryResult {
                rows_affected: self.update_rows_affected,
                ..Default::default()
            })
        }
    }

    fn checkpoint_row(fields: &[&str], values: &[Option<&str>]) -> QueryResult {
        QueryResult {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            rows_affected: 1,
            insert_id: 0,
            rows: vec![values.iter().map(|v| v.map(|s| s.to_string())).collect()],
        }
    }

    #[tokio::test]
    async fn test_read_start_position() {
        let mut client = RecordingClient::new();
        client.select_result = Some(checkpoint_row(
            &["source_shard_uid", "addr", "master_filename", "master_position", "group_id"],
            &[
                Some("12"),
                Some("10.0.0.7:6614"),
                Some("binlog.000005"),
                Some("4207"),
                Some("g19"),
            ],
        ));

        let store = CheckpointStore::new(12);
        let state = store.read_start_position(&mut client).await.unwrap();

        assert_eq!(state.uid, 12);
        assert_eq!(state.addr, "10.0.0.7:6614");
        assert_eq!(state.position.master_filename, "binlog.000005");
        assert_eq!(state.position.master_position, 4207);
        assert_eq!(state.position.group_id, "g19");
        assert_eq!(
            client.log(),
            vec!["select * from _vt.blp_checkpoint where source_shard_uid=12"]
        );
    }

    #[tokio::test]
    async fn test_read_start_position_case_insensitive_and_nulls() {
        let mut client = RecordingClient::new();
        client.select_result = Some(checkpoint_row(
            &["Addr", "MASTER_FILENAME", "master_position", "group_id"],
            &[Some("host:1"), Some("binlog.000001"), None, None],
        ));

        let store = CheckpointStore::new(3);
        let state = store.read_start_position(&mut client).await.unwrap();

        assert_eq!(state.addr, "host:1");
        assert_eq!(state.position.master_filename, "binlog.000001");
        // NULLs leave the fields zero.
        assert_eq!(state.position.master_position, 0);
        assert_eq!(state.position.group_id, "");
    }

    #[tokio::test]
    async fn test_read_start_position_missing_row() {
        let mut client = RecordingClient::new();
        client.select_result = Some(QueryResult::default());

        let store = CheckpointStore::new(9);
        let err = store.read_start_position(&mut client).await.unwrap_err();
        assert!(matches!(err, PlayerError::CheckpointMissing { uid: 9 }));
    }

    #[tokio::test]
    async fn test_read_start_position_malformed_position() {
        let mut client = RecordingClient::new();
        client.select_result = Some(checkpoint_row(
            &["master_position"],
            &[Some("not-a-number")],
        ));

        let store = CheckpointStore::new(1);
        let err = store.read_start_position(&mut client).await.unwrap_err();
        assert!(matches!(err, PlayerError::CheckpointField { .. }));
    }

    #[tokio::test]
    async fn test_write_recovery_position_sql() {
        let mut client = RecordingClient::new();
        let store = CheckpointStore::new(12);
        let position = ReplicationCoordinates {
            master_filename: "binlog.000006".into(),
            master_position: 99,
            group_id: "g20".into(),
        };

        store
            .write_recovery_position(&mut client, &position)
            .await
            .unwrap();

        let log = client.log();
        assert_eq!(log.len(), 1);
        assert!(log[0].starts_with(
            "update _vt.blp_checkpoint set master_filename='binlog.000006', \
             master_position=99, group_id='g20', txn_timestamp=unix_timestamp(), time_updated="
        ));
        assert!(log[0].ends_with("where source_shard_uid=12"));
    }

    #[tokio::test]
    async fn test_write_recovery_position_row_invariant() {
        let mut client = RecordingClient::new();
        client.update_rows_affected = 0;

        let store = CheckpointStore::new(12);
        let err = store
            .write_recovery_position(&mut client, &ReplicationCoordinates::for_group_id("g"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PlayerError::CheckpointRows { rows_affected: 0 }
        ));
    }

    #[tokio::test]
    async fn test_save_last_eof_group_id() {
        let mut client = RecordingClient::new();
        let store = CheckpointStore::new(5);

        store
            .save_last_eof_group_id(&mut client, "g77")
            .await
            .unwrap();

        assert_eq!(
            client.log(),
            vec![
                "BEGIN".to_string(),
                "update _vt.blp_checkpoint set last_eof_group_id='g77' where source_shard_uid=5"
                    .to_string(),
                "COMMIT".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_u64_base0() {
        assert_eq!(parse_u64_base0("1234"), Some(1234));
        assert_eq!(parse_u64_base0("0x10"), Some(16));
        assert_eq!(parse_u64_base0("010"), Some(8));
        assert_eq!(parse_u64_base0("0"), Some(0));
        assert_eq!(parse_u64_base0("x"), None);
    }

    #[test]
    fn test_recovery_state_validation() {
        let mut state = RecoveryState {
            uid: 1,
            addr: String::new(),
            position: ReplicationCoordinates::for_group_id("g"),
        };
        assert!(state.validate().is_err());

        state.addr = "host:1".into();
        assert!(state.validate().is_ok());

        state.position = ReplicationCoordinates::for_file_position("binlog.000001", 0);
        assert!(state.validate().is_err());

        state.position.master_position = 4;
        assert!(state.validate().is_ok());
    }
}
