//! Shared fixtures: a recording mock client and event constructors.

#![allow(dead_code)]

use async_trait::async_trait;
use shardrelay_dbc::{DbClient, Error as DbcError, QueryResult, Result as DbcResult};
use shardrelay_player::RecoveryState;
use shardrelay_protocol::{
    BinlogData, BinlogResponse, EventPosition, ReplicationCoordinates, SqlType,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

struct MockState {
    log: Vec<String>,
    fail_execute: VecDeque<DbcError>,
    rows_affected: u64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            log: Vec::new(),
            fail_execute: VecDeque::new(),
            rows_affected: 1,
        }
    }
}

/// Records every client call; injected errors fail `execute` in FIFO
/// order, consuming the statement without logging it.
#[derive(Clone, Default)]
pub struct MockClient {
    state: Arc<Mutex<MockState>>,
}

impl MockClient {
    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn fail_next(&self, err: DbcError) {
        self.state.lock().unwrap().fail_execute.push_back(err);
    }

    pub fn set_rows_affected(&self, n: u64) {
        self.state.lock().unwrap().rows_affected = n;
    }

    pub fn checkpoint_updates(&self) -> usize {
        self.log()
            .iter()
            .filter(|q| q.starts_with("update _vt.blp_checkpoint set master_filename"))
            .count()
    }
}

#[async_trait]
impl DbClient for MockClient {
    async fn connect(&mut self) -> DbcResult<()> {
        Ok(())
    }
    async fn begin(&mut self) -> DbcResult<()> {
        self.state.lock().unwrap().log.push("BEGIN".into());
        Ok(())
    }
    async fn commit(&mut self) -> DbcResult<()> {
        self.state.lock().unwrap().log.push("COMMIT".into());
        Ok(())
    }
    async fn rollback(&mut self) -> DbcResult<()> {
        self.state.lock().unwrap().log.push("ROLLBACK".into());
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
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.fail_execute.pop_front() {
            return Err(err);
        }
        state.log.push(query.to_string());
        Ok(QueryResult {
            rows_affected: state.rows_affected,
            ..Default::default()
        })
    }
}

pub fn event_position(pos: u64) -> EventPosition {
    EventPosition {
        position: ReplicationCoordinates::for_file_position("binlog.000001", pos),
        timestamp: 0,
    }
}

pub fn begin(pos: u64) -> BinlogResponse {
    BinlogResponse {
        position: event_position(pos),
        data: BinlogData {
            sql_type: SqlType::Begin,
            sql: vec![],
        },
        ..Default::default()
    }
}

pub fn commit(pos: u64) -> BinlogResponse {
    BinlogResponse {
        position: event_position(pos),
        data: BinlogData {
            sql_type: SqlType::Commit,
            sql: vec![],
        },
        ..Default::default()
    }
}

pub fn dml(sql: &str, pos: u64) -> BinlogResponse {
    BinlogResponse {
        position: event_position(pos),
        data: BinlogData {
            sql_type: SqlType::Dml,
            sql: vec![sql.to_string()],
        },
        ..Default::default()
    }
}

pub fn eof(group_id: &str) -> BinlogResponse {
    BinlogResponse {
        error: "stream done: EOF".into(),
        position: EventPosition {
            position: ReplicationCoordinates::for_group_id(group_id),
            timestamp: 0,
        },
        ..Default::default()
    }
}

pub fn start_state(uid: u32, addr: &str) -> RecoveryState {
    RecoveryState {
        uid,
        addr: addr.into(),
        position: ReplicationCoordinates::for_file_position("binlog.000001", 4),
    }
}
