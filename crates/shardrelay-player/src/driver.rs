//! Stream driver: owns the upstream RPC handle and the receive loop.
//!
//! Events flow from a receive task into a channel; a second channel
//! carries the operator's interrupt. The select loop is the only
//! caller of the state machine, so the player is never touched
//! concurrently.

use crate::error::{PlayerError, Result};
use crate::player::BinlogPlayer;
use shardrelay_protocol::{BinlogServerClient, BinlogServerRequest};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

impl BinlogPlayer {
    /// Dial the upstream at the recovery address, open the
    /// `ServeBinlog` stream, and drive events through the state
    /// machine until the stream ends or `interrupted` fires.
    ///
    /// Returns `Ok(())` on a clean end of stream (the upstream's EOF
    /// event, a plain connection close, or an interrupt) and the
    /// first fatal error otherwise. The stream handle is released on
    /// every exit path; the database client stays open for the next
    /// run.
    pub async fn apply_binlog_events(
        &mut self,
        mut interrupted: watch::Receiver<bool>,
    ) -> Result<()> {
        let state = self.recovery_state().clone();
        info!(
            "binlog player {} for keyrange '{}-{}' starting at '{}'",
            state.uid,
            self.config().key_range.hex_start(),
            self.config().key_range.hex_end(),
            state.position
        );

        let client = match BinlogServerClient::dial(&state.addr).await {
            Ok(client) => client,
            Err(e) => {
                error!("error dialing binlog server at {}: {}", state.addr, e);
                return Err(PlayerError::Transport(e));
            }
        };
        let request = BinlogServerRequest {
            start_position: state.position.clone(),
            key_range: self.config().key_range.clone(),
        };
        let mut stream = client.serve_binlog(&request).await?;

        let (event_tx, mut event_rx) = mpsc::channel(1);
        let recv_task = tokio::spawn(async move {
            loop {
                match stream.next_event().await {
                    Ok(Some(event)) => {
                        if event_tx.send(Ok(event)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = event_tx.send(Err(e)).await;
                        break;
                    }
                }
            }
        });

        let result = loop {
            tokio::select! {
                received = event_rx.recv() => {
                    match received {
                        Some(Ok(event)) => {
                            if let Err(err) = self.process_event(event).await {
                                if err.is_eof() {
                                    info!("binlog stream ended: {}", err);
                                    break Ok(());
                                }
                                break Err(err);
                            }
                        }
                        Some(Err(e)) => break Err(PlayerError::Transport(e)),
                        // Server closed the stream without a terminal
                        // event.
                        None => break Ok(()),
                    }
                }
                changed = interrupted.changed() => {
                    if changed.is_err() || *interrupted.borrow() {
                        info!("binlog player {} interrupted", state.uid);
                        break Ok(());
                    }
                }
            }
        };

        recv_task.abort();
        result
    }
}
