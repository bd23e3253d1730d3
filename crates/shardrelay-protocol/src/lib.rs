//! # shardrelay-protocol
//!
//! Wire model and streaming client for the shardrelay binlog
//! protocol.
//!
//! An upstream binlog server serves pre-decoded logical events over a
//! length-framed TCP stream. The client sends one
//! [`BinlogServerRequest`] naming a start position and a key range,
//! then receives [`BinlogResponse`] frames until the server ends the
//! stream with an in-band error event (an "EOF" substring marks a
//! normal drain) or closes the connection.
//!
//! ## Usage
//!
//! ```ignore
//! use shardrelay_protocol::{BinlogServerClient, BinlogServerRequest};
//!
//! let client = BinlogServerClient::dial("10.0.0.7:6614").await?;
//! let mut stream = client.serve_binlog(&request).await?;
//! while let Some(event) = stream.next_event().await? {
//!     // feed the player
//! }
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod coordinates;
pub mod error;
pub mod event;
pub mod wire;

pub use coordinates::{KeyRange, ReplicationCoordinates};
pub use error::{ProtocolError, Result};
pub use event::{BinlogData, BinlogResponse, BinlogServerRequest, EventPosition, SqlType};
pub use wire::{read_frame, write_frame, BinlogEventStream, BinlogServerClient, MAX_FRAME_SIZE};
