//! Error types for the binlog wire protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised by the framed transport and the stream client.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Dial or socket-level failure.
    #[error("connection error: {0}")]
    Connection(String),

    /// I/O failure on an established stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Message body failed to encode or decode.
    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    /// A frame announced a length above the transport limit.
    #[error("frame of {got} bytes exceeds limit of {limit} bytes")]
    FrameTooLarge {
        /// Announced frame length.
        got: usize,
        /// Configured limit.
        limit: usize,
    },
}

impl ProtocolError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }
}
