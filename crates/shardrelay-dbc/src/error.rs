//! Error types for the downstream database client.
//!
//! Classification drives the recovery behavior in the player: a
//! deadlock turns into a flush retry, a connection-class error
//! discards the underlying connection so the next call reconnects.

use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MySQL "deadlock found when trying to get lock".
pub const ER_LOCK_DEADLOCK: u16 = 1213;
/// MySQL "query execution was interrupted".
pub const ER_QUERY_INTERRUPTED: u16 = 1317;
/// First code of the client-side connection error band.
pub const CR_ERROR_FIRST: u16 = 2000;
/// Last code of the client-side connection error band.
pub const CR_ERROR_LAST: u16 = 2018;

/// Error categories for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Server rejected or failed a statement.
    Server,
    /// The connection itself failed.
    Connection,
    /// A result set exceeded the caller's row limit.
    RowLimit,
    /// Invalid connection parameters.
    Configuration,
    /// Sink I/O failure (dry-run client).
    Io,
}

/// Main error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Error reported by the server, with the vendor error code.
    #[error("server error {code}: {message}")]
    Server {
        /// Vendor error code.
        code: u16,
        /// Server-provided message.
        message: String,
    },

    /// Connection-level failure (dial, handshake, broken socket).
    #[error("connection error: {message}")]
    Connection {
        /// Description of the failure.
        message: String,
    },

    /// A statement returned more rows than the caller allowed.
    #[error("result of {got} rows exceeds limit of {max}")]
    RowLimit {
        /// Rows the statement produced.
        got: usize,
        /// Caller-imposed limit.
        max: usize,
    },

    /// Invalid connection parameters.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// I/O failure on the output sink.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a server error.
    pub fn server(code: u16, message: impl Into<String>) -> Self {
        Self::Server {
            code,
            message: message.into(),
        }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Server { .. } => ErrorCategory::Server,
            Self::Connection { .. } => ErrorCategory::Connection,
            Self::RowLimit { .. } => ErrorCategory::RowLimit,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Io(_) => ErrorCategory::Io,
        }
    }

    /// Deadlock reported by the server.
    ///
    /// The player rolls the batch back and retries the whole flush.
    pub fn is_deadlock(&self) -> bool {
        matches!(
            self,
            Self::Server {
                code: ER_LOCK_DEADLOCK,
                ..
            }
        )
    }

    /// Whether the underlying connection must be discarded after this
    /// error: the 2000–2018 client band, a "query interrupted"
    /// response, or a failure of the connection itself.
    pub fn requires_reconnect(&self) -> bool {
        match self {
            Self::Server { code, .. } => {
                (CR_ERROR_FIRST..=CR_ERROR_LAST).contains(code) || *code == ER_QUERY_INTERRUPTED
            }
            Self::Connection { .. } | Self::Io(_) => true,
            Self::RowLimit { .. } | Self::Configuration { .. } => false,
        }
    }
}
