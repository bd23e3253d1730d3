//! Dry-run client: renders the SQL it would have executed.

use crate::client::DbClient;
use crate::error::Result;
use crate::result::QueryResult;
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter, Stdout};

const SINK_BUFFER_SIZE: usize = 16 * 1024;

/// A [`DbClient`] that writes SQL text to a buffered sink instead of
/// executing it. Used by capture/replay tooling.
///
/// Every `execute` reports a synthetic one-row result so callers that
/// check row counts behave as they would against a live database.
pub struct DryRunClient<W> {
    out: BufWriter<W>,
}

impl DryRunClient<Stdout> {
    /// Dry-run client over stdout.
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> DryRunClient<W> {
    /// Dry-run client over an arbitrary sink.
    pub fn new(sink: W) -> Self {
        Self {
            out: BufWriter::with_capacity(SINK_BUFFER_SIZE, sink),
        }
    }

    /// Flush buffered SQL to the sink.
    pub async fn flush(&mut self) -> Result<()> {
        self.out.flush().await?;
        Ok(())
    }

    /// Recover the sink, discarding anything left unflushed.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> DbClient for DryRunClient<W> {
    async fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    async fn begin(&mut self) -> Result<()> {
        self.out.write_all(b"BEGIN;\n").await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.out.write_all(b"COMMIT;\n").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.out.write_all(b"ROLLBACK;\n").await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        // The buffer may still hold rendered SQL; emit it before the
        // sink goes away.
        self.flush().await
    }

    async fn execute(
        &mut self,
        query: &str,
        _maxrows: usize,
        _want_fields: bool,
    ) -> Result<QueryResult> {
        self.out.write_all(query.as_bytes()).await?;
        self.out.write_all(b";\n").await?;
        Ok(QueryResult::synthetic())
    }
}
