//! Length-framed transport for the binlog stream.
//!
//! Frames are a `u32` big-endian length prefix followed by a
//! postcard-encoded body. A `ServeBinlog` stream is one request frame
//! from the client, then response frames from the server until it
//! terminates the stream with an in-band error event or closes the
//! connection.

use crate::error::{ProtocolError, Result};
use crate::event::{BinlogResponse, BinlogServerRequest};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Upper bound on a single frame. Reads announcing more than this are
/// rejected before any allocation.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Write one length-prefixed frame.
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = postcard::to_stdvec(msg)?;
    let len = body.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            got: len,
            limit: MAX_FRAME_SIZE,
        });
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(postcard::from_bytes(&body)?)
}

/// Client half of the binlog streaming protocol.
pub struct BinlogServerClient {
    stream: TcpStream,
}

impl BinlogServerClient {
    /// Dial the upstream server.
    pub async fn dial(addr: &str) -> Result<Self> {
        info!("dialing binlog server at {}", addr);
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ProtocolError::connection(format!("failed to dial {}: {}", addr, e)))?;
        Ok(Self { stream })
    }

    /// Open the `ServeBinlog` stream. Consumes the client: a
    /// connection carries exactly one stream.
    pub async fn serve_binlog(mut self, request: &BinlogServerRequest) -> Result<BinlogEventStream> {
        debug!(
            "requesting binlog stream from {} for keyrange {}-{}",
            request.start_position,
            request.key_range.hex_start(),
            request.key_range.hex_end()
        );
        write_frame(&mut self.stream, request).await?;
        Ok(BinlogEventStream {
            stream: self.stream,
        })
    }
}

/// A live `ServeBinlog` stream.
pub struct BinlogEventStream {
    stream: TcpStream,
}

impl BinlogEventStream {
    /// Receive the next event. `Ok(None)` means the server closed the
    /// connection without a terminal event.
    pub async fn next_event(&mut self) -> Result<Option<BinlogResponse>> {
        match read_frame(&mut self.stream).await {
            Ok(event) => Ok(Some(event)),
            Err(ProtocolError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Close the stream.
    pub async fn shutdown(mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
