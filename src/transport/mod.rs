//! Transport layer for client → game server command exchange.
//!
//! Provides the `CommandSender` trait and length-prefixed JSON framing.
//! `TcpCommandClient` opens one TCP connection per batch; nothing is pooled.

pub mod protocol;
pub mod tcp;

pub use protocol::{CommandResult, Response, Status};
pub use tcp::{TcpCommandClient, Timeouts};

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::command::{Argument, Command, CommandBatch};
use crate::error::{Error, Result, Stage};

/// Size of the length prefix in bytes.
pub const PREFIX_LEN: usize = 4;

/// Largest payload the signed 32-bit prefix can describe.
pub const MAX_FRAME_LEN: usize = i32::MAX as usize;

/// Inbound safety valve (64 MB). A server reply larger than this is treated
/// as a corrupt length rather than allocated.
pub const MAX_RESPONSE_SIZE: usize = 64 * 1024 * 1024;

/// Something that can deliver a batch to a server and return its reply.
///
/// `TcpCommandClient` is the real implementation; tests substitute mocks.
#[async_trait]
pub trait CommandSender: Send + Sync {
    /// Perform one request/response exchange with `host:port`.
    async fn send(&self, host: &str, port: u16, batch: &CommandBatch) -> Result<Response>;

    /// Send a single command as a one-element batch.
    async fn send_one(
        &self,
        host: &str,
        port: u16,
        name: &str,
        arguments: Vec<Argument>,
    ) -> Result<Response> {
        let batch = CommandBatch::single(Command::new(name, arguments)?);
        self.send(host, port, &batch).await
    }
}

/// Prefix value for a payload of `len` bytes.
///
/// Format: [4-byte little-endian signed length][payload bytes]
pub fn frame_len(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| Error::Encoding {
        size: len,
        max: MAX_FRAME_LEN,
    })
}

/// Serialize a batch and frame it into a single buffer ready for one write.
pub fn encode_batch(batch: &CommandBatch) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(batch)
        .map_err(|e| Error::invalid(format!("failed to serialize batch: {e}")))?;
    frame(&payload)
}

fn frame(payload: &[u8]) -> Result<Vec<u8>> {
    let len = frame_len(payload.len())?;

    let mut frame = Vec::with_capacity(PREFIX_LEN + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Decode a request payload back into a batch. Used by servers and tests.
///
/// Decoding applies the same checks as `Command::new` and `CommandBatch::new`.
pub fn decode_batch(payload: &[u8]) -> Result<CommandBatch> {
    serde_json::from_slice(payload)
        .map_err(|e| Error::Protocol(format!("invalid batch payload: {e}")))
}

/// Write a length-prefixed payload and flush.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    write_raw(writer, &frame(payload)?).await
}

/// Write an already framed buffer in one logical write.
pub(crate) async fn write_raw<W: AsyncWriteExt + Unpin>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer
        .write_all(frame)
        .await
        .map_err(|e| Error::transport(Stage::Write, e))?;
    writer
        .flush()
        .await
        .map_err(|e| Error::transport(Stage::Write, e))
}

/// Read one length-prefixed payload.
///
/// Reads exactly four prefix bytes, then exactly the declared number of
/// payload bytes. Negative lengths and lengths above `MAX_RESPONSE_SIZE`
/// are rejected before allocating.
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; PREFIX_LEN];
    reader
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| Error::transport(Stage::Read, e))?;
    let declared = i32::from_le_bytes(len_buf);

    let len = usize::try_from(declared)
        .ok()
        .filter(|len| *len <= MAX_RESPONSE_SIZE)
        .ok_or_else(|| {
            Error::transport(
                Stage::Read,
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("invalid frame length {declared} (max {MAX_RESPONSE_SIZE})"),
                ),
            )
        })?;

    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|e| Error::transport(Stage::Read, e))?;
    Ok(buf)
}
