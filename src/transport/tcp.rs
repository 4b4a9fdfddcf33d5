//! TCP transport: one connection per batch.
//!
//! Each `send()` connects, writes the framed batch, reads the framed reply
//! and drops the socket, whatever the outcome. Every step runs under its own
//! timeout so a stalled server always surfaces as an error.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use super::protocol::Response;
use super::{encode_batch, read_frame, write_raw, CommandSender};
use crate::command::CommandBatch;
use crate::error::{Error, Result, Stage};

/// Default timeout for TCP connection establishment.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for writing the request frame.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for reading the response frame.
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-step deadlines for one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub write: Duration,
    pub read: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: CONNECT_TIMEOUT,
            write: WRITE_TIMEOUT,
            read: READ_TIMEOUT,
        }
    }
}

/// Client that sends command batches over short-lived TCP connections.
///
/// Holds no connection state, so a single instance can be shared freely
/// between tasks; concurrent sends each own their socket.
#[derive(Debug, Clone, Default)]
pub struct TcpCommandClient {
    timeouts: Timeouts,
}

impl TcpCommandClient {
    /// Create a client with the given timeouts.
    #[must_use]
    pub const fn new(timeouts: Timeouts) -> Self {
        Self { timeouts }
    }

    pub const fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    async fn connect(&self, host: &str, port: u16) -> Result<TcpStream> {
        let addr = format!("{host}:{port}");
        let connected = timeout(self.timeouts.connect, TcpStream::connect((host, port)))
            .await
            .unwrap_or_else(|_| {
                Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect timed out after {:?}", self.timeouts.connect),
                ))
            });

        let stream = connected.map_err(|source| Error::Connection { addr, source })?;
        // Small request/response frames; don't wait on Nagle.
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "Failed to set TCP_NODELAY");
        }
        Ok(stream)
    }

    async fn exchange(&self, stream: &mut TcpStream, frame: &[u8], expected: usize) -> Result<Response> {
        timeout(self.timeouts.write, write_raw(stream, frame))
            .await
            .map_err(|_| Error::timed_out(Stage::Write, self.timeouts.write))??;

        let payload = timeout(self.timeouts.read, read_frame(stream))
            .await
            .map_err(|_| Error::timed_out(Stage::Read, self.timeouts.read))??;

        Response::decode(&payload, expected)
    }
}

#[async_trait]
impl CommandSender for TcpCommandClient {
    #[instrument(skip(self, batch), fields(commands = ?batch.names()))]
    async fn send(&self, host: &str, port: u16, batch: &CommandBatch) -> Result<Response> {
        // Encode before connecting: an unframeable batch never touches the network.
        let frame = encode_batch(batch)?;

        let mut stream = self.connect(host, port).await?;
        debug!(bytes = frame.len(), "Connected, sending batch");

        let result = self.exchange(&mut stream, &frame, batch.len()).await;
        drop(stream);

        match &result {
            Ok(resp) if resp.is_success() => debug!("Batch succeeded"),
            Ok(resp) => debug!(error = resp.first_error(), "Server reported a failed command"),
            Err(e) => warn!(error = %e, "Batch exchange failed"),
        }
        result
    }
}
