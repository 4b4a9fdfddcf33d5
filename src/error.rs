//! Errors returned by the command model and the transport client.

use std::io;

use thiserror::Error;

/// Result alias for command and transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building or sending a batch.
///
/// The variants map to distinct caller decisions: fix the input, shrink the
/// batch, retry the connection, re-check server state, or investigate a
/// contract mismatch. Nothing here is retried automatically.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed command or batch at construction time.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Payload cannot be described by the signed 32-bit length prefix.
    #[error("payload of {size} bytes exceeds the frame length limit of {max} bytes")]
    Encoding {
        /// Serialized payload size.
        size: usize,
        /// Largest representable payload.
        max: usize,
    },

    /// The socket could not be established. Nothing reached the server.
    #[error("failed to connect to {addr}: {source}")]
    Connection {
        /// Target as `host:port`.
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Write or read failed mid-exchange. The server may or may not have
    /// applied the batch.
    #[error("transport failure during {stage}: {source}")]
    Transport {
        /// Which step of the exchange failed.
        stage: Stage,
        #[source]
        source: io::Error,
    },

    /// The response frame arrived but did not decode into the expected shape.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Step of the exchange a [`Error::Transport`] happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Write,
    Read,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Write => f.write_str("write"),
            Self::Read => f.write_str("read"),
        }
    }
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidCommand(msg.into())
    }

    pub(crate) fn transport(stage: Stage, source: io::Error) -> Self {
        Self::Transport { stage, source }
    }

    pub(crate) fn timed_out(stage: Stage, after: std::time::Duration) -> Self {
        Self::transport(
            stage,
            io::Error::new(io::ErrorKind::TimedOut, format!("timed out after {after:?}")),
        )
    }

    /// Whether a retry after backoff is safe without re-checking server state.
    ///
    /// Only connection failures qualify: the batch never left this process.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Whether the server may have received and applied the batch anyway.
    pub const fn outcome_unknown(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
