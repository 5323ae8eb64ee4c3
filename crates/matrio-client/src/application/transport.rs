//! The byte-level seam between the session and the network.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors a [`Transport`] can report.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed the connection.
    #[error("connection closed by device")]
    Closed,

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A bidirectional byte channel to the amplifier.
///
/// Implementations do no framing.  `recv` hands back whatever bytes arrived
/// in one read; reassembling frames is the session's job.
#[async_trait]
pub trait Transport: Send {
    /// Writes one complete frame.
    async fn send(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Waits up to `wait` for the next chunk of bytes.
    ///
    /// Returns `Ok(None)` when nothing arrived in time and
    /// [`TransportError::Closed`] when the peer hung up.
    async fn recv(&mut self, wait: Duration) -> Result<Option<Vec<u8>>, TransportError>;
}
