//! TCP control channel to the amplifier.
//!
//! [`DeviceConnection`] is a thin [`Transport`] over any async byte stream.
//! Production code uses `TcpStream`; tests substitute a scripted
//! `tokio_test::io::Mock` or an in-memory duplex pipe.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, info, trace, warn};

use crate::application::transport::{Transport, TransportError};

/// Bytes requested per read.  Every frame the device sends fits in one.
const READ_CHUNK: usize = 1024;

/// Errors opening the control channel.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to connect to amplifier at {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {timeout:?} connecting to amplifier at {addr}")]
    Timeout { addr: SocketAddr, timeout: Duration },
}

/// The binary control channel.
pub struct DeviceConnection<S = TcpStream> {
    stream: S,
    peer: Option<SocketAddr>,
}

impl DeviceConnection<TcpStream> {
    /// Opens a TCP connection to `addr`, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// [`ConnectionError::ConnectFailed`] if the connection is refused or
    /// unreachable, [`ConnectionError::Timeout`] if it does not complete in time.
    pub async fn connect(addr: SocketAddr, timeout: Duration) -> Result<Self, ConnectionError> {
        let stream = match time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ConnectionError::ConnectFailed { addr, source }),
            Err(_) => return Err(ConnectionError::Timeout { addr, timeout }),
        };

        // Frames are tiny and latency matters more than throughput.
        if let Err(e) = stream.set_nodelay(true) {
            warn!(error = %e, "could not disable Nagle's algorithm");
        }

        info!(%addr, "connected to amplifier");
        Ok(Self {
            stream,
            peer: Some(addr),
        })
    }
}

impl<S> DeviceConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps an already-connected stream.
    pub fn from_stream(stream: S) -> Self {
        Self { stream, peer: None }
    }

    /// The remote address, when connected through [`DeviceConnection::connect`].
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

#[async_trait]
impl<S> Transport for DeviceConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(frame).await?;
        self.stream.flush().await?;
        trace!(len = frame.len(), "frame written");
        Ok(())
    }

    async fn recv(&mut self, wait: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        let mut buf = vec![0u8; READ_CHUNK];
        match time::timeout(wait, self.stream.read(&mut buf)).await {
            Err(_) => Ok(None),
            Ok(Ok(0)) => {
                info!("amplifier closed the connection");
                Err(TransportError::Closed)
            }
            Ok(Ok(n)) => {
                buf.truncate(n);
                debug!(len = n, "bytes received");
                Ok(Some(buf))
            }
            Ok(Err(e)) => Err(e.into()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
