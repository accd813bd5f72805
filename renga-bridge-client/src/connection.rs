//! A single request/response connection to the plugin.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use renga_bridge_core::protocol::{FrameCodec, Request, Response};
use renga_bridge_core::{BridgeError, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::{Decoder, Encoder};

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generates a new unique connection ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One TCP connection carrying exactly one request and one response.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    address: String,
    stream: TcpStream,
    codec: FrameCodec,
    read_buffer: BytesMut,
    io_timeout: Duration,
    created_at: Instant,
}

impl Connection {
    /// Opens a connection to `address`, giving up after `connect_timeout`.
    ///
    /// Every later read and write is bounded by `io_timeout`.
    pub async fn connect(
        address: &str,
        connect_timeout: Duration,
        io_timeout: Duration,
    ) -> Result<Self> {
        let stream = timeout(connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| {
                BridgeError::Timeout(format!(
                    "connect to {} timed out after {:?}",
                    address, connect_timeout
                ))
            })?
            .map_err(|e| {
                BridgeError::Connection(format!("failed to connect to {}: {}", address, e))
            })?;

        stream
            .set_nodelay(true)
            .map_err(|e| BridgeError::Connection(format!("failed to set TCP_NODELAY: {}", e)))?;

        let id = ConnectionId::new();
        tracing::debug!(id = %id, address = %address, "established connection");

        Ok(Self {
            id,
            address: address.to_string(),
            stream,
            codec: FrameCodec::new(),
            read_buffer: BytesMut::with_capacity(8192),
            io_timeout,
            created_at: Instant::now(),
        })
    }

    /// Returns the connection's unique identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns how long this connection has been open.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Writes `request` as one frame.
    pub async fn send(&mut self, request: &Request) -> Result<()> {
        let mut buf = BytesMut::new();
        self.codec.encode(request.to_bytes()?, &mut buf)?;

        let write = async {
            self.stream.write_all(&buf).await?;
            self.stream.flush().await
        };

        timeout(self.io_timeout, write)
            .await
            .map_err(|_| {
                BridgeError::Timeout(format!(
                    "write to {} timed out after {:?}",
                    self.address, self.io_timeout
                ))
            })?
            .map_err(|e| {
                BridgeError::Connection(format!("failed to write to {}: {}", self.address, e))
            })
    }

    /// Reads exactly one response frame.
    pub async fn receive(&mut self) -> Result<Response> {
        loop {
            if let Some(frame) = self.codec.decode(&mut self.read_buffer)? {
                return Response::from_slice(&frame);
            }

            let bytes_read = timeout(self.io_timeout, self.stream.read_buf(&mut self.read_buffer))
                .await
                .map_err(|_| {
                    BridgeError::Timeout(format!(
                        "read from {} timed out after {:?}",
                        self.address, self.io_timeout
                    ))
                })?
                .map_err(|e| {
                    BridgeError::Connection(format!("failed to read from {}: {}", self.address, e))
                })?;

            if bytes_read == 0 {
                let frame = self.codec.decode_eof(&mut self.read_buffer)?.ok_or_else(|| {
                    BridgeError::ConnectionClosed(format!(
                        "connection to {} closed before a response arrived",
                        self.address
                    ))
                })?;
                return Response::from_slice(&frame);
            }
        }
    }

    /// Closes this connection.
    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
        tracing::debug!(
            id = %self.id,
            address = %self.address,
            elapsed = ?self.age(),
            "connection closed"
        );
    }
}
