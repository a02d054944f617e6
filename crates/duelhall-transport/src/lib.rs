//! Transport layer for Duelhall.
//!
//! A [`Transport`] accepts connections and hands each one back already
//! split into a [`FrameSink`] (outbound) and a [`FrameSource`] (inbound).
//! The split matters: a participant's connection task reads client
//! frames while a separate writer task pushes lobby notifications, and
//! neither may wait on the other.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketSink, WebSocketSource, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;

/// Opaque identifier for a connection, unique for the process lifetime.
///
/// The lobby derives its participant ids from these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A freshly accepted connection, split into its two directions.
pub struct Connection<S, R> {
    pub id: ConnectionId,
    pub peer: SocketAddr,
    pub sink: S,
    pub source: R,
}

/// Accepts new incoming connections.
pub trait Transport: Send + 'static {
    /// Outbound half of an accepted connection.
    type Sink: FrameSink;
    /// Inbound half of an accepted connection.
    type Source: FrameSource;

    /// Waits for the next connection and completes its handshake.
    async fn accept(
        &mut self,
    ) -> Result<Connection<Self::Sink, Self::Source>, TransportError>;

    /// The address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// Writes frames to one peer.
pub trait FrameSink: Send + 'static {
    /// Sends one frame.
    async fn send(&mut self, data: Vec<u8>) -> Result<(), TransportError>;

    /// Starts a clean close of the connection.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Reads frames from one peer.
pub trait FrameSource: Send + 'static {
    /// Receives the next data frame.
    ///
    /// Returns `Ok(None)` once the peer has closed the connection.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}
