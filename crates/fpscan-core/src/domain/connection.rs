//! Subscriber connection abstraction.
//!
//! A [`Connection`] is anything that can accept a text payload for one remote
//! viewer.  The transport layer (the WebSocket server in `fpscan-relay`) owns
//! the concrete connection objects; the registry and broadcaster only hold
//! `Arc<dyn Connection>` references to them.
//!
//! # Identity
//!
//! Two registry entries refer to the same connection when their `Arc`s point
//! at the same allocation (`Arc::ptr_eq`).  [`ConnectionId`] exists purely so
//! log lines can name a connection; it plays no part in equality.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Log-friendly identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Why a payload could not be handed to a connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The remote side has gone away.
    #[error("connection closed")]
    Closed,

    /// The connection's outbound queue is full; this payload was dropped.
    #[error("outbound queue full; frame dropped")]
    QueueFull,
}

/// A sink for outbound frame payloads.
///
/// Implementations must not block: [`Connection::send`] is called from the
/// capture thread, once per connection per frame.
pub trait Connection: Send + Sync {
    /// Identifier used in log messages.
    fn id(&self) -> ConnectionId;

    /// Whether the connection is currently able to accept payloads.
    fn is_available(&self) -> bool;

    /// Hands `payload` to the connection for delivery.
    fn send(&self, payload: &str) -> Result<(), SendError>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
