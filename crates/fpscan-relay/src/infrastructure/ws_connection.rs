//! [`Connection`] implementation for one WebSocket client.
//!
//! The capture thread must never wait on a slow browser, so `send` does not
//! touch the socket.  It pushes the payload into a bounded Tokio channel whose
//! receiving end is drained by the session's writer task (see
//! [`ws_server`](super::ws_server)).  When the channel is full the frame is
//! dropped for this client only; later frames go through once the writer
//! catches up.

use std::sync::atomic::{AtomicBool, Ordering};

use fpscan_core::{Connection, ConnectionId, SendError};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Sending half of a WebSocket session, as seen by the broadcaster.
#[derive(Debug)]
pub struct WsConnection {
    id: ConnectionId,
    tx: mpsc::Sender<String>,
    open: AtomicBool,
}

impl WsConnection {
    /// Creates a connection and the receiver its writer task drains.
    ///
    /// `queue` is the number of frames that may be pending for this client;
    /// it must be non-zero (`RelayConfig::validate` enforces this).
    pub fn channel(queue: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(queue);
        let conn = Self {
            id: ConnectionId::new(),
            tx,
            open: AtomicBool::new(true),
        };
        (conn, rx)
    }

    /// Marks the session as finished.  Later sends fail with
    /// [`SendError::Closed`].
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

impl Connection for WsConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn is_available(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    fn send(&self, payload: &str) -> Result<(), SendError> {
        if !self.open.load(Ordering::Acquire) {
            return Err(SendError::Closed);
        }
        self.tx
            .try_send(payload.to_owned())
            .map_err(|e| match e {
                TrySendError::Full(_) => SendError::QueueFull,
                TrySendError::Closed(_) => SendError::Closed,
            })
    }
}
