//! Fan-out of one payload to every registered subscriber.
//!
//! [`Broadcaster::broadcast`] takes a registry snapshot and offers the payload
//! to each available connection in turn.  A failed send is logged and counted
//! but never stops the loop, so one broken subscriber cannot starve the rest.
//!
//! Broadcasts are issued only from the capture thread, one at a time, in
//! capture order.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::registry::ConnectionRegistry;
use crate::domain::SendError;

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the payload was handed to.
    pub delivered: usize,
    /// Connections skipped because they reported themselves unavailable.
    pub unavailable: usize,
    /// Connections whose send call failed.
    pub failed: usize,
}

impl BroadcastReport {
    /// Number of connections in the snapshot.
    pub fn total(&self) -> usize {
        self.delivered + self.unavailable + self.failed
    }
}

/// Delivers payloads to the connections in a [`ConnectionRegistry`].
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Sends `payload` to every available connection in the current snapshot.
    pub fn broadcast(&self, payload: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for connection in self.registry.snapshot() {
            if !connection.is_available() {
                debug!("skipping unavailable connection {}", connection.id());
                report.unavailable += 1;
                continue;
            }

            match connection.send(payload) {
                Ok(()) => report.delivered += 1,
                Err(SendError::Closed) => {
                    debug!("connection {} closed before delivery", connection.id());
                    report.failed += 1;
                }
                Err(e) => {
                    warn!("send to connection {} failed: {e}", connection.id());
                    report.failed += 1;
                }
            }
        }

        report
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Connection, ConnectionId};
    use mockall::mock;

    mock! {
        pub Conn {}

        impl Connection for Conn {
            fn id(&self) -> ConnectionId;
            fn is_available(&self) -> bool;
            fn send(&self, payload: &str) -> Result<(), SendError>;
        }
    }

    /// An available mock that expects exactly `sends` calls with `payload`.
    fn expecting(payload: &'static str, sends: usize) -> MockConn {
        let mut conn = MockConn::new();
        conn.expect_id().return_const(ConnectionId::new());
        conn.expect_is_available().return_const(true);
        conn.expect_send()
            .withf(move |p| p == payload)
            .times(sends)
            .returning(|_| Ok(()));
        conn
    }

    fn register(registry: &ConnectionRegistry, conn: MockConn) -> Arc<dyn Connection> {
        let conn: Arc<dyn Connection> = Arc::new(conn);
        registry.add(Arc::clone(&conn));
        conn
    }

    #[test]
    fn test_broadcast_sends_identical_payload_to_every_connection() {
        // Arrange
        let registry = Arc::new(ConnectionRegistry::new());
        for _ in 0..3 {
            register(&registry, expecting("data:image/png;base64,AAAA", 1));
        }
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        // Act
        let report = broadcaster.broadcast("data:image/png;base64,AAAA");

        // Assert (mock expectations are verified on drop)
        assert_eq!(report.delivered, 3);
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn test_broadcast_with_no_connections_is_a_noop() {
        let broadcaster = Broadcaster::new(Arc::new(ConnectionRegistry::new()));
        assert_eq!(broadcaster.broadcast("x"), BroadcastReport::default());
    }

    #[test]
    fn test_unavailable_connection_is_skipped() {
        // Arrange
        let registry = Arc::new(ConnectionRegistry::new());
        let mut closed = MockConn::new();
        closed.expect_id().return_const(ConnectionId::new());
        closed.expect_is_available().return_const(false);
        closed.expect_send().never();
        register(&registry, closed);
        register(&registry, expecting("frame", 1));

        // Act
        let report = Broadcaster::new(registry).broadcast("frame");

        // Assert
        assert_eq!(
            report,
            BroadcastReport {
                delivered: 1,
                unavailable: 1,
                failed: 0
            }
        );
    }

    #[test]
    fn test_failed_send_does_not_stop_delivery_to_others() {
        // Arrange: failing connection registered between two healthy ones
        let registry = Arc::new(ConnectionRegistry::new());
        register(&registry, expecting("frame", 1));
        let mut broken = MockConn::new();
        broken.expect_id().return_const(ConnectionId::new());
        broken.expect_is_available().return_const(true);
        broken
            .expect_send()
            .times(1)
            .returning(|_| Err(SendError::QueueFull));
        register(&registry, broken);
        register(&registry, expecting("frame", 1));

        // Act
        let report = Broadcaster::new(registry).broadcast("frame");

        // Assert
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn test_removed_connection_receives_nothing_afterwards() {
        let registry = Arc::new(ConnectionRegistry::new());
        let conn = register(&registry, expecting("frame", 1));
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        broadcaster.broadcast("frame");
        registry.remove(&conn);
        let report = broadcaster.broadcast("frame");

        assert_eq!(report.total(), 0);
    }

    #[test]
    fn test_connection_added_between_broadcasts_gets_only_the_later_one() {
        // Arrange
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        let mut late = MockConn::new();
        late.expect_id().return_const(ConnectionId::new());
        late.expect_is_available().return_const(true);
        late.expect_send()
            .withf(|p| p == "second")
            .times(1)
            .returning(|_| Ok(()));

        // Act
        broadcaster.broadcast("first");
        register(&registry, late);
        let report = broadcaster.broadcast("second");

        // Assert
        assert_eq!(report.delivered, 1);
    }
}
