//! The set of subscribers currently connected.
//!
//! [`ConnectionRegistry`] is shared (behind an `Arc`) between the WebSocket
//! sessions, which add and remove themselves, and the capture thread, which
//! takes a snapshot once per frame.  A single `Mutex` guards the underlying
//! list, so every add, remove and snapshot is serialised against every other.
//!
//! # Why a snapshot instead of iterating under the lock?
//!
//! Sending to a subscriber happens after the lock is released.  That keeps the
//! critical section to a `Vec` clone of `Arc`s, so a session connecting or
//! disconnecting never waits for a whole broadcast.  The cost is that a
//! subscriber removed after the snapshot may still be offered one last frame.
//!
//! # Lock poisoning
//!
//! The list is never left half-mutated (every operation is a single `Vec`
//! call), so a poisoned lock is recovered rather than propagated.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::domain::Connection;

/// Thread-safe set of subscriber connections.
///
/// Identity is by reference (`Arc::ptr_eq`), so the same connection object is
/// recognised regardless of what it reports from [`Connection::id`].
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<Vec<Arc<dyn Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn Connection>>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a connection.  Duplicates are not checked for.
    pub fn add(&self, connection: Arc<dyn Connection>) {
        let id = connection.id();
        let mut connections = self.lock();
        connections.push(connection);
        debug!("registered connection {id} ({} total)", connections.len());
    }

    /// Unregisters every entry referring to `connection`.
    ///
    /// Returns `true` if anything was removed.
    pub fn remove(&self, connection: &Arc<dyn Connection>) -> bool {
        let mut connections = self.lock();
        let before = connections.len();
        connections.retain(|c| !Arc::ptr_eq(c, connection));
        let removed = connections.len() != before;
        if removed {
            debug!(
                "unregistered connection {} ({} remaining)",
                connection.id(),
                connections.len()
            );
        }
        removed
    }

    /// The registered connections as of a single instant.
    pub fn snapshot(&self) -> Vec<Arc<dyn Connection>> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
