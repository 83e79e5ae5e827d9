//! WebSocket server: accept loop and per-session task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Upgrading each accepted connection to a WebSocket session.
//! 3. Registering the session with the shared [`ConnectionRegistry`] so the
//!    capture thread starts offering it frames.
//! 4. Running a writer (queued frames → text messages) and a reader (client
//!    messages are logged and otherwise ignored) until either side ends.
//! 5. Unregistering the session on every exit path.
//! 6. Stopping the accept loop when the `running` flag is cleared.
//!
//! Clients receive no history: a session sees only frames captured after it
//! was registered.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use fpscan_core::{Connection, ConnectionId, ConnectionRegistry};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};
use tracing::{debug, error, info, warn};

use crate::domain::RelayConfig;
use crate::infrastructure::ws_connection::WsConnection;

/// How often the accept loop re-checks the `running` flag while idle.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Inbound text longer than this is cut before logging.
const MAX_LOGGED_TEXT: usize = 256;

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds `config.bind_addr` and serves until `running` is cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound (port in use, missing
/// permission).  Per-session failures are logged, never returned.
pub async fn run_server(
    config: &RelayConfig,
    registry: Arc<ConnectionRegistry>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {}", config.bind_addr))?;

    info!("WebSocket server listening on ws://{}", listener.local_addr()?);

    serve(listener, registry, config.outbound_queue, running).await
}

/// Runs the accept loop on an already bound listener.
///
/// Each accepted connection gets its own Tokio task so a slow handshake never
/// delays the next accept.  `outbound_queue` is the per-client frame backlog.
pub async fn serve(
    listener: TcpListener,
    registry: Arc<ConnectionRegistry>,
    outbound_queue: usize,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Bounded wait so the flag is seen even with no incoming clients.
        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("TCP connection from {peer_addr}");
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    handle_client(stream, peer_addr, registry, outbound_queue).await;
                });
            }
            Ok(Err(e)) => {
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }

    Ok(())
}

// ── Per-session handler ───────────────────────────────────────────────────────

async fn handle_client(
    stream: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    outbound_queue: usize,
) {
    match run_session(stream, peer_addr, registry, outbound_queue).await {
        Ok(id) => info!("client {id} ({peer_addr}) disconnected"),
        Err(e) => warn!("session {peer_addr} ended with error: {e:#}"),
    }
}

/// Removes the session from the registry when dropped, whichever way the
/// session future finishes.
struct Registration {
    registry: Arc<ConnectionRegistry>,
    connection: Arc<WsConnection>,
}

impl Registration {
    fn new(registry: Arc<ConnectionRegistry>, connection: Arc<WsConnection>) -> Self {
        registry.add(Arc::clone(&connection) as Arc<dyn Connection>);
        Self {
            registry,
            connection,
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.connection.close();
        let entry = Arc::clone(&self.connection) as Arc<dyn Connection>;
        self.registry.remove(&entry);
    }
}

/// Runs one client session from handshake to disconnect.
///
/// # Errors
///
/// Returns an error if the WebSocket handshake fails.  Errors after the
/// handshake simply end the session.
async fn run_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    outbound_queue: usize,
) -> anyhow::Result<ConnectionId> {
    let ws_stream = accept_async(stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let (connection, mut frames) = WsConnection::channel(outbound_queue);
    let id = connection.id();
    let _registration = Registration::new(registry, Arc::new(connection));

    info!("client {id} connected from {peer_addr}");

    // ── Writer: queued frames → text messages ─────────────────────────────────
    let writer = async {
        while let Some(frame) = frames.recv().await {
            if let Err(e) = ws_tx.send(WsMessage::Text(frame)).await {
                debug!("client {id}: write failed: {e}");
                break;
            }
        }
    };

    // ── Reader: log client messages, stop on close or error ───────────────────
    let reader = async {
        while let Some(msg) = ws_rx.next().await {
            match msg {
                Ok(WsMessage::Text(text)) => {
                    info!("client {id} says: {}", truncate_for_log(&text));
                }
                Ok(WsMessage::Binary(data)) => {
                    debug!("client {id}: ignoring {} byte binary message", data.len());
                }
                Ok(WsMessage::Close(_)) => {
                    debug!("client {id}: close frame received");
                    break;
                }
                // Ping/Pong are answered by tungstenite itself.
                Ok(_) => {}
                Err(e) => {
                    debug!("client {id}: read failed: {e}");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = writer => {}
        _ = reader => {}
    }

    Ok(id)
}

/// Cuts `text` to at most [`MAX_LOGGED_TEXT`] bytes on a char boundary.
fn truncate_for_log(text: &str) -> std::borrow::Cow<'_, str> {
    if text.len() <= MAX_LOGGED_TEXT {
        return text.into();
    }
    let mut end = MAX_LOGGED_TEXT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}… ({} bytes)", &text[..end], text.len()).into()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
