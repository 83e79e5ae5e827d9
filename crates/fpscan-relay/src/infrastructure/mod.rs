//! Infrastructure layer for fpscan-relay.
//!
//! - [`ws_server`] – TCP listener, WebSocket handshake, per-client session
//!   tasks.
//! - [`ws_connection`] – the [`Connection`](fpscan_core::Connection) each
//!   session registers; frames reach it through a bounded queue.

pub mod ws_connection;
pub mod ws_server;

pub use ws_connection::WsConnection;
pub use ws_server::{run_server, serve};
