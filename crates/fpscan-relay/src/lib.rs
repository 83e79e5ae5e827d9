//! # fpscan-relay
//!
//! WebSocket front end for the fingerprint scanner capture pipeline.
//!
//! Browsers connect over plain WebSocket and receive every captured frame as
//! a text message holding a `data:image/png;base64,...` URI, ready to drop
//! into an `<img src>`.  Anything a client sends is logged and ignored.
//!
//! The capture side (scanner, encoder, registry, broadcaster) lives in
//! `fpscan-core`; this crate adds:
//!
//! - **`domain`** – [`RelayConfig`] and the TOML file schema.
//! - **`infrastructure`** – the accept loop and per-client sessions, plus
//!   [`WsConnection`], the registry entry each session owns.
//!
//! ```text
//! scanner ─▶ capture thread ─▶ Broadcaster ─▶ WsConnection queue ─▶ writer task ─▶ browser
//!                                   ▲
//!                   ConnectionRegistry (add on handshake, remove on close)
//! ```

pub mod domain;
pub mod infrastructure;

pub use domain::{FileConfig, RelayConfig, RelayConfigError};
pub use infrastructure::{run_server, serve, WsConnection};
