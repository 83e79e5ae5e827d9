//! Domain layer for fpscan-core.
//!
//! Pure types with no I/O: capture configuration, the frame and template
//! buffers the scanner writes into, and the [`Connection`] abstraction that
//! the broadcast path delivers frames to.
//!
//! Nothing in here spawns threads, opens sockets or calls the scanner SDK.

pub mod config;
pub mod connection;
pub mod frame;

pub use config::{CaptureConfig, ConfigError};
pub use connection::{Connection, ConnectionId, SendError};
pub use frame::{FrameBuffer, FrameDimensions, TemplateBuffer};
