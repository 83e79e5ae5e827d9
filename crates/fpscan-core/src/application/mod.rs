//! Application layer for fpscan-core.
//!
//! The producer/consumer pipeline:
//!
//! ```text
//! CaptureLoop ──► encoder ──► Broadcaster ──► ConnectionRegistry snapshot ──► N connections
//!  (owns DeviceSession)
//! ```
//!
//! - [`capture_loop`]: the single polling thread.
//! - [`encoder`]: raw samples → PNG → `data:` URI.
//! - [`broadcast`]: per-frame fan-out with per-connection failure isolation.
//! - [`registry`]: the mutex-guarded subscriber set shared with the transport.

pub mod broadcast;
pub mod capture_loop;
pub mod encoder;
pub mod registry;

pub use broadcast::{BroadcastReport, Broadcaster};
pub use capture_loop::{spawn_capture, CaptureHandle, CaptureLoop, CaptureStats, PollOutcome, StartError};
pub use encoder::{encode_frame, encode_png, to_data_uri, EncodeError, DATA_URI_PREFIX};
pub use registry::ConnectionRegistry;
