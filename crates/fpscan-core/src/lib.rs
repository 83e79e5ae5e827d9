//! # fpscan-core
//!
//! Capture pipeline for the fingerprint scanner relay.
//!
//! A single capture thread polls the scanner, encodes every successful frame
//! as a grayscale PNG wrapped in a `data:` URI, and hands it to each
//! subscriber registered in a shared [`ConnectionRegistry`].  The transport
//! that accepts subscribers (WebSocket, in `fpscan-relay`) plugs in through
//! the [`Connection`] trait; the scanner plugs in through [`ScannerSdk`].
//!
//! # Layers
//!
//! - **`domain`** – configuration, frame/template buffers, the `Connection`
//!   trait.  No I/O.
//! - **`application`** – encoder, registry, broadcaster, capture loop.
//! - **`infrastructure`** – the scanner SDK seam, `DeviceSession`, the mock
//!   scanner, and the vendor bindings (feature `zkfp`).
//!
//! # Example
//!
//! ```rust
//! use std::sync::{atomic::AtomicBool, Arc};
//! use std::time::Duration;
//!
//! use fpscan_core::infrastructure::device::mock::MockScanner;
//! use fpscan_core::{spawn_capture, Broadcaster, CaptureConfig, ConnectionRegistry};
//!
//! let registry = Arc::new(ConnectionRegistry::new());
//! let running = Arc::new(AtomicBool::new(true));
//! let config = CaptureConfig {
//!     poll_interval: Duration::from_millis(10),
//!     ..CaptureConfig::default()
//! };
//!
//! let handle = spawn_capture(
//!     MockScanner::new(),
//!     config,
//!     Broadcaster::new(Arc::clone(&registry)),
//!     Arc::clone(&running),
//! )
//! .expect("mock scanner always opens");
//!
//! let stats = handle.stop().expect("capture thread panicked");
//! assert_eq!(stats.acquire_failures, 0);
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{
    spawn_capture, BroadcastReport, Broadcaster, CaptureHandle, CaptureLoop, CaptureStats,
    ConnectionRegistry, EncodeError, PollOutcome, StartError,
};
pub use domain::{
    CaptureConfig, ConfigError, Connection, ConnectionId, FrameBuffer, FrameDimensions, SendError,
    TemplateBuffer,
};
pub use infrastructure::{DeviceError, DeviceHandle, DeviceSession, ScannerSdk};
