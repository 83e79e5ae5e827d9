//! Infrastructure layer for fpscan-core.
//!
//! Everything that talks to the outside world lives here.  For the core crate
//! that is only the scanner: the [`device::ScannerSdk`] seam, the
//! [`device::DeviceSession`] wrapper around it, the in-memory
//! [`device::mock::MockScanner`], and the vendor bindings behind the `zkfp`
//! feature.
//!
//! Network transport is not part of this crate; `fpscan-relay` provides the
//! WebSocket server and its [`Connection`](crate::domain::Connection)
//! implementation.

pub mod device;

pub use device::{DeviceError, DeviceHandle, DeviceSession, ScannerSdk};
