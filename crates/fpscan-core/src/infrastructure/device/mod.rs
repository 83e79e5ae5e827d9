//! Scanner device access.
//!
//! The vendor SDK exposes a handful of blocking C calls (init, count, open,
//! acquire, close, terminate) that report failure through integer status
//! codes.  This module splits that into two layers:
//!
//! - [`ScannerSdk`]: a trait mirroring the vendor calls one-to-one, status
//!   codes and all.  [`zkfp::ZkfpScanner`] implements it over FFI (behind the
//!   `zkfp` cargo feature); [`mock::MockScanner`] implements it in memory for
//!   tests and the `--simulate` mode of the relay.
//! - [`DeviceSession`]: the typed wrapper the capture loop uses.  It turns
//!   status codes into [`DeviceError`]s, owns the device handle, and
//!   guarantees that close and terminate run exactly once on every exit path.
//!
//! # Threading
//!
//! None of the SDK calls may run concurrently.  A session is opened on the
//! capture thread and never leaves it; the trait only requires `Send` so the
//! SDK value can be moved onto that thread.

use std::num::NonZeroUsize;

use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{FrameBuffer, TemplateBuffer};

pub mod mock;

#[cfg(feature = "zkfp")]
pub mod zkfp;

/// Vendor status codes and their meanings.
pub mod status {
    pub const OK: i32 = 0;
    pub const ERR_INIT_LIB: i32 = -1;
    pub const ERR_INIT: i32 = -2;
    pub const ERR_NO_DEVICE: i32 = -3;
    pub const ERR_NOT_SUPPORTED: i32 = -4;
    pub const ERR_INVALID_PARAM: i32 = -5;
    pub const ERR_OPEN: i32 = -6;
    pub const ERR_INVALID_HANDLE: i32 = -7;
    pub const ERR_CAPTURE: i32 = -8;
    pub const ERR_EXTRACT: i32 = -9;
    pub const ERR_ABORTED: i32 = -10;
    pub const ERR_MEMORY: i32 = -11;
    pub const ERR_BUSY: i32 = -12;

    /// Short description of a status code for log messages.
    pub fn describe(code: i32) -> &'static str {
        match code {
            OK => "ok",
            ERR_INIT_LIB => "failed to load the vendor library",
            ERR_INIT => "failed to initialise the capture library",
            ERR_NO_DEVICE => "no device connected",
            ERR_NOT_SUPPORTED => "operation not supported by the interface",
            ERR_INVALID_PARAM => "invalid parameter",
            ERR_OPEN => "failed to open the device",
            ERR_INVALID_HANDLE => "invalid device handle",
            ERR_CAPTURE => "capture failed (no finger on the sensor)",
            ERR_EXTRACT => "failed to extract a template",
            ERR_ABORTED => "operation aborted",
            ERR_MEMORY => "not enough memory",
            ERR_BUSY => "device busy",
            _ => "unknown status",
        }
    }
}

/// Opaque handle to an open scanner.
///
/// The SDK hands out a non-null pointer; it is stored as an integer so the
/// handle is `Copy + Send` and can be produced by the mock as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(NonZeroUsize);

impl DeviceHandle {
    pub fn from_raw(raw: NonZeroUsize) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> usize {
        self.0.get()
    }
}

/// Errors reported by [`DeviceSession`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// SDK initialisation failed.  Fatal.
    #[error("failed to initialise scanner SDK (code {code})")]
    Init { code: i32 },

    /// The SDK reported no usable scanner.  Fatal.
    #[error("no fingerprint devices found (count {count})")]
    NoDevices { count: i32 },

    /// The scanner at `index` could not be opened.  Fatal.
    #[error("failed to open scanner at index {index}")]
    Open { index: u32 },

    /// One acquire call failed.  Recoverable: the next poll may succeed.
    #[error("failed to capture fingerprint (code {code})")]
    Acquire { code: i32 },

    /// Acquire was attempted after the session was closed.
    #[error("scanner session is not open")]
    NotOpen,
}

impl DeviceError {
    /// The vendor status code equivalent of this error.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::Init { code } | Self::Acquire { code } => *code,
            Self::NoDevices { .. } => status::ERR_NO_DEVICE,
            Self::Open { .. } => status::ERR_OPEN,
            Self::NotOpen => status::ERR_INVALID_HANDLE,
        }
    }

    /// Human-readable meaning of [`DeviceError::status_code`].
    pub fn description(&self) -> &'static str {
        status::describe(self.status_code())
    }

    /// Whether the error ends the process before serving starts.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Init { .. } | Self::NoDevices { .. } | Self::Open { .. }
        )
    }
}

/// The raw vendor SDK contract.
///
/// Every method is blocking and returns the SDK's own status convention.
pub trait ScannerSdk: Send {
    /// Initialises the library.  `0` on success.
    fn init(&mut self) -> i32;

    /// Releases the library.  `0` on success.
    fn terminate(&mut self) -> i32;

    /// Number of attached scanners.
    fn device_count(&mut self) -> i32;

    /// Opens the scanner at `index`, `None` on failure.
    fn open_device(&mut self, index: u32) -> Option<DeviceHandle>;

    /// Closes a handle returned by [`ScannerSdk::open_device`].  `0` on success.
    fn close_device(&mut self, handle: DeviceHandle) -> i32;

    /// Captures one frame into `image` and a template into `template`.
    ///
    /// `template_len` holds the template capacity on entry and the number of
    /// bytes written on exit.  `0` on success.
    fn acquire_fingerprint(
        &mut self,
        handle: DeviceHandle,
        image: &mut [u8],
        template: &mut [u8],
        template_len: &mut usize,
    ) -> i32;
}

/// An initialised SDK with one open scanner.
///
/// Dropping the session closes the scanner and terminates the SDK if
/// [`DeviceSession::shutdown`] has not already done so.
pub struct DeviceSession<S: ScannerSdk> {
    sdk: S,
    handle: Option<DeviceHandle>,
    terminated: bool,
}

impl<S: ScannerSdk> DeviceSession<S> {
    /// Initialises `sdk` and opens the scanner at `device_index`.
    ///
    /// If anything fails after a successful init, the SDK is terminated before
    /// the error is returned.
    ///
    /// # Errors
    ///
    /// [`DeviceError::Init`], [`DeviceError::NoDevices`] or
    /// [`DeviceError::Open`]; all of them are fatal to startup.
    pub fn open(mut sdk: S, device_index: u32) -> Result<Self, DeviceError> {
        let code = sdk.init();
        if code != status::OK {
            return Err(DeviceError::Init { code });
        }

        let count = sdk.device_count();
        if count <= 0 {
            terminate_sdk(&mut sdk);
            return Err(DeviceError::NoDevices { count });
        }

        let Some(handle) = sdk.open_device(device_index) else {
            terminate_sdk(&mut sdk);
            return Err(DeviceError::Open {
                index: device_index,
            });
        };

        info!("scanner {device_index} opened successfully ({count} device(s) attached)");

        Ok(Self {
            sdk,
            handle: Some(handle),
            terminated: false,
        })
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Captures one frame into `frame` and the template into `template`.
    ///
    /// # Errors
    ///
    /// [`DeviceError::Acquire`] for a nonzero SDK status, or
    /// [`DeviceError::NotOpen`] if the session has been shut down (the SDK is
    /// not called in that case).
    pub fn acquire(
        &mut self,
        frame: &mut FrameBuffer,
        template: &mut TemplateBuffer,
    ) -> Result<(), DeviceError> {
        let handle = self.handle.ok_or(DeviceError::NotOpen)?;

        let mut template_len = template.capacity();
        let code = self.sdk.acquire_fingerprint(
            handle,
            frame.as_mut_slice(),
            template.storage_mut(),
            &mut template_len,
        );

        if code == status::OK {
            template.set_len(template_len);
            Ok(())
        } else {
            Err(DeviceError::Acquire { code })
        }
    }

    /// Closes the scanner and terminates the SDK.
    ///
    /// Failures are logged and swallowed.  Safe to call more than once; each
    /// underlying call happens at most once per session.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let code = self.sdk.close_device(handle);
            if code == status::OK {
                info!("scanner closed");
            } else {
                warn!(
                    "failed to close scanner (code {code}: {})",
                    status::describe(code)
                );
            }
        }

        if !self.terminated {
            self.terminated = true;
            terminate_sdk(&mut self.sdk);
        }
    }
}

impl<S: ScannerSdk> Drop for DeviceSession<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn terminate_sdk<S: ScannerSdk>(sdk: &mut S) {
    let code = sdk.terminate();
    if code == status::OK {
        info!("scanner SDK terminated");
    } else {
        warn!(
            "failed to terminate scanner SDK (code {code}: {})",
            status::describe(code)
        );
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::mock::MockScanner;
    use super::*;
    use crate::domain::FrameDimensions;

    fn buffers() -> (FrameBuffer, TemplateBuffer) {
        (
            FrameBuffer::new(FrameDimensions::new(4, 4)),
            TemplateBuffer::with_capacity(64),
        )
    }

    #[test]
    fn test_open_succeeds_with_default_mock() {
        let scanner = MockScanner::new();
        let probe = scanner.probe();

        let session = DeviceSession::open(scanner, 0).expect("open must succeed");

        assert!(session.is_open());
        assert_eq!(probe.init_calls(), 1);
        assert_eq!(probe.open_calls(), 1);
        assert_eq!(probe.terminate_calls(), 0);
    }

    #[test]
    fn test_init_failure_is_fatal_and_skips_terminate() {
        // Arrange
        let scanner = MockScanner::new().with_init_status(status::ERR_INIT);
        let probe = scanner.probe();

        // Act
        let result = DeviceSession::open(scanner, 0);

        // Assert
        let err = result.err().expect("init failure must be reported");
        assert_eq!(err, DeviceError::Init { code: -2 });
        assert!(err.is_fatal());
        assert_eq!(probe.device_count_calls(), 0);
        assert_eq!(probe.terminate_calls(), 0);
    }

    #[test]
    fn test_zero_devices_terminates_sdk() {
        let scanner = MockScanner::new().with_device_count(0);
        let probe = scanner.probe();

        let err = DeviceSession::open(scanner, 0).err().unwrap();

        assert_eq!(err, DeviceError::NoDevices { count: 0 });
        assert_eq!(probe.open_calls(), 0);
        assert_eq!(probe.terminate_calls(), 1);
    }

    #[test]
    fn test_open_failure_terminates_sdk() {
        let scanner = MockScanner::new().with_open_failure();
        let probe = scanner.probe();

        let err = DeviceSession::open(scanner, 0).err().unwrap();

        assert_eq!(err, DeviceError::Open { index: 0 });
        assert!(err.is_fatal());
        assert_eq!(probe.close_calls(), 0);
        assert_eq!(probe.terminate_calls(), 1);
    }

    #[test]
    fn test_acquire_success_fills_frame_and_template() {
        // Arrange
        let scanner = MockScanner::new().with_fill(0x7F);
        let mut session = DeviceSession::open(scanner, 0).unwrap();
        let (mut frame, mut template) = buffers();

        // Act
        session.acquire(&mut frame, &mut template).expect("acquire");

        // Assert
        assert!(frame.as_slice().iter().all(|&b| b == 0x7F));
        assert!(!template.is_empty());
    }

    #[test]
    fn test_acquire_nonzero_status_is_recoverable_error() {
        let scanner = MockScanner::new().with_statuses([status::ERR_CAPTURE, status::OK]);
        let mut session = DeviceSession::open(scanner, 0).unwrap();
        let (mut frame, mut template) = buffers();

        let first = session.acquire(&mut frame, &mut template);
        let second = session.acquire(&mut frame, &mut template);

        assert_eq!(first, Err(DeviceError::Acquire { code: -8 }));
        assert!(!first.unwrap_err().is_fatal());
        assert_eq!(second, Ok(()));
    }

    #[test]
    fn test_acquire_after_shutdown_fails_without_calling_sdk() {
        // Arrange
        let scanner = MockScanner::new();
        let probe = scanner.probe();
        let mut session = DeviceSession::open(scanner, 0).unwrap();
        let (mut frame, mut template) = buffers();
        session.shutdown();

        // Act
        let result = session.acquire(&mut frame, &mut template);

        // Assert
        assert_eq!(result, Err(DeviceError::NotOpen));
        assert_eq!(DeviceError::NotOpen.status_code(), status::ERR_INVALID_HANDLE);
        assert_eq!(probe.acquire_calls(), 0);
    }

    #[test]
    fn test_shutdown_is_idempotent_and_drop_does_not_repeat_it() {
        let scanner = MockScanner::new();
        let probe = scanner.probe();
        let mut session = DeviceSession::open(scanner, 0).unwrap();

        session.shutdown();
        session.shutdown();
        drop(session);

        assert_eq!(probe.close_calls(), 1);
        assert_eq!(probe.terminate_calls(), 1);
    }

    #[test]
    fn test_drop_closes_and_terminates() {
        let scanner = MockScanner::new();
        let probe = scanner.probe();
        let session = DeviceSession::open(scanner, 0).unwrap();

        drop(session);

        assert_eq!(probe.close_calls(), 1);
        assert_eq!(probe.terminate_calls(), 1);
    }

    #[test]
    fn test_close_failure_still_terminates() {
        let scanner = MockScanner::new().with_close_status(status::ERR_BUSY);
        let probe = scanner.probe();
        let mut session = DeviceSession::open(scanner, 0).unwrap();

        session.shutdown();

        assert_eq!(probe.close_calls(), 1);
        assert_eq!(probe.terminate_calls(), 1);
        assert!(!session.is_open());
    }

    #[test]
    fn test_describe_known_and_unknown_codes() {
        assert_eq!(status::describe(status::OK), "ok");
        assert_eq!(status::describe(-8), "capture failed (no finger on the sensor)");
        assert_eq!(status::describe(-999), "unknown status");
    }

    #[test]
    fn test_acquire_error_message_and_description() {
        let err = DeviceError::Acquire { code: -12 };
        assert_eq!(err.to_string(), "failed to capture fingerprint (code -12)");
        assert_eq!(err.description(), "device busy");
    }
}
