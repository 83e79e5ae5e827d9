//! The capture loop: poll the scanner, encode, broadcast, sleep, repeat.
//!
//! One dedicated OS thread runs the loop for the lifetime of the process.  It
//! owns the [`DeviceSession`] and both frame buffers, so every SDK call and
//! every encode happens on that thread, strictly one after another.
//!
//! # Iteration
//!
//! ```text
//! while running:
//!     acquire ──ok──► encode ──ok──► broadcast
//!        │               │
//!        └─err: log      └─err: log
//!     sleep(poll_interval)
//! ```
//!
//! # Stopping
//!
//! The shared `running` flag is only checked at the top of each iteration.  A
//! stop request therefore takes effect after the in-flight acquire call (which
//! cannot be interrupted) and the poll sleep have finished.  When the loop
//! exits, the device is closed and the SDK terminated; the session's `Drop`
//! does the same if the thread unwinds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::application::broadcast::{BroadcastReport, Broadcaster};
use crate::application::encoder::{encode_frame, EncodeError};
use crate::domain::{CaptureConfig, ConfigError, FrameBuffer, TemplateBuffer};
use crate::infrastructure::device::{status, DeviceError, DeviceSession, ScannerSdk};

/// Name given to the capture thread.
pub const CAPTURE_THREAD_NAME: &str = "fpscan-capture";

/// Result of a single [`CaptureLoop::poll_once`].
#[derive(Debug)]
pub enum PollOutcome {
    /// A frame was captured, encoded and offered to the subscribers.
    Broadcast(BroadcastReport),
    /// The scanner reported a nonzero status; nothing was sent.
    AcquireFailed(DeviceError),
    /// The frame could not be encoded; nothing was sent.
    EncodeFailed(EncodeError),
}

/// Counters accumulated over one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub polls: u64,
    pub frames: u64,
    pub acquire_failures: u64,
    pub encode_failures: u64,
    pub deliveries: u64,
}

/// Errors that prevent the capture thread from starting.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("invalid capture configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("failed to spawn capture thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("capture thread exited before reporting startup status")]
    ThreadExited,
}

/// The polling loop and everything it owns.
pub struct CaptureLoop<S: ScannerSdk> {
    session: DeviceSession<S>,
    frame: FrameBuffer,
    template: TemplateBuffer,
    broadcaster: Broadcaster,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
    stats: CaptureStats,
}

impl<S: ScannerSdk> CaptureLoop<S> {
    /// Builds a loop around an already-open session.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails validation.
    pub fn new(
        session: DeviceSession<S>,
        config: &CaptureConfig,
        broadcaster: Broadcaster,
        running: Arc<AtomicBool>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            frame: FrameBuffer::for_config(config)?,
            template: TemplateBuffer::with_capacity(config.template_capacity),
            session,
            broadcaster,
            poll_interval: config.poll_interval,
            running,
            stats: CaptureStats::default(),
        })
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    /// Runs one acquire → encode → broadcast step, without sleeping.
    pub fn poll_once(&mut self) -> PollOutcome {
        self.stats.polls += 1;

        if let Err(e) = self.session.acquire(&mut self.frame, &mut self.template) {
            self.stats.acquire_failures += 1;
            if e.status_code() == status::ERR_CAPTURE {
                debug!("{e}: {}", e.description());
            } else {
                warn!("{e}: {}", e.description());
            }
            return PollOutcome::AcquireFailed(e);
        }

        self.stats.frames += 1;

        let payload = match encode_frame(&self.frame) {
            Ok(payload) => payload,
            Err(e) => {
                self.stats.encode_failures += 1;
                error!("dropping captured frame: {e}");
                return PollOutcome::EncodeFailed(e);
            }
        };

        let report = self.broadcaster.broadcast(&payload);
        self.stats.deliveries += report.delivered as u64;
        debug!(
            "fingerprint captured ({} template bytes); delivered to {} of {} connection(s)",
            self.template.len(),
            report.delivered,
            report.total()
        );
        PollOutcome::Broadcast(report)
    }

    /// Polls until the running flag is cleared, then releases the device.
    pub fn run(mut self) -> CaptureStats {
        info!(
            "capture loop started (poll interval {} ms)",
            self.poll_interval.as_millis()
        );

        while self.running.load(Ordering::Acquire) {
            self.poll_once();
            thread::sleep(self.poll_interval);
        }

        self.session.shutdown();
        info!(
            "capture loop stopped after {} polls ({} frames, {} failed acquires)",
            self.stats.polls, self.stats.frames, self.stats.acquire_failures
        );
        self.stats
    }
}

/// A running capture thread.
pub struct CaptureHandle {
    running: Arc<AtomicBool>,
    thread: JoinHandle<CaptureStats>,
}

impl CaptureHandle {
    /// Whether the capture thread has already exited.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Clears the running flag and waits for the thread to finish.
    ///
    /// The device has been closed and the SDK terminated by the time this
    /// returns.  An `Err` carries the panic payload if the thread panicked.
    pub fn stop(self) -> thread::Result<CaptureStats> {
        self.running.store(false, Ordering::Release);
        self.thread.join()
    }
}

/// Opens the scanner on a new capture thread and starts polling.
///
/// Blocks until the device has been opened (or failed to open), so startup
/// errors are reported here rather than from inside the thread.  The loop runs
/// while `running` is `true`.
///
/// # Errors
///
/// [`StartError::Config`] if `config` is invalid (the SDK is not touched),
/// [`StartError::Device`] if init, enumeration or open fails.
pub fn spawn_capture<S>(
    sdk: S,
    config: CaptureConfig,
    broadcaster: Broadcaster,
    running: Arc<AtomicBool>,
) -> Result<CaptureHandle, StartError>
where
    S: ScannerSdk + 'static,
{
    config.validate()?;

    let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), StartError>>(1);
    let loop_running = Arc::clone(&running);

    let thread = thread::Builder::new()
        .name(CAPTURE_THREAD_NAME.to_string())
        .spawn(move || {
            let capture = DeviceSession::open(sdk, config.device_index)
                .map_err(StartError::from)
                .and_then(|session| {
                    CaptureLoop::new(session, &config, broadcaster, loop_running)
                        .map_err(StartError::from)
                });

            match capture {
                Ok(capture) => {
                    let _ = ready_tx.send(Ok(()));
                    capture.run()
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    CaptureStats::default()
                }
            }
        })
        .map_err(StartError::Spawn)?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(CaptureHandle { running, thread }),
        Ok(Err(e)) => {
            let _ = thread.join();
            Err(e)
        }
        Err(_) => {
            let _ = thread.join();
            Err(StartError::ThreadExited)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
