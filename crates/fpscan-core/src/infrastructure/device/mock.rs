//! In-memory scanner for tests and simulation.
//!
//! [`MockScanner`] implements [`ScannerSdk`] without hardware.  Its behaviour
//! is configured with builder methods (status codes for each call, a scripted
//! sequence of acquire results, frame contents, an artificial acquire delay)
//! and every call is counted.  Because the scanner itself is moved onto the
//! capture thread, tests keep a [`MockProbe`] to read the counters afterwards.
//!
//! The relay's `--simulate` mode also runs on this type: with no fill byte
//! configured, each successful acquire produces a moving diagonal gradient.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{status, DeviceHandle, ScannerSdk};

/// Bytes written to the template buffer on a successful acquire.
const MOCK_TEMPLATE_LEN: usize = 512;

#[derive(Debug, Default)]
struct Counters {
    init: u32,
    terminate: u32,
    device_count: u32,
    open: u32,
    close: u32,
    acquire: u32,
}

/// A scriptable fake of the vendor SDK.
pub struct MockScanner {
    init_status: i32,
    terminate_status: i32,
    close_status: i32,
    device_count: i32,
    open_succeeds: bool,
    statuses: VecDeque<i32>,
    idle_status: i32,
    fill: Option<u8>,
    acquire_delay: Duration,
    frames_produced: u32,
    counters: Arc<Mutex<Counters>>,
}

impl MockScanner {
    /// A scanner that initialises, reports one device, opens, and succeeds on
    /// every acquire.
    pub fn new() -> Self {
        Self {
            init_status: status::OK,
            terminate_status: status::OK,
            close_status: status::OK,
            device_count: 1,
            open_succeeds: true,
            statuses: VecDeque::new(),
            idle_status: status::OK,
            fill: None,
            acquire_delay: Duration::ZERO,
            frames_produced: 0,
            counters: Arc::new(Mutex::new(Counters::default())),
        }
    }

    pub fn with_init_status(mut self, code: i32) -> Self {
        self.init_status = code;
        self
    }

    pub fn with_terminate_status(mut self, code: i32) -> Self {
        self.terminate_status = code;
        self
    }

    pub fn with_close_status(mut self, code: i32) -> Self {
        self.close_status = code;
        self
    }

    pub fn with_device_count(mut self, count: i32) -> Self {
        self.device_count = count;
        self
    }

    /// Makes `open_device` return no handle.
    pub fn with_open_failure(mut self) -> Self {
        self.open_succeeds = false;
        self
    }

    /// Acquire results returned in order, before falling back to the idle
    /// status.
    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = i32>) -> Self {
        self.statuses.extend(statuses);
        self
    }

    /// Acquire result once the scripted statuses are used up.
    pub fn with_idle_status(mut self, code: i32) -> Self {
        self.idle_status = code;
        self
    }

    /// Fills every captured frame with `value` instead of the gradient.
    pub fn with_fill(mut self, value: u8) -> Self {
        self.fill = Some(value);
        self
    }

    /// Blocks each acquire call for `delay`, like a real sensor waiting for a
    /// finger.
    pub fn with_acquire_delay(mut self, delay: Duration) -> Self {
        self.acquire_delay = delay;
        self
    }

    /// A handle for reading call counts after the scanner has been moved.
    pub fn probe(&self) -> MockProbe {
        MockProbe {
            counters: Arc::clone(&self.counters),
        }
    }

    fn counters(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render(&mut self, image: &mut [u8]) {
        match self.fill {
            Some(value) => image.fill(value),
            None => {
                let shift = self.frames_produced.wrapping_mul(8);
                for (i, sample) in image.iter_mut().enumerate() {
                    *sample = (i as u32).wrapping_add(shift) as u8;
                }
            }
        }
        self.frames_produced = self.frames_produced.wrapping_add(1);
    }
}

impl Default for MockScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScannerSdk for MockScanner {
    fn init(&mut self) -> i32 {
        self.counters().init += 1;
        self.init_status
    }

    fn terminate(&mut self) -> i32 {
        self.counters().terminate += 1;
        self.terminate_status
    }

    fn device_count(&mut self) -> i32 {
        self.counters().device_count += 1;
        self.device_count
    }

    fn open_device(&mut self, _index: u32) -> Option<DeviceHandle> {
        self.counters().open += 1;
        if self.open_succeeds {
            NonZeroUsize::new(1).map(DeviceHandle::from_raw)
        } else {
            None
        }
    }

    fn close_device(&mut self, _handle: DeviceHandle) -> i32 {
        self.counters().close += 1;
        self.close_status
    }

    fn acquire_fingerprint(
        &mut self,
        _handle: DeviceHandle,
        image: &mut [u8],
        template: &mut [u8],
        template_len: &mut usize,
    ) -> i32 {
        self.counters().acquire += 1;

        if !self.acquire_delay.is_zero() {
            std::thread::sleep(self.acquire_delay);
        }

        let code = self.statuses.pop_front().unwrap_or(self.idle_status);
        if code == status::OK {
            self.render(image);
            let written = MOCK_TEMPLATE_LEN.min(template.len()).min(*template_len);
            template[..written].fill(0xA5);
            *template_len = written;
        }
        code
    }
}

/// Read-only view of a [`MockScanner`]'s call counters.
#[derive(Clone)]
pub struct MockProbe {
    counters: Arc<Mutex<Counters>>,
}

impl MockProbe {
    fn read<T>(&self, f: impl FnOnce(&Counters) -> T) -> T {
        f(&self.counters.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn init_calls(&self) -> u32 {
        self.read(|c| c.init)
    }

    pub fn terminate_calls(&self) -> u32 {
        self.read(|c| c.terminate)
    }

    pub fn device_count_calls(&self) -> u32 {
        self.read(|c| c.device_count)
    }

    pub fn open_calls(&self) -> u32 {
        self.read(|c| c.open)
    }

    pub fn close_calls(&self) -> u32 {
        self.read(|c| c.close)
    }

    pub fn acquire_calls(&self) -> u32 {
        self.read(|c| c.acquire)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
