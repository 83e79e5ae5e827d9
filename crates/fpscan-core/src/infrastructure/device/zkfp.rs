//! ZKTeco fingerprint SDK bindings (`libzkfp`).
//!
//! Compiled only with the `zkfp` cargo feature, which links the process
//! against the vendor's shared library.  The SDK keeps global state, so a
//! process should create at most one [`ZkfpScanner`] and drive it from a
//! single thread (the capture thread does exactly that).
//!
//! # Safety
//!
//! Every FFI call below passes either plain integers, a handle previously
//! returned by `ZKFPM_OpenDevice`, or pointers into Rust slices together with
//! their exact lengths.  The SDK writes at most the advertised number of bytes.

use std::ffi::{c_int, c_uint, c_void};
use std::num::NonZeroUsize;

use super::{status, DeviceHandle, ScannerSdk};

#[link(name = "zkfp")]
extern "system" {
    fn ZKFPM_Init() -> c_int;
    fn ZKFPM_Terminate() -> c_int;
    fn ZKFPM_GetDeviceCount() -> c_int;
    fn ZKFPM_OpenDevice(index: c_int) -> *mut c_void;
    fn ZKFPM_CloseDevice(handle: *mut c_void) -> c_int;
    fn ZKFPM_AcquireFingerprint(
        handle: *mut c_void,
        fp_image: *mut u8,
        cb_fp_image: c_uint,
        fp_template: *mut u8,
        cb_template: *mut c_uint,
    ) -> c_int;
}

/// The real scanner, driven through `libzkfp`.
#[derive(Debug, Default)]
pub struct ZkfpScanner;

impl ZkfpScanner {
    pub fn new() -> Self {
        Self
    }
}

fn as_ptr(handle: DeviceHandle) -> *mut c_void {
    handle.as_raw() as *mut c_void
}

impl ScannerSdk for ZkfpScanner {
    fn init(&mut self) -> i32 {
        // SAFETY: no arguments; the SDK tolerates repeated init/terminate pairs.
        unsafe { ZKFPM_Init() }
    }

    fn terminate(&mut self) -> i32 {
        // SAFETY: no arguments.
        unsafe { ZKFPM_Terminate() }
    }

    fn device_count(&mut self) -> i32 {
        // SAFETY: no arguments.
        unsafe { ZKFPM_GetDeviceCount() }
    }

    fn open_device(&mut self, index: u32) -> Option<DeviceHandle> {
        let index = c_int::try_from(index).ok()?;
        // SAFETY: the index is a plain integer; a null return means failure.
        let raw = unsafe { ZKFPM_OpenDevice(index) };
        NonZeroUsize::new(raw as usize).map(DeviceHandle::from_raw)
    }

    fn close_device(&mut self, handle: DeviceHandle) -> i32 {
        // SAFETY: `handle` came from ZKFPM_OpenDevice and is closed only once
        // (DeviceSession takes it out of its Option before calling this).
        unsafe { ZKFPM_CloseDevice(as_ptr(handle)) }
    }

    fn acquire_fingerprint(
        &mut self,
        handle: DeviceHandle,
        image: &mut [u8],
        template: &mut [u8],
        template_len: &mut usize,
    ) -> i32 {
        let (Ok(image_len), Ok(mut cb_template)) = (
            c_uint::try_from(image.len()),
            c_uint::try_from((*template_len).min(template.len())),
        ) else {
            return status::ERR_INVALID_PARAM;
        };

        // SAFETY: both pointers are valid for writes of the lengths passed
        // alongside them, and `cb_template` outlives the call.
        let code = unsafe {
            ZKFPM_AcquireFingerprint(
                as_ptr(handle),
                image.as_mut_ptr(),
                image_len,
                template.as_mut_ptr(),
                &mut cb_template,
            )
        };

        if code == status::OK {
            *template_len = cb_template as usize;
        }
        code
    }
}
