//! C ABI seam between the embedded tool's console layer and the registry
//!
//! A tool built in C routes its console writes through a function pointer of
//! type [`CaptureWriteFn`]. The host registers [`inproc_capture_write`] with
//! the tool once; from then on every console write lands in the active
//! capture buffer, or on the real console when nothing is being captured.

use std::ffi::{c_char, c_int};

use crate::registry::{self, Stream};

/// Signature of the console write hook handed to the embedded tool.
///
/// `stream` is the console file descriptor (1 or 2), `data` points to `len`
/// bytes that need not be NUL-terminated.
pub type CaptureWriteFn = unsafe extern "C" fn(stream: c_int, data: *const c_char, len: usize);

/// Console write hook exported for the embedded tool.
///
/// Unknown stream numbers and null `data` pointers are ignored.
///
/// # Safety
///
/// `data` must be null or valid for reads of `len` bytes for the duration of
/// the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn inproc_capture_write(stream: c_int, data: *const c_char, len: usize) {
    let Some(stream) = Stream::from_fd(stream) else {
        return;
    };
    if len == 0 || data.is_null() {
        return;
    }

    // SAFETY: caller guarantees `data` is valid for `len` bytes.
    let bytes = unsafe { std::slice::from_raw_parts(data.cast::<u8>(), len) };
    registry::write(stream, bytes);
}
