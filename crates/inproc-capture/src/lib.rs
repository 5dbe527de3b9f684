//! Output capture for in-process tool invocations
//!
//! A [`CaptureBuffer`] is an append-only, auto-growing byte sink. The
//! [`registry`] holds the one buffer per stream that is currently "active";
//! anything the embedded tool writes to its console while a buffer is active
//! lands in that buffer instead.
//!
//! # Single-flight
//!
//! The registry is process-wide state with one slot per stream. Two
//! invocations running concurrently on different threads would append into
//! each other's buffers. Hosts serialize invocations; the registry does not.

pub mod buffer;
pub mod ffi;
pub mod registry;

pub use buffer::CaptureBuffer;
pub use ffi::{CaptureWriteFn, inproc_capture_write};
pub use registry::{CaptureScope, Stream, is_active, set_active, write};
