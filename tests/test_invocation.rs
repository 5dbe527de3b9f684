//! End-to-end invocations through the public facade
//!
//! Stub entry points stand in for an embedded tool. They write through the
//! capture registry exactly as a tool's console layer would.

use std::ffi::{CStr, c_int};

use inproc::capture::{self, CaptureWriteFn, inproc_capture_write};
use inproc::{EntryPoint, NarrowChar, Runner, RunnerConfig, Stream, WideChar};
use serial_test::serial;

unsafe extern "C" fn ok_main(_argc: c_int, _argv: *mut *mut NarrowChar) -> c_int {
    capture::write(Stream::Stdout, b"OK\n");
    0
}

unsafe extern "C" fn silent_main(_argc: c_int, _argv: *mut *mut NarrowChar) -> c_int {
    22
}

/// Writes each argument to stdout on its own line and "argc=N" to stderr.
unsafe extern "C" fn echo_main(argc: c_int, argv: *mut *mut NarrowChar) -> c_int {
    for i in 0..argc as usize {
        let arg = unsafe { CStr::from_ptr(*argv.add(i)) };
        capture::write(Stream::Stdout, arg.to_bytes());
        capture::write(Stream::Stdout, b"\n");
    }
    let sentinel_ok = unsafe { (*argv.add(argc as usize)).is_null() };
    capture::write(Stream::Stderr, format!("argc={argc}").as_bytes());
    if sentinel_ok { 0 } else { 99 }
}

/// Returns the number of units in argv[1] so the caller can check encoding.
unsafe extern "C" fn wide_len_main(argc: c_int, argv: *mut *mut WideChar) -> c_int {
    if argc < 2 {
        return -1;
    }
    let mut len = 0;
    unsafe {
        let arg = *argv.add(1);
        while *arg.add(len) != 0 {
            len += 1;
        }
    }
    len as c_int
}

static HOOK: std::sync::Mutex<Option<CaptureWriteFn>> = std::sync::Mutex::new(None);

unsafe extern "C" fn set_hook(hook: CaptureWriteFn) {
    if let Ok(mut slot) = HOOK.lock() {
        *slot = Some(hook);
    }
}

/// Writes through a registered C hook the way a non-Rust tool would.
unsafe extern "C" fn hooked_main(_argc: c_int, _argv: *mut *mut NarrowChar) -> c_int {
    let Some(hook) = HOOK.lock().ok().and_then(|slot| *slot) else {
        return 1;
    };
    let out = b"from C\n";
    let err = b"warning\n";
    unsafe {
        hook(1, out.as_ptr().cast(), out.len());
        hook(2, err.as_ptr().cast(), err.len());
        hook(7, out.as_ptr().cast(), out.len());
    }
    0
}

#[test]
#[serial]
fn test_stub_writing_ok_returns_zero_with_output() {
    let mut runner = Runner::new(unsafe { EntryPoint::narrow(ok_main) });
    let result = runner.run(["--dummy"]);
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout, b"OK\n");
    assert!(result.stderr.is_empty());
    assert!(result.conversion_error.is_none());
}

#[test]
#[serial]
fn test_silent_stub_exit_code_passes_through() {
    let mut runner = Runner::new(unsafe { EntryPoint::narrow(silent_main) });
    let result = runner.run(Vec::<String>::new());
    assert_eq!(result.exit_code, 22);
    assert!(result.stdout.is_empty());
    assert!(result.stderr.is_empty());
    assert!(!result.success());
}

#[test]
#[serial]
fn test_entry_point_sees_program_name_then_arguments() {
    let marshaller = inproc::ArgumentMarshaller::new("curl");
    let mut runner =
        Runner::new(unsafe { EntryPoint::narrow(echo_main) }).with_marshaller(marshaller);
    let result = runner.run(["-I", "https://example.com", "ünï"]);

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout_string(), "curl\n-I\nhttps://example.com\nünï\n");
    assert_eq!(result.stderr_string(), "argc=4");
}

#[test]
#[serial]
fn test_repeated_invocations_do_not_leak_output() {
    let mut runner = Runner::new(unsafe { EntryPoint::narrow(echo_main) });
    let first = runner.run(["one"]);
    let second = runner.run(["two"]);
    assert_eq!(first.stdout_string(), "tool\none\n");
    assert_eq!(second.stdout_string(), "tool\ntwo\n");
}

#[test]
#[serial]
fn test_wide_entry_point_receives_native_units() {
    let mut runner = Runner::new(unsafe { EntryPoint::wide(wide_len_main) });
    assert_eq!(runner.run(["abc"]).exit_code, 3);

    let astral = runner.run(["😀"]).exit_code;
    if cfg!(windows) {
        assert_eq!(astral, 2);
    } else {
        assert_eq!(astral, 1);
    }
}

#[test]
#[serial]
fn test_conversion_failure_skips_entry_point() {
    let mut runner = Runner::new(unsafe { EntryPoint::narrow(ok_main) });
    let result = runner.run(["fine", "nul\0inside"]);
    assert_eq!(result.exit_code, 2);
    assert!(result.stdout.is_empty());
    assert_eq!(result.conversion_error.as_ref().map(|e| e.index()), Some(2));
}

#[test]
#[serial]
fn test_c_hook_routes_into_capture() {
    unsafe { set_hook(inproc_capture_write) };
    let mut runner = Runner::new(unsafe { EntryPoint::narrow(hooked_main) });
    let result = runner.run(Vec::<&str>::new());
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout, b"from C\n");
    assert_eq!(result.stderr, b"warning\n");
}

#[test]
#[serial]
fn test_output_ceiling_reports_dropped_bytes() {
    let config = RunnerConfig {
        stdout_initial_bytes: 4,
        stdout_max_bytes: Some(8),
        ..RunnerConfig::default()
    };
    let mut runner = Runner::with_config(unsafe { EntryPoint::narrow(echo_main) }, config);
    let result = runner.run(["abc", "defghijk"]);

    // "tool\n" fits, "abc" fits, the rest is dropped.
    assert_eq!(result.stdout, b"tool\nabc");
    assert!(result.output_truncated());
    assert!(result.stdout_dropped_bytes > 0);
    assert_eq!(result.stderr_dropped_bytes, 0);
}

#[test]
#[serial]
fn test_result_serializes_for_json_output() {
    let mut runner = Runner::new(unsafe { EntryPoint::narrow(ok_main) });
    let value = serde_json::to_value(runner.run(["--dummy"])).unwrap();
    assert_eq!(value["exit_code"], 0);
    assert_eq!(value["stdout"], "OK\n");
    assert_eq!(value["stderr"], "");
    assert!(value["conversion_error"].is_null());
}
