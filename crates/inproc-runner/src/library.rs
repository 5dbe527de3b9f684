//! Loading a tool from a shared library
//!
//! A [`ToolLibrary`] keeps the library mapped for as long as it lives. Entry
//! points resolved from it are plain function pointers and must not be called
//! after the library is dropped.

use std::ffi::{CString, c_void};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use inproc_argv::Representation;
use inproc_capture::{CaptureWriteFn, inproc_capture_write};
use tracing::{debug, info};

use crate::entry::{EntryPoint, NarrowMain, WideMain};
use crate::error::RunnerError;

/// Signature of a tool export that installs a console write hook
pub type RegisterHookFn = unsafe extern "C" fn(hook: CaptureWriteFn);

/// A loaded tool library
#[derive(Debug)]
pub struct ToolLibrary {
    handle: NonNull<c_void>,
    path: PathBuf,
}

impl ToolLibrary {
    /// Load the shared library at `path`.
    ///
    /// # Errors
    /// [`RunnerError::LibraryLoad`] if the platform loader refuses the file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RunnerError> {
        let path = path.as_ref();
        let handle = sys::open(path).map_err(|reason| RunnerError::LibraryLoad {
            path: path.display().to_string(),
            reason,
        })?;
        info!(path = %path.display(), "Loaded tool library");
        Ok(Self {
            handle,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve the address of an exported symbol.
    ///
    /// # Errors
    /// [`RunnerError::SymbolNotFound`] if the library does not export it.
    pub fn symbol(&self, name: &str) -> Result<NonNull<c_void>, RunnerError> {
        let not_found = |reason: String| RunnerError::SymbolNotFound {
            symbol: name.to_string(),
            reason,
        };
        let c_name =
            CString::new(name).map_err(|_| not_found("symbol name contains a NUL byte".into()))?;
        let address = sys::symbol(self.handle, &c_name).map_err(not_found)?;
        debug!(symbol = name, "Resolved symbol");
        Ok(address)
    }

    /// Resolve `symbol` as the tool's entry point.
    ///
    /// # Safety
    /// The export must have the `main`/`wmain` signature matching
    /// `representation` and satisfy the contract of [`EntryPoint::narrow`].
    /// The returned value must not be used after `self` is dropped.
    ///
    /// # Errors
    /// [`RunnerError::SymbolNotFound`] if the library does not export it.
    pub unsafe fn entry_point(
        &self,
        symbol: &str,
        representation: Representation,
    ) -> Result<EntryPoint, RunnerError> {
        let address = self.symbol(symbol)?.as_ptr();
        // SAFETY: the caller vouches for the export's signature.
        let entry = unsafe {
            match representation {
                Representation::Narrow => {
                    EntryPoint::narrow(std::mem::transmute::<*mut c_void, NarrowMain>(address))
                }
                Representation::Wide => {
                    EntryPoint::wide(std::mem::transmute::<*mut c_void, WideMain>(address))
                }
            }
        };
        Ok(entry)
    }

    /// Hand [`inproc_capture_write`] to the tool's hook registration export,
    /// routing the tool's console writes into the capture registry.
    ///
    /// # Safety
    /// The export must have the [`RegisterHookFn`] signature.
    ///
    /// # Errors
    /// [`RunnerError::SymbolNotFound`] if the library does not export it.
    pub unsafe fn register_capture_hook(&self, symbol: &str) -> Result<(), RunnerError> {
        let address = self.symbol(symbol)?.as_ptr();
        // SAFETY: the caller vouches for the export's signature.
        unsafe {
            let register = std::mem::transmute::<*mut c_void, RegisterHookFn>(address);
            register(inproc_capture_write);
        }
        debug!(symbol, "Registered capture hook");
        Ok(())
    }
}

impl Drop for ToolLibrary {
    fn drop(&mut self) {
        sys::close(self.handle);
        debug!(path = %self.path.display(), "Unloaded tool library");
    }
}

#[cfg(unix)]
mod sys {
    use std::ffi::{CStr, CString, c_void};
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;
    use std::ptr::NonNull;

    fn last_error() -> String {
        // SAFETY: dlerror returns null or a NUL-terminated message that stays
        // valid until the next dl* call on this thread.
        unsafe {
            let message = libc::dlerror();
            if message.is_null() {
                "unknown dynamic loader error".to_string()
            } else {
                CStr::from_ptr(message).to_string_lossy().into_owned()
            }
        }
    }

    pub(super) fn open(path: &Path) -> Result<NonNull<c_void>, String> {
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| "path contains a NUL byte".to_string())?;
        // SAFETY: `c_path` is NUL-terminated.
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        NonNull::new(handle).ok_or_else(last_error)
    }

    pub(super) fn symbol(handle: NonNull<c_void>, name: &CStr) -> Result<NonNull<c_void>, String> {
        // SAFETY: `handle` came from dlopen and is still open; clearing
        // dlerror first makes a null result unambiguous.
        unsafe {
            libc::dlerror();
            NonNull::new(libc::dlsym(handle.as_ptr(), name.as_ptr())).ok_or_else(last_error)
        }
    }

    pub(super) fn close(handle: NonNull<c_void>) {
        // SAFETY: `handle` came from dlopen and is closed exactly once.
        unsafe {
            libc::dlclose(handle.as_ptr());
        }
    }
}

#[cfg(windows)]
mod sys {
    use std::ffi::{CStr, c_void};
    use std::path::Path;
    use std::ptr::NonNull;

    use windows::Win32::Foundation::{FreeLibrary, HMODULE};
    use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};
    use windows::core::{HSTRING, PCSTR};

    pub(super) fn open(path: &Path) -> Result<NonNull<c_void>, String> {
        let wide = HSTRING::from(path);
        // SAFETY: `wide` is a valid NUL-terminated wide string.
        let module = unsafe { LoadLibraryW(&wide) }.map_err(|e| e.message().to_string())?;
        NonNull::new(module.0).ok_or_else(|| "loader returned a null module".to_string())
    }

    pub(super) fn symbol(handle: NonNull<c_void>, name: &CStr) -> Result<NonNull<c_void>, String> {
        // SAFETY: `handle` is a live module and `name` is NUL-terminated.
        let address = unsafe {
            GetProcAddress(HMODULE(handle.as_ptr()), PCSTR(name.as_ptr().cast()))
        };
        address
            .and_then(|f| NonNull::new(f as *mut c_void))
            .ok_or_else(|| windows::core::Error::from_win32().message().to_string())
    }

    pub(super) fn close(handle: NonNull<c_void>) {
        // SAFETY: `handle` is a live module released exactly once.
        let _ = unsafe { FreeLibrary(HMODULE(handle.as_ptr())) };
    }
}
