//! Snapshot and restore of the process `LC_CTYPE` locale
//!
//! The locale is process-global C library state. A [`LocaleGuard`] records
//! the current `LC_CTYPE` setting, switches to the first candidate locale the
//! C library accepts, and puts the recorded setting back when dropped. Guards
//! are serialised by a process-wide lock so two conversions never interleave
//! their switch/restore pairs.

use std::ffi::{CStr, CString, c_char, c_int};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace, warn};

#[cfg(unix)]
const LC_CTYPE: c_int = libc::LC_CTYPE;

// The Microsoft C runtime numbers its categories LC_ALL = 0, LC_COLLATE = 1,
// LC_CTYPE = 2.
#[cfg(windows)]
const LC_CTYPE: c_int = 2;

unsafe extern "C" {
    fn setlocale(category: c_int, locale: *const c_char) -> *mut c_char;
}

/// Candidates tried in order: a UTF-8 locale, a generic fallback, then the
/// user's environment default.
#[cfg(unix)]
const CANDIDATES: &[&CStr] = &[c"C.UTF-8", c"en_US.UTF-8", c""];

#[cfg(windows)]
const CANDIDATES: &[&CStr] = &[c".UTF8", c"C", c""];

static LOCALE_LOCK: Mutex<()> = Mutex::new(());

/// Read the current `LC_CTYPE` setting without changing it.
///
/// Returns `None` if the C library cannot report it.
#[must_use]
pub fn current_ctype() -> Option<CString> {
    // SAFETY: a null locale argument only queries. The returned string is
    // owned by the C library and copied before any further locale call.
    unsafe {
        let current = setlocale(LC_CTYPE, std::ptr::null());
        if current.is_null() {
            None
        } else {
            Some(CStr::from_ptr(current).to_owned())
        }
    }
}

/// Scoped switch of `LC_CTYPE` to a conversion-friendly locale.
///
/// The previous setting is restored exactly once, when the guard is dropped.
pub struct LocaleGuard {
    saved: Option<CString>,
    selected: Option<&'static CStr>,
    // Declared last: dropped after `Drop::drop` has restored the locale.
    _lock: MutexGuard<'static, ()>,
}

impl LocaleGuard {
    /// Snapshot the current locale and switch to the first accepted
    /// candidate.
    ///
    /// Blocks while another guard is alive on any thread. When no candidate
    /// is accepted the locale is left as it was and
    /// [`selected`](Self::selected) is `None`.
    pub fn activate() -> Self {
        let lock = LOCALE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let saved = current_ctype();
        if saved.is_none() {
            warn!("Could not read LC_CTYPE; locale will not be switched");
            return Self {
                saved,
                selected: None,
                _lock: lock,
            };
        }

        let selected = CANDIDATES.iter().copied().find(|candidate| {
            // SAFETY: `candidate` is a valid NUL-terminated string.
            let accepted = unsafe { !setlocale(LC_CTYPE, candidate.as_ptr()).is_null() };
            trace!(locale = ?candidate, accepted, "Trying LC_CTYPE candidate");
            accepted
        });
        debug!(previous = ?saved, selected = ?selected, "Switched LC_CTYPE for conversion");

        Self {
            saved,
            selected,
            _lock: lock,
        }
    }

    /// The candidate locale that was accepted, if any.
    #[must_use]
    pub fn selected(&self) -> Option<&'static CStr> {
        self.selected
    }

    /// The `LC_CTYPE` setting that will be restored.
    #[must_use]
    pub fn saved(&self) -> Option<&CStr> {
        self.saved.as_deref()
    }
}

impl std::fmt::Debug for LocaleGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocaleGuard")
            .field("saved", &self.saved)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

impl Drop for LocaleGuard {
    fn drop(&mut self) {
        let (Some(saved), Some(_)) = (&self.saved, self.selected) else {
            return;
        };
        // SAFETY: `saved` came from `setlocale` and is NUL-terminated.
        let restored = unsafe { !setlocale(LC_CTYPE, saved.as_ptr()).is_null() };
        if restored {
            trace!(locale = ?saved, "Restored LC_CTYPE");
        } else {
            warn!(locale = ?saved, "Failed to restore LC_CTYPE");
        }
    }
}
