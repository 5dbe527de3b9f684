//! Embedded entry point signatures

use std::ffi::c_int;
use std::fmt;

use inproc_argv::{NarrowChar, Representation, WideChar};

/// `int main(int argc, char **argv)`
pub type NarrowMain = unsafe extern "C" fn(c_int, *mut *mut NarrowChar) -> c_int;

/// `int wmain(int argc, wchar_t **argv)`
pub type WideMain = unsafe extern "C" fn(c_int, *mut *mut WideChar) -> c_int;

#[derive(Clone, Copy)]
pub(crate) enum EntryKind {
    Narrow(NarrowMain),
    Wide(WideMain),
}

/// The single function an invocation calls
#[derive(Clone, Copy)]
pub struct EntryPoint {
    pub(crate) kind: EntryKind,
}

impl EntryPoint {
    /// Wrap a narrow `main`-style function.
    ///
    /// # Safety
    /// `main` must accept any `argc`/`argv` pair built by the argument
    /// marshaller, must not retain `argv` after returning, and must stay
    /// callable for as long as this value is used.
    #[must_use]
    pub const unsafe fn narrow(main: NarrowMain) -> Self {
        Self {
            kind: EntryKind::Narrow(main),
        }
    }

    /// Wrap a wide `wmain`-style function.
    ///
    /// # Safety
    /// Same contract as [`narrow`](Self::narrow).
    #[must_use]
    pub const unsafe fn wide(main: WideMain) -> Self {
        Self {
            kind: EntryKind::Wide(main),
        }
    }

    /// Argument representation the entry point expects.
    #[must_use]
    pub const fn representation(&self) -> Representation {
        match self.kind {
            EntryKind::Narrow(_) => Representation::Narrow,
            EntryKind::Wide(_) => Representation::Wide,
        }
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let address = match self.kind {
            EntryKind::Narrow(main) => main as usize,
            EntryKind::Wide(main) => main as usize,
        };
        f.debug_struct("EntryPoint")
            .field("representation", &self.representation())
            .field("address", &format_args!("{address:#x}"))
            .finish()
    }
}
