//! Owned native argument vectors

use std::collections::TryReserveError;
use std::ffi::{c_char, c_int};
use std::fmt;
use std::ptr;
use std::str::FromStr;

/// Unit of a narrow (byte) string as the C entry point sees it.
pub type NarrowChar = c_char;

/// Unit of a wide string as the C entry point sees it (`wchar_t`).
#[cfg(windows)]
pub type WideChar = u16;

/// Unit of a wide string as the C entry point sees it (`wchar_t`).
#[cfg(not(windows))]
pub type WideChar = u32;

#[cfg(unix)]
const _: () = assert!(size_of::<libc::wchar_t>() == size_of::<WideChar>());

/// String representation an entry point expects in its `argv`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
    /// `char **argv`, UTF-8 bytes passed through verbatim
    Narrow,
    /// `wchar_t **argv`, UTF-16 on Windows and UTF-32 elsewhere
    Wide,
}

impl Representation {
    /// The representation a tool's conventional `main` uses on this platform:
    /// wide on Windows, narrow elsewhere.
    #[must_use]
    pub const fn platform_default() -> Self {
        if cfg!(windows) { Self::Wide } else { Self::Narrow }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Narrow => "narrow",
            Self::Wide => "wide",
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Representation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "narrow" => Ok(Self::Narrow),
            "wide" => Ok(Self::Wide),
            other => Err(format!(
                "unknown argument representation '{other}' (expected 'narrow' or 'wide')"
            )),
        }
    }
}

/// A null-terminated vector of NUL-terminated native strings.
///
/// The vector owns every string it points to. [`as_mut_ptr`](Self::as_mut_ptr)
/// yields the `argv` pointer for the entry point; it stays valid until the
/// vector is mutated, released or dropped.
#[derive(Debug)]
pub struct NativeArgv<T> {
    strings: Vec<Vec<T>>,
    pointers: Vec<*mut T>,
}

impl<T: Copy + Default + PartialEq + fmt::Debug> NativeArgv<T> {
    /// Create an empty vector with room for `elements` strings, allocated
    /// fallibly.
    pub(crate) fn with_capacity(elements: usize) -> Result<Self, TryReserveError> {
        let mut strings = Vec::new();
        strings.try_reserve_exact(elements)?;
        let mut pointers = Vec::new();
        pointers.try_reserve_exact(elements.saturating_add(1))?;
        pointers.push(ptr::null_mut());
        Ok(Self { strings, pointers })
    }

    /// Append one string. `units` must already end with the NUL unit.
    pub(crate) fn push(&mut self, units: Vec<T>) -> Result<(), TryReserveError> {
        debug_assert_eq!(units.last(), Some(&T::default()));
        self.strings.try_reserve(1)?;
        self.pointers.try_reserve(1)?;
        self.strings.push(units);
        self.refresh_pointers();
        Ok(())
    }

    fn refresh_pointers(&mut self) {
        // Capacity for len + 1 pointers is reserved by every path that grows
        // `strings`, so refilling never reallocates.
        self.pointers.clear();
        self.pointers
            .extend(self.strings.iter_mut().map(|units| units.as_mut_ptr()));
        self.pointers.push(ptr::null_mut());
    }

    /// Element count, the synthetic program name included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check whether the vector holds no strings (for example after release).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// The `argc` to pass alongside [`as_mut_ptr`](Self::as_mut_ptr).
    #[must_use]
    pub fn argc(&self) -> c_int {
        c_int::try_from(self.strings.len()).unwrap_or(c_int::MAX)
    }

    /// Element `index` without its NUL terminator.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&[T]> {
        self.strings
            .get(index)
            .map(|units| &units[..units.len() - 1])
    }

    /// Iterate over the elements without their NUL terminators.
    pub fn iter(&self) -> impl Iterator<Item = &[T]> {
        self.strings.iter().map(|units| &units[..units.len() - 1])
    }

    /// The null-terminated `argv` array for the entry point.
    pub fn as_mut_ptr(&mut self) -> *mut *mut T {
        self.refresh_pointers();
        self.pointers.as_mut_ptr()
    }

    /// Free every string and the pointer array.
    ///
    /// Safe to call any number of times; afterwards the vector is empty and
    /// [`as_mut_ptr`](Self::as_mut_ptr) yields an array holding only the
    /// terminating null.
    pub fn release(&mut self) {
        self.strings = Vec::new();
        self.pointers = Vec::new();
    }
}

impl NativeArgv<NarrowChar> {
    /// Decode every element as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn to_string_lossy(&self) -> Vec<String> {
        self.iter()
            .map(|units| {
                let bytes: Vec<u8> = units.iter().map(|&unit| unit as u8).collect();
                String::from_utf8_lossy(&bytes).into_owned()
            })
            .collect()
    }
}

impl NativeArgv<WideChar> {
    /// Decode every element back to UTF-8, replacing invalid units.
    #[must_use]
    pub fn to_string_lossy(&self) -> Vec<String> {
        self.iter().map(wide_to_string_lossy).collect()
    }
}

#[cfg(windows)]
fn wide_to_string_lossy(units: &[WideChar]) -> String {
    char::decode_utf16(units.iter().copied())
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

#[cfg(not(windows))]
fn wide_to_string_lossy(units: &[WideChar]) -> String {
    units
        .iter()
        .map(|&unit| char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
