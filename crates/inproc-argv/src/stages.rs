//! Wide-string conversion stages and the fallback chain
//!
//! Each stage is a plain function from UTF-8 bytes to wide units. A
//! [`ConversionChain`] tries its stages in order and the first success wins.
//! A stage fails by rejecting the input, by producing nothing for non-empty
//! input, or by running out of memory; only the last aborts the chain.

use std::ffi::CString;
use std::fmt;

use tracing::{debug, trace};

use crate::decode::{decode_lenient, decode_strict};
use crate::error::ConversionError;
use crate::locale::LocaleGuard;
use crate::native::WideChar;

/// Why a single stage did not produce a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageFailure {
    /// The stage cannot represent this input.
    Rejected,
    /// The stage produced no units for non-empty input.
    Empty,
    /// An allocation failed. Aborts the whole conversion.
    OutOfMemory,
}

impl From<std::collections::TryReserveError> for StageFailure {
    fn from(_: std::collections::TryReserveError) -> Self {
        Self::OutOfMemory
    }
}

/// State shared by every stage during one conversion call.
///
/// The first locale-dependent stage activates a [`LocaleGuard`]; later
/// stages and later arguments reuse it, and the locale is restored once when
/// the context is dropped.
#[derive(Debug, Default)]
pub struct StageContext {
    locale: Option<LocaleGuard>,
}

impl StageContext {
    /// Activate the locale guard if no stage has done so yet.
    pub fn ensure_locale(&mut self) -> &LocaleGuard {
        self.locale.get_or_insert_with(LocaleGuard::activate)
    }

    /// Check whether any stage switched the locale during this conversion.
    #[must_use]
    pub fn locale_touched(&self) -> bool {
        self.locale.is_some()
    }
}

/// Signature of a conversion stage.
pub type StageFn = fn(&[u8], &mut StageContext) -> Result<Vec<WideChar>, StageFailure>;

/// A named conversion strategy
#[derive(Clone, Copy)]
pub struct ConversionStage {
    pub name: &'static str,
    pub convert: StageFn,
}

impl fmt::Debug for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConversionStage").field(&self.name).finish()
    }
}

impl ConversionStage {
    pub const fn new(name: &'static str, convert: StageFn) -> Self {
        Self { name, convert }
    }

    /// Well-formed UTF-8 only.
    pub const UTF8_STRICT: Self = Self::new("utf8-strict", utf8_strict);

    /// UTF-8 with malformed bytes skipped.
    pub const UTF8_LENIENT: Self = Self::new("utf8-lenient", utf8_lenient);

    /// The C library's `mbstowcs` under a switched `LC_CTYPE`.
    pub const LOCALE: Self = Self::new("locale", locale_mbstowcs);

    /// Each byte widened to one unit, as if the input were Latin-1. Never
    /// rejects non-empty input.
    pub const BYTES: Self = Self::new("bytes", reinterpret_bytes);

    /// `MultiByteToWideChar` with `CP_UTF8`, rejecting invalid sequences.
    #[cfg(windows)]
    pub const CODEPAGE_UTF8: Self = Self::new("codepage-utf8", windows::codepage_utf8);

    /// `MultiByteToWideChar` with the system ANSI code page.
    #[cfg(windows)]
    pub const CODEPAGE_ACP: Self = Self::new("codepage-acp", windows::codepage_acp);
}

fn utf8_strict(input: &[u8], _: &mut StageContext) -> Result<Vec<WideChar>, StageFailure> {
    decode_strict(input)?.ok_or(StageFailure::Rejected)
}

fn utf8_lenient(input: &[u8], _: &mut StageContext) -> Result<Vec<WideChar>, StageFailure> {
    Ok(decode_lenient(input)?)
}

fn reinterpret_bytes(input: &[u8], _: &mut StageContext) -> Result<Vec<WideChar>, StageFailure> {
    let mut out = Vec::new();
    out.try_reserve_exact(input.len() + 1)?;
    out.extend(input.iter().map(|&b| WideChar::from(b)));
    Ok(out)
}

unsafe extern "C" {
    fn mbstowcs(dest: *mut WideChar, src: *const std::ffi::c_char, n: usize) -> usize;
}

fn locale_mbstowcs(input: &[u8], ctx: &mut StageContext) -> Result<Vec<WideChar>, StageFailure> {
    let source = CString::new(input).map_err(|_| StageFailure::Rejected)?;
    ctx.ensure_locale();

    // SAFETY: `source` is NUL-terminated; a null destination only counts.
    let needed = unsafe { mbstowcs(std::ptr::null_mut(), source.as_ptr(), 0) };
    if needed == usize::MAX {
        return Err(StageFailure::Rejected);
    }

    let mut out: Vec<WideChar> = Vec::new();
    out.try_reserve_exact(needed.saturating_add(1))?;
    // SAFETY: `out` has room for `needed + 1` units and mbstowcs writes at
    // most that many, returning the count written before the terminator.
    let written = unsafe { mbstowcs(out.as_mut_ptr(), source.as_ptr(), needed + 1) };
    if written == usize::MAX || written > needed {
        return Err(StageFailure::Rejected);
    }
    // SAFETY: the first `written` units were initialised above.
    unsafe { out.set_len(written) };
    Ok(out)
}

#[cfg(windows)]
mod windows {
    use super::StageFailure;
    use crate::native::WideChar;
    use ::windows::Win32::Globalization::{
        CP_ACP, CP_UTF8, MB_ERR_INVALID_CHARS, MULTI_BYTE_TO_WIDE_CHAR_FLAGS, MultiByteToWideChar,
    };

    fn convert(
        codepage: u32,
        flags: MULTI_BYTE_TO_WIDE_CHAR_FLAGS,
        input: &[u8],
    ) -> Result<Vec<WideChar>, StageFailure> {
        // SAFETY: a `None` destination only measures.
        let needed = unsafe { MultiByteToWideChar(codepage, flags, input, None) };
        let Ok(needed) = usize::try_from(needed) else {
            return Err(StageFailure::Rejected);
        };
        if needed == 0 {
            return Err(StageFailure::Rejected);
        }

        let mut out: Vec<WideChar> = Vec::new();
        out.try_reserve_exact(needed + 1)?;
        out.resize(needed, 0);
        // SAFETY: `out` holds exactly `needed` initialised units.
        let written = unsafe { MultiByteToWideChar(codepage, flags, input, Some(out.as_mut_slice())) };
        match usize::try_from(written) {
            Ok(n) if n > 0 => {
                out.truncate(n);
                Ok(out)
            }
            _ => Err(StageFailure::Rejected),
        }
    }

    pub(super) fn codepage_utf8(
        input: &[u8],
        _: &mut super::StageContext,
    ) -> Result<Vec<WideChar>, StageFailure> {
        convert(CP_UTF8, MB_ERR_INVALID_CHARS, input)
    }

    pub(super) fn codepage_acp(
        input: &[u8],
        _: &mut super::StageContext,
    ) -> Result<Vec<WideChar>, StageFailure> {
        convert(CP_ACP, MULTI_BYTE_TO_WIDE_CHAR_FLAGS(0), input)
    }
}

/// An ordered list of conversion stages where the first success wins
#[derive(Debug, Clone)]
pub struct ConversionChain {
    stages: Vec<ConversionStage>,
}

impl ConversionChain {
    pub fn new(stages: Vec<ConversionStage>) -> Self {
        Self { stages }
    }

    /// The platform's preferred chain.
    ///
    /// Windows: UTF-8 code page, system code page, locale, lenient UTF-8,
    /// bytes. Elsewhere: strict UTF-8, locale, lenient UTF-8, bytes.
    ///
    /// Lenient UTF-8 sits before the byte stage so that malformed bytes in
    /// otherwise valid text are skipped rather than widened.
    pub fn platform_default() -> Self {
        #[cfg(windows)]
        let stages = vec![
            ConversionStage::CODEPAGE_UTF8,
            ConversionStage::CODEPAGE_ACP,
            ConversionStage::LOCALE,
            ConversionStage::UTF8_LENIENT,
            ConversionStage::BYTES,
        ];
        #[cfg(not(windows))]
        let stages = vec![
            ConversionStage::UTF8_STRICT,
            ConversionStage::LOCALE,
            ConversionStage::UTF8_LENIENT,
            ConversionStage::BYTES,
        ];
        Self::new(stages)
    }

    /// A chain that never consults the C locale or the operating system, so
    /// it behaves identically everywhere.
    pub fn portable() -> Self {
        Self::new(vec![
            ConversionStage::UTF8_STRICT,
            ConversionStage::UTF8_LENIENT,
        ])
    }

    pub fn stages(&self) -> &[ConversionStage] {
        &self.stages
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name).collect()
    }

    /// Convert argument `index` (`input`, without terminator) to wide units.
    ///
    /// Empty input converts to empty output without consulting any stage.
    ///
    /// # Errors
    /// [`ConversionError::OutOfMemory`] as soon as a stage fails to allocate;
    /// [`ConversionError::EncodingFailure`] when every stage failed.
    pub fn convert(
        &self,
        index: usize,
        input: &[u8],
        ctx: &mut StageContext,
    ) -> Result<Vec<WideChar>, ConversionError> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        for (position, stage) in self.stages.iter().enumerate() {
            match (stage.convert)(input, ctx) {
                Ok(units) if units.is_empty() => {
                    trace!(index, stage = stage.name, "Conversion stage produced no output");
                }
                Ok(units) => {
                    if position > 0 {
                        debug!(index, stage = stage.name, "Argument converted by fallback stage");
                    }
                    return Ok(units);
                }
                Err(StageFailure::OutOfMemory) => {
                    return Err(ConversionError::OutOfMemory { index });
                }
                Err(failure) => {
                    trace!(index, stage = stage.name, ?failure, "Conversion stage failed");
                }
            }
        }

        Err(ConversionError::EncodingFailure {
            index,
            attempted: self.names(),
        })
    }
}

impl Default for ConversionChain {
    fn default() -> Self {
        Self::platform_default()
    }
}
