//! Argument marshalling for embedded entry points
//!
//! A host hands over its arguments as UTF-8 byte strings. The embedded tool
//! expects a conventional `argv`: a synthetic program name, one native string
//! per argument, and a trailing null pointer. Depending on how the tool was
//! built that vector holds narrow byte strings or wide-character strings.
//!
//! Wide conversion runs each argument through a [`ConversionChain`], an
//! ordered list of independent stages where the first success wins. Stages
//! that depend on the C locale share one [`LocaleGuard`] per conversion, so
//! the locale is switched at most once and restored exactly once.
//!
//! Either every element converts and the vector is returned whole, or the
//! conversion aborts and everything built so far is freed.

pub mod decode;
pub mod error;
pub mod locale;
pub mod marshaller;
pub mod native;
pub mod stages;

pub use error::ConversionError;
pub use locale::LocaleGuard;
pub use marshaller::{ArgumentMarshaller, DEFAULT_PROGRAM_NAME};
pub use native::{NarrowChar, NativeArgv, Representation, WideChar};
pub use stages::{ConversionChain, ConversionStage, StageContext, StageFailure};
