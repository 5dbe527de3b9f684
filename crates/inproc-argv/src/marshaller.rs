//! UTF-8 argument lists to native `argv`

use tracing::debug;

use crate::error::ConversionError;
use crate::native::{NarrowChar, NativeArgv, WideChar};
use crate::stages::{ConversionChain, StageContext};

/// Synthetic `argv[0]` used when none is configured.
pub const DEFAULT_PROGRAM_NAME: &str = "tool";

/// Builds native argument vectors for an embedded entry point.
///
/// Element 0 of every vector is the configured program name, followed by one
/// element per host argument in order, followed by a null pointer. A failed
/// build frees every element it had already produced before returning.
#[derive(Debug, Clone)]
pub struct ArgumentMarshaller {
    program_name: String,
    chain: ConversionChain,
}

impl Default for ArgumentMarshaller {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM_NAME)
    }
}

impl ArgumentMarshaller {
    /// Create a marshaller using the platform's default conversion chain.
    pub fn new(program_name: impl Into<String>) -> Self {
        Self {
            program_name: program_name.into(),
            chain: ConversionChain::platform_default(),
        }
    }

    /// Replace the conversion chain used for wide vectors.
    #[must_use]
    pub fn with_chain(mut self, chain: ConversionChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn program_name(&self) -> &str {
        &self.program_name
    }

    pub fn chain(&self) -> &ConversionChain {
        &self.chain
    }

    /// Build a narrow (`char **`) vector. Bytes are copied verbatim.
    ///
    /// # Errors
    /// [`ConversionError::InteriorNul`] if an argument contains a NUL byte,
    /// [`ConversionError::OutOfMemory`] if an allocation fails.
    pub fn to_narrow<I, S>(&self, args: I) -> Result<NativeArgv<NarrowChar>, ConversionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        self.build(args, |index, bytes| {
            let mut units = Vec::new();
            units
                .try_reserve_exact(bytes.len() + 1)
                .map_err(|_| ConversionError::OutOfMemory { index })?;
            units.extend(bytes.iter().map(|&b| b as NarrowChar));
            units.push(0);
            Ok(units)
        })
    }

    /// Build a wide (`wchar_t **`) vector through the conversion chain.
    ///
    /// The C locale is switched at most once for the whole call and is back
    /// to its previous setting when this returns, on success or failure.
    ///
    /// # Errors
    /// [`ConversionError::InteriorNul`] if an argument contains a NUL byte,
    /// [`ConversionError::EncodingFailure`] if no stage converts an argument,
    /// [`ConversionError::OutOfMemory`] if an allocation fails.
    pub fn to_wide<I, S>(&self, args: I) -> Result<NativeArgv<WideChar>, ConversionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut ctx = StageContext::default();
        let result = self.build(args, |index, bytes| {
            let mut units = self.chain.convert(index, bytes, &mut ctx)?;
            units
                .try_reserve_exact(1)
                .map_err(|_| ConversionError::OutOfMemory { index })?;
            units.push(0);
            Ok(units)
        });
        if ctx.locale_touched() {
            debug!("Restoring LC_CTYPE after wide conversion");
        }
        result
    }

    fn build<T, I, S, F>(&self, args: I, mut encode: F) -> Result<NativeArgv<T>, ConversionError>
    where
        T: Copy + Default + PartialEq + std::fmt::Debug,
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
        F: FnMut(usize, &[u8]) -> Result<Vec<T>, ConversionError>,
    {
        let args = args.into_iter();
        let expected = args.size_hint().0.saturating_add(1);
        let mut argv = NativeArgv::with_capacity(expected)
            .map_err(|_| ConversionError::OutOfMemory { index: 0 })?;

        let mut push = |index: usize, bytes: &[u8]| -> Result<(), ConversionError> {
            if let Some(offset) = bytes.iter().position(|&b| b == 0) {
                return Err(ConversionError::InteriorNul { index, offset });
            }
            let units = encode(index, bytes)?;
            argv.push(units)
                .map_err(|_| ConversionError::OutOfMemory { index })
        };

        let outcome = push(0, self.program_name.as_bytes()).and_then(|()| {
            args.enumerate()
                .try_for_each(|(i, arg)| push(i + 1, arg.as_ref()))
        });

        match outcome {
            Ok(()) => Ok(argv),
            Err(err) => {
                // `argv` and every element pushed so far are freed here.
                debug!(index = err.index(), error = %err, "Argument conversion aborted");
                Err(err)
            }
        }
    }
}
