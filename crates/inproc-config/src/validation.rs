use crate::error::ConfigError;
use crate::model::{Config, ConfigSource};

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

impl Config {
    fn is_explicit(&self, key: &str) -> bool {
        self.source_attribution
            .get(key)
            .is_some_and(|source| *source != ConfigSource::Default)
    }

    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let capture = &self.capture;
        let streams = [
            (
                "stdout",
                capture.stdout_initial_bytes,
                capture.stdout_max_bytes,
            ),
            (
                "stderr",
                capture.stderr_initial_bytes,
                capture.stderr_max_bytes,
            ),
        ];

        for (stream, initial, max) in streams {
            if initial == Some(0) {
                return Err(invalid(
                    &format!("{stream}_initial_bytes"),
                    "must be greater than 0",
                ));
            }
            // A default initial capacity is clamped to the ceiling instead.
            let initial_key = format!("{stream}_initial_bytes");
            if let (Some(initial), Some(max)) = (initial, max)
                && max < initial
                && self.is_explicit(&initial_key)
            {
                return Err(invalid(
                    &format!("{stream}_max_bytes"),
                    format!("must be at least {stream}_initial_bytes ({initial})"),
                ));
            }
        }

        if let Some(name) = &self.argv.program_name {
            if name.is_empty() {
                return Err(invalid("program_name", "must not be empty"));
            }
            if name.contains('\0') {
                return Err(invalid("program_name", "must not contain a NUL byte"));
            }
        }

        if let Some(entry) = &self.tool.entry
            && entry.is_empty()
        {
            return Err(invalid("entry", "must not be empty"));
        }

        Ok(())
    }
}
