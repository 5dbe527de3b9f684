use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use inproc_argv::{DEFAULT_PROGRAM_NAME, Representation};
use inproc_runner::RunnerConfig;

/// Entry point symbol looked up when none is configured
pub const DEFAULT_ENTRY_SYMBOL: &str = "tool_main";

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value loaded from the configuration file at this path.
    ConfigFile(PathBuf),
    /// Built-in default value (lowest precedence).
    Default,
}

impl ConfigSource {
    /// Short label used in `inproc config` output.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::ConfigFile(_) => "config",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigFile(path) => write!(f, "config ({})", path.display()),
            other => f.write_str(other.label()),
        }
    }
}

/// Requested `argv` representation, with `auto` deferring to the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepresentationMode {
    Narrow,
    Wide,
    #[default]
    Auto,
}

impl RepresentationMode {
    /// Resolve `auto` to the platform default.
    #[must_use]
    pub fn resolve(self) -> Representation {
        match self {
            Self::Narrow => Representation::Narrow,
            Self::Wide => Representation::Wide,
            Self::Auto => Representation::platform_default(),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Narrow => "narrow",
            Self::Wide => "wide",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for RepresentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[capture]` section: buffer sizing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureConfig {
    pub stdout_initial_bytes: Option<usize>,
    pub stderr_initial_bytes: Option<usize>,
    pub stdout_max_bytes: Option<usize>,
    pub stderr_max_bytes: Option<usize>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let runner = RunnerConfig::default();
        Self {
            stdout_initial_bytes: Some(runner.stdout_initial_bytes), // 64 KiB
            stderr_initial_bytes: Some(runner.stderr_initial_bytes), // 16 KiB
            stdout_max_bytes: None,
            stderr_max_bytes: None,
        }
    }
}

/// `[argv]` section: argument vector construction
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArgvConfig {
    pub program_name: Option<String>,
    pub representation: Option<RepresentationMode>,
}

impl Default for ArgvConfig {
    fn default() -> Self {
        Self {
            program_name: Some(DEFAULT_PROGRAM_NAME.to_string()),
            representation: Some(RepresentationMode::Auto),
        }
    }
}

/// `[tool]` section: where the embedded tool lives
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    pub library: Option<PathBuf>,
    pub entry: Option<String>,
    pub capture_hook: Option<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            library: None,
            entry: Some(DEFAULT_ENTRY_SYMBOL.to_string()),
            capture_hook: None,
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            verbose: Some(false),
        }
    }
}

/// Effective configuration for inproc.
///
/// Built by [`Config::discover`] with precedence CLI > config file > defaults.
///
/// # Configuration File Format
///
/// ```toml
/// [capture]
/// stdout_initial_bytes = 65536
/// stderr_initial_bytes = 16384
/// stdout_max_bytes = 8388608
///
/// [argv]
/// program_name = "tool"
/// representation = "auto"
///
/// [tool]
/// library = "target/release/libtool.so"
/// entry = "tool_main"
/// capture_hook = "tool_set_capture_hook"
///
/// [logging]
/// verbose = false
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub argv: ArgvConfig,
    pub tool: ToolConfig,
    pub logging: LoggingConfig,
    /// File the values were loaded from, if any.
    pub config_path: Option<PathBuf>,
    /// Source attribution for each setting (for `inproc config`).
    pub source_attribution: HashMap<String, ConfigSource>,
}

impl Config {
    /// Buffer sizing for the runner, falling back to runner defaults.
    ///
    /// An initial capacity larger than its stream's ceiling is clamped to
    /// the ceiling.
    #[must_use]
    pub fn runner_config(&self) -> RunnerConfig {
        let defaults = RunnerConfig::default();
        let capture = &self.capture;
        let clamp = |initial: usize, max: Option<usize>| max.map_or(initial, |m| initial.min(m));
        RunnerConfig {
            stdout_initial_bytes: clamp(
                capture
                    .stdout_initial_bytes
                    .unwrap_or(defaults.stdout_initial_bytes),
                capture.stdout_max_bytes,
            ),
            stderr_initial_bytes: clamp(
                capture
                    .stderr_initial_bytes
                    .unwrap_or(defaults.stderr_initial_bytes),
                capture.stderr_max_bytes,
            ),
            stdout_max_bytes: capture.stdout_max_bytes,
            stderr_max_bytes: capture.stderr_max_bytes,
        }
    }

    /// The `argv` representation after resolving `auto`.
    #[must_use]
    pub fn representation(&self) -> Representation {
        self.argv.representation.unwrap_or_default().resolve()
    }

    #[must_use]
    pub fn program_name(&self) -> &str {
        self.argv.program_name.as_deref().unwrap_or(DEFAULT_PROGRAM_NAME)
    }

    #[must_use]
    pub fn entry_symbol(&self) -> &str {
        self.tool.entry.as_deref().unwrap_or(DEFAULT_ENTRY_SYMBOL)
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.logging.verbose.unwrap_or(false)
    }
}
