//! Configuration for inproc
//!
//! Values come from three layers with precedence CLI > config file >
//! built-in defaults, and every value remembers which layer set it.

mod cli_args;
mod discovery;
mod error;
mod model;
mod sources;
mod validation;

pub use cli_args::CliArgs;
pub use discovery::{CONFIG_DIR, CONFIG_ENV_VAR, CONFIG_FILE};
pub use error::ConfigError;
pub use model::{
    ArgvConfig, CaptureConfig, Config, ConfigSource, DEFAULT_ENTRY_SYMBOL, LoggingConfig,
    RepresentationMode, ToolConfig,
};
