use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli_args::CliArgs;
use crate::error::ConfigError;
use crate::model::{ArgvConfig, CaptureConfig, Config, ConfigSource, LoggingConfig, ToolConfig};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "INPROC_CONFIG";

/// Directory searched for during upward discovery
pub const CONFIG_DIR: &str = ".inproc";

/// File name inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "config.toml";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    capture: Option<CaptureConfig>,
    argv: Option<ArgvConfig>,
    tool: Option<ToolConfig>,
    logging: Option<LoggingConfig>,
}

/// Applies one configuration layer, recording where each value came from
struct Overlay<'a> {
    source: ConfigSource,
    attribution: &'a mut HashMap<String, ConfigSource>,
}

impl Overlay<'_> {
    fn set<T>(&mut self, key: &str, target: &mut Option<T>, value: Option<T>) {
        if value.is_some() {
            *target = value;
            self.attribution.insert(key.to_string(), self.source.clone());
        }
    }
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Uses the current working directory for config file discovery when
    /// neither `--config` nor `INPROC_CONFIG` names a file.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = env::current_dir().context("Failed to get current directory")?;
        let env_path = env::var_os(CONFIG_ENV_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        Self::discover_from(&start_dir, env_path, cli_args)
    }

    /// Discover and load configuration starting from a specific directory.
    ///
    /// `env_path` stands in for the `INPROC_CONFIG` variable so tests need
    /// not touch process-global state.
    pub fn discover_from(
        start_dir: &Path,
        env_path: Option<PathBuf>,
        cli_args: &CliArgs,
    ) -> Result<Self> {
        let mut config = Config::default();
        let attribution = &mut config.source_attribution;
        for key in [
            "stdout_initial_bytes",
            "stderr_initial_bytes",
            "program_name",
            "representation",
            "entry",
            "verbose",
        ] {
            attribution.insert(key.to_string(), ConfigSource::Default);
        }

        let config_path = match (&cli_args.config_path, env_path) {
            (Some(explicit), _) => Some(explicit.clone()),
            (None, Some(from_env)) => Some(from_env),
            (None, None) => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            let file = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            debug!(path = %path.display(), "Loaded configuration file");
            config.apply_file(file, ConfigSource::ConfigFile(path.clone()));
        }
        config.config_path = config_path;

        config.apply_cli(cli_args);
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: TomlConfig, source: ConfigSource) {
        let mut overlay = Overlay {
            source,
            attribution: &mut self.source_attribution,
        };

        if let Some(capture) = file.capture {
            overlay.set(
                "stdout_initial_bytes",
                &mut self.capture.stdout_initial_bytes,
                capture.stdout_initial_bytes,
            );
            overlay.set(
                "stderr_initial_bytes",
                &mut self.capture.stderr_initial_bytes,
                capture.stderr_initial_bytes,
            );
            overlay.set(
                "stdout_max_bytes",
                &mut self.capture.stdout_max_bytes,
                capture.stdout_max_bytes,
            );
            overlay.set(
                "stderr_max_bytes",
                &mut self.capture.stderr_max_bytes,
                capture.stderr_max_bytes,
            );
        }

        if let Some(argv) = file.argv {
            overlay.set("program_name", &mut self.argv.program_name, argv.program_name);
            overlay.set("representation", &mut self.argv.representation, argv.representation);
        }

        if let Some(tool) = file.tool {
            overlay.set("library", &mut self.tool.library, tool.library);
            overlay.set("entry", &mut self.tool.entry, tool.entry);
            overlay.set("capture_hook", &mut self.tool.capture_hook, tool.capture_hook);
        }

        if let Some(logging) = file.logging {
            overlay.set("verbose", &mut self.logging.verbose, logging.verbose);
        }
    }

    fn apply_cli(&mut self, cli: &CliArgs) {
        let mut overlay = Overlay {
            source: ConfigSource::Cli,
            attribution: &mut self.source_attribution,
        };

        overlay.set(
            "stdout_initial_bytes",
            &mut self.capture.stdout_initial_bytes,
            cli.stdout_initial_bytes,
        );
        overlay.set(
            "stderr_initial_bytes",
            &mut self.capture.stderr_initial_bytes,
            cli.stderr_initial_bytes,
        );
        overlay.set("stdout_max_bytes", &mut self.capture.stdout_max_bytes, cli.stdout_max_bytes);
        overlay.set("stderr_max_bytes", &mut self.capture.stderr_max_bytes, cli.stderr_max_bytes);
        overlay.set("program_name", &mut self.argv.program_name, cli.program_name.clone());
        overlay.set("representation", &mut self.argv.representation, cli.representation);
        overlay.set("library", &mut self.tool.library, cli.library.clone());
        overlay.set("entry", &mut self.tool.entry, cli.entry.clone());
        overlay.set("capture_hook", &mut self.tool.capture_hook, cli.capture_hook.clone());
        overlay.set("verbose", &mut self.logging.verbose, cli.verbose);
    }

    /// Search upward from `start_dir` for `.inproc/config.toml`.
    ///
    /// Stops at a directory containing `.git` or at the filesystem root.
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = start_dir;
        loop {
            let config_path = current_dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.is_file() {
                return Some(config_path);
            }
            if current_dir.join(".git").exists() {
                return None;
            }
            current_dir = current_dir.parent()?;
        }
    }

    /// Load configuration from a TOML file
    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&content).map_err(|e| ConfigError::InvalidFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }
}
