//! Command implementations

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::{self, Write};

use inproc_argv::ArgumentMarshaller;
use inproc_config::{Config, ConfigError};
use inproc_runner::{InvocationResult, Runner, ToolLibrary};
use inproc_utils::ExitCode;
use tracing::{debug, warn};

/// Load the configured tool, invoke it once and report the outcome.
///
/// Returns the tool's exit code (or the conversion failure code).
pub(super) fn execute_run_command(
    config: &Config,
    args: &[OsString],
    json: bool,
) -> Result<ExitCode> {
    let library_path = config.tool.library.as_ref().ok_or_else(|| {
        ConfigError::MissingRequired(
            "tool library (pass --library or set [tool] library)".to_string(),
        )
    })?;

    let library = ToolLibrary::open(library_path)?;

    if let Some(hook) = &config.tool.capture_hook {
        // SAFETY: the configured hook export takes a single write callback.
        unsafe { library.register_capture_hook(hook) }
            .context("Failed to register capture hook")?;
    }

    let representation = config.representation();
    // SAFETY: the configured entry symbol is the tool's main-style export for
    // the configured representation; `library` outlives `runner`.
    let entry = unsafe { library.entry_point(config.entry_symbol(), representation) }
        .context("Failed to resolve entry point")?;
    debug!(
        symbol = config.entry_symbol(),
        representation = %representation,
        "Resolved entry point"
    );

    let mut runner = Runner::with_config(entry, config.runner_config())
        .with_marshaller(ArgumentMarshaller::new(config.program_name()));
    let result = runner.run_serialized(args.iter().map(|arg| arg.as_encoded_bytes()));
    drop(runner);
    drop(library);

    if json {
        let rendered =
            serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
        println!("{rendered}");
    } else {
        replay_output(&result)?;
        if let Some(error) = &result.conversion_error {
            eprintln!("✗ Tool not invoked: {error}");
        }
    }

    if result.output_truncated() {
        warn!(
            stdout_dropped_bytes = result.stdout_dropped_bytes,
            stderr_dropped_bytes = result.stderr_dropped_bytes,
            "Captured output was truncated"
        );
    }

    Ok(ExitCode::from_i32(result.exit_code))
}

/// Write captured bytes to the real streams, unmodified.
fn replay_output(result: &InvocationResult) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(&result.stdout)
        .and_then(|()| stdout.flush())
        .context("Failed to write captured stdout")?;

    let mut stderr = io::stderr().lock();
    stderr
        .write_all(&result.stderr)
        .and_then(|()| stderr.flush())
        .context("Failed to write captured stderr")?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct ConfigValue {
    value: String,
    source: String,
}

#[derive(Debug, Serialize)]
struct ConfigOutput {
    config_path: Option<String>,
    effective_config: BTreeMap<String, ConfigValue>,
}

fn config_output(config: &Config) -> ConfigOutput {
    ConfigOutput {
        config_path: config
            .config_path
            .as_ref()
            .map(|path| path.display().to_string()),
        effective_config: config
            .effective_config()
            .into_iter()
            .map(|(key, (value, source))| (key, ConfigValue { value, source }))
            .collect(),
    }
}

/// Print the effective configuration.
pub(super) fn execute_config_command(config: &Config, json: bool) -> Result<()> {
    let output = config_output(config);

    if json {
        let rendered =
            serde_json::to_string_pretty(&output).context("Failed to serialize configuration")?;
        println!("{rendered}");
        return Ok(());
    }

    match &output.config_path {
        Some(path) => println!("Configuration file: {path}"),
        None => println!("Configuration file: (none, using defaults)"),
    }
    println!();

    let width = output
        .effective_config
        .keys()
        .map(String::len)
        .max()
        .unwrap_or(0);
    for (key, entry) in &output.effective_config {
        println!("  {key:<width$} = {}  [{}]", entry.value, entry.source);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use inproc_config::ConfigSource;
    use std::path::PathBuf;

    #[test]
    fn test_run_without_library_is_a_config_error() {
        let config = Config::default();
        let err = execute_run_command(&config, &[], false).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
        assert!(err.to_string().contains("--library"));
    }

    #[test]
    fn test_run_with_missing_library_fails_to_load() {
        let mut config = Config::default();
        config.tool.library = Some(PathBuf::from("/definitely/not/here/libtool.so"));
        let err = execute_run_command(&config, &[], true).unwrap_err();
        let runner_error = err.downcast_ref::<inproc_runner::RunnerError>().unwrap();
        assert_eq!(runner_error.exit_code(), ExitCode::LIBRARY_LOAD);
    }

    #[test]
    fn test_config_output_carries_sources() {
        let mut config = Config::default();
        config.config_path = Some(PathBuf::from("/repo/.inproc/config.toml"));
        config.argv.program_name = Some("curl".to_string());
        config.source_attribution.insert(
            "program_name".to_string(),
            ConfigSource::ConfigFile(PathBuf::from("/repo/.inproc/config.toml")),
        );

        let output = config_output(&config);
        assert_eq!(
            output.config_path.as_deref(),
            Some("/repo/.inproc/config.toml")
        );
        let name = &output.effective_config["program_name"];
        assert_eq!(name.value, "curl");
        assert_eq!(name.source, "config");

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["effective_config"]["entry"]["value"], "tool_main");
        assert_eq!(json["effective_config"]["entry"]["source"], "default");
    }
}
