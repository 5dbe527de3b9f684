use std::collections::BTreeMap;

use crate::model::{Config, ConfigSource};

impl Config {
    /// Effective configuration as key -> (value, source label).
    ///
    /// Unset optional values are omitted.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add_config = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                let source = self
                    .source_attribution
                    .get(key)
                    .unwrap_or(&ConfigSource::Default)
                    .label()
                    .to_string();
                config.insert(key.to_string(), (value, source));
            }
        };

        let capture = &self.capture;
        let runner = self.runner_config();
        add_config(
            "stdout_initial_bytes",
            capture
                .stdout_initial_bytes
                .map(|_| runner.stdout_initial_bytes.to_string()),
        );
        add_config(
            "stderr_initial_bytes",
            capture
                .stderr_initial_bytes
                .map(|_| runner.stderr_initial_bytes.to_string()),
        );
        add_config("stdout_max_bytes", capture.stdout_max_bytes.map(|n| n.to_string()));
        add_config("stderr_max_bytes", capture.stderr_max_bytes.map(|n| n.to_string()));

        add_config("program_name", self.argv.program_name.clone());
        add_config("representation", self.argv.representation.map(|r| r.to_string()));

        add_config("library", self.tool.library.as_ref().map(|p| p.display().to_string()));
        add_config("entry", self.tool.entry.clone());
        add_config("capture_hook", self.tool.capture_hook.clone());

        add_config("verbose", self.logging.verbose.map(|v| v.to_string()));

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_effective_config_defaults() {
        let config = Config::default();
        let effective = config.effective_config();

        assert_eq!(
            effective.get("stdout_initial_bytes"),
            Some(&("65536".to_string(), "default".to_string()))
        );
        assert_eq!(
            effective.get("representation"),
            Some(&("auto".to_string(), "default".to_string()))
        );
        assert!(!effective.contains_key("library"));
        assert!(!effective.contains_key("stdout_max_bytes"));
    }

    #[test]
    fn test_effective_config_shows_clamped_initial_capacity() {
        let mut config = Config::default();
        config.capture.stderr_max_bytes = Some(1024);
        let effective = config.effective_config();
        assert_eq!(
            effective.get("stderr_initial_bytes"),
            Some(&("1024".to_string(), "default".to_string()))
        );
    }

    #[test]
    fn test_effective_config_reports_sources() {
        let mut config = Config::default();
        config.tool.library = Some(PathBuf::from("libtool.so"));
        config
            .source_attribution
            .insert("library".to_string(), ConfigSource::Cli);
        config.argv.program_name = Some("curl".to_string());
        config.source_attribution.insert(
            "program_name".to_string(),
            ConfigSource::ConfigFile(PathBuf::from("/repo/.inproc/config.toml")),
        );

        let effective = config.effective_config();
        assert_eq!(
            effective.get("library"),
            Some(&("libtool.so".to_string(), "cli".to_string()))
        );
        assert_eq!(
            effective.get("program_name"),
            Some(&("curl".to_string(), "config".to_string()))
        );
    }
}
