use std::path::PathBuf;

use crate::model::RepresentationMode;

/// Overrides supplied on the command line.
///
/// Every `None` leaves the config file or default value in place.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub library: Option<PathBuf>,
    pub entry: Option<String>,
    pub capture_hook: Option<String>,
    pub representation: Option<RepresentationMode>,
    pub program_name: Option<String>,
    pub stdout_initial_bytes: Option<usize>,
    pub stderr_initial_bytes: Option<usize>,
    pub stdout_max_bytes: Option<usize>,
    pub stderr_max_bytes: Option<usize>,
    pub verbose: Option<bool>,
}
