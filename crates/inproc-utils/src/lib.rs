pub mod exit_codes;
pub mod logging;

pub use exit_codes::ExitCode;
