//! Logging setup for readpace binaries.

use crate::{ConfigResult, Paths};
use observability::LogConfig;
use std::path::PathBuf;

/// Service name stamped on every log line.
pub const SERVICE_NAME: &str = "readpace";

/// Build the logging configuration for a run.
pub fn log_config(level: &str, paths: &Paths, also_stderr: bool) -> LogConfig {
    LogConfig {
        service_name: SERVICE_NAME.into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        also_stderr,
        stderr_level: level.into(),
        ..Default::default()
    }
}

/// Initialize logging to `paths.log_file()`, optionally mirrored to stderr.
///
/// Returns the log file path.
pub fn init_logging(level: &str, paths: &Paths, also_stderr: bool) -> ConfigResult<PathBuf> {
    paths.ensure_dirs()?;
    Ok(observability::init_with_config(log_config(
        level,
        paths,
        also_stderr,
    ))?)
}
