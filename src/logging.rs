//! Console and file logging.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{PipelineError, Result};

/// Width of banner lines
pub const SEPARATOR_WIDTH: usize = 80;

/// `pipeline_YYYYMMDD_HHMMSS.log`
pub fn log_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("pipeline_{}.log", now.format("%Y%m%d_%H%M%S"))
}

/// Install the global subscriber: console at INFO (DEBUG when verbose,
/// `RUST_LOG` wins when set) and a plain DEBUG log file in `log_dir`.
///
/// Returns the log file path.
pub fn init(log_dir: &Path, verbose: bool) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)?;
    let path = log_dir.join(log_file_name(chrono::Local::now()));
    let file = File::create(&path)?;

    let default_level = if verbose { "debug" } else { "info" };
    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let console = fmt::layer().with_target(false).with_filter(console_filter);
    let logfile = fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(console)
        .with(logfile)
        .try_init()
        .map_err(|e| PipelineError::generic(format!("failed to initialize logging: {}", e)))?;

    Ok(path)
}

/// Console-only logging for the helper binaries
pub fn init_console(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

/// `title` centred in a line of the separator width, padded with spaces
pub fn centered(title: &str, width: usize) -> String {
    let len = title.chars().count();
    if len >= width {
        return title.to_string();
    }
    let left = (width - len) / 2;
    format!("{}{}", " ".repeat(left), title)
}

/// Log a `=` rule, optionally with a centred title and a closing rule
pub fn log_separator(title: Option<&str>) {
    let rule = "=".repeat(SEPARATOR_WIDTH);
    info!("{}", rule);
    if let Some(title) = title {
        info!("{}", centered(title, SEPARATOR_WIDTH));
        info!("{}", rule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_file_name() {
        let at = chrono::Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap();
        assert_eq!(log_file_name(at), "pipeline_20240309_070502.log");
    }

    #[test]
    fn test_centered() {
        assert_eq!(centered("ab", 10), "    ab");
        assert_eq!(centered("abc", 10), "   abc");
        assert_eq!(centered("too long", 4), "too long");
    }
}
