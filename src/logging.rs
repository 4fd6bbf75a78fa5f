/*!
 * Logging and tracing initialization
 *
 * Stdout carries lookup results, so human-readable logs go to stderr.
 */

use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LogLevel;
use crate::error::{Result, StatError};

/// Environment variable that overrides the computed filter
pub const LOG_ENV: &str = "W3STAT_LOG";

/// Logging options collected from config and flags
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub level: LogLevel,
    pub verbose: bool,
    pub file: Option<PathBuf>,
}

impl LogOptions {
    /// Effective level; `verbose` forces debug
    pub fn effective_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else {
            self.level.to_tracing_level()
        }
    }

    /// Filter directive used when `W3STAT_LOG` is unset
    pub fn default_directive(&self) -> String {
        format!("w3stat={}", self.effective_level())
    }
}

/// Initialize structured logging
pub fn init_logging(options: &LogOptions) -> Result<()> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(options.default_directive()))
        .map_err(|e| StatError::Config(format!("Failed to create log filter: {}", e)))?;

    if let Some(ref log_path) = options.file {
        init_file_logging(log_path, env_filter)?;
    } else {
        init_stderr_logging(env_filter);
    }

    Ok(())
}

/// Compact human logs on stderr
fn init_stderr_logging(env_filter: EnvFilter) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// JSON logs to a file
fn init_file_logging(log_path: &Path, env_filter: EnvFilter) -> Result<()> {
    let file = File::create(log_path)
        .map_err(|e| StatError::Config(format!("Failed to create log file: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(file)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
