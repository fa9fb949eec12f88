//! Logging setup and severity mapping.
//!
//! All GPI crates log through the `log` facade under `gpi::*` targets. The
//! sink is `env_logger`, installed once per process by [`init`].

use std::io::Write;

use gpi_config::{GpiConfig, LogLevel};
use log::LevelFilter;

use crate::error::ProtocolViolation;

/// Severity a backend attaches to a message it reports about itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DiagnosticSeverity {
    /// Informational.
    Info,
    /// Something unexpected that the engine recovered from.
    Warning,
    /// An operation failed.
    Error,
    /// The engine is in trouble.
    Critical,
}

/// Maps a configured level onto a `log` filter.
pub fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Trace => LevelFilter::Trace,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Warning => LevelFilter::Warn,
        LogLevel::Error | LogLevel::Critical => LevelFilter::Error,
    }
}

/// Installs the process logger. The configured level overrides `RUST_LOG`.
/// Calling this again after a logger is installed does nothing.
pub fn init(config: &GpiConfig) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = config.log_level {
        builder.filter_level(level_filter(level));
    }
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{} {}] {}",
            record.level(),
            record.target(),
            record.args()
        )
    });
    if builder.try_init().is_err() {
        log::debug!(target: "gpi", "logger already installed");
    }
}

/// Logs a message the backend reported about itself. Execution continues.
pub fn log_backend_diagnostic(backend: &str, severity: DiagnosticSeverity, message: &str) {
    match severity {
        DiagnosticSeverity::Info => log::info!(target: "gpi::backend", "{backend}: {message}"),
        DiagnosticSeverity::Warning => log::warn!(target: "gpi::backend", "{backend}: {message}"),
        DiagnosticSeverity::Error => log::error!(target: "gpi::backend", "{backend}: {message}"),
        DiagnosticSeverity::Critical => {
            log::error!(target: "gpi::backend", "CRITICAL {backend}: {message}")
        }
    }
}

/// Logs a protocol violation at critical severity and terminates the process.
pub fn fatal(violation: &ProtocolViolation) -> ! {
    log::error!(target: "gpi", "CRITICAL protocol violation: {violation}");
    log::logger().flush();
    std::process::abort()
}
