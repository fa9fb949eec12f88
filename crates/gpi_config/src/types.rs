//! Configuration types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Entry point assumed for an extra library listed without an explicit one.
pub const DEFAULT_ENTRY_POINT: &str = "gpi_entry_point";

/// The process-wide GPI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpiConfig {
    /// Libraries whose entry points run at startup, in order, after the
    /// statically linked backend has been registered.
    #[serde(default)]
    pub extra_libs: Vec<ExtraLibrary>,
    /// Overrides the default log level when set.
    #[serde(default)]
    pub log_level: Option<LogLevel>,
}

/// One extra library to load at startup and the symbol to invoke in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraLibrary {
    /// Library name or path.
    pub library: String,
    /// Entry-point symbol.
    #[serde(default = "default_entry")]
    pub entry: String,
}

impl ExtraLibrary {
    /// Creates an entry with an explicit entry-point symbol.
    pub fn new(library: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            entry: entry.into(),
        }
    }
}

impl fmt::Display for ExtraLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.library, self.entry)
    }
}

fn default_entry() -> String {
    DEFAULT_ENTRY_POINT.to_string()
}

/// GPI log severities, most verbose first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Fine-grained tracing of every interface call.
    Trace,
    /// Debugging detail.
    Debug,
    /// Normal operational messages.
    Info,
    /// Recoverable anomalies.
    #[serde(alias = "warn")]
    Warning,
    /// Failures of a single operation.
    Error,
    /// Failures that end the process.
    Critical,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            _ => Err(ConfigError::UnknownLogLevel(s.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parse() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!(" critical ".parse::<LogLevel>().unwrap(), LogLevel::Critical);
        assert!(matches!(
            "chatty".parse::<LogLevel>(),
            Err(ConfigError::UnknownLogLevel(_))
        ));
    }

    #[test]
    fn log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Info);
        assert!(LogLevel::Error < LogLevel::Critical);
    }

    #[test]
    fn extra_library_display() {
        let lib = ExtraLibrary::new("libvhpi", "vhpi_entry");
        assert_eq!(lib.to_string(), "libvhpi:vhpi_entry");
    }

    #[test]
    fn serde_roundtrip() {
        let config = GpiConfig {
            extra_libs: vec![ExtraLibrary::new("a", "b")],
            log_level: Some(LogLevel::Warning),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"warning\""));
        let back: GpiConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
