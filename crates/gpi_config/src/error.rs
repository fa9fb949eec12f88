//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a GPI configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A log level string was not one of the known levels.
    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),

    /// An extra-library entry was malformed.
    #[error("invalid extra library entry '{0}'")]
    InvalidExtraLibrary(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_log_level() {
        let err = ConfigError::UnknownLogLevel("loud".to_string());
        assert_eq!(format!("{err}"), "unknown log level 'loud'");
    }

    #[test]
    fn display_invalid_extra_library() {
        let err = ConfigError::InvalidExtraLibrary(":entry".to_string());
        assert_eq!(format!("{err}"), "invalid extra library entry ':entry'");
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::IoError(io_err);
        assert!(format!("{err}").starts_with("failed to read configuration:"));
    }
}
