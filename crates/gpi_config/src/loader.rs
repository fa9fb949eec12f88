//! Configuration file and environment loading.

use crate::error::ConfigError;
use crate::types::{ExtraLibrary, GpiConfig, LogLevel, DEFAULT_ENTRY_POINT};
use std::path::Path;

/// Environment variable listing extra libraries (`lib[:entry],...`).
pub const ENV_EXTRA: &str = "GPI_EXTRA";
/// Environment variable overriding the log level.
pub const ENV_LOG_LEVEL: &str = "GPI_LOG_LEVEL";

/// Loads and validates a configuration file.
pub fn load_config(path: &Path) -> Result<GpiConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a TOML string.
pub fn load_config_from_str(content: &str) -> Result<GpiConfig, ConfigError> {
    let config: GpiConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Builds a configuration from the process environment alone.
pub fn config_from_env() -> Result<GpiConfig, ConfigError> {
    apply_env_overrides(GpiConfig::default(), |key| std::env::var(key).ok())
}

/// Overlays the environment onto `config`.
///
/// `GPI_EXTRA` entries are appended after any file-configured libraries;
/// `GPI_LOG_LEVEL` replaces the configured level. `lookup` abstracts the
/// environment so callers can inject values.
pub fn apply_env_overrides(
    mut config: GpiConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<GpiConfig, ConfigError> {
    if let Some(extra) = lookup(ENV_EXTRA) {
        config.extra_libs.extend(parse_extra_libs(&extra)?);
    }
    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        if !level.trim().is_empty() {
            config.log_level = Some(level.parse::<LogLevel>()?);
        }
    }
    validate_config(&config)?;
    Ok(config)
}

/// Parses the `GPI_EXTRA` syntax: comma-separated `library[:entry]` items.
///
/// Empty items are ignored. An item without an entry point gets
/// [`DEFAULT_ENTRY_POINT`].
pub fn parse_extra_libs(spec: &str) -> Result<Vec<ExtraLibrary>, ConfigError> {
    let mut libs = Vec::new();
    for item in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        // Split on the last colon so Windows drive letters survive.
        let (library, entry) = match item.rsplit_once(':') {
            Some((lib, entry)) if lib.len() != 1 => (lib, entry),
            _ => (item, DEFAULT_ENTRY_POINT),
        };
        if library.is_empty() || entry.is_empty() {
            return Err(ConfigError::InvalidExtraLibrary(item.to_string()));
        }
        libs.push(ExtraLibrary::new(library, entry));
    }
    Ok(libs)
}

fn validate_config(config: &GpiConfig) -> Result<(), ConfigError> {
    for lib in &config.extra_libs {
        if lib.library.trim().is_empty() || lib.entry.trim().is_empty() {
            return Err(ConfigError::InvalidExtraLibrary(lib.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parse_minimal_config() {
        let config = load_config_from_str("").unwrap();
        assert!(config.extra_libs.is_empty());
        assert!(config.log_level.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
log_level = "debug"

[[extra_libs]]
library = "libgpi_vhpi"
entry = "vhpi_entry_point"

[[extra_libs]]
library = "libextra"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.log_level, Some(LogLevel::Debug));
        assert_eq!(config.extra_libs.len(), 2);
        assert_eq!(config.extra_libs[0].entry, "vhpi_entry_point");
        assert_eq!(config.extra_libs[1].entry, DEFAULT_ENTRY_POINT);
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn empty_library_name_rejected() {
        let toml = r#"
[[extra_libs]]
library = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidExtraLibrary(_)));
    }

    #[test]
    fn parse_extra_libs_forms() {
        let libs = parse_extra_libs("liba:entry_a, libb ,,").unwrap();
        assert_eq!(libs.len(), 2);
        assert_eq!(libs[0], ExtraLibrary::new("liba", "entry_a"));
        assert_eq!(libs[1], ExtraLibrary::new("libb", DEFAULT_ENTRY_POINT));
    }

    #[test]
    fn parse_extra_libs_keeps_drive_letter() {
        let libs = parse_extra_libs(r"C:\sim\libvhpi.dll").unwrap();
        assert_eq!(libs[0].library, r"C:\sim\libvhpi.dll");
        assert_eq!(libs[0].entry, DEFAULT_ENTRY_POINT);
    }

    #[test]
    fn parse_extra_libs_rejects_missing_parts() {
        let err = parse_extra_libs("liba:").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidExtraLibrary(_)));
        let err = parse_extra_libs(":entry").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidExtraLibrary(_)));
    }

    #[test]
    fn env_overrides_append_and_replace() {
        let base = load_config_from_str(
            r#"
log_level = "info"
[[extra_libs]]
library = "from_file"
"#,
        )
        .unwrap();
        let config = apply_env_overrides(
            base,
            env(&[(ENV_EXTRA, "from_env:go"), (ENV_LOG_LEVEL, "error")]),
        )
        .unwrap();
        assert_eq!(config.log_level, Some(LogLevel::Error));
        let names: Vec<_> = config.extra_libs.iter().map(|l| l.library.as_str()).collect();
        assert_eq!(names, vec!["from_file", "from_env"]);
    }

    #[test]
    fn env_bad_log_level_errors() {
        let err =
            apply_env_overrides(GpiConfig::default(), env(&[(ENV_LOG_LEVEL, "noisy")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLogLevel(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"trace\"").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.log_level, Some(LogLevel::Trace));
    }

    #[test]
    fn io_error_from_missing_file() {
        let err = load_config(Path::new("/nonexistent/gpi.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
