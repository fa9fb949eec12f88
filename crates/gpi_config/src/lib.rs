//! Loading of the process-wide GPI configuration.
//!
//! The configuration is small: a list of extra libraries whose entry points
//! register additional backends at startup, and an optional log-level
//! override. It can come from a TOML file, from the `GPI_EXTRA` and
//! `GPI_LOG_LEVEL` environment variables, or both (environment wins).

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{
    apply_env_overrides, config_from_env, load_config, load_config_from_str, parse_extra_libs,
    ENV_EXTRA, ENV_LOG_LEVEL,
};
pub use types::{ExtraLibrary, GpiConfig, LogLevel, DEFAULT_ENTRY_POINT};
