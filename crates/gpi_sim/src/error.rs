//! Error types for design construction and simulation runs.

use std::io;
use std::path::PathBuf;

/// Errors raised while building a design or running it.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Two objects in one scope share a name.
    #[error("duplicate object '{0}'")]
    DuplicateObject(String),

    /// A description named an object that does not exist.
    #[error("unknown object '{0}'")]
    UnknownObject(String),

    /// A stimulus or initial value does not fit the object's type.
    #[error("value '{value}' does not fit '{name}'")]
    BadValue {
        /// Full name of the object.
        name: String,
        /// The offending value text.
        value: String,
    },

    /// A design description could not be understood.
    #[error("invalid design description: {0}")]
    InvalidDescription(String),

    /// The delta-cycle limit was hit within one time step.
    #[error("delta cycle limit ({max_deltas}) exceeded at tick {ticks}")]
    DeltaCycleLimit {
        /// The time step, in precision ticks.
        ticks: u64,
        /// The configured limit.
        max_deltas: u32,
    },

    /// A design description file could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// A design description file is not valid TOML.
    #[error("failed to parse design description: {0}")]
    Toml(#[from] toml::de::Error),
}
