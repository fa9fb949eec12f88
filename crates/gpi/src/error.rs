//! Error types for the GPI core.
//!
//! [`GpiError`] covers recoverable failures (resolution, registration,
//! value writes, configuration). [`ProtocolViolation`] covers broken
//! control-transfer invariants, which the trampoline treats as fatal.
//! [`CallbackError`] is what a scheduler function returns to request an
//! orderly end of simulation.

use gpi_config::ConfigError;

use crate::callback::CallbackState;
use crate::handle::ObjectType;

/// Recoverable GPI failures.
#[derive(Debug, thiserror::Error)]
pub enum GpiError {
    /// A backend with the same name is already registered.
    #[error("backend '{0}' is already registered")]
    DuplicateBackend(String),

    /// No backend has been registered yet.
    #[error("no backend is registered")]
    NoBackend,

    /// The context was torn down.
    #[error("GPI context has been shut down")]
    ShutDown,

    /// A handle ID did not name a cached object.
    #[error("unknown object handle")]
    UnknownHandle,

    /// A value-change subscription or value access targeted a non-value object.
    #[error("'{name}' ({object_type}) does not carry a value")]
    NotASignal {
        /// Fully-qualified name of the object.
        name: String,
        /// Its classification.
        object_type: ObjectType,
    },

    /// A write targeted a constant object.
    #[error("'{0}' is constant")]
    ConstantObject(String),

    /// The backend's registration call failed.
    #[error("backend '{backend}' failed to register {reason} callback")]
    RegistrationFailed {
        /// Backend name.
        backend: String,
        /// Callback kind.
        reason: &'static str,
    },

    /// The backend could not remove a registration.
    #[error("backend '{backend}' failed to remove callback: {reason}")]
    DeregistrationFailed {
        /// Backend name.
        backend: String,
        /// Backend-provided detail.
        reason: String,
    },

    /// A callback state transition was attempted from the wrong state.
    #[error("cannot {action} a callback in state {from}")]
    InvalidTransition {
        /// State the callback was in.
        from: CallbackState,
        /// The attempted transition.
        action: &'static str,
    },

    /// A callback ID no longer names a live callback.
    #[error("stale callback handle")]
    StaleCallback,

    /// A process-scoped singleton callback was registered twice.
    #[error("{0} callback is already registered")]
    SingletonRegistered(&'static str),

    /// The backend refused a value write.
    #[error("backend rejected value for '{name}': {reason}")]
    ValueRejected {
        /// Fully-qualified name of the target.
        name: String,
        /// Backend-provided detail.
        reason: String,
    },

    /// An extra library's entry point is not known to the resolver.
    #[error("no entry point '{entry}' in library '{library}'")]
    EntryPointNotFound {
        /// Library name.
        library: String,
        /// Entry-point symbol.
        entry: String,
    },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Broken control-transfer invariants. These never happen under correct
/// single-threaded cooperative use.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    /// The engine handed back user data that was never issued.
    #[error("corrupted callback user data {0:#x}")]
    CorruptUserData(u64),

    /// The engine fired a callback whose handle was already deallocated.
    #[error("callback {0:#x} fired after deallocation")]
    StaleFire(u64),

    /// The engine fired a callback that was never armed.
    #[error("callback {0:#x} fired while not armed")]
    UnarmedFire(u64),

    /// Control was handed to the scheduler while it already had it.
    #[error("entered scheduler context while already inside it")]
    ReentrantEntry,

    /// Control was handed back to the engine while it already had it.
    #[error("returned to engine context while not inside the scheduler")]
    UnbalancedExit,
}

/// Failure reported by a scheduler callback function.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("scheduler callback failed: {message}")]
pub struct CallbackError {
    /// Description of the failure.
    pub message: String,
}

impl CallbackError {
    /// Creates a new callback error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
