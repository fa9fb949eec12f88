//! The contract every procedural-interface adapter implements.
//!
//! A [`Backend`] resolves objects, registers callbacks, reads and writes
//! values, and answers simulation-control queries against one engine
//! interface. It builds [`ObjectHandle`]s but never caches them: the
//! dispatcher adopts and deduplicates whatever a backend returns.

use crate::error::GpiError;
use crate::handle::ObjectHandle;
use crate::iterator::{BackendIterator, IterSelector};
use crate::native::NativeRef;

/// A callback registration request as a backend sees it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CallbackReason {
    /// After `delay` precision ticks.
    Timed {
        /// Delay in engine precision ticks.
        delay: u64,
    },
    /// Read-only synchronisation phase.
    ReadOnly,
    /// Read-write synchronisation phase.
    ReadWrite,
    /// Start of the next time step.
    NextTime,
    /// Any value change on `signal`.
    ValueChange {
        /// The signal's native reference.
        signal: NativeRef,
    },
    /// Start of simulation.
    StartOfSimulation,
    /// End of simulation.
    EndOfSimulation,
}

/// Outcome of asking a backend to drop a registration.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Deregistration {
    /// The registration is gone.
    Removed,
    /// The engine refused for now (typically mid-fire) and will retire the
    /// registration itself; finish with [`Backend::release_matured`].
    Deferred,
}

/// How a value write is applied.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum SetAction {
    /// Schedule the value as an ordinary deposit in the current time step.
    #[default]
    Deposit,
    /// Apply the value immediately, without scheduling.
    NoDelay,
    /// Force the value until released.
    Force,
    /// Release a previous force.
    Release,
}

/// Encoding requested for a value read.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ValueFormat {
    /// Binary string, most significant bit first.
    BinStr,
    /// Character string.
    Str,
    /// Floating point.
    Real,
    /// Integer.
    Int,
}

/// A value read from or written to a signal.
#[derive(Clone, PartialEq, Debug)]
pub enum SignalValue {
    /// Binary string, most significant bit first.
    BinStr(String),
    /// Character string.
    Str(String),
    /// Floating point.
    Real(f64),
    /// Integer.
    Int(i64),
}

impl SignalValue {
    /// Returns the format this value is encoded in.
    pub fn format(&self) -> ValueFormat {
        match self {
            SignalValue::BinStr(_) => ValueFormat::BinStr,
            SignalValue::Str(_) => ValueFormat::Str,
            SignalValue::Real(_) => ValueFormat::Real,
            SignalValue::Int(_) => ValueFormat::Int,
        }
    }
}

/// One adapter bound to a specific engine procedural interface.
pub trait Backend {
    /// Returns the unique backend name (e.g. `"VPI"`).
    fn name(&self) -> &str;

    /// Resolves the top-level design unit. With `name`, returns `None`
    /// unless the unit this backend finds has exactly that name.
    fn root_handle(&self, name: Option<&str>) -> Option<ObjectHandle>;

    /// Resolves a child of `parent` by hierarchical name, natively only.
    fn check_create_by_name(&self, name: &str, parent: &ObjectHandle) -> Option<ObjectHandle>;

    /// Resolves an element of an indexable `parent` by position.
    fn check_create_by_index(&self, index: i64, parent: &ObjectHandle) -> Option<ObjectHandle>;

    /// Wraps a native reference obtained elsewhere (e.g. from another
    /// backend's iterator) into a handle, if this backend can classify it.
    fn check_create_raw(&self, raw: NativeRef, parent: &ObjectHandle) -> Option<ObjectHandle>;

    /// Begins a traversal of `parent`. Unsupported selectors return `None`.
    fn iterate_handle(
        &self,
        parent: &ObjectHandle,
        selector: IterSelector,
    ) -> Option<Box<dyn BackendIterator>>;

    /// Registers a callback whose fire will hand `token` to the trampoline.
    fn register_callback(
        &self,
        reason: CallbackReason,
        token: u64,
    ) -> Result<NativeRef, GpiError>;

    /// Drops a registration made by [`register_callback`](Self::register_callback).
    fn deregister_callback(&self, registration: NativeRef) -> Result<Deregistration, GpiError>;

    /// Retries a removal that was deferred or refused. Returns `true` once
    /// the engine has let go of the registration and can no longer fire it;
    /// until then the owner keeps the slot so late fires stay no-ops.
    fn release_matured(&self, registration: NativeRef) -> bool;

    /// Reads a signal value in the requested format.
    fn get_signal_value(&self, signal: &ObjectHandle, format: ValueFormat)
        -> Option<SignalValue>;

    /// Writes a signal value.
    fn set_signal_value(
        &self,
        signal: &ObjectHandle,
        value: &SignalValue,
        action: SetAction,
    ) -> Result<(), GpiError>;

    /// Returns the name of the design unit an instance is built from.
    fn definition_name(&self, object: &ObjectHandle) -> Option<String>;

    /// Returns the source file declaring the object's design unit.
    fn definition_file(&self, object: &ObjectHandle) -> Option<String>;

    /// Returns the backend-native type name, for diagnostics.
    fn type_string(&self, object: &ObjectHandle) -> String;

    /// Asks the engine to finish simulation.
    fn sim_end(&self);

    /// Returns the current simulation time in precision ticks.
    fn sim_time(&self) -> u64;

    /// Returns the precision as a power-of-ten exponent of one second.
    fn sim_precision(&self) -> i32;

    /// Returns the engine's product name.
    fn simulator_product(&self) -> String;

    /// Returns the engine's version string.
    fn simulator_version(&self) -> String;

    /// Releases a native object reference at teardown.
    fn release(&self, _native: NativeRef) {}
}
