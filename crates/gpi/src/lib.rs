//! GPI: a backend-agnostic procedural interface for driving HDL simulators.
//!
//! The crate lets a testbench scheduler talk to an event-driven simulation
//! engine without knowing which vendor interface the engine exposes. It
//! provides the object handle model ([`ObjectHandle`]), the callback state
//! machine ([`CallbackHandle`]), the [`Backend`] contract adapters
//! implement, the cross-backend resolution and iteration protocol, and the
//! [`Gpi`] process context that ties them together.
//!
//! Control alternates strictly between engine and scheduler: the engine
//! fires a callback into [`Gpi::handle_callback`], the scheduler runs, and
//! returning from the trampoline hands control back.

#![warn(missing_docs)]

pub mod arena;
pub mod backend;
pub mod callback;
pub mod classify;
pub mod dispatcher;
pub mod embed;
pub mod error;
pub mod guard;
pub mod handle;
pub mod iterator;
pub mod logging;
pub mod native;
pub mod registry;
mod scheduling;

pub use backend::{
    Backend, CallbackReason, Deregistration, SetAction, SignalValue, ValueFormat,
};
pub use callback::{CallbackFn, CallbackHandle, CallbackId, CallbackKind, CallbackState, Edge};
pub use classify::{classify, classify_with_quirks, EngineQuirk, ScalarKind, TypeShape};
pub use dispatcher::Gpi;
pub use embed::{EntryPoint, EntryPointResolver, StaticEntryPoints};
pub use error::{CallbackError, GpiError, ProtocolViolation};
pub use guard::{ContextGuard, SchedulerScope};
pub use handle::{BackendId, HandleId, ObjectHandle, ObjectType, Range, RangeDirection};
pub use iterator::{BackendIterator, GpiIterator, IterSelector, IterStatus, RelationshipWalk};
pub use logging::DiagnosticSeverity;
pub use native::NativeRef;
