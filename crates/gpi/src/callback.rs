//! Callback handles and their lifecycle state machine.
//!
//! A [`CallbackHandle`] is one pending or fired callback request. It is a
//! single struct whose [`CallbackKind`] payload says what the callback waits
//! for; the FREE → PRIMED → REMOVED transitions are shared by every kind.
//! Handles live in a [`SlotArena`](crate::arena::SlotArena), and the
//! [`CallbackId`] handed to the engine as user data is generation-checked,
//! so a fire that arrives after deallocation is detected rather than
//! dereferenced.

use std::fmt;

use crate::arena::SlotKey;
use crate::dispatcher::Gpi;
use crate::error::{CallbackError, GpiError};
use crate::handle::{BackendId, HandleId};
use crate::native::NativeRef;

/// The function a scheduler supplies when registering a callback.
///
/// Data the scheduler wants back is captured by the closure. Returning an
/// error asks for an orderly end of simulation.
pub type CallbackFn = Box<dyn FnMut(&mut Gpi) -> Result<(), CallbackError>>;

/// Which value transitions a value-change subscription reacts to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Edge {
    /// Fire only when the sampled value is `"1"`.
    Rising,
    /// Fire only when the sampled value is `"0"`.
    Falling,
    /// Fire on every observed change.
    ValueChange,
}

impl Edge {
    /// Returns `true` if a fire that sampled `value` should invoke the callback.
    pub fn matches(self, value: &str) -> bool {
        match self {
            Edge::Rising => value == "1",
            Edge::Falling => value == "0",
            Edge::ValueChange => true,
        }
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            Edge::Rising => 0,
            Edge::Falling => 1,
            Edge::ValueChange => 2,
        }
    }
}

/// Lifecycle state of a callback.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CallbackState {
    /// Built but not registered with the backend.
    Free,
    /// Registered and expected to fire.
    Primed,
    /// Fired or cancelled. Terminal; further fires are no-ops.
    Removed,
}

impl fmt::Display for CallbackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallbackState::Free => "FREE",
            CallbackState::Primed => "PRIMED",
            CallbackState::Removed => "REMOVED",
        };
        f.write_str(s)
    }
}

/// What a callback waits for.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CallbackKind {
    /// After `delay` precision ticks from registration.
    Timed {
        /// Delay in engine precision ticks.
        delay: u64,
    },
    /// The read-only phase of the current time step.
    ReadOnly,
    /// The read-write phase of the current time step.
    ReadWrite,
    /// The start of the next time step.
    NextTime,
    /// A value change on a signal, filtered by edge.
    ValueChange {
        /// The signal subscribed to.
        signal: HandleId,
        /// Edge policy.
        edge: Edge,
    },
    /// Start of simulation (process-scoped).
    StartOfSimulation,
    /// End of simulation (process-scoped).
    EndOfSimulation,
}

impl CallbackKind {
    /// Returns `true` for the two singletons that live until teardown.
    pub fn is_process_scoped(&self) -> bool {
        matches!(
            self,
            CallbackKind::StartOfSimulation | CallbackKind::EndOfSimulation
        )
    }

    /// Returns a short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            CallbackKind::Timed { .. } => "timed",
            CallbackKind::ReadOnly => "read-only",
            CallbackKind::ReadWrite => "read-write",
            CallbackKind::NextTime => "next-time",
            CallbackKind::ValueChange { .. } => "value-change",
            CallbackKind::StartOfSimulation => "start-of-simulation",
            CallbackKind::EndOfSimulation => "end-of-simulation",
        }
    }
}

/// Generational identity of a [`CallbackHandle`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CallbackId {
    index: u32,
    generation: u32,
}

impl CallbackId {
    /// Encodes the ID as the user-data word registered with the engine.
    pub fn to_token(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    /// Decodes a user-data word. Any word decodes; validity is checked
    /// against the slot arena.
    pub fn from_token(token: u64) -> Self {
        Self {
            index: token as u32,
            generation: (token >> 32) as u32,
        }
    }
}

impl SlotKey for CallbackId {
    fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    fn index(self) -> u32 {
        self.index
    }

    fn generation(self) -> u32 {
        self.generation
    }
}

/// One callback request and its state machine.
pub struct CallbackHandle {
    backend: BackendId,
    native: Option<NativeRef>,
    state: CallbackState,
    kind: CallbackKind,
    invoke: Option<CallbackFn>,
    running: bool,
    delete_requested: bool,
}

impl CallbackHandle {
    pub(crate) fn new(backend: BackendId, kind: CallbackKind, invoke: CallbackFn) -> Self {
        Self {
            backend,
            native: None,
            state: CallbackState::Free,
            kind,
            invoke: Some(invoke),
            running: false,
            delete_requested: false,
        }
    }

    /// Returns the backend the callback is registered with.
    pub fn backend(&self) -> BackendId {
        self.backend
    }

    /// Returns the backend's registration token, if registered.
    pub fn native(&self) -> Option<NativeRef> {
        self.native
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> CallbackState {
        self.state
    }

    /// Returns what the callback waits for.
    pub fn kind(&self) -> CallbackKind {
        self.kind
    }

    /// Returns `true` while the scheduler function is executing.
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub(crate) fn delete_requested(&self) -> bool {
        self.delete_requested
    }

    /// FREE → PRIMED, recording the backend's registration token.
    pub(crate) fn prime(&mut self, native: NativeRef) -> Result<(), GpiError> {
        if self.state != CallbackState::Free {
            return Err(GpiError::InvalidTransition {
                from: self.state,
                action: "arm",
            });
        }
        self.native = Some(native);
        self.state = CallbackState::Primed;
        Ok(())
    }

    /// Takes the scheduler function for one invocation.
    ///
    /// Only a PRIMED callback runs; the function is absent while running,
    /// which is what makes a nested fire of the same callback a no-op.
    pub(crate) fn begin_run(&mut self) -> Option<CallbackFn> {
        if self.state != CallbackState::Primed || self.running {
            return None;
        }
        let f = self.invoke.take()?;
        self.running = true;
        Some(f)
    }

    /// Returns the function after an invocation. A function installed by a
    /// re-subscription during the run takes precedence; returns `true` when
    /// that happened.
    pub(crate) fn end_run(&mut self, f: CallbackFn) -> bool {
        self.running = false;
        if self.invoke.is_some() {
            return true;
        }
        self.invoke = Some(f);
        false
    }

    /// Installs a new function for a re-subscription. Supersedes a pending
    /// delete request.
    pub(crate) fn replace_invoke(&mut self, f: CallbackFn) {
        self.invoke = Some(f);
        self.delete_requested = false;
    }

    pub(crate) fn request_delete(&mut self) {
        self.delete_requested = true;
    }

    /// Enters the terminal state while the backend still holds the
    /// registration; the slot is reaped once the backend reports maturity.
    pub(crate) fn mark_removed(&mut self) {
        self.state = CallbackState::Removed;
    }

    /// Returns a signal-owned callback to FREE after its registration was
    /// cleanly removed, ready to be armed by the next subscription.
    pub(crate) fn reset_free(&mut self) {
        self.native = None;
        self.state = CallbackState::Free;
    }
}

impl fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackHandle")
            .field("backend", &self.backend)
            .field("native", &self.native)
            .field("state", &self.state)
            .field("kind", &self.kind)
            .field("running", &self.running)
            .field("delete_requested", &self.delete_requested)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_callback() -> CallbackHandle {
        CallbackHandle::new(
            BackendId::from_raw(0),
            CallbackKind::ReadOnly,
            Box::new(|_| Ok(())),
        )
    }

    #[test]
    fn rising_edge_only_on_one() {
        assert!(Edge::Rising.matches("1"));
        assert!(!Edge::Rising.matches("0"));
        assert!(!Edge::Rising.matches("X"));
        assert!(!Edge::Rising.matches("Z"));
    }

    #[test]
    fn falling_edge_only_on_zero() {
        assert!(Edge::Falling.matches("0"));
        assert!(!Edge::Falling.matches("1"));
        assert!(!Edge::Falling.matches("X"));
    }

    #[test]
    fn any_change_matches_everything() {
        assert!(Edge::ValueChange.matches("X"));
        assert!(Edge::ValueChange.matches("1010"));
    }

    #[test]
    fn token_roundtrip() {
        let id = CallbackId::from_parts(7, 3);
        assert_eq!(id.to_token(), (3u64 << 32) | 7);
        assert_eq!(CallbackId::from_token(id.to_token()), id);
    }

    #[test]
    fn prime_only_from_free() {
        let mut cb = make_callback();
        assert_eq!(cb.state(), CallbackState::Free);
        cb.prime(NativeRef::from_raw(1)).unwrap();
        assert_eq!(cb.state(), CallbackState::Primed);
        let err = cb.prime(NativeRef::from_raw(2)).unwrap_err();
        assert!(matches!(err, GpiError::InvalidTransition { .. }));
        assert_eq!(cb.native(), Some(NativeRef::from_raw(1)));
    }

    #[test]
    fn run_requires_primed() {
        let mut cb = make_callback();
        assert!(cb.begin_run().is_none());
        cb.prime(NativeRef::from_raw(1)).unwrap();
        let f = cb.begin_run().unwrap();
        assert!(cb.is_running());
        assert!(cb.begin_run().is_none());
        assert!(!cb.end_run(f));
        assert!(!cb.is_running());
        cb.mark_removed();
        assert!(cb.begin_run().is_none());
    }

    #[test]
    fn resubscription_during_run_wins() {
        let mut cb = make_callback();
        cb.prime(NativeRef::from_raw(1)).unwrap();
        let old = cb.begin_run().unwrap();
        cb.request_delete();
        cb.replace_invoke(Box::new(|_| Err(CallbackError::new("new"))));
        assert!(!cb.delete_requested());
        assert!(cb.end_run(old));
        let f = cb.begin_run();
        assert!(f.is_some());
    }

    #[test]
    fn reset_free_clears_registration() {
        let mut cb = make_callback();
        cb.prime(NativeRef::from_raw(9)).unwrap();
        cb.reset_free();
        assert_eq!(cb.state(), CallbackState::Free);
        assert_eq!(cb.native(), None);
        cb.prime(NativeRef::from_raw(10)).unwrap();
    }

    #[test]
    fn process_scoped_kinds() {
        assert!(CallbackKind::StartOfSimulation.is_process_scoped());
        assert!(CallbackKind::EndOfSimulation.is_process_scoped());
        assert!(!CallbackKind::Timed { delay: 5 }.is_process_scoped());
    }
}
