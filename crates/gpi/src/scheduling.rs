//! Callback registration, the trampoline, and removal.
//!
//! Every fire enters through [`Gpi::dispatch_callback`], which flips the
//! context guard, releases deferred removals whose registrations have matured,
//! validates the token against the slot arena, and runs the callback's state
//! machine. One-shot callbacks deregister after running; value-change
//! callbacks stay with their signal and return to FREE for reuse; the two
//! process-scoped callbacks stay PRIMED until teardown.

use crate::arena::{SlotArena, SlotProbe};
use crate::backend::{CallbackReason, Deregistration};
use crate::callback::{CallbackFn, CallbackHandle, CallbackId, CallbackKind, CallbackState, Edge};
use crate::dispatcher::Gpi;
use crate::error::{CallbackError, GpiError, ProtocolViolation};
use crate::handle::{BackendId, HandleId};
use crate::logging;

impl Gpi {
    /// Calls `f` after `delay` precision ticks.
    pub fn register_timed_callback(
        &mut self,
        delay: u64,
        f: impl FnMut(&mut Gpi) -> Result<(), CallbackError> + 'static,
    ) -> Option<CallbackId> {
        self.arm_on_primary(CallbackKind::Timed { delay }, Box::new(f))
    }

    /// Calls `f` in the read-only phase of the current time step.
    pub fn register_readonly_callback(
        &mut self,
        f: impl FnMut(&mut Gpi) -> Result<(), CallbackError> + 'static,
    ) -> Option<CallbackId> {
        self.arm_on_primary(CallbackKind::ReadOnly, Box::new(f))
    }

    /// Calls `f` in the read-write phase of the current time step.
    pub fn register_readwrite_callback(
        &mut self,
        f: impl FnMut(&mut Gpi) -> Result<(), CallbackError> + 'static,
    ) -> Option<CallbackId> {
        self.arm_on_primary(CallbackKind::ReadWrite, Box::new(f))
    }

    /// Calls `f` at the start of the next time step.
    pub fn register_nexttime_callback(
        &mut self,
        f: impl FnMut(&mut Gpi) -> Result<(), CallbackError> + 'static,
    ) -> Option<CallbackId> {
        self.arm_on_primary(CallbackKind::NextTime, Box::new(f))
    }

    /// Calls `f` once at start of simulation. At most one may be registered.
    pub fn register_start_of_sim_callback(
        &mut self,
        f: impl FnMut(&mut Gpi) -> Result<(), CallbackError> + 'static,
    ) -> Option<CallbackId> {
        if self.start_of_sim.is_some_and(|id| self.callbacks.contains(id)) {
            log::warn!(target: "gpi::callback", "{}", GpiError::SingletonRegistered("start-of-simulation"));
            return None;
        }
        let id = self.arm_on_primary(CallbackKind::StartOfSimulation, Box::new(f))?;
        self.start_of_sim = Some(id);
        Some(id)
    }

    /// Calls `f` once at end of simulation. At most one may be registered.
    pub fn register_end_of_sim_callback(
        &mut self,
        f: impl FnMut(&mut Gpi) -> Result<(), CallbackError> + 'static,
    ) -> Option<CallbackId> {
        if self.end_of_sim.is_some_and(|id| self.callbacks.contains(id)) {
            log::warn!(target: "gpi::callback", "{}", GpiError::SingletonRegistered("end-of-simulation"));
            return None;
        }
        let id = self.arm_on_primary(CallbackKind::EndOfSimulation, Box::new(f))?;
        self.end_of_sim = Some(id);
        Some(id)
    }

    /// Calls `f` when `signal` changes in a way that matches `edge`.
    ///
    /// Each signal keeps one callback per edge kind. Subscribing again while
    /// it is armed (including from inside its own run) replaces the function
    /// and returns the same ID.
    pub fn register_value_change_callback(
        &mut self,
        signal: HandleId,
        edge: Edge,
        f: impl FnMut(&mut Gpi) -> Result<(), CallbackError> + 'static,
    ) -> Option<CallbackId> {
        if self.shut_down {
            return None;
        }
        let (backend, native, existing) = {
            let handle = self.registry.handle(signal)?;
            if !handle.object_type().has_value() {
                log::warn!(
                    target: "gpi::callback",
                    "{}",
                    GpiError::NotASignal {
                        name: handle.fq_name().to_string(),
                        object_type: handle.object_type(),
                    }
                );
                return None;
            }
            (handle.backend(), handle.native(), handle.edge_callback(edge))
        };
        let invoke: CallbackFn = Box::new(f);
        let existing_state = existing.and_then(|id| self.callbacks.get(id)).map(CallbackHandle::state);
        match (existing, existing_state) {
            (Some(id), Some(CallbackState::Primed)) => {
                if let Some(cb) = self.callbacks.get_mut(id) {
                    cb.replace_invoke(invoke);
                }
                return Some(id);
            }
            (Some(id), Some(CallbackState::Free)) => {
                if let Some(cb) = self.callbacks.get_mut(id) {
                    cb.replace_invoke(invoke);
                }
                return match self.register_native(id, backend, CallbackReason::ValueChange { signal: native }) {
                    Ok(()) => Some(id),
                    Err(e) => {
                        log::warn!(target: "gpi::callback", "{e}");
                        self.free_slot(id);
                        None
                    }
                };
            }
            _ => {}
        }
        let id = self.arm(backend, CallbackKind::ValueChange { signal, edge }, invoke)?;
        if let Some(handle) = self.registry.handle_mut(signal) {
            handle.set_edge_callback(edge, Some(id));
        }
        Some(id)
    }

    /// Cancels a callback. Returns `false` if the ID is no longer live.
    ///
    /// A callback cancelled from inside its own run is retired after the
    /// run completes.
    pub fn remove_callback(&mut self, id: CallbackId) -> bool {
        if self.shut_down {
            return false;
        }
        let Some(cb) = self.callbacks.get_mut(id) else {
            log::warn!(target: "gpi::callback", "{}", GpiError::StaleCallback);
            return false;
        };
        if cb.is_running() {
            cb.request_delete();
            return true;
        }
        match cb.state() {
            CallbackState::Free => self.free_slot(id),
            CallbackState::Primed => self.retire(id, false),
            CallbackState::Removed => {}
        }
        true
    }

    /// Returns the state of a live callback.
    pub fn callback_state(&self, id: CallbackId) -> Option<CallbackState> {
        self.callbacks.get(id).map(CallbackHandle::state)
    }

    /// Returns a live callback.
    pub fn callback(&self, id: CallbackId) -> Option<&CallbackHandle> {
        self.callbacks.get(id)
    }

    /// Returns the number of live callback slots, pending removals included.
    pub fn live_callbacks(&self) -> usize {
        self.callbacks.len()
    }

    /// Returns the number of removals waiting for the backend to mature them.
    pub fn pending_removals(&self) -> usize {
        self.pending_removal.len()
    }

    /// The trampoline: runs the callback named by `token` and returns 0.
    ///
    /// A protocol violation terminates the process.
    pub fn handle_callback(&mut self, token: u64) -> i32 {
        match self.dispatch_callback(token) {
            Ok(()) => 0,
            Err(violation) => logging::fatal(&violation),
        }
    }

    /// Fallible core of [`handle_callback`](Self::handle_callback).
    pub fn dispatch_callback(&mut self, token: u64) -> Result<(), ProtocolViolation> {
        let scope = self.guard.to_scheduler()?;
        if self.shut_down {
            log::debug!(target: "gpi::callback", "fire of {token:#x} after shutdown ignored");
            return scope.release();
        }
        self.reap_pending();
        let id = CallbackId::from_token(token);
        match self.callbacks.probe(id) {
            SlotProbe::Unallocated => return Err(ProtocolViolation::CorruptUserData(token)),
            SlotProbe::Stale => return Err(ProtocolViolation::StaleFire(token)),
            SlotProbe::Live => {}
        }
        match self.callbacks.get(id).map(CallbackHandle::state) {
            Some(CallbackState::Free) => return Err(ProtocolViolation::UnarmedFire(token)),
            Some(CallbackState::Primed) => self.fire(id),
            _ => log::trace!(target: "gpi::callback", "fire of removed callback {token:#x} ignored"),
        }
        scope.release()
    }

    fn fire(&mut self, id: CallbackId) {
        let Some(kind) = self.callbacks.get(id).map(CallbackHandle::kind) else {
            return;
        };
        if let CallbackKind::ValueChange { signal, edge } = kind {
            if edge != Edge::ValueChange {
                let sampled = self.get_signal_value_binstr(signal);
                if !sampled.as_deref().is_some_and(|v| edge.matches(v)) {
                    log::trace!(target: "gpi::callback", "{edge:?} not matched by {sampled:?}");
                    return;
                }
            }
        }
        if kind == CallbackKind::EndOfSimulation {
            self.sim_ending = true;
        }
        let Some(mut invoke) = self.callbacks.get_mut(id).and_then(CallbackHandle::begin_run) else {
            return;
        };
        let result = invoke(self);
        let (rearmed, delete_requested) = match self.callbacks.get_mut(id) {
            Some(cb) => (cb.end_run(invoke), cb.delete_requested()),
            None => (false, false),
        };
        if let Err(e) = result {
            log::error!(target: "gpi::callback", "{} callback: {e}", kind.name());
            self.sim_end();
        }
        if !self.callbacks.contains(id) {
            return;
        }
        if delete_requested {
            self.retire(id, false);
        } else if !(kind.is_process_scoped() || rearmed) {
            self.retire(id, matches!(kind, CallbackKind::ValueChange { .. }));
        }
    }

    fn arm_on_primary(&mut self, kind: CallbackKind, invoke: CallbackFn) -> Option<CallbackId> {
        if self.registry.backend_count() == 0 {
            log::warn!(target: "gpi::callback", "{}", GpiError::NoBackend);
            return None;
        }
        self.arm(BackendId::from_raw(0), kind, invoke)
    }

    fn arm(&mut self, backend: BackendId, kind: CallbackKind, invoke: CallbackFn) -> Option<CallbackId> {
        if self.shut_down {
            return None;
        }
        let reason = match kind {
            CallbackKind::Timed { delay } => CallbackReason::Timed { delay },
            CallbackKind::ReadOnly => CallbackReason::ReadOnly,
            CallbackKind::ReadWrite => CallbackReason::ReadWrite,
            CallbackKind::NextTime => CallbackReason::NextTime,
            CallbackKind::ValueChange { signal, .. } => CallbackReason::ValueChange {
                signal: self.registry.handle(signal)?.native(),
            },
            CallbackKind::StartOfSimulation => CallbackReason::StartOfSimulation,
            CallbackKind::EndOfSimulation => CallbackReason::EndOfSimulation,
        };
        let id = self.callbacks.insert(CallbackHandle::new(backend, kind, invoke));
        match self.register_native(id, backend, reason) {
            Ok(()) => Some(id),
            Err(e) => {
                log::warn!(target: "gpi::callback", "{e}");
                self.callbacks.remove(id);
                None
            }
        }
    }

    fn register_native(&mut self, id: CallbackId, backend: BackendId, reason: CallbackReason) -> Result<(), GpiError> {
        let native = self
            .registry
            .backend(backend)
            .ok_or(GpiError::NoBackend)?
            .register_callback(reason, id.to_token())?;
        self.callbacks
            .get_mut(id)
            .ok_or(GpiError::StaleCallback)?
            .prime(native)
    }

    /// Drops the backend registration of a PRIMED callback. On clean removal
    /// the slot is freed, or returned to FREE when `keep_for_reuse`; otherwise
    /// the callback is REMOVED and parked until the backend matures it.
    fn retire(&mut self, id: CallbackId, keep_for_reuse: bool) {
        let outcome = {
            let Some(cb) = self.callbacks.get(id) else {
                return;
            };
            match (cb.native(), self.registry.backend(cb.backend())) {
                (Some(native), Some(backend)) => backend.deregister_callback(native),
                _ => Ok(Deregistration::Removed),
            }
        };
        match outcome {
            Ok(Deregistration::Removed) if keep_for_reuse => {
                if let Some(cb) = self.callbacks.get_mut(id) {
                    cb.reset_free();
                }
            }
            Ok(Deregistration::Removed) => self.free_slot(id),
            Ok(Deregistration::Deferred) => {
                log::debug!(target: "gpi::callback", "removal of {:#x} deferred", id.to_token());
                self.defer(id);
            }
            Err(e) => {
                log::warn!(target: "gpi::callback", "{e}; deferring removal");
                self.defer(id);
            }
        }
    }

    fn defer(&mut self, id: CallbackId) {
        if let Some(cb) = self.callbacks.get_mut(id) {
            cb.mark_removed();
        }
        self.detach(id);
        self.pending_removal.push(id);
    }

    fn free_slot(&mut self, id: CallbackId) {
        self.detach(id);
        self.callbacks.remove(id);
    }

    /// Forgets every owner-side reference to `id`.
    fn detach(&mut self, id: CallbackId) {
        if let Some(CallbackKind::ValueChange { signal, edge }) = self.callbacks.get(id).map(CallbackHandle::kind) {
            if let Some(handle) = self.registry.handle_mut(signal) {
                if handle.edge_callback(edge) == Some(id) {
                    handle.set_edge_callback(edge, None);
                }
            }
        }
        if self.start_of_sim == Some(id) {
            self.start_of_sim = None;
        }
        if self.end_of_sim == Some(id) {
            self.end_of_sim = None;
        }
    }

    fn reap_pending(&mut self) {
        if self.pending_removal.is_empty() {
            return;
        }
        for id in std::mem::take(&mut self.pending_removal) {
            let released = match self.callbacks.get(id) {
                None => continue,
                Some(cb) => match (cb.native(), self.registry.backend(cb.backend())) {
                    (Some(native), Some(backend)) => backend.release_matured(native),
                    _ => true,
                },
            };
            if released {
                self.callbacks.remove(id);
            } else {
                self.pending_removal.push(id);
            }
        }
    }

    pub(crate) fn teardown_callbacks(&mut self) {
        for id in self.callbacks.keys() {
            let Some(cb) = self.callbacks.get(id) else {
                continue;
            };
            if cb.state() != CallbackState::Primed {
                continue;
            }
            if let (Some(native), Some(backend)) = (cb.native(), self.registry.backend(cb.backend())) {
                if let Err(e) = backend.deregister_callback(native) {
                    log::warn!(target: "gpi::callback", "{e}");
                }
            }
        }
        for id in std::mem::take(&mut self.pending_removal) {
            let Some(cb) = self.callbacks.get(id) else {
                continue;
            };
            if let (Some(native), Some(backend)) = (cb.native(), self.registry.backend(cb.backend())) {
                if !backend.release_matured(native) {
                    log::debug!(target: "gpi::callback", "{:#x} still held by the engine at teardown", id.to_token());
                }
            }
        }
        self.callbacks = SlotArena::new();
        self.start_of_sim = None;
        self.end_of_sim = None;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    use super::*;
    use crate::backend::{Backend, SetAction, SignalValue, ValueFormat};
    use crate::handle::{ObjectHandle, ObjectType};
    use crate::iterator::{BackendIterator, IterSelector};
    use crate::native::NativeRef;

    /// Backend state shared with the test body.
    #[derive(Default)]
    struct Recorder {
        registered: RefCell<Vec<(CallbackReason, u64)>>,
        deregistered: RefCell<Vec<u64>>,
        released: RefCell<Vec<u64>>,
        values: RefCell<HashMap<String, String>>,
        defer_removal: Cell<bool>,
        matured: Cell<bool>,
        refuse_removal: Cell<bool>,
        fail_registration: Cell<bool>,
        sim_end_calls: Cell<u32>,
    }

    struct RecordingBackend(Rc<Recorder>);

    impl Backend for RecordingBackend {
        fn name(&self) -> &str {
            "REC"
        }

        fn root_handle(&self, _name: Option<&str>) -> Option<ObjectHandle> {
            Some(ObjectHandle::new(NativeRef::from_raw(1), ObjectType::Module, "top", "top"))
        }

        fn check_create_by_name(&self, name: &str, parent: &ObjectHandle) -> Option<ObjectHandle> {
            let object_type = if name == "blk" { ObjectType::Module } else { ObjectType::Logic };
            Some(ObjectHandle::new(
                NativeRef::from_raw(2),
                object_type,
                name,
                format!("{}.{}", parent.fq_name(), name),
            ))
        }

        fn check_create_by_index(&self, _index: i64, _parent: &ObjectHandle) -> Option<ObjectHandle> {
            None
        }

        fn check_create_raw(&self, _raw: NativeRef, _parent: &ObjectHandle) -> Option<ObjectHandle> {
            None
        }

        fn iterate_handle(&self, _parent: &ObjectHandle, _selector: IterSelector) -> Option<Box<dyn BackendIterator>> {
            None
        }

        fn register_callback(&self, reason: CallbackReason, token: u64) -> Result<NativeRef, GpiError> {
            if self.0.fail_registration.get() {
                return Err(GpiError::RegistrationFailed {
                    backend: "REC".into(),
                    reason: "test",
                });
            }
            self.0.registered.borrow_mut().push((reason, token));
            Ok(NativeRef::from_raw(token))
        }

        fn deregister_callback(&self, registration: NativeRef) -> Result<Deregistration, GpiError> {
            self.0.deregistered.borrow_mut().push(registration.as_raw());
            if self.0.refuse_removal.get() {
                return Err(GpiError::DeregistrationFailed {
                    backend: "REC".into(),
                    reason: "refused".into(),
                });
            }
            if self.0.defer_removal.get() {
                Ok(Deregistration::Deferred)
            } else {
                Ok(Deregistration::Removed)
            }
        }

        fn release_matured(&self, registration: NativeRef) -> bool {
            if self.0.refuse_removal.get() || (self.0.defer_removal.get() && !self.0.matured.get()) {
                return false;
            }
            self.0.released.borrow_mut().push(registration.as_raw());
            true
        }

        fn get_signal_value(&self, signal: &ObjectHandle, _format: ValueFormat) -> Option<SignalValue> {
            self.0
                .values
                .borrow()
                .get(signal.fq_name())
                .map(|v| SignalValue::BinStr(v.clone()))
        }

        fn set_signal_value(&self, signal: &ObjectHandle, value: &SignalValue, _action: SetAction) -> Result<(), GpiError> {
            if let SignalValue::BinStr(v) = value {
                self.0.values.borrow_mut().insert(signal.fq_name().to_string(), v.clone());
            }
            Ok(())
        }

        fn definition_name(&self, _object: &ObjectHandle) -> Option<String> {
            None
        }

        fn definition_file(&self, _object: &ObjectHandle) -> Option<String> {
            None
        }

        fn type_string(&self, _object: &ObjectHandle) -> String {
            "rec".into()
        }

        fn sim_end(&self) {
            self.0.sim_end_calls.set(self.0.sim_end_calls.get() + 1);
        }

        fn sim_time(&self) -> u64 {
            0
        }

        fn sim_precision(&self) -> i32 {
            -9
        }

        fn simulator_product(&self) -> String {
            "recorder".into()
        }

        fn simulator_version(&self) -> String {
            "1".into()
        }
    }

    fn make_gpi() -> (Gpi, Rc<Recorder>) {
        let recorder = Rc::new(Recorder::default());
        let mut gpi = Gpi::new();
        gpi.register_backend(RecordingBackend(Rc::clone(&recorder))).unwrap();
        (gpi, recorder)
    }

    fn counter() -> (Rc<Cell<u32>>, impl FnMut(&mut Gpi) -> Result<(), CallbackError> + 'static) {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        (count, move |_: &mut Gpi| {
            c.set(c.get() + 1);
            Ok(())
        })
    }

    fn make_signal(gpi: &mut Gpi, rec: &Recorder, value: &str) -> HandleId {
        let root = gpi.get_root_handle(None).unwrap();
        let sig = gpi.get_handle_by_name(root, "clk").unwrap();
        rec.values.borrow_mut().insert("top.clk".into(), value.into());
        sig
    }

    #[test]
    fn one_shot_fires_once_and_frees() {
        let (mut gpi, rec) = make_gpi();
        let (count, f) = counter();
        let id = gpi.register_timed_callback(10, f).unwrap();
        assert_eq!(gpi.callback_state(id), Some(CallbackState::Primed));
        assert_eq!(rec.registered.borrow()[0].0, CallbackReason::Timed { delay: 10 });
        assert_eq!(gpi.handle_callback(id.to_token()), 0);
        assert_eq!(count.get(), 1);
        assert_eq!(gpi.callback_state(id), None);
        assert_eq!(*rec.deregistered.borrow(), vec![id.to_token()]);
        assert_eq!(
            gpi.dispatch_callback(id.to_token()),
            Err(ProtocolViolation::StaleFire(id.to_token()))
        );
        assert_eq!(count.get(), 1);
        assert!(!gpi.in_scheduler());
    }

    #[test]
    fn corrupt_tokens_are_violations() {
        let (mut gpi, _) = make_gpi();
        assert_eq!(
            gpi.dispatch_callback(0xdead_beef),
            Err(ProtocolViolation::CorruptUserData(0xdead_beef))
        );
        let (_, f) = counter();
        let id = gpi.register_readonly_callback(f).unwrap();
        // Right index, generation zero.
        let forged = id.to_token() & 0xffff_ffff;
        assert_eq!(
            gpi.dispatch_callback(forged),
            Err(ProtocolViolation::CorruptUserData(forged))
        );
        assert!(!gpi.in_scheduler());
    }

    #[test]
    fn registration_failure_leaves_nothing() {
        let (mut gpi, rec) = make_gpi();
        rec.fail_registration.set(true);
        let (_, f) = counter();
        assert!(gpi.register_nexttime_callback(f).is_none());
        assert_eq!(gpi.live_callbacks(), 0);
    }

    #[test]
    fn no_backend_no_callback() {
        let mut gpi = Gpi::new();
        let (_, f) = counter();
        assert!(gpi.register_readwrite_callback(f).is_none());
    }

    #[test]
    fn rising_edge_gating() {
        let (mut gpi, rec) = make_gpi();
        let sig = make_signal(&mut gpi, &rec, "0");
        let (count, f) = counter();
        let id = gpi.register_value_change_callback(sig, Edge::Rising, f).unwrap();
        for v in ["0", "X", "Z"] {
            rec.values.borrow_mut().insert("top.clk".into(), v.into());
            gpi.dispatch_callback(id.to_token()).unwrap();
            assert_eq!(count.get(), 0);
            assert_eq!(gpi.callback_state(id), Some(CallbackState::Primed));
        }
        rec.values.borrow_mut().insert("top.clk".into(), "1".into());
        gpi.dispatch_callback(id.to_token()).unwrap();
        assert_eq!(count.get(), 1);
        // Back to FREE, owned by the signal, reused on the next subscription.
        assert_eq!(gpi.callback_state(id), Some(CallbackState::Free));
        let (count2, f2) = counter();
        let again = gpi.register_value_change_callback(sig, Edge::Rising, f2).unwrap();
        assert_eq!(again, id);
        assert_eq!(gpi.callback_state(id), Some(CallbackState::Primed));
        gpi.dispatch_callback(id.to_token()).unwrap();
        assert_eq!(count2.get(), 1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn fire_on_free_callback_is_unarmed() {
        let (mut gpi, rec) = make_gpi();
        let sig = make_signal(&mut gpi, &rec, "1");
        let (_, f) = counter();
        let id = gpi.register_value_change_callback(sig, Edge::ValueChange, f).unwrap();
        gpi.dispatch_callback(id.to_token()).unwrap();
        assert_eq!(
            gpi.dispatch_callback(id.to_token()),
            Err(ProtocolViolation::UnarmedFire(id.to_token()))
        );
    }

    #[test]
    fn resubscribe_inside_run_keeps_it_armed() {
        let (mut gpi, rec) = make_gpi();
        let sig = make_signal(&mut gpi, &rec, "1");
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let id = gpi
            .register_value_change_callback(sig, Edge::Rising, move |gpi: &mut Gpi| {
                c.set(c.get() + 1);
                let c2 = Rc::clone(&c);
                gpi.register_value_change_callback(sig, Edge::Rising, move |_: &mut Gpi| {
                    c2.set(c2.get() + 100);
                    Ok(())
                });
                Ok(())
            })
            .unwrap();
        gpi.dispatch_callback(id.to_token()).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(gpi.callback_state(id), Some(CallbackState::Primed));
        assert!(rec.deregistered.borrow().is_empty());
        gpi.dispatch_callback(id.to_token()).unwrap();
        assert_eq!(count.get(), 101);
    }

    #[test]
    fn deferred_removal_never_reinvokes() {
        let (mut gpi, rec) = make_gpi();
        rec.defer_removal.set(true);
        let (count, f) = counter();
        let id = gpi.register_timed_callback(1, f).unwrap();
        gpi.dispatch_callback(id.to_token()).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(gpi.callback_state(id), Some(CallbackState::Removed));
        assert_eq!(gpi.pending_removals(), 1);
        // A late fire observes REMOVED.
        gpi.dispatch_callback(id.to_token()).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(gpi.pending_removals(), 1);
        // Once matured, the next trampoline entry reaps it.
        rec.matured.set(true);
        let (_, other) = counter();
        let other = gpi.register_readonly_callback(other).unwrap();
        gpi.dispatch_callback(other.to_token()).unwrap();
        assert_eq!(gpi.callback_state(id), None);
        assert_eq!(gpi.pending_removals(), 0);
        assert_eq!(*rec.released.borrow(), vec![id.to_token()]);
    }

    #[test]
    fn refused_removal_keeps_the_slot_until_released() {
        let (mut gpi, rec) = make_gpi();
        rec.refuse_removal.set(true);
        let (count, f) = counter();
        let id = gpi.register_timed_callback(1, f).unwrap();
        gpi.dispatch_callback(id.to_token()).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(gpi.callback_state(id), Some(CallbackState::Removed));
        // The engine still holds the registration, so it may fire again.
        for _ in 0..3 {
            assert_eq!(gpi.dispatch_callback(id.to_token()), Ok(()));
        }
        assert_eq!(count.get(), 1);
        assert_eq!(gpi.pending_removals(), 1);
        assert!(rec.released.borrow().is_empty());

        // Once the engine accepts the removal the slot is freed.
        rec.refuse_removal.set(false);
        let (_, other) = counter();
        let other = gpi.register_readonly_callback(other).unwrap();
        gpi.dispatch_callback(other.to_token()).unwrap();
        assert_eq!(gpi.callback_state(id), None);
        assert_eq!(*rec.released.borrow(), vec![id.to_token()]);
    }

    #[test]
    fn shutdown_releases_pending_removals() {
        let (mut gpi, rec) = make_gpi();
        rec.defer_removal.set(true);
        let (_, f) = counter();
        let id = gpi.register_timed_callback(1, f).unwrap();
        gpi.dispatch_callback(id.to_token()).unwrap();
        assert_eq!(gpi.pending_removals(), 1);
        rec.matured.set(true);
        gpi.shutdown();
        assert_eq!(gpi.pending_removals(), 0);
        assert_eq!(*rec.released.borrow(), vec![id.to_token()]);
    }

    #[test]
    fn deferred_value_change_gets_fresh_slot() {
        let (mut gpi, rec) = make_gpi();
        rec.defer_removal.set(true);
        let sig = make_signal(&mut gpi, &rec, "0");
        let (_, f) = counter();
        let first = gpi.register_value_change_callback(sig, Edge::Falling, f).unwrap();
        gpi.dispatch_callback(first.to_token()).unwrap();
        assert_eq!(gpi.callback_state(first), Some(CallbackState::Removed));
        let (_, g) = counter();
        let second = gpi.register_value_change_callback(sig, Edge::Falling, g).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn remove_from_inside_run_is_deferred_until_after() {
        let (mut gpi, rec) = make_gpi();
        let slot: Rc<Cell<Option<CallbackId>>> = Rc::new(Cell::new(None));
        let seen = Rc::new(Cell::new(None));
        let (s, r) = (Rc::clone(&slot), Rc::clone(&seen));
        let id = gpi
            .register_start_of_sim_callback(move |gpi: &mut Gpi| {
                let me = s.get().unwrap();
                assert!(gpi.remove_callback(me));
                // Still alive while running.
                r.set(gpi.callback_state(me));
                Ok(())
            })
            .unwrap();
        slot.set(Some(id));
        gpi.dispatch_callback(id.to_token()).unwrap();
        assert_eq!(seen.get(), Some(CallbackState::Primed));
        assert_eq!(gpi.callback_state(id), None);
        assert_eq!(*rec.deregistered.borrow(), vec![id.to_token()]);
    }

    #[test]
    fn remove_before_fire() {
        let (mut gpi, rec) = make_gpi();
        let (count, f) = counter();
        let id = gpi.register_timed_callback(5, f).unwrap();
        assert!(gpi.remove_callback(id));
        assert_eq!(gpi.callback_state(id), None);
        assert!(!gpi.remove_callback(id));
        assert_eq!(rec.deregistered.borrow().len(), 1);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn process_scoped_singletons_persist() {
        let (mut gpi, _) = make_gpi();
        let (count, f) = counter();
        let id = gpi.register_end_of_sim_callback(f).unwrap();
        let (_, g) = counter();
        assert!(gpi.register_end_of_sim_callback(g).is_none());
        gpi.dispatch_callback(id.to_token()).unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(gpi.callback_state(id), Some(CallbackState::Primed));
        assert!(gpi.sim_ending());
    }

    #[test]
    fn user_failure_requests_sim_end_once() {
        let (mut gpi, rec) = make_gpi();
        let a = gpi
            .register_readonly_callback(|_: &mut Gpi| Err(CallbackError::new("boom")))
            .unwrap();
        let b = gpi
            .register_readwrite_callback(|_: &mut Gpi| Err(CallbackError::new("again")))
            .unwrap();
        gpi.dispatch_callback(a.to_token()).unwrap();
        gpi.dispatch_callback(b.to_token()).unwrap();
        assert_eq!(rec.sim_end_calls.get(), 1);
        assert_eq!(gpi.callback_state(a), None);
    }

    #[test]
    fn nested_entry_is_rejected() {
        let (mut gpi, _) = make_gpi();
        let outcome = Rc::new(RefCell::new(None));
        let (_, inner) = counter();
        let inner = gpi.register_readwrite_callback(inner).unwrap();
        let o = Rc::clone(&outcome);
        let outer = gpi
            .register_readonly_callback(move |gpi: &mut Gpi| {
                *o.borrow_mut() = Some(gpi.dispatch_callback(inner.to_token()));
                Ok(())
            })
            .unwrap();
        gpi.dispatch_callback(outer.to_token()).unwrap();
        assert_eq!(*outcome.borrow(), Some(Err(ProtocolViolation::ReentrantEntry)));
        assert!(!gpi.in_scheduler());
        assert_eq!(gpi.callback_state(inner), Some(CallbackState::Primed));
    }

    #[test]
    fn value_change_requires_a_signal() {
        let (mut gpi, _) = make_gpi();
        let root = gpi.get_root_handle(None).unwrap();
        let blk = gpi.get_handle_by_name(root, "blk").unwrap();
        let (_, f) = counter();
        assert!(gpi.register_value_change_callback(blk, Edge::Rising, f).is_none());
    }

    #[test]
    fn shutdown_deregisters_everything() {
        let (mut gpi, rec) = make_gpi();
        let (_, f) = counter();
        let (_, g) = counter();
        let start = gpi.register_start_of_sim_callback(f).unwrap();
        let timed = gpi.register_timed_callback(3, g).unwrap();
        gpi.shutdown();
        let mut removed = rec.deregistered.borrow().clone();
        removed.sort_unstable();
        let mut expected = vec![start.to_token(), timed.to_token()];
        expected.sort_unstable();
        assert_eq!(removed, expected);
        assert_eq!(gpi.live_callbacks(), 0);
        assert!(gpi.dispatch_callback(start.to_token()).is_ok());
        let (_, h) = counter();
        assert!(gpi.register_timed_callback(1, h).is_none());
    }
}
