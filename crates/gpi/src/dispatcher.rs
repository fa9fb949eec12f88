//! The process context and the resolution protocol.
//!
//! [`Gpi`] is constructed once at startup by whatever embeds the engine,
//! and every scheduler-facing operation is a method on it. Resolution asks
//! the owning backend first, then falls back to the others in registration
//! order; whatever resolves goes through the registry, so repeated lookups
//! of the same fq-name always yield the same [`HandleId`].
//!
//! Entry points that cross the scheduler boundary return `Option` for the
//! null/failure marker and log the cause; only value writes return the
//! underlying [`GpiError`].

use gpi_common::{LogicVec, TimePrecision};

use crate::arena::SlotArena;
use crate::backend::{Backend, SetAction, SignalValue, ValueFormat};
use crate::callback::{CallbackHandle, CallbackId};
use crate::error::GpiError;
use crate::guard::ContextGuard;
use crate::handle::{BackendId, HandleId, ObjectHandle, ObjectType};
use crate::iterator::{GpiIterator, IterSelector, IterStatus};
use crate::native::NativeRef;
use crate::registry::Registry;

/// The GPI process context.
pub struct Gpi {
    pub(crate) registry: Registry,
    pub(crate) callbacks: SlotArena<CallbackId, CallbackHandle>,
    pub(crate) pending_removal: Vec<CallbackId>,
    pub(crate) guard: ContextGuard,
    pub(crate) start_of_sim: Option<CallbackId>,
    pub(crate) end_of_sim: Option<CallbackId>,
    pub(crate) sim_ending: bool,
    pub(crate) shut_down: bool,
}

impl Gpi {
    /// Creates an empty context with no backends.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            callbacks: SlotArena::new(),
            pending_removal: Vec::new(),
            guard: ContextGuard::new(),
            start_of_sim: None,
            end_of_sim: None,
            sim_ending: false,
            shut_down: false,
        }
    }

    // ---- backends ----

    /// Registers a backend. The first one registered becomes the primary.
    pub fn register_backend(&mut self, backend: impl Backend + 'static) -> Result<BackendId, GpiError> {
        if self.shut_down {
            return Err(GpiError::ShutDown);
        }
        let name = backend.name().to_string();
        let product = backend.simulator_product();
        let version = backend.simulator_version();
        match self.registry.register_backend(Box::new(backend)) {
            Ok(id) => {
                log::info!(target: "gpi", "registered {name} backend ({product} {version})");
                Ok(id)
            }
            Err(e) => {
                log::warn!(target: "gpi", "{e}");
                Err(e)
            }
        }
    }

    /// Returns the number of registered backends.
    pub fn backend_count(&self) -> usize {
        self.registry.backend_count()
    }

    /// Returns a backend's name.
    pub fn backend_name(&self, id: BackendId) -> Option<&str> {
        self.registry.backend(id).map(|b| b.name())
    }

    /// Finds a backend by name.
    pub fn find_backend(&self, name: &str) -> Option<BackendId> {
        self.registry.find_backend(name)
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Returns `true` while a scheduler callback holds control.
    pub fn in_scheduler(&self) -> bool {
        self.guard.in_scheduler()
    }

    // ---- resolution ----

    /// Returns a cached handle.
    pub fn handle(&self, id: HandleId) -> Option<&ObjectHandle> {
        if self.shut_down {
            return None;
        }
        self.registry.handle(id)
    }

    /// Resolves the top-level design unit, asking every backend in order.
    pub fn get_root_handle(&mut self, name: Option<&str>) -> Option<HandleId> {
        if self.shut_down {
            return None;
        }
        let found = self.registry.backend_ids().find_map(|id| {
            let backend = self.registry.backend(id)?;
            backend.root_handle(name).map(|h| (id, h))
        });
        match found {
            Some((backend, handle)) => Some(self.registry.cache(backend, handle)),
            None => {
                log::warn!(target: "gpi", "no backend found a root handle{}", describe_name(name));
                None
            }
        }
    }

    /// Resolves `name` under `parent`: the parent's own backend first, then
    /// every other backend in registration order.
    pub fn get_handle_by_name(&mut self, parent: HandleId, name: &str) -> Option<HandleId> {
        if self.shut_down {
            return None;
        }
        let owner = self.registry.handle(parent)?.backend();
        let order = self.registry.resolution_order(owner);
        let resolved = self.resolve_by_name(parent, name, &order);
        if resolved.is_none() {
            log::debug!(target: "gpi", "'{name}' not found under handle {parent:?} by any backend");
        }
        resolved
    }

    /// Resolves element `index` of an indexable `parent` through the
    /// parent's own backend only.
    pub fn get_handle_by_index(&mut self, parent: HandleId, index: i64) -> Option<HandleId> {
        if self.shut_down {
            return None;
        }
        let found = {
            let (parent_handle, backend) = self.registry.handle_with_backend(parent)?;
            if !parent_handle.object_type().is_indexable() {
                log::warn!(
                    target: "gpi",
                    "'{}' ({}) is not indexable",
                    parent_handle.fq_name(),
                    parent_handle.object_type()
                );
                return None;
            }
            backend.check_create_by_index(index, parent_handle)
        };
        let owner = self.registry.handle(parent)?.backend();
        found.map(|h| self.registry.cache(owner, h))
    }

    fn resolve_by_name(&mut self, parent: HandleId, name: &str, order: &[BackendId]) -> Option<HandleId> {
        let found = {
            let parent_handle = self.registry.handle(parent)?;
            order.iter().find_map(|&id| {
                let backend = self.registry.backend(id)?;
                backend
                    .check_create_by_name(name, parent_handle)
                    .map(|h| (id, h))
            })
        };
        let (backend, handle) = found?;
        Some(self.registry.cache(backend, handle))
    }

    fn resolve_raw(&mut self, parent: HandleId, raw: NativeRef, order: &[BackendId]) -> Option<HandleId> {
        let found = {
            let parent_handle = self.registry.handle(parent)?;
            order.iter().find_map(|&id| {
                let backend = self.registry.backend(id)?;
                backend.check_create_raw(raw, parent_handle).map(|h| (id, h))
            })
        };
        let (backend, handle) = found?;
        Some(self.registry.cache(backend, handle))
    }

    // ---- iteration ----

    /// Begins a traversal of `parent` through its own backend.
    pub fn iterate(&mut self, parent: HandleId, selector: IterSelector) -> Option<GpiIterator> {
        if self.shut_down {
            return None;
        }
        let (parent_handle, backend) = self.registry.handle_with_backend(parent)?;
        match backend.iterate_handle(parent_handle, selector) {
            Some(inner) => Some(GpiIterator::new(parent_handle.backend(), parent, inner)),
            None => {
                log::debug!(
                    target: "gpi",
                    "{} cannot iterate {selector:?} of '{}'",
                    backend.name(),
                    parent_handle.fq_name()
                );
                None
            }
        }
    }

    /// Returns the next child of a traversal, or `None` once it is exhausted.
    ///
    /// Children the iterating backend cannot build are re-resolved through
    /// every other backend; a child nobody can resolve is logged and skipped.
    pub fn next(&mut self, iter: &mut GpiIterator) -> Option<HandleId> {
        if self.shut_down {
            return None;
        }
        let others: Vec<BackendId> = self
            .registry
            .backend_ids()
            .filter(|&id| id != iter.backend())
            .collect();
        loop {
            match iter.pull() {
                IterStatus::End => return None,
                IterStatus::NativeNoName => continue,
                IterStatus::Native(handle) => return Some(self.registry.cache(iter.backend(), handle)),
                IterStatus::NotNative(name) => {
                    if let Some(id) = self.resolve_by_name(iter.parent(), &name, &others) {
                        return Some(id);
                    }
                    log::warn!(target: "gpi", "no other backend could resolve '{name}', skipping");
                }
                IterStatus::NotNativeNoName(raw) => {
                    if let Some(id) = self.resolve_raw(iter.parent(), raw, &others) {
                        return Some(id);
                    }
                    log::warn!(target: "gpi", "no other backend could resolve {raw:?}, skipping");
                }
            }
        }
    }

    // ---- values ----

    fn read_value(&self, id: HandleId, format: ValueFormat) -> Option<SignalValue> {
        if self.shut_down {
            return None;
        }
        let (handle, backend) = self.registry.handle_with_backend(id)?;
        if !handle.object_type().has_value() {
            log::debug!(target: "gpi", "'{}' ({}) has no value", handle.fq_name(), handle.object_type());
            return None;
        }
        backend.get_signal_value(handle, format)
    }

    fn write_value(&self, id: HandleId, value: SignalValue, action: SetAction) -> Result<(), GpiError> {
        if self.shut_down {
            return Err(GpiError::ShutDown);
        }
        let (handle, backend) = self
            .registry
            .handle_with_backend(id)
            .ok_or(GpiError::UnknownHandle)?;
        if !handle.object_type().has_value() {
            return Err(GpiError::NotASignal {
                name: handle.fq_name().to_string(),
                object_type: handle.object_type(),
            });
        }
        if handle.is_const() {
            return Err(GpiError::ConstantObject(handle.fq_name().to_string()));
        }
        backend.set_signal_value(handle, &value, action)
    }

    /// Reads a value as a binary string, most significant bit first.
    pub fn get_signal_value_binstr(&self, id: HandleId) -> Option<String> {
        match self.read_value(id, ValueFormat::BinStr)? {
            SignalValue::BinStr(s) => Some(s),
            _ => None,
        }
    }

    /// Reads a value as a packed logic vector.
    pub fn get_signal_value_logic(&self, id: HandleId) -> Option<LogicVec> {
        LogicVec::from_binary_str(&self.get_signal_value_binstr(id)?)
    }

    /// Reads a value as a string.
    pub fn get_signal_value_str(&self, id: HandleId) -> Option<String> {
        match self.read_value(id, ValueFormat::Str)? {
            SignalValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Reads a value as a real.
    pub fn get_signal_value_real(&self, id: HandleId) -> Option<f64> {
        match self.read_value(id, ValueFormat::Real)? {
            SignalValue::Real(v) => Some(v),
            _ => None,
        }
    }

    /// Reads a value as an integer.
    pub fn get_signal_value_int(&self, id: HandleId) -> Option<i64> {
        match self.read_value(id, ValueFormat::Int)? {
            SignalValue::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Writes a binary string value.
    pub fn set_signal_value_binstr(&mut self, id: HandleId, value: &str, action: SetAction) -> Result<(), GpiError> {
        self.write_value(id, SignalValue::BinStr(value.to_string()), action)
    }

    /// Writes a string value.
    pub fn set_signal_value_str(&mut self, id: HandleId, value: &str, action: SetAction) -> Result<(), GpiError> {
        self.write_value(id, SignalValue::Str(value.to_string()), action)
    }

    /// Writes a real value.
    pub fn set_signal_value_real(&mut self, id: HandleId, value: f64, action: SetAction) -> Result<(), GpiError> {
        self.write_value(id, SignalValue::Real(value), action)
    }

    /// Writes an integer value.
    pub fn set_signal_value_int(&mut self, id: HandleId, value: i64, action: SetAction) -> Result<(), GpiError> {
        self.write_value(id, SignalValue::Int(value), action)
    }

    // ---- metadata ----

    /// Returns the design-unit name of an instance, resolved on first use.
    pub fn definition_name(&mut self, id: HandleId) -> Option<String> {
        if self.shut_down {
            return None;
        }
        if let Some(cached) = self.registry.handle(id)?.cached_definition_name() {
            return cached.map(str::to_string);
        }
        let value = {
            let (handle, backend) = self.registry.handle_with_backend(id)?;
            backend.definition_name(handle)
        };
        self.registry.handle_mut(id)?.set_definition_name(value.clone());
        value
    }

    /// Returns the source file of an instance's design unit, resolved on first use.
    pub fn definition_file(&mut self, id: HandleId) -> Option<String> {
        if self.shut_down {
            return None;
        }
        if let Some(cached) = self.registry.handle(id)?.cached_definition_file() {
            return cached.map(str::to_string);
        }
        let value = {
            let (handle, backend) = self.registry.handle_with_backend(id)?;
            backend.definition_file(handle)
        };
        self.registry.handle_mut(id)?.set_definition_file(value.clone());
        value
    }

    /// Returns the backend-native type name of an object.
    pub fn type_string(&self, id: HandleId) -> Option<String> {
        if self.shut_down {
            return None;
        }
        let (handle, backend) = self.registry.handle_with_backend(id)?;
        Some(backend.type_string(handle))
    }

    /// Returns the object type of a cached handle.
    pub fn object_type(&self, id: HandleId) -> Option<ObjectType> {
        self.handle(id).map(ObjectHandle::object_type)
    }

    // ---- simulation control ----

    fn primary(&self) -> Option<&dyn Backend> {
        if self.shut_down {
            return None;
        }
        self.registry.primary()
    }

    /// Returns the current simulation time in precision ticks.
    pub fn sim_time(&self) -> Option<u64> {
        self.primary().map(|b| b.sim_time())
    }

    /// Returns the precision as a power-of-ten exponent of one second.
    pub fn sim_precision(&self) -> Option<i32> {
        self.primary().map(|b| b.sim_precision())
    }

    /// Returns the precision as a [`TimePrecision`], if it is in range.
    pub fn time_precision(&self) -> Option<TimePrecision> {
        TimePrecision::from_exponent(self.sim_precision()?)
    }

    /// Returns the engine's product name.
    pub fn simulator_product(&self) -> Option<String> {
        self.primary().map(|b| b.simulator_product())
    }

    /// Returns the engine's version string.
    pub fn simulator_version(&self) -> Option<String> {
        self.primary().map(|b| b.simulator_version())
    }

    /// Asks the engine to finish. Only the first request is forwarded.
    pub fn sim_end(&mut self) {
        if self.sim_ending || self.shut_down {
            return;
        }
        self.sim_ending = true;
        match self.registry.primary() {
            Some(backend) => {
                log::info!(target: "gpi", "requesting end of simulation");
                backend.sim_end();
            }
            None => log::warn!(target: "gpi", "{}", GpiError::NoBackend),
        }
    }

    /// Returns `true` once an end of simulation has been requested or reported.
    pub fn sim_ending(&self) -> bool {
        self.sim_ending
    }

    /// Tears the context down: deregisters every callback, releases every
    /// non-aliasing native handle and empties the cache. Every entry point
    /// returns its failure marker afterwards.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.teardown_callbacks();
        self.registry.release_handles();
        self.shut_down = true;
        log::info!(target: "gpi", "GPI context shut down");
    }
}

impl Default for Gpi {
    fn default() -> Self {
        Self::new()
    }
}

fn describe_name(name: Option<&str>) -> String {
    name.map(|n| format!(" named '{n}'")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::StubBackend;

    fn make_gpi() -> (Gpi, HandleId) {
        let mut gpi = Gpi::new();
        gpi.register_backend(StubBackend::make("A", &["top", "top.a_sig"])).unwrap();
        gpi.register_backend(StubBackend::make("B", &["dut", "top.b_sig"])).unwrap();
        let root = gpi.get_root_handle(Some("top")).unwrap();
        (gpi, root)
    }

    #[test]
    fn root_by_name_falls_through_backends() {
        let (mut gpi, _) = make_gpi();
        let dut = gpi.get_root_handle(Some("dut")).unwrap();
        let b = gpi.find_backend("B").unwrap();
        assert_eq!(gpi.handle(dut).unwrap().backend(), b);
        assert_eq!(gpi.get_root_handle(Some("dut")), Some(dut));
        assert_eq!(gpi.get_root_handle(Some("nothing")), None);
    }

    #[test]
    fn lookup_is_idempotent() {
        let (mut gpi, root) = make_gpi();
        let first = gpi.get_handle_by_name(root, "a_sig").unwrap();
        let second = gpi.get_handle_by_name(root, "a_sig").unwrap();
        assert_eq!(first, second);
        assert!(std::ptr::eq(gpi.handle(first).unwrap(), gpi.handle(second).unwrap()));
    }

    #[test]
    fn name_falls_back_to_other_backend() {
        let (mut gpi, root) = make_gpi();
        let sig = gpi.get_handle_by_name(root, "b_sig").unwrap();
        let h = gpi.handle(sig).unwrap();
        assert_eq!(h.backend(), gpi.find_backend("B").unwrap());
        assert_eq!(h.fq_name(), "top.b_sig");
        assert_eq!(gpi.get_handle_by_name(root, "missing"), None);
    }

    #[test]
    fn index_requires_indexable_parent() {
        let (mut gpi, root) = make_gpi();
        assert_eq!(gpi.get_handle_by_index(root, 0), None);
    }

    #[test]
    fn writes_to_non_signals_rejected() {
        let (mut gpi, root) = make_gpi();
        let err = gpi.set_signal_value_int(root, 1, SetAction::Deposit).unwrap_err();
        assert!(matches!(err, GpiError::NotASignal { .. }));
    }

    #[test]
    fn primary_backend_answers_global_queries() {
        let (gpi, _) = make_gpi();
        assert_eq!(gpi.sim_precision(), Some(-12));
        assert_eq!(gpi.time_precision(), Some(TimePrecision::PS));
        assert_eq!(gpi.simulator_product().as_deref(), Some("stub"));
    }

    #[test]
    fn no_backend_means_no_answers() {
        let mut gpi = Gpi::new();
        assert_eq!(gpi.sim_time(), None);
        assert_eq!(gpi.get_root_handle(None), None);
        gpi.sim_end();
    }

    #[test]
    fn shutdown_invalidates_everything() {
        let (mut gpi, root) = make_gpi();
        gpi.shutdown();
        assert!(gpi.is_shut_down());
        assert!(gpi.handle(root).is_none());
        assert_eq!(gpi.get_root_handle(Some("top")), None);
        assert_eq!(gpi.sim_time(), None);
        assert!(matches!(
            gpi.register_backend(StubBackend::make("C", &[])),
            Err(GpiError::ShutDown)
        ));
    }

    #[test]
    fn definition_name_is_memoised() {
        let (mut gpi, root) = make_gpi();
        assert_eq!(gpi.definition_name(root), None);
        assert_eq!(
            gpi.registry.handle(root).unwrap().cached_definition_name(),
            Some(None)
        );
        assert_eq!(gpi.type_string(root).as_deref(), Some("stub"));
    }
}
