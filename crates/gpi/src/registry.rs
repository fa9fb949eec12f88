//! Registered backends and the fq-name keyed handle cache.

use std::collections::HashMap;

use lasso::Rodeo;

use crate::arena::Arena;
use crate::backend::Backend;
use crate::error::GpiError;
use crate::handle::{BackendId, HandleId, ObjectHandle};

/// Interned fully-qualified name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct FqName(u32);

// SAFETY: `FqName` wraps a `u32`, which always fits in a `usize` on the
// supported platforms. `try_from_usize` rejects values that don't fit in `u32`.
unsafe impl lasso::Key for FqName {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(FqName)
    }
}

/// Process-wide backend list and handle cache.
///
/// Backends are append-only; the first one registered is the primary used
/// for global queries. Handles are cached by fq-name with at most one live
/// handle per name: caching a second handle for a known name discards it and
/// returns the existing ID.
pub struct Registry {
    backends: Vec<Box<dyn Backend>>,
    handles: Arena<HandleId, ObjectHandle>,
    names: Rodeo<FqName>,
    by_name: HashMap<FqName, HandleId>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
            handles: Arena::new(),
            names: Rodeo::new(),
            by_name: HashMap::new(),
        }
    }

    /// Appends a backend. A name that is already registered is rejected and
    /// the existing backend is kept.
    pub fn register_backend(&mut self, backend: Box<dyn Backend>) -> Result<BackendId, GpiError> {
        if self.find_backend(backend.name()).is_some() {
            return Err(GpiError::DuplicateBackend(backend.name().to_string()));
        }
        let id = BackendId::from_raw(self.backends.len() as u32);
        self.backends.push(backend);
        Ok(id)
    }

    /// Returns the backend with the given ID.
    pub fn backend(&self, id: BackendId) -> Option<&dyn Backend> {
        self.backends.get(id.as_raw() as usize).map(Box::as_ref)
    }

    /// Returns the first registered backend.
    pub fn primary(&self) -> Option<&dyn Backend> {
        self.backends.first().map(Box::as_ref)
    }

    /// Finds a backend by name.
    pub fn find_backend(&self, name: &str) -> Option<BackendId> {
        self.backends
            .iter()
            .position(|b| b.name() == name)
            .map(|i| BackendId::from_raw(i as u32))
    }

    /// Returns the number of registered backends.
    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Returns every backend ID in registration order.
    pub fn backend_ids(&self) -> impl Iterator<Item = BackendId> {
        (0..self.backends.len() as u32).map(BackendId::from_raw)
    }

    /// Returns `first` followed by every other backend in registration order.
    pub fn resolution_order(&self, first: BackendId) -> Vec<BackendId> {
        let mut order = Vec::with_capacity(self.backends.len());
        if self.backend(first).is_some() {
            order.push(first);
        }
        order.extend(self.backend_ids().filter(|&id| id != first));
        order
    }

    /// Looks up a cached handle by fq-name.
    pub fn lookup(&self, fq_name: &str) -> Option<HandleId> {
        let key = self.names.get(fq_name)?;
        self.by_name.get(&key).copied()
    }

    /// Adopts `handle` on behalf of `backend` and caches it, unless a handle
    /// with the same fq-name is already cached, in which case `handle` is
    /// dropped and the existing ID returned.
    pub fn cache(&mut self, backend: BackendId, mut handle: ObjectHandle) -> HandleId {
        let key = self.names.get_or_intern(handle.fq_name());
        if let Some(&existing) = self.by_name.get(&key) {
            log::trace!(target: "gpi::registry", "cache hit for '{}'", handle.fq_name());
            return existing;
        }
        handle.adopt(backend);
        log::debug!(
            target: "gpi::registry",
            "caching {} '{}'",
            handle.object_type(),
            handle.fq_name()
        );
        let id = self.handles.alloc(handle);
        self.by_name.insert(key, id);
        id
    }

    /// Returns a cached handle.
    pub fn handle(&self, id: HandleId) -> Option<&ObjectHandle> {
        self.handles.get(id)
    }

    pub(crate) fn handle_mut(&mut self, id: HandleId) -> Option<&mut ObjectHandle> {
        self.handles.get_mut(id)
    }

    /// Returns a cached handle together with its owning backend.
    pub fn handle_with_backend(&self, id: HandleId) -> Option<(&ObjectHandle, &dyn Backend)> {
        let handle = self.handles.get(id)?;
        let backend = self.backend(handle.backend())?;
        Some((handle, backend))
    }

    /// Returns the number of cached handles.
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Releases every non-aliasing native reference through its backend and
    /// empties the cache. All handle IDs are invalid afterwards.
    pub fn release_handles(&mut self) {
        for (_, handle) in self.handles.iter() {
            if handle.aliases_parent() {
                continue;
            }
            if let Some(backend) = self.backend(handle.backend()) {
                backend.release(handle.native());
            }
        }
        self.handles.clear();
        self.by_name.clear();
        self.names = Rodeo::new();
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::backend::{
        CallbackReason, Deregistration, SetAction, SignalValue, ValueFormat,
    };
    use crate::handle::ObjectType;
    use crate::iterator::{BackendIterator, IterSelector};
    use crate::native::NativeRef;

    /// Minimal backend that knows a fixed set of names and records releases.
    pub(crate) struct StubBackend {
        pub name: &'static str,
        pub known: Vec<&'static str>,
        pub released: Rc<RefCell<Vec<u64>>>,
    }

    impl StubBackend {
        pub(crate) fn make(name: &'static str, known: &[&'static str]) -> Self {
            Self {
                name,
                known: known.to_vec(),
                released: Rc::new(RefCell::new(Vec::new())),
            }
        }
    }

    impl Backend for StubBackend {
        fn name(&self) -> &str {
            self.name
        }

        fn root_handle(&self, name: Option<&str>) -> Option<ObjectHandle> {
            let root = *self.known.first()?;
            if name.is_some_and(|n| n != root) {
                return None;
            }
            Some(ObjectHandle::new(NativeRef::from_raw(1), ObjectType::Module, root, root))
        }

        fn check_create_by_name(&self, name: &str, parent: &ObjectHandle) -> Option<ObjectHandle> {
            let fq = format!("{}.{}", parent.fq_name(), name);
            let pos = self.known.iter().position(|k| *k == fq)?;
            Some(ObjectHandle::new(
                NativeRef::from_raw(pos as u64 + 1),
                ObjectType::Logic,
                name,
                fq,
            ))
        }

        fn check_create_by_index(&self, _index: i64, _parent: &ObjectHandle) -> Option<ObjectHandle> {
            None
        }

        fn check_create_raw(&self, _raw: NativeRef, _parent: &ObjectHandle) -> Option<ObjectHandle> {
            None
        }

        fn iterate_handle(
            &self,
            _parent: &ObjectHandle,
            _selector: IterSelector,
        ) -> Option<Box<dyn BackendIterator>> {
            None
        }

        fn register_callback(&self, _reason: CallbackReason, _token: u64) -> Result<NativeRef, GpiError> {
            Ok(NativeRef::from_raw(0))
        }

        fn deregister_callback(&self, _registration: NativeRef) -> Result<Deregistration, GpiError> {
            Ok(Deregistration::Removed)
        }

        fn release_matured(&self, _registration: NativeRef) -> bool {
            true
        }

        fn get_signal_value(&self, _signal: &ObjectHandle, _format: ValueFormat) -> Option<SignalValue> {
            None
        }

        fn set_signal_value(
            &self,
            _signal: &ObjectHandle,
            _value: &SignalValue,
            _action: SetAction,
        ) -> Result<(), GpiError> {
            Ok(())
        }

        fn definition_name(&self, _object: &ObjectHandle) -> Option<String> {
            None
        }

        fn definition_file(&self, _object: &ObjectHandle) -> Option<String> {
            None
        }

        fn type_string(&self, _object: &ObjectHandle) -> String {
            "stub".to_string()
        }

        fn sim_end(&self) {}

        fn sim_time(&self) -> u64 {
            0
        }

        fn sim_precision(&self) -> i32 {
            -12
        }

        fn simulator_product(&self) -> String {
            "stub".to_string()
        }

        fn simulator_version(&self) -> String {
            "0".to_string()
        }

        fn release(&self, native: NativeRef) {
            self.released.borrow_mut().push(native.as_raw());
        }
    }

    fn make_handle(fq: &str, native: u64) -> ObjectHandle {
        ObjectHandle::new(NativeRef::from_raw(native), ObjectType::Logic, "sig", fq)
    }

    #[test]
    fn duplicate_backend_rejected() {
        let mut reg = Registry::new();
        let a = reg.register_backend(Box::new(StubBackend::make("VPI", &["top"]))).unwrap();
        let err = reg
            .register_backend(Box::new(StubBackend::make("VPI", &["other"])))
            .unwrap_err();
        assert!(matches!(err, GpiError::DuplicateBackend(ref n) if n == "VPI"));
        assert_eq!(reg.backend_count(), 1);
        assert_eq!(reg.find_backend("VPI"), Some(a));
        // The original survives, not the rejected one.
        assert!(reg.primary().unwrap().root_handle(Some("top")).is_some());
    }

    #[test]
    fn cache_dedupes_by_fq_name() {
        let mut reg = Registry::new();
        let b = BackendId::from_raw(0);
        let first = reg.cache(b, make_handle("top.sig", 1));
        let second = reg.cache(BackendId::from_raw(1), make_handle("top.sig", 2));
        assert_eq!(first, second);
        assert_eq!(reg.handle_count(), 1);
        let h = reg.handle(first).unwrap();
        assert_eq!(h.native().as_raw(), 1);
        assert_eq!(h.backend(), b);
        assert_eq!(reg.lookup("top.sig"), Some(first));
        assert_eq!(reg.lookup("top.other"), None);
    }

    #[test]
    fn resolution_order_puts_owner_first() {
        let mut reg = Registry::new();
        for name in ["A", "B", "C"] {
            reg.register_backend(Box::new(StubBackend::make(name, &[]))).unwrap();
        }
        let order: Vec<u32> = reg
            .resolution_order(BackendId::from_raw(1))
            .into_iter()
            .map(BackendId::as_raw)
            .collect();
        assert_eq!(order, vec![1, 0, 2]);
    }

    #[test]
    fn release_skips_aliasing_handles() {
        let mut reg = Registry::new();
        let stub = StubBackend::make("VPI", &[]);
        let released = Rc::clone(&stub.released);
        let b = reg.register_backend(Box::new(stub)).unwrap();
        let parent = ObjectHandle::new(NativeRef::from_raw(7), ObjectType::Module, "top", "top");
        let region = ObjectHandle::pseudo_region(&parent, "gen", None);
        reg.cache(b, parent);
        reg.cache(b, region);
        reg.release_handles();
        assert_eq!(*released.borrow(), vec![7]);
        assert_eq!(reg.handle_count(), 0);
        assert_eq!(reg.lookup("top"), None);
    }
}
