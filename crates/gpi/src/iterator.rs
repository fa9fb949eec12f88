//! Child traversal and the cross-backend fallback protocol.
//!
//! A backend iterator walks an ordered list of relationship kinds for its
//! parent's type, opening one native sub-iterator per relationship. Each
//! step reports an [`IterStatus`]: either a handle the backend built itself,
//! or a name / raw reference that only another backend can turn into a
//! handle. [`GpiIterator`] wraps the backend iterator and guarantees that
//! once `End` is seen, it stays seen.

use crate::handle::{BackendId, HandleId, ObjectHandle};
use crate::native::NativeRef;

/// Which relationship class to traverse.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum IterSelector {
    /// Child objects.
    Objects,
    /// Drivers of a signal.
    Drivers,
    /// Loads of a signal.
    Loads,
}

/// One step of a backend traversal.
#[derive(Debug)]
pub enum IterStatus {
    /// A handle this backend constructed.
    Native(ObjectHandle),
    /// An object with no name; skip it.
    NativeNoName,
    /// A named child this backend cannot construct; re-resolve by name
    /// through the other backends.
    NotNative(String),
    /// An unnamed object this backend cannot construct; re-resolve the raw
    /// reference through the other backends.
    NotNativeNoName(NativeRef),
    /// Traversal is exhausted.
    End,
}

/// A backend-specific traversal in progress.
pub trait BackendIterator {
    /// Advances to the next candidate child.
    fn next_handle(&mut self) -> IterStatus;
}

/// Cursor over a static relationship mapping.
///
/// Holds the position within the mapping and the native sub-iterator of the
/// currently active relationship. When a sub-iterator runs dry the walk
/// opens the next relationship; when the mapping runs out the walk is over.
#[derive(Debug, Clone)]
pub struct RelationshipWalk<R: Copy> {
    mapping: Vec<R>,
    position: usize,
    active: Option<(R, NativeRef)>,
}

impl<R: Copy> RelationshipWalk<R> {
    /// Creates a walk over `mapping`, in order.
    pub fn new(mapping: &[R]) -> Self {
        Self {
            mapping: mapping.to_vec(),
            position: 0,
            active: None,
        }
    }

    /// Returns the next native object and the relationship it came from.
    ///
    /// `open` starts a native sub-iterator for a relationship (returning
    /// `None` when the relationship is empty); `scan` pulls one object from
    /// a sub-iterator (returning `None` when it is exhausted).
    pub fn next_candidate(
        &mut self,
        mut open: impl FnMut(R) -> Option<NativeRef>,
        mut scan: impl FnMut(NativeRef) -> Option<NativeRef>,
    ) -> Option<(R, NativeRef)> {
        loop {
            if let Some((relation, iter)) = self.active {
                if let Some(object) = scan(iter) {
                    return Some((relation, object));
                }
                self.active = None;
            }
            let relation = *self.mapping.get(self.position)?;
            self.position += 1;
            self.active = open(relation).map(|iter| (relation, iter));
        }
    }

    /// Returns `true` once every relationship has been opened and drained.
    pub fn is_exhausted(&self) -> bool {
        self.active.is_none() && self.position >= self.mapping.len()
    }

    /// Returns the native sub-iterator still open, if any. An abandoned walk
    /// must hand this back to the engine.
    pub fn open_iterator(&self) -> Option<NativeRef> {
        self.active.map(|(_, iter)| iter)
    }
}

/// A traversal handed to the scheduler.
pub struct GpiIterator {
    backend: BackendId,
    parent: HandleId,
    inner: Box<dyn BackendIterator>,
    exhausted: bool,
}

impl GpiIterator {
    pub(crate) fn new(backend: BackendId, parent: HandleId, inner: Box<dyn BackendIterator>) -> Self {
        Self {
            backend,
            parent,
            inner,
            exhausted: false,
        }
    }

    /// Returns the backend that produced the traversal.
    pub fn backend(&self) -> BackendId {
        self.backend
    }

    /// Returns the handle being traversed.
    pub fn parent(&self) -> HandleId {
        self.parent
    }

    /// Returns `true` once the traversal has reported `End`.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Pulls one step from the backend, latching `End`.
    pub(crate) fn pull(&mut self) -> IterStatus {
        if self.exhausted {
            return IterStatus::End;
        }
        let status = self.inner.next_handle();
        if matches!(status, IterStatus::End) {
            self.exhausted = true;
        }
        status
    }
}
