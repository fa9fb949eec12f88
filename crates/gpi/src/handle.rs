//! The backend-agnostic object handle model.
//!
//! An [`ObjectHandle`] stands for one simulation object (module, signal,
//! array element, generate block) behind an opaque [`NativeRef`]. Backends
//! build handles only after the engine has confirmed the object exists and
//! the backend could classify it; the registry then adopts and caches them.

use std::fmt;

use crate::arena::ArenaId;
use crate::callback::{CallbackId, Edge};
use crate::native::NativeRef;

/// Index of a registered backend, in registration order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BackendId(u32);

impl BackendId {
    /// Placeholder carried by handles a backend has built but the registry
    /// has not yet adopted.
    pub const DETACHED: BackendId = BackendId(u32::MAX);

    /// Creates a `BackendId` from a registration index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the registration index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// Identity of a cached [`ObjectHandle`].
///
/// Two lookups that resolve to the same fully-qualified name yield equal
/// `HandleId`s.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct HandleId(u32);

impl ArenaId for HandleId {
    fn from_raw(index: u32) -> Self {
        Self(index)
    }

    fn as_raw(self) -> u32 {
        self.0
    }
}

/// The backend-neutral classification of a simulation object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ObjectType {
    /// A design unit instance or other named scope.
    Module,
    /// An unpacked array of non-logic elements.
    Array,
    /// A generate-loop array (pseudo-region).
    GenArray,
    /// A record or struct.
    Structure,
    /// A single logic bit.
    Logic,
    /// A one-dimensional logic vector.
    LogicArray,
    /// An integer variable or signal.
    Integer,
    /// A real-valued variable or signal.
    Real,
    /// An enumeration-typed object.
    Enum,
    /// A string-valued object.
    String,
    /// A parameter whose value is fixed at elaboration.
    Parameter,
    /// Anything the backend could see but not map.
    Unknown,
}

impl ObjectType {
    /// Returns `true` for kinds addressable by position (`get_handle_by_index`).
    pub fn is_indexable(self) -> bool {
        matches!(
            self,
            ObjectType::Array | ObjectType::GenArray | ObjectType::LogicArray
        )
    }

    /// Returns `true` for kinds that carry a readable value.
    pub fn has_value(self) -> bool {
        matches!(
            self,
            ObjectType::Logic
                | ObjectType::LogicArray
                | ObjectType::Integer
                | ObjectType::Real
                | ObjectType::Enum
                | ObjectType::String
                | ObjectType::Parameter
        )
    }

    /// Returns the canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Module => "MODULE",
            ObjectType::Array => "ARRAY",
            ObjectType::GenArray => "GENARRAY",
            ObjectType::Structure => "STRUCTURE",
            ObjectType::Logic => "LOGIC",
            ObjectType::LogicArray => "LOGIC_ARRAY",
            ObjectType::Integer => "INTEGER",
            ObjectType::Real => "REAL",
            ObjectType::Enum => "ENUM",
            ObjectType::String => "STRING",
            ObjectType::Parameter => "PARAMETER",
            ObjectType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of an index range.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RangeDirection {
    /// `left <= right` (`to` in VHDL, `[0:7]` in Verilog).
    Up,
    /// `left > right` (`downto` in VHDL, `[7:0]` in Verilog).
    Down,
}

/// The index range of an indexable object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Range {
    left: i64,
    right: i64,
}

impl Range {
    /// Creates a range from the bounds in the order the backend reports them.
    pub fn from_bounds(left: i64, right: i64) -> Self {
        Self { left, right }
    }

    /// Returns the left bound.
    pub fn left(&self) -> i64 {
        self.left
    }

    /// Returns the right bound.
    pub fn right(&self) -> i64 {
        self.right
    }

    /// Returns `Down` when `left > right`, else `Up`.
    pub fn direction(&self) -> RangeDirection {
        if self.left > self.right {
            RangeDirection::Down
        } else {
            RangeDirection::Up
        }
    }

    /// Returns `|left - right| + 1`.
    pub fn num_elems(&self) -> u64 {
        self.left.abs_diff(self.right) + 1
    }

    /// Returns `true` if `index` lies between the bounds.
    pub fn contains(&self, index: i64) -> bool {
        let (lo, hi) = if self.left <= self.right {
            (self.left, self.right)
        } else {
            (self.right, self.left)
        };
        (lo..=hi).contains(&index)
    }
}

/// Lazily resolved attribute: `None` until first asked, then memoised.
type Lazy<T> = Option<Option<T>>;

/// One simulation object, owned by the backend that constructed it.
#[derive(Debug, Clone)]
pub struct ObjectHandle {
    backend: BackendId,
    native: NativeRef,
    object_type: ObjectType,
    name: String,
    fq_name: String,
    is_const: bool,
    range: Option<Range>,
    aliases_parent: bool,
    definition_name: Lazy<String>,
    definition_file: Lazy<String>,
    edge_callbacks: [Option<CallbackId>; 3],
}

impl ObjectHandle {
    /// Creates a handle for a classified object.
    pub fn new(
        native: NativeRef,
        object_type: ObjectType,
        name: impl Into<String>,
        fq_name: impl Into<String>,
    ) -> Self {
        Self {
            backend: BackendId::DETACHED,
            native,
            object_type,
            name: name.into(),
            fq_name: fq_name.into(),
            is_const: false,
            range: None,
            aliases_parent: false,
            definition_name: None,
            definition_file: None,
            edge_callbacks: [None; 3],
        }
    }

    /// Creates the pseudo-region standing for a whole generate array.
    ///
    /// The pseudo-region has no native object of its own: it reuses the
    /// parent scope's reference, so it must never be released separately.
    pub fn pseudo_region(parent: &ObjectHandle, label: &str, range: Option<Range>) -> Self {
        let mut handle = Self::new(
            parent.native,
            ObjectType::GenArray,
            label,
            format!("{}.{}", parent.fq_name, label),
        );
        handle.range = range;
        handle.aliases_parent = true;
        handle
    }

    /// Marks the object constant.
    pub fn with_const(mut self, is_const: bool) -> Self {
        self.is_const = is_const;
        self
    }

    /// Attaches an index range. Ignored for non-indexable kinds.
    pub fn with_range(mut self, range: Option<Range>) -> Self {
        if self.object_type.is_indexable() {
            self.range = range;
        }
        self
    }

    /// Pre-fills the definition name and file when the backend already has them.
    pub fn with_definition(mut self, name: Option<String>, file: Option<String>) -> Self {
        self.definition_name = Some(name);
        self.definition_file = Some(file);
        self
    }

    /// Returns the owning backend.
    pub fn backend(&self) -> BackendId {
        self.backend
    }

    /// Returns the backend-native reference.
    pub fn native(&self) -> NativeRef {
        self.native
    }

    /// Returns the object type assigned at construction.
    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    /// Returns the local name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fully-qualified hierarchical name (the registry key).
    pub fn fq_name(&self) -> &str {
        &self.fq_name
    }

    /// Returns `true` if the object cannot be written.
    pub fn is_const(&self) -> bool {
        self.is_const
    }

    /// Returns `true` if the object carries index range metadata.
    pub fn indexable(&self) -> bool {
        self.range.is_some()
    }

    /// Returns the index range, present only for indexable objects.
    pub fn range(&self) -> Option<Range> {
        self.range
    }

    /// Returns `true` for a pseudo-region aliasing its parent's native reference.
    pub fn aliases_parent(&self) -> bool {
        self.aliases_parent
    }

    pub(crate) fn adopt(&mut self, backend: BackendId) {
        self.backend = backend;
    }

    pub(crate) fn cached_definition_name(&self) -> Option<Option<&str>> {
        self.definition_name.as_ref().map(Option::as_deref)
    }

    pub(crate) fn cached_definition_file(&self) -> Option<Option<&str>> {
        self.definition_file.as_ref().map(Option::as_deref)
    }

    pub(crate) fn set_definition_name(&mut self, value: Option<String>) {
        self.definition_name = Some(value);
    }

    pub(crate) fn set_definition_file(&mut self, value: Option<String>) {
        self.definition_file = Some(value);
    }

    pub(crate) fn edge_callback(&self, edge: Edge) -> Option<CallbackId> {
        self.edge_callbacks[edge.slot()]
    }

    pub(crate) fn set_edge_callback(&mut self, edge: Edge, id: Option<CallbackId>) {
        self.edge_callbacks[edge.slot()] = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_handle(object_type: ObjectType) -> ObjectHandle {
        ObjectHandle::new(NativeRef::from_raw(0x10), object_type, "sig", "top.sig")
    }

    #[test]
    fn range_descending() {
        let r = Range::from_bounds(7, 0);
        assert_eq!(r.direction(), RangeDirection::Down);
        assert_eq!(r.num_elems(), 8);
    }

    #[test]
    fn range_ascending() {
        let r = Range::from_bounds(0, 7);
        assert_eq!(r.direction(), RangeDirection::Up);
        assert_eq!(r.num_elems(), 8);
    }

    #[test]
    fn range_single_and_negative() {
        let single = Range::from_bounds(3, 3);
        assert_eq!(single.direction(), RangeDirection::Up);
        assert_eq!(single.num_elems(), 1);
        let neg = Range::from_bounds(-2, 5);
        assert_eq!(neg.num_elems(), 8);
        assert!(neg.contains(-2));
        assert!(!neg.contains(6));
    }

    #[test]
    fn range_only_on_indexable() {
        let scalar = make_handle(ObjectType::Logic).with_range(Some(Range::from_bounds(1, 0)));
        assert!(!scalar.indexable());
        let vector =
            make_handle(ObjectType::LogicArray).with_range(Some(Range::from_bounds(1, 0)));
        assert!(vector.indexable());
        assert_eq!(vector.range().map(|r| r.num_elems()), Some(2));
    }

    #[test]
    fn new_handle_is_detached() {
        let h = make_handle(ObjectType::Logic);
        assert_eq!(h.backend(), BackendId::DETACHED);
        assert!(!h.is_const());
        assert_eq!(h.cached_definition_name(), None);
    }

    #[test]
    fn pseudo_region_aliases_parent() {
        let parent = ObjectHandle::new(NativeRef::from_raw(0x42), ObjectType::Module, "top", "top");
        let region = ObjectHandle::pseudo_region(&parent, "gen_blk", Some(Range::from_bounds(0, 3)));
        assert_eq!(region.native(), parent.native());
        assert_eq!(region.object_type(), ObjectType::GenArray);
        assert_eq!(region.fq_name(), "top.gen_blk");
        assert!(region.aliases_parent());
        assert_eq!(region.range().map(|r| r.num_elems()), Some(4));
    }

    #[test]
    fn type_predicates() {
        assert!(ObjectType::GenArray.is_indexable());
        assert!(!ObjectType::Module.is_indexable());
        assert!(ObjectType::Real.has_value());
        assert!(!ObjectType::Structure.has_value());
        assert_eq!(ObjectType::LogicArray.to_string(), "LOGIC_ARRAY");
    }
}
