//! Raw handle encoding shared by both interfaces.
//!
//! A raw handle is `(kind << 56) | index`. Every kind is non-zero, so no
//! valid handle is ever 0.

const KIND_SHIFT: u32 = 56;
const INDEX_MASK: u64 = (1 << KIND_SHIFT) - 1;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum HandleKind {
    Object = 1,
    Iterator = 2,
    Callback = 3,
    Type = 4,
    Tool = 5,
    DesignUnit = 6,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct RawHandle {
    pub(crate) kind: HandleKind,
    pub(crate) index: u32,
}

impl RawHandle {
    pub(crate) fn new(kind: HandleKind, index: u32) -> Self {
        Self { kind, index }
    }

    pub(crate) fn to_raw(self) -> u64 {
        ((self.kind as u64) << KIND_SHIFT) | u64::from(self.index)
    }

    pub(crate) fn from_raw(raw: u64) -> Option<Self> {
        let kind = match raw >> KIND_SHIFT {
            1 => HandleKind::Object,
            2 => HandleKind::Iterator,
            3 => HandleKind::Callback,
            4 => HandleKind::Type,
            5 => HandleKind::Tool,
            6 => HandleKind::DesignUnit,
            _ => return None,
        };
        let index = u32::try_from(raw & INDEX_MASK).ok()?;
        Some(Self { kind, index })
    }

    /// Decodes `raw` only if it is of `kind`.
    pub(crate) fn of_kind(raw: u64, kind: HandleKind) -> Option<u32> {
        Self::from_raw(raw)
            .filter(|h| h.kind == kind)
            .map(|h| h.index)
    }
}
