//! Opaque backend-native references.

use std::fmt;

/// A pointer-sized token owned by exactly one backend.
///
/// The GPI core stores and hands these back, but never inspects them or
/// does arithmetic on them: only the backend that produced a `NativeRef`
/// (and the engine behind it) may interpret [`as_raw`](Self::as_raw).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeRef(u64);

impl NativeRef {
    /// Wraps a raw engine handle value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw engine handle value. Backends only.
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for NativeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeRef({:#x})", self.0)
    }
}
