//! The engine-side VHPI routine table.

use std::fmt;

use gpi::NativeRef;

/// An opaque VHPI object, iterator or callback handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VhpiHandle(u64);

impl VhpiHandle {
    /// Wraps a raw handle value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for VhpiHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VhpiHandle({:#x})", self.0)
    }
}

impl From<VhpiHandle> for NativeRef {
    fn from(h: VhpiHandle) -> Self {
        NativeRef::from_raw(h.0)
    }
}

impl From<NativeRef> for VhpiHandle {
    fn from(r: NativeRef) -> Self {
        VhpiHandle(r.as_raw())
    }
}

/// A value crossing `vhpi_get_value` / `vhpi_put_value`.
#[derive(Clone, PartialEq, Debug)]
pub enum VhpiValue {
    /// `vhpiBinStrVal`.
    BinStr(String),
    /// `vhpiEnumVal`: position of the literal.
    Enum(u32),
    /// `vhpiIntVal`.
    Int(i32),
    /// `vhpiRealVal`.
    Real(f64),
    /// `vhpiStrVal`.
    Str(String),
}

/// Arguments of `vhpi_register_cb`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct VhpiCbData {
    /// One of the `VHPI_CB_*` reasons.
    pub reason: i32,
    /// The watched object, for value-change callbacks.
    pub object: Option<VhpiHandle>,
    /// Relative delay in resolution-limit units, for `vhpiCbAfterDelay`.
    pub delay: u64,
    /// Opaque word handed back when the callback fires.
    pub user_data: u64,
}

/// One entry from `vhpi_check_error`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct VhpiErrorInfo {
    /// One of the `VHPI_NOTE` .. `VHPI_FAILURE` severities.
    pub severity: i32,
    /// The engine's message.
    pub message: String,
}

/// The `vhpi_*` routines an engine provides.
pub trait VhpiRoutines {
    /// `vhpi_handle`: one-to-one relationship from `reference` (or the tool).
    fn handle(&self, relation: i32, reference: Option<VhpiHandle>) -> Option<VhpiHandle>;

    /// `vhpi_handle_by_name`: a hierarchical name, optionally relative to `scope`.
    fn handle_by_name(&self, name: &str, scope: Option<VhpiHandle>) -> Option<VhpiHandle>;

    /// `vhpi_handle_by_index`: the `offset`-th object of `relation` from
    /// `parent`, counted from the left bound.
    fn handle_by_index(&self, relation: i32, parent: VhpiHandle, offset: u64) -> Option<VhpiHandle>;

    /// `vhpi_iterator`: `None` when the relationship is empty.
    fn iterator(&self, relation: i32, reference: VhpiHandle) -> Option<VhpiHandle>;

    /// `vhpi_scan`: `None` once the iterator is exhausted (which also frees it).
    fn scan(&self, iterator: VhpiHandle) -> Option<VhpiHandle>;

    /// `vhpi_get` for integer properties. Unknown properties yield `VHPI_UNDEFINED`.
    fn get(&self, property: i32, object: VhpiHandle) -> i32;

    /// `vhpi_get_str` for string properties.
    fn get_str(&self, property: i32, object: VhpiHandle) -> Option<String>;

    /// `vhpi_get_phys` for physical properties, in femtoseconds.
    fn get_phys(&self, property: i32, object: Option<VhpiHandle>) -> Option<u64>;

    /// `vhpi_get_value` in one of the `VHPI_*_VAL` formats.
    fn get_value(&self, object: VhpiHandle, format: i32) -> Option<VhpiValue>;

    /// `vhpi_put_value` with one of the put modes. Returns `false` on rejection.
    fn put_value(&self, object: VhpiHandle, value: &VhpiValue, mode: i32) -> bool;

    /// `vhpi_register_cb`.
    fn register_cb(&self, data: &VhpiCbData) -> Option<VhpiHandle>;

    /// `vhpi_remove_cb`. Engines may refuse while the callback is executing.
    fn remove_cb(&self, callback: VhpiHandle) -> bool;

    /// `vhpi_get_time` in resolution-limit units.
    fn get_time(&self) -> u64;

    /// `vhpi_control`.
    fn control(&self, command: i32) -> bool;

    /// `vhpi_check_error`: the error raised by the last routine call, if any.
    fn check_error(&self) -> Option<VhpiErrorInfo>;

    /// `vhpi_release_handle`.
    fn release_handle(&self, object: VhpiHandle);
}
