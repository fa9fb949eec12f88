//! The engine-side VPI routine table.
//!
//! [`VpiRoutines`] is the set of `vpi_*` entry points the backend calls. An
//! engine (or a binding to a shared-library simulator) implements it; the
//! backend never sees anything but opaque [`VpiHandle`]s.

use std::fmt;

use gpi::NativeRef;

/// An opaque VPI object, iterator or callback handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VpiHandle(u64);

impl VpiHandle {
    /// Wraps a raw handle value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for VpiHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VpiHandle({:#x})", self.0)
    }
}

impl From<VpiHandle> for NativeRef {
    fn from(h: VpiHandle) -> Self {
        NativeRef::from_raw(h.0)
    }
}

impl From<NativeRef> for VpiHandle {
    fn from(r: NativeRef) -> Self {
        VpiHandle(r.as_raw())
    }
}

/// A value crossing `vpi_get_value` / `vpi_put_value`.
#[derive(Clone, PartialEq, Debug)]
pub enum VpiValue {
    /// `vpiBinStrVal`.
    BinStr(String),
    /// `vpiIntVal`.
    Int(i32),
    /// `vpiRealVal`.
    Real(f64),
    /// `vpiStringVal`.
    Str(String),
}

/// Arguments of `vpi_register_cb`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CbData {
    /// One of the `CB_*` reasons.
    pub reason: i32,
    /// The watched object, for value-change callbacks.
    pub object: Option<VpiHandle>,
    /// Relative delay in precision ticks, for `cbAfterDelay`.
    pub delay: u64,
    /// Opaque word handed back when the callback fires.
    pub user_data: u64,
}

/// One entry from `vpi_chk_error`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct VpiErrorInfo {
    /// One of the `VPI_NOTICE` .. `VPI_INTERNAL` levels.
    pub level: i32,
    /// The engine's message.
    pub message: String,
}

/// The `vpi_*` routines an engine provides.
pub trait VpiRoutines {
    /// `vpi_handle_by_name`: a hierarchical name, optionally relative to `scope`.
    fn handle_by_name(&self, name: &str, scope: Option<VpiHandle>) -> Option<VpiHandle>;

    /// `vpi_handle_by_index`.
    fn handle_by_index(&self, object: VpiHandle, index: i64) -> Option<VpiHandle>;

    /// `vpi_iterate`: `None` when the relationship is empty.
    fn iterate(&self, relation: i32, scope: Option<VpiHandle>) -> Option<VpiHandle>;

    /// `vpi_scan`: `None` once the iterator is exhausted (which also frees it).
    fn scan(&self, iterator: VpiHandle) -> Option<VpiHandle>;

    /// `vpi_get` for integer properties. Unknown properties yield `VPI_UNDEFINED`.
    fn get(&self, property: i32, object: Option<VpiHandle>) -> i32;

    /// `vpi_get_str` for string properties.
    fn get_str(&self, property: i32, object: VpiHandle) -> Option<String>;

    /// Left and right bounds of a vector or array.
    fn get_range(&self, object: VpiHandle) -> Option<(i64, i64)>;

    /// `vpi_get_value` in one of the `VPI_*_VAL` formats.
    fn get_value(&self, object: VpiHandle, format: i32) -> Option<VpiValue>;

    /// `vpi_put_value` with one of the put flags. Returns `false` on rejection.
    fn put_value(&self, object: VpiHandle, value: &VpiValue, flags: i32) -> bool;

    /// `vpi_register_cb`.
    fn register_cb(&self, data: &CbData) -> Option<VpiHandle>;

    /// `vpi_remove_cb`.
    fn remove_cb(&self, callback: VpiHandle) -> bool;

    /// `vpi_get_time` in precision ticks.
    fn get_time(&self) -> u64;

    /// `vpi_control`.
    fn control(&self, operation: i32) -> bool;

    /// `vpi_get_vlog_info`: product and version.
    fn vlog_info(&self) -> Option<(String, String)>;

    /// `vpi_chk_error`: the error raised by the last routine call, if any.
    fn chk_error(&self) -> Option<VpiErrorInfo>;

    /// `vpi_release_handle`.
    fn release_handle(&self, object: VpiHandle);
}
