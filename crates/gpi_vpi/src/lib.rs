//! VPI backend for the generic procedural interface.
//!
//! Adapts an engine's Verilog procedural interface, expressed as the
//! [`VpiRoutines`] table, to the [`gpi::Backend`] contract: object lookup
//! and classification, relationship-driven iteration with generate-scope
//! folding, value access and callback registration.

#![warn(missing_docs)]

mod access;
pub mod backend;
pub mod classify;
pub mod consts;
pub mod iterator;
pub mod routines;
pub mod startup;

pub use access::BACKEND_NAME;
pub use backend::VpiBackend;
pub use routines::{CbData, VpiErrorInfo, VpiHandle, VpiRoutines, VpiValue};
pub use startup::{entry_point, register, LIBRARY_NAME};
