//! VHPI backend for the generic procedural interface.
//!
//! Adapts an engine's VHDL procedural interface, expressed as the
//! [`VhpiRoutines`] table, to the [`gpi::Backend`] contract. Objects are
//! classified by walking their declared type through subtypes and element
//! types; callback removal follows VHPI's rule that an executing callback
//! cannot be removed until it matures.

#![warn(missing_docs)]

mod access;
pub mod backend;
pub mod classify;
pub mod consts;
pub mod iterator;
pub mod routines;
pub mod startup;

pub use access::BACKEND_NAME;
pub use backend::VhpiBackend;
pub use routines::{VhpiCbData, VhpiErrorInfo, VhpiHandle, VhpiRoutines, VhpiValue};
pub use startup::{entry_point, register, LIBRARY_NAME};
