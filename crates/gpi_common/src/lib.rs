//! Shared foundational types for the generic procedural interface (GPI).
//!
//! This crate provides the 4-state logic value, the packed logic vector used
//! for binary-string signal encoding, and simulation time / precision types
//! shared by the GPI core, its backends, and the reference engine.

#![warn(missing_docs)]

pub mod logic;
pub mod logic_vec;
pub mod time;

pub use logic::Logic;
pub use logic_vec::LogicVec;
pub use time::{SimTime, TimePrecision};
