//! Reference simulation engine for the GPI.
//!
//! This crate implements a small event-driven engine over an elaborated,
//! mixed-language [`Design`] and exposes it through both the VPI and VHPI
//! routine tables, so the GPI core and its two backends can be exercised
//! end to end without a vendor simulator.
//!
//! # Architecture
//!
//! A design is a tree of instances, generate scopes, signals and
//! continuous assignments, each tagged Verilog or VHDL. The engine keeps
//! one kernel behind an `Rc<RefCell<_>>` that every clone of
//! [`SimEngine`] shares; one clone becomes the VPI routine table, another
//! the VHPI routine table, and a third drives the run. Callbacks fire
//! through [`gpi::Gpi::handle_callback`] with no borrow held, so the
//! scheduler may call straight back into either interface.
//!
//! Each interface only answers name lookups for objects of its own
//! language and reports foreign objects as undefined, which is what sends
//! the GPI across to the other backend.
//!
//! # Usage
//!
//! ```ignore
//! use gpi_sim::{bootstrap, description};
//!
//! let engine = description::load(path)?.into_engine()?;
//! let mut gpi = bootstrap::bootstrap(&engine, &bootstrap::mixed_language_config())?;
//! engine.run_to_completion(&mut gpi)?;
//! ```
//!
//! # Modules
//!
//! - `design`: Object tree, data types and hierarchical names
//! - `value`: Stored values and their interface formats
//! - `description`: TOML design descriptions
//! - `engine`: Time steps, delta cycles and callback phases
//! - `bootstrap`: GPI context setup over an engine

#![warn(missing_docs)]

pub mod bootstrap;
pub mod description;
pub mod design;
pub mod engine;
pub mod error;
mod handles;
mod kernel;
pub mod value;
mod vhpi;
mod vpi;

pub use bootstrap::{bootstrap, mixed_language_config};
pub use description::DesignDescription;
pub use design::{DataType, Design, DesignBuilder, DesignObject, Language, ObjectId, ObjectKind, Storage};
pub use engine::SimEngine;
pub use error::SimError;
pub use value::{Format, Scalar, SimValue, ValueError};
