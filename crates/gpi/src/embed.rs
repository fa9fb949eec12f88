//! Startup entry points for extra libraries.
//!
//! The configuration names libraries and entry-point symbols to invoke at
//! startup, typically to register additional backends. How a symbol is
//! found is the embedder's business; the core only asks an
//! [`EntryPointResolver`] for it and calls the result.

use std::collections::HashMap;

use gpi_config::GpiConfig;

use crate::dispatcher::Gpi;
use crate::error::GpiError;

/// A library entry point.
pub type EntryPoint = Box<dyn Fn(&mut Gpi) -> Result<(), GpiError>>;

/// Finds the entry point a library exports under a symbol name.
pub trait EntryPointResolver {
    /// Returns the entry point, or `None` if the library or symbol is unknown.
    fn resolve(&self, library: &str, entry: &str) -> Option<&EntryPoint>;
}

/// Entry points linked into the process, keyed by `(library, symbol)`.
#[derive(Default)]
pub struct StaticEntryPoints {
    table: HashMap<(String, String), EntryPoint>,
}

impl StaticEntryPoints {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry point, replacing any previous one for the same pair.
    pub fn insert(
        &mut self,
        library: impl Into<String>,
        entry: impl Into<String>,
        f: impl Fn(&mut Gpi) -> Result<(), GpiError> + 'static,
    ) {
        self.table.insert((library.into(), entry.into()), Box::new(f));
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(
        mut self,
        library: impl Into<String>,
        entry: impl Into<String>,
        f: impl Fn(&mut Gpi) -> Result<(), GpiError> + 'static,
    ) -> Self {
        self.insert(library, entry, f);
        self
    }
}

impl EntryPointResolver for StaticEntryPoints {
    fn resolve(&self, library: &str, entry: &str) -> Option<&EntryPoint> {
        self.table.get(&(library.to_string(), entry.to_string()))
    }
}

impl Gpi {
    /// Invokes every configured extra library's entry point, in order.
    /// Stops at the first library that cannot be resolved or fails.
    pub fn load_extra_libs(
        &mut self,
        config: &GpiConfig,
        resolver: &dyn EntryPointResolver,
    ) -> Result<(), GpiError> {
        for lib in &config.extra_libs {
            let entry = resolver.resolve(&lib.library, &lib.entry).ok_or_else(|| {
                GpiError::EntryPointNotFound {
                    library: lib.library.clone(),
                    entry: lib.entry.clone(),
                }
            })?;
            log::info!(target: "gpi::embed", "loading {lib}");
            entry(self)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use gpi_config::{parse_extra_libs, GpiConfig};

    use super::*;
    use crate::registry::tests::StubBackend;

    fn make_config(extra: &str) -> GpiConfig {
        GpiConfig {
            extra_libs: parse_extra_libs(extra).unwrap(),
            ..GpiConfig::default()
        }
    }

    #[test]
    fn entries_run_in_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (Rc::clone(&order), Rc::clone(&order));
        let resolver = StaticEntryPoints::new()
            .with("libvhpi", "gpi_entry_point", move |gpi: &mut Gpi| {
                a.borrow_mut().push("vhpi");
                gpi.register_backend(StubBackend::make("VHPI", &[]))?;
                Ok(())
            })
            .with("libextra", "setup", move |_: &mut Gpi| {
                b.borrow_mut().push("extra");
                Ok(())
            });
        let mut gpi = Gpi::new();
        gpi.load_extra_libs(&make_config("libvhpi,libextra:setup"), &resolver)
            .unwrap();
        assert_eq!(*order.borrow(), vec!["vhpi", "extra"]);
        assert!(gpi.find_backend("VHPI").is_some());
    }

    #[test]
    fn unknown_entry_point() {
        let resolver = StaticEntryPoints::new();
        let mut gpi = Gpi::new();
        let err = gpi
            .load_extra_libs(&make_config("libmissing:init"), &resolver)
            .unwrap_err();
        assert!(matches!(
            err,
            GpiError::EntryPointNotFound { ref library, ref entry }
                if library == "libmissing" && entry == "init"
        ));
    }

    #[test]
    fn entry_failure_propagates() {
        let resolver = StaticEntryPoints::new().with("liba", "gpi_entry_point", |gpi: &mut Gpi| {
            gpi.register_backend(StubBackend::make("A", &[]))?;
            gpi.register_backend(StubBackend::make("A", &[]))?;
            Ok(())
        });
        let mut gpi = Gpi::new();
        let err = gpi.load_extra_libs(&make_config("liba"), &resolver).unwrap_err();
        assert!(matches!(err, GpiError::DuplicateBackend(_)));
        assert_eq!(gpi.backend_count(), 1);
    }
}
