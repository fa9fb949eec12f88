//! Bringing a GPI context up over a [`SimEngine`].
//!
//! The engine links both backends in. VPI is registered directly as the
//! primary backend; VHPI is only offered as an extra-library entry point,
//! so it comes up when the configuration lists [`gpi_vhpi::LIBRARY_NAME`].

use gpi::{Gpi, GpiError, StaticEntryPoints};
use gpi_config::{ExtraLibrary, GpiConfig, DEFAULT_ENTRY_POINT};

use crate::engine::SimEngine;

/// Installs logging, registers the VPI backend over `engine` and runs the
/// configured extra libraries.
pub fn bootstrap(engine: &SimEngine, config: &GpiConfig) -> Result<Gpi, GpiError> {
    gpi::logging::init(config);
    let mut gpi = Gpi::new();
    gpi_vpi::register(&mut gpi, engine.clone())?;
    gpi.load_extra_libs(config, &entry_points(engine))?;
    log::info!(
        target: "gpi_sim",
        "{} backend(s) up over '{}'",
        gpi.backend_count(),
        engine.kernel().design.product()
    );
    Ok(gpi)
}

/// The entry points this engine can satisfy.
pub fn entry_points(engine: &SimEngine) -> StaticEntryPoints {
    StaticEntryPoints::new().with(
        gpi_vhpi::LIBRARY_NAME,
        DEFAULT_ENTRY_POINT,
        gpi_vhpi::entry_point(engine.clone()),
    )
}

/// A configuration that brings up both backends.
pub fn mixed_language_config() -> GpiConfig {
    GpiConfig {
        extra_libs: vec![ExtraLibrary::new(gpi_vhpi::LIBRARY_NAME, DEFAULT_ENTRY_POINT)],
        ..GpiConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{DesignBuilder, Language};

    fn make_engine() -> SimEngine {
        SimEngine::new(DesignBuilder::new(Language::Verilog, "top").build())
    }

    #[test]
    fn vpi_only_by_default() {
        let gpi = bootstrap(&make_engine(), &GpiConfig::default()).unwrap();
        assert_eq!(gpi.backend_count(), 1);
        assert!(gpi.find_backend(gpi_vpi::BACKEND_NAME).is_some());
        assert!(gpi.find_backend(gpi_vhpi::BACKEND_NAME).is_none());
    }

    #[test]
    fn vhpi_as_extra_library() {
        let gpi = bootstrap(&make_engine(), &mixed_language_config()).unwrap();
        assert_eq!(gpi.backend_count(), 2);
        assert!(gpi.find_backend(gpi_vhpi::BACKEND_NAME).is_some());
    }

    #[test]
    fn unknown_library_fails() {
        let config = GpiConfig {
            extra_libs: vec![ExtraLibrary::new("libfli", DEFAULT_ENTRY_POINT)],
            ..GpiConfig::default()
        };
        assert!(matches!(
            bootstrap(&make_engine(), &config),
            Err(GpiError::EntryPointNotFound { .. })
        ));
    }
}
