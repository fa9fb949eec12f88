//! Bringing the VPI backend up inside a GPI context.

use gpi::{BackendId, Gpi, GpiError};

use crate::backend::VpiBackend;
use crate::routines::VpiRoutines;

/// Library name the VPI backend is configured under in `GPI_EXTRA`.
pub const LIBRARY_NAME: &str = "libgpi_vpi";

/// Registers a VPI backend over `routines`.
pub fn register<R: VpiRoutines + 'static>(gpi: &mut Gpi, routines: R) -> Result<BackendId, GpiError> {
    let id = gpi.register_backend(VpiBackend::new(routines))?;
    log::debug!(target: "gpi::backend", "VPI backend registered as {id:?}");
    Ok(id)
}

/// Returns an entry point that registers a VPI backend over a copy of
/// `routines`, for use as an extra library.
pub fn entry_point<R: VpiRoutines + Clone + 'static>(
    routines: R,
) -> impl Fn(&mut Gpi) -> Result<(), GpiError> {
    move |gpi: &mut Gpi| register(gpi, routines.clone()).map(|_| ())
}
