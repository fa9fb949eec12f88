//! Bringing the VHPI backend up inside a GPI context.

use gpi::{BackendId, Gpi, GpiError};

use crate::backend::VhpiBackend;
use crate::routines::VhpiRoutines;

/// Library name the VHPI backend is configured under in `GPI_EXTRA`.
pub const LIBRARY_NAME: &str = "libgpi_vhpi";

/// Registers a VHPI backend over `routines`.
pub fn register<R: VhpiRoutines + 'static>(gpi: &mut Gpi, routines: R) -> Result<BackendId, GpiError> {
    let id = gpi.register_backend(VhpiBackend::new(routines))?;
    log::debug!(target: "gpi::backend", "VHPI backend registered as {id:?}");
    Ok(id)
}

/// Returns an entry point that registers a VHPI backend over a copy of
/// `routines`, for use as an extra library.
pub fn entry_point<R: VhpiRoutines + Clone + 'static>(
    routines: R,
) -> impl Fn(&mut Gpi) -> Result<(), GpiError> {
    move |gpi: &mut Gpi| register(gpi, routines.clone()).map(|_| ())
}
