//! Handle construction shared by the backend and its iterators.

use gpi::logging::log_backend_diagnostic;
use gpi::{ObjectHandle, ObjectType, Range};

use crate::classify::{self, split_generate_name};
use crate::consts::*;
use crate::routines::{VpiHandle, VpiRoutines};

/// Name under which the VPI backend registers.
pub const BACKEND_NAME: &str = "VPI";

/// The routine table plus what the backend learned about the engine at startup.
pub(crate) struct VpiAccess<R> {
    pub(crate) routines: R,
    pub(crate) product: String,
    pub(crate) version: String,
}

impl<R: VpiRoutines> VpiAccess<R> {
    pub(crate) fn new(routines: R) -> Self {
        let (product, version) = routines
            .vlog_info()
            .unwrap_or_else(|| ("unknown".to_string(), "unknown".to_string()));
        Self {
            routines,
            product,
            version,
        }
    }

    pub(crate) fn vpi_type(&self, object: VpiHandle) -> i32 {
        self.routines.get(VPI_TYPE, Some(object))
    }

    /// Classifies `object` and wraps it, or returns `None` when the object
    /// has no GPI equivalent.
    pub(crate) fn create(&self, object: VpiHandle, name: &str, fq_name: &str) -> Option<ObjectHandle> {
        let vpi_type = self.vpi_type(object);
        let size = self.routines.get(VPI_SIZE, Some(object));
        let object_type = classify::object_type(&self.product, vpi_type, size);
        if object_type == ObjectType::Unknown {
            log::debug!(target: "gpi::backend", "VPI: '{fq_name}' has unsupported type {vpi_type}");
            return None;
        }
        let range = if object_type.is_indexable() {
            self.routines
                .get_range(object)
                .map(|(left, right)| Range::from_bounds(left, right))
        } else {
            None
        };
        Some(
            ObjectHandle::new(object.into(), object_type, name, fq_name)
                .with_const(vpi_type == VPI_PARAMETER)
                .with_range(range),
        )
    }

    /// Wraps `object` using the engine's own names, falling back to a name
    /// derived from `parent_fq`.
    pub(crate) fn create_named(&self, object: VpiHandle, parent_fq: &str) -> Option<ObjectHandle> {
        let name = self.routines.get_str(VPI_NAME, object)?;
        let fq_name = self
            .routines
            .get_str(VPI_FULL_NAME, object)
            .unwrap_or_else(|| format!("{parent_fq}.{name}"));
        self.create(object, &name, &fq_name)
    }

    /// Collects the index extent of the generate scopes labelled `label`
    /// directly inside `scope`.
    pub(crate) fn generate_extent(&self, scope: VpiHandle, label: &str) -> Option<Range> {
        let iter = self.routines.iterate(VPI_INTERNAL_SCOPE, Some(scope))?;
        let mut bounds: Option<(i64, i64)> = None;
        while let Some(child) = self.routines.scan(iter) {
            if self.vpi_type(child) != VPI_GEN_SCOPE {
                continue;
            }
            let Some(name) = self.routines.get_str(VPI_NAME, child) else {
                continue;
            };
            if let Some((found, index)) = split_generate_name(&name) {
                if found.eq_ignore_ascii_case(label) {
                    bounds = Some(match bounds {
                        Some((lo, hi)) => (lo.min(index), hi.max(index)),
                        None => (index, index),
                    });
                }
            }
        }
        bounds.map(|(lo, hi)| Range::from_bounds(lo, hi))
    }

    /// Logs whatever the engine reported for the last failed call.
    pub(crate) fn report_error(&self, context: &str) {
        match self.routines.chk_error() {
            Some(info) => log_backend_diagnostic(
                BACKEND_NAME,
                classify::severity(info.level),
                &format!("{context}: {}", info.message),
            ),
            None => log::debug!(target: "gpi::backend", "VPI: {context} failed without an engine error"),
        }
    }
}
