//! Handle construction and type walking shared by the backend and its iterators.

use gpi::logging::log_backend_diagnostic;
use gpi::{ObjectHandle, ObjectType, Range, ScalarKind, TypeShape};

use crate::classify::{self, split_generate_name, VHPI_QUIRKS};
use crate::consts::*;
use crate::routines::{VhpiHandle, VhpiRoutines};

/// Name under which the VHPI backend registers.
pub const BACKEND_NAME: &str = "VHPI";

/// Subtype chains deeper than this are treated as opaque.
const MAX_TYPE_DEPTH: usize = 32;

pub(crate) struct VhpiAccess<R> {
    pub(crate) routines: R,
    pub(crate) product: String,
    pub(crate) version: String,
}

impl<R: VhpiRoutines> VhpiAccess<R> {
    pub(crate) fn new(routines: R) -> Self {
        let tool = routines.handle(VHPI_TOOL, None);
        let query = |property| {
            tool.and_then(|t| routines.get_str(property, t))
                .unwrap_or_else(|| "unknown".to_string())
        };
        let product = query(VHPI_NAME_P);
        let version = query(VHPI_TOOL_VERSION_P);
        Self {
            routines,
            product,
            version,
        }
    }

    pub(crate) fn kind(&self, object: VhpiHandle) -> i32 {
        self.routines.get(VHPI_KIND_P, object)
    }

    /// Walks a type handle down to a [`TypeShape`]: subtypes to their base,
    /// arrays to their element type.
    pub(crate) fn type_shape(&self, ty: VhpiHandle) -> TypeShape {
        self.shape_at(ty, 0)
    }

    fn shape_at(&self, ty: VhpiHandle, depth: usize) -> TypeShape {
        if depth > MAX_TYPE_DEPTH {
            return TypeShape::Opaque;
        }
        match self.kind(ty) {
            VHPI_SUBTYPE_DECL_K => match self.routines.handle(VHPI_BASE_TYPE, Some(ty)) {
                Some(base) if base != ty => TypeShape::Derived(Box::new(self.shape_at(base, depth + 1))),
                _ => TypeShape::Opaque,
            },
            VHPI_ENUM_TYPE_DECL_K => {
                let name = self.routines.get_str(VHPI_NAME_P, ty).unwrap_or_default();
                TypeShape::Scalar(classify::enum_scalar(&name))
            }
            VHPI_INT_TYPE_DECL_K | VHPI_PHYS_TYPE_DECL_K => TypeShape::Scalar(ScalarKind::Integer),
            VHPI_FLOAT_TYPE_DECL_K => TypeShape::Scalar(ScalarKind::Real),
            VHPI_RECORD_TYPE_DECL_K => TypeShape::Record,
            VHPI_ARRAY_TYPE_DECL_K => {
                if self.routines.get(VHPI_NUM_DIMENSIONS_P, ty) > 1 {
                    return TypeShape::array_of(TypeShape::Opaque);
                }
                match self.routines.handle(VHPI_ELEM_TYPE, Some(ty)) {
                    Some(element) => TypeShape::array_of(self.shape_at(element, depth + 1)),
                    None => TypeShape::array_of(TypeShape::Opaque),
                }
            }
            _ => TypeShape::Opaque,
        }
    }

    fn classify(&self, object: VhpiHandle, kind: i32) -> ObjectType {
        if classify::is_scope(kind) {
            return ObjectType::Module;
        }
        if !classify::is_value_object(kind) {
            return ObjectType::Unknown;
        }
        let Some(ty) = self.routines.handle(VHPI_TYPE, Some(object)) else {
            return ObjectType::Unknown;
        };
        let type_name = self
            .routines
            .get_str(VHPI_NAME_P, ty)
            .unwrap_or_default()
            .to_ascii_uppercase();
        gpi::classify_with_quirks(VHPI_QUIRKS, &self.product, &type_name.as_str(), &self.type_shape(ty))
    }

    fn range_of(&self, object: VhpiHandle) -> Option<Range> {
        if self.routines.get(VHPI_SIZE_P, object) <= 0 {
            return None;
        }
        let left = self.routines.get(VHPI_LEFT_BOUND_P, object);
        let right = self.routines.get(VHPI_RIGHT_BOUND_P, object);
        Some(Range::from_bounds(i64::from(left), i64::from(right)))
    }

    /// Classifies `object` and wraps it, or returns `None` when the object
    /// has no GPI equivalent.
    pub(crate) fn create(&self, object: VhpiHandle, name: &str, fq_name: &str) -> Option<ObjectHandle> {
        let kind = self.kind(object);
        let object_type = self.classify(object, kind);
        if object_type == ObjectType::Unknown {
            log::debug!(target: "gpi::backend", "VHPI: '{fq_name}' has unsupported kind {kind}");
            return None;
        }
        let range = if object_type.is_indexable() {
            self.range_of(object)
        } else {
            None
        };
        Some(
            ObjectHandle::new(object.into(), object_type, name, fq_name)
                .with_const(classify::is_const(kind))
                .with_range(range),
        )
    }

    /// Wraps `object` under its own name below `parent_fq`.
    pub(crate) fn create_named(&self, object: VhpiHandle, parent_fq: &str) -> Option<ObjectHandle> {
        let name = self.routines.get_str(VHPI_NAME_P, object)?;
        self.create(object, &name, &format!("{parent_fq}.{name}"))
    }

    /// Collects the index extent of the `label(i)` generate regions directly
    /// inside `scope`.
    pub(crate) fn generate_extent(&self, scope: VhpiHandle, label: &str) -> Option<Range> {
        let iter = self.routines.iterator(VHPI_INTERNAL_REGIONS, scope)?;
        let mut bounds: Option<(i64, i64)> = None;
        while let Some(region) = self.routines.scan(iter) {
            if self.kind(region) != VHPI_FOR_GENERATE_K {
                continue;
            }
            let Some(name) = self.routines.get_str(VHPI_NAME_P, region) else {
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

    pub(crate) fn report_error(&self, context: &str) {
        match self.routines.check_error() {
            Some(info) => log_backend_diagnostic(
                BACKEND_NAME,
                classify::severity(info.severity),
                &format!("{context}: {}", info.message),
            ),
            None => log::debug!(target: "gpi::backend", "VHPI: {context} failed without an engine error"),
        }
    }
}
