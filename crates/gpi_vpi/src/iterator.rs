//! Child traversal over VPI relationships.

use std::collections::HashSet;
use std::rc::Rc;

use gpi::{BackendIterator, IterSelector, IterStatus, ObjectHandle, ObjectType, RelationshipWalk};

use crate::access::VpiAccess;
use crate::classify::{self, split_generate_name};
use crate::consts::*;
use crate::routines::{VpiHandle, VpiRoutines};

const MODULE_RELATIONS: &[i32] = &[
    VPI_NET,
    VPI_NET_ARRAY,
    VPI_REG,
    VPI_REG_ARRAY,
    VPI_VARIABLES,
    VPI_PARAMETER,
    VPI_MODULE,
    VPI_INTERNAL_SCOPE,
];
const GENERATE_RELATIONS: &[i32] = &[VPI_INTERNAL_SCOPE];
const STRUCT_RELATIONS: &[i32] = &[VPI_MEMBER];
const ARRAY_RELATIONS: &[i32] = &[VPI_NET, VPI_REG];
const DRIVER_RELATIONS: &[i32] = &[VPI_DRIVER];
const LOAD_RELATIONS: &[i32] = &[VPI_LOAD];

/// Returns the relationships to walk for `object_type`, in order.
pub fn relations(object_type: ObjectType, selector: IterSelector) -> Option<&'static [i32]> {
    match selector {
        IterSelector::Objects => match object_type {
            ObjectType::Module => Some(MODULE_RELATIONS),
            ObjectType::GenArray => Some(GENERATE_RELATIONS),
            ObjectType::Structure => Some(STRUCT_RELATIONS),
            ObjectType::Array => Some(ARRAY_RELATIONS),
            _ => None,
        },
        IterSelector::Drivers if object_type.has_value() => Some(DRIVER_RELATIONS),
        IterSelector::Loads if object_type.has_value() => Some(LOAD_RELATIONS),
        _ => None,
    }
}

/// How generate scopes met during the walk are treated.
enum ScopeFilter {
    /// Fold every `label[i]` scope into one pseudo-region per label.
    Fold,
    /// Inside a pseudo-region: keep only the scopes carrying this label.
    Label(String),
    /// Report scopes as they are.
    Plain,
}

pub(crate) struct VpiIterator<R: VpiRoutines> {
    access: Rc<VpiAccess<R>>,
    parent: ObjectHandle,
    walk: RelationshipWalk<i32>,
    filter: ScopeFilter,
    folded: HashSet<String>,
}

impl<R: VpiRoutines> VpiIterator<R> {
    pub(crate) fn new(access: Rc<VpiAccess<R>>, parent: &ObjectHandle, mapping: &[i32]) -> Self {
        let filter = match parent.object_type() {
            ObjectType::Module => ScopeFilter::Fold,
            ObjectType::GenArray if parent.aliases_parent() => {
                ScopeFilter::Label(parent.name().to_ascii_lowercase())
            }
            _ => ScopeFilter::Plain,
        };
        Self {
            access,
            parent: parent.clone(),
            walk: RelationshipWalk::new(mapping),
            filter,
            folded: HashSet::new(),
        }
    }

    fn next_object(&mut self) -> Option<VpiHandle> {
        let scope = VpiHandle::from(self.parent.native());
        let routines = &self.access.routines;
        self.walk
            .next_candidate(
                |relation| routines.iterate(relation, Some(scope)).map(Into::into),
                |iter| routines.scan(iter.into()).map(Into::into),
            )
            .map(|(_, object)| object.into())
    }

    /// Applies the generate-scope rules. `Err` carries a status to return,
    /// `Ok(false)` means skip the object.
    fn filter_generate(&mut self, name: &str) -> Result<bool, IterStatus> {
        let label = split_generate_name(name).map(|(label, _)| label);
        match (&self.filter, label) {
            (ScopeFilter::Label(wanted), Some(label)) => Ok(label.eq_ignore_ascii_case(wanted)),
            (ScopeFilter::Label(_), None) => Ok(false),
            (ScopeFilter::Fold, Some(label)) => {
                if !self.folded.insert(label.to_ascii_lowercase()) {
                    return Ok(false);
                }
                let scope = VpiHandle::from(self.parent.native());
                let range = self.access.generate_extent(scope, label);
                Err(IterStatus::Native(ObjectHandle::pseudo_region(&self.parent, label, range)))
            }
            _ => Ok(true),
        }
    }
}

impl<R: VpiRoutines> BackendIterator for VpiIterator<R> {
    fn next_handle(&mut self) -> IterStatus {
        loop {
            let Some(object) = self.next_object() else {
                return IterStatus::End;
            };
            let vpi_type = self.access.vpi_type(object);
            if classify::is_filtered(vpi_type) {
                continue;
            }
            let Some(name) = self.access.routines.get_str(VPI_NAME, object) else {
                let size = self.access.routines.get(VPI_SIZE, Some(object));
                return match classify::object_type(&self.access.product, vpi_type, size) {
                    ObjectType::Unknown => IterStatus::NotNativeNoName(object.into()),
                    _ => IterStatus::NativeNoName,
                };
            };
            if vpi_type == VPI_GEN_SCOPE {
                match self.filter_generate(&name) {
                    Err(status) => return status,
                    Ok(false) => continue,
                    Ok(true) => {}
                }
            }
            return match self.access.create_named(object, self.parent.fq_name()) {
                Some(handle) => IterStatus::Native(handle),
                None => IterStatus::NotNative(name),
            };
        }
    }
}

impl<R: VpiRoutines> Drop for VpiIterator<R> {
    fn drop(&mut self) {
        if let Some(open) = self.walk.open_iterator() {
            self.access.routines.release_handle(open.into());
        }
    }
}
