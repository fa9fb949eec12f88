//! Child traversal over VHPI relationships.

use std::collections::HashSet;
use std::rc::Rc;

use gpi::{BackendIterator, IterSelector, IterStatus, ObjectHandle, ObjectType, RelationshipWalk};

use crate::access::VhpiAccess;
use crate::classify::{self, split_generate_name};
use crate::consts::*;
use crate::routines::{VhpiHandle, VhpiRoutines};

const REGION_RELATIONS: &[i32] = &[
    VHPI_INTERNAL_REGIONS,
    VHPI_SIG_DECLS,
    VHPI_VAR_DECLS,
    VHPI_PORT_DECLS,
    VHPI_GENERIC_DECLS,
    VHPI_CONST_DECLS,
];
const GENERATE_RELATIONS: &[i32] = &[VHPI_INTERNAL_REGIONS];
const RECORD_RELATIONS: &[i32] = &[VHPI_SELECTED_NAMES];
const ARRAY_RELATIONS: &[i32] = &[VHPI_INDEXED_NAMES];

/// Returns the relationships to walk for `object_type`. VHPI offers no
/// driver or load traversal.
pub fn relations(object_type: ObjectType, selector: IterSelector) -> Option<&'static [i32]> {
    if selector != IterSelector::Objects {
        return None;
    }
    match object_type {
        ObjectType::Module => Some(REGION_RELATIONS),
        ObjectType::GenArray => Some(GENERATE_RELATIONS),
        ObjectType::Structure => Some(RECORD_RELATIONS),
        ObjectType::Array => Some(ARRAY_RELATIONS),
        _ => None,
    }
}

pub(crate) struct VhpiIterator<R: VhpiRoutines> {
    access: Rc<VhpiAccess<R>>,
    parent: ObjectHandle,
    walk: RelationshipWalk<i32>,
    /// Inside a pseudo-region: the label whose iterations to keep.
    label: Option<String>,
    folded: HashSet<String>,
}

impl<R: VhpiRoutines> VhpiIterator<R> {
    pub(crate) fn new(access: Rc<VhpiAccess<R>>, parent: &ObjectHandle, mapping: &[i32]) -> Self {
        let label = (parent.object_type() == ObjectType::GenArray && parent.aliases_parent())
            .then(|| parent.name().to_string());
        Self {
            access,
            parent: parent.clone(),
            walk: RelationshipWalk::new(mapping),
            label,
            folded: HashSet::new(),
        }
    }

    fn next_object(&mut self) -> Option<VhpiHandle> {
        let scope = VhpiHandle::from(self.parent.native());
        let routines = &self.access.routines;
        self.walk
            .next_candidate(
                |relation| routines.iterator(relation, scope).map(Into::into),
                |iter| routines.scan(iter.into()).map(Into::into),
            )
            .map(|(_, object)| object.into())
    }
}

impl<R: VhpiRoutines> BackendIterator for VhpiIterator<R> {
    fn next_handle(&mut self) -> IterStatus {
        loop {
            let Some(object) = self.next_object() else {
                return IterStatus::End;
            };
            let kind = self.access.kind(object);
            if classify::is_filtered(kind) {
                continue;
            }
            let Some(name) = self.access.routines.get_str(VHPI_NAME_P, object) else {
                return if classify::is_scope(kind) || classify::is_value_object(kind) {
                    IterStatus::NativeNoName
                } else {
                    IterStatus::NotNativeNoName(object.into())
                };
            };
            let generate = if kind == VHPI_FOR_GENERATE_K {
                split_generate_name(&name).map(|(label, _)| label)
            } else {
                None
            };
            match (&self.label, generate) {
                (Some(wanted), Some(label)) if !label.eq_ignore_ascii_case(wanted) => continue,
                (Some(_), None) => continue,
                (None, Some(label)) if self.parent.object_type() == ObjectType::Module => {
                    if !self.folded.insert(label.to_ascii_lowercase()) {
                        continue;
                    }
                    let scope = VhpiHandle::from(self.parent.native());
                    let range = self.access.generate_extent(scope, label);
                    return IterStatus::Native(ObjectHandle::pseudo_region(&self.parent, label, range));
                }
                _ => {}
            }
            // Children of a pseudo-region hang off the real parent scope.
            let parent_fq = match self.label {
                Some(_) => self
                    .parent
                    .fq_name()
                    .rsplit_once('.')
                    .map_or(self.parent.fq_name(), |(scope, _)| scope),
                None => self.parent.fq_name(),
            };
            return match self.access.create_named(object, parent_fq) {
                Some(handle) => IterStatus::Native(handle),
                None => IterStatus::NotNative(name),
            };
        }
    }
}

impl<R: VhpiRoutines> Drop for VhpiIterator<R> {
    fn drop(&mut self) {
        if let Some(open) = self.walk.open_iterator() {
            self.access.routines.release_handle(open.into());
        }
    }
}
