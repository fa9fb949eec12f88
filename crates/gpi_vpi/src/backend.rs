//! The VPI implementation of [`gpi::Backend`].

use std::rc::Rc;

use gpi::{
    Backend, BackendIterator, CallbackReason, Deregistration, GpiError, IterSelector, NativeRef,
    ObjectHandle, ObjectType, SetAction, SignalValue, ValueFormat,
};

use crate::access::{VpiAccess, BACKEND_NAME};
use crate::consts::*;
use crate::iterator::{relations, VpiIterator};
use crate::routines::{CbData, VpiHandle, VpiRoutines, VpiValue};

/// Adapter between the GPI core and an engine's VPI routines.
pub struct VpiBackend<R: VpiRoutines> {
    access: Rc<VpiAccess<R>>,
}

impl<R: VpiRoutines + 'static> VpiBackend<R> {
    /// Creates the backend, querying the engine's product and version once.
    pub fn new(routines: R) -> Self {
        Self {
            access: Rc::new(VpiAccess::new(routines)),
        }
    }

    fn routines(&self) -> &R {
        &self.access.routines
    }

    /// Resolves one `label[index]` scope under the parent of a generate array.
    fn generate_element(&self, index: i64, parent: &ObjectHandle) -> Option<ObjectHandle> {
        let fq_name = format!("{}[{index}]", parent.fq_name());
        let object = self.routines().handle_by_name(&fq_name, None)?;
        let name = format!("{}[{index}]", parent.name());
        self.access.create(object, &name, &fq_name)
    }
}

/// Maps a GPI write action onto `vpi_put_value` flags.
pub fn put_flags(action: SetAction) -> i32 {
    match action {
        SetAction::Deposit => VPI_INERTIAL_DELAY,
        SetAction::NoDelay => VPI_NO_DELAY,
        SetAction::Force => VPI_FORCE_FLAG,
        SetAction::Release => VPI_RELEASE_FLAG,
    }
}

/// Maps a callback request onto a VPI reason code.
pub fn cb_reason(reason: &CallbackReason) -> i32 {
    match reason {
        CallbackReason::Timed { .. } => CB_AFTER_DELAY,
        CallbackReason::ReadOnly => CB_READ_ONLY_SYNCH,
        CallbackReason::ReadWrite => CB_READ_WRITE_SYNCH,
        CallbackReason::NextTime => CB_NEXT_SIM_TIME,
        CallbackReason::ValueChange { .. } => CB_VALUE_CHANGE,
        CallbackReason::StartOfSimulation => CB_START_OF_SIMULATION,
        CallbackReason::EndOfSimulation => CB_END_OF_SIMULATION,
    }
}

fn reason_label(reason: &CallbackReason) -> &'static str {
    match reason {
        CallbackReason::Timed { .. } => "cbAfterDelay",
        CallbackReason::ReadOnly => "cbReadOnlySynch",
        CallbackReason::ReadWrite => "cbReadWriteSynch",
        CallbackReason::NextTime => "cbNextSimTime",
        CallbackReason::ValueChange { .. } => "cbValueChange",
        CallbackReason::StartOfSimulation => "cbStartOfSimulation",
        CallbackReason::EndOfSimulation => "cbEndOfSimulation",
    }
}

fn to_vpi_value(value: &SignalValue) -> Option<VpiValue> {
    Some(match value {
        SignalValue::BinStr(s) => VpiValue::BinStr(s.clone()),
        SignalValue::Str(s) => VpiValue::Str(s.clone()),
        SignalValue::Real(r) => VpiValue::Real(*r),
        SignalValue::Int(i) => VpiValue::Int(i32::try_from(*i).ok()?),
    })
}

impl<R: VpiRoutines + 'static> Backend for VpiBackend<R> {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn root_handle(&self, name: Option<&str>) -> Option<ObjectHandle> {
        let iter = self.routines().iterate(VPI_MODULE, None)?;
        let root = self.routines().scan(iter)?;
        // Only the first top-level module is considered.
        if let Some(other) = self.routines().scan(iter) {
            self.routines().release_handle(other);
            self.routines().release_handle(iter);
        }
        let Some(root_name) = self.routines().get_str(VPI_NAME, root) else {
            self.routines().release_handle(root);
            return None;
        };
        if let Some(wanted) = name {
            if wanted != root_name {
                log::debug!(target: "gpi::backend", "VPI: root is '{root_name}', not '{wanted}'");
                self.routines().release_handle(root);
                return None;
            }
        }
        let fq_name = self
            .routines()
            .get_str(VPI_FULL_NAME, root)
            .unwrap_or_else(|| root_name.clone());
        self.access.create(root, &root_name, &fq_name)
    }

    fn check_create_by_name(&self, name: &str, parent: &ObjectHandle) -> Option<ObjectHandle> {
        let fq_name = format!("{}.{name}", parent.fq_name());
        if let Some(object) = self.routines().handle_by_name(&fq_name, None) {
            return self.access.create(object, name, &fq_name);
        }
        // A bare generate label names no VPI object; stand in a pseudo-region
        // when scopes `name[i]` exist under the parent.
        if parent.object_type() != ObjectType::Module {
            return None;
        }
        let range = self.access.generate_extent(parent.native().into(), name)?;
        Some(ObjectHandle::pseudo_region(parent, name, Some(range)))
    }

    fn check_create_by_index(&self, index: i64, parent: &ObjectHandle) -> Option<ObjectHandle> {
        if parent.object_type() == ObjectType::GenArray {
            return self.generate_element(index, parent);
        }
        let object = self
            .routines()
            .handle_by_index(VpiHandle::from(parent.native()), index)?;
        let name = self
            .routines()
            .get_str(VPI_NAME, object)
            .unwrap_or_else(|| format!("{}[{index}]", parent.name()));
        let fq_name = self
            .routines()
            .get_str(VPI_FULL_NAME, object)
            .unwrap_or_else(|| format!("{}[{index}]", parent.fq_name()));
        self.access.create(object, &name, &fq_name)
    }

    fn check_create_raw(&self, raw: NativeRef, parent: &ObjectHandle) -> Option<ObjectHandle> {
        self.access.create_named(raw.into(), parent.fq_name())
    }

    fn iterate_handle(
        &self,
        parent: &ObjectHandle,
        selector: IterSelector,
    ) -> Option<Box<dyn BackendIterator>> {
        let mapping = relations(parent.object_type(), selector)?;
        Some(Box::new(VpiIterator::new(Rc::clone(&self.access), parent, mapping)))
    }

    fn register_callback(&self, reason: CallbackReason, token: u64) -> Result<NativeRef, GpiError> {
        let data = CbData {
            reason: cb_reason(&reason),
            object: match reason {
                CallbackReason::ValueChange { signal } => Some(signal.into()),
                _ => None,
            },
            delay: match reason {
                CallbackReason::Timed { delay } => delay,
                _ => 0,
            },
            user_data: token,
        };
        match self.routines().register_cb(&data) {
            Some(cb) => Ok(cb.into()),
            None => {
                self.access.report_error(reason_label(&reason));
                Err(GpiError::RegistrationFailed {
                    backend: BACKEND_NAME.to_string(),
                    reason: reason_label(&reason),
                })
            }
        }
    }

    fn deregister_callback(&self, registration: NativeRef) -> Result<Deregistration, GpiError> {
        if self.routines().remove_cb(registration.into()) {
            Ok(Deregistration::Removed)
        } else {
            self.access.report_error("vpi_remove_cb");
            Err(GpiError::DeregistrationFailed {
                backend: BACKEND_NAME.to_string(),
                reason: format!("vpi_remove_cb refused {registration:?}"),
            })
        }
    }

    fn release_matured(&self, registration: NativeRef) -> bool {
        // VPI has no maturity state; a refused removal is simply retried.
        self.routines().remove_cb(registration.into())
    }

    fn get_signal_value(&self, signal: &ObjectHandle, format: ValueFormat) -> Option<SignalValue> {
        let vpi_format = match format {
            ValueFormat::BinStr => VPI_BIN_STR_VAL,
            ValueFormat::Str => VPI_STRING_VAL,
            ValueFormat::Real => VPI_REAL_VAL,
            ValueFormat::Int => VPI_INT_VAL,
        };
        let value = self.routines().get_value(signal.native().into(), vpi_format);
        match value {
            Some(VpiValue::BinStr(s)) => Some(SignalValue::BinStr(s)),
            Some(VpiValue::Str(s)) => Some(SignalValue::Str(s)),
            Some(VpiValue::Real(r)) => Some(SignalValue::Real(r)),
            Some(VpiValue::Int(i)) => Some(SignalValue::Int(i64::from(i))),
            None => {
                self.access
                    .report_error(&format!("reading '{}'", signal.fq_name()));
                None
            }
        }
    }

    fn set_signal_value(
        &self,
        signal: &ObjectHandle,
        value: &SignalValue,
        action: SetAction,
    ) -> Result<(), GpiError> {
        let rejected = |reason: &str| GpiError::ValueRejected {
            name: signal.fq_name().to_string(),
            reason: reason.to_string(),
        };
        let vpi_value = to_vpi_value(value).ok_or_else(|| rejected("integer does not fit vpiIntVal"))?;
        if self
            .routines()
            .put_value(signal.native().into(), &vpi_value, put_flags(action))
        {
            Ok(())
        } else {
            self.access
                .report_error(&format!("writing '{}'", signal.fq_name()));
            Err(rejected("vpi_put_value failed"))
        }
    }

    fn definition_name(&self, object: &ObjectHandle) -> Option<String> {
        if object.aliases_parent() {
            return None;
        }
        self.routines().get_str(VPI_DEF_NAME, object.native().into())
    }

    fn definition_file(&self, object: &ObjectHandle) -> Option<String> {
        if object.aliases_parent() {
            return None;
        }
        self.routines().get_str(VPI_DEF_FILE, object.native().into())
    }

    fn type_string(&self, object: &ObjectHandle) -> String {
        if object.aliases_parent() {
            return "vpiGenScopeArray".to_string();
        }
        self.routines()
            .get_str(VPI_TYPE, object.native().into())
            .unwrap_or_else(|| "vpiUndefined".to_string())
    }

    fn sim_end(&self) {
        if !self.routines().control(VPI_FINISH) {
            self.access.report_error("vpi_control(vpiFinish)");
        }
    }

    fn sim_time(&self) -> u64 {
        self.routines().get_time()
    }

    fn sim_precision(&self) -> i32 {
        self.routines().get(VPI_TIME_PRECISION, None)
    }

    fn simulator_product(&self) -> String {
        self.access.product.clone()
    }

    fn simulator_version(&self) -> String {
        self.access.version.clone()
    }

    fn release(&self, native: NativeRef) {
        self.routines().release_handle(native.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_is_inertial() {
        assert_eq!(put_flags(SetAction::Deposit), VPI_INERTIAL_DELAY);
        assert_eq!(put_flags(SetAction::NoDelay), VPI_NO_DELAY);
        assert_eq!(put_flags(SetAction::Force), VPI_FORCE_FLAG);
        assert_eq!(put_flags(SetAction::Release), VPI_RELEASE_FLAG);
    }

    #[test]
    fn reasons() {
        assert_eq!(cb_reason(&CallbackReason::Timed { delay: 5 }), CB_AFTER_DELAY);
        assert_eq!(cb_reason(&CallbackReason::NextTime), CB_NEXT_SIM_TIME);
        assert_eq!(
            cb_reason(&CallbackReason::ValueChange {
                signal: NativeRef::from_raw(1)
            }),
            CB_VALUE_CHANGE
        );
    }

    #[test]
    fn oversized_integer_is_not_representable() {
        assert_eq!(to_vpi_value(&SignalValue::Int(-7)), Some(VpiValue::Int(-7)));
        assert_eq!(to_vpi_value(&SignalValue::Int(1 << 40)), None);
    }
}
