//! The VHPI implementation of [`gpi::Backend`].

use std::rc::Rc;

use gpi::{
    Backend, BackendIterator, CallbackReason, Deregistration, GpiError, IterSelector, NativeRef,
    ObjectHandle, ObjectType, RangeDirection, SetAction, SignalValue, ValueFormat,
};
use gpi_common::TimePrecision;

use crate::access::{VhpiAccess, BACKEND_NAME};
use crate::consts::*;
use crate::iterator::{relations, VhpiIterator};
use crate::routines::{VhpiCbData, VhpiHandle, VhpiRoutines, VhpiValue};

/// Adapter between the GPI core and an engine's VHPI routines.
pub struct VhpiBackend<R: VhpiRoutines> {
    access: Rc<VhpiAccess<R>>,
}

impl<R: VhpiRoutines + 'static> VhpiBackend<R> {
    /// Creates the backend, querying the tool's name and version once.
    pub fn new(routines: R) -> Self {
        Self {
            access: Rc::new(VhpiAccess::new(routines)),
        }
    }

    fn routines(&self) -> &R {
        &self.access.routines
    }

    fn generate_element(&self, index: i64, parent: &ObjectHandle) -> Option<ObjectHandle> {
        let fq_name = format!("{}({index})", parent.fq_name());
        let object = self.routines().handle_by_name(&fq_name, None)?;
        let name = format!("{}({index})", parent.name());
        self.access.create(object, &name, &fq_name)
    }

    fn design_unit(&self, object: &ObjectHandle) -> Option<VhpiHandle> {
        if object.aliases_parent() || object.object_type() != ObjectType::Module {
            return None;
        }
        self.routines()
            .handle(VHPI_DESIGN_UNIT, Some(object.native().into()))
    }
}

/// Maps a GPI write action onto a `vhpi_put_value` mode.
pub fn put_mode(action: SetAction) -> i32 {
    match action {
        SetAction::Deposit => VHPI_DEPOSIT_PROPAGATE,
        SetAction::NoDelay => VHPI_DEPOSIT,
        SetAction::Force => VHPI_FORCE_PROPAGATE,
        SetAction::Release => VHPI_RELEASE,
    }
}

/// Maps a callback request onto a VHPI reason code.
pub fn cb_reason(reason: &CallbackReason) -> i32 {
    match reason {
        CallbackReason::Timed { .. } => VHPI_CB_AFTER_DELAY,
        CallbackReason::ReadOnly => VHPI_CB_LAST_KNOWN_DELTA_CYCLE,
        CallbackReason::ReadWrite => VHPI_CB_END_OF_PROCESSES,
        CallbackReason::NextTime => VHPI_CB_NEXT_TIME_STEP,
        CallbackReason::ValueChange { .. } => VHPI_CB_VALUE_CHANGE,
        CallbackReason::StartOfSimulation => VHPI_CB_START_OF_SIMULATION,
        CallbackReason::EndOfSimulation => VHPI_CB_END_OF_SIMULATION,
    }
}

fn reason_label(reason: &CallbackReason) -> &'static str {
    match reason {
        CallbackReason::Timed { .. } => "vhpiCbAfterDelay",
        CallbackReason::ReadOnly => "vhpiCbLastKnownDeltaCycle",
        CallbackReason::ReadWrite => "vhpiCbEndOfProcesses",
        CallbackReason::NextTime => "vhpiCbNextTimeStep",
        CallbackReason::ValueChange { .. } => "vhpiCbValueChange",
        CallbackReason::StartOfSimulation => "vhpiCbStartOfSimulation",
        CallbackReason::EndOfSimulation => "vhpiCbEndOfSimulation",
    }
}

/// Position of `index` counted from the left bound, as `vhpi_handle_by_index` expects.
fn offset_from_left(parent: &ObjectHandle, index: i64) -> Option<u64> {
    let range = parent.range()?;
    if !range.contains(index) {
        return None;
    }
    let offset = match range.direction() {
        RangeDirection::Up => index - range.left(),
        RangeDirection::Down => range.left() - index,
    };
    u64::try_from(offset).ok()
}

impl<R: VhpiRoutines + 'static> Backend for VhpiBackend<R> {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn root_handle(&self, name: Option<&str>) -> Option<ObjectHandle> {
        let root = self.routines().handle(VHPI_ROOT_INST, None)?;
        let Some(root_name) = self.routines().get_str(VHPI_NAME_P, root) else {
            self.routines().release_handle(root);
            return None;
        };
        if let Some(wanted) = name {
            if !wanted.eq_ignore_ascii_case(&root_name) {
                log::debug!(target: "gpi::backend", "VHPI: root is '{root_name}', not '{wanted}'");
                self.routines().release_handle(root);
                return None;
            }
        }
        self.access.create(root, &root_name, &root_name)
    }

    fn check_create_by_name(&self, name: &str, parent: &ObjectHandle) -> Option<ObjectHandle> {
        let fq_name = format!("{}.{name}", parent.fq_name());
        if let Some(object) = self.routines().handle_by_name(&fq_name, None) {
            return self.access.create(object, name, &fq_name);
        }
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
        let Some(offset) = offset_from_left(parent, index) else {
            log::debug!(target: "gpi::backend", "VHPI: index {index} outside '{}'", parent.fq_name());
            return None;
        };
        let object =
            self.routines()
                .handle_by_index(VHPI_INDEXED_NAMES, parent.native().into(), offset)?;
        let name = format!("{}({index})", parent.name());
        let fq_name = format!("{}({index})", parent.fq_name());
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
        Some(Box::new(VhpiIterator::new(Rc::clone(&self.access), parent, mapping)))
    }

    fn register_callback(&self, reason: CallbackReason, token: u64) -> Result<NativeRef, GpiError> {
        let data = VhpiCbData {
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
        let cb = VhpiHandle::from(registration);
        if self.routines().remove_cb(cb) {
            return Ok(Deregistration::Removed);
        }
        match self.routines().get(VHPI_STATE_P, cb) {
            VHPI_MATURE => Ok(Deregistration::Removed),
            // Still executing: the engine retires it once the fire returns.
            VHPI_ENABLE => Ok(Deregistration::Deferred),
            state => {
                self.access.report_error("vhpi_remove_cb");
                Err(GpiError::DeregistrationFailed {
                    backend: BACKEND_NAME.to_string(),
                    reason: format!("vhpi_remove_cb refused {cb:?} in state {state}"),
                })
            }
        }
    }

    fn release_matured(&self, registration: NativeRef) -> bool {
        let cb = VhpiHandle::from(registration);
        match self.routines().get(VHPI_STATE_P, cb) {
            VHPI_ENABLE => false,
            VHPI_MATURE => {
                if !self.routines().remove_cb(cb) {
                    self.access.report_error("vhpi_remove_cb");
                }
                true
            }
            // Unknown to the engine, so it cannot fire again.
            _ => true,
        }
    }

    fn get_signal_value(&self, signal: &ObjectHandle, format: ValueFormat) -> Option<SignalValue> {
        let vhpi_format = match (format, signal.object_type()) {
            (ValueFormat::Int, ObjectType::Enum) => VHPI_ENUM_VAL,
            (ValueFormat::Int, _) => VHPI_INT_VAL,
            (ValueFormat::BinStr, _) => VHPI_BIN_STR_VAL,
            (ValueFormat::Str, _) => VHPI_STR_VAL,
            (ValueFormat::Real, _) => VHPI_REAL_VAL,
        };
        match self.routines().get_value(signal.native().into(), vhpi_format) {
            Some(VhpiValue::BinStr(s)) => Some(SignalValue::BinStr(s)),
            Some(VhpiValue::Str(s)) => Some(SignalValue::Str(s)),
            Some(VhpiValue::Real(r)) => Some(SignalValue::Real(r)),
            Some(VhpiValue::Int(i)) => Some(SignalValue::Int(i64::from(i))),
            Some(VhpiValue::Enum(e)) => Some(SignalValue::Int(i64::from(e))),
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
        let vhpi_value = match (value, signal.object_type()) {
            (SignalValue::Int(i), ObjectType::Enum) => VhpiValue::Enum(
                u32::try_from(*i).map_err(|_| rejected("negative enumeration position"))?,
            ),
            (SignalValue::Int(i), _) => {
                VhpiValue::Int(i32::try_from(*i).map_err(|_| rejected("integer out of range"))?)
            }
            (SignalValue::BinStr(s), _) => VhpiValue::BinStr(s.clone()),
            (SignalValue::Str(s), _) => VhpiValue::Str(s.clone()),
            (SignalValue::Real(r), _) => VhpiValue::Real(*r),
        };
        if self
            .routines()
            .put_value(signal.native().into(), &vhpi_value, put_mode(action))
        {
            Ok(())
        } else {
            self.access
                .report_error(&format!("writing '{}'", signal.fq_name()));
            Err(rejected("vhpi_put_value failed"))
        }
    }

    fn definition_name(&self, object: &ObjectHandle) -> Option<String> {
        let unit = self.design_unit(object)?;
        self.routines().get_str(VHPI_UNIT_NAME_P, unit)
    }

    fn definition_file(&self, object: &ObjectHandle) -> Option<String> {
        let unit = self.design_unit(object)?;
        self.routines().get_str(VHPI_FILE_NAME_P, unit)
    }

    fn type_string(&self, object: &ObjectHandle) -> String {
        if object.aliases_parent() {
            return "vhpiForGenerateK".to_string();
        }
        self.routines()
            .get_str(VHPI_KIND_STR_P, object.native().into())
            .unwrap_or_else(|| "vhpiUndefined".to_string())
    }

    fn sim_end(&self) {
        if !self.routines().control(VHPI_FINISH) {
            self.access.report_error("vhpi_control(vhpiFinish)");
        }
    }

    fn sim_time(&self) -> u64 {
        self.routines().get_time()
    }

    fn sim_precision(&self) -> i32 {
        let limit = self
            .routines()
            .get_phys(VHPI_RESOLUTION_LIMIT_P, None)
            .and_then(TimePrecision::from_femtoseconds);
        match limit {
            Some(precision) => precision.exponent(),
            None => {
                log::warn!(target: "gpi::backend", "VHPI: no usable resolution limit, assuming 1 fs");
                TimePrecision::FS.exponent()
            }
        }
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
    fn deposit_propagates() {
        assert_eq!(put_mode(SetAction::Deposit), VHPI_DEPOSIT_PROPAGATE);
        assert_eq!(put_mode(SetAction::NoDelay), VHPI_DEPOSIT);
        assert_eq!(put_mode(SetAction::Force), VHPI_FORCE_PROPAGATE);
        assert_eq!(put_mode(SetAction::Release), VHPI_RELEASE);
    }

    #[test]
    fn phases_map_to_vhpi_reasons() {
        assert_eq!(cb_reason(&CallbackReason::ReadWrite), VHPI_CB_END_OF_PROCESSES);
        assert_eq!(cb_reason(&CallbackReason::ReadOnly), VHPI_CB_LAST_KNOWN_DELTA_CYCLE);
        assert_eq!(cb_reason(&CallbackReason::NextTime), VHPI_CB_NEXT_TIME_STEP);
    }

    fn make_vector(left: i64, right: i64) -> ObjectHandle {
        ObjectHandle::new(NativeRef::from_raw(1), ObjectType::LogicArray, "v", "top.v")
            .with_range(Some(gpi::Range::from_bounds(left, right)))
    }

    #[test]
    fn offsets_count_from_left() {
        let down = make_vector(7, 0);
        assert_eq!(offset_from_left(&down, 7), Some(0));
        assert_eq!(offset_from_left(&down, 0), Some(7));
        let up = make_vector(0, 7);
        assert_eq!(offset_from_left(&up, 2), Some(2));
        assert_eq!(offset_from_left(&up, 8), None);
    }
}
