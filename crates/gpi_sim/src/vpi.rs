//! The engine's `vpi_*` routine table. Only Verilog objects are visible by
//! name; child iteration lists instances of either language, which the GPI
//! then hands to the other backend.

use gpi_vpi::consts::*;
use gpi_vpi::{CbData, VpiErrorInfo, VpiHandle, VpiRoutines, VpiValue};

use crate::design::{DataType, Design, DesignObject, Language, ObjectId, ObjectKind, Storage};
use crate::engine::SimEngine;
use crate::kernel::{AccessError, ErrorLevel, Interface, SimKernel, Wake, WriteMode};
use crate::value::{Format, Scalar};

/// The `vpiType` of an object, `VPI_UNDEFINED` for VHDL objects.
fn vpi_type(design: &Design, object: &DesignObject) -> i32 {
    if object.language() != Language::Verilog {
        return VPI_UNDEFINED;
    }
    match object.kind() {
        ObjectKind::Instance { .. } => VPI_MODULE,
        ObjectKind::GenScope { .. } => VPI_GEN_SCOPE,
        ObjectKind::Process => VPI_ALWAYS,
        ObjectKind::ContAssign { .. } => VPI_CONT_ASSIGN,
        ObjectKind::BitSelect { .. } => {
            let net = object
                .parent()
                .and_then(|p| design.object(p))
                .is_some_and(|p| matches!(p.kind(), ObjectKind::Signal { storage, .. } if is_net(*storage)));
            if net {
                VPI_NET_BIT
            } else {
                VPI_REG_BIT
            }
        }
        ObjectKind::Signal { ty, storage } => signal_type(ty, *storage),
    }
}

fn is_net(storage: Storage) -> bool {
    matches!(storage, Storage::Net | Storage::Port)
}

fn signal_type(ty: &DataType, storage: Storage) -> i32 {
    if storage.is_const() {
        return VPI_PARAMETER;
    }
    let net = is_net(storage);
    match ty {
        DataType::Logic | DataType::LogicVector { .. } if net => VPI_NET,
        DataType::Logic | DataType::LogicVector { .. } => VPI_REG,
        DataType::Integer => VPI_INTEGER_VAR,
        DataType::Real => VPI_REAL_VAR,
        DataType::Str => VPI_STRING_VAR,
        DataType::Enum { .. } if net => VPI_ENUM_NET,
        DataType::Enum { .. } => VPI_ENUM_VAR,
        DataType::Record { .. } if net => VPI_STRUCT_NET,
        DataType::Record { .. } => VPI_STRUCT_VAR,
        DataType::Array { .. } if net => VPI_NET_ARRAY,
        DataType::Array { .. } => VPI_REG_ARRAY,
    }
}

fn type_name(vpi_type: i32) -> &'static str {
    match vpi_type {
        VPI_MODULE => "vpiModule",
        VPI_GEN_SCOPE => "vpiGenScope",
        VPI_ALWAYS => "vpiAlways",
        VPI_CONT_ASSIGN => "vpiContAssign",
        VPI_NET => "vpiNet",
        VPI_NET_BIT => "vpiNetBit",
        VPI_REG => "vpiReg",
        VPI_REG_BIT => "vpiRegBit",
        VPI_PARAMETER => "vpiParameter",
        VPI_INTEGER_VAR => "vpiIntegerVar",
        VPI_REAL_VAR => "vpiRealVar",
        VPI_STRING_VAR => "vpiStringVar",
        VPI_ENUM_NET => "vpiEnumNet",
        VPI_ENUM_VAR => "vpiEnumVar",
        VPI_STRUCT_NET => "vpiStructNet",
        VPI_STRUCT_VAR => "vpiStructVar",
        VPI_NET_ARRAY => "vpiNetArray",
        VPI_REG_ARRAY => "vpiRegArray",
        _ => "vpiUndefined",
    }
}

/// Whether a child of type `child` is listed by `relation`.
fn in_relation(relation: i32, child: i32) -> bool {
    match relation {
        VPI_NET => matches!(child, VPI_NET | VPI_ENUM_NET | VPI_STRUCT_NET),
        VPI_VARIABLES => matches!(
            child,
            VPI_INTEGER_VAR | VPI_REAL_VAR | VPI_STRING_VAR | VPI_ENUM_VAR | VPI_STRUCT_VAR
        ),
        VPI_INTERNAL_SCOPE => matches!(child, VPI_GEN_SCOPE | VPI_ALWAYS | VPI_CONT_ASSIGN),
        VPI_REG | VPI_NET_ARRAY | VPI_REG_ARRAY | VPI_PARAMETER => child == relation,
        _ => false,
    }
}

fn to_vpi_value(scalar: Scalar) -> Result<VpiValue, i64> {
    Ok(match scalar {
        Scalar::BinStr(s) => VpiValue::BinStr(s),
        Scalar::Int(i) => VpiValue::Int(i32::try_from(i).map_err(|_| i)?),
        Scalar::Enum(p) => VpiValue::Int(i32::try_from(p).map_err(|_| i64::from(p))?),
        Scalar::Real(r) => VpiValue::Real(r),
        Scalar::Str(s) => VpiValue::Str(s),
    })
}

fn from_vpi_value(value: &VpiValue) -> Scalar {
    match value {
        VpiValue::BinStr(s) => Scalar::BinStr(s.clone()),
        VpiValue::Int(i) => Scalar::Int(i64::from(*i)),
        VpiValue::Real(r) => Scalar::Real(*r),
        VpiValue::Str(s) => Scalar::Str(s.clone()),
    }
}

/// Resolves an object handle, recording an error when it is stale.
fn object(kernel: &mut SimKernel, handle: VpiHandle) -> Option<ObjectId> {
    let id = kernel.object_id(handle.as_raw());
    if id.is_none() {
        kernel.fail(AccessError::BadHandle(handle.as_raw()));
    }
    id
}

fn vpi_handle(id: ObjectId) -> VpiHandle {
    VpiHandle::from_raw(SimKernel::object_handle(id))
}

impl SimEngine {
    /// Children of `scope` that `relation` lists.
    fn vpi_children(kernel: &SimKernel, relation: i32, scope: ObjectId) -> Vec<ObjectId> {
        let design = &kernel.design;
        let Some(parent) = design.object(scope) else {
            return Vec::new();
        };
        let children = parent.children().iter().filter_map(|&id| Some((id, design.object(id)?)));
        match (parent.kind(), relation) {
            (ObjectKind::Instance { .. } | ObjectKind::GenScope { .. }, VPI_MODULE) => children
                .filter(|(_, child)| matches!(child.kind(), ObjectKind::Instance { .. }))
                .map(|(id, _)| id)
                .collect(),
            (ObjectKind::Instance { .. } | ObjectKind::GenScope { .. }, _) => children
                .filter(|(_, child)| in_relation(relation, vpi_type(design, child)))
                .map(|(id, _)| id)
                .collect(),
            // Words of an unpacked array.
            (ObjectKind::Signal { ty: DataType::Array { .. }, storage }, VPI_NET | VPI_REG) => {
                let wanted = if is_net(*storage) { VPI_NET } else { VPI_REG };
                if relation != wanted {
                    return Vec::new();
                }
                children.map(|(id, _)| id).collect()
            }
            (ObjectKind::Signal { ty: DataType::Record { .. }, .. }, VPI_MEMBER) => {
                children.map(|(id, _)| id).collect()
            }
            (ObjectKind::Signal { .. } | ObjectKind::BitSelect { .. }, VPI_DRIVER | VPI_LOAD) => design
                .iter()
                .filter_map(|(_, o)| match o.kind() {
                    ObjectKind::ContAssign { target, source } if relation == VPI_DRIVER && *target == scope => {
                        Some(*source)
                    }
                    ObjectKind::ContAssign { target, source } if relation == VPI_LOAD && *source == scope => {
                        Some(*target)
                    }
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl VpiRoutines for SimEngine {
    fn handle_by_name(&self, name: &str, scope: Option<VpiHandle>) -> Option<VpiHandle> {
        let mut kernel = self.kernel_mut();
        let full_name = match scope {
            Some(scope) => {
                let id = object(&mut kernel, scope)?;
                let prefix = kernel.design.object(id)?.full_name().to_string();
                format!("{prefix}.{name}")
            }
            None => name.to_string(),
        };
        let found = kernel
            .design
            .lookup(&full_name)
            .filter(|id| kernel.design.object(*id).is_some_and(|o| o.language() == Language::Verilog));
        if found.is_none() {
            kernel.fail_with(ErrorLevel::Warning, format!("no Verilog object '{full_name}'"));
        }
        found.map(vpi_handle)
    }

    fn handle_by_index(&self, object_handle: VpiHandle, index: i64) -> Option<VpiHandle> {
        let mut kernel = self.kernel_mut();
        let parent = object(&mut kernel, object_handle)?;
        let design = &kernel.design;
        let found = design.object(parent)?.children().iter().copied().find(|&child| {
            design.object(child).is_some_and(|c| {
                c.index() == Some(index)
                    && matches!(c.kind(), ObjectKind::Signal { .. } | ObjectKind::BitSelect { .. })
            })
        });
        if found.is_none() {
            kernel.fail_with(ErrorLevel::Warning, format!("no element {index}"));
        }
        found.map(vpi_handle)
    }

    fn iterate(&self, relation: i32, scope: Option<VpiHandle>) -> Option<VpiHandle> {
        let mut kernel = self.kernel_mut();
        let items = match scope {
            None if relation == VPI_MODULE => {
                let root = kernel.design.root();
                let verilog = kernel
                    .design
                    .object(root)
                    .is_some_and(|o| o.language() == Language::Verilog);
                if verilog {
                    vec![root]
                } else {
                    Vec::new()
                }
            }
            None => Vec::new(),
            Some(scope) => {
                let scope = object(&mut kernel, scope)?;
                Self::vpi_children(&kernel, relation, scope)
            }
        };
        let raw = items.into_iter().map(SimKernel::object_handle).collect();
        kernel.open_iterator(raw).map(VpiHandle::from_raw)
    }

    fn scan(&self, iterator: VpiHandle) -> Option<VpiHandle> {
        self.kernel_mut().scan(iterator.as_raw()).map(VpiHandle::from_raw)
    }

    fn get(&self, property: i32, object_handle: Option<VpiHandle>) -> i32 {
        let mut kernel = self.kernel_mut();
        let Some(handle) = object_handle else {
            return match property {
                VPI_TIME_PRECISION => kernel.design.precision().exponent(),
                _ => VPI_UNDEFINED,
            };
        };
        let Some(id) = object(&mut kernel, handle) else {
            return VPI_UNDEFINED;
        };
        let design = &kernel.design;
        let Some(o) = design.object(id) else {
            return VPI_UNDEFINED;
        };
        match property {
            VPI_TYPE => vpi_type(design, o),
            VPI_SIZE => match o.kind() {
                ObjectKind::BitSelect { .. } => 1,
                ObjectKind::Signal { ty, .. } => match ty {
                    DataType::Logic | DataType::LogicVector { .. } => {
                        ty.logic_width().map_or(1, |w| w as i32)
                    }
                    DataType::Integer => 32,
                    DataType::Real => 64,
                    DataType::Str => 0,
                    DataType::Enum { .. } => 1,
                    DataType::Array { .. } | DataType::Record { .. } => o.children().len() as i32,
                },
                _ => VPI_UNDEFINED,
            },
            _ => VPI_UNDEFINED,
        }
    }

    fn get_str(&self, property: i32, object_handle: VpiHandle) -> Option<String> {
        let mut kernel = self.kernel_mut();
        let id = object(&mut kernel, object_handle)?;
        let design = &kernel.design;
        let o = design.object(id)?;
        match (property, o.kind()) {
            (VPI_NAME, _) => Some(o.name().to_string()),
            (VPI_FULL_NAME, _) => Some(o.full_name().to_string()),
            (VPI_TYPE, _) => Some(type_name(vpi_type(design, o)).to_string()),
            (VPI_DEF_NAME, ObjectKind::Instance { definition, .. }) => Some(definition.clone()),
            (VPI_DEF_FILE, ObjectKind::Instance { file, .. }) => Some(file.clone()),
            _ => None,
        }
    }

    fn get_range(&self, object_handle: VpiHandle) -> Option<(i64, i64)> {
        let mut kernel = self.kernel_mut();
        let id = object(&mut kernel, object_handle)?;
        kernel.design.object(id)?.data_type()?.bounds()
    }

    fn get_value(&self, object_handle: VpiHandle, format: i32) -> Option<VpiValue> {
        let mut kernel = self.kernel_mut();
        let id = object(&mut kernel, object_handle)?;
        let format = match format {
            VPI_BIN_STR_VAL => Format::BinStr,
            VPI_INT_VAL => Format::Int,
            VPI_REAL_VAL => Format::Real,
            VPI_STRING_VAL => Format::Str,
            other => {
                kernel.fail_with(ErrorLevel::Error, format!("unsupported value format {other}"));
                return None;
            }
        };
        let result = kernel.read(id, format);
        match result.map(to_vpi_value) {
            Ok(Ok(value)) => Some(value),
            Ok(Err(out_of_range)) => {
                kernel.fail_with(ErrorLevel::Error, format!("{out_of_range} does not fit vpiIntVal"));
                None
            }
            Err(e) => {
                kernel.fail(e);
                None
            }
        }
    }

    fn put_value(&self, object_handle: VpiHandle, value: &VpiValue, flags: i32) -> bool {
        let mut kernel = self.kernel_mut();
        let Some(id) = object(&mut kernel, object_handle) else {
            return false;
        };
        let mode = match flags {
            VPI_INERTIAL_DELAY => WriteMode::Deposit,
            VPI_NO_DELAY => WriteMode::Immediate,
            VPI_FORCE_FLAG => WriteMode::Force,
            VPI_RELEASE_FLAG => WriteMode::Release,
            other => {
                kernel.fail_with(ErrorLevel::Error, format!("unsupported put flags {other}"));
                return false;
            }
        };
        match kernel.write(id, &from_vpi_value(value), mode) {
            Ok(()) => true,
            Err(e) => {
                kernel.fail(e);
                false
            }
        }
    }

    fn register_cb(&self, data: &CbData) -> Option<VpiHandle> {
        let mut kernel = self.kernel_mut();
        let wake = match data.reason {
            CB_AFTER_DELAY => Wake::Timed(kernel.now() + data.delay),
            CB_READ_WRITE_SYNCH => Wake::ReadWrite,
            CB_READ_ONLY_SYNCH => Wake::ReadOnly,
            CB_NEXT_SIM_TIME => Wake::NextTime,
            CB_START_OF_SIMULATION => Wake::StartOfSimulation,
            CB_END_OF_SIMULATION => Wake::EndOfSimulation,
            CB_VALUE_CHANGE => {
                let Some(watched) = data.object else {
                    kernel.fail_with(ErrorLevel::Error, "cbValueChange without an object".to_string());
                    return None;
                };
                Wake::ValueChange(object(&mut kernel, watched)?)
            }
            other => {
                kernel.fail_with(ErrorLevel::Error, format!("unsupported callback reason {other}"));
                return None;
            }
        };
        kernel
            .register_callback(Interface::Vpi, wake, data.user_data)
            .map(VpiHandle::from_raw)
    }

    fn remove_cb(&self, callback: VpiHandle) -> bool {
        self.kernel_mut().remove_callback(callback.as_raw())
    }

    fn get_time(&self) -> u64 {
        self.now()
    }

    fn control(&self, operation: i32) -> bool {
        let mut kernel = self.kernel_mut();
        match operation {
            VPI_FINISH => kernel.finish_requested = true,
            VPI_STOP => kernel.stop_requested = true,
            other => {
                kernel.fail_with(ErrorLevel::Warning, format!("unsupported vpi_control operation {other}"));
                return false;
            }
        }
        true
    }

    fn vlog_info(&self) -> Option<(String, String)> {
        let kernel = self.kernel();
        Some((kernel.design.product().to_string(), kernel.design.version().to_string()))
    }

    fn chk_error(&self) -> Option<VpiErrorInfo> {
        self.kernel_mut().take_error().map(|e| VpiErrorInfo {
            level: match e.level {
                ErrorLevel::Warning => VPI_WARNING,
                ErrorLevel::Error => VPI_ERROR,
            },
            message: e.message,
        })
    }

    fn release_handle(&self, object_handle: VpiHandle) {
        self.kernel_mut().release(object_handle.as_raw());
    }
}
