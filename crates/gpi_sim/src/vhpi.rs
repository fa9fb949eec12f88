//! The engine's `vhpi_*` routine table, plus the type declarations VHPI
//! exposes for VHDL objects.
//!
//! Only VHDL objects are visible by name. Region iteration lists instances
//! of either language; a Verilog instance reports an undefined kind, which
//! the GPI treats as an object for another backend.

use std::collections::HashMap;

use gpi::arena::ArenaId;
use gpi_vhpi::consts::*;
use gpi_vhpi::{VhpiCbData, VhpiErrorInfo, VhpiHandle, VhpiRoutines, VhpiValue};

use crate::design::{DataType, Design, DesignObject, Language, ObjectId, ObjectKind, Storage};
use crate::engine::SimEngine;
use crate::handles::{HandleKind, RawHandle};
use crate::kernel::{AccessError, CbState, ErrorLevel, Interface, SimKernel, Wake, WriteMode};
use crate::value::{Format, Scalar};

const STD_ULOGIC_LITERALS: [&str; 9] = ["U", "X", "0", "1", "Z", "W", "L", "H", "-"];

/// A VHDL type declaration as VHPI walks it.
#[derive(Clone, PartialEq, Debug)]
pub(crate) enum VhdlType {
    Enum { name: String, literals: Vec<String> },
    Integer { name: String },
    Float { name: String },
    Record { name: String },
    Array { name: String, element: u32, dims: u32 },
    Subtype { name: String, base: u32 },
}

impl VhdlType {
    fn name(&self) -> &str {
        match self {
            VhdlType::Enum { name, .. }
            | VhdlType::Integer { name }
            | VhdlType::Float { name }
            | VhdlType::Record { name }
            | VhdlType::Array { name, .. }
            | VhdlType::Subtype { name, .. } => name,
        }
    }

    fn kind(&self) -> i32 {
        match self {
            VhdlType::Enum { .. } => VHPI_ENUM_TYPE_DECL_K,
            VhdlType::Integer { .. } => VHPI_INT_TYPE_DECL_K,
            VhdlType::Float { .. } => VHPI_FLOAT_TYPE_DECL_K,
            VhdlType::Record { .. } => VHPI_RECORD_TYPE_DECL_K,
            VhdlType::Array { .. } => VHPI_ARRAY_TYPE_DECL_K,
            VhdlType::Subtype { .. } => VHPI_SUBTYPE_DECL_K,
        }
    }
}

/// Type declarations created on demand, one per name.
#[derive(Default)]
pub(crate) struct TypeTable {
    types: Vec<VhdlType>,
    by_name: HashMap<String, u32>,
}

impl TypeTable {
    fn insert(&mut self, ty: VhdlType) -> u32 {
        if let Some(&index) = self.by_name.get(ty.name()) {
            return index;
        }
        let index = self.types.len() as u32;
        self.by_name.insert(ty.name().to_string(), index);
        self.types.push(ty);
        index
    }

    fn get(&self, index: u32) -> Option<&VhdlType> {
        self.types.get(index as usize)
    }

    fn std_logic(&mut self) -> u32 {
        let base = self.insert(VhdlType::Enum {
            name: "STD_ULOGIC".to_string(),
            literals: STD_ULOGIC_LITERALS.iter().map(|l| l.to_string()).collect(),
        });
        self.insert(VhdlType::Subtype {
            name: "STD_LOGIC".to_string(),
            base,
        })
    }

    /// The declaration for `ty`, created on first use.
    pub(crate) fn intern(&mut self, ty: &DataType) -> u32 {
        match ty {
            DataType::Logic => self.std_logic(),
            DataType::LogicVector { .. } => {
                let element = self.std_logic();
                let base = self.insert(VhdlType::Array {
                    name: "STD_ULOGIC_VECTOR".to_string(),
                    element,
                    dims: 1,
                });
                self.insert(VhdlType::Subtype {
                    name: "STD_LOGIC_VECTOR".to_string(),
                    base,
                })
            }
            DataType::Integer => self.insert(VhdlType::Integer {
                name: "INTEGER".to_string(),
            }),
            DataType::Real => self.insert(VhdlType::Float {
                name: "REAL".to_string(),
            }),
            DataType::Str => {
                let element = self.insert(VhdlType::Enum {
                    name: "CHARACTER".to_string(),
                    literals: Vec::new(),
                });
                self.insert(VhdlType::Array {
                    name: "STRING".to_string(),
                    element,
                    dims: 1,
                })
            }
            DataType::Enum { name, literals } => self.insert(VhdlType::Enum {
                name: name.to_ascii_uppercase(),
                literals: literals.clone(),
            }),
            DataType::Array { element, .. } => {
                let element = self.intern(element);
                let name = match self.get(element) {
                    Some(e) => format!("{}_ARRAY", e.name()),
                    None => "ARRAY".to_string(),
                };
                self.insert(VhdlType::Array { name, element, dims: 1 })
            }
            DataType::Record { name, .. } => self.insert(VhdlType::Record {
                name: name.to_ascii_uppercase(),
            }),
        }
    }
}

/// The `vhpiKindP` of an object, `VHPI_UNDEFINED` for Verilog objects.
fn object_kind(design: &Design, id: ObjectId, object: &DesignObject) -> i32 {
    if object.language() != Language::Vhdl {
        return VHPI_UNDEFINED;
    }
    match object.kind() {
        ObjectKind::Instance { .. } if id == design.root() => VHPI_ROOT_INST_K,
        ObjectKind::Instance { .. } => VHPI_COMP_INST_STMT_K,
        ObjectKind::GenScope { .. } => VHPI_FOR_GENERATE_K,
        ObjectKind::Process => VHPI_PROCESS_STMT_K,
        ObjectKind::ContAssign { .. } => VHPI_SIMPLE_SIG_ASSIGN_STMT_K,
        ObjectKind::BitSelect { .. } => VHPI_INDEXED_NAME_K,
        ObjectKind::Signal { .. } if object.index().is_some() => VHPI_INDEXED_NAME_K,
        ObjectKind::Signal { storage, .. } => {
            let in_record = object
                .parent()
                .and_then(|p| design.object(p))
                .is_some_and(|p| matches!(p.kind(), ObjectKind::Signal { .. }));
            if in_record {
                return VHPI_SELECTED_NAME_K;
            }
            match storage {
                Storage::Net => VHPI_SIG_DECL_K,
                Storage::Var => VHPI_VAR_DECL_K,
                Storage::Port => VHPI_PORT_DECL_K,
                Storage::Const => VHPI_CONST_DECL_K,
                Storage::Generic => VHPI_GENERIC_DECL_K,
            }
        }
    }
}

fn kind_name(kind: i32) -> &'static str {
    match kind {
        VHPI_ROOT_INST_K => "vhpiRootInstK",
        VHPI_COMP_INST_STMT_K => "vhpiCompInstStmtK",
        VHPI_FOR_GENERATE_K => "vhpiForGenerateK",
        VHPI_PROCESS_STMT_K => "vhpiProcessStmtK",
        VHPI_SIMPLE_SIG_ASSIGN_STMT_K => "vhpiSimpleSigAssignStmtK",
        VHPI_INDEXED_NAME_K => "vhpiIndexedNameK",
        VHPI_SELECTED_NAME_K => "vhpiSelectedNameK",
        VHPI_SIG_DECL_K => "vhpiSigDeclK",
        VHPI_VAR_DECL_K => "vhpiVarDeclK",
        VHPI_PORT_DECL_K => "vhpiPortDeclK",
        VHPI_CONST_DECL_K => "vhpiConstDeclK",
        VHPI_GENERIC_DECL_K => "vhpiGenericDeclK",
        VHPI_ENUM_TYPE_DECL_K => "vhpiEnumTypeDeclK",
        VHPI_INT_TYPE_DECL_K => "vhpiIntTypeDeclK",
        VHPI_FLOAT_TYPE_DECL_K => "vhpiFloatTypeDeclK",
        VHPI_RECORD_TYPE_DECL_K => "vhpiRecordTypeDeclK",
        VHPI_ARRAY_TYPE_DECL_K => "vhpiArrayTypeDeclK",
        VHPI_SUBTYPE_DECL_K => "vhpiSubtypeDeclK",
        _ => "vhpiUndefined",
    }
}

fn decl_storage(relation: i32) -> Option<Storage> {
    Some(match relation {
        VHPI_SIG_DECLS => Storage::Net,
        VHPI_VAR_DECLS => Storage::Var,
        VHPI_PORT_DECLS => Storage::Port,
        VHPI_GENERIC_DECLS => Storage::Generic,
        VHPI_CONST_DECLS => Storage::Const,
        _ => return None,
    })
}

fn to_vhpi_value(scalar: Scalar) -> Result<VhpiValue, i64> {
    Ok(match scalar {
        Scalar::BinStr(s) => VhpiValue::BinStr(s),
        Scalar::Int(i) => VhpiValue::Int(i32::try_from(i).map_err(|_| i)?),
        Scalar::Enum(p) => VhpiValue::Enum(p),
        Scalar::Real(r) => VhpiValue::Real(r),
        Scalar::Str(s) => VhpiValue::Str(s),
    })
}

fn from_vhpi_value(value: &VhpiValue) -> Scalar {
    match value {
        VhpiValue::BinStr(s) => Scalar::BinStr(s.clone()),
        VhpiValue::Enum(p) => Scalar::Enum(*p),
        VhpiValue::Int(i) => Scalar::Int(i64::from(*i)),
        VhpiValue::Real(r) => Scalar::Real(*r),
        VhpiValue::Str(s) => Scalar::Str(s.clone()),
    }
}

fn vhpi_handle(kind: HandleKind, index: u32) -> VhpiHandle {
    VhpiHandle::from_raw(RawHandle::new(kind, index).to_raw())
}

fn object_handle(id: ObjectId) -> VhpiHandle {
    VhpiHandle::from_raw(SimKernel::object_handle(id))
}

/// What a VHPI handle refers to.
enum Referent {
    Object(ObjectId),
    Type(u32),
    Tool,
    DesignUnit(ObjectId),
    Callback(u64),
}

fn referent(kernel: &mut SimKernel, handle: VhpiHandle) -> Option<Referent> {
    let raw = handle.as_raw();
    let found = match RawHandle::from_raw(raw) {
        Some(RawHandle { kind: HandleKind::Object, .. }) => kernel.object_id(raw).map(Referent::Object),
        Some(RawHandle { kind: HandleKind::Type, index }) => kernel.types.get(index).map(|_| Referent::Type(index)),
        Some(RawHandle { kind: HandleKind::Tool, .. }) => Some(Referent::Tool),
        Some(RawHandle {
            kind: HandleKind::DesignUnit,
            index,
        }) => {
            let id = ObjectId::from_raw(index);
            kernel.design.object(id).map(|_| Referent::DesignUnit(id))
        }
        Some(RawHandle { kind: HandleKind::Callback, .. }) => kernel.callback(raw).map(|_| Referent::Callback(raw)),
        _ => None,
    };
    if found.is_none() {
        kernel.fail(AccessError::BadHandle(raw));
    }
    found
}

fn object(kernel: &mut SimKernel, handle: VhpiHandle) -> Option<ObjectId> {
    match referent(kernel, handle)? {
        Referent::Object(id) => Some(id),
        _ => {
            kernel.fail(AccessError::BadHandle(handle.as_raw()));
            None
        }
    }
}

impl SimEngine {
    fn vhpi_children(kernel: &SimKernel, relation: i32, scope: ObjectId) -> Vec<ObjectId> {
        let design = &kernel.design;
        let Some(parent) = design.object(scope) else {
            return Vec::new();
        };
        let is_scope = matches!(parent.kind(), ObjectKind::Instance { .. } | ObjectKind::GenScope { .. });
        let children = parent.children().iter().filter_map(|&id| Some((id, design.object(id)?)));
        let pick = |keep: &dyn Fn(&DesignObject) -> bool| -> Vec<ObjectId> {
            parent
                .children()
                .iter()
                .copied()
                .filter(|&id| design.object(id).is_some_and(keep))
                .collect()
        };
        match relation {
            VHPI_INTERNAL_REGIONS if is_scope => pick(&|child: &DesignObject| {
                matches!(
                    child.kind(),
                    ObjectKind::Instance { .. }
                        | ObjectKind::GenScope { .. }
                        | ObjectKind::Process
                        | ObjectKind::ContAssign { .. }
                )
            }),
            VHPI_INDEXED_NAMES if !is_scope => children
                .filter(|(_, child)| child.index().is_some())
                .map(|(id, _)| id)
                .collect(),
            VHPI_SELECTED_NAMES if matches!(parent.data_type(), Some(DataType::Record { .. })) => {
                children.map(|(id, _)| id).collect()
            }
            _ if is_scope => match decl_storage(relation) {
                Some(wanted) => pick(&|child: &DesignObject| {
                    matches!(child.kind(), ObjectKind::Signal { storage, .. } if *storage == wanted)
                }),
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }
}

impl VhpiRoutines for SimEngine {
    fn handle(&self, relation: i32, reference: Option<VhpiHandle>) -> Option<VhpiHandle> {
        let mut kernel = self.kernel_mut();
        let Some(reference) = reference else {
            return match relation {
                VHPI_TOOL => Some(vhpi_handle(HandleKind::Tool, 0)),
                VHPI_ROOT_INST => {
                    let root = kernel.design.root();
                    let vhdl = kernel.design.object(root).is_some_and(|o| o.language() == Language::Vhdl);
                    vhdl.then(|| object_handle(root))
                }
                _ => None,
            };
        };
        let found = match (relation, referent(&mut kernel, reference)?) {
            (VHPI_TYPE, Referent::Object(id)) => {
                let ty = match kernel.design.object(id).map(|o| o.kind()) {
                    Some(ObjectKind::Signal { ty, .. }) => Some(ty.clone()),
                    Some(ObjectKind::BitSelect { .. }) => Some(DataType::Logic),
                    _ => None,
                };
                ty.map(|ty| vhpi_handle(HandleKind::Type, kernel.types.intern(&ty)))
            }
            (VHPI_DESIGN_UNIT, Referent::Object(id)) => {
                let is_instance = kernel
                    .design
                    .object(id)
                    .is_some_and(|o| matches!(o.kind(), ObjectKind::Instance { .. }));
                is_instance.then(|| vhpi_handle(HandleKind::DesignUnit, id.as_raw()))
            }
            (VHPI_BASE_TYPE, Referent::Type(index)) => match kernel.types.get(index) {
                Some(VhdlType::Subtype { base, .. }) => Some(vhpi_handle(HandleKind::Type, *base)),
                _ => None,
            },
            (VHPI_ELEM_TYPE, Referent::Type(index)) => match kernel.types.get(index) {
                Some(VhdlType::Array { element, .. }) => Some(vhpi_handle(HandleKind::Type, *element)),
                _ => None,
            },
            _ => None,
        };
        if found.is_none() {
            kernel.fail_with(ErrorLevel::Warning, format!("no relation {relation} from {reference:?}"));
        }
        found
    }

    fn handle_by_name(&self, name: &str, scope: Option<VhpiHandle>) -> Option<VhpiHandle> {
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
            .filter(|id| kernel.design.object(*id).is_some_and(|o| o.language() == Language::Vhdl));
        if found.is_none() {
            kernel.fail_with(ErrorLevel::Warning, format!("no VHDL object '{full_name}'"));
        }
        found.map(object_handle)
    }

    fn handle_by_index(&self, relation: i32, parent: VhpiHandle, offset: u64) -> Option<VhpiHandle> {
        let mut kernel = self.kernel_mut();
        let parent = object(&mut kernel, parent)?;
        let design = &kernel.design;
        let bounds = design.object(parent)?.data_type()?.bounds();
        let found = match (relation, bounds) {
            (VHPI_INDEXED_NAMES, Some((left, right))) => {
                let offset = i64::try_from(offset).ok()?;
                let index = if left <= right { left + offset } else { left - offset };
                design.object(parent)?.children().iter().copied().find(|&child| {
                    design.object(child).is_some_and(|c| c.index() == Some(index))
                })
            }
            _ => None,
        };
        if found.is_none() {
            kernel.fail_with(ErrorLevel::Warning, format!("no element at offset {offset}"));
        }
        found.map(object_handle)
    }

    fn iterator(&self, relation: i32, reference: VhpiHandle) -> Option<VhpiHandle> {
        let mut kernel = self.kernel_mut();
        let scope = object(&mut kernel, reference)?;
        let items = Self::vhpi_children(&kernel, relation, scope)
            .into_iter()
            .map(SimKernel::object_handle)
            .collect();
        kernel.open_iterator(items).map(VhpiHandle::from_raw)
    }

    fn scan(&self, iterator: VhpiHandle) -> Option<VhpiHandle> {
        self.kernel_mut().scan(iterator.as_raw()).map(VhpiHandle::from_raw)
    }

    fn get(&self, property: i32, object_handle: VhpiHandle) -> i32 {
        let mut kernel = self.kernel_mut();
        let Some(found) = referent(&mut kernel, object_handle) else {
            return VHPI_UNDEFINED;
        };
        let design = &kernel.design;
        match (property, found) {
            (VHPI_KIND_P, Referent::Object(id)) => design
                .object(id)
                .map_or(VHPI_UNDEFINED, |o| object_kind(design, id, o)),
            (VHPI_KIND_P, Referent::Type(index)) => kernel.types.get(index).map_or(VHPI_UNDEFINED, VhdlType::kind),
            (VHPI_NUM_DIMENSIONS_P, Referent::Type(index)) => match kernel.types.get(index) {
                Some(VhdlType::Array { dims, .. }) => *dims as i32,
                _ => 0,
            },
            (VHPI_STATE_P, Referent::Callback(raw)) => match kernel.callback(raw).map(|cb| cb.state) {
                Some(CbState::Enabled) => VHPI_ENABLE,
                Some(CbState::Fired | CbState::Mature) => VHPI_MATURE,
                None => VHPI_UNDEFINED,
            },
            (VHPI_SIZE_P | VHPI_LEFT_BOUND_P | VHPI_RIGHT_BOUND_P | VHPI_IS_UP_P, Referent::Object(id)) => {
                let Some(o) = design.object(id) else {
                    return VHPI_UNDEFINED;
                };
                let bounds = o.data_type().and_then(DataType::bounds);
                match (property, bounds) {
                    (VHPI_SIZE_P, Some(_)) => o.children().len() as i32,
                    (VHPI_SIZE_P, None) => match o.data_type() {
                        Some(DataType::Record { fields, .. }) => fields.len() as i32,
                        Some(_) => 1,
                        None => 0,
                    },
                    (VHPI_LEFT_BOUND_P, Some((left, _))) => left as i32,
                    (VHPI_RIGHT_BOUND_P, Some((_, right))) => right as i32,
                    (VHPI_IS_UP_P, Some((left, right))) => i32::from(left <= right),
                    _ => VHPI_UNDEFINED,
                }
            }
            _ => VHPI_UNDEFINED,
        }
    }

    fn get_str(&self, property: i32, object_handle: VhpiHandle) -> Option<String> {
        let mut kernel = self.kernel_mut();
        let found = referent(&mut kernel, object_handle)?;
        let design = &kernel.design;
        match (property, found) {
            (VHPI_NAME_P, Referent::Object(id)) => design.object(id).map(|o| o.name().to_string()),
            (VHPI_FULL_NAME_P, Referent::Object(id)) => design.object(id).map(|o| o.full_name().to_string()),
            (VHPI_KIND_STR_P, Referent::Object(id)) => design
                .object(id)
                .map(|o| kind_name(object_kind(design, id, o)).to_string()),
            (VHPI_NAME_P, Referent::Type(index)) => kernel.types.get(index).map(|t| t.name().to_string()),
            (VHPI_KIND_STR_P, Referent::Type(index)) => kernel.types.get(index).map(|t| kind_name(t.kind()).to_string()),
            (VHPI_NAME_P, Referent::Tool) => Some(design.product().to_string()),
            (VHPI_TOOL_VERSION_P, Referent::Tool) => Some(design.version().to_string()),
            (VHPI_UNIT_NAME_P | VHPI_FILE_NAME_P, Referent::DesignUnit(id)) => match design.object(id)?.kind() {
                ObjectKind::Instance { definition, .. } if property == VHPI_UNIT_NAME_P => Some(definition.clone()),
                ObjectKind::Instance { file, .. } => Some(file.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    fn get_phys(&self, property: i32, object_handle: Option<VhpiHandle>) -> Option<u64> {
        let kernel = self.kernel();
        match (property, object_handle) {
            (VHPI_RESOLUTION_LIMIT_P, None) => Some(kernel.design.precision().as_femtoseconds()),
            _ => None,
        }
    }

    fn get_value(&self, object_handle: VhpiHandle, format: i32) -> Option<VhpiValue> {
        let mut kernel = self.kernel_mut();
        let id = object(&mut kernel, object_handle)?;
        let format = match format {
            VHPI_BIN_STR_VAL => Format::BinStr,
            VHPI_ENUM_VAL => Format::Enum,
            VHPI_INT_VAL => Format::Int,
            VHPI_REAL_VAL => Format::Real,
            VHPI_STR_VAL => Format::Str,
            other => {
                kernel.fail_with(ErrorLevel::Error, format!("unsupported value format {other}"));
                return None;
            }
        };
        let result = kernel.read(id, format);
        match result.map(to_vhpi_value) {
            Ok(Ok(value)) => Some(value),
            Ok(Err(out_of_range)) => {
                kernel.fail_with(ErrorLevel::Error, format!("{out_of_range} does not fit vhpiIntVal"));
                None
            }
            Err(e) => {
                kernel.fail(e);
                None
            }
        }
    }

    fn put_value(&self, object_handle: VhpiHandle, value: &VhpiValue, mode: i32) -> bool {
        let mut kernel = self.kernel_mut();
        let Some(id) = object(&mut kernel, object_handle) else {
            return false;
        };
        let mode = match mode {
            VHPI_DEPOSIT_PROPAGATE => WriteMode::Deposit,
            VHPI_DEPOSIT => WriteMode::Immediate,
            VHPI_FORCE | VHPI_FORCE_PROPAGATE => WriteMode::Force,
            VHPI_RELEASE => WriteMode::Release,
            other => {
                kernel.fail_with(ErrorLevel::Error, format!("unsupported put mode {other}"));
                return false;
            }
        };
        match kernel.write(id, &from_vhpi_value(value), mode) {
            Ok(()) => true,
            Err(e) => {
                kernel.fail(e);
                false
            }
        }
    }

    fn register_cb(&self, data: &VhpiCbData) -> Option<VhpiHandle> {
        let mut kernel = self.kernel_mut();
        let wake = match data.reason {
            VHPI_CB_AFTER_DELAY => Wake::Timed(kernel.now() + data.delay),
            VHPI_CB_END_OF_PROCESSES => Wake::ReadWrite,
            VHPI_CB_LAST_KNOWN_DELTA_CYCLE => Wake::ReadOnly,
            VHPI_CB_NEXT_TIME_STEP => Wake::NextTime,
            VHPI_CB_START_OF_SIMULATION => Wake::StartOfSimulation,
            VHPI_CB_END_OF_SIMULATION => Wake::EndOfSimulation,
            VHPI_CB_VALUE_CHANGE => {
                let Some(watched) = data.object else {
                    kernel.fail_with(ErrorLevel::Error, "vhpiCbValueChange without an object".to_string());
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
            .register_callback(Interface::Vhpi, wake, data.user_data)
            .map(VhpiHandle::from_raw)
    }

    fn remove_cb(&self, callback: VhpiHandle) -> bool {
        self.kernel_mut().remove_callback(callback.as_raw())
    }

    fn get_time(&self) -> u64 {
        self.now()
    }

    fn control(&self, command: i32) -> bool {
        let mut kernel = self.kernel_mut();
        match command {
            VHPI_FINISH => kernel.finish_requested = true,
            VHPI_STOP => kernel.stop_requested = true,
            other => {
                kernel.fail_with(ErrorLevel::Warning, format!("unsupported vhpi_control command {other}"));
                return false;
            }
        }
        true
    }

    fn check_error(&self) -> Option<VhpiErrorInfo> {
        self.kernel_mut().take_error().map(|e| VhpiErrorInfo {
            severity: match e.level {
                ErrorLevel::Warning => VHPI_WARNING,
                ErrorLevel::Error => VHPI_ERROR,
            },
            message: e.message,
        })
    }

    fn release_handle(&self, object_handle: VhpiHandle) {
        self.kernel_mut().release(object_handle.as_raw());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::DesignBuilder;

    fn make_engine() -> SimEngine {
        let mut b = DesignBuilder::new(Language::Vhdl, "dut");
        let dut = b.root();
        b.signal(dut, "Clk", DataType::Logic, Storage::Port).unwrap();
        b.signal(dut, "data", DataType::vector(7, 0), Storage::Net).unwrap();
        b.signal(dut, "busy", DataType::boolean(), Storage::Net).unwrap();
        b.signal(dut, "DEPTH", DataType::Integer, Storage::Generic).unwrap();
        b.signal(
            dut,
            "regs",
            DataType::Record {
                name: "regs_t".into(),
                fields: vec![("ctrl".into(), DataType::Integer), ("flag".into(), DataType::Logic)],
            },
            Storage::Net,
        )
        .unwrap();
        b.process(dut, "clocked").unwrap();
        b.instance(dut, Language::Verilog, "core", "core", "core.sv").unwrap();
        SimEngine::new(b.build())
    }

    fn names(engine: &SimEngine, iter: Option<VhpiHandle>) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(iter) = iter {
            while let Some(h) = engine.scan(iter) {
                out.push(engine.get_str(VHPI_NAME_P, h).unwrap());
            }
        }
        out
    }

    #[test]
    fn root_and_tool() {
        let engine = make_engine();
        let root = engine.handle(VHPI_ROOT_INST, None).unwrap();
        assert_eq!(engine.get(VHPI_KIND_P, root), VHPI_ROOT_INST_K);
        assert_eq!(engine.get_str(VHPI_NAME_P, root).as_deref(), Some("dut"));
        let tool = engine.handle(VHPI_TOOL, None).unwrap();
        assert_eq!(engine.get_str(VHPI_NAME_P, tool).as_deref(), Some("gpi_sim"));
        assert_eq!(engine.get_phys(VHPI_RESOLUTION_LIMIT_P, None), Some(1_000));
        let unit = engine.handle(VHPI_DESIGN_UNIT, Some(root)).unwrap();
        assert_eq!(engine.get_str(VHPI_UNIT_NAME_P, unit).as_deref(), Some("dut"));
    }

    #[test]
    fn names_fold_case() {
        let engine = make_engine();
        let clk = engine.handle_by_name("DUT.CLK", None).unwrap();
        assert_eq!(engine.handle_by_name("dut.Clk", None), Some(clk));
        assert_eq!(engine.get(VHPI_KIND_P, clk), VHPI_PORT_DECL_K);
        assert!(engine.handle_by_name("dut.core", None).is_none());
    }

    #[test]
    fn type_walk() {
        let engine = make_engine();
        let data = engine.handle_by_name("dut.data", None).unwrap();
        let ty = engine.handle(VHPI_TYPE, Some(data)).unwrap();
        assert_eq!(engine.get(VHPI_KIND_P, ty), VHPI_SUBTYPE_DECL_K);
        assert_eq!(engine.get_str(VHPI_NAME_P, ty).as_deref(), Some("STD_LOGIC_VECTOR"));
        let base = engine.handle(VHPI_BASE_TYPE, Some(ty)).unwrap();
        assert_eq!(engine.get(VHPI_KIND_P, base), VHPI_ARRAY_TYPE_DECL_K);
        assert_eq!(engine.get(VHPI_NUM_DIMENSIONS_P, base), 1);
        let element = engine.handle(VHPI_ELEM_TYPE, Some(base)).unwrap();
        assert_eq!(engine.get_str(VHPI_NAME_P, element).as_deref(), Some("STD_LOGIC"));
        assert_eq!(engine.get(VHPI_SIZE_P, data), 8);
        assert_eq!(engine.get(VHPI_LEFT_BOUND_P, data), 7);
        assert_eq!(engine.get(VHPI_RIGHT_BOUND_P, data), 0);
        let bit = engine.handle_by_index(VHPI_INDEXED_NAMES, data, 1).unwrap();
        assert_eq!(engine.get_str(VHPI_NAME_P, bit).as_deref(), Some("data(6)"));
        assert_eq!(engine.get(VHPI_KIND_P, bit), VHPI_INDEXED_NAME_K);
    }

    #[test]
    fn region_relations() {
        let engine = make_engine();
        let root = engine.handle(VHPI_ROOT_INST, None).unwrap();
        assert_eq!(names(&engine, engine.iterator(VHPI_INTERNAL_REGIONS, root)), ["clocked", "core"]);
        assert_eq!(names(&engine, engine.iterator(VHPI_SIG_DECLS, root)), ["data", "busy", "regs"]);
        assert_eq!(names(&engine, engine.iterator(VHPI_PORT_DECLS, root)), ["Clk"]);
        assert_eq!(names(&engine, engine.iterator(VHPI_GENERIC_DECLS, root)), ["DEPTH"]);
        assert!(engine.iterator(VHPI_VAR_DECLS, root).is_none());
        let core = engine.handle_by_name("dut.core", None);
        assert!(core.is_none());
        let regs = engine.handle_by_name("dut.regs", None).unwrap();
        assert_eq!(names(&engine, engine.iterator(VHPI_SELECTED_NAMES, regs)), ["ctrl", "flag"]);
        let ctrl = engine.handle_by_name("dut.regs.ctrl", None).unwrap();
        assert_eq!(engine.get(VHPI_KIND_P, ctrl), VHPI_SELECTED_NAME_K);
    }

    #[test]
    fn enum_values() {
        let engine = make_engine();
        let busy = engine.handle_by_name("dut.busy", None).unwrap();
        assert_eq!(engine.get_value(busy, VHPI_ENUM_VAL), Some(VhpiValue::Enum(0)));
        assert!(engine.put_value(busy, &VhpiValue::Enum(1), VHPI_DEPOSIT));
        assert_eq!(engine.get_value(busy, VHPI_STR_VAL), Some(VhpiValue::Str("TRUE".into())));
        assert!(!engine.put_value(busy, &VhpiValue::Enum(2), VHPI_DEPOSIT));
        assert_eq!(engine.check_error().map(|e| e.severity), Some(VHPI_ERROR));
        let depth = engine.handle_by_name("dut.DEPTH", None).unwrap();
        assert!(!engine.put_value(depth, &VhpiValue::Int(4), VHPI_DEPOSIT));
    }
}
