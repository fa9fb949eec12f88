//! VPI object types mapped onto the engine-neutral classification.

use gpi::{DiagnosticSeverity, EngineQuirk, ObjectType, ScalarKind, TypeShape};

use crate::consts::*;

/// Per-product classification overrides.
///
/// Verilator exposes packed structs as plain bit vectors: reads and writes
/// behave like a logic array, and there are no member handles.
pub const VPI_QUIRKS: &[EngineQuirk<i32>] = &[
    EngineQuirk {
        product: "Verilator",
        native: VPI_STRUCT_VAR,
        object_type: ObjectType::LogicArray,
    },
    EngineQuirk {
        product: "Verilator",
        native: VPI_STRUCT_NET,
        object_type: ObjectType::LogicArray,
    },
];

/// Describes a VPI object type as a [`TypeShape`]. `size` is the object's
/// `vpiSize` and only matters for nets and regs.
pub fn shape_of(vpi_type: i32, size: i32) -> TypeShape {
    let logic = TypeShape::Scalar(ScalarKind::Logic);
    match vpi_type {
        VPI_MODULE | VPI_GEN_SCOPE => TypeShape::Scope,
        VPI_GEN_SCOPE_ARRAY => TypeShape::GenerateArray,
        VPI_NET | VPI_REG if size > 1 => TypeShape::array_of(logic),
        VPI_NET | VPI_REG | VPI_NET_BIT | VPI_REG_BIT => logic,
        VPI_INTEGER_VAR => TypeShape::Scalar(ScalarKind::Integer),
        VPI_REAL_VAR => TypeShape::Scalar(ScalarKind::Real),
        VPI_STRING_VAR => TypeShape::Scalar(ScalarKind::String),
        VPI_ENUM_VAR | VPI_ENUM_NET => TypeShape::Scalar(ScalarKind::Enum),
        VPI_STRUCT_VAR | VPI_STRUCT_NET => TypeShape::Record,
        // Element type is reached per word through `vpi_handle_by_index`.
        VPI_NET_ARRAY | VPI_REG_ARRAY => TypeShape::array_of(TypeShape::Opaque),
        VPI_PARAMETER => TypeShape::Parameter,
        _ => TypeShape::Opaque,
    }
}

/// Classifies a VPI object on `product`.
pub fn object_type(product: &str, vpi_type: i32, size: i32) -> ObjectType {
    gpi::classify_with_quirks(VPI_QUIRKS, product, &vpi_type, &shape_of(vpi_type, size))
}

/// Process-like objects that never surface as children.
pub fn is_filtered(vpi_type: i32) -> bool {
    matches!(vpi_type, VPI_ALWAYS | VPI_INITIAL | VPI_CONT_ASSIGN)
}

/// Maps a `vpi_chk_error` level to a diagnostic severity.
pub fn severity(level: i32) -> DiagnosticSeverity {
    match level {
        VPI_NOTICE => DiagnosticSeverity::Info,
        VPI_WARNING => DiagnosticSeverity::Warning,
        VPI_ERROR => DiagnosticSeverity::Error,
        _ => DiagnosticSeverity::Critical,
    }
}

/// Splits a generate iteration name such as `gen_blk[3]` into its label
/// and index.
pub fn split_generate_name(name: &str) -> Option<(&str, i64)> {
    let stripped = name.strip_suffix(']')?;
    let open = stripped.rfind('[')?;
    let index = stripped[open + 1..].trim().parse().ok()?;
    Some((&stripped[..open], index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nets_and_regs_by_size() {
        assert_eq!(object_type("Icarus", VPI_NET, 1), ObjectType::Logic);
        assert_eq!(object_type("Icarus", VPI_REG, 8), ObjectType::LogicArray);
        assert_eq!(object_type("Icarus", VPI_REG_BIT, 1), ObjectType::Logic);
    }

    #[test]
    fn variables_and_scopes() {
        assert_eq!(object_type("x", VPI_INTEGER_VAR, 32), ObjectType::Integer);
        assert_eq!(object_type("x", VPI_REAL_VAR, 64), ObjectType::Real);
        assert_eq!(object_type("x", VPI_STRING_VAR, 0), ObjectType::String);
        assert_eq!(object_type("x", VPI_ENUM_VAR, 2), ObjectType::Enum);
        assert_eq!(object_type("x", VPI_MODULE, 0), ObjectType::Module);
        assert_eq!(object_type("x", VPI_GEN_SCOPE, 0), ObjectType::Module);
        assert_eq!(object_type("x", VPI_GEN_SCOPE_ARRAY, 0), ObjectType::GenArray);
        assert_eq!(object_type("x", VPI_REG_ARRAY, 4), ObjectType::Array);
        assert_eq!(object_type("x", VPI_PARAMETER, 32), ObjectType::Parameter);
        assert_eq!(object_type("x", VPI_UNDEFINED, 0), ObjectType::Unknown);
    }

    #[test]
    fn verilator_packed_structs() {
        assert_eq!(object_type("Icarus Verilog", VPI_STRUCT_VAR, 16), ObjectType::Structure);
        assert_eq!(object_type("Verilator", VPI_STRUCT_VAR, 16), ObjectType::LogicArray);
        assert_eq!(object_type("verilator", VPI_STRUCT_NET, 16), ObjectType::LogicArray);
    }

    #[test]
    fn processes_are_filtered() {
        assert!(is_filtered(VPI_ALWAYS));
        assert!(is_filtered(VPI_CONT_ASSIGN));
        assert!(!is_filtered(VPI_NET));
    }

    #[test]
    fn generate_names() {
        assert_eq!(split_generate_name("gen_blk[3]"), Some(("gen_blk", 3)));
        assert_eq!(split_generate_name("g[-1]"), Some(("g", -1)));
        assert_eq!(split_generate_name("gen_blk"), None);
        assert_eq!(split_generate_name("gen_blk[x]"), None);
    }

    #[test]
    fn error_levels() {
        assert_eq!(severity(VPI_NOTICE), DiagnosticSeverity::Info);
        assert_eq!(severity(VPI_ERROR), DiagnosticSeverity::Error);
        assert_eq!(severity(VPI_INTERNAL), DiagnosticSeverity::Critical);
        assert_eq!(severity(VPI_SYSTEM), DiagnosticSeverity::Critical);
    }
}
