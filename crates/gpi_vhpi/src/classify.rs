//! VHPI class kinds and type names mapped onto the engine-neutral classification.

use gpi::{DiagnosticSeverity, EngineQuirk, ObjectType, ScalarKind};

use crate::consts::*;

/// Enumeration types whose values are single logic bits.
pub const LOGIC_ENUMS: &[&str] = &["STD_LOGIC", "STD_ULOGIC", "BIT"];

/// Per-product overrides, keyed by upper-case type name.
///
/// Mixed-language ModelSim and Questa present Verilog vectors to VHPI as
/// objects of type `vl_logic_vector`, which behave like a logic array.
pub const VHPI_QUIRKS: &[EngineQuirk<&str>] = &[
    EngineQuirk {
        product: "ModelSim",
        native: "VL_LOGIC_VECTOR",
        object_type: ObjectType::LogicArray,
    },
    EngineQuirk {
        product: "Questa",
        native: "VL_LOGIC_VECTOR",
        object_type: ObjectType::LogicArray,
    },
];

/// Design-unit instances and named regions.
pub fn is_scope(kind: i32) -> bool {
    matches!(
        kind,
        VHPI_ROOT_INST_K
            | VHPI_COMP_INST_STMT_K
            | VHPI_BLOCK_STMT_K
            | VHPI_FOR_GENERATE_K
            | VHPI_IF_GENERATE_K
    )
}

/// Declarations and names that carry a value.
pub fn is_value_object(kind: i32) -> bool {
    matches!(
        kind,
        VHPI_SIG_DECL_K
            | VHPI_PORT_DECL_K
            | VHPI_VAR_DECL_K
            | VHPI_CONST_DECL_K
            | VHPI_GENERIC_DECL_K
            | VHPI_INDEXED_NAME_K
            | VHPI_SELECTED_NAME_K
    )
}

/// Declarations fixed at elaboration.
pub fn is_const(kind: i32) -> bool {
    matches!(kind, VHPI_CONST_DECL_K | VHPI_GENERIC_DECL_K)
}

/// Processes and concurrent assignments, which never surface as children.
pub fn is_filtered(kind: i32) -> bool {
    matches!(
        kind,
        VHPI_PROCESS_STMT_K
            | VHPI_SIMPLE_SIG_ASSIGN_STMT_K
            | VHPI_COND_SIG_ASSIGN_STMT_K
            | VHPI_SELECT_SIG_ASSIGN_STMT_K
    )
}

/// The scalar kind of an enumeration type.
pub fn enum_scalar(type_name: &str) -> ScalarKind {
    let upper = type_name.to_ascii_uppercase();
    if LOGIC_ENUMS.contains(&upper.as_str()) {
        ScalarKind::Logic
    } else if upper == "CHARACTER" {
        ScalarKind::Char
    } else {
        ScalarKind::Enum
    }
}

/// Maps a `vhpi_check_error` severity to a diagnostic severity.
pub fn severity(level: i32) -> DiagnosticSeverity {
    match level {
        VHPI_NOTE => DiagnosticSeverity::Info,
        VHPI_WARNING => DiagnosticSeverity::Warning,
        VHPI_ERROR => DiagnosticSeverity::Error,
        _ => DiagnosticSeverity::Critical,
    }
}

/// Splits a generate iteration name such as `gen_blk(3)` into its label
/// and index.
pub fn split_generate_name(name: &str) -> Option<(&str, i64)> {
    let stripped = name.strip_suffix(')')?;
    let open = stripped.rfind('(')?;
    let index = stripped[open + 1..].trim().parse().ok()?;
    Some((&stripped[..open], index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logic_enums_are_case_insensitive() {
        assert_eq!(enum_scalar("std_logic"), ScalarKind::Logic);
        assert_eq!(enum_scalar("STD_ULOGIC"), ScalarKind::Logic);
        assert_eq!(enum_scalar("Bit"), ScalarKind::Logic);
        assert_eq!(enum_scalar("character"), ScalarKind::Char);
        assert_eq!(enum_scalar("BOOLEAN"), ScalarKind::Enum);
        assert_eq!(enum_scalar("state_t"), ScalarKind::Enum);
    }

    #[test]
    fn kinds() {
        assert!(is_scope(VHPI_ROOT_INST_K));
        assert!(is_scope(VHPI_FOR_GENERATE_K));
        assert!(is_value_object(VHPI_PORT_DECL_K));
        assert!(is_const(VHPI_GENERIC_DECL_K));
        assert!(!is_const(VHPI_SIG_DECL_K));
        assert!(is_filtered(VHPI_PROCESS_STMT_K));
        assert!(!is_filtered(VHPI_SIG_DECL_K));
    }

    #[test]
    fn questa_vl_logic_vector() {
        let found = gpi::classify::lookup_quirk(VHPI_QUIRKS, "Questa Sim-64", &"VL_LOGIC_VECTOR");
        assert_eq!(found, Some(ObjectType::LogicArray));
        assert_eq!(gpi::classify::lookup_quirk(VHPI_QUIRKS, "nvc", &"VL_LOGIC_VECTOR"), None);
    }

    #[test]
    fn generate_names() {
        assert_eq!(split_generate_name("gen_blk(2)"), Some(("gen_blk", 2)));
        assert_eq!(split_generate_name("gen_blk"), None);
        assert_eq!(split_generate_name("gen_blk[2]"), None);
    }

    #[test]
    fn failure_is_critical() {
        assert_eq!(severity(VHPI_FAILURE), DiagnosticSeverity::Critical);
        assert_eq!(severity(VHPI_WARNING), DiagnosticSeverity::Warning);
    }
}
