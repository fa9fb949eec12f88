//! Numeric codes of the VHDL procedural interface, as defined by the
//! IEEE 1076 `vhpi_user.h` header.

#![allow(missing_docs)]

// Class kinds.
pub const VHPI_UNDEFINED: i32 = -1;
pub const VHPI_ARRAY_TYPE_DECL_K: i32 = 1009;
pub const VHPI_BLOCK_STMT_K: i32 = 1017;
pub const VHPI_COMP_INST_STMT_K: i32 = 1024;
pub const VHPI_COND_SIG_ASSIGN_STMT_K: i32 = 1025;
pub const VHPI_CONST_DECL_K: i32 = 1028;
pub const VHPI_ENUM_TYPE_DECL_K: i32 = 1041;
pub const VHPI_FLOAT_TYPE_DECL_K: i32 = 1047;
pub const VHPI_FOR_GENERATE_K: i32 = 1048;
pub const VHPI_GENERIC_DECL_K: i32 = 1053;
pub const VHPI_IF_GENERATE_K: i32 = 1056;
pub const VHPI_INDEXED_NAME_K: i32 = 1059;
pub const VHPI_INT_TYPE_DECL_K: i32 = 1062;
pub const VHPI_PHYS_TYPE_DECL_K: i32 = 1078;
pub const VHPI_PORT_DECL_K: i32 = 1079;
pub const VHPI_PROCESS_STMT_K: i32 = 1082;
pub const VHPI_RECORD_TYPE_DECL_K: i32 = 1087;
pub const VHPI_ROOT_INST_K: i32 = 1090;
pub const VHPI_SELECT_SIG_ASSIGN_STMT_K: i32 = 1091;
pub const VHPI_SELECTED_NAME_K: i32 = 1093;
pub const VHPI_SIG_DECL_K: i32 = 1094;
pub const VHPI_SIMPLE_SIG_ASSIGN_STMT_K: i32 = 1097;
pub const VHPI_SUBTYPE_DECL_K: i32 = 1101;
pub const VHPI_VAR_DECL_K: i32 = 1111;

// Integer properties.
pub const VHPI_IS_UP_P: i32 = 1040;
pub const VHPI_KIND_P: i32 = 1043;
pub const VHPI_LEFT_BOUND_P: i32 = 1044;
pub const VHPI_NUM_DIMENSIONS_P: i32 = 1050;
pub const VHPI_RIGHT_BOUND_P: i32 = 1063;
pub const VHPI_SIZE_P: i32 = 1066;
pub const VHPI_STATE_P: i32 = 1068;

// String properties.
pub const VHPI_FILE_NAME_P: i32 = 1304;
pub const VHPI_FULL_NAME_P: i32 = 1306;
pub const VHPI_KIND_STR_P: i32 = 1307;
pub const VHPI_NAME_P: i32 = 1313;
pub const VHPI_TOOL_VERSION_P: i32 = 1316;
pub const VHPI_UNIT_NAME_P: i32 = 1317;

// Physical properties.
pub const VHPI_RESOLUTION_LIMIT_P: i32 = 1507;

// One-to-one relationships.
pub const VHPI_BASE_TYPE: i32 = 1306;
pub const VHPI_DESIGN_UNIT: i32 = 1321;
pub const VHPI_ROOT_INST: i32 = 1361;
pub const VHPI_TOOL: i32 = 1371;
pub const VHPI_TYPE: i32 = 1372;
pub const VHPI_ELEM_TYPE: i32 = 1380;

// One-to-many relationships.
pub const VHPI_CONST_DECLS: i32 = 1515;
pub const VHPI_GENERIC_DECLS: i32 = 1530;
pub const VHPI_INDEXED_NAMES: i32 = 1532;
pub const VHPI_INTERNAL_REGIONS: i32 = 1533;
pub const VHPI_PORT_DECLS: i32 = 1539;
pub const VHPI_SELECTED_NAMES: i32 = 1542;
pub const VHPI_SIG_DECLS: i32 = 1546;
pub const VHPI_VAR_DECLS: i32 = 1556;

// Value formats.
pub const VHPI_BIN_STR_VAL: i32 = 1;
pub const VHPI_ENUM_VAL: i32 = 5;
pub const VHPI_INT_VAL: i32 = 6;
pub const VHPI_REAL_VAL: i32 = 8;
pub const VHPI_STR_VAL: i32 = 9;

// Put-value modes.
pub const VHPI_DEPOSIT: i32 = 0;
pub const VHPI_DEPOSIT_PROPAGATE: i32 = 1;
pub const VHPI_FORCE: i32 = 2;
pub const VHPI_FORCE_PROPAGATE: i32 = 3;
pub const VHPI_RELEASE: i32 = 4;

// Callback reasons.
pub const VHPI_CB_VALUE_CHANGE: i32 = 1001;
pub const VHPI_CB_AFTER_DELAY: i32 = 1010;
pub const VHPI_CB_NEXT_TIME_STEP: i32 = 1012;
pub const VHPI_CB_END_OF_PROCESSES: i32 = 1018;
pub const VHPI_CB_LAST_KNOWN_DELTA_CYCLE: i32 = 1020;
pub const VHPI_CB_START_OF_SIMULATION: i32 = 1034;
pub const VHPI_CB_END_OF_SIMULATION: i32 = 1035;

// Callback states.
pub const VHPI_ENABLE: i32 = 1;
pub const VHPI_DISABLE: i32 = 2;
pub const VHPI_MATURE: i32 = 3;

// vhpi_control commands.
pub const VHPI_STOP: i32 = 0;
pub const VHPI_FINISH: i32 = 1;

// Error severities reported by vhpi_check_error.
pub const VHPI_NOTE: i32 = 1;
pub const VHPI_WARNING: i32 = 2;
pub const VHPI_ERROR: i32 = 3;
pub const VHPI_SYSTEM: i32 = 4;
pub const VHPI_INTERNAL: i32 = 5;
pub const VHPI_FAILURE: i32 = 6;
