//! Numeric codes of the Verilog procedural interface, as defined by
//! IEEE 1364 `vpi_user.h` and IEEE 1800 `sv_vpi_user.h`.

#![allow(missing_docs)]

// Object types.
pub const VPI_ALWAYS: i32 = 1;
pub const VPI_CONT_ASSIGN: i32 = 8;
pub const VPI_INITIAL: i32 = 24;
pub const VPI_INTEGER_VAR: i32 = 25;
pub const VPI_MODULE: i32 = 32;
pub const VPI_NET: i32 = 36;
pub const VPI_NET_BIT: i32 = 37;
pub const VPI_PARAMETER: i32 = 41;
pub const VPI_REAL_VAR: i32 = 47;
pub const VPI_REG: i32 = 48;
pub const VPI_REG_BIT: i32 = 49;
pub const VPI_NET_ARRAY: i32 = 114;
pub const VPI_REG_ARRAY: i32 = 116;
pub const VPI_GEN_SCOPE_ARRAY: i32 = 133;
pub const VPI_GEN_SCOPE: i32 = 134;
pub const VPI_STRING_VAR: i32 = 616;
pub const VPI_ENUM_VAR: i32 = 617;
pub const VPI_STRUCT_VAR: i32 = 618;
pub const VPI_ENUM_NET: i32 = 680;
pub const VPI_STRUCT_NET: i32 = 683;

// One-to-many relationships.
pub const VPI_DRIVER: i32 = 91;
pub const VPI_INTERNAL_SCOPE: i32 = 92;
pub const VPI_LOAD: i32 = 93;
pub const VPI_VARIABLES: i32 = 100;
pub const VPI_MEMBER: i32 = 742;

// Properties.
pub const VPI_UNDEFINED: i32 = -1;
pub const VPI_TYPE: i32 = 1;
pub const VPI_NAME: i32 = 2;
pub const VPI_FULL_NAME: i32 = 3;
pub const VPI_SIZE: i32 = 4;
pub const VPI_DEF_NAME: i32 = 9;
pub const VPI_TIME_PRECISION: i32 = 12;
pub const VPI_DEF_FILE: i32 = 15;

// Value formats.
pub const VPI_BIN_STR_VAL: i32 = 1;
pub const VPI_INT_VAL: i32 = 6;
pub const VPI_REAL_VAL: i32 = 7;
pub const VPI_STRING_VAL: i32 = 8;
pub const VPI_SUPPRESS_VAL: i32 = 13;

// put_value flags.
pub const VPI_NO_DELAY: i32 = 1;
pub const VPI_INERTIAL_DELAY: i32 = 2;
pub const VPI_FORCE_FLAG: i32 = 5;
pub const VPI_RELEASE_FLAG: i32 = 6;

// Callback reasons.
pub const CB_VALUE_CHANGE: i32 = 1;
pub const CB_READ_WRITE_SYNCH: i32 = 6;
pub const CB_READ_ONLY_SYNCH: i32 = 7;
pub const CB_NEXT_SIM_TIME: i32 = 8;
pub const CB_AFTER_DELAY: i32 = 9;
pub const CB_START_OF_SIMULATION: i32 = 11;
pub const CB_END_OF_SIMULATION: i32 = 12;

// vpi_control operations.
pub const VPI_STOP: i32 = 66;
pub const VPI_FINISH: i32 = 67;

// Error levels reported by vpi_chk_error.
pub const VPI_NOTICE: i32 = 1;
pub const VPI_WARNING: i32 = 2;
pub const VPI_ERROR: i32 = 3;
pub const VPI_SYSTEM: i32 = 4;
pub const VPI_INTERNAL: i32 = 5;
