//! IEEE 1164 four-state logic values as seen through a procedural interface.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single 4-state logic value.
///
/// Procedural interfaces exchange these as characters of a binary string
/// (`"10XZ"`), which is why the character conversions are the primary API.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum Logic {
    /// Logic low (0).
    Zero = 0,
    /// Logic high (1).
    One = 1,
    /// Unknown or uninitialized.
    X = 2,
    /// High-impedance (tri-state).
    Z = 3,
}

impl Logic {
    /// Converts a binary-string character to a [`Logic`] value.
    ///
    /// Accepts '0', '1', 'x'/'X', 'z'/'Z'. The VHDL `std_logic` weak and
    /// don't-care characters ('U', 'W', 'L', 'H', '-') are folded onto the
    /// nearest 4-state value, which is what a backend reports for them.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' | 'L' | 'l' => Some(Logic::Zero),
            '1' | 'H' | 'h' => Some(Logic::One),
            'x' | 'X' | 'u' | 'U' | 'w' | 'W' | '-' => Some(Logic::X),
            'z' | 'Z' => Some(Logic::Z),
            _ => None,
        }
    }

    /// Returns the canonical binary-string character for this value.
    pub fn to_char(self) -> char {
        match self {
            Logic::Zero => '0',
            Logic::One => '1',
            Logic::X => 'X',
            Logic::Z => 'Z',
        }
    }

    /// Returns `true` for `Zero` and `One`.
    pub fn is_known(self) -> bool {
        matches!(self, Logic::Zero | Logic::One)
    }

    /// Converts a boolean to `One` / `Zero`.
    pub fn from_bool(value: bool) -> Self {
        if value {
            Logic::One
        } else {
            Logic::Zero
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}
