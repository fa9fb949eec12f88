//! Packed vectors of 4-state logic values, the common currency of signal values.

use crate::logic::Logic;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A vector of 4-state [`Logic`] values packed 32 per `u64` word.
///
/// Index 0 is the least significant bit. The [`Display`](fmt::Display)
/// form is the binary string a procedural interface returns for a
/// `BinStr` value request (most significant bit first).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicVec {
    width: u32,
    /// Packed storage: 2 bits per logic value, 32 values per u64.
    data: Vec<u64>,
}

/// Number of logic values packed per u64 word.
const VALUES_PER_WORD: u32 = 32;

impl LogicVec {
    /// Creates a new `LogicVec` of the given width, initialized to all `Zero`.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            data: vec![0; word_count(width)],
        }
    }

    /// Creates a `LogicVec` with every bit set to `value`.
    pub fn filled(width: u32, value: Logic) -> Self {
        let mut v = Self::new(width);
        for i in 0..width {
            v.set(i, value);
        }
        v
    }

    /// Returns the number of logic values in this vector.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Gets the logic value at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> Logic {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word_idx = (index / VALUES_PER_WORD) as usize;
        let bit_offset = (index % VALUES_PER_WORD) * 2;
        match (self.data[word_idx] >> bit_offset) & 0b11 {
            0 => Logic::Zero,
            1 => Logic::One,
            2 => Logic::X,
            _ => Logic::Z,
        }
    }

    /// Sets the logic value at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set(&mut self, index: u32, value: Logic) {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word_idx = (index / VALUES_PER_WORD) as usize;
        let bit_offset = (index % VALUES_PER_WORD) * 2;
        let mask = !(0b11u64 << bit_offset);
        self.data[word_idx] = (self.data[word_idx] & mask) | ((value as u64) << bit_offset);
    }

    /// Creates a `LogicVec` from the low `width` bits of a two's-complement value.
    pub fn from_i64(value: i64, width: u32) -> Self {
        let mut v = Self::new(width);
        for i in 0..width {
            // Bits above 63 replicate the sign.
            let bit = if i < 64 { (value >> i) & 1 } else { (value >> 63) & 1 };
            if bit != 0 {
                v.set(i, Logic::One);
            }
        }
        v
    }

    /// Converts to an unsigned integer, if every bit is 0 or 1 and the
    /// width fits in 64 bits.
    pub fn to_u64(&self) -> Option<u64> {
        if self.width > 64 {
            return None;
        }
        let mut result = 0u64;
        for i in 0..self.width {
            match self.get(i) {
                Logic::Zero => {}
                Logic::One => result |= 1 << i,
                Logic::X | Logic::Z => return None,
            }
        }
        Some(result)
    }

    /// Converts to a sign-extended integer (the MSB is the sign bit).
    pub fn to_i64(&self) -> Option<i64> {
        let raw = self.to_u64()?;
        if self.width == 0 || self.width >= 64 {
            return Some(raw as i64);
        }
        let shift = 64 - self.width;
        Some(((raw << shift) as i64) >> shift)
    }

    /// Returns `true` if no bit is X or Z.
    pub fn is_fully_known(&self) -> bool {
        (0..self.width).all(|i| self.get(i).is_known())
    }

    /// Parses a binary string like `"10XZ"`.
    ///
    /// The leftmost character is the most significant bit. Returns `None`
    /// if the string contains characters that are not logic values.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let width = s.chars().count() as u32;
        let mut v = Self::new(width);
        for (i, c) in s.chars().rev().enumerate() {
            v.set(i as u32, Logic::from_char(c)?);
        }
        Some(v)
    }

    /// Overwrites this vector with `other`, zero-extending or truncating
    /// at the MSB end so the width is preserved.
    pub fn assign_resized(&mut self, other: &LogicVec) {
        for i in 0..self.width {
            let bit = if i < other.width {
                other.get(i)
            } else {
                Logic::Zero
            };
            self.set(i, bit);
        }
    }
}

impl fmt::Display for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            write!(f, "{}", self.get(i))?;
        }
        Ok(())
    }
}

impl fmt::Debug for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogicVec({self})")
    }
}

/// Returns the number of u64 words needed to store `width` logic values.
fn word_count(width: u32) -> usize {
    width.div_ceil(VALUES_PER_WORD) as usize
}
