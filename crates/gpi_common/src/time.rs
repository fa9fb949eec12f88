//! Simulation time in engine ticks, plus the precision those ticks represent.
//!
//! Procedural interfaces report time as an integer count of the engine's
//! precision unit. [`TimePrecision`] carries that unit as a power-of-ten
//! exponent of one second (`-12` = 1 ps), and [`SimTime`] adds the delta
//! cycle index an engine uses to order events within one time step.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Exponent of one femtosecond.
const FS_EXPONENT: i8 = -15;

/// The smallest representable time step of an engine, as `10^exponent` seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimePrecision(i8);

impl TimePrecision {
    /// One femtosecond.
    pub const FS: Self = Self(-15);
    /// One picosecond.
    pub const PS: Self = Self(-12);
    /// One nanosecond.
    pub const NS: Self = Self(-9);

    /// Creates a precision from a power-of-ten exponent.
    ///
    /// Returns `None` outside `-15..=2` (1 fs to 100 s), the span both
    /// Verilog timescales and VHDL resolution limits can express.
    pub fn from_exponent(exponent: i32) -> Option<Self> {
        if (-15..=2).contains(&exponent) {
            Some(Self(exponent as i8))
        } else {
            None
        }
    }

    /// Creates a precision from a femtosecond count that is a power of ten.
    pub fn from_femtoseconds(fs: u64) -> Option<Self> {
        if fs == 0 {
            return None;
        }
        let mut exponent = FS_EXPONENT as i32;
        let mut rest = fs;
        while rest % 10 == 0 {
            rest /= 10;
            exponent += 1;
        }
        if rest != 1 {
            return None;
        }
        Self::from_exponent(exponent)
    }

    /// Returns the power-of-ten exponent.
    pub fn exponent(self) -> i32 {
        self.0 as i32
    }

    /// Returns the length of one tick in femtoseconds.
    pub fn as_femtoseconds(self) -> u64 {
        10u64.pow((self.0 - FS_EXPONENT) as u32)
    }
}

impl Default for TimePrecision {
    fn default() -> Self {
        Self::PS
    }
}

impl fmt::Display for TimePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = ["fs", "ps", "ns", "us", "ms", "s"];
        // Exponent relative to 1 fs, split into a unit and a 1/10/100 multiplier.
        let relative = (self.0 - FS_EXPONENT) as usize;
        let unit = (relative / 3).min(units.len() - 1);
        let multiplier = 10u64.pow((relative - unit * 3) as u32);
        write!(f, "{multiplier} {}", units[unit])
    }
}

/// A point in simulation time: an engine tick count plus a delta index.
///
/// Ordered first by tick, then by delta cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SimTime {
    /// Time in precision ticks.
    pub ticks: u64,
    /// Delta cycle index within the current time step.
    pub delta: u32,
}

impl SimTime {
    /// Time zero, delta zero.
    pub fn zero() -> Self {
        Self { ticks: 0, delta: 0 }
    }

    /// Creates a time at the given tick with delta 0.
    pub fn from_ticks(ticks: u64) -> Self {
        Self { ticks, delta: 0 }
    }

    /// Returns the next delta cycle at the same tick.
    pub fn next_delta(&self) -> Self {
        Self {
            ticks: self.ticks,
            delta: self.delta + 1,
        }
    }

    /// Advances to a new tick, resetting the delta counter.
    pub fn advance_to(&self, ticks: u64) -> Self {
        debug_assert!(
            ticks >= self.ticks,
            "cannot advance backwards: {} -> {}",
            self.ticks,
            ticks
        );
        Self { ticks, delta: 0 }
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ticks
            .cmp(&other.ticks)
            .then(self.delta.cmp(&other.delta))
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ticks)?;
        if self.delta > 0 {
            write!(f, "+d{}", self.delta)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_bounds() {
        assert_eq!(TimePrecision::from_exponent(-12), Some(TimePrecision::PS));
        assert!(TimePrecision::from_exponent(-16).is_none());
        assert!(TimePrecision::from_exponent(3).is_none());
    }

    #[test]
    fn precision_from_femtoseconds() {
        assert_eq!(TimePrecision::from_femtoseconds(1), Some(TimePrecision::FS));
        assert_eq!(
            TimePrecision::from_femtoseconds(1_000),
            Some(TimePrecision::PS)
        );
        assert_eq!(
            TimePrecision::from_femtoseconds(10_000_000).map(TimePrecision::exponent),
            Some(-8)
        );
        assert!(TimePrecision::from_femtoseconds(300).is_none());
        assert!(TimePrecision::from_femtoseconds(0).is_none());
    }

    #[test]
    fn precision_display() {
        assert_eq!(TimePrecision::FS.to_string(), "1 fs");
        assert_eq!(TimePrecision::PS.to_string(), "1 ps");
        assert_eq!(TimePrecision::from_exponent(-8).unwrap().to_string(), "10 ns");
        assert_eq!(TimePrecision::from_exponent(-1).unwrap().to_string(), "100 ms");
        assert_eq!(TimePrecision::from_exponent(0).unwrap().to_string(), "1 s");
    }

    #[test]
    fn precision_femtoseconds() {
        assert_eq!(TimePrecision::NS.as_femtoseconds(), 1_000_000);
    }

    #[test]
    fn ordering_by_tick_then_delta() {
        let a = SimTime::from_ticks(5);
        let b = a.next_delta();
        let c = SimTime::from_ticks(6);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(b.advance_to(6), c);
    }

    #[test]
    fn display_with_delta() {
        assert_eq!(SimTime::from_ticks(10).to_string(), "10");
        assert_eq!(SimTime::from_ticks(10).next_delta().to_string(), "10+d1");
    }

    #[test]
    fn serde_roundtrip() {
        let t = SimTime { ticks: 42, delta: 3 };
        let json = serde_json::to_string(&t).unwrap();
        let back: SimTime = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
