//! Signal values and their conversion to and from interface formats.

use std::fmt;

use gpi_common::{Logic, LogicVec};

use crate::design::{DataType, Language, Storage};

/// The value held by a scalar signal.
#[derive(Clone, PartialEq, Debug)]
pub enum SimValue {
    /// A logic bit or vector.
    Logic(LogicVec),
    /// An integer.
    Int(i64),
    /// A floating-point value.
    Real(f64),
    /// A character string.
    Str(String),
    /// Position of an enumeration literal.
    Enum(u32),
}

/// A value format requested through an interface.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Format {
    /// Binary string, most significant bit first.
    BinStr,
    /// Integer.
    Int,
    /// Floating point.
    Real,
    /// Character string (literal name for enumerations).
    Str,
    /// Enumeration position.
    Enum,
}

impl Format {
    /// The format that represents every value of `ty` without loss.
    pub fn natural(ty: &DataType) -> Format {
        match ty {
            DataType::Integer => Format::Int,
            DataType::Real => Format::Real,
            DataType::Str => Format::Str,
            DataType::Enum { .. } => Format::Enum,
            _ => Format::BinStr,
        }
    }
}

/// A value as it crosses an interface, before it meets a signal type.
#[derive(Clone, PartialEq, Debug)]
pub enum Scalar {
    /// Binary string.
    BinStr(String),
    /// Integer.
    Int(i64),
    /// Floating point.
    Real(f64),
    /// Character string.
    Str(String),
    /// Enumeration position.
    Enum(u32),
}

/// Why a value could not be read or written.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ValueError {
    /// The type has no representation in the requested format.
    #[error("{format:?} format not supported for {ty}")]
    Unsupported {
        /// Requested format.
        format: Format,
        /// The signal's type, rendered.
        ty: String,
    },
    /// A binary string longer than the signal.
    #[error("{got} bits do not fit {width}")]
    TooWide {
        /// Signal width.
        width: u32,
        /// Bits supplied.
        got: usize,
    },
    /// A binary string with characters other than logic values.
    #[error("'{0}' is not a binary string")]
    Malformed(String),
    /// An integer read of a value with X or Z bits.
    #[error("value has unknown bits")]
    UnknownBits,
    /// An enumeration position or integer out of range.
    #[error("{0} is out of range")]
    OutOfRange(i64),
    /// A literal name the enumeration does not define.
    #[error("no literal '{0}'")]
    NoSuchLiteral(String),
}

impl SimValue {
    /// The value a signal starts with: Z for Verilog nets, X for other
    /// logic, zero or the leftmost literal otherwise.
    pub fn initial(ty: &DataType, language: Language, storage: Storage) -> Option<SimValue> {
        Some(match ty {
            DataType::Logic | DataType::LogicVector { .. } => {
                let width = ty.logic_width()?;
                let fill = match (language, storage) {
                    (Language::Verilog, Storage::Net | Storage::Port) => Logic::Z,
                    _ => Logic::X,
                };
                SimValue::Logic(LogicVec::filled(width, fill))
            }
            DataType::Integer => SimValue::Int(0),
            DataType::Real => SimValue::Real(0.0),
            DataType::Str => SimValue::Str(String::new()),
            DataType::Enum { .. } => SimValue::Enum(0),
            DataType::Array { .. } | DataType::Record { .. } => return None,
        })
    }

    /// Parses the textual form of a value of type `ty`: a binary string for
    /// logic, decimal for integers, a literal name for enumerations.
    pub fn parse(ty: &DataType, text: &str) -> Option<SimValue> {
        let text = text.trim();
        match ty {
            DataType::Logic | DataType::LogicVector { .. } => {
                let width = ty.logic_width()?;
                let bits = LogicVec::from_binary_str(text)?;
                if bits.width() > width {
                    return None;
                }
                let mut value = LogicVec::new(width);
                value.assign_resized(&bits);
                Some(SimValue::Logic(value))
            }
            DataType::Integer => text.parse().ok().map(SimValue::Int),
            DataType::Real => text.parse().ok().map(SimValue::Real),
            DataType::Str => Some(SimValue::Str(text.to_string())),
            DataType::Enum { literals, .. } => literal_position(literals, text).map(SimValue::Enum),
            DataType::Array { .. } | DataType::Record { .. } => None,
        }
    }

    /// Reads the value in `format`.
    pub fn read(&self, ty: &DataType, format: Format) -> Result<Scalar, ValueError> {
        let unsupported = || ValueError::Unsupported {
            format,
            ty: ty.to_string(),
        };
        match (self, format) {
            (SimValue::Logic(bits), Format::BinStr) => Ok(Scalar::BinStr(bits.to_string())),
            (SimValue::Logic(bits), Format::Int) => {
                let raw = bits.to_u64().ok_or(ValueError::UnknownBits)?;
                Ok(Scalar::Int(raw as i64))
            }
            (SimValue::Int(i), Format::Int) => Ok(Scalar::Int(*i)),
            (SimValue::Int(i), Format::BinStr) => Ok(Scalar::BinStr(LogicVec::from_i64(*i, 32).to_string())),
            (SimValue::Int(i), Format::Str) => Ok(Scalar::Str(i.to_string())),
            (SimValue::Real(r), Format::Real) => Ok(Scalar::Real(*r)),
            (SimValue::Str(s), Format::Str) => Ok(Scalar::Str(s.clone())),
            (SimValue::Enum(p), Format::Enum) => Ok(Scalar::Enum(*p)),
            (SimValue::Enum(p), Format::Int) => Ok(Scalar::Int(i64::from(*p))),
            (SimValue::Enum(p), Format::Str) => match ty {
                DataType::Enum { literals, .. } => literals
                    .get(*p as usize)
                    .map(|l| Scalar::Str(l.clone()))
                    .ok_or(ValueError::OutOfRange(i64::from(*p))),
                _ => Err(unsupported()),
            },
            _ => Err(unsupported()),
        }
    }

    /// Returns the value a write of `scalar` produces for a signal of type `ty`.
    pub fn write(ty: &DataType, scalar: &Scalar) -> Result<SimValue, ValueError> {
        let unsupported = || ValueError::Unsupported {
            format: scalar.format(),
            ty: ty.to_string(),
        };
        match (ty, scalar) {
            (DataType::Logic | DataType::LogicVector { .. }, Scalar::BinStr(s)) => {
                let width = ty.logic_width().unwrap_or(1);
                let bits = parse_bits(s)?;
                if bits.width() > width {
                    return Err(ValueError::TooWide {
                        width,
                        got: s.chars().count(),
                    });
                }
                let mut value = LogicVec::new(width);
                value.assign_resized(&bits);
                Ok(SimValue::Logic(value))
            }
            (DataType::Logic | DataType::LogicVector { .. }, Scalar::Int(i)) => {
                Ok(SimValue::Logic(LogicVec::from_i64(*i, ty.logic_width().unwrap_or(1))))
            }
            (DataType::Integer, Scalar::Int(i)) => Ok(SimValue::Int(*i)),
            (DataType::Integer, Scalar::BinStr(s)) => parse_bits(s)?
                .to_i64()
                .map(SimValue::Int)
                .ok_or(ValueError::UnknownBits),
            (DataType::Real, Scalar::Real(r)) => Ok(SimValue::Real(*r)),
            (DataType::Real, Scalar::Int(i)) => Ok(SimValue::Real(*i as f64)),
            (DataType::Str, Scalar::Str(s)) => Ok(SimValue::Str(s.clone())),
            (DataType::Enum { literals, .. }, Scalar::Str(s)) => literal_position(literals, s)
                .map(SimValue::Enum)
                .ok_or_else(|| ValueError::NoSuchLiteral(s.clone())),
            (DataType::Enum { literals, .. }, Scalar::Int(_) | Scalar::Enum(_)) => {
                let position = match scalar {
                    Scalar::Enum(p) => i64::from(*p),
                    Scalar::Int(i) => *i,
                    _ => return Err(unsupported()),
                };
                match u32::try_from(position) {
                    Ok(p) if (p as usize) < literals.len() => Ok(SimValue::Enum(p)),
                    _ => Err(ValueError::OutOfRange(position)),
                }
            }
            _ => Err(unsupported()),
        }
    }

    /// Renders the value the way a testbench prints it: enumerations by
    /// literal name.
    pub fn render(&self, ty: &DataType) -> String {
        match self.read(ty, Format::Str) {
            Ok(Scalar::Str(s)) if matches!(self, SimValue::Enum(_)) => s,
            _ => self.to_string(),
        }
    }

    /// Returns one bit of a logic value.
    pub(crate) fn bit(&self, offset: u32) -> Option<Logic> {
        match self {
            SimValue::Logic(bits) if offset < bits.width() => Some(bits.get(offset)),
            _ => None,
        }
    }
}

impl fmt::Display for SimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimValue::Logic(bits) => write!(f, "{bits}"),
            SimValue::Int(i) => write!(f, "{i}"),
            SimValue::Real(r) => write!(f, "{r}"),
            SimValue::Str(s) => f.write_str(s),
            SimValue::Enum(p) => write!(f, "#{p}"),
        }
    }
}

impl Scalar {
    /// The format this value is expressed in.
    pub fn format(&self) -> Format {
        match self {
            Scalar::BinStr(_) => Format::BinStr,
            Scalar::Int(_) => Format::Int,
            Scalar::Real(_) => Format::Real,
            Scalar::Str(_) => Format::Str,
            Scalar::Enum(_) => Format::Enum,
        }
    }
}

fn parse_bits(s: &str) -> Result<LogicVec, ValueError> {
    LogicVec::from_binary_str(s).ok_or_else(|| ValueError::Malformed(s.to_string()))
}

fn literal_position(literals: &[String], name: &str) -> Option<u32> {
    literals
        .iter()
        .position(|l| l.eq_ignore_ascii_case(name))
        .map(|p| p as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_state() -> DataType {
        DataType::Enum {
            name: "state_t".into(),
            literals: vec!["IDLE".into(), "BUSY".into(), "DONE".into()],
        }
    }

    #[test]
    fn logic_reads() {
        let ty = DataType::vector(3, 0);
        let v = SimValue::parse(&ty, "1010").unwrap();
        assert_eq!(v.read(&ty, Format::BinStr), Ok(Scalar::BinStr("1010".into())));
        assert_eq!(v.read(&ty, Format::Int), Ok(Scalar::Int(10)));
        let x = SimValue::parse(&ty, "10X0").unwrap();
        assert_eq!(x.read(&ty, Format::Int), Err(ValueError::UnknownBits));
        assert!(matches!(v.read(&ty, Format::Real), Err(ValueError::Unsupported { .. })));
    }

    #[test]
    fn short_binary_strings_zero_extend() {
        let ty = DataType::vector(7, 0);
        let v = SimValue::write(&ty, &Scalar::BinStr("11".into())).unwrap();
        assert_eq!(v.to_string(), "00000011");
        assert_eq!(
            SimValue::write(&DataType::Logic, &Scalar::BinStr("10".into())),
            Err(ValueError::TooWide { width: 1, got: 2 })
        );
    }

    #[test]
    fn integer_as_binary_is_32_bits() {
        let v = SimValue::Int(-1);
        let Ok(Scalar::BinStr(s)) = v.read(&DataType::Integer, Format::BinStr) else {
            panic!("expected a binary string");
        };
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c == '1'));
        assert_eq!(
            SimValue::write(&DataType::Integer, &Scalar::BinStr(s)),
            Ok(SimValue::Int(-1))
        );
    }

    #[test]
    fn enum_by_position_and_name() {
        let ty = make_state();
        assert_eq!(SimValue::write(&ty, &Scalar::Str("busy".into())), Ok(SimValue::Enum(1)));
        assert_eq!(SimValue::write(&ty, &Scalar::Int(2)), Ok(SimValue::Enum(2)));
        assert_eq!(SimValue::write(&ty, &Scalar::Int(3)), Err(ValueError::OutOfRange(3)));
        assert_eq!(SimValue::Enum(2).read(&ty, Format::Str), Ok(Scalar::Str("DONE".into())));
        assert_eq!(SimValue::Enum(1).render(&ty), "BUSY");
    }

    #[test]
    fn real_accepts_integers() {
        assert_eq!(SimValue::write(&DataType::Real, &Scalar::Int(3)), Ok(SimValue::Real(3.0)));
        assert!(SimValue::write(&DataType::Integer, &Scalar::Real(1.5)).is_err());
    }

    #[test]
    fn initial_values() {
        let net = SimValue::initial(&DataType::Logic, Language::Verilog, Storage::Net).unwrap();
        assert_eq!(net.to_string(), "Z");
        let sig = SimValue::initial(&DataType::vector(1, 0), Language::Vhdl, Storage::Net).unwrap();
        assert_eq!(sig.to_string(), "XX");
        assert!(SimValue::initial(&DataType::array(0, 1, DataType::Integer), Language::Verilog, Storage::Var).is_none());
    }
}
