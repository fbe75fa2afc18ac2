//! The CBOR integer representation: major type 0 (unsigned) and major type
//! 1 (negative, wire value `-1 - n`) both fit in a `u64` magnitude, so this
//! type stores the wire form directly rather than a host `i64`/`u64` that
//! can't represent the full `[-2^64, 2^64-1]` range (spec §3, §9).
use std::cmp::Ordering;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum Repr {
    /// Major type 0: value is exactly `n`.
    Pos(u64),
    /// Major type 1: value is `-1 - n`.
    Neg(u64),
}

/// A CBOR integer in `[-2^64, 2^64 - 1]`. Values outside `i64`/`u64` range
/// (either direction) still round-trip exactly; see [`CborInt::as_i64`] /
/// [`CborInt::as_u64`] for narrowing conversions.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct CborInt {
    repr: Repr,
}

impl CborInt {
    /// The wire major type (0 or 1) and magnitude `n` this integer encodes
    /// as: unsigned is `(0, n)` meaning value `n`; negative is `(1, n)`
    /// meaning value `-1 - n`.
    pub fn to_wire(self) -> (u8, u64) {
        match self.repr {
            Repr::Pos(n) => (0, n),
            Repr::Neg(n) => (1, n),
        }
    }

    /// Construct directly from a negative-integer wire magnitude (the `n`
    /// in `-1 - n`), as read from major type 1.
    pub fn from_neg_wire(n: u64) -> CborInt {
        CborInt { repr: Repr::Neg(n) }
    }

    /// Construct directly from an unsigned wire value, as read from major
    /// type 0.
    pub fn from_pos_wire(n: u64) -> CborInt {
        CborInt { repr: Repr::Pos(n) }
    }

    pub fn is_negative(self) -> bool {
        matches!(self.repr, Repr::Neg(_))
    }

    pub fn as_i64(self) -> Option<i64> {
        match self.repr {
            Repr::Pos(n) => i64::try_from(n).ok(),
            Repr::Neg(n) => {
                // value = -1 - n; avoid overflow by working in i128.
                let v = -1i128 - n as i128;
                i64::try_from(v).ok()
            }
        }
    }

    pub fn as_u64(self) -> Option<u64> {
        match self.repr {
            Repr::Pos(n) => Some(n),
            Repr::Neg(_) => None,
        }
    }

    pub fn as_i128(self) -> i128 {
        match self.repr {
            Repr::Pos(n) => n as i128,
            Repr::Neg(n) => -1i128 - n as i128,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self.repr {
            Repr::Pos(n) => n as f64,
            Repr::Neg(n) => -1.0 - (n as f64),
        }
    }
}

impl fmt::Debug for CborInt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for CborInt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.repr {
            Repr::Pos(n) => write!(f, "{}", n),
            Repr::Neg(n) => write!(f, "{}", -1i128 - n as i128),
        }
    }
}

impl Ord for CborInt {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_i128().cmp(&other.as_i128())
    }
}

impl PartialOrd for CborInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

macro_rules! impl_from_unsigned {
    ($t:ty) => {
        impl From<$t> for CborInt {
            fn from(n: $t) -> Self {
                CborInt::from_pos_wire(n as u64)
            }
        }
    };
}

macro_rules! impl_from_signed {
    ($t:ty) => {
        impl From<$t> for CborInt {
            fn from(n: $t) -> Self {
                if n < 0 {
                    CborInt::from_neg_wire((-1i128 - n as i128) as u64)
                } else {
                    CborInt::from_pos_wire(n as u64)
                }
            }
        }
    };
}

impl_from_unsigned!(u8);
impl_from_unsigned!(u16);
impl_from_unsigned!(u32);
impl_from_unsigned!(u64);
impl_from_unsigned!(usize);
impl_from_signed!(i8);
impl_from_signed!(i16);
impl_from_signed!(i32);
impl_from_signed!(i64);
impl_from_signed!(isize);

impl serde::Serialize for CborInt {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.repr {
            Repr::Pos(n) => serializer.serialize_u64(n),
            Repr::Neg(_) => match self.as_i64() {
                Some(v) => serializer.serialize_i64(v),
                None => serializer.serialize_str(&self.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_value() {
        assert_eq!(CborInt::from(0u64).to_string(), "0");
        assert_eq!(CborInt::from(-1i64).to_string(), "-1");
        assert_eq!(CborInt::from_neg_wire(u64::MAX).to_string(), (-1i128 - u64::MAX as i128).to_string());
    }

    #[test]
    fn round_trip_wire_form() {
        let big_neg = CborInt::from_neg_wire(u64::MAX);
        assert_eq!(big_neg.to_wire(), (1, u64::MAX));
        assert_eq!(big_neg.as_i64(), None);
        assert_eq!(big_neg.as_i128(), -18446744073709551616i128);
    }

    #[test]
    fn ordering() {
        assert!(CborInt::from(-1i64) < CborInt::from(0u64));
        assert!(CborInt::from_neg_wire(u64::MAX) < CborInt::from(-1i64));
    }
}
