use std::{
    fmt::{self, Display},
    iter::Sum,
    ops::Add,
    str::FromStr,
};

use serde::{
    de::{self, Visitor},
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// Number of minor units in one major unit. Order totals carry exactly two decimal places.
const MINOR_UNITS: i64 = 100;
const MINOR_DIGITS: u8 = 2;

//--------------------------------------     FiatAmount       ---------------------------------------------------------
/// An exact fiat quantity, stored as an integer count of hundredths (cents, or KRW "jeon").
///
/// Amounts are never represented as floating point values. Parsing accepts at most two significant fractional
/// digits, so `"100.00"`, `"100"` and `100.5` are all valid, while `"0.001"` is rejected rather than rounded.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[sqlx(transparent)]
pub struct FiatAmount(i64);

op!(binary FiatAmount, Add, add);
op!(binary FiatAmount, Sub, sub);
op!(inplace FiatAmount, AddAssign, add_assign);

impl Sum for FiatAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FiatAmountError {
    #[error("'{0}' is not a valid amount")]
    InvalidFormat(String),
    #[error("'{0}' has more than two decimal places")]
    TooPrecise(String),
    #[error("Amount {0} is out of range")]
    OutOfRange(String),
    #[error("Negative amounts cannot be converted into token units: {0}")]
    Negative(FiatAmount),
    #[error("{amount} cannot be expressed exactly with {decimals} token decimals")]
    InexactConversion { amount: FiatAmount, decimals: u8 },
}

impl FiatAmount {
    /// Creates an amount from a count of hundredths, e.g. `FiatAmount::from_minor_units(10_050)` is `100.50`.
    pub fn from_minor_units(hundredths: i64) -> Self {
        Self(hundredths)
    }

    /// Creates an amount from whole units, e.g. `FiatAmount::from_major_units(50)` is `50.00`.
    pub fn from_major_units(units: i64) -> Result<Self, FiatAmountError> {
        units.checked_mul(MINOR_UNITS).map(Self).ok_or_else(|| FiatAmountError::OutOfRange(units.to_string()))
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Scales the amount into the integer base units of a token with `decimals` decimal places.
    ///
    /// `token_units = amount × 10^decimals`, computed in integer arithmetic only. A 100.00 amount on an 18-decimal
    /// token is exactly `100 × 10^18`.
    pub fn to_token_units(&self, decimals: u8) -> Result<u128, FiatAmountError> {
        if self.0 < 0 {
            return Err(FiatAmountError::Negative(*self));
        }
        let hundredths = self.0 as u128;
        let overflow = || FiatAmountError::OutOfRange(format!("{self} × 10^{decimals}"));
        if decimals >= MINOR_DIGITS {
            let scale = 10u128.checked_pow(u32::from(decimals - MINOR_DIGITS)).ok_or_else(overflow)?;
            hundredths.checked_mul(scale).ok_or_else(overflow)
        } else {
            let divisor = 10u128.pow(u32::from(MINOR_DIGITS - decimals));
            if hundredths % divisor == 0 {
                Ok(hundredths / divisor)
            } else {
                Err(FiatAmountError::InexactConversion { amount: *self, decimals })
            }
        }
    }
}

impl FromStr for FiatAmount {
    type Err = FiatAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || FiatAmountError::InvalidFormat(s.to_string());
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        // Trailing zeros beyond the second decimal place carry no value
        let significant = frac.trim_end_matches('0');
        if significant.len() > usize::from(MINOR_DIGITS) {
            return Err(FiatAmountError::TooPrecise(s.to_string()));
        }
        let whole = if whole.is_empty() { 0 } else { whole.parse::<i64>().map_err(|_| invalid())? };
        let cents = match significant {
            "" => 0,
            s => format!("{s:0<2}").parse::<i64>().map_err(|_| invalid())?,
        };
        let value = whole
            .checked_mul(MINOR_UNITS)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(|| FiatAmountError::OutOfRange(s.to_string()))?;
        Ok(Self(if negative { -value } else { value }))
    }
}

impl From<i64> for FiatAmount {
    fn from(hundredths: i64) -> Self {
        Self(hundredths)
    }
}

impl Display for FiatAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = MINOR_UNITS as u64;
        write!(f, "{sign}{}.{:02}", abs / units, abs % units)
    }
}

impl Serialize for FiatAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FiatAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FiatAmountVisitor)
    }
}

struct FiatAmountVisitor;

impl<'de> Visitor<'de> for FiatAmountVisitor {
    type Value = FiatAmount;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal amount with at most two decimal places, as a string or a number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        FiatAmount::from_major_units(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        let v = i64::try_from(v).map_err(|_| E::custom(FiatAmountError::OutOfRange(v.to_string())))?;
        FiatAmount::from_major_units(v).map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if !v.is_finite() {
            return Err(E::custom(FiatAmountError::InvalidFormat(v.to_string())));
        }
        // The shortest round-trip representation of the float is what the sender wrote, e.g. 100.5 -> "100.5"
        v.to_string().parse().map_err(E::custom)
    }
}
