//! Unsigned 18-decimal fixed-point numbers.
//!
//! Every price, ratio and fraction in the engine is a [`Fix`]. Products and
//! quotients are computed in 256-bit space so that `price * (1 + error)` does
//! not overflow for realistic prices, and then narrowed back to `u128`.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::U256;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of decimals carried by [`Fix`].
pub const FIX_DECIMALS: u8 = 18;

/// Raw value of `1.0`.
pub const FIX_SCALE: u128 = 1_000_000_000_000_000_000;

/// An unsigned fixed-point number with 18 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Fix(u128);

/// Errors produced when parsing a decimal string into a [`Fix`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFixError {
    #[error("empty fixed-point string")]
    Empty,

    #[error("invalid digit in {0:?}")]
    InvalidDigit(String),

    #[error("more than 18 fractional digits in {0:?}")]
    TooPrecise(String),

    #[error("value out of range: {0:?}")]
    Overflow(String),
}

impl Fix {
    pub const ZERO: Fix = Fix(0);
    pub const ONE: Fix = Fix(FIX_SCALE);
    pub const MAX: Fix = Fix(u128::MAX);

    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u128 {
        self.0
    }

    pub const fn from_int(n: u64) -> Self {
        Self(n as u128 * FIX_SCALE)
    }

    /// Normalize an integer quoted with `decimals` decimals to 18 decimals.
    ///
    /// Values with more than 18 decimals are truncated. Returns `None` when the
    /// scaled value does not fit.
    pub fn from_decimals(value: u128, decimals: u8) -> Option<Self> {
        if decimals <= FIX_DECIMALS {
            let factor = 10u128.checked_pow(u32::from(FIX_DECIMALS - decimals))?;
            value.checked_mul(factor).map(Self)
        } else {
            let factor = 10u128.checked_pow(u32::from(decimals - FIX_DECIMALS))?;
            Some(Self(value / factor))
        }
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Fix) -> Option<Fix> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Fix) -> Option<Fix> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    pub fn saturating_add(self, rhs: Fix) -> Fix {
        Self(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_sub(self, rhs: Fix) -> Fix {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// `self * rhs`, rounded down.
    pub fn checked_mul(self, rhs: Fix) -> Option<Fix> {
        mul_div(self.0, rhs.0, FIX_SCALE, false).map(Self)
    }

    /// `self * rhs`, rounded up.
    pub fn checked_mul_ceil(self, rhs: Fix) -> Option<Fix> {
        mul_div(self.0, rhs.0, FIX_SCALE, true).map(Self)
    }

    pub fn saturating_mul(self, rhs: Fix) -> Fix {
        self.checked_mul(rhs).unwrap_or(Fix::MAX)
    }

    /// `self / rhs`, rounded down. `None` on division by zero or overflow.
    pub fn checked_div(self, rhs: Fix) -> Option<Fix> {
        mul_div(self.0, FIX_SCALE, rhs.0, false).map(Self)
    }

    /// `self * numerator / denominator`, rounded down.
    pub fn scaled(self, numerator: u64, denominator: u64) -> Option<Fix> {
        mul_div(self.0, u128::from(numerator), u128::from(denominator), false).map(Self)
    }
}

fn mul_div(a: u128, b: u128, denominator: u128, round_up: bool) -> Option<u128> {
    if denominator == 0 {
        return None;
    }
    let product = U256::from(a) * U256::from(b);
    let denominator = U256::from(denominator);
    let mut quotient = product / denominator;
    if round_up && !(product % denominator).is_zero() {
        quotient += U256::from(1u8);
    }
    u128::try_from(quotient).ok()
}

impl fmt::Display for Fix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let int = self.0 / FIX_SCALE;
        let frac = self.0 % FIX_SCALE;
        if frac == 0 {
            return write!(f, "{}", int);
        }
        let digits = format!("{:018}", frac);
        write!(f, "{}.{}", int, digits.trim_end_matches('0'))
    }
}

impl FromStr for Fix {
    type Err = ParseFixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseFixError::Empty);
        }

        let (int_part, frac_part) = match s.split_once('.') {
            Some((int, frac)) => (int, frac),
            None => (s, ""),
        };

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty())
            || !all_digits(int_part)
            || !all_digits(frac_part)
        {
            return Err(ParseFixError::InvalidDigit(s.to_string()));
        }
        if frac_part.len() > usize::from(FIX_DECIMALS) {
            return Err(ParseFixError::TooPrecise(s.to_string()));
        }

        let overflow = || ParseFixError::Overflow(s.to_string());

        let int: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| overflow())?
        };
        let frac: u128 = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{:0<18}", frac_part);
            padded.parse().map_err(|_| overflow())?
        };

        int.checked_mul(FIX_SCALE)
            .and_then(|v| v.checked_add(frac))
            .map(Fix)
            .ok_or_else(overflow)
    }
}

impl Serialize for Fix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Fix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FixVisitor;

        impl Visitor<'_> for FixVisitor {
            type Value = Fix;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal string or an unsigned integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Fix, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Fix, E> {
                Ok(Fix::from_int(v))
            }
        }

        deserializer.deserialize_any(FixVisitor)
    }
}
