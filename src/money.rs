// Monetary amounts as exact decimal text.
// The upstream quotes prices as strings ("50000", "123.45"); they are kept as text
// and compared digit by digit so no floating-point rounding ever touches a fare.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Amount(String);

impl Amount {
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let trimmed = text.trim();
        if is_decimal_text(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ValidationError::InvalidAmount(text.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare by value, so "50000" and "50000.00" are the same amount.
    pub fn cmp_value(&self, other: &Amount) -> Ordering {
        let (a_neg, a_int, a_frac) = self.parts();
        let (b_neg, b_int, b_frac) = other.parts();

        let a_zero = a_int.is_empty() && a_frac.is_empty();
        let b_zero = b_int.is_empty() && b_frac.is_empty();
        let a_neg = a_neg && !a_zero;
        let b_neg = b_neg && !b_zero;

        match (a_neg, b_neg) {
            (false, true) => return Ordering::Greater,
            (true, false) => return Ordering::Less,
            _ => {}
        }

        let magnitude = a_int
            .len()
            .cmp(&b_int.len())
            .then_with(|| a_int.cmp(b_int))
            .then_with(|| cmp_fraction(a_frac, b_frac));

        if a_neg {
            magnitude.reverse()
        } else {
            magnitude
        }
    }

    pub fn same_value(&self, other: &Amount) -> bool {
        self.cmp_value(other) == Ordering::Equal
    }

    // (negative, integer digits without leading zeros, fraction digits without trailing zeros)
    fn parts(&self) -> (bool, &str, &str) {
        let (negative, unsigned) = match self.0.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, self.0.as_str()),
        };
        let (int, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        (
            negative,
            int.trim_start_matches('0'),
            frac.trim_end_matches('0'),
        )
    }
}

fn cmp_fraction(a: &str, b: &str) -> Ordering {
    let width = a.len().max(b.len());
    let a = a.bytes().chain(std::iter::repeat(b'0')).take(width);
    let b = b.bytes().chain(std::iter::repeat(b'0')).take(width);
    a.cmp(b)
}

fn is_decimal_text(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (int, frac) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (unsigned, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(int) && frac.map_or(true, digits)
}

impl FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal amount as a string or an integer")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Amount, E> {
        Amount::parse(value).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Amount, E> {
        Ok(Amount(value.to_string()))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Amount, E> {
        Ok(Amount(value.to_string()))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Amount, E> {
        Err(E::custom(format!(
            "refusing floating-point amount {value}; amounts must be decimal text"
        )))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("50000", "50000.00", Ordering::Equal ; "trailing zeros")]
    #[test_case("052000", "52000", Ordering::Equal ; "leading zeros")]
    #[test_case("52000", "50000", Ordering::Greater ; "fare went up")]
    #[test_case("99.9", "100", Ordering::Less ; "shorter integer part")]
    #[test_case("10.05", "10.5", Ordering::Less ; "fraction digits")]
    #[test_case("-1", "0", Ordering::Less ; "negative below zero")]
    #[test_case("-0.00", "0", Ordering::Equal ; "negative zero")]
    #[test_case("-2", "-10", Ordering::Greater ; "negative magnitudes")]
    fn test_cmp_value(a: &str, b: &str, expected: Ordering) {
        let a = Amount::parse(a).unwrap();
        let b = Amount::parse(b).unwrap();
        assert_eq!(a.cmp_value(&b), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("12." ; "dangling point")]
    #[test_case(".5" ; "missing integer part")]
    #[test_case("1,000" ; "thousands separator")]
    #[test_case("1e3" ; "exponent")]
    fn test_rejects_non_decimal_text(text: &str) {
        assert_eq!(
            Amount::parse(text),
            Err(ValidationError::InvalidAmount(text.to_string()))
        );
    }

    #[test]
    fn test_deserialize_string_and_integer() {
        let a: Amount = serde_json::from_str("\"123.45\"").unwrap();
        assert_eq!(a.as_str(), "123.45");
        let b: Amount = serde_json::from_str("50000").unwrap();
        assert_eq!(b.as_str(), "50000");
        assert_eq!(serde_json::to_string(&b).unwrap(), "\"50000\"");
    }

    #[test]
    fn test_deserialize_rejects_float() {
        let result: Result<Amount, _> = serde_json::from_str("123.45");
        assert!(result.is_err());
    }
}
