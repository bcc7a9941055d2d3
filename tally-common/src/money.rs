//! Monetary amounts in integer cents
//!
//! All cost arithmetic in Tally is done on whole cents so that proportional
//! splits can be made exact: a share is truncated to the cent and the last
//! share of a split is always the remainder.
//!
//! On the wire an amount is a JSON number of dollars. Input is accepted
//! leniently because generated text frequently carries amounts as strings
//! (`"$1,250.50"`, `"1.2M"`, `"(300)"`).

use crate::Error;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// Largest magnitude accepted from input, in dollars
const MAX_DOLLARS: f64 = 1.0e15;

/// Basis points in a whole (100%)
const BPS_WHOLE: i128 = 10_000;

/// Monetary amount stored as signed integer cents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Convert a dollar value, rounding to the nearest cent
    ///
    /// Returns `None` for non-finite values or magnitudes beyond what an
    /// estimate can plausibly carry.
    pub fn from_dollars(dollars: f64) -> Option<Self> {
        if !dollars.is_finite() || dollars.abs() > MAX_DOLLARS {
            return None;
        }
        Some(Self((dollars * 100.0).round() as i64))
    }

    /// Whole-dollar constructor, mostly for tests and defaults
    pub const fn dollars(dollars: i64) -> Self {
        Self(dollars * 100)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    /// Share of this amount in basis points, truncated toward zero to the cent
    pub fn share_bps(self, bps: u32) -> Self {
        Self(((self.0 as i128 * bps as i128) / BPS_WHOLE) as i64)
    }

    /// Even per-part share, truncated to the cent. Zero parts yields the whole amount.
    pub fn divide_evenly(self, parts: usize) -> Self {
        if parts == 0 {
            return self;
        }
        Self(self.0 / parts as i64)
    }

    /// Ratio of this amount to `whole`, or `None` when `whole` is not positive
    pub fn ratio_of(self, whole: Money) -> Option<f64> {
        if whole.is_positive() {
            Some(self.0 as f64 / whole.0 as f64)
        } else {
            None
        }
    }

    /// Parse a free-form amount string
    ///
    /// Accepts currency symbols, thousands separators, a trailing `USD`,
    /// `k`/`m` magnitude suffixes, and accounting-style parentheses for
    /// negatives.
    pub fn parse(text: &str) -> Option<Self> {
        let mut s = text.trim();
        let mut negative = false;

        if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
            negative = true;
            s = &s[1..s.len() - 1];
        }

        let mut cleaned: String = s
            .chars()
            .filter(|c| !matches!(c, '$' | ',' | '_') && !c.is_whitespace())
            .collect();

        if cleaned.len() >= 3 && cleaned[cleaned.len() - 3..].eq_ignore_ascii_case("usd") {
            cleaned.truncate(cleaned.len() - 3);
        }
        if let Some(rest) = cleaned.strip_prefix('-') {
            negative = !negative;
            cleaned = rest.to_string();
        }

        let multiplier = match cleaned.chars().last() {
            Some('k') | Some('K') => 1_000.0,
            Some('m') | Some('M') => 1_000_000.0,
            _ => 1.0,
        };
        if multiplier > 1.0 {
            cleaned.pop();
        }
        if cleaned.is_empty() {
            return None;
        }

        let value: f64 = cleaned.parse().ok()?;
        let signed = if negative { -value } else { value };
        Self::from_dollars(signed * multiplier)
    }
}

impl FromStr for Money {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Money::parse(s).ok_or_else(|| Error::InvalidInput(format!("unparseable amount: {:?}", s)))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        *self = *self - rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let dollars = (abs / 100).to_string();
        let cents = abs % 100;

        let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
        for (i, ch) in dollars.chars().enumerate() {
            if i > 0 && (dollars.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        write!(f, "{}${}.{:02}", sign, grouped, cents)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            serializer.serialize_i64(self.0 / 100)
        } else {
            serializer.serialize_f64(self.as_dollars())
        }
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or currency string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Money::from_dollars(v as f64).ok_or_else(|| E::custom(format!("amount out of range: {}", v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        Money::from_dollars(v as f64).ok_or_else(|| E::custom(format!("amount out of range: {}", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Money::from_dollars(v).ok_or_else(|| E::custom(format!("amount out of range: {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        if v.trim().is_empty() {
            return Ok(Money::ZERO);
        }
        v.parse::<Money>().map_err(E::custom)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::ZERO)
    }

    fn visit_none<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::ZERO)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Money, D::Error> {
        d.deserialize_any(MoneyVisitor)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_currency_strings() {
        assert_eq!(Money::parse("$1,250.50"), Some(Money::from_cents(125_050)));
        assert_eq!(Money::parse("  42 "), Some(Money::dollars(42)));
        assert_eq!(Money::parse("1.2M"), Some(Money::dollars(1_200_000)));
        assert_eq!(Money::parse("150k"), Some(Money::dollars(150_000)));
        assert_eq!(Money::parse("(300)"), Some(Money::dollars(-300)));
        assert_eq!(Money::parse("-$12.10"), Some(Money::from_cents(-1_210)));
        assert_eq!(Money::parse("5000 USD"), Some(Money::dollars(5_000)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(Money::parse(""), None);
        assert_eq!(Money::parse("$"), None);
        assert_eq!(Money::parse("TBD"), None);
        assert_eq!(Money::parse("NaN"), None);
        assert!(matches!("TBD".parse::<Money>(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_share_bps_truncates() {
        let amount = Money::from_cents(1_001);
        // 15% of $10.01 = $1.5015 → $1.50
        assert_eq!(amount.share_bps(1_500), Money::from_cents(150));
        assert_eq!(Money::dollars(100_000).share_bps(1_500), Money::dollars(15_000));
    }

    #[test]
    fn test_divide_evenly() {
        assert_eq!(Money::dollars(90).divide_evenly(3), Money::dollars(30));
        assert_eq!(Money::from_cents(100).divide_evenly(3), Money::from_cents(33));
        assert_eq!(Money::dollars(5).divide_evenly(0), Money::dollars(5));
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(123_456_789).to_string(), "$1,234,567.89");
        assert_eq!(Money::dollars(-5).to_string(), "-$5.00");
        assert_eq!(Money::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_serde_forms() {
        let parsed: Vec<Money> = serde_json::from_str(r#"[10, 10.5, "$1,000", null, ""]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                Money::dollars(10),
                Money::from_cents(1_050),
                Money::dollars(1_000),
                Money::ZERO,
                Money::ZERO,
            ]
        );

        let json = serde_json::to_string(&vec![Money::dollars(15_000), Money::from_cents(1_050)]).unwrap();
        assert_eq!(json, "[15000,10.5]");
    }

    #[test]
    fn test_ratio_of() {
        assert_eq!(Money::dollars(50).ratio_of(Money::dollars(200)), Some(0.25));
        assert_eq!(Money::dollars(50).ratio_of(Money::ZERO), None);
    }
}
