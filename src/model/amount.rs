//! Amount type for handling monetary values as fixed-precision decimals.
//!
//! The expense service speaks in JSON numbers (and accepts decimal strings), so `Amount` decodes
//! either form without passing through binary floating point arithmetic. Rendering for display is
//! done with an `AmountStyle`, which adds a currency glyph and locale digit grouping.

use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// How the integer digits of an amount are grouped when rendered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// Lakh/crore grouping, e.g. `12,34,567`.
    #[default]
    Indian,
    /// Thousands grouping, e.g. `1,234,567`.
    Western,
}

serde_plain::derive_display_from_serialize!(Grouping);
serde_plain::derive_fromstr_from_deserialize!(Grouping);

/// Presentation settings for amounts.
///
/// # Examples
///  - `AmountStyle{ glyph: "₹", grouping: Indian }` -> `-₹1,00,000`
///  - `AmountStyle{ glyph: "$", grouping: Western }` -> `-$100,000`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AmountStyle {
    glyph: String,
    grouping: Grouping,
}

impl Default for AmountStyle {
    fn default() -> Self {
        Self::new(DEFAULT_GLYPH, Grouping::default())
    }
}

/// The currency glyph used when the configuration does not name one.
pub const DEFAULT_GLYPH: &str = "₹";

/// Glyphs that parsing accepts in front of an amount.
const CURRENCY_GLYPHS: &[&str] = &[DEFAULT_GLYPH, "$", "€", "£", "¥"];

impl AmountStyle {
    pub fn new(glyph: impl Into<String>, grouping: Grouping) -> Self {
        Self {
            glyph: glyph.into(),
            grouping,
        }
    }

    pub fn glyph(&self) -> &str {
        &self.glyph
    }

    pub fn grouping(&self) -> Grouping {
        self.grouping
    }
}

/// Represents a monetary amount.
///
/// Expense amounts are non-negative, but derived values such as a remaining balance can go below
/// zero, so `Amount` itself allows any sign. The value is passed through exactly as received.
///
/// ```
/// # use expense_sync::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("₹1,500.25").unwrap();
/// let b = Amount::from_str("1500.25").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(b.to_string(), "1500.25");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is below zero.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Renders the amount with a currency glyph and grouped integer digits, e.g. `-₹12,34,567.5`.
    /// The number of fractional digits is whatever the value carries; nothing is rounded.
    pub fn render(&self, style: &AmountStyle) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        let plain = self.0.abs().to_string();
        let (int_part, frac_part) = match plain.split_once('.') {
            Some((int_part, frac_part)) => (int_part, Some(frac_part)),
            None => (plain.as_str(), None),
        };
        let grouped = group_digits(int_part, style.grouping);
        match frac_part {
            Some(frac) => format!("{sign}{}{grouped}.{frac}", style.glyph),
            None => format!("{sign}{}{grouped}", style.glyph),
        }
    }
}

/// Inserts commas into a run of ASCII digits: the last three digits form one group and the rest
/// are grouped by three (Western) or by two (Indian).
fn group_digits(digits: &str, grouping: Grouping) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, last_three) = digits.split_at(digits.len() - 3);
    let size = match grouping {
        Grouping::Western => 3,
        Grouping::Indian => 2,
    };
    let mut parts = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(size);
        parts.push(&head[start..end]);
        end = start;
    }
    parts.reverse();
    parts.push(last_three);
    parts.join(",")
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError(rust_decimal::Error);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Parses a decimal that may carry a leading currency glyph and comma separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        let digits = CURRENCY_GLYPHS
            .iter()
            .find_map(|glyph| unsigned.strip_prefix(glyph))
            .unwrap_or(unsigned)
            .trim_start();
        let value = Decimal::from_str(&digits.replace(',', "")).map_err(AmountError)?;
        Ok(Amount(if negative { -value } else { value }))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // The service accepts decimal strings, which keeps the value exact on the wire.
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a number, a decimal string or null")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Ok(Amount(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        // `f64`'s Display is the shortest representation that round-trips, and never uses an
        // exponent, so 0.1 decodes as exactly 0.1.
        Decimal::from_str(&v.to_string())
            .map(Amount)
            .map_err(|_| E::custom(format!("amount {v} is out of range")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_str(v).map_err(E::custom)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Amount, E> {
        Ok(Amount::ZERO)
    }

    fn visit_none<E: de::Error>(self) -> Result<Amount, E> {
        Ok(Amount::ZERO)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount(Decimal::from(value))
    }
}

impl From<i32> for Amount {
    fn from(value: i32) -> Self {
        Amount(Decimal::from(value))
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl std::ops::Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}
