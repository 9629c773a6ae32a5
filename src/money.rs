//! Monetary values as integer cents.
//!
//! Amounts enter the engine from two directions: caller-typed rates on line
//! items and persisted records whose `amount` field is a formatted currency
//! string (`"$1,311,750.12"`). Both normalize into [`Money`], a signed cent
//! count, so arithmetic and aggregation are exact. Formatting back into the
//! display form happens only at the edge, and a canonical formatted string
//! always parses back to the identical cent value.

use std::fmt;
use std::iter::Sum;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A monetary amount in the smallest currency unit (cents).
///
/// Stored as `i64`, so the representable range is roughly ±92 quadrillion
/// dollars; arithmetic saturates instead of wrapping.
///
/// # Example
///
/// ```
/// use invoice_kit::Money;
///
/// let rate = Money::from_cents(5000);
/// let amount = rate.times(2);
/// assert_eq!(amount.to_string(), "$100.00");
/// assert_eq!(Money::parse("$100.00"), Some(amount));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// Zero dollars.
    pub const ZERO: Money = Money(0);

    /// Constructs an amount from a cent count.
    pub fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Constructs an amount from fractional dollars, rounding to the nearest cent.
    ///
    /// Non-finite input maps to zero.
    pub fn from_dollars(dollars: f64) -> Self {
        if dollars.is_finite() {
            Money((dollars * 100.0).round() as i64)
        } else {
            Money::ZERO
        }
    }

    /// The raw cent count.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Whether the amount is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Strict parse of a currency string.
    ///
    /// Tolerates a leading `$`, thousands separators, and surrounding
    /// whitespace; returns `None` when nothing numeric remains.
    ///
    /// ```
    /// use invoice_kit::Money;
    ///
    /// assert_eq!(Money::parse("$1,311,750.12"), Some(Money::from_cents(131_175_012)));
    /// assert_eq!(Money::parse("not a number"), None);
    /// ```
    pub fn parse(input: &str) -> Option<Self> {
        let cleaned: String = input
            .trim()
            .chars()
            .filter(|c| !matches!(c, '$' | ',' | ' '))
            .collect();
        if cleaned.is_empty() {
            return None;
        }
        let value: f64 = cleaned.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        Some(Money((value * 100.0).round() as i64))
    }

    /// Lossy parse: unparseable input counts as zero.
    ///
    /// This matches the engine's aggregation contract, which must tolerate
    /// malformed amounts on foreign records rather than fail a whole scan.
    pub fn parse_lossy(input: &str) -> Self {
        Self::parse(input).unwrap_or(Money::ZERO)
    }

    /// Saturating addition.
    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    /// The amount multiplied by a quantity, saturating on overflow.
    pub fn times(self, qty: u32) -> Money {
        Money(self.0.saturating_mul(i64::from(qty)))
    }
}

impl fmt::Display for Money {
    /// Formats as `$1,234.56` (or `-$1,234.56` for negative amounts).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.unsigned_abs();
        let dollars = total / 100;
        let cents = total % 100;

        let digits = dollars.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }

        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, grouped, cents)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Money::saturating_add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc.saturating_add(*m))
    }
}

// ============================================================================
// Serde: formatted string on the wire, tolerant on the way in
// ============================================================================

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

struct MoneyVisitor;

impl Visitor<'_> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a currency string or a number of dollars")
    }

    fn visit_str<E>(self, v: &str) -> std::result::Result<Money, E>
    where
        E: de::Error,
    {
        Ok(Money::parse_lossy(v))
    }

    fn visit_f64<E>(self, v: f64) -> std::result::Result<Money, E>
    where
        E: de::Error,
    {
        Ok(Money::from_dollars(v))
    }

    fn visit_i64<E>(self, v: i64) -> std::result::Result<Money, E>
    where
        E: de::Error,
    {
        Ok(Money(v.saturating_mul(100)))
    }

    fn visit_u64<E>(self, v: u64) -> std::result::Result<Money, E>
    where
        E: de::Error,
    {
        let dollars = i64::try_from(v).unwrap_or(i64::MAX);
        Ok(Money(dollars.saturating_mul(100)))
    }

    fn visit_unit<E>(self) -> std::result::Result<Money, E>
    where
        E: de::Error,
    {
        Ok(Money::ZERO)
    }

    fn visit_none<E>(self) -> std::result::Result<Money, E>
    where
        E: de::Error,
    {
        Ok(Money::ZERO)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Money, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(MoneyVisitor)
    }
}
