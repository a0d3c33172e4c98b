//! # Money Module
//!
//! Provides `Money` (integer paise) and `Quantity` (integer thousandths of a
//! unit) plus the one function that turns them into a bill line amount.
//!
//! ## Why Integers?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  2.3 kg × ₹45.10/kg in f64 = 103.72999999999999  ❌                     │
//! │                                                                         │
//! │  OUR SOLUTION: scaled integers                                         │
//! │    Quantity  2.3 kg   →  2300 (thousandths)                            │
//! │    Money     ₹45.10   →  4510 (paise)                                  │
//! │    amount = 2300 × 4510 / 1000 = 10373 paise = ₹103.73  ✅             │
//! │                                                                         │
//! │  The JSON wire format stays decimal (what the frontend sends and       │
//! │  renders); conversion happens exactly once, in serde.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mandi_core::money::{Money, Quantity};
//!
//! let rate = Money::from_paise(4_510);    // ₹45.10
//! let qty = Quantity::from_milli(2_300);  // 2.3
//! assert_eq!(rate.to_string(), "₹45.10");
//! assert_eq!(qty.to_string(), "2.3");
//! ```

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::Unit;

/// Paise per rupee.
pub const PAISE_PER_RUPEE: i64 = 100;

/// Thousandths per whole unit of quantity.
const MILLI_PER_UNIT: i64 = 1_000;

/// Grams per kilogram. Gram-unit lines carry a per-kilo rate.
const GRAMS_PER_KG: i64 = 1_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise.
///
/// ## Where Money is Used
/// ```text
/// Item.default_rate ─────┐
///                        ├──► resolve_price ──► BillLine.rate
/// Override.rate ─────────┘                          │
///                                                   ▼
///                         line_amount(qty, rate, unit) ──► BillLine.amount
///                                                   │
///                                                   ▼
///                          Bill.total_amount ──► Ledger / Summary totals
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    ///
    /// ```rust
    /// use mandi_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees(25).paise(), 2_500);
    /// ```
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * PAISE_PER_RUPEE)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Adds two values, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(paise) => Some(Money(paise)),
            None => None,
        }
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    fn as_decimal(&self) -> f64 {
        self.0 as f64 / PAISE_PER_RUPEE as f64
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(
            f,
            "{}₹{}.{:02}",
            sign,
            abs / PAISE_PER_RUPEE,
            abs % PAISE_PER_RUPEE
        )
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, factor: i64) -> Self {
        Money(self.0 * factor)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        DecimalRepr::deserialize(deserializer)?
            .scaled(PAISE_PER_RUPEE)
            .map(Money)
            .map_err(de::Error::custom)
    }
}

/// Deserializes a rate the way spreadsheet imports need it: numbers and
/// numeric strings parse, anything else (blank, null, junk) becomes zero.
///
/// ```rust
/// use mandi_core::money::Money;
///
/// #[derive(serde::Deserialize)]
/// struct Row {
///     #[serde(default, deserialize_with = "mandi_core::money::lenient_money")]
///     rate: Money,
/// }
///
/// let row: Row = serde_json::from_str(r#"{"rate": "abc"}"#).unwrap();
/// assert_eq!(row.rate, Money::zero());
/// ```
pub fn lenient_money<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    let decimal = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(decimal
        .and_then(|d| scale_decimal(d, PAISE_PER_RUPEE).ok())
        .map(Money)
        .unwrap_or_default())
}

// =============================================================================
// Quantity Type
// =============================================================================

/// A quantity in thousandths of its unit (3 decimal places).
///
/// Grams are whole numbers in practice; kilos, dozens and crates are often
/// fractional ("2.5 kg"), hence the fixed three-place scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity from thousandths.
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Creates a quantity from a whole number of units.
    #[inline]
    pub const fn from_whole(units: i64) -> Self {
        Quantity(units * MILLI_PER_UNIT)
    }

    /// Returns the quantity in thousandths.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    fn as_decimal(&self) -> f64 {
        self.0 as f64 / MILLI_PER_UNIT as f64
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / MILLI_PER_UNIT;
        let frac = abs % MILLI_PER_UNIT;
        if frac == 0 {
            write!(f, "{}{}", sign, whole)
        } else {
            let digits = format!("{:03}", frac);
            write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
        }
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Quantity> for Quantity {
    fn sum<I: Iterator<Item = &'a Quantity>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        DecimalRepr::deserialize(deserializer)?
            .scaled(MILLI_PER_UNIT)
            .map(Quantity)
            .map_err(de::Error::custom)
    }
}

// =============================================================================
// Line Amount
// =============================================================================

/// Computes a bill line amount.
///
/// ## Gram Lines
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  unit        qty      rate          amount                             │
/// │  ─────────   ──────   ───────────   ──────────────────────────         │
/// │  Kg          2.5      ₹40 / kg      2.5 × 40           = ₹100.00       │
/// │  Pcs         12       ₹5 / pc       12 × 5             = ₹60.00        │
/// │  Gm          500      ₹120 / kg     500 × 120 / 1000   = ₹60.00        │
/// │                                                                         │
/// │  Gram lines are typed in grams but priced per kilo.                    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// ## Implementation
/// `qty_milli × rate_paise / 1000` (and a further `/ 1000` for grams),
/// computed in i128 and rounded half away from zero to the nearest paisa.
///
/// Saturates at the `i64` bounds. Inputs that pass
/// [`validate_rate`](crate::validation::validate_rate) and
/// [`validate_quantity`](crate::validation::validate_quantity) never reach
/// them; use [`checked_line_amount`] where the inputs are unchecked.
pub fn line_amount(qty: Quantity, rate: Money, unit: &Unit) -> Money {
    let amount = exact_line_amount(qty, rate, unit);
    Money::from_paise(amount.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
}

/// [`line_amount`], or `None` when the amount does not fit in an `i64`.
pub fn checked_line_amount(qty: Quantity, rate: Money, unit: &Unit) -> Option<Money> {
    i64::try_from(exact_line_amount(qty, rate, unit))
        .ok()
        .map(Money::from_paise)
}

fn exact_line_amount(qty: Quantity, rate: Money, unit: &Unit) -> i128 {
    let mut divisor = MILLI_PER_UNIT as i128;
    if unit.is_gram() {
        divisor *= GRAMS_PER_KG as i128;
    }
    let product = qty.milli() as i128 * rate.paise() as i128;
    round_div(product, divisor)
}

fn round_div(numerator: i128, divisor: i128) -> i128 {
    let half = divisor / 2;
    if numerator >= 0 {
        (numerator + half) / divisor
    } else {
        (numerator - half) / divisor
    }
}

// =============================================================================
// Decimal Wire Format
// =============================================================================

/// What a decimal field may look like on the wire: a JSON number, or a
/// numeric string (spreadsheet exports and form inputs send both).
#[derive(Deserialize)]
#[serde(untagged)]
enum DecimalRepr {
    Number(f64),
    Text(String),
}

impl DecimalRepr {
    fn scaled(self, scale: i64) -> Result<i64, String> {
        let value = match self {
            DecimalRepr::Number(v) => v,
            DecimalRepr::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed
                        .parse::<f64>()
                        .map_err(|_| format!("'{}' is not a number", trimmed))?
                }
            }
        };
        scale_decimal(value, scale)
    }
}

fn scale_decimal(value: f64, scale: i64) -> Result<i64, String> {
    if !value.is_finite() {
        return Err(format!("{} is not a finite number", value));
    }
    let scaled = (value * scale as f64).round();
    if scaled.abs() >= i64::MAX as f64 {
        return Err(format!("{} is out of range", value));
    }
    Ok(scaled as i64)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_paise(1_099).to_string(), "₹10.99");
        assert_eq!(Money::from_paise(-550).to_string(), "-₹5.50");
        assert_eq!(Quantity::from_milli(2_500).to_string(), "2.5");
        assert_eq!(Quantity::from_milli(1_125).to_string(), "1.125");
        assert_eq!(Quantity::from_whole(500).to_string(), "500");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_rupees(10);
        let b = Money::from_paise(550);
        assert_eq!((a + b).paise(), 1_550);
        assert_eq!((a - b).paise(), 450);
        assert_eq!((b * 3).paise(), 1_650);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.paise(), 2_100);

        let qty: Quantity = [Quantity::from_milli(500), Quantity::from_whole(2)]
            .into_iter()
            .sum();
        assert_eq!(qty.milli(), 2_500);
    }

    #[test]
    fn test_line_amount_regular_units() {
        let amount = line_amount(Quantity::from_milli(2_300), Money::from_paise(4_510), &Unit::Kg);
        // 2.3 × 45.10 = 103.73
        assert_eq!(amount.paise(), 10_373);

        let amount = line_amount(Quantity::from_whole(12), Money::from_rupees(5), &Unit::Pcs);
        assert_eq!(amount, Money::from_rupees(60));
    }

    #[test]
    fn test_line_amount_gram_units_divide_by_thousand() {
        let rate = Money::from_rupees(120);
        let qty = Quantity::from_whole(500);

        for unit in ["gm", "Gms", "gram", "GRAMS"] {
            let unit: Unit = unit.parse().unwrap();
            assert_eq!(line_amount(qty, rate, &unit), Money::from_rupees(60));
        }
    }

    #[test]
    fn test_line_amount_rounds_half_away_from_zero() {
        // 0.333 × ₹0.15 = 0.04995 rupees = 4.995 paise → 5
        let amount = line_amount(Quantity::from_milli(333), Money::from_paise(15), &Unit::Kg);
        assert_eq!(amount.paise(), 5);

        // 0.001 × ₹4.99 = 0.499 paise → 0
        let amount = line_amount(Quantity::from_milli(1), Money::from_paise(499), &Unit::Kg);
        assert_eq!(amount.paise(), 0);
    }

    #[test]
    fn test_line_amount_out_of_i64_range() {
        // 1e9 kg at ₹1e11/kg is ₹1e20, beyond i64 paise
        let qty = Quantity::from_whole(1_000_000_000);
        let rate = Money::from_rupees(100_000_000_000);

        assert_eq!(checked_line_amount(qty, rate, &Unit::Kg), None);
        assert_eq!(line_amount(qty, rate, &Unit::Kg), Money::from_paise(i64::MAX));

        assert_eq!(
            checked_line_amount(Quantity::from_whole(12), Money::from_rupees(5), &Unit::Pcs),
            Some(Money::from_rupees(60))
        );
    }

    #[test]
    fn test_addition_saturates_instead_of_overflowing() {
        let big = Money::from_paise(i64::MAX - 10);
        assert_eq!(big.checked_add(Money::from_paise(11)), None);
        assert_eq!(big + Money::from_paise(11), Money::from_paise(i64::MAX));

        let mut total = big;
        total += big;
        assert_eq!(total.paise(), i64::MAX);

        let qty = Quantity::from_milli(i64::MAX) + Quantity::from_milli(1);
        assert_eq!(qty.milli(), i64::MAX);
    }

    #[test]
    fn test_decimal_wire_format() {
        let money: Money = serde_json::from_str("45.1").unwrap();
        assert_eq!(money.paise(), 4_510);

        let money: Money = serde_json::from_str("20").unwrap();
        assert_eq!(money, Money::from_rupees(20));

        let money: Money = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(money.paise(), 1_250);

        let money: Money = serde_json::from_str("\"\"").unwrap();
        assert!(money.is_zero());

        assert!(serde_json::from_str::<Money>("\"twelve\"").is_err());

        let qty: Quantity = serde_json::from_str("2.25").unwrap();
        assert_eq!(qty.milli(), 2_250);

        assert_eq!(serde_json::to_string(&Money::from_paise(4_510)).unwrap(), "45.1");
        assert_eq!(serde_json::to_string(&Quantity::from_whole(3)).unwrap(), "3.0");
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_paise(1).is_positive());
        assert!(Money::from_paise(-1).is_negative());
        assert!(Quantity::zero().is_zero());
        assert!(Quantity::from_milli(1).is_positive());
        assert!(Quantity::from_milli(-1).is_negative());
    }
}
