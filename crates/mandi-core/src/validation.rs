//! # Validation Module
//!
//! Input validation rules for Mandi Billing.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend                                                     │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: serde (decimal parsing, unit aliases)                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: THIS MODULE - business rules before any write                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite UNIQUE constraints (bill_no, sheet_no, keys)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::{Money, Quantity};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest name accepted for items and customers.
pub const MAX_NAME_LENGTH: usize = 120;

/// Highest rate accepted, in rupees (one crore).
pub const MAX_RATE_RUPEES: i64 = 10_000_000;

/// Highest quantity accepted, in whole units.
pub const MAX_QUANTITY_UNITS: i64 = 1_000_000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required name and returns it trimmed.
///
/// ```rust
/// use mandi_core::validation::validate_name;
///
/// assert_eq!(validate_name("name", "  Tomato ").unwrap(), "Tomato");
/// assert!(validate_name("name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, value: &str) -> ValidationResult<String> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(trimmed.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Rates must not be negative and must not exceed [`MAX_RATE_RUPEES`].
///
/// With both limits in place a line amount stays below 10^15 paise, so
/// bill totals fit in an `i64`.
pub fn validate_rate(field: &str, rate: Money) -> ValidationResult<()> {
    if rate.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    if rate > Money::from_rupees(MAX_RATE_RUPEES) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_RATE_RUPEES,
        });
    }
    Ok(())
}

/// Quantities must not be negative and must not exceed
/// [`MAX_QUANTITY_UNITS`]. Zero is allowed (an empty cell).
pub fn validate_quantity(field: &str, qty: Quantity) -> ValidationResult<()> {
    if qty.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    if qty > Quantity::from_whole(MAX_QUANTITY_UNITS) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_QUANTITY_UNITS,
        });
    }
    Ok(())
}

/// Bill and sheet numbers start at 1.
pub fn validate_sequence_number(field: &str, number: i64) -> ValidationResult<()> {
    if number < 1 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Calendar Validators
// =============================================================================

/// Validates a (month, year) pair and returns the month's date range as
/// `[first day, first day of next month)`.
///
/// ```rust
/// use chrono::NaiveDate;
/// use mandi_core::validation::month_range;
///
/// let (start, end) = month_range(12, 2024).unwrap();
/// assert_eq!(start, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
/// assert_eq!(end, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
/// ```
pub fn month_range(month: u32, year: i32) -> ValidationResult<(NaiveDate, NaiveDate)> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        });
    }

    let invalid_year = || ValidationError::InvalidFormat {
        field: "year".to_string(),
        reason: format!("{} is not a supported year", year),
    };

    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid_year)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid_year)?;

    Ok((start, end))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("name", "Omex").unwrap(), "Omex");
        assert!(matches!(
            validate_name("customer.name", ""),
            Err(ValidationError::Required { .. })
        ));
        let long = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(matches!(
            validate_name("name", &long),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_validate_numbers() {
        assert!(validate_rate("rate", Money::zero()).is_ok());
        assert!(validate_rate("rate", Money::from_paise(-1)).is_err());
        assert!(validate_quantity("qty", Quantity::zero()).is_ok());
        assert!(validate_quantity("qty", Quantity::from_milli(-5)).is_err());
        assert!(validate_rate("rate", Money::from_rupees(MAX_RATE_RUPEES)).is_ok());
        assert!(matches!(
            validate_rate("rate", Money::from_rupees(MAX_RATE_RUPEES) + Money::from_paise(1)),
            Err(ValidationError::OutOfRange { max: MAX_RATE_RUPEES, .. })
        ));
        assert!(validate_quantity("qty", Quantity::from_whole(MAX_QUANTITY_UNITS)).is_ok());
        assert!(matches!(
            validate_quantity("qty", Quantity::from_whole(1_000_000_000)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_sequence_number("billNo", 1).is_ok());
        assert!(validate_sequence_number("billNo", 0).is_err());
    }

    #[test]
    fn test_month_range() {
        let (start, end) = month_range(2, 2024).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        assert!(month_range(0, 2024).is_err());
        assert!(month_range(13, 2024).is_err());
    }
}
