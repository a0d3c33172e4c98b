//! # Bill Ledger Logic
//!
//! Turning drafts into finalized bills, and bills into monthly reports.
//!
//! ## Reports
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Bills for "Omex", March 2024 (date order)                             │
//! │                                                                         │
//! │  LedgerStatement                                                       │
//! │  ───────────────                                                       │
//! │  previous balance                            ₹1,000.00                 │
//! │  #12  03-02   ₹450.00   running ₹1,450.00                              │
//! │  #19  03-05   ₹300.00   running ₹1,750.00                              │
//! │  month total ₹750.00           grand total ₹1,750.00                   │
//! │                                                                         │
//! │  SummaryGrid  (one row per exact name + unit + rate)                   │
//! │  ───────────                                                           │
//! │  item     unit  rate    day 2   day 5   qty    amount                  │
//! │  Tomato   Kg    ₹20       5       -       5    ₹100.00                 │
//! │  Tomato   Kg    ₹25       -       4       4    ₹100.00  ← rate change  │
//! │  Ginger   Gm    ₹120    500       -     500     ₹60.00                 │
//! │  day amount             ₹160     ₹100          ₹260.00 grand total     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{line_amount, Money, Quantity, PAISE_PER_RUPEE};
use crate::types::{normalize_key, Bill, BillCustomer, BillDraft, BillLine, Unit};
use crate::validation::{
    month_range, validate_name, validate_quantity, validate_rate, validate_sequence_number,
};

// =============================================================================
// Finalization
// =============================================================================

/// Validates a bill draft and produces the bill that will be stored.
///
/// ## Rules
/// - customer name is required; address is optional
/// - lines with a blank name are dropped (unused rows of the bill form)
/// - at least one line must remain
/// - qty and rate must not be negative or above their limits
/// - every amount and the total are recomputed here
/// - a total that overflows is rejected
pub fn finalize_bill(
    draft: BillDraft,
    bill_no: i64,
    id: String,
    created_at: DateTime<Utc>,
) -> Result<Bill, ValidationError> {
    validate_sequence_number("billNo", bill_no)?;
    let customer_name = validate_name("customer.name", &draft.customer.name)?;

    let mut items = Vec::with_capacity(draft.items.len());
    for (i, line) in draft.items.into_iter().enumerate() {
        let name = line.name.trim();
        if name.is_empty() {
            continue;
        }
        validate_quantity(&format!("items[{}].qty", i), line.qty)?;
        validate_rate(&format!("items[{}].rate", i), line.rate)?;

        items.push(BillLine {
            name: name.to_string(),
            amount: line_amount(line.qty, line.rate, &line.unit),
            unit: line.unit,
            qty: line.qty,
            rate: line.rate,
        });
    }

    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    let total_amount = items
        .iter()
        .try_fold(Money::zero(), |total, line| total.checked_add(line.amount))
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "totalAmount".to_string(),
            min: 0,
            max: i64::MAX / PAISE_PER_RUPEE,
        })?;

    let bill = Bill {
        id,
        bill_no,
        date: draft.date,
        customer: BillCustomer {
            name: customer_name,
            address: draft.customer.address.trim().to_string(),
        },
        items,
        total_amount,
        created_at,
    };
    debug_assert!(is_consistent(&bill));
    Ok(bill)
}

/// Checks the stored-bill invariants: every amount follows the unit rule and
/// the total is the sum of amounts.
pub fn is_consistent(bill: &Bill) -> bool {
    let lines_ok = bill
        .items
        .iter()
        .all(|l| l.amount == line_amount(l.qty, l.rate, &l.unit));
    let total: Money = bill.items.iter().map(|l| l.amount).sum();
    lines_ok && total == bill.total_amount
}

// =============================================================================
// Ledger Statement
// =============================================================================

/// A bill in a ledger, with the balance after it.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    #[serde(flatten)]
    pub bill: Bill,

    #[ts(type = "number")]
    pub running_balance: Money,
}

/// One customer's bills for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStatement {
    pub customer: String,
    pub month: u32,
    pub year: i32,
    pub entries: Vec<LedgerEntry>,

    #[ts(type = "number")]
    pub month_total: Money,

    #[ts(type = "number")]
    pub previous_balance: Money,

    #[ts(type = "number")]
    pub grand_total: Money,
}

impl LedgerStatement {
    /// Builds a statement from the customer's bills.
    ///
    /// Bills belonging to another customer or falling outside the month are
    /// ignored; the rest are ordered by date, then bill number.
    pub fn build(
        customer: &str,
        month: u32,
        year: i32,
        bills: &[Bill],
        previous_balance: Money,
    ) -> Result<Self, ValidationError> {
        let (start, end) = month_range(month, year)?;
        let key = normalize_key(customer);

        let mut selected: Vec<&Bill> = bills
            .iter()
            .filter(|b| b.date >= start && b.date < end)
            .filter(|b| normalize_key(&b.customer.name) == key)
            .collect();
        selected.sort_by_key(|b| (b.date, b.bill_no));

        let mut balance = previous_balance;
        let entries: Vec<LedgerEntry> = selected
            .into_iter()
            .map(|bill| {
                balance += bill.total_amount;
                LedgerEntry {
                    bill: bill.clone(),
                    running_balance: balance,
                }
            })
            .collect();

        let month_total = entries.iter().map(|e| e.bill.total_amount).sum();

        Ok(LedgerStatement {
            customer: customer.trim().to_string(),
            month,
            year,
            entries,
            month_total,
            previous_balance,
            grand_total: previous_balance + month_total,
        })
    }
}

// =============================================================================
// Summary Grid
// =============================================================================

/// One (name, unit, rate) row of a monthly summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    pub name: String,

    #[ts(type = "string")]
    pub unit: Unit,

    #[ts(type = "number")]
    pub rate: Money,

    /// Day of month → quantity delivered that day.
    #[ts(type = "Record<number, number>")]
    pub quantities: BTreeMap<u32, Quantity>,

    #[ts(type = "number")]
    pub total_qty: Quantity,

    #[ts(type = "number")]
    pub amount: Money,
}

/// Item × day-of-month matrix for one customer and month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SummaryGrid {
    pub customer: String,
    pub month: u32,
    pub year: i32,
    pub days_in_month: u32,
    pub rows: Vec<SummaryRow>,

    /// Day of month → billed amount that day.
    #[ts(type = "Record<number, number>")]
    pub day_amounts: BTreeMap<u32, Money>,

    #[ts(type = "number")]
    pub grand_total: Money,
}

impl SummaryGrid {
    /// Groups the customer's bill lines for the month.
    ///
    /// Rows are keyed by the exact (name, unit, rate) triple, so a rate
    /// change mid-month shows up as a second row rather than being averaged
    /// away. Rows are ordered by name (case-insensitive), then rate.
    pub fn build(
        customer: &str,
        month: u32,
        year: i32,
        bills: &[Bill],
    ) -> Result<Self, ValidationError> {
        let (start, end) = month_range(month, year)?;
        let key = normalize_key(customer);

        let mut rows: HashMap<(String, String, i64), SummaryRow> = HashMap::new();
        let mut day_amounts: BTreeMap<u32, Money> = BTreeMap::new();

        let in_scope = bills
            .iter()
            .filter(|b| b.date >= start && b.date < end)
            .filter(|b| normalize_key(&b.customer.name) == key);

        for bill in in_scope {
            let day = bill.date.day();
            for line in &bill.items {
                let row = rows
                    .entry((
                        line.name.clone(),
                        line.unit.as_str().to_string(),
                        line.rate.paise(),
                    ))
                    .or_insert_with(|| SummaryRow {
                        name: line.name.clone(),
                        unit: line.unit.clone(),
                        rate: line.rate,
                        quantities: BTreeMap::new(),
                        total_qty: Quantity::zero(),
                        amount: Money::zero(),
                    });

                *row.quantities.entry(day).or_default() += line.qty;
                row.total_qty += line.qty;
                row.amount += line.amount;
                *day_amounts.entry(day).or_default() += line.amount;
            }
        }

        let mut rows: Vec<SummaryRow> = rows.into_values().collect();
        rows.sort_by(|a, b| {
            normalize_key(&a.name)
                .cmp(&normalize_key(&b.name))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.rate.cmp(&b.rate))
                .then_with(|| a.unit.as_str().cmp(b.unit.as_str()))
        });

        let grand_total = day_amounts.values().sum();

        Ok(SummaryGrid {
            customer: customer.trim().to_string(),
            month,
            year,
            days_in_month: days_between(start, end),
            rows,
            day_amounts,
            grand_total,
        })
    }
}

fn days_between(start: NaiveDate, end: NaiveDate) -> u32 {
    u32::try_from((end - start).num_days()).unwrap_or_default()
}

// =============================================================================
// Unit Tests
// =============================================================================
