//! # Domain Types
//!
//! Records shared by every layer: catalog items, customer price overrides,
//! customers, bills and master sheets, plus the draft shapes clients submit.
//!
//! ## Entity Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Item (catalog)          CustomerPriceOverride         Customer       │
//! │   key: name               key: (customer, item)         key: name      │
//! │       │                          │                          ▲          │
//! │       └──────── consulted by ────┘                          │          │
//! │                     │                                       │          │
//! │                     ▼                          upserted on save         │
//! │   MasterSheet ──► projection ──► BillDraft ──► Bill ────────┘          │
//! │   (dated grid)                                 (immutable snapshot)    │
//! │                                                                         │
//! │   Keys are normalized (trim + lowercase); display casing is kept in   │
//! │   the `name` fields only.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::money::{Money, Quantity};

// =============================================================================
// Natural Keys
// =============================================================================

/// Normalizes a natural-key string (item name, customer name).
///
/// ```rust
/// use mandi_core::types::normalize_key;
///
/// assert_eq!(normalize_key("  Tomato "), "tomato");
/// assert_eq!(normalize_key("Carnatic Cafe"), "carnatic cafe");
/// ```
pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Returns true when the value is already in normalized key form.
pub fn is_normalized_key(value: &str) -> bool {
    normalize_key(value) == value
}

// =============================================================================
// Unit
// =============================================================================

/// Unit of sale.
///
/// Parsing never fails: common spellings map onto the known units and
/// anything else is kept verbatim so historical bills render as typed.
///
/// ```rust
/// use mandi_core::types::Unit;
///
/// assert_eq!("gms".parse::<Unit>().unwrap(), Unit::Gm);
/// assert_eq!("KGS".parse::<Unit>().unwrap(), Unit::Kg);
/// assert_eq!("".parse::<Unit>().unwrap(), Unit::Kg);
/// assert_eq!("Tray".parse::<Unit>().unwrap(), Unit::Other("Tray".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Unit {
    #[default]
    Kg,
    Gm,
    Pcs,
    Doz,
    Crate,
    Sack,
    Box,
    Ton,
    Bunch,
    Other(String),
}

impl Unit {
    /// Display form, as printed on bills.
    pub fn as_str(&self) -> &str {
        match self {
            Unit::Kg => "Kg",
            Unit::Gm => "Gm",
            Unit::Pcs => "Pcs",
            Unit::Doz => "Doz",
            Unit::Crate => "Crate",
            Unit::Sack => "Sack",
            Unit::Box => "Box",
            Unit::Ton => "Ton",
            Unit::Bunch => "Bunch",
            Unit::Other(other) => other,
        }
    }

    /// Gram lines are priced per kilo (see [`crate::money::line_amount`]).
    pub fn is_gram(&self) -> bool {
        matches!(self, Unit::Gm)
    }
}

impl FromStr for Unit {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unit = match trimmed.to_lowercase().as_str() {
            "" | "kg" | "kgs" | "kilo" | "kilos" | "kilogram" | "kilograms" => Unit::Kg,
            "gm" | "gms" | "gram" | "grams" | "g" => Unit::Gm,
            "pcs" | "pc" | "piece" | "pieces" | "nos" => Unit::Pcs,
            "doz" | "dozen" | "dozens" => Unit::Doz,
            "crate" | "crates" => Unit::Crate,
            "sack" | "sacks" => Unit::Sack,
            "box" | "boxes" => Unit::Box,
            "ton" | "tons" | "tonne" => Unit::Ton,
            "bunch" | "bunches" => Unit::Bunch,
            _ => Unit::Other(trimmed.to_string()),
        };
        Ok(unit)
    }
}

impl From<String> for Unit {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(unit) => unit,
            Err(never) => match never {},
        }
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.as_str().to_string()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A catalog entry: the global default price of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,

    /// Display name (casing as first entered).
    pub name: String,

    #[ts(type = "string")]
    pub unit: Unit,

    #[ts(type = "number")]
    pub default_rate: Money,

    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Natural key of this item.
    pub fn key(&self) -> String {
        normalize_key(&self.name)
    }
}

/// Input for `upsertItem`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    pub name: String,

    #[serde(default)]
    #[ts(type = "string")]
    pub unit: Unit,

    #[serde(default)]
    #[ts(type = "number")]
    pub default_rate: Money,
}

// =============================================================================
// Customer Price Overrides
// =============================================================================

/// A customer-specific price that replaces the catalog default.
///
/// `customer_name` and `item_name` are stored in normalized key form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPriceOverride {
    pub id: String,
    pub customer_name: String,
    pub item_name: String,

    #[ts(type = "string")]
    pub unit: Unit,

    #[ts(type = "number")]
    pub rate: Money,

    #[ts(type = "string")]
    pub last_updated: DateTime<Utc>,
}

/// Input for `upsertOverride`. Names are normalized on the way in.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OverrideInput {
    #[serde(alias = "customer")]
    pub customer_name: String,

    #[serde(alias = "item")]
    pub item_name: String,

    #[serde(default)]
    #[ts(type = "string")]
    pub unit: Unit,

    #[serde(default)]
    #[ts(type = "number")]
    pub rate: Money,
}

// =============================================================================
// Customers
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub address: String,
    pub gst: Option<String>,
    pub phone: Option<String>,

    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Input for `upsertCustomer`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    pub name: String,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub gst: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,
}

// =============================================================================
// Bills
// =============================================================================

/// Customer details as printed on a bill.
///
/// A snapshot, not a reference: editing the customer record later never
/// changes historical bills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillCustomer {
    pub name: String,

    #[serde(default)]
    pub address: String,
}

/// One priced line of a finalized bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillLine {
    pub name: String,

    #[ts(type = "string")]
    pub unit: Unit,

    #[ts(type = "number")]
    pub qty: Quantity,

    #[ts(type = "number")]
    pub rate: Money,

    #[ts(type = "number")]
    pub amount: Money,
}

/// A finalized, numbered bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,

    #[ts(type = "number")]
    pub bill_no: i64,

    #[ts(type = "string")]
    pub date: NaiveDate,

    pub customer: BillCustomer,

    pub items: Vec<BillLine>,

    #[ts(type = "number")]
    pub total_amount: Money,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// A bill line as submitted. Any client-side amount is ignored and
/// recomputed when the bill is finalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillLineDraft {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    #[ts(type = "string")]
    pub unit: Unit,

    #[serde(default)]
    #[ts(type = "number")]
    pub qty: Quantity,

    #[serde(default)]
    #[ts(type = "number")]
    pub rate: Money,
}

/// Input for `createBill`.
///
/// `bill_no` is normally the value returned by `nextBillNumber`; when it is
/// omitted the server allocates one.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BillDraft {
    #[serde(default)]
    #[ts(type = "number | null")]
    pub bill_no: Option<i64>,

    #[ts(type = "string")]
    pub date: NaiveDate,

    pub customer: BillCustomer,

    pub items: Vec<BillLineDraft>,
}

// =============================================================================
// Master Sheets
// =============================================================================

/// One item row of a saved master sheet, aligned with `header_columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow {
    pub item_name: String,

    #[ts(type = "Array<number>")]
    pub values: Vec<Quantity>,

    #[ts(type = "number")]
    pub total: Quantity,
}

/// A saved, numbered master sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MasterSheet {
    pub id: String,

    #[ts(type = "number")]
    pub sheet_no: i64,

    #[ts(type = "string")]
    pub date: NaiveDate,

    pub vehicle_no: String,

    pub header_columns: Vec<String>,

    pub data_rows: Vec<SheetRow>,

    #[ts(type = "number")]
    pub total_qty: Quantity,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// A sheet row as submitted; totals are recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SheetRowDraft {
    pub item_name: String,

    #[ts(type = "Array<number>")]
    pub values: Vec<Quantity>,
}

/// Input for `createSheet`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SheetDraft {
    #[serde(default)]
    #[ts(type = "number | null")]
    pub sheet_no: Option<i64>,

    #[ts(type = "string")]
    pub date: NaiveDate,

    #[serde(default)]
    pub vehicle_no: String,

    pub header_columns: Vec<String>,

    pub data_rows: Vec<SheetRowDraft>,
}

// =============================================================================
// Unit Tests
// =============================================================================
