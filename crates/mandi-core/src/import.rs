//! # Override Import
//!
//! Bulk loading of customer price overrides from spreadsheet rows, and the
//! one-off cleanup that folds case variants ("Omex"/"omex ") into a single
//! normalized record.
//!
//! ## Bulk Flow
//! ```text
//! rows received (N)
//!      │
//!      ├── blank customer or item ─────────────► skipped
//!      │
//!      ▼
//! coalesce by normalized (customer, item), last row wins
//!      │
//!      ├── superseded inside the batch ───────► skipped
//!      │
//!      ▼
//! INSERT ... ON CONFLICT DO NOTHING
//!      │
//!      ├── key already stored ────────────────► skipped
//!      │
//!      ▼
//!    added                    skipped = N − added
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, HashSet};
use ts_rs::TS;

use crate::money::{lenient_money, Money};
use crate::types::{is_normalized_key, normalize_key, CustomerPriceOverride, Unit};

// =============================================================================
// Bulk Rows
// =============================================================================

/// One spreadsheet row of a bulk override upload.
///
/// Every field is forgiving: cells exported from spreadsheets arrive as
/// numbers, strings or nulls, and a bad cell must never fail the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BulkOverrideRow {
    #[serde(default, alias = "customer", deserialize_with = "lenient_text")]
    pub customer_name: String,

    #[serde(default, alias = "item", deserialize_with = "lenient_text")]
    pub item_name: String,

    #[serde(default, deserialize_with = "lenient_text")]
    pub unit: String,

    #[serde(default, deserialize_with = "lenient_money")]
    #[ts(type = "number")]
    pub rate: Money,
}

/// A normalized, de-duplicated override ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideUpsert {
    pub customer_key: String,
    pub item_key: String,
    pub unit: Unit,
    pub rate: Money,
}

/// Result of [`coalesce_batch`].
#[derive(Debug, Clone, PartialEq)]
pub struct CoalescedBatch {
    /// One entry per key, in order of first appearance.
    pub entries: Vec<OverrideUpsert>,

    /// Rows in the original upload, before any filtering.
    pub received: usize,
}

/// Normalizes a batch and keeps the last row for each (customer, item) key.
///
/// Rows with a blank customer or item are dropped. A row that repeats an
/// earlier key replaces that entry's unit and rate but keeps its position.
pub fn coalesce_batch(rows: Vec<BulkOverrideRow>) -> CoalescedBatch {
    let received = rows.len();
    let mut positions: HashMap<(String, String), usize> = HashMap::new();
    let mut entries: Vec<OverrideUpsert> = Vec::new();

    for row in rows {
        let customer_key = normalize_key(&row.customer_name);
        let item_key = normalize_key(&row.item_name);
        if customer_key.is_empty() || item_key.is_empty() {
            continue;
        }

        let upsert = OverrideUpsert {
            customer_key: customer_key.clone(),
            item_key: item_key.clone(),
            unit: Unit::from(row.unit),
            rate: row.rate,
        };

        match positions.get(&(customer_key.clone(), item_key.clone())) {
            Some(&index) => entries[index] = upsert,
            None => {
                positions.insert((customer_key, item_key), entries.len());
                entries.push(upsert);
            }
        }
    }

    CoalescedBatch { entries, received }
}

/// Outcome of a bulk upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ImportReport {
    pub added: usize,
    pub skipped: usize,
}

impl ImportReport {
    pub fn from_counts(received: usize, added: usize) -> Self {
        ImportReport {
            added,
            skipped: received.saturating_sub(added),
        }
    }
}

/// Accepts a string, number or bool cell as text; anything else is empty.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

// =============================================================================
// Case-Variant Merge
// =============================================================================

/// What to do with one stored override during the case-variant cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeAction {
    /// A normalized twin exists; drop this variant.
    Delete { id: String },

    /// No twin; rewrite the keys into normalized form.
    Normalize {
        id: String,
        customer_key: String,
        item_key: String,
    },
}

/// Plans the cleanup in a single pass over every stored override.
///
/// Records already in normalized form are left alone. For the rest, the
/// first variant of a key is normalized in place and every later variant
/// (or any variant whose normalized twin is already stored) is deleted.
pub fn plan_case_merge(overrides: &[CustomerPriceOverride]) -> Vec<MergeAction> {
    let mut claimed: HashSet<(String, String)> = overrides
        .iter()
        .filter(|o| is_normalized_key(&o.customer_name) && is_normalized_key(&o.item_name))
        .map(|o| (o.customer_name.clone(), o.item_name.clone()))
        .collect();

    overrides
        .iter()
        .filter(|o| !(is_normalized_key(&o.customer_name) && is_normalized_key(&o.item_name)))
        .map(|o| {
            let key = (normalize_key(&o.customer_name), normalize_key(&o.item_name));
            if claimed.contains(&key) {
                MergeAction::Delete { id: o.id.clone() }
            } else {
                claimed.insert(key.clone());
                MergeAction::Normalize {
                    id: o.id.clone(),
                    customer_key: key.0,
                    item_key: key.1,
                }
            }
        })
        .collect()
}

/// Outcome of the case-variant cleanup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MergeReport {
    pub merged: usize,
    pub deleted: usize,
}

impl MergeReport {
    pub fn from_plan(plan: &[MergeAction]) -> Self {
        plan.iter().fold(MergeReport::default(), |mut report, action| {
            match action {
                MergeAction::Delete { .. } => report.deleted += 1,
                MergeAction::Normalize { .. } => report.merged += 1,
            }
            report
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(customer: &str, item: &str, rupees: i64) -> BulkOverrideRow {
        BulkOverrideRow {
            customer_name: customer.to_string(),
            item_name: item.to_string(),
            unit: String::new(),
            rate: Money::from_rupees(rupees),
        }
    }

    fn stored(id: &str, customer: &str, item: &str) -> CustomerPriceOverride {
        CustomerPriceOverride {
            id: id.to_string(),
            customer_name: customer.to_string(),
            item_name: item.to_string(),
            unit: Unit::Kg,
            rate: Money::from_rupees(10),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_last_row_wins_within_batch() {
        let batch = coalesce_batch(vec![
            row("Omex", "Tomato", 20),
            row("Perch", "Onion", 30),
            row(" omex", "TOMATO ", 25),
        ]);

        assert_eq!(batch.received, 3);
        assert_eq!(batch.entries.len(), 2);
        assert_eq!(batch.entries[0].customer_key, "omex");
        assert_eq!(batch.entries[0].item_key, "tomato");
        assert_eq!(batch.entries[0].rate, Money::from_rupees(25));
        assert_eq!(batch.entries[0].unit, Unit::Kg);
        assert_eq!(batch.entries[1].customer_key, "perch");
    }

    #[test]
    fn test_blank_rows_dropped() {
        let batch = coalesce_batch(vec![row("", "Tomato", 20), row("Omex", "  ", 20)]);
        assert!(batch.entries.is_empty());
        assert_eq!(ImportReport::from_counts(batch.received, 0).skipped, 2);
    }

    #[test]
    fn test_row_deserialization_is_lenient() {
        let rows: Vec<BulkOverrideRow> = serde_json::from_str(
            r#"[
                {"customerName": "Omex", "itemName": "Tomato", "unit": "kgs", "rate": "22.5"},
                {"customer": "Perch", "item": 7, "rate": "n/a"},
                {"customerName": null, "itemName": "Onion", "rate": 12}
            ]"#,
        )
        .unwrap();

        assert_eq!(rows[0].rate, Money::from_paise(2_250));
        assert_eq!(rows[1].item_name, "7");
        assert_eq!(rows[1].rate, Money::zero());
        assert_eq!(rows[2].customer_name, "");

        let batch = coalesce_batch(rows);
        assert_eq!(batch.entries.len(), 2);
        assert_eq!(batch.entries[0].unit, Unit::Kg);
    }

    #[test]
    fn test_import_report_counts() {
        let report = ImportReport::from_counts(10, 4);
        assert_eq!(report, ImportReport { added: 4, skipped: 6 });
    }

    #[test]
    fn test_merge_plan() {
        let overrides = vec![
            stored("1", "omex", "tomato"),
            stored("2", "Omex", "Tomato"),
            stored("3", "Perch ", "Onion"),
            stored("4", "PERCH", "onion"),
            stored("5", "perch", "garlic"),
        ];

        let plan = plan_case_merge(&overrides);
        assert_eq!(
            plan,
            vec![
                MergeAction::Delete { id: "2".into() },
                MergeAction::Normalize {
                    id: "3".into(),
                    customer_key: "perch".into(),
                    item_key: "onion".into(),
                },
                MergeAction::Delete { id: "4".into() },
            ]
        );

        let report = MergeReport::from_plan(&plan);
        assert_eq!(report, MergeReport { merged: 1, deleted: 2 });
    }

    #[test]
    fn test_merge_plan_clean_table_is_noop() {
        let overrides = vec![stored("1", "omex", "tomato"), stored("2", "perch", "onion")];
        assert!(plan_case_merge(&overrides).is_empty());
    }
}
