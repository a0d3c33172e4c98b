//! # Numbering
//!
//! Sequence numbers for bills and master sheets.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  next_number = MAX(existing) + 1, or 1 when none exist                 │
//! │  (derived from stored records - there is no counter row)               │
//! │                                                                         │
//! │  Bills stay dense. Deleting #2 of {1, 2, 3, 4}:                        │
//! │                                                                         │
//! │     before      after delete     renumber plan        result           │
//! │     ──────      ────────────     ─────────────        ──────           │
//! │     #1 A        #1 A             (unchanged)          #1 A             │
//! │     #2 B   ✗    #3 C             C: 3 → 2             #2 C             │
//! │     #3 C        #4 D             D: 4 → 3             #3 D             │
//! │     #4 D                                                               │
//! │                                                                         │
//! │  Moves are applied in ascending order. Every target is smaller than    │
//! │  its source and was vacated by the previous move, so the UNIQUE        │
//! │  constraint on the number column never trips mid-way.                  │
//! │                                                                         │
//! │  Sheets are only ever issued, never renumbered.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which sequence a number belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceKind {
    Bill,
    Sheet,
}

impl fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceKind::Bill => write!(f, "bill number"),
            SequenceKind::Sheet => write!(f, "sheet number"),
        }
    }
}

/// Next number to issue given the current maximum.
///
/// ```rust
/// use mandi_core::numbering::next_number;
///
/// assert_eq!(next_number(None), 1);
/// assert_eq!(next_number(Some(41)), 42);
/// ```
pub fn next_number(current_max: Option<i64>) -> i64 {
    current_max.map_or(1, |max| max.max(0) + 1)
}

/// One reassignment in a renumbering plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renumbering {
    pub id: String,
    pub from: i64,
    pub to: i64,
}

/// Plans the reassignment of `remaining` records to `1..=N`.
///
/// `remaining` holds `(id, current number)` pairs in any order. The plan
/// lists only records whose number changes, in ascending order of their
/// current number, which is the order they must be applied in.
pub fn renumber_plan(remaining: &[(String, i64)]) -> Vec<Renumbering> {
    let mut ordered: Vec<&(String, i64)> = remaining.iter().collect();
    ordered.sort_by_key(|(_, number)| *number);

    ordered
        .into_iter()
        .zip(1..)
        .filter(|((_, from), to)| from != to)
        .map(|((id, from), to)| Renumbering {
            id: id.clone(),
            from: *from,
            to,
        })
        .collect()
}

/// True when `numbers` is exactly `{1..=N}`.
pub fn is_dense(numbers: &[i64]) -> bool {
    let mut sorted = numbers.to_vec();
    sorted.sort_unstable();
    sorted.iter().zip(1..).all(|(n, expected)| *n == expected)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn records(numbers: &[i64]) -> Vec<(String, i64)> {
        numbers.iter().map(|n| (format!("bill-{n}"), *n)).collect()
    }

    fn apply(records: &mut Vec<(String, i64)>, plan: &[Renumbering]) {
        for step in plan {
            // A move must never land on a number still held by another record.
            assert!(
                !records.iter().any(|(id, n)| *n == step.to && *id != step.id),
                "collision moving {} to {}",
                step.id,
                step.to
            );
            if let Some(record) = records.iter_mut().find(|(id, _)| *id == step.id) {
                record.1 = step.to;
            }
        }
    }

    #[test]
    fn test_next_number() {
        assert_eq!(next_number(None), 1);
        assert_eq!(next_number(Some(0)), 1);
        assert_eq!(next_number(Some(9)), 10);
    }

    #[test]
    fn test_delete_middle_bill_closes_gap() {
        // Bills 1, 2, 3 exist; bill 2 is deleted.
        let remaining = records(&[1, 3]);
        let plan = renumber_plan(&remaining);

        assert_eq!(
            plan,
            vec![Renumbering {
                id: "bill-3".to_string(),
                from: 3,
                to: 2
            }]
        );
    }

    #[test]
    fn test_plan_is_collision_free_and_dense() {
        let mut remaining = records(&[7, 2, 9, 4, 5]);
        let plan = renumber_plan(&remaining);
        apply(&mut remaining, &plan);

        let numbers: Vec<i64> = remaining.iter().map(|(_, n)| *n).collect();
        assert!(is_dense(&numbers));

        // Relative order is preserved: 2 < 4 < 5 < 7 < 9 → 1..5
        let by_id = |id: &str| remaining.iter().find(|(i, _)| i == id).map(|(_, n)| *n);
        assert_eq!(by_id("bill-2"), Some(1));
        assert_eq!(by_id("bill-4"), Some(2));
        assert_eq!(by_id("bill-9"), Some(5));
    }

    #[test]
    fn test_create_delete_sequence_stays_dense() {
        let mut bills: Vec<(String, i64)> = Vec::new();
        let mut created = 0;

        // Interleave creates and deletes (front, middle and back).
        let script: &[(&str, usize)] = &[
            ("create", 0),
            ("create", 0),
            ("create", 0),
            ("create", 0),
            ("delete", 1),
            ("create", 0),
            ("delete", 0),
            ("delete", 2),
            ("create", 0),
            ("create", 0),
            ("delete", 3),
        ];

        for (op, index) in script {
            match *op {
                "create" => {
                    created += 1;
                    let max = bills.iter().map(|(_, n)| *n).max();
                    bills.push((format!("b{created}"), next_number(max)));
                }
                _ => {
                    let mut ordered = bills.clone();
                    ordered.sort_by_key(|(_, n)| *n);
                    let victim = ordered[*index].0.clone();
                    bills.retain(|(id, _)| *id != victim);
                    let plan = renumber_plan(&bills);
                    apply(&mut bills, &plan);
                }
            }
            let numbers: Vec<i64> = bills.iter().map(|(_, n)| *n).collect();
            assert!(is_dense(&numbers), "not dense after {op}: {numbers:?}");
        }
    }

    #[test]
    fn test_is_dense() {
        assert!(is_dense(&[]));
        assert!(is_dense(&[2, 1, 3]));
        assert!(!is_dense(&[1, 3]));
        assert!(!is_dense(&[1, 1, 2]));
    }

    #[test]
    fn test_sequence_kind_display() {
        assert_eq!(SequenceKind::Bill.to_string(), "bill number");
        assert_eq!(SequenceKind::Sheet.to_string(), "sheet number");
    }
}
