//! # Bill Repository
//!
//! Stores finalized bills and keeps their numbers dense.
//!
//! ## Delete and Renumber
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Before:  #1 (a)   #2 (b)   #3 (c)   #4 (d)                            │
//! │                                                                         │
//! │  delete(b)                      ─┐                                      │
//! │  SELECT id, bill_no ORDER BY no  │  one transaction                     │
//! │  UPDATE c: 3 → 2                 │  (ascending: slot 2 is already free) │
//! │  UPDATE d: 4 → 3                ─┘                                      │
//! │                                                                         │
//! │  After:   #1 (a)   #2 (c)   #3 (d)                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mandi_core::numbering::{next_number, renumber_plan, Renumbering, SequenceKind};
use mandi_core::types::normalize_key;
use mandi_core::validation::month_range;
use mandi_core::{Bill, BillCustomer, BillLine, Money, Quantity, Unit};

const BILL_NO_COLUMN: &str = "bills.bill_no";

#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// `MAX(bill_no) + 1`, or 1 when there are no bills.
    pub async fn next_number(&self) -> DbResult<i64> {
        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(bill_no) FROM bills")
            .fetch_one(&self.pool)
            .await?;
        Ok(next_number(max))
    }

    /// Lists every bill with its lines, ordered by bill number.
    pub async fn list(&self) -> DbResult<Vec<Bill>> {
        let records = sqlx::query_as::<_, BillRecord>(
            r#"
            SELECT id, bill_no, date, customer_name, customer_address, total_amount, created_at
            FROM bills
            ORDER BY bill_no
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let lines = sqlx::query_as::<_, BillLineRecord>(
            r#"
            SELECT bill_id, name, unit, qty, rate, amount
            FROM bill_items
            ORDER BY bill_id, position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble(records, lines))
    }

    /// Gets one bill by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<Bill>> {
        let Some(record) = sqlx::query_as::<_, BillRecord>(
            r#"
            SELECT id, bill_no, date, customer_name, customer_address, total_amount, created_at
            FROM bills
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let lines = sqlx::query_as::<_, BillLineRecord>(
            r#"
            SELECT bill_id, name, unit, qty, rate, amount
            FROM bill_items
            WHERE bill_id = ?1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble(vec![record], lines).pop())
    }

    /// A customer's bills within one calendar month, ordered by date then
    /// bill number. The customer is matched by normalized name.
    pub async fn list_for_customer_month(
        &self,
        customer: &str,
        month: u32,
        year: i32,
    ) -> DbResult<Vec<Bill>> {
        let (start, end) = month_range(month, year)?;
        let customer_key = normalize_key(customer);

        debug!(customer = %customer_key, %start, %end, "Querying customer month");

        let records = sqlx::query_as::<_, BillRecord>(
            r#"
            SELECT id, bill_no, date, customer_name, customer_address, total_amount, created_at
            FROM bills
            WHERE customer_key = ?1 AND date >= ?2 AND date < ?3
            ORDER BY date, bill_no
            "#,
        )
        .bind(&customer_key)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let lines = sqlx::query_as::<_, BillLineRecord>(
            r#"
            SELECT bi.bill_id, bi.name, bi.unit, bi.qty, bi.rate, bi.amount
            FROM bill_items bi
            INNER JOIN bills b ON b.id = bi.bill_id
            WHERE b.customer_key = ?1 AND b.date >= ?2 AND b.date < ?3
            ORDER BY bi.bill_id, bi.position
            "#,
        )
        .bind(&customer_key)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble(records, lines))
    }

    /// Inserts a finalized bill and its lines in one transaction.
    ///
    /// ## Returns
    /// * `Err(DbError::DuplicateNumber)` - `bill.bill_no` is already taken
    pub async fn insert(&self, bill: &Bill) -> DbResult<()> {
        debug!(id = %bill.id, bill_no = bill.bill_no, lines = bill.items.len(), "Inserting bill");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, bill_no, date, customer_name, customer_key,
                customer_address, total_amount, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&bill.id)
        .bind(bill.bill_no)
        .bind(bill.date)
        .bind(&bill.customer.name)
        .bind(normalize_key(&bill.customer.name))
        .bind(&bill.customer.address)
        .bind(bill.total_amount.paise())
        .bind(bill.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            DbError::from(e).into_duplicate_number(BILL_NO_COLUMN, SequenceKind::Bill, bill.bill_no)
        })?;

        for (position, line) in bill.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO bill_items (id, bill_id, position, name, unit, qty, rate, amount)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&bill.id)
            .bind(i64::try_from(position).unwrap_or(i64::MAX))
            .bind(&line.name)
            .bind(line.unit.as_str())
            .bind(line.qty.milli())
            .bind(line.rate.paise())
            .bind(line.amount.paise())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Deletes a bill and closes the gap it leaves in the numbering.
    ///
    /// ## Returns
    /// * `Ok(Vec<Renumbering>)` - The bills whose number changed
    /// * `Err(DbError::NotFound)` - No bill has this id (nothing changes)
    pub async fn delete_and_renumber(&self, id: &str) -> DbResult<Vec<Renumbering>> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM bills WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Bill", id));
        }

        let remaining: Vec<(String, i64)> =
            sqlx::query_as("SELECT id, bill_no FROM bills ORDER BY bill_no")
                .fetch_all(&mut *tx)
                .await?;

        let plan = renumber_plan(&remaining);
        for step in &plan {
            sqlx::query("UPDATE bills SET bill_no = ?2 WHERE id = ?1")
                .bind(&step.id)
                .bind(step.to)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(id = %id, renumbered = plan.len(), "Bill deleted");
        Ok(plan)
    }

    #[cfg(test)]
    async fn numbers(&self) -> DbResult<Vec<i64>> {
        let numbers = sqlx::query_scalar("SELECT bill_no FROM bills ORDER BY bill_no")
            .fetch_all(&self.pool)
            .await?;
        Ok(numbers)
    }
}

/// Joins bill rows with their lines. Lines must be ordered by position
/// within each bill.
fn assemble(records: Vec<BillRecord>, lines: Vec<BillLineRecord>) -> Vec<Bill> {
    let mut by_bill: HashMap<String, Vec<BillLine>> = HashMap::new();
    for line in lines {
        by_bill
            .entry(line.bill_id.clone())
            .or_default()
            .push(BillLine::from(line));
    }

    records
        .into_iter()
        .map(|record| {
            let items = by_bill.remove(&record.id).unwrap_or_default();
            Bill {
                id: record.id,
                bill_no: record.bill_no,
                date: record.date,
                customer: BillCustomer {
                    name: record.customer_name,
                    address: record.customer_address,
                },
                items,
                total_amount: Money::from_paise(record.total_amount),
                created_at: record.created_at,
            }
        })
        .collect()
}

// =============================================================================
// Record Types
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
struct BillRecord {
    id: String,
    bill_no: i64,
    date: NaiveDate,
    customer_name: String,
    customer_address: String,
    total_amount: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct BillLineRecord {
    bill_id: String,
    name: String,
    unit: String,
    qty: i64,
    rate: i64,
    amount: i64,
}

impl From<BillLineRecord> for BillLine {
    fn from(record: BillLineRecord) -> Self {
        BillLine {
            name: record.name,
            unit: Unit::from(record.unit),
            qty: Quantity::from_milli(record.qty),
            rate: Money::from_paise(record.rate),
            amount: Money::from_paise(record.amount),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use mandi_core::ledger::finalize_bill;
    use mandi_core::numbering::is_dense;
    use mandi_core::{BillDraft, BillLineDraft};

    fn bill(no: i64, customer: &str, date: NaiveDate) -> Bill {
        let draft = BillDraft {
            bill_no: Some(no),
            date,
            customer: BillCustomer {
                name: customer.to_string(),
                address: String::new(),
            },
            items: vec![BillLineDraft {
                name: "Tomato".into(),
                unit: Unit::Kg,
                qty: Quantity::from_whole(no),
                rate: Money::from_rupees(10),
            }],
        };
        finalize_bill(draft, no, Uuid::new_v4().to_string(), Utc::now()).unwrap()
    }

    fn march(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[tokio::test]
    async fn test_next_number() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.bills();

        assert_eq!(repo.next_number().await.unwrap(), 1);
        repo.insert(&bill(1, "Omex", march(1))).await.unwrap();
        repo.insert(&bill(2, "Omex", march(2))).await.unwrap();
        assert_eq!(repo.next_number().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_number() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.bills();

        repo.insert(&bill(1, "Omex", march(1))).await.unwrap();
        let err = repo.insert(&bill(1, "Perch", march(1))).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::DuplicateNumber { kind: SequenceKind::Bill, number: 1 }
        ));

        // The failed insert left nothing behind
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_round_trip_keeps_line_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.bills();

        let mut b = bill(1, "Omex", march(1));
        b.items.push(BillLine {
            name: "Ginger".into(),
            unit: Unit::Gm,
            qty: Quantity::from_whole(500),
            rate: Money::from_rupees(120),
            amount: Money::from_rupees(60),
        });
        b.total_amount = b.items.iter().map(|l| l.amount).sum();
        repo.insert(&b).await.unwrap();

        let stored = repo.get(&b.id).await.unwrap().unwrap();
        assert_eq!(stored.items, b.items);
        assert_eq!(stored.date, b.date);
        assert_eq!(stored.total_amount, b.total_amount);
    }

    #[tokio::test]
    async fn test_delete_middle_bill_renumbers() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.bills();

        let b1 = bill(1, "Omex", march(1));
        let b2 = bill(2, "Perch", march(2));
        let b3 = bill(3, "Refuge", march(3));
        for b in [&b1, &b2, &b3] {
            repo.insert(b).await.unwrap();
        }

        let plan = repo.delete_and_renumber(&b2.id).await.unwrap();
        assert_eq!(plan.len(), 1);

        let bills = repo.list().await.unwrap();
        let order: Vec<(&str, i64)> = bills.iter().map(|b| (b.id.as_str(), b.bill_no)).collect();
        assert_eq!(order, vec![(b1.id.as_str(), 1), (b3.id.as_str(), 2)]);
        assert_eq!(bills[1].customer.name, "Refuge");
        assert_eq!(bills[1].items.len(), 1);
    }

    #[tokio::test]
    async fn test_numbers_stay_dense() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.bills();

        let mut ids = Vec::new();
        for day in 1..=6 {
            let no = repo.next_number().await.unwrap();
            let b = bill(no, "Omex", march(day));
            repo.insert(&b).await.unwrap();
            ids.push(b.id);
        }

        for id in [&ids[0], &ids[3], &ids[5]] {
            repo.delete_and_renumber(id).await.unwrap();
            assert!(is_dense(&repo.numbers().await.unwrap()));
        }

        let no = repo.next_number().await.unwrap();
        assert_eq!(no, 4);
        repo.insert(&bill(no, "Omex", march(9))).await.unwrap();
        assert!(is_dense(&repo.numbers().await.unwrap()));
    }

    #[tokio::test]
    async fn test_delete_unknown_bill() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.bills();
        repo.insert(&bill(1, "Omex", march(1))).await.unwrap();

        let err = repo.delete_and_renumber("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(repo.numbers().await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_customer_month_query() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.bills();

        repo.insert(&bill(1, "Omex", march(5))).await.unwrap();
        repo.insert(&bill(2, "omex ", march(2))).await.unwrap();
        repo.insert(&bill(3, "Perch", march(2))).await.unwrap();
        repo.insert(&bill(4, "Omex", NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()))
            .await
            .unwrap();
        repo.insert(&bill(5, "Omex", march(31))).await.unwrap();

        let bills = repo.list_for_customer_month("OMEX", 3, 2024).await.unwrap();
        let numbers: Vec<i64> = bills.iter().map(|b| b.bill_no).collect();
        assert_eq!(numbers, vec![2, 1, 5]);
        assert!(bills.iter().all(|b| b.items.len() == 1));

        assert!(repo.list_for_customer_month("Omex", 13, 2024).await.is_err());
    }
}
