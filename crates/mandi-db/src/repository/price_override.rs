//! # Override Repository
//!
//! Customer-specific prices. Both name columns hold normalized keys, so the
//! `UNIQUE (customer_name, item_name)` constraint is case-insensitive in
//! effect.
//!
//! ## Write Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/overrides      upsert()              insert or update rate  │
//! │  bill created             upsert() per line     insert or update rate  │
//! │  POST /api/overrides/bulk bulk_import()         insert-if-absent only  │
//! │  merge-case-variants      merge_case_variants() normalize or delete    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mandi_core::import::{
    coalesce_batch, plan_case_merge, BulkOverrideRow, ImportReport, MergeAction, MergeReport,
};
use mandi_core::types::normalize_key;
use mandi_core::validation::validate_rate;
use mandi_core::{CustomerPriceOverride, Money, OverrideInput, Unit, ValidationError};

#[derive(Debug, Clone)]
pub struct OverrideRepository {
    pool: SqlitePool,
}

impl OverrideRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OverrideRepository { pool }
    }

    /// Lists every override, ordered by customer then item.
    pub async fn list_all(&self) -> DbResult<Vec<CustomerPriceOverride>> {
        let records = sqlx::query_as::<_, OverrideRecord>(
            r#"
            SELECT id, customer_name, item_name, unit, rate, last_updated
            FROM customer_prices
            ORDER BY customer_name, item_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(CustomerPriceOverride::from).collect())
    }

    /// Lists one customer's overrides, ordered by item.
    pub async fn list_for_customer(&self, customer: &str) -> DbResult<Vec<CustomerPriceOverride>> {
        let records = sqlx::query_as::<_, OverrideRecord>(
            r#"
            SELECT id, customer_name, item_name, unit, rate, last_updated
            FROM customer_prices
            WHERE customer_name = ?1
            ORDER BY item_name
            "#,
        )
        .bind(normalize_key(customer))
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(CustomerPriceOverride::from).collect())
    }

    /// Gets the override for a (customer, item) pair.
    pub async fn get(&self, customer: &str, item: &str) -> DbResult<Option<CustomerPriceOverride>> {
        let record = sqlx::query_as::<_, OverrideRecord>(
            r#"
            SELECT id, customer_name, item_name, unit, rate, last_updated
            FROM customer_prices
            WHERE customer_name = ?1 AND item_name = ?2
            "#,
        )
        .bind(normalize_key(customer))
        .bind(normalize_key(item))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(CustomerPriceOverride::from))
    }

    /// Inserts or replaces the unit and rate for a (customer, item) pair.
    pub async fn upsert(&self, input: OverrideInput) -> DbResult<CustomerPriceOverride> {
        let customer_key = normalize_key(&input.customer_name);
        let item_key = normalize_key(&input.item_name);
        if customer_key.is_empty() {
            return Err(required("customerName"));
        }
        if item_key.is_empty() {
            return Err(required("itemName"));
        }
        validate_rate("rate", input.rate)?;

        debug!(customer = %customer_key, item = %item_key, rate = %input.rate, "Upserting override");

        let record = sqlx::query_as::<_, OverrideRecord>(
            r#"
            INSERT INTO customer_prices (id, customer_name, item_name, unit, rate, last_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (customer_name, item_name) DO UPDATE SET
                unit = excluded.unit,
                rate = excluded.rate,
                last_updated = excluded.last_updated
            RETURNING id, customer_name, item_name, unit, rate, last_updated
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&customer_key)
        .bind(&item_key)
        .bind(input.unit.as_str())
        .bind(input.rate.paise())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(CustomerPriceOverride::from(record))
    }

    /// Deletes one override by id.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM customer_prices WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Override", id));
        }
        Ok(())
    }

    /// Deletes every override. Returns how many were removed.
    pub async fn delete_all(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM customer_prices")
            .execute(&self.pool)
            .await?;

        info!(deleted = result.rows_affected(), "All overrides cleared");
        Ok(result.rows_affected())
    }

    /// Imports spreadsheet rows. Existing (customer, item) pairs are left
    /// untouched.
    ///
    /// Never fails on bad rows: they are counted as skipped. The inserts run
    /// in one transaction.
    pub async fn bulk_import(&self, rows: Vec<BulkOverrideRow>) -> DbResult<ImportReport> {
        let batch = coalesce_batch(rows);
        debug!(
            received = batch.received,
            unique = batch.entries.len(),
            "Importing override batch"
        );

        let now = Utc::now();
        let mut added = 0usize;
        let mut tx = self.pool.begin().await?;

        for entry in &batch.entries {
            if validate_rate("rate", entry.rate).is_err() {
                continue;
            }
            let result = sqlx::query(
                r#"
                INSERT INTO customer_prices (id, customer_name, item_name, unit, rate, last_updated)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT (customer_name, item_name) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&entry.customer_key)
            .bind(&entry.item_key)
            .bind(entry.unit.as_str())
            .bind(entry.rate.paise())
            .bind(now)
            .execute(&mut *tx)
            .await?;

            added += usize::try_from(result.rows_affected()).unwrap_or_default();
        }

        tx.commit().await?;

        let report = ImportReport::from_counts(batch.received, added);
        info!(added = report.added, skipped = report.skipped, "Override import finished");
        Ok(report)
    }

    /// Folds case and whitespace variants into one normalized record per
    /// (customer, item) pair.
    pub async fn merge_case_variants(&self) -> DbResult<MergeReport> {
        let mut tx = self.pool.begin().await?;

        let records = sqlx::query_as::<_, OverrideRecord>(
            r#"
            SELECT id, customer_name, item_name, unit, rate, last_updated
            FROM customer_prices
            ORDER BY last_updated, id
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let overrides: Vec<CustomerPriceOverride> =
            records.into_iter().map(CustomerPriceOverride::from).collect();
        let plan = plan_case_merge(&overrides);

        for action in &plan {
            match action {
                MergeAction::Delete { id } => {
                    sqlx::query("DELETE FROM customer_prices WHERE id = ?1")
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
                MergeAction::Normalize {
                    id,
                    customer_key,
                    item_key,
                } => {
                    sqlx::query(
                        "UPDATE customer_prices SET customer_name = ?2, item_name = ?3 WHERE id = ?1",
                    )
                    .bind(id)
                    .bind(customer_key)
                    .bind(item_key)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await?;

        let report = MergeReport::from_plan(&plan);
        info!(merged = report.merged, deleted = report.deleted, "Case-variant merge finished");
        Ok(report)
    }
}

fn required(field: &str) -> DbError {
    DbError::Validation(ValidationError::Required {
        field: field.to_string(),
    })
}

// =============================================================================
// Record Types
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
struct OverrideRecord {
    id: String,
    customer_name: String,
    item_name: String,
    unit: String,
    rate: i64,
    last_updated: DateTime<Utc>,
}

impl From<OverrideRecord> for CustomerPriceOverride {
    fn from(record: OverrideRecord) -> Self {
        CustomerPriceOverride {
            id: record.id,
            customer_name: record.customer_name,
            item_name: record.item_name,
            unit: Unit::from(record.unit),
            rate: Money::from_paise(record.rate),
            last_updated: record.last_updated,
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

    fn input(customer: &str, item: &str, rupees: i64) -> OverrideInput {
        OverrideInput {
            customer_name: customer.to_string(),
            item_name: item.to_string(),
            unit: Unit::Kg,
            rate: Money::from_rupees(rupees),
        }
    }

    fn row(customer: &str, item: &str, rupees: i64) -> BulkOverrideRow {
        BulkOverrideRow {
            customer_name: customer.to_string(),
            item_name: item.to_string(),
            unit: "Kg".to_string(),
            rate: Money::from_rupees(rupees),
        }
    }

    async fn insert_raw(db: &Database, id: &str, customer: &str, item: &str) {
        sqlx::query(
            "INSERT INTO customer_prices (id, customer_name, item_name, unit, rate, last_updated)
             VALUES (?1, ?2, ?3, 'Kg', 1000, ?4)",
        )
        .bind(id)
        .bind(customer)
        .bind(item)
        .bind(Utc::now())
        .execute(db.pool())
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_upsert_normalizes_keys() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.overrides();

        let first = repo.upsert(input(" Omex", "Tomato", 20)).await.unwrap();
        let second = repo.upsert(input("OMEX", "tomato ", 22)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.customer_name, "omex");
        assert_eq!(second.item_name, "tomato");
        assert_eq!(second.rate, Money::from_rupees(22));

        let found = repo.get("omex", "TOMATO").await.unwrap().unwrap();
        assert_eq!(found.rate, Money::from_rupees(22));
    }

    #[tokio::test]
    async fn test_listing_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.overrides();

        repo.upsert(input("Perch", "Onion", 30)).await.unwrap();
        repo.upsert(input("Omex", "Tomato", 20)).await.unwrap();
        repo.upsert(input("Omex", "Carrot", 40)).await.unwrap();

        let all: Vec<(String, String)> = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|o| (o.customer_name, o.item_name))
            .collect();
        assert_eq!(
            all,
            vec![
                ("omex".to_string(), "carrot".to_string()),
                ("omex".to_string(), "tomato".to_string()),
                ("perch".to_string(), "onion".to_string()),
            ]
        );

        assert_eq!(repo.list_for_customer("OMEX").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_bulk_import_is_insert_only() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.overrides();

        repo.upsert(input("Omex", "Tomato", 20)).await.unwrap();

        let report = repo
            .bulk_import(vec![
                row("Omex", "Tomato", 99),
                row("Omex", "Onion", 30),
                row("omex", "ONION", 35),
                row("", "Garlic", 10),
                row("Omex", "Saffron", 900_000_000),
            ])
            .await
            .unwrap();

        // Blank key and a rate above the limit are skipped along with the rest
        assert_eq!(report, ImportReport { added: 1, skipped: 4 });
        assert!(repo.get("omex", "saffron").await.unwrap().is_none());

        // Existing rate untouched, last row in the batch wins for new keys
        let tomato = repo.get("omex", "tomato").await.unwrap().unwrap();
        assert_eq!(tomato.rate, Money::from_rupees(20));
        let onion = repo.get("omex", "onion").await.unwrap().unwrap();
        assert_eq!(onion.rate, Money::from_rupees(35));
    }

    #[tokio::test]
    async fn test_delete_and_delete_all() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.overrides();

        let o = repo.upsert(input("Omex", "Tomato", 20)).await.unwrap();
        repo.upsert(input("Omex", "Onion", 30)).await.unwrap();

        repo.delete(&o.id).await.unwrap();
        assert!(matches!(repo.delete(&o.id).await, Err(DbError::NotFound { .. })));

        assert_eq!(repo.delete_all().await.unwrap(), 1);
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merge_case_variants() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.overrides();

        insert_raw(&db, "a", "omex", "tomato").await;
        insert_raw(&db, "b", "Omex", "Tomato").await;
        insert_raw(&db, "c", "Perch ", "Onion").await;

        let report = repo.merge_case_variants().await.unwrap();
        assert_eq!(report, MergeReport { merged: 1, deleted: 1 });

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|o| o.customer_name == normalize_key(&o.customer_name)));

        let again = repo.merge_case_variants().await.unwrap();
        assert_eq!(again, MergeReport::default());
    }
}
