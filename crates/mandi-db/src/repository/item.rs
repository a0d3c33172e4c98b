//! # Item Repository
//!
//! The price catalog: one row per case-insensitive item name.
//!
//! ## Upsert by Natural Key
//! ```text
//! upsert({ name: " tomato ", unit: Kg, defaultRate: 25 })
//!      │
//!      ▼
//! name_key = "tomato"
//!      │
//!      ├── no row with that key ──► INSERT (name stored as "tomato")
//!      │
//!      └── "Tomato" already stored ──► UPDATE unit, default_rate
//!                                      (display name stays "Tomato")
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mandi_core::types::normalize_key;
use mandi_core::validation::{validate_name, validate_rate};
use mandi_core::{Item, ItemInput, Money, Unit};

/// Repository for catalog items.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Lists every catalog item, ordered by name (case-insensitive).
    pub async fn list(&self) -> DbResult<Vec<Item>> {
        let records = sqlx::query_as::<_, ItemRecord>(
            r#"
            SELECT id, name, unit, default_rate, updated_at
            FROM items
            ORDER BY name_key
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = records.len(), "Listed catalog items");
        Ok(records.into_iter().map(Item::from).collect())
    }

    /// Gets an item by its normalized name.
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Item>> {
        let record = sqlx::query_as::<_, ItemRecord>(
            r#"
            SELECT id, name, unit, default_rate, updated_at
            FROM items
            WHERE name_key = ?1
            "#,
        )
        .bind(normalize_key(name))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Item::from))
    }

    /// Inserts a new item or updates the unit and rate of the existing one.
    ///
    /// ## Returns
    /// * `Ok(Item)` - The stored item
    /// * `Err(DbError::Validation)` - Blank name or negative rate
    pub async fn upsert(&self, input: ItemInput) -> DbResult<Item> {
        let name = validate_name("name", &input.name)?;
        validate_rate("defaultRate", input.default_rate)?;

        debug!(name = %name, rate = %input.default_rate, "Upserting catalog item");

        let record = sqlx::query_as::<_, ItemRecord>(
            r#"
            INSERT INTO items (id, name, name_key, unit, default_rate, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (name_key) DO UPDATE SET
                unit = excluded.unit,
                default_rate = excluded.default_rate,
                updated_at = excluded.updated_at
            RETURNING id, name, unit, default_rate, updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&name)
        .bind(normalize_key(&name))
        .bind(input.unit.as_str())
        .bind(input.default_rate.paise())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(Item::from(record))
    }

    /// Deletes an item by id. Overrides for the item are kept.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        info!(id = %id, "Catalog item deleted");
        Ok(())
    }
}

// =============================================================================
// Record Types
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
struct ItemRecord {
    id: String,
    name: String,
    unit: String,
    default_rate: i64,
    updated_at: DateTime<Utc>,
}

impl From<ItemRecord> for Item {
    fn from(record: ItemRecord) -> Self {
        Item {
            id: record.id,
            name: record.name,
            unit: Unit::from(record.unit),
            default_rate: Money::from_paise(record.default_rate),
            updated_at: record.updated_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use mandi_core::{ItemInput, Money, Unit};

    fn input(name: &str, unit: Unit, rupees: i64) -> ItemInput {
        ItemInput {
            name: name.to_string(),
            unit,
            default_rate: Money::from_rupees(rupees),
        }
    }

    #[tokio::test]
    async fn test_upsert_is_case_insensitive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.items();

        let first = repo.upsert(input("Tomato", Unit::Kg, 20)).await.unwrap();
        let second = repo.upsert(input("  TOMATO ", Unit::Crate, 25)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Tomato");
        assert_eq!(second.unit, Unit::Crate);
        assert_eq!(second.default_rate, Money::from_rupees(25));

        let items = repo.list().await.unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.items();

        repo.upsert(input("onion", Unit::Kg, 30)).await.unwrap();
        repo.upsert(input("Brinjal", Unit::Kg, 40)).await.unwrap();
        repo.upsert(input("Carrot", Unit::Kg, 35)).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["Brinjal", "Carrot", "onion"]);
    }

    #[tokio::test]
    async fn test_rejects_invalid_input() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.items();

        let blank = repo.upsert(input("  ", Unit::Kg, 10)).await;
        assert!(matches!(blank, Err(DbError::Validation(_))));

        let negative = repo.upsert(input("Tomato", Unit::Kg, -1)).await;
        assert!(matches!(negative, Err(DbError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.items();

        let item = repo.upsert(input("Tomato", Unit::Kg, 20)).await.unwrap();
        repo.delete(&item.id).await.unwrap();
        assert!(repo.get_by_name("tomato").await.unwrap().is_none());

        let again = repo.delete(&item.id).await;
        assert!(matches!(again, Err(DbError::NotFound { .. })));
    }
}
