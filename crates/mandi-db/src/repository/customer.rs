//! # Customer Repository
//!
//! Customer records keyed by normalized name. Bills keep their own customer
//! snapshot; this table only feeds autocomplete and the address on file.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use mandi_core::types::normalize_key;
use mandi_core::validation::validate_name;
use mandi_core::{Customer, CustomerInput};

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Lists customers ordered by name (case-insensitive).
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let records = sqlx::query_as::<_, CustomerRecord>(
            r#"
            SELECT id, name, address, gst, phone, updated_at
            FROM customers
            ORDER BY name_key
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Customer::from).collect())
    }

    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Customer>> {
        let record = sqlx::query_as::<_, CustomerRecord>(
            r#"
            SELECT id, name, address, gst, phone, updated_at
            FROM customers
            WHERE name_key = ?1
            "#,
        )
        .bind(normalize_key(name))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Customer::from))
    }

    /// Inserts or updates a customer by normalized name.
    ///
    /// Name and address always take the new values. GST and phone are only
    /// replaced when the input carries them, so a bill (which knows neither)
    /// never erases them.
    pub async fn upsert(&self, input: CustomerInput) -> DbResult<Customer> {
        let name = validate_name("name", &input.name)?;
        let gst = non_blank(input.gst);
        let phone = non_blank(input.phone);

        debug!(name = %name, "Upserting customer");

        let record = sqlx::query_as::<_, CustomerRecord>(
            r#"
            INSERT INTO customers (id, name, name_key, address, gst, phone, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (name_key) DO UPDATE SET
                name = excluded.name,
                address = excluded.address,
                gst = COALESCE(excluded.gst, customers.gst),
                phone = COALESCE(excluded.phone, customers.phone),
                updated_at = excluded.updated_at
            RETURNING id, name, address, gst, phone, updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&name)
        .bind(normalize_key(&name))
        .bind(input.address.trim())
        .bind(gst)
        .bind(phone)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(Customer::from(record))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Record Types
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
struct CustomerRecord {
    id: String,
    name: String,
    address: String,
    gst: Option<String>,
    phone: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRecord> for Customer {
    fn from(record: CustomerRecord) -> Self {
        Customer {
            id: record.id,
            name: record.name,
            address: record.address,
            gst: record.gst,
            phone: record.phone,
            updated_at: record.updated_at,
        }
    }
}
