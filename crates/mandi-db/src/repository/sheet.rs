//! # Sheet Repository
//!
//! Saved master sheets. A sheet is always read and written whole, so its
//! header and rows are stored as JSON text next to the scalar columns.
//! Sheets are never renumbered.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use mandi_core::numbering::{next_number, SequenceKind};
use mandi_core::{MasterSheet, Quantity, SheetRow};

const SHEET_NO_COLUMN: &str = "master_sheets.sheet_no";

#[derive(Debug, Clone)]
pub struct SheetRepository {
    pool: SqlitePool,
}

impl SheetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SheetRepository { pool }
    }

    /// `MAX(sheet_no) + 1`, or 1 when there are no sheets.
    pub async fn next_number(&self) -> DbResult<i64> {
        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(sheet_no) FROM master_sheets")
            .fetch_one(&self.pool)
            .await?;
        Ok(next_number(max))
    }

    /// Lists every sheet, newest number first.
    pub async fn list(&self) -> DbResult<Vec<MasterSheet>> {
        let records = sqlx::query_as::<_, SheetRecord>(
            r#"
            SELECT id, sheet_no, date, vehicle_no, header_columns, data_rows, total_qty, created_at
            FROM master_sheets
            ORDER BY sheet_no DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        records.into_iter().map(MasterSheet::try_from).collect()
    }

    /// The sheet for a date. When several were saved that day, the one with
    /// the highest number wins.
    pub async fn find_by_date(&self, date: NaiveDate) -> DbResult<Option<MasterSheet>> {
        let record = sqlx::query_as::<_, SheetRecord>(
            r#"
            SELECT id, sheet_no, date, vehicle_no, header_columns, data_rows, total_qty, created_at
            FROM master_sheets
            WHERE date = ?1
            ORDER BY sheet_no DESC
            LIMIT 1
            "#,
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        record.map(MasterSheet::try_from).transpose()
    }

    /// Inserts a finalized sheet.
    ///
    /// ## Returns
    /// * `Err(DbError::DuplicateNumber)` - `sheet.sheet_no` is already taken
    pub async fn insert(&self, sheet: &MasterSheet) -> DbResult<()> {
        debug!(id = %sheet.id, sheet_no = sheet.sheet_no, date = %sheet.date, "Inserting master sheet");

        let header_columns = serde_json::to_string(&sheet.header_columns)
            .map_err(|e| DbError::corrupt("header_columns", e))?;
        let data_rows =
            serde_json::to_string(&sheet.data_rows).map_err(|e| DbError::corrupt("data_rows", e))?;

        sqlx::query(
            r#"
            INSERT INTO master_sheets (
                id, sheet_no, date, vehicle_no, header_columns, data_rows, total_qty, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&sheet.id)
        .bind(sheet.sheet_no)
        .bind(sheet.date)
        .bind(&sheet.vehicle_no)
        .bind(header_columns)
        .bind(data_rows)
        .bind(sheet.total_qty.milli())
        .bind(sheet.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DbError::from(e).into_duplicate_number(SHEET_NO_COLUMN, SequenceKind::Sheet, sheet.sheet_no)
        })?;

        Ok(())
    }
}

// =============================================================================
// Record Types
// =============================================================================

#[derive(Debug, Clone, sqlx::FromRow)]
struct SheetRecord {
    id: String,
    sheet_no: i64,
    date: NaiveDate,
    vehicle_no: String,
    header_columns: String,
    data_rows: String,
    total_qty: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<SheetRecord> for MasterSheet {
    type Error = DbError;

    fn try_from(record: SheetRecord) -> Result<Self, Self::Error> {
        let header_columns: Vec<String> = serde_json::from_str(&record.header_columns)
            .map_err(|e| DbError::corrupt("header_columns", e))?;
        let data_rows: Vec<SheetRow> = serde_json::from_str(&record.data_rows)
            .map_err(|e| DbError::corrupt("data_rows", e))?;

        Ok(MasterSheet {
            id: record.id,
            sheet_no: record.sheet_no,
            date: record.date,
            vehicle_no: record.vehicle_no,
            header_columns,
            data_rows,
            total_qty: Quantity::from_milli(record.total_qty),
            created_at: record.created_at,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
