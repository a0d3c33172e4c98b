//! # Bill Handlers
//!
//! ## Create Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Client                                 Server                          │
//! │                                                                         │
//! │  GET /api/bills/next-number ──────────► MAX(bill_no) + 1  (= 7)        │
//! │  GET /api/bills/draft?customer=Omex ──► lines from today's sheet       │
//! │                                                                         │
//! │  ... user edits lines ...                                              │
//! │                                                                         │
//! │  POST /api/bills { billNo: 7, ... } ──► 201 Bill                       │
//! │                                    └──► 409 DUPLICATE_NUMBER           │
//! │                                         (another client saved #7;      │
//! │                                          re-fetch the number, retry)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use mandi_core::numbering::Renumbering;
use mandi_core::pricing::PriceSource;
use mandi_core::sheet::ProjectedLine;
use mandi_core::{Bill, BillDraft, Money, Quantity, FALLBACK_UNIT};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `GET /api/bills`, ordered by bill number.
pub async fn list_bills(State(state): State<AppState>) -> ApiResult<Json<Vec<Bill>>> {
    Ok(Json(state.db().bills().list().await?))
}

/// `GET /api/bills/{id}`
pub async fn get_bill(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Bill>> {
    state
        .db()
        .bills()
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Bill", &id))
}

/// `POST /api/bills`
pub async fn create_bill(
    State(state): State<AppState>,
    Json(draft): Json<BillDraft>,
) -> ApiResult<(StatusCode, Json<Bill>)> {
    let bill = state.billing.create_bill(draft).await?;
    Ok((StatusCode::CREATED, Json(bill)))
}

/// `DELETE /api/bills/{id}`: returns the numbers that moved to close the gap.
pub async fn delete_bill(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Renumbering>>> {
    Ok(Json(state.billing.delete_bill(&id).await?))
}

/// `GET /api/bills/next-number`
pub async fn next_bill_number(State(state): State<AppState>) -> ApiResult<Json<i64>> {
    Ok(Json(state.db().bills().next_number().await?))
}

// =============================================================================
// Draft From Sheet
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct DraftQuery {
    pub customer: String,
    pub date: NaiveDate,
}

/// `GET /api/bills/draft?customer=&date=`
///
/// Lines for the customer's column on the sheet saved that day. A customer
/// with nothing on the sheet gets one blank line to start typing into.
pub async fn draft_from_sheet(
    State(state): State<AppState>,
    Query(query): Query<DraftQuery>,
) -> ApiResult<Json<Vec<ProjectedLine>>> {
    let mut lines = state
        .billing
        .draft_from_sheet(&query.customer, query.date, state.customer_codes())
        .await?;

    if lines.is_empty() {
        lines.push(blank_line());
    }
    Ok(Json(lines))
}

fn blank_line() -> ProjectedLine {
    ProjectedLine {
        name: String::new(),
        unit: FALLBACK_UNIT,
        qty: Quantity::zero(),
        rate: Money::zero(),
        amount: Money::zero(),
        source: PriceSource::Fallback,
    }
}
