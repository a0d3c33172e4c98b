//! # Monthly Reports
//!
//! The ledger (bills with running balance) and the summary grid (item ×
//! day quantities) for one customer and one calendar month.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use mandi_core::ledger::{LedgerStatement, SummaryGrid};
use mandi_core::Money;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerQuery {
    pub customer: String,
    pub month: u32,
    pub year: i32,

    /// Balance carried in from earlier months.
    #[serde(default)]
    pub previous_balance: Option<Money>,
}

/// `GET /api/ledger?customer=&month=&year=&previousBalance=`
pub async fn query_ledger(
    State(state): State<AppState>,
    Query(query): Query<LedgerQuery>,
) -> ApiResult<Json<LedgerStatement>> {
    let statement = state
        .billing
        .ledger(
            &query.customer,
            query.month,
            query.year,
            query.previous_balance.unwrap_or_default(),
        )
        .await?;
    Ok(Json(statement))
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub customer: String,
    pub month: u32,
    pub year: i32,
}

/// `GET /api/summary?customer=&month=&year=`
pub async fn query_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Json<SummaryGrid>> {
    Ok(Json(
        state
            .billing
            .summary(&query.customer, query.month, query.year)
            .await?,
    ))
}
