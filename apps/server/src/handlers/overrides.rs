//! # Customer Price Handlers
//!
//! Overrides, the spreadsheet bulk upload, the case-variant cleanup and
//! price resolution.
//!
//! ## Bulk Upload
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/overrides/bulk   [ {customer, item, unit, rate}, ... ]      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  rows with junk rates parse as 0; blank names are dropped              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  last row per (customer, item) wins inside the batch                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  insert if absent ──► { "added": 12, "skipped": 3 }                    │
//! │                                                                         │
//! │  Always 200: a partial import is a result, not an error.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use mandi_core::import::{BulkOverrideRow, ImportReport, MergeReport};
use mandi_core::pricing::ResolvedPrice;
use mandi_core::{CustomerPriceOverride, OverrideInput};

use crate::error::ApiResult;
use crate::state::AppState;

/// `GET /api/overrides`, ordered by customer then item.
pub async fn list_overrides(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CustomerPriceOverride>>> {
    Ok(Json(state.db().overrides().list_all().await?))
}

/// `POST /api/overrides`
pub async fn upsert_override(
    State(state): State<AppState>,
    Json(input): Json<OverrideInput>,
) -> ApiResult<Json<CustomerPriceOverride>> {
    Ok(Json(state.db().overrides().upsert(input).await?))
}

/// `DELETE /api/overrides/{id}`
pub async fn delete_override(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db().overrides().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct DeletedCount {
    pub deleted: u64,
}

/// `DELETE /api/overrides`: clears the whole table.
pub async fn delete_all_overrides(State(state): State<AppState>) -> ApiResult<Json<DeletedCount>> {
    let deleted = state.db().overrides().delete_all().await?;
    info!(deleted, "All customer overrides deleted");
    Ok(Json(DeletedCount { deleted }))
}

/// `POST /api/overrides/bulk`
pub async fn bulk_upsert_overrides(
    State(state): State<AppState>,
    Json(rows): Json<Vec<BulkOverrideRow>>,
) -> ApiResult<Json<ImportReport>> {
    Ok(Json(state.db().overrides().bulk_import(rows).await?))
}

/// `POST /api/overrides/merge-case-variants`
pub async fn merge_case_variants(State(state): State<AppState>) -> ApiResult<Json<MergeReport>> {
    Ok(Json(state.db().overrides().merge_case_variants().await?))
}

// =============================================================================
// Price Resolution
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub item: String,

    #[serde(default)]
    pub customer: Option<String>,
}

/// `GET /api/prices/resolve?item=&customer=`
pub async fn resolve_price(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> ApiResult<Json<ResolvedPrice>> {
    let price = state
        .billing
        .resolve_price(&query.item, query.customer.as_deref())
        .await?;
    Ok(Json(price))
}
