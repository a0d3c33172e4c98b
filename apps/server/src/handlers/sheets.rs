//! # Master Sheet Handlers
//!
//! Saved sheets are immutable records. The in-progress grid is a single
//! shared [`SheetGrid`] edited one command at a time.
//!
//! ## In-Progress Grid
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Master Sheet Editing                                 │
//! │                                                                         │
//! │  Client Action            Route                      Grid Change        │
//! │  ─────────────            ─────                      ───────────        │
//! │                                                                         │
//! │  Open screen ───────────► GET  current ────────────► (read only)       │
//! │                                                                         │
//! │  Add hotel column ──────► POST current/edit ───────► columns.push      │
//! │                           {"op":"addColumn"}                           │
//! │                                                                         │
//! │  "tomato five for omx" ─► POST current/edit ───────► cell = 5          │
//! │                           {"op":"setQuantity"}                         │
//! │                                                                         │
//! │  Save ──────────────────► POST current/save ───────► new sheet #N,     │
//! │                                                      quantities reset  │
//! │                                                                         │
//! │  NOTE: every route locks the grid; a save holds the lock until the     │
//! │        sheet is stored so no edit slips in between.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use mandi_core::sheet::{SheetEdit, SheetGrid, SheetGridView};
use mandi_core::{MasterSheet, SheetDraft};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// =============================================================================
// Saved Sheets
// =============================================================================

/// `GET /api/sheets`, newest number first.
pub async fn list_sheets(State(state): State<AppState>) -> ApiResult<Json<Vec<MasterSheet>>> {
    Ok(Json(state.db().sheets().list().await?))
}

/// `POST /api/sheets`
pub async fn create_sheet(
    State(state): State<AppState>,
    Json(draft): Json<SheetDraft>,
) -> ApiResult<(StatusCode, Json<MasterSheet>)> {
    let sheet = state.billing.create_sheet(draft).await?;
    Ok((StatusCode::CREATED, Json(sheet)))
}

/// `GET /api/sheets/next-number`
pub async fn next_sheet_number(State(state): State<AppState>) -> ApiResult<Json<i64>> {
    Ok(Json(state.db().sheets().next_number().await?))
}

#[derive(Debug, Deserialize)]
pub struct ByDateQuery {
    pub date: NaiveDate,
}

/// `GET /api/sheets/by-date?date=`: `null` when nothing was saved that day.
pub async fn find_sheet_by_date(
    State(state): State<AppState>,
    Query(query): Query<ByDateQuery>,
) -> ApiResult<Json<Option<MasterSheet>>> {
    Ok(Json(state.db().sheets().find_by_date(query.date).await?))
}

// =============================================================================
// In-Progress Grid
// =============================================================================

/// `GET /api/sheets/current`
pub async fn current_grid(State(state): State<AppState>) -> Json<SheetGridView> {
    Json(state.sheet.lock().await.view())
}

/// `POST /api/sheets/current/edit`
pub async fn edit_grid(
    State(state): State<AppState>,
    Json(edit): Json<SheetEdit>,
) -> ApiResult<Json<SheetGridView>> {
    let mut grid = state.sheet.lock().await;
    debug!(?edit, "Applying sheet edit");
    grid.apply(edit)?;
    Ok(Json(grid.view()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveGridRequest {
    pub date: NaiveDate,

    #[serde(default)]
    pub vehicle_no: String,
}

/// `POST /api/sheets/current/save`
///
/// Stores the grid under the next sheet number, then zeroes its quantities
/// (rows and columns stay for tomorrow's sheet).
pub async fn save_grid(
    State(state): State<AppState>,
    Json(request): Json<SaveGridRequest>,
) -> ApiResult<(StatusCode, Json<MasterSheet>)> {
    let mut grid = state.sheet.lock().await;
    let sheet = state
        .billing
        .save_grid(&grid, request.date, &request.vehicle_no)
        .await?;

    grid.clear_quantities();
    info!(sheet_no = sheet.sheet_no, "In-progress sheet saved and cleared");
    Ok((StatusCode::CREATED, Json(sheet)))
}

/// Replaces the in-progress grid with a saved sheet, for corrections.
///
/// `POST /api/sheets/current/load?date=`
pub async fn load_grid(
    State(state): State<AppState>,
    Query(query): Query<ByDateQuery>,
) -> ApiResult<Json<SheetGridView>> {
    let Some(sheet) = state.db().sheets().find_by_date(query.date).await? else {
        return Err(ApiError::not_found("Master sheet", &query.date.to_string()));
    };

    let mut grid = state.sheet.lock().await;
    *grid = SheetGrid::from_sheet(&sheet);
    info!(sheet_no = sheet.sheet_no, "Saved sheet loaded into the grid");
    Ok(Json(grid.view()))
}
