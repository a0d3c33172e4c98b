//! # Catalog Handlers
//!
//! The global price list. Each item has one default rate and unit; customer
//! overrides live in [`super::overrides`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use mandi_core::{Item, ItemInput};

use crate::error::ApiResult;
use crate::state::AppState;

/// `GET /api/items`, ordered by name.
pub async fn list_items(State(state): State<AppState>) -> ApiResult<Json<Vec<Item>>> {
    Ok(Json(state.db().items().list().await?))
}

/// `POST /api/items`: insert, or update the unit and rate of an item with
/// the same name in any casing.
pub async fn upsert_item(
    State(state): State<AppState>,
    Json(input): Json<ItemInput>,
) -> ApiResult<Json<Item>> {
    let item = state.db().items().upsert(input).await?;
    info!(id = %item.id, name = %item.name, rate = %item.default_rate, "Catalog item saved");
    Ok(Json(item))
}

/// `DELETE /api/items/{id}`
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db().items().delete(&id).await?;
    info!(id = %id, "Catalog item deleted");
    Ok(StatusCode::NO_CONTENT)
}
