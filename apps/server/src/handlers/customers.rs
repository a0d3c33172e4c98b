use axum::extract::{Path, State};
use axum::Json;

use mandi_core::{Customer, CustomerInput, CustomerPriceOverride};

use crate::error::ApiResult;
use crate::state::AppState;

/// `GET /api/customers`
pub async fn list_customers(State(state): State<AppState>) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.db().customers().list().await?))
}

/// `POST /api/customers`
pub async fn upsert_customer(
    State(state): State<AppState>,
    Json(input): Json<CustomerInput>,
) -> ApiResult<Json<Customer>> {
    Ok(Json(state.db().customers().upsert(input).await?))
}

/// `GET /api/customers/{name}/overrides`
pub async fn list_customer_overrides(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<CustomerPriceOverride>>> {
    Ok(Json(state.db().overrides().list_for_customer(&name).await?))
}
