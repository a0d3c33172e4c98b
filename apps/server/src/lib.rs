//! # Mandi Server
//!
//! HTTP/JSON API for the billing workflow.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Mandi Server Routes                             │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Catalog       │  │  Prices        │  │  Bills                     ││
//! │  │                │  │                │  │                            ││
//! │  │ • /api/items   │  │ • /api/overr.. │  │ • /api/bills               ││
//! │  │ • /api/custom..│  │ • /bulk        │  │ • /next-number             ││
//! │  │                │  │ • /resolve     │  │ • /draft                   ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────────────────────────────────────┐│
//! │  │  Reports       │  │  Master Sheets                                 ││
//! │  │                │  │                                                ││
//! │  │ • /api/ledger  │  │ • /api/sheets, /next-number, /by-date          ││
//! │  │ • /api/summary │  │ • /api/sheets/current (+ /edit /save /load)    ││
//! │  └────────────────┘  └────────────────────────────────────────────────┘│
//! │                                                                         │
//! │  Layers: TraceLayer (request spans) ─► CORS (any origin)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

// Re-exports
pub use config::ServerConfig;
pub use error::{ApiError, ErrorCode};
pub use state::AppState;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{bills, customers, health, items, overrides, reports, sheets};

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // Catalog
        .route("/items", get(items::list_items).post(items::upsert_item))
        .route("/items/{id}", delete(items::delete_item))
        .route(
            "/customers",
            get(customers::list_customers).post(customers::upsert_customer),
        )
        .route(
            "/customers/{name}/overrides",
            get(customers::list_customer_overrides),
        )
        // Customer prices
        .route(
            "/overrides",
            get(overrides::list_overrides)
                .post(overrides::upsert_override)
                .delete(overrides::delete_all_overrides),
        )
        .route("/overrides/bulk", post(overrides::bulk_upsert_overrides))
        .route(
            "/overrides/merge-case-variants",
            post(overrides::merge_case_variants),
        )
        .route("/overrides/{id}", delete(overrides::delete_override))
        .route("/prices/resolve", get(overrides::resolve_price))
        // Bills
        .route("/bills", get(bills::list_bills).post(bills::create_bill))
        .route("/bills/next-number", get(bills::next_bill_number))
        .route("/bills/draft", get(bills::draft_from_sheet))
        .route("/bills/{id}", get(bills::get_bill).delete(bills::delete_bill))
        // Reports
        .route("/ledger", get(reports::query_ledger))
        .route("/summary", get(reports::query_summary))
        // Master sheets
        .route("/sheets", get(sheets::list_sheets).post(sheets::create_sheet))
        .route("/sheets/next-number", get(sheets::next_sheet_number))
        .route("/sheets/by-date", get(sheets::find_sheet_by_date))
        .route("/sheets/current", get(sheets::current_grid))
        .route("/sheets/current/edit", post(sheets::edit_grid))
        .route("/sheets/current/save", post(sheets::save_grid))
        .route("/sheets/current/load", post(sheets::load_grid));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
