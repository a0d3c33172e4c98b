//! # Application State
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  Router::with_state(AppState)  ── cloned into every handler            │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────────┐  │
//! │  │  BillingService  │  │  ServerConfig    │  │  SheetState          │  │
//! │  │                  │  │                  │  │                      │  │
//! │  │  Database        │  │  Arc, read-only  │  │  Arc<Mutex<          │  │
//! │  │  (SQLite pool)   │  │  customer codes  │  │    SheetGrid>>       │  │
//! │  └──────────────────┘  └──────────────────┘  └──────────────────────┘  │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • Database has an internal connection pool                            │
//! │  • The in-progress sheet is locked for each edit                       │
//! │  • Config is read-only after startup                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use mandi_core::codes::CustomerCodes;
use mandi_core::sheet::SheetGrid;
use mandi_db::{BillingService, Database};

use crate::config::ServerConfig;

/// The master sheet being filled in today, shared by every client.
///
/// Held across `.await` while a save runs, hence the tokio mutex.
#[derive(Debug, Clone, Default)]
pub struct SheetState {
    inner: Arc<Mutex<SheetGrid>>,
}

impl SheetState {
    pub fn new(grid: SheetGrid) -> Self {
        SheetState {
            inner: Arc::new(Mutex::new(grid)),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, SheetGrid> {
        self.inner.lock().await
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub billing: BillingService,
    pub config: Arc<ServerConfig>,
    pub sheet: SheetState,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        AppState {
            billing: BillingService::new(db),
            config: Arc::new(config),
            sheet: SheetState::default(),
        }
    }

    pub fn db(&self) -> &Database {
        self.billing.db()
    }

    pub fn customer_codes(&self) -> &CustomerCodes {
        self.config.customer_codes()
    }
}
