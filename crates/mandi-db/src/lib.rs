//! # mandi-db: Database Layer for Mandi Billing
//!
//! SQLite storage for the billing workflow, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mandi Billing Data Flow                          │
//! │                                                                         │
//! │  HTTP handler (POST /api/bills)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     mandi-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │BillingService │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │ (billing.rs)  │───►│ ItemRepo      │    │  (embedded)  │  │   │
//! │  │   │               │    │ OverrideRepo  │    │              │  │   │
//! │  │   │ create_bill   │    │ CustomerRepo  │    │ 001_initial  │  │   │
//! │  │   │ ledger        │    │ BillRepo      │    │   _schema    │  │   │
//! │  │   │ save_grid     │    │ SheetRepo     │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                               │   │
//! │  │                    Database (pool.rs, SqlitePool)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL mode)                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`pool`] - Connection pool and repository accessors
//! - [`migrations`] - Embedded schema migrations
//! - [`repository`] - One repository per table family
//! - [`billing`] - Workflows spanning several repositories
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mandi_db::{BillingService, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("billing.db")).await?;
//! let next = db.bills().next_number().await?;
//!
//! let billing = BillingService::new(db.clone());
//! let bill = billing.create_bill(draft).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use billing::BillingService;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::bill::BillRepository;
pub use repository::customer::CustomerRepository;
pub use repository::item::ItemRepository;
pub use repository::price_override::OverrideRepository;
pub use repository::sheet::SheetRepository;
