//! # Repository Module
//!
//! Database repository implementations for Mandi Billing.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler / BillingService                                         │
//! │       │                                                                 │
//! │       │  db.overrides().upsert(input)                                  │
//! │       ▼                                                                 │
//! │  OverrideRepository                                                    │
//! │  ├── list_all / list_for_customer / get                               │
//! │  ├── upsert / delete / delete_all                                      │
//! │  └── bulk_import / merge_case_variants                                 │
//! │       │                                                                 │
//! │       │  SQL (runtime-checked, bound parameters)                       │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Rows come back as `*Record` structs (plain SQL types) and are         │
//! │  converted into mandi-core types at the repository boundary.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ItemRepository`](item::ItemRepository) - Catalog items
//! - [`OverrideRepository`](price_override::OverrideRepository) - Customer price overrides
//! - [`CustomerRepository`](customer::CustomerRepository) - Customer records
//! - [`BillRepository`](bill::BillRepository) - Bills, numbering and ledger queries
//! - [`SheetRepository`](sheet::SheetRepository) - Saved master sheets

pub mod bill;
pub mod customer;
pub mod item;
pub mod price_override;
pub mod sheet;
