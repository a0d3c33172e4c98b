//! # HTTP Handlers
//!
//! One module per resource. Handlers stay thin: extract, call the
//! repository or [`BillingService`](mandi_db::BillingService), map errors.
//!
//! ## Available Routes
//!
//! | Module | Routes |
//! |--------|--------|
//! | `health` | `/health` |
//! | `items` | `/api/items` |
//! | `customers` | `/api/customers` |
//! | `overrides` | `/api/overrides`, `/api/prices/resolve` |
//! | `bills` | `/api/bills` |
//! | `reports` | `/api/ledger`, `/api/summary` |
//! | `sheets` | `/api/sheets` |

pub mod bills;
pub mod customers;
pub mod health;
pub mod items;
pub mod overrides;
pub mod reports;
pub mod sheets;
