//! # mandi-core: Pure Business Logic for Mandi Billing
//!
//! This crate holds every rule of the billing workflow as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Mandi Billing Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Billing Frontend                             │   │
//! │  │   Master Sheet ──► Bill Form ──► Ledger ──► Monthly Summary    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP / JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    mandi-server (axum)                          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mandi-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐         │   │
//! │  │   │  money   │ │ pricing  │ │  sheet   │ │  ledger  │         │   │
//! │  │   │ Money    │ │ resolver │ │ SheetGrid│ │ finalize │         │   │
//! │  │   │ Quantity │ │ PriceBook│ │ project  │ │ summary  │         │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘         │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐                      │   │
//! │  │   │numbering │ │  import  │ │  codes   │                      │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘                      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    mandi-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Item, Override, Customer, Bill, MasterSheet)
//! - [`money`] - Integer `Money` (paise) and `Quantity` (thousandths)
//! - [`numbering`] - Sequence numbers and gap-free renumbering plans
//! - [`pricing`] - Override → catalog → fallback price resolution
//! - [`codes`] - Customer abbreviation codes used on master sheets
//! - [`sheet`] - Editable master sheet grid and customer projection
//! - [`ledger`] - Bill finalization, monthly ledger and summary grid
//! - [`import`] - Bulk override import and case-variant merge plans
//! - [`validation`] - Input validation rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use mandi_core::money::{line_amount, Money, Quantity};
//! use mandi_core::types::Unit;
//!
//! // 2.5 kg of tomatoes at ₹40/kg
//! let amount = line_amount(Quantity::from_milli(2_500), Money::from_paise(4_000), &Unit::Kg);
//! assert_eq!(amount.paise(), 10_000);
//!
//! // 500 gm of ginger at ₹120/kg - rate stays per kilo
//! let amount = line_amount(Quantity::from_whole(500), Money::from_paise(12_000), &Unit::Gm);
//! assert_eq!(amount.paise(), 6_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod codes;
pub mod error;
pub mod import;
pub mod ledger;
pub mod money;
pub mod numbering;
pub mod pricing;
pub mod sheet;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Quantity};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Unit assumed when neither an override nor a catalog entry names one.
pub const FALLBACK_UNIT: Unit = Unit::Kg;

/// Attempts a server-side caller makes when a freshly allocated sequence
/// number loses a race against a concurrent save.
pub const MAX_NUMBER_RETRIES: usize = 3;
