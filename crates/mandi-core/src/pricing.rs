//! # Price Resolution
//!
//! The single place that decides what a customer pays for an item.
//!
//! ## Precedence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve(item, customer?)                                              │
//! │       │                                                                 │
//! │       ├─► 1. override(customer, item) with rate > 0 ──► Override       │
//! │       │       (a recorded zero never masks the catalog)                │
//! │       │                                                                 │
//! │       ├─► 2. catalog(item) ─────────────────────────► Catalog          │
//! │       │                                                                 │
//! │       └─► 3. (₹0, Kg) ──────────────────────────────► Fallback         │
//! │                                                                         │
//! │  Call sites: price autosuggest, voice item add, sheet → bill projection│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{normalize_key, CustomerPriceOverride, Item, Unit};
use crate::FALLBACK_UNIT;

/// Where a resolved price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Override,
    Catalog,
    Fallback,
}

/// The effective (rate, unit) for an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ResolvedPrice {
    #[ts(type = "number")]
    pub rate: Money,

    #[ts(type = "string")]
    pub unit: Unit,

    pub source: PriceSource,
}

impl ResolvedPrice {
    pub fn fallback() -> Self {
        ResolvedPrice {
            rate: Money::zero(),
            unit: FALLBACK_UNIT,
            source: PriceSource::Fallback,
        }
    }
}

/// Applies the precedence rules to already-fetched candidates.
///
/// ```rust
/// use mandi_core::pricing::{resolve_price, PriceSource};
///
/// let price = resolve_price(None, None);
/// assert_eq!(price.source, PriceSource::Fallback);
/// assert!(price.rate.is_zero());
/// ```
pub fn resolve_price(
    customer_override: Option<&CustomerPriceOverride>,
    catalog_item: Option<&Item>,
) -> ResolvedPrice {
    if let Some(found) = customer_override.filter(|o| o.rate.is_positive()) {
        return ResolvedPrice {
            rate: found.rate,
            unit: found.unit.clone(),
            source: PriceSource::Override,
        };
    }

    if let Some(item) = catalog_item {
        return ResolvedPrice {
            rate: item.default_rate,
            unit: item.unit.clone(),
            source: PriceSource::Catalog,
        };
    }

    ResolvedPrice::fallback()
}

// =============================================================================
// Price Lookup
// =============================================================================

/// Read access to the two price tables, by normalized key.
///
/// Implementors only answer lookups; precedence lives in
/// [`PriceLookup::resolve`] so every caller gets identical behavior.
pub trait PriceLookup {
    fn catalog_item(&self, item_key: &str) -> Option<&Item>;

    fn customer_override(&self, customer_key: &str, item_key: &str)
        -> Option<&CustomerPriceOverride>;

    /// Resolves the effective price of `item_name` for `customer_name`.
    fn resolve(&self, item_name: &str, customer_name: Option<&str>) -> ResolvedPrice {
        let item_key = normalize_key(item_name);
        let found_override = customer_name
            .map(normalize_key)
            .filter(|customer_key| !customer_key.is_empty())
            .and_then(|customer_key| self.customer_override(&customer_key, &item_key));
        resolve_price(found_override, self.catalog_item(&item_key))
    }
}

/// In-memory price tables, loaded once per request.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    catalog: HashMap<String, Item>,
    overrides: HashMap<(String, String), CustomerPriceOverride>,
}

impl PriceBook {
    /// Builds a price book from catalog items and overrides.
    ///
    /// Overrides are expected in normalized form; their keys are normalized
    /// again here so stray legacy casing still matches.
    pub fn new(
        items: impl IntoIterator<Item = Item>,
        overrides: impl IntoIterator<Item = CustomerPriceOverride>,
    ) -> Self {
        let catalog = items.into_iter().map(|item| (item.key(), item)).collect();
        let overrides = overrides
            .into_iter()
            .map(|o| {
                (
                    (normalize_key(&o.customer_name), normalize_key(&o.item_name)),
                    o,
                )
            })
            .collect();
        PriceBook { catalog, overrides }
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty() && self.overrides.is_empty()
    }
}

impl PriceLookup for PriceBook {
    fn catalog_item(&self, item_key: &str) -> Option<&Item> {
        self.catalog.get(item_key)
    }

    fn customer_override(
        &self,
        customer_key: &str,
        item_key: &str,
    ) -> Option<&CustomerPriceOverride> {
        self.overrides
            .get(&(customer_key.to_string(), item_key.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(name: &str, unit: Unit, rupees: i64) -> Item {
        Item {
            id: format!("item-{name}"),
            name: name.to_string(),
            unit,
            default_rate: Money::from_rupees(rupees),
            updated_at: Utc::now(),
        }
    }

    fn price_override(customer: &str, item: &str, unit: Unit, rupees: i64) -> CustomerPriceOverride {
        CustomerPriceOverride {
            id: format!("ovr-{customer}-{item}"),
            customer_name: normalize_key(customer),
            item_name: normalize_key(item),
            unit,
            rate: Money::from_rupees(rupees),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_tomato_scenario() {
        let catalog = vec![item("Tomato", Unit::Kg, 20)];

        // No override → catalog default
        let book = PriceBook::new(catalog.clone(), vec![]);
        let price = book.resolve("Tomato", Some("Omex"));
        assert_eq!(price.rate, Money::from_rupees(20));
        assert_eq!(price.unit, Unit::Kg);
        assert_eq!(price.source, PriceSource::Catalog);

        // Positive override wins
        let book = PriceBook::new(
            catalog.clone(),
            vec![price_override("Omex", "Tomato", Unit::Kg, 25)],
        );
        let price = book.resolve("Tomato", Some("Omex"));
        assert_eq!(price.rate, Money::from_rupees(25));
        assert_eq!(price.source, PriceSource::Override);

        // Zero override is ignored
        let book = PriceBook::new(catalog, vec![price_override("Omex", "Tomato", Unit::Kg, 0)]);
        let price = book.resolve("Tomato", Some("Omex"));
        assert_eq!(price.rate, Money::from_rupees(20));
        assert_eq!(price.source, PriceSource::Catalog);
    }

    #[test]
    fn test_lookup_is_case_and_whitespace_insensitive() {
        let book = PriceBook::new(
            vec![item("Green Chilli", Unit::Kg, 60)],
            vec![price_override("Carnatic Cafe", "Green Chilli", Unit::Gm, 70)],
        );

        let price = book.resolve("  green CHILLI ", Some("CARNATIC cafe "));
        assert_eq!(price.rate, Money::from_rupees(70));
        assert_eq!(price.unit, Unit::Gm);
    }

    #[test]
    fn test_override_unit_replaces_catalog_unit() {
        let book = PriceBook::new(
            vec![item("Coriander", Unit::Kg, 80)],
            vec![price_override("Perch", "Coriander", Unit::Bunch, 10)],
        );
        assert_eq!(book.resolve("Coriander", Some("Perch")).unit, Unit::Bunch);
        assert_eq!(book.resolve("Coriander", Some("Manam")).unit, Unit::Kg);
        assert_eq!(book.resolve("Coriander", None).unit, Unit::Kg);
    }

    #[test]
    fn test_unknown_item_falls_back() {
        let book = PriceBook::default();
        assert!(book.is_empty());
        assert_eq!(book.resolve("Dragon Fruit", Some("Omex")), ResolvedPrice::fallback());
    }

    #[test]
    fn test_override_without_catalog_entry() {
        let book = PriceBook::new(vec![], vec![price_override("Refuge", "Basil", Unit::Gm, 300)]);
        let price = book.resolve("Basil", Some("Refuge"));
        assert_eq!(price.source, PriceSource::Override);

        let price = book.resolve("Basil", Some(""));
        assert_eq!(price.source, PriceSource::Fallback);
    }
}
