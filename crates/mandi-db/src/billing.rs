//! # Billing Service
//!
//! Workflows that span more than one repository: finalizing and storing a
//! bill, writing its prices back into the override table, building monthly
//! reports, and turning master sheets into bill drafts.
//!
//! ## Create Bill
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BillDraft                                                             │
//! │     │                                                                   │
//! │     ├── billNo missing? ──► bills.next_number()                        │
//! │     ▼                                                                   │
//! │  finalize_bill() ── amounts and total recomputed                       │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  bills.insert()  ── one transaction ── DuplicateNumber on collision    │
//! │     │                                                                   │
//! │     ▼  (bill is now stored; nothing below can undo it)                 │
//! │  customers.upsert(name, address)        ─┐ failures are logged         │
//! │  overrides.upsert(line) for each line   ─┘ with warn! and ignored      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use std::future::Future;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use mandi_core::codes::CustomerCodes;
use mandi_core::ledger::{finalize_bill, LedgerStatement, SummaryGrid};
use mandi_core::numbering::Renumbering;
use mandi_core::pricing::{resolve_price, PriceBook, ResolvedPrice};
use mandi_core::sheet::{finalize_sheet, ProjectedLine, SheetGrid};
use mandi_core::{
    Bill, BillDraft, CustomerInput, MasterSheet, Money, OverrideInput, SheetDraft,
    MAX_NUMBER_RETRIES,
};

/// Multi-repository billing workflows over one [`Database`].
#[derive(Debug, Clone)]
pub struct BillingService {
    db: Database,
}

impl BillingService {
    pub fn new(db: Database) -> Self {
        BillingService { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Bills
    // =========================================================================

    /// Validates, numbers and stores a bill, then records the customer and
    /// the prices it used.
    ///
    /// ## Returns
    /// * `Ok(Bill)` - The stored bill with recomputed amounts
    /// * `Err(DbError::Validation)` - The draft was rejected; nothing stored
    /// * `Err(DbError::DuplicateNumber)` - `billNo` was taken; client retries
    pub async fn create_bill(&self, draft: BillDraft) -> DbResult<Bill> {
        let bill_no = match draft.bill_no {
            Some(number) => number,
            None => self.db.bills().next_number().await?,
        };

        let bill = finalize_bill(draft, bill_no, Uuid::new_v4().to_string(), Utc::now())?;
        self.db.bills().insert(&bill).await?;

        info!(
            id = %bill.id,
            bill_no = bill.bill_no,
            customer = %bill.customer.name,
            total = %bill.total_amount,
            "Bill created"
        );

        self.write_through(&bill).await;
        Ok(bill)
    }

    /// Best-effort: a failure here is logged and never undoes the bill.
    async fn write_through(&self, bill: &Bill) {
        let customer = CustomerInput {
            name: bill.customer.name.clone(),
            address: bill.customer.address.clone(),
            gst: None,
            phone: None,
        };
        if let Err(e) = self.db.customers().upsert(customer).await {
            warn!(bill_no = bill.bill_no, error = %e, "Failed to record customer from bill");
        }

        for line in bill.items.iter().filter(|l| !l.name.trim().is_empty()) {
            let observed = OverrideInput {
                customer_name: bill.customer.name.clone(),
                item_name: line.name.clone(),
                unit: line.unit.clone(),
                rate: line.rate,
            };
            if let Err(e) = self.db.overrides().upsert(observed).await {
                warn!(
                    bill_no = bill.bill_no,
                    item = %line.name,
                    error = %e,
                    "Failed to record price from bill"
                );
            }
        }
    }

    /// Deletes a bill and renumbers the rest.
    pub async fn delete_bill(&self, id: &str) -> DbResult<Vec<Renumbering>> {
        self.db.bills().delete_and_renumber(id).await
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// A customer's bills for one month with running balances.
    pub async fn ledger(
        &self,
        customer: &str,
        month: u32,
        year: i32,
        previous_balance: Money,
    ) -> DbResult<LedgerStatement> {
        let bills = self.db.bills().list_for_customer_month(customer, month, year).await?;
        let statement = LedgerStatement::build(customer, month, year, &bills, previous_balance)?;

        debug!(customer = %customer, month, year, bills = statement.entries.len(), "Ledger built");
        Ok(statement)
    }

    /// The item × day summary for a customer's month.
    pub async fn summary(&self, customer: &str, month: u32, year: i32) -> DbResult<SummaryGrid> {
        let bills = self.db.bills().list_for_customer_month(customer, month, year).await?;
        Ok(SummaryGrid::build(customer, month, year, &bills)?)
    }

    // =========================================================================
    // Prices
    // =========================================================================

    /// Effective price of an item, optionally for a customer.
    pub async fn resolve_price(&self, item: &str, customer: Option<&str>) -> DbResult<ResolvedPrice> {
        let catalog_item = self.db.items().get_by_name(item).await?;
        let found_override = match customer.filter(|c| !c.trim().is_empty()) {
            Some(customer) => self.db.overrides().get(customer, item).await?,
            None => None,
        };
        Ok(resolve_price(found_override.as_ref(), catalog_item.as_ref()))
    }

    /// The catalog plus one customer's overrides, for resolving many items.
    pub async fn price_book_for(&self, customer: &str) -> DbResult<PriceBook> {
        let items = self.db.items().list().await?;
        let overrides = self.db.overrides().list_for_customer(customer).await?;
        Ok(PriceBook::new(items, overrides))
    }

    // =========================================================================
    // Master Sheets
    // =========================================================================

    /// Draft bill lines for `customer` from the sheet saved on `date`.
    ///
    /// Empty when no sheet exists for the date or no column matches.
    pub async fn draft_from_sheet(
        &self,
        customer: &str,
        date: NaiveDate,
        codes: &CustomerCodes,
    ) -> DbResult<Vec<ProjectedLine>> {
        let Some(sheet) = self.db.sheets().find_by_date(date).await? else {
            debug!(%date, "No master sheet for date");
            return Ok(Vec::new());
        };

        let customer_name = codes.name_for(customer).unwrap_or(customer);
        let prices = self.price_book_for(customer_name).await?;
        let grid = SheetGrid::from_sheet(&sheet);

        Ok(grid.project_for_customer(customer, codes, &prices))
    }

    /// Validates and stores a submitted sheet.
    pub async fn create_sheet(&self, draft: SheetDraft) -> DbResult<MasterSheet> {
        let sheet_no = match draft.sheet_no {
            Some(number) => number,
            None => self.db.sheets().next_number().await?,
        };

        let sheet = finalize_sheet(draft, sheet_no, Uuid::new_v4().to_string(), Utc::now())?;
        self.db.sheets().insert(&sheet).await?;

        info!(id = %sheet.id, sheet_no = sheet.sheet_no, date = %sheet.date, "Master sheet saved");
        Ok(sheet)
    }

    /// Saves the in-progress grid under a freshly allocated number.
    ///
    /// The number is allocated here, so a collision with a concurrent save
    /// is retried with a new number rather than reported to the caller.
    pub async fn save_grid(
        &self,
        grid: &SheetGrid,
        date: NaiveDate,
        vehicle_no: &str,
    ) -> DbResult<MasterSheet> {
        retry_on_taken_number(move || self.create_sheet(grid.to_draft(date, vehicle_no))).await
    }
}

/// Runs `op` until it stops failing with `DuplicateNumber`, at most
/// [`MAX_NUMBER_RETRIES`] times. `op` must allocate a fresh number per call.
async fn retry_on_taken_number<T, F, Fut>(mut op: F) -> DbResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Err(DbError::DuplicateNumber { kind, number }) if attempt < MAX_NUMBER_RETRIES => {
                warn!(attempt, %kind, number, "Number taken, retrying");
            }
            result => return result,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use mandi_core::numbering::SequenceKind;
    use mandi_core::pricing::PriceSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use mandi_core::{BillCustomer, BillLineDraft, ItemInput, Quantity, Unit, ValidationError};

    async fn service() -> BillingService {
        BillingService::new(Database::new(DbConfig::in_memory()).await.unwrap())
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn draft(customer: &str, date: NaiveDate, lines: Vec<(&str, Unit, i64, i64)>) -> BillDraft {
        BillDraft {
            bill_no: None,
            date,
            customer: BillCustomer {
                name: customer.to_string(),
                address: "MG Road".to_string(),
            },
            items: lines
                .into_iter()
                .map(|(name, unit, qty, rupees)| BillLineDraft {
                    name: name.to_string(),
                    unit,
                    qty: Quantity::from_whole(qty),
                    rate: Money::from_rupees(rupees),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_create_bill_writes_through() {
        let svc = service().await;

        let bill = svc
            .create_bill(draft(
                "Omex",
                day(2),
                vec![("Tomato", Unit::Kg, 5, 22), ("", Unit::Kg, 0, 0), ("Ginger", Unit::Gm, 250, 200)],
            ))
            .await
            .unwrap();

        assert_eq!(bill.bill_no, 1);
        assert_eq!(bill.items.len(), 2);
        assert_eq!(bill.total_amount, Money::from_rupees(160));

        let customer = svc.db().customers().get_by_name("omex").await.unwrap().unwrap();
        assert_eq!(customer.address, "MG Road");

        let overrides = svc.db().overrides().list_for_customer("Omex").await.unwrap();
        assert_eq!(overrides.len(), 2);

        let price = svc.resolve_price("TOMATO", Some("omex")).await.unwrap();
        assert_eq!(price.rate, Money::from_rupees(22));
        assert_eq!(price.source, PriceSource::Override);
    }

    #[tokio::test]
    async fn test_rejected_draft_stores_nothing() {
        let svc = service().await;

        let err = svc
            .create_bill(draft("Omex", day(2), vec![("", Unit::Kg, 1, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(ValidationError::Required { .. })));

        assert!(svc.db().bills().list().await.unwrap().is_empty());
        assert!(svc.db().customers().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prefetched_number_collision() {
        let svc = service().await;

        let mut first = draft("Omex", day(2), vec![("Tomato", Unit::Kg, 1, 20)]);
        first.bill_no = Some(1);
        let mut second = draft("Perch", day(2), vec![("Onion", Unit::Kg, 1, 30)]);
        second.bill_no = Some(1);

        svc.create_bill(first).await.unwrap();
        let err = svc.create_bill(second).await.unwrap_err();
        assert!(matches!(err, DbError::DuplicateNumber { number: 1, .. }));
    }

    #[tokio::test]
    async fn test_resolve_price_precedence() {
        let svc = service().await;

        svc.db()
            .items()
            .upsert(ItemInput {
                name: "Tomato".into(),
                unit: Unit::Kg,
                default_rate: Money::from_rupees(20),
            })
            .await
            .unwrap();
        svc.db()
            .overrides()
            .upsert(OverrideInput {
                customer_name: "Omex".into(),
                item_name: "Tomato".into(),
                unit: Unit::Kg,
                rate: Money::zero(),
            })
            .await
            .unwrap();

        // A zero override does not hide the catalog price
        let price = svc.resolve_price("tomato", Some("Omex")).await.unwrap();
        assert_eq!(price.rate, Money::from_rupees(20));
        assert_eq!(price.source, PriceSource::Catalog);

        let price = svc.resolve_price("Okra", None).await.unwrap();
        assert_eq!(price, ResolvedPrice::fallback());
    }

    #[tokio::test]
    async fn test_draft_from_sheet_uses_codes_and_prices() {
        let svc = service().await;

        svc.db()
            .items()
            .upsert(ItemInput {
                name: "Tomato".into(),
                unit: Unit::Kg,
                default_rate: Money::from_rupees(20),
            })
            .await
            .unwrap();
        svc.db()
            .overrides()
            .upsert(OverrideInput {
                customer_name: "Omex".into(),
                item_name: "Onion".into(),
                unit: Unit::Kg,
                rate: Money::from_rupees(35),
            })
            .await
            .unwrap();

        let mut grid = SheetGrid::new();
        grid.add_column("OMX").unwrap();
        grid.add_column("PER").unwrap();
        grid.set_quantity("Tomato", "OMX", Quantity::from_whole(5)).unwrap();
        grid.set_quantity("Onion", "OMX", Quantity::from_whole(2)).unwrap();
        grid.set_quantity("Garlic", "PER", Quantity::from_whole(1)).unwrap();

        let saved = svc.save_grid(&grid, day(4), "KA-01").await.unwrap();
        assert_eq!(saved.sheet_no, 1);

        let codes = CustomerCodes::default();
        let lines = svc.draft_from_sheet("Omex", day(4), &codes).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].name, "Tomato");
        assert_eq!(lines[0].amount, Money::from_rupees(100));
        assert_eq!(lines[1].rate, Money::from_rupees(35));

        let total: Money = lines.iter().map(|l| l.amount).sum();
        assert_eq!(total, Money::from_rupees(170));

        assert!(svc.draft_from_sheet("Omex", day(5), &codes).await.unwrap().is_empty());
        assert!(svc.draft_from_sheet("Refuge", day(4), &codes).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_grid_numbers_sequentially() {
        let svc = service().await;

        let mut grid = SheetGrid::new();
        grid.add_column("OMX").unwrap();
        grid.set_quantity("Tomato", "OMX", Quantity::from_whole(1)).unwrap();

        let first = svc.save_grid(&grid, day(1), "").await.unwrap();
        let second = svc.save_grid(&grid, day(1), "").await.unwrap();
        assert_eq!((first.sheet_no, second.sheet_no), (1, 2));
    }

    fn empty_sheet(sheet_no: i64, vehicle_no: &str) -> SheetDraft {
        SheetDraft {
            sheet_no: Some(sheet_no),
            date: day(1),
            vehicle_no: vehicle_no.to_string(),
            header_columns: vec!["OMX".to_string()],
            data_rows: vec![],
        }
    }

    #[tokio::test]
    async fn test_retry_after_number_is_taken() {
        let svc = service().await;
        let attempts = AtomicUsize::new(0);
        let (svc_ref, attempts_ref) = (&svc, &attempts);

        let sheet = retry_on_taken_number(move || async move {
            let number = svc_ref.db().sheets().next_number().await?;
            if attempts_ref.fetch_add(1, Ordering::SeqCst) == 0 {
                // Another save takes the number between allocation and insert
                svc_ref.create_sheet(empty_sheet(number, "RIVAL")).await?;
            }
            svc_ref.create_sheet(empty_sheet(number, "")).await
        })
        .await
        .unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(sheet.sheet_no, 2);

        let stored = svc.db().sheets().list().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].vehicle_no, "RIVAL");
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_limit() {
        let attempts = AtomicUsize::new(0);
        let attempts_ref = &attempts;

        let result: DbResult<()> = retry_on_taken_number(move || async move {
            attempts_ref.fetch_add(1, Ordering::SeqCst);
            Err(DbError::DuplicateNumber {
                kind: SequenceKind::Sheet,
                number: 1,
            })
        })
        .await;

        assert!(matches!(result, Err(DbError::DuplicateNumber { number: 1, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), MAX_NUMBER_RETRIES);
    }

    #[tokio::test]
    async fn test_ledger_and_summary() {
        let svc = service().await;

        svc.create_bill(draft("Omex", day(2), vec![("Tomato", Unit::Kg, 5, 20)]))
            .await
            .unwrap();
        svc.create_bill(draft("Omex", day(5), vec![("Tomato", Unit::Kg, 4, 25)]))
            .await
            .unwrap();
        svc.create_bill(draft("Perch", day(5), vec![("Tomato", Unit::Kg, 9, 25)]))
            .await
            .unwrap();

        let statement = svc.ledger("omex", 3, 2024, Money::from_rupees(50)).await.unwrap();
        assert_eq!(statement.entries.len(), 2);
        assert_eq!(statement.month_total, Money::from_rupees(200));
        assert_eq!(statement.grand_total, Money::from_rupees(250));

        let grid = svc.summary("Omex", 3, 2024).await.unwrap();
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.grand_total, Money::from_rupees(200));
    }
}
