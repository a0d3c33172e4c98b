//! # Seed Data Generator
//!
//! Loads a small catalog, a few customer overrides, a master sheet and a
//! sample bill for local development.
//!
//! ## Usage
//! ```bash
//! cargo run -p mandi-db --bin seed
//!
//! # Specify database path
//! cargo run -p mandi-db --bin seed -- --db ./data/billing.db
//! ```

use anyhow::Context;
use chrono::Utc;
use std::env;

use mandi_core::sheet::SheetGrid;
use mandi_core::{
    BillCustomer, BillDraft, BillLineDraft, ItemInput, Money, OverrideInput, Quantity, Unit,
};
use mandi_db::{BillingService, Database, DbConfig};

/// (name, unit, rate in paise)
const CATALOG: &[(&str, &str, i64)] = &[
    ("Tomato", "Kg", 2_500),
    ("Onion", "Kg", 3_200),
    ("Potato", "Kg", 2_800),
    ("Carrot", "Kg", 4_500),
    ("Ginger", "Gm", 12_000),
    ("Garlic", "Gm", 18_000),
    ("Coriander", "Bunch", 1_000),
    ("Mint", "Bunch", 800),
    ("Lemon", "Pcs", 300),
    ("Banana", "Doz", 6_000),
    ("Cabbage", "Kg", 2_000),
    ("Capsicum", "Kg", 6_000),
];

/// (customer, item, unit, rate in paise)
const OVERRIDES: &[(&str, &str, &str, i64)] = &[
    ("Omex", "Tomato", "Kg", 2_200),
    ("Omex", "Onion", "Kg", 3_000),
    ("Perch", "Ginger", "Gm", 11_000),
    ("Carnatic Cafe", "Coriander", "Bunch", 900),
];

/// (column, item, quantity in thousandths)
const SHEET: &[(&str, &str, i64)] = &[
    ("OMX", "Tomato", 12_000),
    ("OMX", "Onion", 8_500),
    ("OMX", "Ginger", 500_000),
    ("PER", "Tomato", 6_000),
    ("PER", "Ginger", 250_000),
    ("CC", "Coriander", 10_000),
    ("CC", "Lemon", 40_000),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./mandi_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if let Some(path) = args.get(i + 1) {
                    db_path = path.clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: seed [--db PATH]");
                return Ok(());
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    println!("🌱 Seeding {}", db_path);

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;

    for (name, unit, rate) in CATALOG {
        db.items()
            .upsert(ItemInput {
                name: name.to_string(),
                unit: Unit::from(unit.to_string()),
                default_rate: Money::from_paise(*rate),
            })
            .await
            .with_context(|| format!("inserting item {name}"))?;
    }
    println!("   {} catalog items", CATALOG.len());

    for (customer, item, unit, rate) in OVERRIDES {
        db.overrides()
            .upsert(OverrideInput {
                customer_name: customer.to_string(),
                item_name: item.to_string(),
                unit: Unit::from(unit.to_string()),
                rate: Money::from_paise(*rate),
            })
            .await
            .with_context(|| format!("inserting override {customer}/{item}"))?;
    }
    println!("   {} customer overrides", OVERRIDES.len());

    let billing = BillingService::new(db.clone());
    let today = Utc::now().date_naive();

    let mut grid = SheetGrid::new();
    for (column, item, milli) in SHEET {
        grid.add_column(column)?;
        grid.set_quantity(item, column, Quantity::from_milli(*milli))?;
    }
    let sheet = billing.save_grid(&grid, today, "KA-01-AB-1234").await?;
    println!("   master sheet #{} ({} rows)", sheet.sheet_no, sheet.data_rows.len());

    let bill = billing
        .create_bill(BillDraft {
            bill_no: None,
            date: today,
            customer: BillCustomer {
                name: "Omex".to_string(),
                address: "12 MG Road, Bengaluru".to_string(),
            },
            items: vec![
                BillLineDraft {
                    name: "Tomato".to_string(),
                    unit: Unit::Kg,
                    qty: Quantity::from_whole(12),
                    rate: Money::from_paise(2_200),
                },
                BillLineDraft {
                    name: "Ginger".to_string(),
                    unit: Unit::Gm,
                    qty: Quantity::from_whole(500),
                    rate: Money::from_paise(12_000),
                },
            ],
        })
        .await?;
    println!(
        "   bill #{} for {} (total {})",
        bill.bill_no, bill.customer.name, bill.total_amount
    );

    db.close().await;
    println!("✅ Done");
    Ok(())
}

