//! # Seed Data Generator
//!
//! Populates the database with demo invoices for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 invoices (default) into the configured database
//! cargo run -p tally-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p tally-db --bin seed -- --invoices 1000
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally_dev.db
//! ```
//!
//! ## Generated Data
//! - The four reference lists (branches, warehouses, payment methods, reps)
//! - Sale invoices spread over the current year, 1 to 4 lines each
//! - A return against every tenth invoice
//!
//! Then prints the dashboard summary, which is net of those returns.

use chrono::{Datelike, NaiveDate, Utc};
use std::env;
use std::path::PathBuf;
use tally_core::reference::{ReferenceEntry, ReferenceKind};
use tally_core::returns::{ReturnLineRequest, ReturnRequest};
use tally_core::{Customer, InvoiceDraft, InvoiceLine};
use tally_db::{Database, TallyConfig};

const BRANCHES: &[(&str, &str)] = &[("br-01", "Downtown"), ("br-02", "Airport"), ("br-03", "Harbor")];
const WAREHOUSES: &[(&str, &str)] = &[("wh-01", "Main Warehouse"), ("wh-02", "Cold Store")];
const PAYMENT_METHODS: &[(&str, &str)] = &[("cash", "Cash"), ("card", "Card"), ("credit", "On Account")];
const SALES_REPS: &[(&str, &str)] = &[
    ("rep-01", "Omar Haddad"),
    ("rep-02", "Layla Nasser"),
    ("rep-03", "Sami Aziz"),
    ("rep-04", "Dana Karim"),
];

/// Item catalogue: (item number, name, unit, unit price)
const ITEMS: &[(&str, &str, &str, f64)] = &[
    ("RICE-05", "Basmati Rice 5kg", "bag", 42.50),
    ("OIL-02", "Sunflower Oil 2L", "bottle", 18.75),
    ("TEA-100", "Black Tea 100 bags", "box", 12.00),
    ("SUG-01", "White Sugar 1kg", "kg", 4.25),
    ("MLK-01", "Full Cream Milk 1L", "carton", 5.50),
    ("FLR-10", "Flour 10kg", "bag", 31.00),
    ("DAT-01", "Dates 1kg", "box", 27.90),
    ("COF-250", "Ground Coffee 250g", "pack", 22.40),
];

const DISCOUNTS: &[f64] = &[0.0, 0.0, 5.0, 10.0];
const TAX_RATES: &[f64] = &[15.0, 15.0, 0.0];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tally_db::init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--invoices" | "-n" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally ERP Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --invoices <N>  Number of invoices to generate (default: 200)");
                println!("  -d, --db <PATH>     Database file path (default: from tally.toml)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = TallyConfig::load_or_default(None);
    let mut db_config = config.db_config();
    if let Some(path) = db_path {
        db_config.database_path = path;
    }

    println!("Tally ERP Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_config.database_path.display());
    println!("Invoices: {}", count);
    println!();

    let db = Database::new(db_config).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.invoices().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} invoices", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Reference lists
    let references = db.references();
    for (kind, list) in [
        (ReferenceKind::Branch, BRANCHES),
        (ReferenceKind::Warehouse, WAREHOUSES),
        (ReferenceKind::PaymentMethod, PAYMENT_METHODS),
        (ReferenceKind::SalesRep, SALES_REPS),
    ] {
        for (id, name) in list {
            references
                .upsert(
                    kind,
                    &ReferenceEntry {
                        id: id.to_string(),
                        name: name.to_string(),
                    },
                )
                .await?;
        }
    }
    println!("✓ Reference lists written");

    println!();
    println!("Generating invoices...");

    let year = Utc::now().year();
    let start = std::time::Instant::now();
    let mut generated = 0;
    let mut returned = 0;

    for seed in 0..count {
        let draft = generate_invoice(seed, year);
        let number = draft.invoice_number.clone();

        if let Err(e) = db.invoices().create(draft).await {
            eprintln!("Failed to insert {}: {}", number, e.user_message());
            continue;
        }
        generated += 1;

        if seed % 10 == 9 {
            match db.returns().submit(&generate_return(seed, &number, year)).await {
                Ok(_) => returned += 1,
                Err(e) => eprintln!("Return against {} rejected: {}", number, e.user_message()),
            }
        }

        if generated % 50 == 0 {
            println!("  Generated {} invoices...", generated);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} invoices and {} returns in {:?}",
        generated, returned, elapsed
    );

    let refs = db.reference_cache().await?;
    let report = db.reports().sales_report(&refs, &config.report_options()).await?;

    println!();
    println!("Net sales:   {}", report.summary.net_total);
    println!("Documents:   {}", report.summary.count);
    if let Some(top) = report.top_items.first() {
        println!("Top item:    {} ({} units)", top.label, top.total_quantity);
    }
    if let Some(top) = report.by_branch.first() {
        println!("Top branch:  {} ({})", top.label, top.net_total);
    }

    db.close().await;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates one invoice with deterministic pseudo-random content.
fn generate_invoice(seed: usize, year: i32) -> InvoiceDraft {
    let line_count = 1 + seed % 4;
    let lines = (0..line_count)
        .map(|n| {
            let (number, name, unit, price) = ITEMS[(seed * 3 + n * 5) % ITEMS.len()];
            InvoiceLine::new(
                number,
                name,
                (1 + (seed + n) % 6) as f64,
                unit,
                price,
                DISCOUNTS[(seed + n) % DISCOUNTS.len()],
                TAX_RATES[seed % TAX_RATES.len()],
            )
        })
        // One line per item keeps returns unambiguous
        .fold(Vec::<InvoiceLine>::new(), |mut acc, line| {
            if !acc.iter().any(|l| l.item_number == line.item_number) {
                acc.push(line);
            }
            acc
        });

    InvoiceDraft {
        invoice_number: format!("INV-{}-{:05}", year, seed + 1),
        date: seed_date(seed, year),
        branch_id: Some(BRANCHES[seed % BRANCHES.len()].0.to_string()),
        warehouse_id: Some(WAREHOUSES[seed % WAREHOUSES.len()].0.to_string()),
        sales_rep: Some(SALES_REPS[(seed * 7) % SALES_REPS.len()].0.to_string()),
        customer: Customer {
            name: Some(format!("Customer {}", seed % 37 + 1)),
            phone: Some(format!("05{:08}", seed * 7919 % 100_000_000)),
        },
        payment_method: Some(PAYMENT_METHODS[seed % PAYMENT_METHODS.len()].0.to_string()),
        lines,
    }
}

/// Returns one unit of the first line of the invoice made from `seed`.
fn generate_return(seed: usize, invoice_number: &str, year: i32) -> ReturnRequest {
    let (item_number, _, _, _) = ITEMS[(seed * 3) % ITEMS.len()];

    ReturnRequest {
        reference_number: format!("RET-{}-{:05}", year, seed + 1),
        original_invoice_number: invoice_number.to_string(),
        date: seed_date(seed, year),
        warehouse_id: Some(WAREHOUSES[seed % WAREHOUSES.len()].0.to_string()),
        lines: vec![ReturnLineRequest {
            item_number: item_number.to_string(),
            line_index: Some(0),
            returned_qty: 1.0,
        }],
    }
}

fn seed_date(seed: usize, year: i32) -> NaiveDate {
    let month = (seed % 12) as u32 + 1;
    let day = (seed % 28) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}
