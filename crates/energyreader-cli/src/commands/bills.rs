//! Bill command implementations (CSV import, text extraction, listing)

use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use energyreader_core::analytics::{filter_by_period, region_for_address, PeriodWindow};
use energyreader_core::db::Database;
use energyreader_core::models::BillFilter;
use energyreader_core::{parse_bills_csv, BillExtractor};

use super::truncate;

pub fn cmd_import(db: &Database, file: &Path, user_id: i64) -> Result<()> {
    let user = db
        .get_user(user_id)?
        .with_context(|| format!("User not found: {}", user_id))?;

    println!("📥 Importing bills for {} from {}...", user.email, file.display());

    let csv_file =
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?;
    let bills = parse_bills_csv(csv_file, user_id)?;

    println!("   Found {} bills", bills.len());

    let mut imported = 0;
    let mut skipped = 0;

    for bill in &bills {
        match db.insert_bill(bill)? {
            Some(_) => imported += 1,
            None => skipped += 1,
        }
    }

    tracing::info!(user_id, imported, skipped, "Imported bills from CSV");

    db.log_audit(
        "cli",
        "import",
        Some("bill"),
        None,
        Some(&format!(
            "file={}, user_id={}, imported={}, skipped={}",
            file.display(),
            user_id,
            imported,
            skipped
        )),
    )?;

    println!();
    println!("✅ Import complete!");
    println!("   Imported: {} new bills", imported);
    if skipped > 0 {
        println!("   Skipped: {} duplicates", skipped);
    }

    Ok(())
}

pub fn cmd_extract(db: &Database, file: &Path, save_for: Option<i64>) -> Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;

    let extractor = BillExtractor::new()?;
    let extracted = extractor
        .extract(&text, Utc::now().date_naive())
        .context("Could not find consumption (kWh) and total value (R$) in text")?;

    println!();
    println!("🔎 Extracted Bill");
    println!("   ─────────────────────────────");
    println!("   Installation: {}", extracted.installation_number);
    println!("   Consumption:  {} kWh", extracted.consumption_kwh);
    println!("   Total:        R$ {:.2}", extracted.total_value);
    println!("   Due date:     {}", extracted.due_date.format("%d/%m/%Y"));
    println!("   Tariff flag:  {}", extracted.tariff_flag);

    if let Some(user_id) = save_for {
        if db.get_user(user_id)?.is_none() {
            anyhow::bail!("User not found: {}", user_id);
        }

        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        let bill = extracted.into_new_bill(user_id, &text, file_name);

        println!();
        match db.insert_bill(&bill)? {
            Some(id) => {
                db.log_audit("cli", "extract", Some("bill"), Some(id), None)?;
                println!("✅ Saved as bill #{}", id);
            }
            None => println!("ℹ️  Identical bill already stored, nothing saved"),
        }
    }

    Ok(())
}

pub fn cmd_bills_list(
    db: &Database,
    user_id: Option<i64>,
    period: PeriodWindow,
    limit: i64,
) -> Result<()> {
    let filter = BillFilter {
        user_id,
        ..Default::default()
    };
    let mut bills = filter_by_period(&db.list_bills(&filter)?, period, Utc::now());
    bills.truncate(usize::try_from(limit.max(0)).unwrap_or(0));

    if bills.is_empty() {
        println!("No bills found. Import bills with:");
        println!("  energyreader import --file bills.csv --user <id>");
        return Ok(());
    }

    println!();
    println!("🧾 Bills ({})", period);
    println!("   ─────────────────────────────────────────────────────────────────────────");
    println!(
        "   {:>5} │ {:10} │ {:20} │ {:>7} │ {:>10} │ {:8} │ {:15}",
        "ID", "Processed", "Customer", "kWh", "Value", "Flag", "Region"
    );
    println!("   ──────┼────────────┼──────────────────────┼─────────┼────────────┼──────────┼────────────────");

    for bill in &bills {
        println!(
            "   {:>5} │ {:10} │ {:20} │ {:>7} │ {:>10.2} │ {:8} │ {:15}",
            bill.id,
            bill.processed_at.format("%d/%m/%Y"),
            truncate(&bill.customer_name, 20),
            bill.consumption_kwh,
            bill.total_value,
            bill.tariff_flag.as_str(),
            region_for_address(&bill.address).label()
        );
    }

    Ok(())
}
