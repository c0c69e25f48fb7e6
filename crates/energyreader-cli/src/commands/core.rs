//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Config file loading
//! - `parse_period` - Period window parsing for report commands
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use energyreader_core::analytics::PeriodWindow;
use energyreader_core::{db::Database, AppConfig};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Load the config file, falling back to built-in defaults
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    AppConfig::load(path).context("Failed to load config")
}

/// Parse a period window (1m, 3m, 6m, 12m, all)
pub fn parse_period(period: &str) -> Result<PeriodWindow> {
    period.parse().map_err(|e: String| anyhow::anyhow!(e))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    let users = db.count_users().context("Failed to read users")?;
    println!("   Users: {}", users);

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Add a user: energyreader users add maria@example.com --name \"Maria\"");
    println!("  2. Import bills: energyreader import --file bills.csv --user 1");
    println!("  3. Start web UI: energyreader serve");

    Ok(())
}
