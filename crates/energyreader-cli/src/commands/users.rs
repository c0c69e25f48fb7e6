//! User management command implementations

use anyhow::Result;
use chrono::Utc;
use energyreader_core::analytics::user_stats;
use energyreader_core::db::Database;
use energyreader_core::models::{UserFilter, UserRole};

use super::truncate;

fn parse_role(role: &str) -> Result<UserRole> {
    role.parse().map_err(|e: String| anyhow::anyhow!(e))
}

pub fn cmd_users_list(db: &Database, search: Option<&str>, role: Option<&str>) -> Result<()> {
    let filter = UserFilter {
        search: search.map(String::from),
        role: role.map(parse_role).transpose()?,
    };
    let users = db.list_users(&filter)?;

    if users.is_empty() {
        println!("No users found. Add one with:");
        println!("  energyreader users add maria@example.com --name \"Maria\"");
        return Ok(());
    }

    let stats = user_stats(&db.list_users(&UserFilter::default())?, Utc::now());

    println!();
    println!("👥 Users");
    println!(
        "   {} total · {} admins · {} new this month",
        stats.total, stats.admins, stats.new_this_month
    );
    println!("   ─────────────────────────────────────────────────────────────");

    for user in &users {
        println!(
            "   {:>4}  {:30}  {:20}  {:5}  {}",
            user.id,
            truncate(&user.email, 30),
            truncate(&user.name, 20),
            user.role.as_str(),
            user.created_at.format("%d/%m/%Y")
        );
    }

    Ok(())
}

pub fn cmd_users_add(db: &Database, email: &str, name: &str, role: &str) -> Result<()> {
    let role = parse_role(role)?;
    let id = db.create_user(email, name, role)?;

    db.log_audit("cli", "create", Some("user"), Some(id), Some(&format!("role={}", role)))?;

    println!("✅ Added user #{}: {} ({})", id, email.trim().to_lowercase(), role);
    Ok(())
}

pub fn cmd_users_role(db: &Database, id: i64, role: &str) -> Result<()> {
    let role = parse_role(role)?;

    if !db.update_user_role(id, role)? {
        anyhow::bail!("User not found: {}", id);
    }

    db.log_audit("cli", "update_role", Some("user"), Some(id), Some(&format!("role={}", role)))?;

    println!("✅ User #{} is now {}", id, role);
    Ok(())
}

pub fn cmd_users_delete(db: &Database, id: i64) -> Result<()> {
    let bills = db.count_bills(Some(id))?;

    if !db.delete_user(id)? {
        anyhow::bail!("User not found: {}", id);
    }

    db.log_audit("cli", "delete", Some("user"), Some(id), Some(&format!("bills={}", bills)))?;

    println!("🗑️  Deleted user #{} and {} bill(s)", id, bills);
    Ok(())
}
