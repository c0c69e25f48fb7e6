//! Extraction feedback command implementations

use anyhow::Result;
use energyreader_core::db::Database;
use energyreader_core::models::{BillField, FeedbackStatus, NewFeedback};

use super::truncate;

pub fn cmd_feedback_list(db: &Database, status: Option<&str>) -> Result<()> {
    let status: Option<FeedbackStatus> = status
        .map(|s| s.parse().map_err(|e: String| anyhow::anyhow!(e)))
        .transpose()?;
    let items = db.list_feedback(status)?;

    if items.is_empty() {
        println!("No corrections found.");
        return Ok(());
    }

    println!();
    println!("📝 Extraction Corrections");
    println!("   ─────────────────────────────────────────────────────────────");

    for item in &items {
        let fb = &item.feedback;
        println!(
            "   #{:<4} bill #{:<5} {:20} {:18} {} → {}  [{}]",
            fb.id,
            fb.bill_id,
            truncate(item.customer_name.as_deref().unwrap_or("-"), 20),
            fb.field_corrected.as_str(),
            fb.original_value.as_deref().unwrap_or("-"),
            fb.correct_value,
            fb.status
        );
    }

    Ok(())
}

pub fn cmd_feedback_submit(
    db: &Database,
    bill_id: i64,
    user_id: i64,
    field: &str,
    value: &str,
) -> Result<()> {
    let field: BillField = field.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let id = db.submit_feedback(&NewFeedback {
        bill_id,
        user_id,
        field_corrected: field,
        correct_value: value.to_string(),
    })?;

    db.log_audit(
        "cli",
        "create",
        Some("feedback"),
        Some(id),
        Some(&format!("bill_id={}, field={}", bill_id, field.as_str())),
    )?;

    println!("✅ Correction #{} submitted for review", id);
    Ok(())
}

pub fn cmd_feedback_approve(db: &Database, id: i64) -> Result<()> {
    set_status(db, id, FeedbackStatus::Approved)
}

pub fn cmd_feedback_reject(db: &Database, id: i64) -> Result<()> {
    set_status(db, id, FeedbackStatus::Rejected)
}

fn set_status(db: &Database, id: i64, status: FeedbackStatus) -> Result<()> {
    if !db.set_feedback_status(id, status)? {
        anyhow::bail!("Feedback not found: {}", id);
    }

    db.log_audit("cli", status.as_str(), Some("feedback"), Some(id), None)?;

    println!("✅ Correction #{} {}", id, status);
    Ok(())
}
