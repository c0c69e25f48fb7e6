//! Report export command

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use energyreader_core::analytics::PeriodWindow;
use energyreader_core::db::Database;
use energyreader_core::export::{self, ReportRequest};

pub fn cmd_export(
    db: &Database,
    report: &str,
    output: Option<PathBuf>,
    format: &str,
    period: PeriodWindow,
    user_id: Option<i64>,
) -> Result<()> {
    let request = ReportRequest {
        kind: report.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        format: format.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        period,
        user_id,
    };

    let report = export::render(db, &request, Utc::now())?;

    let output = output.unwrap_or_else(|| PathBuf::from(&report.filename));
    fs::write(&output, &report.body)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    db.log_audit(
        "cli",
        "export",
        Some(request.kind.as_str()),
        None,
        Some(&format!(
            "format={:?}, period={}, rows={}, file={}",
            request.format,
            period,
            report.rows,
            output.display()
        )),
    )?;

    println!(
        "📤 Exported {} report ({} rows) to {}",
        request.kind,
        report.rows,
        output.display()
    );

    Ok(())
}
