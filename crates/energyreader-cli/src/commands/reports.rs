//! Report command implementations

use anyhow::{Context, Result};
use chrono::Utc;
use energyreader_core::analytics::{
    self, filter_by_period, monthly_growth, monthly_trends, regional_insights, PeriodWindow,
};
use energyreader_core::db::Database;
use energyreader_core::models::{Bill, BillFilter};
use energyreader_core::{AppConfig, BillRepository, InsightGenerator, InsightKind};

/// Bills for an optional user, cut to a rolling window
fn scoped_bills(
    repo: &dyn BillRepository,
    period: PeriodWindow,
    user_id: Option<i64>,
) -> Result<Vec<Bill>> {
    let filter = BillFilter {
        user_id,
        ..Default::default()
    };
    Ok(filter_by_period(&repo.list_bills(&filter)?, period, Utc::now()))
}

pub fn cmd_report_trends(
    repo: &dyn BillRepository,
    period: PeriodWindow,
    user_id: Option<i64>,
) -> Result<()> {
    let trends = monthly_trends(&scoped_bills(repo, period, user_id)?);

    println!();
    println!("📈 Monthly Trends ({})", period);
    println!("   ─────────────────────────────────────────────");

    if trends.is_empty() {
        println!("   No bills in this period.");
        return Ok(());
    }

    println!(
        "   {:8} │ {:>10} │ {:>10} │ {:>5}",
        "Month", "Avg kWh", "Avg R$", "Bills"
    );
    println!("   ─────────┼────────────┼────────────┼──────");
    for trend in &trends {
        println!(
            "   {:8} │ {:>10} │ {:>10.2} │ {:>5}",
            trend.month, trend.avg_consumption, trend.avg_value, trend.count
        );
    }

    Ok(())
}

pub fn cmd_report_regions(
    repo: &dyn BillRepository,
    period: PeriodWindow,
    user_id: Option<i64>,
) -> Result<()> {
    let regions = regional_insights(&scoped_bills(repo, period, user_id)?);

    println!();
    println!("🗺️  Regional Analysis ({})", period);
    println!("   ─────────────────────────────────────────────────────────────");

    if regions.is_empty() {
        println!("   No bills in this period.");
        return Ok(());
    }

    println!(
        "   {:18} │ {:>8} │ {:>10} │ {:>5} │ {}",
        "Region", "Avg kWh", "Avg R$", "Bills", "Dominant flag"
    );
    println!("   ───────────────────┼──────────┼────────────┼───────┼──────────────");
    for region in &regions {
        println!(
            "   {:18} │ {:>8} │ {:>10.2} │ {:>5} │ {}",
            region.region.label(),
            region.avg_consumption,
            region.avg_value,
            region.count,
            region.dominant_flag
        );
    }

    Ok(())
}

pub fn cmd_report_growth(
    repo: &dyn BillRepository,
    period: PeriodWindow,
    user_id: Option<i64>,
) -> Result<()> {
    let trends = monthly_trends(&scoped_bills(repo, period, user_id)?);

    println!();
    match monthly_growth(&trends) {
        Some(growth) => {
            let arrow = if growth.is_positive { "📈" } else { "📉" };
            println!(
                "{} Consumption growth: {:+.1}% ({} → {})",
                arrow,
                growth.percent,
                trends[trends.len() - 2].month,
                trends[trends.len() - 1].month
            );
        }
        None => {
            println!("   Not enough data: growth needs two months with non-zero consumption.");
        }
    }

    Ok(())
}

pub fn cmd_report_flags(
    repo: &dyn BillRepository,
    period: PeriodWindow,
    user_id: Option<i64>,
) -> Result<()> {
    let bills = scoped_bills(repo, period, user_id)?;
    let shares = analytics::flag_distribution(&bills);

    println!();
    println!("🚦 Tariff Flags ({}, {} bills)", period, bills.len());
    println!("   ─────────────────────────────");
    for share in &shares {
        println!(
            "   {:8} {:>5} bills  {:>5.1}%",
            share.flag.as_str(),
            share.count,
            share.percent
        );
    }

    Ok(())
}

pub fn cmd_report_metrics(repo: &dyn BillRepository) -> Result<()> {
    let bills = repo.list_bills(&BillFilter::default())?;
    let total_users = repo.count_users()?;
    let metrics = analytics::admin_metrics(&bills, total_users, Utc::now());

    println!();
    println!("╭─────────────────────────────────────────╮");
    println!("│        ⚡ EnergyReader Dashboard         │");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Users:             {}", metrics.total_users);
    println!("  Bills:             {}", metrics.total_bills);
    println!("  Bills this month:  {}", metrics.bills_this_month);
    println!("  Avg consumption:   {} kWh", metrics.avg_consumption);
    println!("  Avg bill:          R$ {:.2}", metrics.avg_value);

    if !metrics.consumption_by_region.is_empty() {
        println!();
        println!("  Consumption by region:");
        for (region, kwh) in &metrics.consumption_by_region {
            println!("    {:18} {:>10} kWh", region.label(), kwh);
        }
    }

    Ok(())
}

pub fn cmd_report_summary(repo: &dyn BillRepository, user_id: i64) -> Result<()> {
    let user = repo
        .get_user(user_id)?
        .with_context(|| format!("User not found: {}", user_id))?;
    let bills = repo.list_bills(&BillFilter::for_user(user_id))?;

    println!();
    println!("🏠 Summary for {}", user.email);
    println!("   ─────────────────────────────");

    let Some(summary) = analytics::user_summary(&bills) else {
        println!("   No bills yet.");
        return Ok(());
    };

    println!("   Bills:            {}", summary.bill_count);
    println!(
        "   Latest bill:      R$ {:.2} · {} kWh · {} flag",
        summary.latest_value, summary.latest_consumption, summary.latest_flag
    );
    println!(
        "   Due:              {}",
        summary.latest_due_date.format("%d/%m/%Y")
    );
    println!("   Avg consumption:  {} kWh", summary.avg_consumption);

    if let Some(trend) = summary.value_trend {
        println!(
            "   Value trend:      {} {:.1}%",
            if trend.is_increase { "▲" } else { "▼" },
            trend.percent
        );
    }
    if let Some(trend) = summary.consumption_trend {
        println!(
            "   Usage trend:      {} {:.1}%",
            if trend.is_increase { "▲" } else { "▼" },
            trend.percent
        );
    }

    Ok(())
}

pub fn cmd_insights(db: &Database, user_id: i64, config: &AppConfig) -> Result<()> {
    let user = db
        .get_user(user_id)?
        .with_context(|| format!("User not found: {}", user_id))?;
    let history = db.list_bills(&BillFilter::for_user(user_id))?;

    let generator = InsightGenerator::with_config(config.insights.clone());
    let insights = generator.generate(&history);

    db.log_audit(
        "cli",
        "view",
        Some("insights"),
        Some(user_id),
        Some(&format!("bills={}, insights={}", history.len(), insights.len())),
    )?;

    println!();
    println!("💡 Insights for {}", user.email);
    println!("   ─────────────────────────────");

    if insights.is_empty() {
        println!("   Not enough history yet (at least two bills are needed).");
        return Ok(());
    }

    for insight in &insights {
        let icon = match insight.kind {
            InsightKind::Warning => "⚠️ ",
            InsightKind::Success => "✅",
            InsightKind::Tip => "💡",
            InsightKind::Info => "ℹ️ ",
        };
        println!("   {} {}", icon, insight.title);
        println!("      {}", insight.description);
    }

    Ok(())
}
