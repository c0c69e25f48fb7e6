//! Report export
//!
//! Every CSV report shares one layout:
//!
//! ```text
//! EnergyReader - <title>
//! Period: <token> | Generated: DD/MM/YYYY
//!
//! <SECTION LABEL>
//! <header row>
//! <data rows...>
//! ```
//!
//! Multi-section reports put a blank line before each further section label.
//! Lines are joined with `\n` and there is no trailing newline.
//!
//! Text fields are always wrapped in double quotes with embedded quotes
//! doubled. Numbers and dates are bare: currency with two decimals, kWh and
//! counts as integers, dates as `DD/MM/YYYY`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::{
    filter_by_period, monthly_trends, region_for_address, regional_insights, MonthlyTrend,
    PeriodWindow, RegionalInsight,
};
use crate::error::{Error, Result};
use crate::models::{Bill, BillFilter, FeedbackWithBill, User, UserFilter, UserRole};
use crate::store::BillRepository;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }
}

/// Report types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// A user's own bills
    Bills,
    /// All bills with derived region (admin)
    AdminBills,
    /// Monthly trends and regional analysis
    Analytics,
    /// Extraction corrections
    Feedback,
    Users,
}

pub const BILL_COLUMNS: [&str; 10] = [
    "Processed At",
    "Customer",
    "Address",
    "Installation Number",
    "Consumption (kWh)",
    "Total Value (R$)",
    "Due Date",
    "Tariff Flag",
    "Distributor",
    "Reference Month",
];

pub const ADMIN_BILL_COLUMNS: [&str; 8] = [
    "Processed At",
    "Customer",
    "Consumption (kWh)",
    "Value (R$)",
    "Due Date",
    "Tariff Flag",
    "Distributor",
    "Region",
];

pub const TREND_COLUMNS: [&str; 4] = [
    "Month",
    "Average Consumption (kWh)",
    "Average Value (R$)",
    "Total Bills",
];

pub const REGION_COLUMNS: [&str; 5] = [
    "Region",
    "Average Consumption (kWh)",
    "Average Value (R$)",
    "Total Bills",
    "Dominant Flag",
];

pub const FEEDBACK_COLUMNS: [&str; 6] = [
    "Date",
    "Customer",
    "Field",
    "Original Value",
    "Corrected Value",
    "Status",
];

pub const USER_COLUMNS: [&str; 4] = ["Name", "Email", "Role", "Created At"];

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bills => "bills",
            Self::AdminBills => "admin_bills",
            Self::Analytics => "analytics",
            Self::Feedback => "feedback",
            Self::Users => "users",
        }
    }

    /// Title line of the report
    pub fn title(&self) -> &'static str {
        match self {
            Self::Bills => "EnergyReader - Bill Report",
            Self::AdminBills => "EnergyReader - Admin Bill Report",
            Self::Analytics => "EnergyReader - Advanced Analytics Report",
            Self::Feedback => "EnergyReader - Extraction Feedback Report",
            Self::Users => "EnergyReader - User Report",
        }
    }

    /// Reports spanning every user's data
    pub fn is_admin_only(&self) -> bool {
        matches!(self, Self::AdminBills | Self::Feedback | Self::Users)
    }

    /// Download file name for a CSV report generated on `date`
    pub fn filename(&self, date: NaiveDate) -> String {
        self.filename_with(date, ExportFormat::Csv)
    }

    pub fn filename_with(&self, date: NaiveDate, format: ExportFormat) -> String {
        format!(
            "energyreader_{}_{}.{}",
            self.as_str(),
            date.format("%Y-%m-%d"),
            format.extension()
        )
    }
}

impl std::str::FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "bills" => Ok(Self::Bills),
            "admin_bills" => Ok(Self::AdminBills),
            "analytics" => Ok(Self::Analytics),
            "feedback" => Ok(Self::Feedback),
            "users" => Ok(Self::Users),
            _ => Err(format!("Unknown report: {}", s)),
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Context printed in the report preamble
#[derive(Debug, Clone, Copy)]
pub struct ReportMeta {
    pub period: PeriodWindow,
    pub generated: NaiveDate,
}

impl ReportMeta {
    pub fn new(period: PeriodWindow, generated: NaiveDate) -> Self {
        Self { period, generated }
    }

    /// All-time report generated today
    pub fn today() -> Self {
        Self::new(PeriodWindow::All, Utc::now().date_naive())
    }
}

/// Which report to build, over which bills
#[derive(Debug, Clone, Copy)]
pub struct ReportRequest {
    pub kind: ReportKind,
    pub format: ExportFormat,
    /// Rolling window for bill-based reports
    pub period: PeriodWindow,
    /// Restrict bill-based reports to one user
    pub user_id: Option<i64>,
}

/// A finished report
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub body: String,
    /// Data rows across all sections
    pub rows: usize,
    pub filename: String,
}

/// Build a report from the store as of `now`
///
/// JSON is only offered for the two bill reports.
pub fn render(
    repo: &dyn BillRepository,
    request: &ReportRequest,
    now: DateTime<Utc>,
) -> Result<RenderedReport> {
    let ReportRequest {
        kind,
        format,
        period,
        user_id,
    } = *request;
    let meta = ReportMeta::new(period, now.date_naive());

    let bills = match kind {
        ReportKind::Bills | ReportKind::AdminBills | ReportKind::Analytics => {
            let filter = BillFilter {
                user_id,
                ..Default::default()
            };
            filter_by_period(&repo.list_bills(&filter)?, period, now)
        }
        ReportKind::Feedback | ReportKind::Users => Vec::new(),
    };

    let (body, rows) = match (kind, format) {
        (ReportKind::Bills | ReportKind::AdminBills, ExportFormat::Json) => {
            (bills_json(&bills)?, bills.len())
        }
        (_, ExportFormat::Json) => {
            return Err(Error::InvalidData(
                "JSON export is only available for bill reports".to_string(),
            ))
        }
        (ReportKind::Bills, ExportFormat::Csv) => (bills_csv(&bills, &meta), bills.len()),
        (ReportKind::AdminBills, ExportFormat::Csv) => {
            (admin_bills_csv(&bills, &meta), bills.len())
        }
        (ReportKind::Analytics, ExportFormat::Csv) => {
            let trends = monthly_trends(&bills);
            let regions = regional_insights(&bills);
            let rows = trends.len() + regions.len();
            (analytics_csv(&trends, &regions, &meta), rows)
        }
        (ReportKind::Feedback, ExportFormat::Csv) => {
            let items = repo.list_feedback(None)?;
            (feedback_csv(&items, &meta), items.len())
        }
        (ReportKind::Users, ExportFormat::Csv) => {
            let users = repo.list_users(&UserFilter::default())?;
            (users_csv(&users, &meta), users.len())
        }
    };

    Ok(RenderedReport {
        body,
        rows,
        filename: kind.filename_with(meta.generated, format),
    })
}

/// Line-oriented CSV report under construction
struct Report {
    lines: Vec<String>,
}

impl Report {
    fn new(kind: ReportKind, meta: &ReportMeta) -> Self {
        Self {
            lines: vec![
                kind.title().to_string(),
                format!(
                    "Period: {} | Generated: {}",
                    meta.period,
                    format_date(meta.generated)
                ),
            ],
        }
    }

    /// Blank line, section label, header row
    fn section(&mut self, label: &str, columns: &[&str]) -> &mut Self {
        self.lines.push(String::new());
        self.lines.push(label.to_string());
        self.lines.push(columns.join(","));
        self
    }

    fn row(&mut self, fields: Vec<String>) {
        self.lines.push(fields.join(","));
    }

    fn finish(self) -> String {
        self.lines.join("\n")
    }
}

/// Quote a text field, doubling embedded quotes
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    format_date(ts.date_naive())
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

/// A user's bills, full detail
pub fn bills_csv(bills: &[Bill], meta: &ReportMeta) -> String {
    let mut report = Report::new(ReportKind::Bills, meta);
    report.section("BILLS", &BILL_COLUMNS);

    for bill in bills {
        report.row(vec![
            format_timestamp(bill.processed_at),
            quote(&bill.customer_name),
            quote(&bill.address),
            quote(&bill.installation_number),
            bill.consumption_kwh.to_string(),
            money(bill.total_value),
            format_date(bill.due_date),
            quote(bill.tariff_flag.as_str()),
            quote(&bill.distributor),
            quote(&bill.reference_month),
        ]);
    }

    report.finish()
}

/// All bills with their derived region
pub fn admin_bills_csv(bills: &[Bill], meta: &ReportMeta) -> String {
    let mut report = Report::new(ReportKind::AdminBills, meta);
    report.section("BILLS", &ADMIN_BILL_COLUMNS);

    for bill in bills {
        report.row(vec![
            format_timestamp(bill.processed_at),
            quote(&bill.customer_name),
            bill.consumption_kwh.to_string(),
            money(bill.total_value),
            format_date(bill.due_date),
            quote(bill.tariff_flag.as_str()),
            quote(&bill.distributor),
            quote(region_for_address(&bill.address).label()),
        ]);
    }

    report.finish()
}

/// Monthly trends followed by regional analysis
pub fn analytics_csv(
    trends: &[MonthlyTrend],
    regions: &[RegionalInsight],
    meta: &ReportMeta,
) -> String {
    let mut report = Report::new(ReportKind::Analytics, meta);

    report.section("MONTHLY TRENDS", &TREND_COLUMNS);
    for trend in trends {
        report.row(vec![
            quote(&trend.month),
            trend.avg_consumption.to_string(),
            money(trend.avg_value),
            trend.count.to_string(),
        ]);
    }

    report.section("REGIONAL ANALYSIS", &REGION_COLUMNS);
    for region in regions {
        report.row(vec![
            quote(region.region.label()),
            region.avg_consumption.to_string(),
            money(region.avg_value),
            region.count.to_string(),
            quote(region.dominant_flag.as_str()),
        ]);
    }

    report.finish()
}

/// Extraction corrections with the customer of each bill
pub fn feedback_csv(feedback: &[FeedbackWithBill], meta: &ReportMeta) -> String {
    let mut report = Report::new(ReportKind::Feedback, meta);
    report.section("FEEDBACK", &FEEDBACK_COLUMNS);

    for item in feedback {
        let fb = &item.feedback;
        report.row(vec![
            format_timestamp(fb.created_at),
            quote(item.customer_name.as_deref().unwrap_or("")),
            quote(fb.field_corrected.as_str()),
            quote(fb.original_value.as_deref().unwrap_or("")),
            quote(&fb.correct_value),
            quote(fb.status.as_str()),
        ]);
    }

    report.finish()
}

pub fn users_csv(users: &[User], meta: &ReportMeta) -> String {
    let mut report = Report::new(ReportKind::Users, meta);
    report.section("USERS", &USER_COLUMNS);

    for user in users {
        let role = match user.role {
            UserRole::Admin => "Administrator",
            UserRole::User => "User",
        };
        report.row(vec![
            quote(&user.name),
            quote(&user.email),
            quote(role),
            format_timestamp(user.created_at),
        ]);
    }

    report.finish()
}

/// Bills as pretty-printed JSON
pub fn bills_json(bills: &[Bill]) -> Result<String> {
    Ok(serde_json::to_string_pretty(bills)?)
}
