//! Domain models for EnergyReader

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Brazilian tariff flag printed on an electricity bill
///
/// Accepts both the English names and the Portuguese ones that appear on the
/// bills themselves (`verde`, `amarela`, `vermelha`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TariffFlag {
    /// Normal price
    #[default]
    Green,
    /// Surcharge
    Yellow,
    /// Higher surcharge
    Red,
}

impl TariffFlag {
    /// All flags, in tally order
    pub const ALL: [TariffFlag; 3] = [Self::Green, Self::Yellow, Self::Red];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }

    /// Position in `ALL`, used for fixed-size tallies
    pub fn index(&self) -> usize {
        match self {
            Self::Green => 0,
            Self::Yellow => 1,
            Self::Red => 2,
        }
    }
}

impl std::str::FromStr for TariffFlag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "green" | "verde" => Ok(Self::Green),
            "yellow" | "amarela" => Ok(Self::Yellow),
            "red" | "vermelha" => Ok(Self::Red),
            _ => Err(format!("Unknown tariff flag: {}", s)),
        }
    }
}

impl std::fmt::Display for TariffFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A processed electricity bill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: i64,
    /// Owner of the bill
    pub user_id: i64,
    pub customer_name: String,
    /// Free-text address; the region is derived from it
    pub address: String,
    pub installation_number: String,
    pub consumption_kwh: u32,
    /// Total amount due, in reais
    pub total_value: f64,
    pub due_date: NaiveDate,
    pub tariff_flag: TariffFlag,
    pub distributor: String,
    /// Billing cycle the bill covers (`YYYY-MM`), independent of `processed_at`
    pub reference_month: String,
    /// Set when the bill enters the store, never changed afterwards
    pub processed_at: DateTime<Utc>,
    pub file_name: Option<String>,
    pub file_url: Option<String>,
    /// JSON capture of the extraction source (never interpreted)
    pub raw_data: Option<String>,
}

/// A bill before it is stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBill {
    pub user_id: i64,
    pub customer_name: String,
    pub address: String,
    pub installation_number: String,
    pub consumption_kwh: u32,
    pub total_value: f64,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub tariff_flag: TariffFlag,
    pub distributor: String,
    pub reference_month: String,
    /// Historical imports may carry their original processing time; otherwise "now"
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub raw_data: Option<String>,
}

impl NewBill {
    /// Reject values no stored bill may carry
    pub fn validate(&self) -> Result<()> {
        if !(self.total_value.is_finite() && self.total_value >= 0.0) {
            return Err(Error::InvalidData(format!(
                "Invalid total value: {}",
                self.total_value
            )));
        }
        Ok(())
    }
}

/// Filter for listing bills
#[derive(Debug, Clone, Default)]
pub struct BillFilter {
    /// Restrict to one user's bills
    pub user_id: Option<i64>,
    /// Only bills processed at or after this instant
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl BillFilter {
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }
}

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Filter for the user listing (admin view)
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Case-insensitive match against name or email
    pub search: Option<String>,
    pub role: Option<UserRole>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        let matches_search = match &self.search {
            Some(term) => {
                let term = term.to_lowercase();
                user.name.to_lowercase().contains(&term)
                    || user.email.to_lowercase().contains(&term)
            }
            None => true,
        };
        let matches_role = self.role.map_or(true, |r| r == user.role);
        matches_search && matches_role
    }
}

/// Counts shown on the user management screen
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStats {
    pub total: usize,
    pub admins: usize,
    pub users: usize,
    /// Users created in the current calendar month
    pub new_this_month: usize,
}

/// Bill field a user can correct after extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillField {
    CustomerName,
    Address,
    InstallationNumber,
    ConsumptionKwh,
    TotalValue,
    DueDate,
    TariffFlag,
    Distributor,
    ReferenceMonth,
}

impl BillField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerName => "customer_name",
            Self::Address => "address",
            Self::InstallationNumber => "installation_number",
            Self::ConsumptionKwh => "consumption_kwh",
            Self::TotalValue => "total_value",
            Self::DueDate => "due_date",
            Self::TariffFlag => "tariff_flag",
            Self::Distributor => "distributor",
            Self::ReferenceMonth => "reference_month",
        }
    }

    /// Current value of this field on a bill, as display text
    pub fn value_of(&self, bill: &Bill) -> String {
        match self {
            Self::CustomerName => bill.customer_name.clone(),
            Self::Address => bill.address.clone(),
            Self::InstallationNumber => bill.installation_number.clone(),
            Self::ConsumptionKwh => bill.consumption_kwh.to_string(),
            Self::TotalValue => format!("{:.2}", bill.total_value),
            Self::DueDate => bill.due_date.to_string(),
            Self::TariffFlag => bill.tariff_flag.to_string(),
            Self::Distributor => bill.distributor.clone(),
            Self::ReferenceMonth => bill.reference_month.clone(),
        }
    }
}

impl std::str::FromStr for BillField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "customer_name" => Ok(Self::CustomerName),
            "address" => Ok(Self::Address),
            "installation_number" => Ok(Self::InstallationNumber),
            "consumption_kwh" => Ok(Self::ConsumptionKwh),
            "total_value" => Ok(Self::TotalValue),
            "due_date" => Ok(Self::DueDate),
            "tariff_flag" => Ok(Self::TariffFlag),
            "distributor" => Ok(Self::Distributor),
            "reference_month" => Ok(Self::ReferenceMonth),
            _ => Err(format!("Unknown bill field: {}", s)),
        }
    }
}

impl std::fmt::Display for BillField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Moderation state of an extraction correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for FeedbackStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown feedback status: {}", s)),
        }
    }
}

impl std::fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's correction to an extracted bill field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionFeedback {
    pub id: i64,
    pub bill_id: i64,
    pub user_id: i64,
    pub field_corrected: BillField,
    /// Value the extractor produced, captured at submission time
    pub original_value: Option<String>,
    pub correct_value: String,
    pub status: FeedbackStatus,
    pub created_at: DateTime<Utc>,
}

/// A correction being submitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFeedback {
    pub bill_id: i64,
    pub user_id: i64,
    pub field_corrected: BillField,
    pub correct_value: String,
}

/// Feedback joined with the customer name of its bill, for moderation views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackWithBill {
    #[serde(flatten)]
    pub feedback: ExtractionFeedback,
    pub customer_name: Option<String>,
}
