//! Bill field extraction from recognized text
//!
//! Works on text that has already been through character recognition; there
//! is no image processing here. Only consumption and total value are
//! mandatory, everything else falls back to a placeholder.

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::Result;
use crate::models::{NewBill, TariffFlag};

/// Placeholder values for fields the text did not provide
pub const UNKNOWN_INSTALLATION: &str = "N/A";
pub const UNKNOWN_CUSTOMER: &str = "Extracted customer";
pub const UNKNOWN_ADDRESS: &str = "Address extracted from text";
pub const UNKNOWN_DISTRIBUTOR: &str = "Detected distributor";

/// Fields pulled out of a bill's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedBill {
    pub customer_name: String,
    pub address: String,
    pub installation_number: String,
    pub consumption_kwh: u32,
    pub total_value: f64,
    pub due_date: NaiveDate,
    pub tariff_flag: TariffFlag,
    pub distributor: String,
    pub reference_month: String,
}

impl ExtractedBill {
    /// Turn into a storable bill, keeping the source text as raw data
    pub fn into_new_bill(self, user_id: i64, source_text: &str, file_name: Option<String>) -> NewBill {
        NewBill {
            user_id,
            customer_name: self.customer_name,
            address: self.address,
            installation_number: self.installation_number,
            consumption_kwh: self.consumption_kwh,
            total_value: self.total_value,
            due_date: self.due_date,
            tariff_flag: self.tariff_flag,
            distributor: self.distributor,
            reference_month: self.reference_month,
            processed_at: None,
            file_name,
            file_url: None,
            raw_data: Some(json!({ "source": "text", "text": source_text }).to_string()),
        }
    }
}

/// Compiled extraction patterns
pub struct BillExtractor {
    consumption: Regex,
    value: Regex,
    installation: Regex,
    due_date: Regex,
    flag: Regex,
}

impl BillExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            consumption: RegexBuilder::new(r"(\d+)\s*kWh")
                .case_insensitive(true)
                .build()?,
            value: Regex::new(r"R\$\s*(\d+[,.]?\d*)")?,
            installation: Regex::new(r"(\d{10,})")?,
            due_date: RegexBuilder::new(r"vencimento[:\s]*(\d{2}/\d{2}/\d{4})")
                .case_insensitive(true)
                .build()?,
            flag: RegexBuilder::new(r"bandeira\s*(?:tarif[áa]ria\s*)?[:\s]*(verde|amarela|vermelha)")
                .case_insensitive(true)
                .build()?,
        })
    }

    /// Extract bill fields; `None` unless both consumption and value are found
    ///
    /// `today` supplies the fallback due date and the reference month.
    pub fn extract(&self, text: &str, today: NaiveDate) -> Option<ExtractedBill> {
        let consumption = first_group(&self.consumption, text)?;
        let value = first_group(&self.value, text)?;

        let consumption_kwh: u32 = consumption.parse().ok()?;
        let total_value: f64 = value.replace(',', ".").parse().ok()?;

        let due_date = first_group(&self.due_date, text)
            .and_then(|d| NaiveDate::parse_from_str(d, "%d/%m/%Y").ok())
            .unwrap_or(today);

        let tariff_flag = first_group(&self.flag, text)
            .and_then(|f| f.parse().ok())
            .unwrap_or_default();

        debug!(consumption_kwh, total_value, "Extracted bill fields from text");

        Some(ExtractedBill {
            customer_name: UNKNOWN_CUSTOMER.to_string(),
            address: UNKNOWN_ADDRESS.to_string(),
            installation_number: first_group(&self.installation, text)
                .unwrap_or(UNKNOWN_INSTALLATION)
                .to_string(),
            consumption_kwh,
            total_value,
            due_date,
            tariff_flag,
            distributor: UNKNOWN_DISTRIBUTOR.to_string(),
            reference_month: today.format("%Y-%m").to_string(),
        })
    }
}

fn first_group<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}
