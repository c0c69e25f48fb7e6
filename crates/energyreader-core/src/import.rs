//! Bulk bill import from CSV
//!
//! Expected header (order does not matter, extra columns are kept in raw data):
//!
//! ```text
//! customer_name,address,installation_number,consumption_kwh,total_value,
//! due_date,tariff_flag,distributor,reference_month[,processed_at]
//! ```
//!
//! `due_date` accepts `YYYY-MM-DD` or `DD/MM/YYYY`; `total_value` accepts a
//! decimal comma; `tariff_flag` accepts English or Portuguese names.

use std::collections::HashMap;
use std::io::Read;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::{NewBill, TariffFlag};

const REQUIRED_COLUMNS: [&str; 9] = [
    "customer_name",
    "address",
    "installation_number",
    "consumption_kwh",
    "total_value",
    "due_date",
    "tariff_flag",
    "distributor",
    "reference_month",
];

/// Convert a CSV record to JSON using headers as keys
fn record_to_json(headers: &StringRecord, record: &StringRecord) -> String {
    let mut map = serde_json::Map::new();
    for (i, header) in headers.iter().enumerate() {
        if let Some(value) = record.get(i) {
            map.insert(header.to_string(), Value::String(value.to_string()));
        }
    }
    json!(map).to_string()
}

/// Deduplication key for a bill
///
/// Two bills are the same when they belong to the same user and installation,
/// cover the same reference month and carry the same value.
pub fn bill_hash(bill: &NewBill) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bill.user_id.to_be_bytes());
    hasher.update(bill.installation_number.as_bytes());
    hasher.update(bill.reference_month.as_bytes());
    hasher.update(bill.total_value.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Parse a due date in ISO or Brazilian format
pub fn parse_bill_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|dt| dt.and_utc())
                .ok()
        })
        .or_else(|| parse_bill_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)).map(|dt| dt.and_utc()))
}

/// Parse bill rows for `user_id`
///
/// Rows that fail to parse are skipped with a warning; a missing required
/// column fails the whole import.
pub fn parse_bills_csv<R: Read>(reader: R, user_id: i64) -> Result<Vec<NewBill>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_lowercase(), i))
        .collect();

    for column in REQUIRED_COLUMNS {
        if !columns.contains_key(column) {
            return Err(Error::Import(format!("Missing column: {}", column)));
        }
    }

    let field = |record: &StringRecord, name: &str| -> String {
        columns
            .get(name)
            .and_then(|&i| record.get(i))
            .unwrap_or("")
            .to_string()
    };

    let mut bills = Vec::new();

    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        let row = line + 2;

        let consumption_kwh = match field(&record, "consumption_kwh").parse::<u32>() {
            Ok(v) => v,
            Err(_) => {
                warn!(row, "Skipping row with invalid consumption");
                continue;
            }
        };

        let total_value = match field(&record, "total_value").replace(',', ".").parse::<f64>() {
            Ok(v) if v >= 0.0 => v,
            _ => {
                warn!(row, "Skipping row with invalid total value");
                continue;
            }
        };

        let Some(due_date) = parse_bill_date(&field(&record, "due_date")) else {
            warn!(row, "Skipping row with invalid due date");
            continue;
        };

        let tariff_flag = match field(&record, "tariff_flag").parse::<TariffFlag>() {
            Ok(flag) => flag,
            Err(e) => {
                warn!(row, error = %e, "Skipping row with invalid tariff flag");
                continue;
            }
        };

        let processed_at = columns
            .get("processed_at")
            .and_then(|&i| record.get(i))
            .filter(|s| !s.is_empty())
            .and_then(parse_timestamp);

        bills.push(NewBill {
            user_id,
            customer_name: field(&record, "customer_name"),
            address: field(&record, "address"),
            installation_number: field(&record, "installation_number"),
            consumption_kwh,
            total_value,
            due_date,
            tariff_flag,
            distributor: field(&record, "distributor"),
            reference_month: field(&record, "reference_month"),
            processed_at,
            file_name: None,
            file_url: None,
            raw_data: Some(record_to_json(&headers, &record)),
        });
    }

    Ok(bills)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "customer_name,address,installation_number,consumption_kwh,total_value,due_date,tariff_flag,distributor,reference_month,processed_at
Maria Silva,\"Rua A, 1 - SP\",1234567890,250,\"199,90\",2024-02-10,verde,Enel SP,2024-01,2024-02-01
Maria Silva,\"Rua A, 1 - SP\",1234567890,310,245.10,10/03/2024,vermelha,Enel SP,2024-02,
Maria Silva,\"Rua A, 1 - SP\",1234567890,abc,245.10,10/03/2024,red,Enel SP,2024-03,";

    #[test]
    fn test_parse_bills_csv() {
        let bills = parse_bills_csv(CSV.as_bytes(), 5).unwrap();
        // Third row has a bad consumption and is skipped
        assert_eq!(bills.len(), 2);

        let first = &bills[0];
        assert_eq!(first.user_id, 5);
        assert_eq!(first.address, "Rua A, 1 - SP");
        assert_eq!(first.total_value, 199.9);
        assert_eq!(first.tariff_flag, TariffFlag::Green);
        assert_eq!(
            first.processed_at.unwrap().date_naive(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );

        let second = &bills[1];
        assert_eq!(second.due_date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(second.tariff_flag, TariffFlag::Red);
        assert!(second.processed_at.is_none());

        let raw: Value = serde_json::from_str(first.raw_data.as_deref().unwrap()).unwrap();
        assert_eq!(raw["distributor"], "Enel SP");
    }

    #[test]
    fn test_missing_column_fails() {
        let err = parse_bills_csv("customer_name,address\nA,B".as_bytes(), 1).unwrap_err();
        assert!(err.to_string().contains("Missing column"));
    }

    #[test]
    fn test_bill_hash_is_stable() {
        let bills = parse_bills_csv(CSV.as_bytes(), 5).unwrap();
        assert_eq!(bill_hash(&bills[0]), bill_hash(&bills[0].clone()));
        assert_ne!(bill_hash(&bills[0]), bill_hash(&bills[1]));

        let mut other_user = bills[0].clone();
        other_user.user_id = 6;
        assert_ne!(bill_hash(&bills[0]), bill_hash(&other_user));
    }

    #[test]
    fn test_parse_bill_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 7, 5);
        assert_eq!(parse_bill_date("2024-07-05"), expected);
        assert_eq!(parse_bill_date("05/07/2024"), expected);
        assert_eq!(parse_bill_date("July 5"), None);
    }
}
