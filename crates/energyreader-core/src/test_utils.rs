//! Test utilities for energyreader-core
//!
//! Bill and user fixtures shared by unit tests here and by the CLI/server
//! crates (through the `test-utils` feature).

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::models::{Bill, NewBill, TariffFlag, User, UserRole};

/// Parse `YYYY-MM-DD` into midnight UTC
pub fn day(date: &str) -> DateTime<Utc> {
    let d = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
    Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).unwrap())
}

/// A green-flag São Paulo bill processed on `date`
pub fn bill_at(id: i64, date: &str, consumption_kwh: u32) -> Bill {
    let processed_at = day(date);
    Bill {
        id,
        user_id: 1,
        customer_name: "Maria Silva".to_string(),
        address: "Rua das Flores, 123 - São Paulo, SP".to_string(),
        installation_number: "1234567890".to_string(),
        consumption_kwh,
        total_value: f64::from(consumption_kwh) * 0.8,
        due_date: processed_at.date_naive() + chrono::Duration::days(10),
        tariff_flag: TariffFlag::Green,
        distributor: "Enel SP".to_string(),
        reference_month: processed_at.format("%Y-%m").to_string(),
        processed_at,
        file_name: None,
        file_url: None,
        raw_data: None,
    }
}

/// Builder-style tweaks for fixtures
pub trait BillFixture {
    fn with_value(self, total_value: f64) -> Self;
    fn with_flag(self, flag: TariffFlag) -> Self;
    fn with_address(self, address: &str) -> Self;
    fn with_user(self, user_id: i64) -> Self;
}

impl BillFixture for Bill {
    fn with_value(mut self, total_value: f64) -> Self {
        self.total_value = total_value;
        self
    }

    fn with_flag(mut self, flag: TariffFlag) -> Self {
        self.tariff_flag = flag;
        self
    }

    fn with_address(mut self, address: &str) -> Self {
        self.address = address.to_string();
        self
    }

    fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = user_id;
        self
    }
}

/// A bill ready for insertion, processed on `date`
pub fn new_bill(user_id: i64, date: &str, consumption_kwh: u32, total_value: f64) -> NewBill {
    let processed_at = day(date);
    NewBill {
        user_id,
        customer_name: "Maria Silva".to_string(),
        address: "Rua das Flores, 123 - São Paulo, SP".to_string(),
        installation_number: "1234567890".to_string(),
        consumption_kwh,
        total_value,
        due_date: processed_at.date_naive() + chrono::Duration::days(10),
        tariff_flag: TariffFlag::Green,
        distributor: "Enel SP".to_string(),
        reference_month: processed_at.format("%Y-%m").to_string(),
        processed_at: Some(processed_at),
        file_name: None,
        file_url: None,
        raw_data: None,
    }
}

pub fn user(id: i64, email: &str, role: UserRole) -> User {
    User {
        id,
        email: email.to_string(),
        name: email.split('@').next().unwrap_or_default().to_string(),
        role,
        created_at: day("2024-01-01"),
    }
}
