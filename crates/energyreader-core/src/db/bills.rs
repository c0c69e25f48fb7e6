//! Bill storage operations

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{format_datetime, parse_column, parse_datetime, Database};
use crate::error::Result;
use crate::import::bill_hash;
use crate::models::{
    Bill, BillFilter, FeedbackStatus, FeedbackWithBill, NewBill, User, UserFilter,
};
use crate::store::BillRepository;

const BILL_COLUMNS: &str = r#"
    id, user_id, customer_name, address, installation_number, consumption_kwh,
    total_value, due_date, tariff_flag, distributor, reference_month,
    processed_at, file_name, file_url, raw_data
"#;

fn row_to_bill(row: &Row) -> rusqlite::Result<Bill> {
    let due_date_str: String = row.get(7)?;
    let flag_str: String = row.get(8)?;
    let processed_at_str: String = row.get(11)?;

    Ok(Bill {
        id: row.get(0)?,
        user_id: row.get(1)?,
        customer_name: row.get(2)?,
        address: row.get(3)?,
        installation_number: row.get(4)?,
        consumption_kwh: row.get(5)?,
        total_value: row.get(6)?,
        due_date: parse_column(7, &due_date_str)?,
        tariff_flag: parse_column(8, &flag_str)?,
        distributor: row.get(9)?,
        reference_month: row.get(10)?,
        processed_at: parse_datetime(&processed_at_str),
        file_name: row.get(12)?,
        file_url: row.get(13)?,
        raw_data: row.get(14)?,
    })
}

impl Database {
    /// Store a bill
    ///
    /// Returns `None` when an identical bill (same dedup hash) already exists.
    pub fn insert_bill(&self, bill: &NewBill) -> Result<Option<i64>> {
        bill.validate()?;

        let conn = self.conn()?;
        let hash = bill_hash(bill);

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM bills WHERE import_hash = ?",
                params![hash],
                |row| row.get(0),
            )
            .optional()?;

        if existing.is_some() {
            return Ok(None);
        }

        let processed_at = bill.processed_at.unwrap_or_else(Utc::now);

        conn.execute(
            r#"
            INSERT INTO bills (
                user_id, customer_name, address, installation_number, consumption_kwh,
                total_value, due_date, tariff_flag, distributor, reference_month,
                processed_at, file_name, file_url, raw_data, import_hash
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                bill.user_id,
                bill.customer_name,
                bill.address,
                bill.installation_number,
                bill.consumption_kwh,
                bill.total_value,
                bill.due_date.to_string(),
                bill.tariff_flag.as_str(),
                bill.distributor,
                bill.reference_month,
                format_datetime(&processed_at),
                bill.file_name,
                bill.file_url,
                bill.raw_data,
                hash,
            ],
        )?;

        Ok(Some(conn.last_insert_rowid()))
    }

    /// Get a bill by ID
    pub fn get_bill(&self, id: i64) -> Result<Option<Bill>> {
        let conn = self.conn()?;

        let bill = conn
            .query_row(
                &format!("SELECT {} FROM bills WHERE id = ?", BILL_COLUMNS),
                params![id],
                row_to_bill,
            )
            .optional()?;

        Ok(bill)
    }

    /// List bills, most recent first
    pub fn list_bills(&self, filter: &BillFilter) -> Result<Vec<Bill>> {
        let conn = self.conn()?;

        let mut sql = format!("SELECT {} FROM bills WHERE 1=1", BILL_COLUMNS);
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(user_id) = filter.user_id {
            sql.push_str(" AND user_id = ?");
            params_vec.push(Box::new(user_id));
        }

        if let Some(since) = &filter.since {
            sql.push_str(" AND processed_at >= ?");
            params_vec.push(Box::new(format_datetime(since)));
        }

        sql.push_str(" ORDER BY processed_at DESC, id DESC");

        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            params_vec.push(Box::new(limit));
        }

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let bills = stmt
            .query_map(params_refs.as_slice(), row_to_bill)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(bills)
    }

    /// Count stored bills, optionally for one user
    pub fn count_bills(&self, user_id: Option<i64>) -> Result<i64> {
        let conn = self.conn()?;

        let count = match user_id {
            Some(id) => conn.query_row(
                "SELECT COUNT(*) FROM bills WHERE user_id = ?",
                params![id],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM bills", [], |row| row.get(0))?,
        };

        Ok(count)
    }

    /// Delete a bill and its feedback; returns false if it did not exist
    pub fn delete_bill(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM extraction_feedback WHERE bill_id = ?", params![id])?;
        let deleted = conn.execute("DELETE FROM bills WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }
}

impl BillRepository for Database {
    fn list_bills(&self, filter: &BillFilter) -> Result<Vec<Bill>> {
        Database::list_bills(self, filter)
    }

    fn get_bill(&self, id: i64) -> Result<Option<Bill>> {
        Database::get_bill(self, id)
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        Database::get_user(self, id)
    }

    fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        Database::list_users(self, filter)
    }

    fn count_users(&self) -> Result<usize> {
        Ok(usize::try_from(Database::count_users(self)?).unwrap_or(0))
    }

    fn list_feedback(&self, status: Option<FeedbackStatus>) -> Result<Vec<FeedbackWithBill>> {
        Database::list_feedback(self, status)
    }
}
