//! Extraction feedback operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_column, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    ExtractionFeedback, FeedbackStatus, FeedbackWithBill, NewFeedback,
};

const FEEDBACK_SELECT: &str = r#"
    SELECT f.id, f.bill_id, f.user_id, f.field_corrected, f.original_value,
           f.correct_value, f.status, f.created_at, b.customer_name
    FROM extraction_feedback f
    LEFT JOIN bills b ON b.id = f.bill_id
"#;

fn row_to_feedback(row: &Row) -> rusqlite::Result<FeedbackWithBill> {
    let field_str: String = row.get(3)?;
    let status_str: String = row.get(6)?;
    let created_at_str: String = row.get(7)?;

    Ok(FeedbackWithBill {
        feedback: ExtractionFeedback {
            id: row.get(0)?,
            bill_id: row.get(1)?,
            user_id: row.get(2)?,
            field_corrected: parse_column(3, &field_str)?,
            original_value: row.get(4)?,
            correct_value: row.get(5)?,
            status: parse_column(6, &status_str)?,
            created_at: parse_datetime(&created_at_str),
        },
        customer_name: row.get(8)?,
    })
}

impl Database {
    /// Record a correction to one extracted field
    ///
    /// The field's current value is captured as the original value.
    pub fn submit_feedback(&self, feedback: &NewFeedback) -> Result<i64> {
        if feedback.correct_value.trim().is_empty() {
            return Err(Error::InvalidData("Corrected value is empty".to_string()));
        }

        let bill = self
            .get_bill(feedback.bill_id)?
            .ok_or_else(|| Error::NotFound(format!("Bill {}", feedback.bill_id)))?;
        if self.get_user(feedback.user_id)?.is_none() {
            return Err(Error::NotFound(format!("User {}", feedback.user_id)));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO extraction_feedback (bill_id, user_id, field_corrected, original_value, correct_value)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                feedback.bill_id,
                feedback.user_id,
                feedback.field_corrected.as_str(),
                feedback.field_corrected.value_of(&bill),
                feedback.correct_value.trim(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn get_feedback(&self, id: i64) -> Result<Option<FeedbackWithBill>> {
        let conn = self.conn()?;

        let item = conn
            .query_row(
                &format!("{} WHERE f.id = ?", FEEDBACK_SELECT),
                params![id],
                row_to_feedback,
            )
            .optional()?;

        Ok(item)
    }

    /// List feedback, newest first, optionally by status
    pub fn list_feedback(&self, status: Option<FeedbackStatus>) -> Result<Vec<FeedbackWithBill>> {
        let conn = self.conn()?;

        let items = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE f.status = ? ORDER BY f.created_at DESC, f.id DESC",
                    FEEDBACK_SELECT
                ))?;
                let rows = stmt
                    .query_map(params![status.as_str()], row_to_feedback)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{} ORDER BY f.created_at DESC, f.id DESC",
                    FEEDBACK_SELECT
                ))?;
                let rows = stmt
                    .query_map([], row_to_feedback)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };

        Ok(items)
    }

    /// Approve or reject a correction; returns false if it does not exist
    pub fn set_feedback_status(&self, id: i64, status: FeedbackStatus) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE extraction_feedback SET status = ? WHERE id = ?",
            params![status.as_str(), id],
        )?;
        Ok(updated > 0)
    }

    /// Count corrections awaiting moderation
    pub fn count_pending_feedback(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM extraction_feedback WHERE status = 'pending'",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
