//! User operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_column, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{User, UserFilter, UserRole};

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let role_str: String = row.get(3)?;
    let created_at_str: String = row.get(4)?;

    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        role: parse_column(3, &role_str)?,
        created_at: parse_datetime(&created_at_str),
    })
}

impl Database {
    /// Create a user, or return the existing ID for this email
    pub fn create_user(&self, email: &str, name: &str, role: UserRole) -> Result<i64> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::InvalidData(format!("Invalid email: {}", email)));
        }

        let conn = self.conn()?;

        if let Some(id) = conn
            .query_row(
                "SELECT id FROM users WHERE email = ?",
                params![email],
                |row| row.get(0),
            )
            .optional()?
        {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO users (email, name, role) VALUES (?, ?, ?)",
            params![email, name, role.as_str()],
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;

        let user = conn
            .query_row(
                "SELECT id, email, name, role, created_at FROM users WHERE id = ?",
                params![id],
                row_to_user,
            )
            .optional()?;

        Ok(user)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;

        let user = conn
            .query_row(
                "SELECT id, email, name, role, created_at FROM users WHERE email = ?",
                params![email.trim().to_lowercase()],
                row_to_user,
            )
            .optional()?;

        Ok(user)
    }

    /// List users matching a name/email search and role
    pub fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let conn = self.conn()?;

        let mut sql =
            String::from("SELECT id, email, name, role, created_at FROM users WHERE 1=1");
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            sql.push_str(" AND (LOWER(name) LIKE ? OR LOWER(email) LIKE ?)");
            let pattern = format!("%{}%", search.to_lowercase());
            params_vec.push(Box::new(pattern.clone()));
            params_vec.push(Box::new(pattern));
        }

        if let Some(role) = filter.role {
            sql.push_str(" AND role = ?");
            params_vec.push(Box::new(role.as_str()));
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map(params_refs.as_slice(), row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    pub fn count_users(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Change a user's role; returns false if the user does not exist
    pub fn update_user_role(&self, id: i64, role: UserRole) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE users SET role = ? WHERE id = ?",
            params![role.as_str(), id],
        )?;
        Ok(updated > 0)
    }

    /// Delete a user together with their bills and feedback
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM extraction_feedback WHERE user_id = ?1 OR bill_id IN (SELECT id FROM bills WHERE user_id = ?1)",
            params![id],
        )?;
        tx.execute("DELETE FROM bills WHERE user_id = ?", params![id])?;
        let deleted = tx.execute("DELETE FROM users WHERE id = ?", params![id])?;

        tx.commit()?;
        Ok(deleted > 0)
    }
}
