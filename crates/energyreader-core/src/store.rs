//! Read access to bills, users and feedback
//!
//! Analytics, insights and report export only ever need these reads. The
//! server holds its store as `Arc<dyn BillRepository>` and the CLI report
//! commands take `&dyn BillRepository`; writes stay on
//! [`Database`](crate::db::Database), the production store.
//! [`InMemoryStore`] serves tests and one-off analysis of imported files.

use std::sync::RwLock;

use chrono::Utc;

use crate::error::{Error, Result};
use crate::import::bill_hash;
use crate::models::{
    Bill, BillFilter, FeedbackStatus, FeedbackWithBill, NewBill, User, UserFilter,
};

pub trait BillRepository: Send + Sync {
    /// Bills matching `filter`, most recent first
    fn list_bills(&self, filter: &BillFilter) -> Result<Vec<Bill>>;

    fn get_bill(&self, id: i64) -> Result<Option<Bill>>;

    fn get_user(&self, id: i64) -> Result<Option<User>>;

    fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>>;

    fn count_users(&self) -> Result<usize> {
        Ok(self.list_users(&UserFilter::default())?.len())
    }

    /// Corrections, newest first
    fn list_feedback(&self, status: Option<FeedbackStatus>) -> Result<Vec<FeedbackWithBill>>;
}

/// Vec-backed store
#[derive(Default)]
pub struct InMemoryStore {
    bills: RwLock<Vec<(String, Bill)>>,
    users: RwLock<Vec<User>>,
    feedback: RwLock<Vec<FeedbackWithBill>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bill; `None` if an identical bill is already stored
    pub fn insert_bill(&self, bill: &NewBill) -> Result<Option<i64>> {
        bill.validate()?;

        let hash = bill_hash(bill);
        let mut bills = self
            .bills
            .write()
            .map_err(|_| Error::InvalidData("bill store lock poisoned".to_string()))?;

        if bills.iter().any(|(h, _)| *h == hash) {
            return Ok(None);
        }

        let id = bills.len() as i64 + 1;
        bills.push((
            hash,
            Bill {
                id,
                user_id: bill.user_id,
                customer_name: bill.customer_name.clone(),
                address: bill.address.clone(),
                installation_number: bill.installation_number.clone(),
                consumption_kwh: bill.consumption_kwh,
                total_value: bill.total_value,
                due_date: bill.due_date,
                tariff_flag: bill.tariff_flag,
                distributor: bill.distributor.clone(),
                reference_month: bill.reference_month.clone(),
                processed_at: bill.processed_at.unwrap_or_else(Utc::now),
                file_name: bill.file_name.clone(),
                file_url: bill.file_url.clone(),
                raw_data: bill.raw_data.clone(),
            },
        ));
        Ok(Some(id))
    }

    pub fn add_user(&self, user: User) -> Result<()> {
        self.users
            .write()
            .map_err(|_| Error::InvalidData("user store lock poisoned".to_string()))?
            .push(user);
        Ok(())
    }

    pub fn add_feedback(&self, item: FeedbackWithBill) -> Result<()> {
        self.feedback
            .write()
            .map_err(|_| Error::InvalidData("feedback store lock poisoned".to_string()))?
            .push(item);
        Ok(())
    }
}

impl BillRepository for InMemoryStore {
    fn list_bills(&self, filter: &BillFilter) -> Result<Vec<Bill>> {
        let bills = self
            .bills
            .read()
            .map_err(|_| Error::InvalidData("bill store lock poisoned".to_string()))?;

        let mut matching: Vec<Bill> = bills
            .iter()
            .map(|(_, b)| b)
            .filter(|b| filter.user_id.map_or(true, |u| b.user_id == u))
            .filter(|b| filter.since.map_or(true, |s| b.processed_at >= s))
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.processed_at.cmp(&a.processed_at).then(b.id.cmp(&a.id)));
        if let Some(limit) = filter.limit {
            matching.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(matching)
    }

    fn get_bill(&self, id: i64) -> Result<Option<Bill>> {
        let bills = self
            .bills
            .read()
            .map_err(|_| Error::InvalidData("bill store lock poisoned".to_string()))?;
        Ok(bills.iter().map(|(_, b)| b).find(|b| b.id == id).cloned())
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let users = self
            .users
            .read()
            .map_err(|_| Error::InvalidData("user store lock poisoned".to_string()))?;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let users = self
            .users
            .read()
            .map_err(|_| Error::InvalidData("user store lock poisoned".to_string()))?;
        Ok(users.iter().filter(|u| filter.matches(u)).cloned().collect())
    }

    fn list_feedback(&self, status: Option<FeedbackStatus>) -> Result<Vec<FeedbackWithBill>> {
        let feedback = self
            .feedback
            .read()
            .map_err(|_| Error::InvalidData("feedback store lock poisoned".to_string()))?;

        let mut matching: Vec<FeedbackWithBill> = feedback
            .iter()
            .filter(|f| status.map_or(true, |s| f.feedback.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.feedback
                .created_at
                .cmp(&a.feedback.created_at)
                .then(b.feedback.id.cmp(&a.feedback.id))
        });
        Ok(matching)
    }
}
