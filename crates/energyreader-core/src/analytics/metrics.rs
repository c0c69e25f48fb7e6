//! Admin dashboard counters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::regions::{regional_insights, Region};
use crate::models::{Bill, User, UserRole, UserStats};

/// Headline numbers for the admin dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminMetrics {
    pub total_bills: usize,
    /// Rounded average consumption (kWh) across all bills
    pub avg_consumption: u32,
    /// Rounded average bill value
    pub avg_value: f64,
    /// Bills processed in the current calendar month (UTC)
    pub bills_this_month: usize,
    pub total_users: usize,
    /// Rounded average consumption per region, in order of first appearance
    pub consumption_by_region: Vec<(Region, u32)>,
}

pub fn admin_metrics(bills: &[Bill], total_users: usize, now: DateTime<Utc>) -> AdminMetrics {
    let total = bills.len();
    let (avg_consumption, avg_value) = if total > 0 {
        let consumption: u64 = bills.iter().map(|b| u64::from(b.consumption_kwh)).sum();
        let value: f64 = bills.iter().map(|b| b.total_value).sum();
        (
            (consumption as f64 / total as f64).round() as u32,
            (value / total as f64).round(),
        )
    } else {
        (0, 0.0)
    };

    let this_month = now.format("%Y-%m").to_string();
    let bills_this_month = bills
        .iter()
        .filter(|b| b.processed_at.format("%Y-%m").to_string() == this_month)
        .count();

    AdminMetrics {
        total_bills: total,
        avg_consumption,
        avg_value,
        bills_this_month,
        total_users,
        consumption_by_region: regional_insights(bills)
            .into_iter()
            .map(|r| (r.region, r.avg_consumption))
            .collect(),
    }
}

/// Role counts and sign-ups for the current calendar month
pub fn user_stats(users: &[User], now: DateTime<Utc>) -> UserStats {
    let this_month = now.format("%Y-%m").to_string();
    UserStats {
        total: users.len(),
        admins: users.iter().filter(|u| u.role == UserRole::Admin).count(),
        users: users.iter().filter(|u| u.role == UserRole::User).count(),
        new_this_month: users
            .iter()
            .filter(|u| u.created_at.format("%Y-%m").to_string() == this_month)
            .count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{bill_at, day, user, BillFixture};

    #[test]
    fn test_admin_metrics() {
        let bills = vec![
            bill_at(1, "2024-06-02", 100).with_value(90.0),
            bill_at(2, "2024-06-20", 201).with_value(151.0),
            bill_at(3, "2024-05-31", 300)
                .with_value(250.0)
                .with_address("Niterói - RJ"),
        ];

        let metrics = admin_metrics(&bills, 4, day("2024-06-25"));
        assert_eq!(metrics.total_bills, 3);
        assert_eq!(metrics.avg_consumption, 200);
        // 491 / 3 = 163.67
        assert_eq!(metrics.avg_value, 164.0);
        assert_eq!(metrics.bills_this_month, 2);
        assert_eq!(metrics.total_users, 4);
        assert_eq!(
            metrics.consumption_by_region,
            vec![(Region::SaoPaulo, 151), (Region::RioDeJaneiro, 300)]
        );
    }

    #[test]
    fn test_admin_metrics_empty() {
        let metrics = admin_metrics(&[], 0, day("2024-06-25"));
        assert_eq!(metrics.total_bills, 0);
        assert_eq!(metrics.avg_consumption, 0);
        assert_eq!(metrics.avg_value, 0.0);
        assert!(metrics.consumption_by_region.is_empty());
    }

    #[test]
    fn test_user_stats() {
        let mut recent = user(3, "new@example.com", UserRole::User);
        recent.created_at = day("2024-06-03");
        let users = vec![
            user(1, "admin@example.com", UserRole::Admin),
            user(2, "ana@example.com", UserRole::User),
            recent,
        ];

        let stats = user_stats(&users, day("2024-06-25"));
        assert_eq!(
            stats,
            UserStats {
                total: 3,
                admins: 1,
                users: 2,
                new_this_month: 1,
            }
        );
    }
}
