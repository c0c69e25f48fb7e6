//! Monthly buckets and month-over-month growth

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{percent_change, round1};
use crate::models::Bill;

/// Averages for one processing month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    /// `YYYY-MM`, taken from `processed_at` (UTC)
    pub month: String,
    /// Rounded average consumption (kWh)
    pub avg_consumption: u32,
    /// Rounded average bill value
    pub avg_value: f64,
    /// Always > 0
    pub count: usize,
}

/// Change in average consumption between the two most recent months
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Growth {
    /// Signed percentage, one decimal
    pub percent: f64,
    pub is_positive: bool,
}

#[derive(Default)]
struct MonthAccumulator {
    consumption: u64,
    value: f64,
    count: usize,
}

/// Group bills by processing month, ascending
pub fn monthly_trends(bills: &[Bill]) -> Vec<MonthlyTrend> {
    let mut months: BTreeMap<String, MonthAccumulator> = BTreeMap::new();

    for bill in bills {
        let acc = months
            .entry(bill.processed_at.format("%Y-%m").to_string())
            .or_default();
        acc.consumption += u64::from(bill.consumption_kwh);
        acc.value += bill.total_value;
        acc.count += 1;
    }

    months
        .into_iter()
        .map(|(month, acc)| {
            let count = acc.count as f64;
            MonthlyTrend {
                month,
                avg_consumption: (acc.consumption as f64 / count).round() as u32,
                avg_value: (acc.value / count).round(),
                count: acc.count,
            }
        })
        .collect()
}

/// Growth of average consumption from the second-to-last to the last month
///
/// `None` with fewer than two months, or when the earlier month averaged zero.
pub fn monthly_growth(trends: &[MonthlyTrend]) -> Option<Growth> {
    let [.., previous, last] = trends else {
        return None;
    };

    let percent = percent_change(
        f64::from(previous.avg_consumption),
        f64::from(last.avg_consumption),
    )?;

    Some(Growth {
        percent: round1(percent),
        is_positive: percent >= 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{bill_at, BillFixture};

    #[test]
    fn test_monthly_trends_groups_and_sorts() {
        // Deliberately out of order
        let bills = vec![
            bill_at(1, "2024-03-10", 300).with_value(250.0),
            bill_at(2, "2024-01-05", 100).with_value(80.0),
            bill_at(3, "2024-03-20", 201).with_value(151.0),
            bill_at(4, "2024-02-14", 150).with_value(120.0),
        ];

        let trends = monthly_trends(&bills);
        let months: Vec<_> = trends.iter().map(|t| t.month.as_str()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02", "2024-03"]);

        let march = &trends[2];
        assert_eq!(march.count, 2);
        // (300 + 201) / 2 = 250.5 rounds up
        assert_eq!(march.avg_consumption, 251);
        // (250 + 151) / 2 = 200.5 rounds up
        assert_eq!(march.avg_value, 201.0);
    }

    #[test]
    fn test_monthly_trends_counts_sum_to_input() {
        let bills: Vec<_> = (0..25)
            .map(|i| bill_at(i, &format!("2024-{:02}-01", (i % 12) + 1), 100 + i as u32))
            .collect();

        let trends = monthly_trends(&bills);
        assert_eq!(trends.iter().map(|t| t.count).sum::<usize>(), bills.len());
        assert!(trends.iter().all(|t| t.count > 0));
    }

    #[test]
    fn test_monthly_trends_empty() {
        assert!(monthly_trends(&[]).is_empty());
    }

    #[test]
    fn test_monthly_growth() {
        let bills = vec![bill_at(1, "2024-01-10", 100), bill_at(2, "2024-02-10", 120)];
        let growth = monthly_growth(&monthly_trends(&bills)).unwrap();
        assert_eq!(growth.percent, 20.0);
        assert!(growth.is_positive);

        let bills = vec![bill_at(1, "2024-01-10", 300), bill_at(2, "2024-02-10", 200)];
        let growth = monthly_growth(&monthly_trends(&bills)).unwrap();
        assert_eq!(growth.percent, -33.3);
        assert!(!growth.is_positive);
    }

    #[test]
    fn test_monthly_growth_needs_two_months() {
        assert!(monthly_growth(&[]).is_none());
        let one = monthly_trends(&[bill_at(1, "2024-01-10", 100)]);
        assert!(monthly_growth(&one).is_none());
    }

    #[test]
    fn test_monthly_growth_zero_baseline() {
        let bills = vec![bill_at(1, "2024-01-10", 0), bill_at(2, "2024-02-10", 150)];
        assert!(monthly_growth(&monthly_trends(&bills)).is_none());
    }

    #[test]
    fn test_flat_growth_is_positive() {
        let bills = vec![bill_at(1, "2024-01-10", 150), bill_at(2, "2024-02-10", 150)];
        let growth = monthly_growth(&monthly_trends(&bills)).unwrap();
        assert_eq!(growth.percent, 0.0);
        assert!(growth.is_positive);
    }
}
