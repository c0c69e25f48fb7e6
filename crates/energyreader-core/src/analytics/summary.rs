//! Per-user dashboard figures

use serde::{Deserialize, Serialize};

use super::{percent_change, round1};
use crate::models::{Bill, TariffFlag};

/// Magnitude and direction of a change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    /// Absolute percentage, one decimal
    pub percent: f64,
    /// True when the value went up
    pub is_increase: bool,
}

impl Trend {
    fn between(previous: f64, current: f64) -> Option<Self> {
        let change = percent_change(previous, current)?;
        Some(Self {
            percent: round1(change.abs()),
            is_increase: change > 0.0,
        })
    }
}

/// Headline cards for one user's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub bill_count: usize,
    pub latest_value: f64,
    pub latest_consumption: u32,
    pub latest_flag: TariffFlag,
    pub latest_due_date: chrono::NaiveDate,
    /// Rounded mean consumption over the whole history
    pub avg_consumption: u32,
    /// Latest vs previous bill; `None` without a previous bill
    pub value_trend: Option<Trend>,
    pub consumption_trend: Option<Trend>,
}

/// Summarize a most-recent-first history; `None` when it is empty
pub fn user_summary(bills: &[Bill]) -> Option<UserSummary> {
    let latest = bills.first()?;
    let previous = bills.get(1);

    let total: u64 = bills.iter().map(|b| u64::from(b.consumption_kwh)).sum();

    Some(UserSummary {
        bill_count: bills.len(),
        latest_value: latest.total_value,
        latest_consumption: latest.consumption_kwh,
        latest_flag: latest.tariff_flag,
        latest_due_date: latest.due_date,
        avg_consumption: (total as f64 / bills.len() as f64).round() as u32,
        value_trend: previous.and_then(|p| Trend::between(p.total_value, latest.total_value)),
        consumption_trend: previous.and_then(|p| {
            Trend::between(
                f64::from(p.consumption_kwh),
                f64::from(latest.consumption_kwh),
            )
        }),
    })
}

/// Recent vs earlier consumption for the chart view
///
/// Sorts by processing time, then compares the mean of the last three bills
/// to the mean of the three before them. Both sums are divided by three even
/// when fewer bills exist, matching the chart's fixed 3-bill windows.
pub fn rolling_trend(bills: &[Bill]) -> Option<Trend> {
    if bills.len() < 2 {
        return None;
    }

    let mut sorted: Vec<&Bill> = bills.iter().collect();
    sorted.sort_by_key(|b| b.processed_at);

    let n = sorted.len();
    let window_mean = |window: &[&Bill]| -> f64 {
        window
            .iter()
            .map(|b| f64::from(b.consumption_kwh))
            .sum::<f64>()
            / 3.0
    };

    let recent = window_mean(&sorted[n.saturating_sub(3)..]);
    let earlier = window_mean(&sorted[n.saturating_sub(6)..n.saturating_sub(3)]);

    Trend::between(earlier, recent)
}
