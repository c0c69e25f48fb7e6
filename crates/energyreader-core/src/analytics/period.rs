//! Rolling period windows

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Bill;

/// How far back an analytics view looks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PeriodWindow {
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[default]
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "12m")]
    TwelveMonths,
    #[serde(rename = "all")]
    All,
}

impl PeriodWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMonth => "1m",
            Self::ThreeMonths => "3m",
            Self::SixMonths => "6m",
            Self::TwelveMonths => "12m",
            Self::All => "all",
        }
    }

    /// Window length in calendar months (`None` for all time)
    pub fn months(&self) -> Option<u32> {
        match self {
            Self::OneMonth => Some(1),
            Self::ThreeMonths => Some(3),
            Self::SixMonths => Some(6),
            Self::TwelveMonths => Some(12),
            Self::All => None,
        }
    }

    /// Earliest `processed_at` included in the window
    ///
    /// Steps back whole calendar months; a day that does not exist in the
    /// target month clamps to that month's last day (Mar 31 - 1m = Feb 28/29).
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.months()
            .and_then(|m| now.checked_sub_months(Months::new(m)))
    }
}

impl std::str::FromStr for PeriodWindow {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1m" | "1" => Ok(Self::OneMonth),
            "3m" | "3" => Ok(Self::ThreeMonths),
            "6m" | "6" => Ok(Self::SixMonths),
            "12m" | "12" => Ok(Self::TwelveMonths),
            "all" => Ok(Self::All),
            _ => Err(format!(
                "Unknown period: {} (expected 1m, 3m, 6m, 12m or all)",
                s
            )),
        }
    }
}

impl std::fmt::Display for PeriodWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Keep the bills processed within `window` of `now`
pub fn filter_by_period(bills: &[Bill], window: PeriodWindow, now: DateTime<Utc>) -> Vec<Bill> {
    match window.cutoff(now) {
        Some(cutoff) => bills
            .iter()
            .filter(|b| b.processed_at >= cutoff)
            .cloned()
            .collect(),
        None => bills.to_vec(),
    }
}
