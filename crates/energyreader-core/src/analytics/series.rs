//! Chart-ready data
//!
//! A chart receives one of three explicit shapes rather than a loosely typed
//! list, so renderers match on the variant instead of probing fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::flags::{flag_distribution, FlagShare};
use super::regions::{regional_insights, Region};
use crate::models::{Bill, TariffFlag};

/// What a chart plots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Consumption,
    Value,
    Regions,
    Flags,
}

impl std::str::FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "consumption" => Ok(Self::Consumption),
            "value" => Ok(Self::Value),
            "regions" | "region" => Ok(Self::Regions),
            "flags" | "flag" => Ok(Self::Flags),
            _ => Err(format!("Unknown chart kind: {}", s)),
        }
    }
}

/// How many of the most recent bills a time series shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ChartWindow {
    #[serde(rename = "6m")]
    LastSix,
    #[default]
    #[serde(rename = "12m")]
    LastTwelve,
    #[serde(rename = "all")]
    All,
}

impl ChartWindow {
    fn take(&self) -> Option<usize> {
        match self {
            Self::LastSix => Some(6),
            Self::LastTwelve => Some(12),
            Self::All => None,
        }
    }
}

impl std::str::FromStr for ChartWindow {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "6m" => Ok(Self::LastSix),
            "12m" => Ok(Self::LastTwelve),
            "all" => Ok(Self::All),
            _ => Err(format!("Unknown chart window: {} (expected 6m, 12m or all)", s)),
        }
    }
}

/// One bill on a time axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// `YYYY-MM` of `processed_at`
    pub month: String,
    pub processed_at: DateTime<Utc>,
    /// kWh or currency, depending on the chart kind
    pub value: f64,
    pub flag: TariffFlag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPoint {
    pub region: Region,
    pub avg_consumption: u32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "points", rename_all = "snake_case")]
pub enum ChartSeries {
    TimeSeries(Vec<TimeSeriesPoint>),
    Regions(Vec<RegionPoint>),
    Flags(Vec<FlagShare>),
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        match self {
            Self::TimeSeries(points) => points.len(),
            Self::Regions(points) => points.len(),
            Self::Flags(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build the series for a chart
///
/// Time series are ordered oldest first and cut to the window's most recent
/// bills. Region and flag charts use every bill given.
pub fn chart_series(bills: &[Bill], kind: ChartKind, window: ChartWindow) -> ChartSeries {
    match kind {
        ChartKind::Consumption | ChartKind::Value => {
            let mut sorted: Vec<&Bill> = bills.iter().collect();
            sorted.sort_by_key(|b| b.processed_at);
            let skip = window
                .take()
                .map_or(0, |n| sorted.len().saturating_sub(n));

            let points = sorted[skip..]
                .iter()
                .map(|b| TimeSeriesPoint {
                    month: b.processed_at.format("%Y-%m").to_string(),
                    processed_at: b.processed_at,
                    value: match kind {
                        ChartKind::Value => b.total_value,
                        _ => f64::from(b.consumption_kwh),
                    },
                    flag: b.tariff_flag,
                })
                .collect();
            ChartSeries::TimeSeries(points)
        }
        ChartKind::Regions => ChartSeries::Regions(
            regional_insights(bills)
                .into_iter()
                .map(|r| RegionPoint {
                    region: r.region,
                    avg_consumption: r.avg_consumption,
                    count: r.count,
                })
                .collect(),
        ),
        ChartKind::Flags => ChartSeries::Flags(flag_distribution(bills)),
    }
}
