//! Aggregation engine over bill collections
//!
//! Everything here is a pure function of its inputs: bills are fetched once by
//! the caller (CLI or server), then filtered and folded in memory. Nothing is
//! cached; derived values are recomputed on every call.
//!
//! - `period` - rolling time windows (`1m`, `3m`, `6m`, `12m`, `all`)
//! - `trends` - per-month buckets and month-over-month growth
//! - `regions` - region heuristic and per-region summaries
//! - `flags` - tariff flag distribution
//! - `metrics` - admin dashboard counters
//! - `summary` - per-user dashboard figures
//! - `series` - chart-ready data

pub mod flags;
pub mod metrics;
pub mod period;
pub mod regions;
pub mod series;
pub mod summary;
pub mod trends;

pub use flags::{flag_distribution, FlagShare};
pub use metrics::{admin_metrics, user_stats, AdminMetrics};
pub use period::{filter_by_period, PeriodWindow};
pub use regions::{dominant_flag, region_for_address, regional_insights, Region, RegionalInsight};
pub use series::{chart_series, ChartKind, ChartSeries, ChartWindow, RegionPoint, TimeSeriesPoint};
pub use summary::{rolling_trend, user_summary, Trend, UserSummary};
pub use trends::{monthly_growth, monthly_trends, Growth, MonthlyTrend};

/// Round to one decimal place (half away from zero)
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to two decimal places (half away from zero)
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage change from `previous` to `current`
///
/// Returns `None` when `previous` is zero: there is no comparable trend.
pub fn percent_change(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) * 100.0 / previous)
}
