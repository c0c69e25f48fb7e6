//! Analytics handlers - trends, regions, growth, flags, charts and dashboards
//!
//! Bills are fetched once per request and handed to the pure aggregation
//! functions in `energyreader_core::analytics`.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::parse_param;
use crate::{get_user_email, AppError, AppState, RequireAdmin};
use energyreader_core::analytics::{
    self, AdminMetrics, ChartKind, ChartSeries, ChartWindow, FlagShare, Growth, MonthlyTrend,
    PeriodWindow, RegionalInsight, Trend, UserSummary,
};
use energyreader_core::models::{Bill, BillFilter};
use energyreader_core::BillRepository;

/// Query parameters shared by the analytics endpoints
#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    /// Rolling window: 1m, 3m, 6m, 12m or all (default: 6m)
    pub period: Option<String>,
    /// Restrict to one user's bills
    pub user_id: Option<i64>,
}

/// Query parameters for chart data
#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    /// consumption, value, regions or flags (default: consumption)
    pub kind: Option<String>,
    /// Most recent bills shown: 6m, 12m or all (default: 12m)
    pub window: Option<String>,
    pub user_id: Option<i64>,
}

/// Query parameters for the user dashboard summary
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub user_id: i64,
}

/// Chart payload: the series plus the recent-vs-earlier consumption trend
#[derive(Debug, Serialize)]
pub struct ChartResponse {
    #[serde(flatten)]
    pub series: ChartSeries,
    pub trend: Option<Trend>,
}

/// Fetch the bills in scope and apply the period window
fn scoped_bills(
    state: &AppState,
    params: &AnalyticsQuery,
) -> Result<(Vec<Bill>, PeriodWindow), AppError> {
    let period: PeriodWindow =
        parse_param(params.period.as_deref(), "period")?.unwrap_or_default();

    let filter = BillFilter {
        user_id: params.user_id,
        ..Default::default()
    };
    let bills = state.repo.list_bills(&filter)?;

    Ok((filter_period(&bills, period), period))
}

fn filter_period(bills: &[Bill], period: PeriodWindow) -> Vec<Bill> {
    analytics::filter_by_period(bills, period, Utc::now())
}

fn audit_view(
    state: &AppState,
    headers: &HeaderMap,
    view: &str,
    params: &AnalyticsQuery,
    period: PeriodWindow,
) -> Result<(), AppError> {
    state.db.log_audit(
        &get_user_email(headers),
        "view",
        Some(view),
        None,
        Some(&format!("period={}, user_id={:?}", period, params.user_id)),
    )?;
    Ok(())
}

/// GET /api/analytics/trends - Per-month averages, ascending by month
pub async fn analytics_trends(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<AnalyticsQuery>,
) -> Result<Json<Vec<MonthlyTrend>>, AppError> {
    let (bills, period) = scoped_bills(&state, &params)?;
    audit_view(&state, &headers, "monthly_trends", &params, period)?;
    Ok(Json(analytics::monthly_trends(&bills)))
}

/// GET /api/analytics/regions - Per-region averages and dominant flag
pub async fn analytics_regions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<AnalyticsQuery>,
) -> Result<Json<Vec<RegionalInsight>>, AppError> {
    let (bills, period) = scoped_bills(&state, &params)?;
    audit_view(&state, &headers, "regional_insights", &params, period)?;
    Ok(Json(analytics::regional_insights(&bills)))
}

/// GET /api/analytics/growth - Growth between the last two months (null if not comparable)
pub async fn analytics_growth(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<AnalyticsQuery>,
) -> Result<Json<Option<Growth>>, AppError> {
    let (bills, period) = scoped_bills(&state, &params)?;
    audit_view(&state, &headers, "monthly_growth", &params, period)?;
    let trends = analytics::monthly_trends(&bills);
    Ok(Json(analytics::monthly_growth(&trends)))
}

/// GET /api/analytics/flags - Tariff flag distribution
pub async fn analytics_flags(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<AnalyticsQuery>,
) -> Result<Json<Vec<FlagShare>>, AppError> {
    let (bills, period) = scoped_bills(&state, &params)?;
    audit_view(&state, &headers, "flag_distribution", &params, period)?;
    Ok(Json(analytics::flag_distribution(&bills)))
}

/// GET /api/analytics/chart - Chart-ready series
pub async fn analytics_chart(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ChartQuery>,
) -> Result<Json<ChartResponse>, AppError> {
    let user_email = get_user_email(&headers);

    let kind: ChartKind =
        parse_param(params.kind.as_deref(), "kind")?.unwrap_or(ChartKind::Consumption);
    let window: ChartWindow = parse_param(params.window.as_deref(), "window")?.unwrap_or_default();

    let filter = BillFilter {
        user_id: params.user_id,
        ..Default::default()
    };
    let bills = state.repo.list_bills(&filter)?;
    let series = analytics::chart_series(&bills, kind, window);
    let trend = analytics::rolling_trend(&bills);

    state.db.log_audit(
        &user_email,
        "view",
        Some("chart"),
        None,
        Some(&format!(
            "kind={:?}, window={:?}, points={}",
            kind,
            window,
            series.len()
        )),
    )?;

    Ok(Json(ChartResponse { series, trend }))
}

/// GET /api/analytics/summary - Dashboard figures for one user (null without bills)
pub async fn analytics_summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<SummaryQuery>,
) -> Result<Json<Option<UserSummary>>, AppError> {
    let user_email = get_user_email(&headers);

    if state.repo.get_user(params.user_id)?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let bills = state.repo.list_bills(&BillFilter::for_user(params.user_id))?;

    state.db.log_audit(
        &user_email,
        "view",
        Some("user_summary"),
        Some(params.user_id),
        None,
    )?;

    Ok(Json(analytics::user_summary(&bills)))
}

/// GET /api/admin/metrics - Admin dashboard counters
pub async fn admin_metrics(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    headers: HeaderMap,
) -> Result<Json<AdminMetrics>, AppError> {
    let user_email = get_user_email(&headers);

    let bills = state.repo.list_bills(&BillFilter::default())?;
    let total_users = state.repo.count_users()?;

    state
        .db
        .log_audit(&user_email, "view", Some("admin_metrics"), None, None)?;

    Ok(Json(analytics::admin_metrics(&bills, total_users, Utc::now())))
}
