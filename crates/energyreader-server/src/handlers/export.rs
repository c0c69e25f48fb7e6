//! Report export handlers

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, Response, StatusCode},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use super::parse_param;
use crate::{get_user_email, require_admin, AppError, AppState};
use energyreader_core::analytics::PeriodWindow;
use energyreader_core::export::{self, ReportKind, ReportRequest};

/// Query parameters for report export
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// csv (default) or json (bill reports only)
    pub format: Option<String>,
    /// Rolling window for bill-based reports (default: all)
    pub period: Option<String>,
    /// Restrict bill-based reports to one user
    pub user_id: Option<i64>,
}

/// GET /api/export/:report - Download a report
///
/// Reports: bills, analytics, and for admins admin_bills, feedback, users.
pub async fn export_report(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Path(report): Path<String>,
    Query(params): Query<ExportQuery>,
) -> Result<Response<Body>, AppError> {
    let user_email = get_user_email(&headers);

    let kind: ReportKind = report
        .parse()
        .map_err(|e: String| AppError::not_found(&e))?;
    if kind.is_admin_only() {
        require_admin(&state, &headers, connect_info.as_ref())?;
    }

    let request = ReportRequest {
        kind,
        format: parse_param(params.format.as_deref(), "format")?.unwrap_or_default(),
        period: parse_param(params.period.as_deref(), "period")?.unwrap_or(PeriodWindow::All),
        user_id: params.user_id,
    };

    let report =
        export::render(state.repo.as_ref(), &request, Utc::now()).map_err(AppError::from_core)?;

    info!(report = %kind, format = ?request.format, rows = report.rows, "Exported report");

    state.db.log_audit(
        &user_email,
        "export",
        Some(kind.as_str()),
        None,
        Some(&format!(
            "format={:?}, period={}, user_id={:?}, rows={}",
            request.format, request.period, request.user_id, report.rows
        )),
    )?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, request.format.content_type())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", report.filename),
        )
        .body(Body::from(report.body))
        .map_err(|e| AppError::internal(&e.to_string()))
}
