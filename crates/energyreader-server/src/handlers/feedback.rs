//! Extraction feedback handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use super::parse_param;
use crate::{get_user_email, AppError, AppState, RequireAdmin};
use energyreader_core::models::{FeedbackStatus, FeedbackWithBill, NewFeedback};

/// Query parameters for listing feedback
#[derive(Debug, Deserialize)]
pub struct FeedbackQuery {
    /// Filter by status (pending, approved, rejected)
    pub status: Option<String>,
}

/// Response for feedback submission
#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub id: i64,
    pub feedback: FeedbackWithBill,
}

/// GET /api/feedback - List extraction corrections
pub async fn list_feedback(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    Query(params): Query<FeedbackQuery>,
    request: Request,
) -> Result<Json<Vec<FeedbackWithBill>>, AppError> {
    let user_email = get_user_email(request.headers());

    let status: Option<FeedbackStatus> = parse_param(params.status.as_deref(), "status")?;
    let items = state.db.list_feedback(status)?;

    state.db.log_audit(
        &user_email,
        "list",
        Some("feedback"),
        None,
        Some(&format!("status={:?}, count={}", status, items.len())),
    )?;

    Ok(Json(items))
}

/// POST /api/feedback - Submit a correction for one extracted field
pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<NewFeedback>,
) -> Result<Json<FeedbackResponse>, AppError> {
    let user_email = get_user_email(&headers);

    let id = state
        .db
        .submit_feedback(&req)
        .map_err(AppError::from_core)?;
    let feedback = state
        .db
        .get_feedback(id)?
        .ok_or_else(|| AppError::internal("Feedback vanished after creation"))?;

    state.db.log_audit(
        &user_email,
        "create",
        Some("feedback"),
        Some(id),
        Some(&format!(
            "bill_id={}, field={}",
            req.bill_id, req.field_corrected
        )),
    )?;

    Ok(Json(FeedbackResponse { id, feedback }))
}

/// GET /api/feedback/:id - Get one correction
pub async fn get_feedback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<FeedbackWithBill>, AppError> {
    let user_email = get_user_email(&headers);

    let item = state
        .db
        .get_feedback(id)?
        .ok_or_else(|| AppError::not_found("Feedback not found"))?;

    state
        .db
        .log_audit(&user_email, "view", Some("feedback"), Some(id), None)?;

    Ok(Json(item))
}

/// POST /api/feedback/:id/approve - Accept a correction
pub async fn approve_feedback(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<FeedbackWithBill>, AppError> {
    moderate(&state, &headers, id, FeedbackStatus::Approved)
}

/// POST /api/feedback/:id/reject - Decline a correction
pub async fn reject_feedback(
    State(state): State<Arc<AppState>>,
    _admin: RequireAdmin,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<FeedbackWithBill>, AppError> {
    moderate(&state, &headers, id, FeedbackStatus::Rejected)
}

fn moderate(
    state: &AppState,
    headers: &HeaderMap,
    id: i64,
    status: FeedbackStatus,
) -> Result<Json<FeedbackWithBill>, AppError> {
    let user_email = get_user_email(headers);

    if !state.db.set_feedback_status(id, status)? {
        return Err(AppError::not_found("Feedback not found"));
    }

    state.db.log_audit(
        &user_email,
        status.as_str(),
        Some("feedback"),
        Some(id),
        None,
    )?;

    let item = state
        .db
        .get_feedback(id)?
        .ok_or_else(|| AppError::not_found("Feedback not found"))?;

    Ok(Json(item))
}
