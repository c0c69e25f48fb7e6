//! Insight handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{get_user_email, AppError, AppState};
use energyreader_core::insights::Insight;
use energyreader_core::models::BillFilter;
use energyreader_core::BillRepository;

/// Query parameters for insights
#[derive(Debug, Deserialize)]
pub struct InsightQuery {
    pub user_id: i64,
}

/// GET /api/insights - Advice for a user based on their bill history
pub async fn get_insights(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<InsightQuery>,
) -> Result<Json<Vec<Insight>>, AppError> {
    let user_email = get_user_email(&headers);

    if state.repo.get_user(params.user_id)?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    // Most recent first, as the rules expect
    let history = state.repo.list_bills(&BillFilter::for_user(params.user_id))?;
    let insights = state.insights.generate(&history);

    state.db.log_audit(
        &user_email,
        "view",
        Some("insights"),
        Some(params.user_id),
        Some(&format!("bills={}, insights={}", history.len(), insights.len())),
    )?;

    Ok(Json(insights))
}
