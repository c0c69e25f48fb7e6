//! Bill, extraction and CSV import handlers

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::parse_param;
use crate::{get_user_email, AppError, AppState, SuccessResponse, MAX_PAGE_LIMIT, MAX_UPLOAD_SIZE};
use energyreader_core::analytics::{filter_by_period, PeriodWindow};
use energyreader_core::import::parse_bills_csv;
use energyreader_core::models::{Bill, BillFilter, NewBill};
use energyreader_core::ExtractedBill;

/// Query parameters for listing bills
#[derive(Debug, Deserialize)]
pub struct BillQuery {
    pub user_id: Option<i64>,
    /// Rolling window: 1m, 3m, 6m, 12m or all (default: all)
    pub period: Option<String>,
    pub limit: Option<i64>,
}

/// Response for bill creation
#[derive(Serialize)]
pub struct CreateBillResponse {
    /// ID of the stored bill, absent for a duplicate
    pub id: Option<i64>,
    pub duplicate: bool,
}

/// Request body for text extraction
#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    /// Recognized text of the bill
    pub text: String,
    /// Owner, required when saving
    pub user_id: Option<i64>,
    /// Store the extracted bill
    #[serde(default)]
    pub save: bool,
    pub file_name: Option<String>,
}

#[derive(Serialize)]
pub struct ExtractResponse {
    pub extracted: ExtractedBill,
    /// Set when the bill was saved (absent for a duplicate)
    pub bill_id: Option<i64>,
}

/// Request body for JSON CSV import
#[derive(Debug, Deserialize)]
pub struct ImportJsonRequest {
    pub user_id: i64,
    /// CSV content, header row included
    pub csv_data: String,
}

/// Response for CSV import
#[derive(Serialize)]
pub struct ImportResponse {
    pub imported: usize,
    pub skipped: usize,
    pub total: usize,
}

/// GET /api/bills - List bills, most recent first
pub async fn list_bills(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<BillQuery>,
) -> Result<Json<Vec<Bill>>, AppError> {
    let user_email = get_user_email(&headers);
    let period: PeriodWindow =
        parse_param(params.period.as_deref(), "period")?.unwrap_or(PeriodWindow::All);

    let filter = BillFilter {
        user_id: params.user_id,
        since: None,
        limit: params.limit.map(|l| l.clamp(1, MAX_PAGE_LIMIT)),
    };
    let bills = state.db.list_bills(&filter)?;
    let bills = filter_by_period(&bills, period, Utc::now());

    state.db.log_audit(
        &user_email,
        "list",
        Some("bill"),
        None,
        Some(&format!(
            "user_id={:?}, period={}, count={}",
            params.user_id,
            period,
            bills.len()
        )),
    )?;

    Ok(Json(bills))
}

/// POST /api/bills - Store a bill
pub async fn create_bill(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(bill): Json<NewBill>,
) -> Result<Json<CreateBillResponse>, AppError> {
    let user_email = get_user_email(&headers);

    if state.db.get_user(bill.user_id)?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let id = state.db.insert_bill(&bill).map_err(AppError::from_core)?;

    state.db.log_audit(
        &user_email,
        "create",
        Some("bill"),
        id,
        Some(&format!("duplicate={}", id.is_none())),
    )?;

    Ok(Json(CreateBillResponse {
        id,
        duplicate: id.is_none(),
    }))
}

/// GET /api/bills/:id - Get one bill
pub async fn get_bill(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Bill>, AppError> {
    let user_email = get_user_email(&headers);

    let bill = state
        .db
        .get_bill(id)?
        .ok_or_else(|| AppError::not_found("Bill not found"))?;

    state
        .db
        .log_audit(&user_email, "view", Some("bill"), Some(id), None)?;

    Ok(Json(bill))
}

/// DELETE /api/bills/:id - Delete a bill and its feedback
pub async fn delete_bill(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_email = get_user_email(&headers);

    if !state.db.delete_bill(id)? {
        return Err(AppError::not_found("Bill not found"));
    }

    state
        .db
        .log_audit(&user_email, "delete", Some("bill"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/bills/extract - Pull bill fields out of recognized text
pub async fn extract_bill(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    let user_email = get_user_email(&headers);

    if req.text.len() > MAX_UPLOAD_SIZE {
        return Err(AppError::bad_request("Text too large"));
    }

    let extracted = state
        .extractor
        .extract(&req.text, Utc::now().date_naive())
        .ok_or_else(|| {
            AppError::unprocessable("Could not find consumption (kWh) and total value (R$) in text")
        })?;

    let bill_id = if req.save {
        let user_id = req
            .user_id
            .ok_or_else(|| AppError::bad_request("user_id is required to save"))?;
        if state.db.get_user(user_id)?.is_none() {
            return Err(AppError::not_found("User not found"));
        }

        let bill = extracted
            .clone()
            .into_new_bill(user_id, &req.text, req.file_name.clone());
        state.db.insert_bill(&bill).map_err(AppError::from_core)?
    } else {
        None
    };

    state.db.log_audit(
        &user_email,
        "extract",
        Some("bill"),
        bill_id,
        Some(&format!(
            "consumption_kwh={}, total_value={:.2}, saved={}",
            extracted.consumption_kwh, extracted.total_value, req.save
        )),
    )?;

    Ok(Json(ExtractResponse { extracted, bill_id }))
}

/// POST /api/import - Import bills from a multipart CSV upload (`file`, `user_id`)
pub async fn import_csv(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut user_id: Option<i64> = None;
    let mut total_size: usize = 0;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read file data"))?;
                total_size += bytes.len();

                if total_size > MAX_UPLOAD_SIZE {
                    return Err(AppError::bad_request(&format!(
                        "File too large. Maximum size is {} MB",
                        MAX_UPLOAD_SIZE / 1024 / 1024
                    )));
                }

                file_data = Some(bytes.to_vec());
            }
            "user_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read user_id"))?;
                user_id = Some(value.trim().parse().map_err(|_| {
                    AppError::bad_request(&format!("Invalid user_id: {}", value))
                })?);
            }
            _ => {}
        }
    }

    let file_data = file_data.ok_or_else(|| AppError::bad_request("Missing file field"))?;
    let user_id = user_id.ok_or_else(|| AppError::bad_request("Missing user_id field"))?;

    import_bills_core(&state, &headers, &file_data, user_id).map(Json)
}

/// POST /api/import/json - Import bills from CSV text in a JSON body
pub async fn import_csv_json(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ImportJsonRequest>,
) -> Result<Json<ImportResponse>, AppError> {
    if req.csv_data.len() > MAX_UPLOAD_SIZE {
        return Err(AppError::bad_request(&format!(
            "CSV too large. Maximum size is {} MB",
            MAX_UPLOAD_SIZE / 1024 / 1024
        )));
    }

    import_bills_core(&state, &headers, req.csv_data.as_bytes(), req.user_id).map(Json)
}

/// Parse and store CSV rows for one user, skipping duplicates
fn import_bills_core(
    state: &AppState,
    headers: &HeaderMap,
    data: &[u8],
    user_id: i64,
) -> Result<ImportResponse, AppError> {
    let user_email = get_user_email(headers);

    if state.db.get_user(user_id)?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let bills = parse_bills_csv(data, user_id).map_err(AppError::from_core)?;

    let mut imported = 0;
    let mut skipped = 0;
    for bill in &bills {
        match state.db.insert_bill(bill).map_err(AppError::from_core)? {
            Some(_) => imported += 1,
            None => skipped += 1,
        }
    }

    info!(user_id, imported, skipped, "Imported bills from CSV");

    state.db.log_audit(
        &user_email,
        "import",
        Some("bill"),
        None,
        Some(&format!(
            "user_id={}, imported={}, skipped={}",
            user_id, imported, skipped
        )),
    )?;

    Ok(ImportResponse {
        imported,
        skipped,
        total: bills.len(),
    })
}
